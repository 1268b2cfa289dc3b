//! Elapsed-time readout for the terminal

use anyhow::Result;
use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::{Print, PrintStyledContent, Stylize},
    terminal::{Clear, ClearType},
};
use std::io::{self, Stderr, Write};

use crate::session::{DisplaySink, DisplayTime};

/// Rewrites a single stderr line with the current recording time
pub struct TerminalDisplay {
    out: Stderr,
    color: bool,
    shown: bool,
}

impl TerminalDisplay {
    pub fn new(color: bool) -> Self {
        Self {
            out: io::stderr(),
            color,
            shown: false,
        }
    }
}

impl DisplaySink for TerminalDisplay {
    fn set_display_text(&mut self, time: DisplayTime) -> Result<()> {
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        if self.color {
            queue!(self.out, PrintStyledContent("● REC".red().bold()))?;
        } else {
            queue!(self.out, Print("REC"))?;
        }
        queue!(self.out, Print(format!(" {}", time)))?;
        self.out.flush()?;
        self.shown = true;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.shown {
            writeln!(self.out)?;
            self.shown = false;
        }
        Ok(())
    }
}

/// Discards every update
#[derive(Debug, Default)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn set_display_text(&mut self, _time: DisplayTime) -> Result<()> {
        Ok(())
    }
}
