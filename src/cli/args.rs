//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::capture::ArtifactKind;
use crate::library::AccessLevel;

/// scenecast - Record a rendered scene and keep the takes in a media library
#[derive(Parser, Debug)]
#[command(name = "scenecast")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record until Ctrl-C or the autostop limit, then save to the library
    Record {
        /// Stop automatically after this many seconds (0 disables)
        #[arg(short, long)]
        autostop: Option<u64>,

        /// Frame rate of the recorder
        #[arg(long)]
        fps: Option<u32>,

        /// Do not show the elapsed-time readout
        #[arg(long)]
        no_display: bool,
    },

    /// Capture a single still frame into the library
    Snapshot,

    /// Media library commands
    #[command(subcommand)]
    Library(LibraryCommand),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum LibraryCommand {
    /// List saved items
    List {
        /// Maximum number of items to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Only show one kind (video, image)
        #[arg(short, long)]
        kind: Option<ArtifactKind>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one saved item
    Show {
        /// Item ID or partial ID
        id: String,
    },

    /// Remove an item and its stored file
    Remove {
        /// Item ID or partial ID
        id: String,
    },

    /// Inspect or change the library permission
    #[command(subcommand)]
    Permission(PermissionCommand),
}

#[derive(Subcommand, Debug)]
pub enum PermissionCommand {
    /// Show the stored permission
    Status {
        #[arg(short, long, value_enum)]
        level: Option<AccessLevel>,
    },

    /// Grant full access
    Grant {
        #[arg(short, long, value_enum)]
        level: Option<AccessLevel>,
    },

    /// Grant limited access
    Limit {
        #[arg(short, long, value_enum)]
        level: Option<AccessLevel>,
    },

    /// Refuse access
    Deny {
        #[arg(short, long, value_enum)]
        level: Option<AccessLevel>,
    },

    /// Forget the answer so the next save asks again
    Reset {
        #[arg(short, long, value_enum)]
        level: Option<AccessLevel>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}
