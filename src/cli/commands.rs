//! CLI command implementations

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::capture::{create_recorder, ArtifactKind};
use crate::cli::args::{ConfigCommand, LibraryCommand, PermissionCommand};
use crate::cli::display::{NullDisplay, TerminalDisplay};
use crate::config::Settings;
use crate::library::{
    AccessLevel, Asset, LibraryDatabase, MediaPersistence, PermissionStatus, SavedAsset,
};
use crate::session::{spawn_session, DisplaySink, SessionEvent, SessionParts};

/// Record until Ctrl-C or autostop, then wait for the library save
pub async fn record(
    settings: &Settings,
    autostop: Option<u64>,
    fps: Option<u32>,
    no_display: bool,
) -> Result<()> {
    let mut settings = settings.clone();
    if let Some(secs) = autostop {
        settings.recording.autostop_secs = secs;
    }
    if let Some(fps) = fps {
        settings.recording.frame_rate = fps;
    }
    settings.validate()?;
    settings.ensure_dirs()?;

    let display: Box<dyn DisplaySink> = if settings.display.enabled && !no_display {
        Box::new(TerminalDisplay::new(settings.display.color))
    } else {
        Box::new(NullDisplay)
    };

    let session = spawn_session(SessionParts {
        recorder: create_recorder(&settings),
        display,
        persistence: Arc::new(MediaPersistence::from_settings(&settings)),
        autostop: settings.autostop(),
        video: settings.video_settings(),
    });
    let mut events = session.subscribe();

    session
        .start()
        .await
        .context("Failed to start recording")?;

    let limit = settings.autostop();
    if limit.is_enabled() {
        eprintln!(
            "Recording... press Ctrl-C to stop (stops on its own after {}s)",
            limit.limit_secs
        );
    } else {
        eprintln!("Recording... press Ctrl-C to stop");
    }

    let mut interrupts = Interrupts::default();

    let outcome = loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                match interrupts.press() {
                    Interrupt::Stop => {
                        session.request_stop();
                        eprintln!("Stopping... press Ctrl-C again to abort");
                    }
                    Interrupt::Abort => break Err(anyhow::anyhow!(
                        "Recording aborted; unsaved captures stay in {}",
                        settings.recording.temp_dir.display()
                    )),
                }
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Stopped { artifact, frames, elapsed_secs, .. }) => {
                    println!(
                        "Recorded {} frames ({:.2}s) to {}",
                        frames,
                        elapsed_secs,
                        artifact.location.display()
                    );
                }
                Ok(SessionEvent::FinishFailed { message, .. }) => {
                    break Err(anyhow::anyhow!("Recording failed: {}", message));
                }
                Ok(SessionEvent::Saved { asset }) => break Ok(asset),
                Ok(SessionEvent::SaveFailed { location, message }) => {
                    break Err(anyhow::anyhow!(
                        "{}\nThe recording is still at {}",
                        message,
                        location.display()
                    ));
                }
                Ok(event) => debug!("Session event: {:?}", event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Missed {} session events", skipped);
                }
                Err(RecvError::Closed) => {
                    break Err(anyhow::anyhow!("Recording session ended unexpectedly"));
                }
            }
        }
    };

    // An abort leaves the session behind instead of waiting for it to drain
    if !interrupts.aborted() {
        session.shutdown().await?;
    }
    let saved = outcome?;
    print_saved(&saved);

    Ok(())
}

/// What a Ctrl-C press means during `record`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Stop,
    Abort,
}

/// Counts Ctrl-C presses: the first asks for a clean stop, any later one aborts
#[derive(Debug, Default)]
struct Interrupts {
    presses: u32,
}

impl Interrupts {
    fn press(&mut self) -> Interrupt {
        self.presses += 1;
        if self.presses == 1 {
            Interrupt::Stop
        } else {
            Interrupt::Abort
        }
    }

    fn aborted(&self) -> bool {
        self.presses > 1
    }
}

/// Capture one still frame and save it to the library
pub async fn snapshot(settings: &Settings) -> Result<()> {
    settings.ensure_dirs()?;

    let recorder = create_recorder(settings);
    let artifact = recorder
        .snapshot()
        .await
        .context("Failed to capture snapshot")?;

    let persistence = MediaPersistence::from_settings(settings);
    let saved = persistence.save(artifact).await?;
    print_saved(&saved);

    Ok(())
}

fn print_saved(saved: &SavedAsset) {
    println!(
        "{} has been saved to the media library ({})",
        capitalize(saved.asset.kind.as_str()),
        saved.asset.short_id()
    );
    if saved.permission == PermissionStatus::Limited {
        println!("(library access is limited)");
    }
    if !saved.temp_removed {
        println!("Note: the temporary capture file could not be removed");
    }
}

/// Handle library subcommands
pub fn library_command(settings: &Settings, cmd: LibraryCommand) -> Result<()> {
    let db = LibraryDatabase::open(settings)?;

    match cmd {
        LibraryCommand::List { limit, kind, json } => list_assets(&db, limit, kind, json)?,
        LibraryCommand::Show { id } => {
            let asset = find_asset(&db, &id)?;
            println!("ID: {}", asset.id);
            println!("Kind: {}", asset.kind.as_str());
            println!("Date: {}", asset.created_at.format("%Y-%m-%d %H:%M:%S"));
            println!("Size: {}", format_bytes(asset.byte_size));
            println!("File: {}", settings.library_dir().join(&asset.file_name).display());
            println!("Captured from: {}", asset.original_name);
        }
        LibraryCommand::Remove { id } => {
            let asset = find_asset(&db, &id)?;
            let path = settings.library_dir().join(&asset.file_name);
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Could not remove {}: {}", path.display(), e);
            }
            db.delete_asset(&asset.id)?;
            println!("Removed {} ({})", asset.short_id(), asset.kind.as_str());
        }
        LibraryCommand::Permission(permission_cmd) => {
            permission_command(settings, &db, permission_cmd)?
        }
    }

    Ok(())
}

fn list_assets(
    db: &LibraryDatabase,
    limit: usize,
    kind: Option<ArtifactKind>,
    json: bool,
) -> Result<()> {
    let assets = db.list_assets(limit, kind)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assets)?);
        return Ok(());
    }

    if assets.is_empty() {
        println!("No items in the library");
        return Ok(());
    }

    println!("{:<10} {:<7} {:<18} {:>10}", "ID", "Kind", "Date", "Size");
    println!("{}", "-".repeat(48));

    for asset in &assets {
        println!(
            "{:<10} {:<7} {:<18} {:>10}",
            asset.short_id(),
            asset.kind.as_str(),
            asset.created_at.format("%Y-%m-%d %H:%M"),
            format_bytes(asset.byte_size)
        );
    }

    let stats = db.get_stats()?;
    println!();
    println!(
        "{} videos, {} images, {} total",
        stats.videos,
        stats.images,
        format_bytes(stats.total_bytes)
    );

    Ok(())
}

fn find_asset(db: &LibraryDatabase, id: &str) -> Result<Asset> {
    db.find_asset_by_prefix(id)?
        .with_context(|| format!("No library item matches {}", id))
}

fn permission_command(
    settings: &Settings,
    db: &LibraryDatabase,
    cmd: PermissionCommand,
) -> Result<()> {
    let default_level = settings.library.access_level;
    let resolve = |level: Option<AccessLevel>| level.unwrap_or(default_level);

    match cmd {
        PermissionCommand::Status { level } => {
            let level = resolve(level);
            println!("{}: {}", level, db.effective_permission(level)?);
        }
        PermissionCommand::Grant { level } => {
            set_permission(db, resolve(level), PermissionStatus::Authorized)?
        }
        PermissionCommand::Limit { level } => {
            set_permission(db, resolve(level), PermissionStatus::Limited)?
        }
        PermissionCommand::Deny { level } => {
            set_permission(db, resolve(level), PermissionStatus::Denied)?
        }
        PermissionCommand::Reset { level } => {
            let level = resolve(level);
            db.reset_permission(level)?;
            println!("{}: {}", level, PermissionStatus::NotDetermined);
        }
    }

    Ok(())
}

fn set_permission(db: &LibraryDatabase, level: AccessLevel, status: PermissionStatus) -> Result<()> {
    db.set_permission(level, status)?;
    println!("{}: {}", level, status);
    Ok(())
}

/// Handle config subcommands
pub fn config_command(settings: &Settings, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let toml = toml::to_string_pretty(settings)?;
            println!("{}", toml);
        }
        ConfigCommand::Path => {
            let path = Settings::config_path()?;
            println!("{}", path.display());
        }
        ConfigCommand::Init { force } => {
            let path = Settings::config_path()?;
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            Settings::write_default(&path)?;
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

// Helper functions

fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let value = bytes as f64;
    if value >= GIB {
        format!("{:.1} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.1} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.1} KiB", value / KIB)
    } else {
        format!("{} B", bytes)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
