//! Synthetic frame clock recorder
//!
//! Renders frames on a fixed interval and writes one record per frame into a
//! temporary capture file. The container and codec are recorded in the file
//! header and otherwise passed through untouched.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use super::{Artifact, ArtifactKind, CaptureHandle, Recorder, VideoSettings};
use crate::session::{Tick, TickSink};

const FILE_MAGIC: &[u8; 8] = b"SCNCAST1";

/// Snapshot dimensions
const SNAPSHOT_WIDTH: usize = 160;
const SNAPSHOT_HEIGHT: usize = 90;

/// Recorder driven by a tokio interval instead of a real renderer
pub struct SyntheticRecorder {
    temp_dir: PathBuf,
    frame_rate: u32,
}

impl SyntheticRecorder {
    /// Create a recorder writing into `temp_dir`
    pub fn new(temp_dir: PathBuf, frame_rate: u32) -> Self {
        Self {
            temp_dir,
            frame_rate,
        }
    }

    async fn ensure_temp_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create capture directory: {}",
                    self.temp_dir.display()
                )
            })
    }
}

#[async_trait]
impl Recorder for SyntheticRecorder {
    async fn start_capture(
        &self,
        settings: &VideoSettings,
        ticks: TickSink,
    ) -> Result<Box<dyn CaptureHandle>> {
        let frame_rate = if settings.frame_rate > 0 {
            settings.frame_rate
        } else {
            self.frame_rate
        };
        if frame_rate == 0 {
            anyhow::bail!("Frame rate must be greater than 0");
        }

        self.ensure_temp_dir().await?;

        let path = self.temp_dir.join(format!(
            "{}.{}",
            Uuid::new_v4(),
            settings.container.extension()
        ));

        let file = File::create(&path)
            .await
            .with_context(|| format!("Failed to create capture file: {}", path.display()))?;

        let mut writer = BufWriter::new(file);
        writer.write_all(FILE_MAGIC).await?;
        let header = format!(
            "container={} codec={} fps={}\n",
            settings.container.extension(),
            settings.codec.as_str(),
            frame_rate
        );
        writer.write_all(header.as_bytes()).await?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(frame_clock(writer, frame_rate, ticks, stop_rx));

        tracing::info!(
            "Synthetic capture started: {} ({} fps)",
            path.display(),
            frame_rate
        );

        Ok(Box::new(SyntheticCapture {
            path,
            stop: Some(stop_tx),
            task: Some(task),
        }))
    }

    async fn snapshot(&self) -> Result<Artifact> {
        self.ensure_temp_dir().await?;

        let path = self.temp_dir.join(format!("{}.ppm", Uuid::new_v4()));
        tokio::fs::write(&path, render_still())
            .await
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;

        Ok(Artifact::new(path, ArtifactKind::Image))
    }

    fn backend_name(&self) -> &'static str {
        "synthetic"
    }
}

/// Running synthetic capture
struct SyntheticCapture {
    path: PathBuf,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<u64>>>,
}

#[async_trait]
impl CaptureHandle for SyntheticCapture {
    async fn finish_capture(&mut self) -> Result<Artifact> {
        let task = self.task.take().context("Capture already finished")?;

        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }

        let frames = task.await.context("Frame clock task panicked")??;
        tracing::info!(
            "Synthetic capture finished: {} ({} frames)",
            self.path.display(),
            frames
        );

        Ok(Artifact::new(self.path.clone(), ArtifactKind::Video))
    }
}

impl Drop for SyntheticCapture {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Emit one frame per interval until asked to stop.
///
/// A failed write does not stop the clock: frames keep reaching the session
/// so a stop request is still observed. The first write error is returned
/// once the clock is stopped.
async fn frame_clock<W>(
    mut writer: W,
    frame_rate: u32,
    ticks: TickSink,
    mut stop: oneshot::Receiver<()>,
) -> Result<u64>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / frame_rate as f64));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let started = Instant::now();
    let mut frames: u64 = 0;
    let mut write_error: Option<std::io::Error> = None;

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = interval.tick() => {
                let elapsed = started.elapsed().as_secs_f64();
                frames += 1;

                if write_error.is_none() {
                    if let Err(e) = writer.write_all(&frame_record(frames, elapsed)).await {
                        tracing::error!("Capture write failed at frame {}: {}", frames, e);
                        write_error = Some(e);
                    }
                }

                if !ticks.emit(Tick::new(elapsed)) {
                    tracing::debug!("Session mailbox closed, frames no longer observed");
                }
            }
        }
    }

    if let Some(e) = write_error {
        return Err(anyhow::Error::new(e).context("Capture file could not be written"));
    }

    writer.flush().await?;
    Ok(frames)
}

/// Fixed-size record: frame number then elapsed seconds, both little-endian
fn frame_record(frame: u64, elapsed: f64) -> [u8; 16] {
    let mut record = [0u8; 16];
    record[..8].copy_from_slice(&frame.to_le_bytes());
    record[8..].copy_from_slice(&elapsed.to_le_bytes());
    record
}

/// Binary PPM gradient used as a still frame
fn render_still() -> Vec<u8> {
    let header = format!("P6\n{} {}\n255\n", SNAPSHOT_WIDTH, SNAPSHOT_HEIGHT);
    let mut image = Vec::with_capacity(header.len() + SNAPSHOT_WIDTH * SNAPSHOT_HEIGHT * 3);
    image.extend_from_slice(header.as_bytes());

    for y in 0..SNAPSHOT_HEIGHT {
        for x in 0..SNAPSHOT_WIDTH {
            image.push((x * 255 / SNAPSHOT_WIDTH) as u8);
            image.push((y * 255 / SNAPSHOT_HEIGHT) as u8);
            image.push(64);
        }
    }

    image
}
