use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Where simulated playback sends the audio it "plays".
pub struct AudioSink {
    file: Option<tokio::fs::File>,
    written: usize,
}

impl AudioSink {
    pub async fn open(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Some(
                tokio::fs::File::create(path)
                    .await
                    .with_context(|| format!("Failed to create {}", path.display()))?,
            ),
            None => None,
        };
        Ok(Self { file, written: 0 })
    }

    pub async fn write(&mut self, audio: &[u8]) -> Result<()> {
        if audio.is_empty() {
            return Ok(());
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(audio).await?;
            file.flush().await?;
        }
        self.written += audio.len();
        Ok(())
    }

    /// Total bytes played so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

/// Bytes released per playback tick for a given byte rate. Never zero.
pub fn bytes_per_tick(byte_rate: usize, tick: Duration) -> usize {
    ((byte_rate as u128 * tick.as_millis()) / 1000).max(1) as usize
}
