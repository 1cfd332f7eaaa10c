use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use thiserror::Error;
use tokio::{process::Command, runtime::Handle, sync::oneshot, task::JoinHandle};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub language: String,
}

impl Utterance {
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("no tokio runtime available to play utterance")]
    NoRuntime,
    #[error("failed to spawn speech command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Speech output boundary. Implementations must not block on playback.
pub trait VoiceSynthesizer: Send + Sync {
    fn speak(&self, utterance: Utterance) -> anyhow::Result<()>;
    /// Stops whatever is still playing. A no-op when idle.
    fn cancel(&self);
}

pub struct SilentSynthesizer;

impl VoiceSynthesizer for SilentSynthesizer {
    fn speak(&self, utterance: Utterance) -> anyhow::Result<()> {
        debug!(text = %utterance.text, "voice: silent synthesizer dropped utterance");
        Ok(())
    }

    fn cancel(&self) {}
}

/// Plays utterances through a local text-to-speech program such as `say` or
/// `espeak`. A new utterance interrupts the previous one.
pub struct CommandSynthesizer {
    command: String,
    playing: Mutex<Option<oneshot::Sender<()>>>,
    playback: Mutex<Option<JoinHandle<()>>>,
}

impl CommandSynthesizer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            playing: Mutex::new(None),
            playback: Mutex::new(None),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Waits up to `limit` for the last utterance to finish playing. Returns
    /// false if it was still playing when the limit ran out.
    ///
    /// Dropping the runtime kills the speech process, so callers about to
    /// exit should await this first.
    pub async fn finish(&self, limit: Duration) -> bool {
        let playback = self
            .playback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(playback) = playback else {
            return true;
        };

        match tokio::time::timeout(limit, playback).await {
            Ok(_) => true,
            Err(_) => {
                warn!(
                    command = %self.command,
                    limit_ms = limit.as_millis() as u64,
                    "voice: utterance still playing, giving up"
                );
                false
            }
        }
    }
}

pub fn speech_args(command: &str, utterance: &Utterance) -> Vec<String> {
    let program = command.rsplit(['/', '\\']).next().unwrap_or(command);
    if program.starts_with("espeak") && !utterance.language.is_empty() {
        vec![
            "-v".to_string(),
            utterance.language.to_ascii_lowercase(),
            utterance.text.clone(),
        ]
    } else {
        vec![utterance.text.clone()]
    }
}

impl VoiceSynthesizer for CommandSynthesizer {
    fn speak(&self, utterance: Utterance) -> anyhow::Result<()> {
        let handle = Handle::try_current().map_err(|_| VoiceError::NoRuntime)?;
        self.cancel();

        let mut child = {
            let _entered = handle.enter();
            Command::new(&self.command)
                .args(speech_args(&self.command, &utterance))
                .kill_on_drop(true)
                .spawn()
                .map_err(|source| VoiceError::Spawn {
                    command: self.command.clone(),
                    source,
                })?
        };

        let (stop_tx, mut stop_rx) = oneshot::channel();
        *self.playing.lock().unwrap_or_else(PoisonError::into_inner) = Some(stop_tx);

        let command = self.command.clone();
        let playback = handle.spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    if let Err(err) = status {
                        warn!(command = %command, "voice: speech process wait failed: {err}");
                    }
                }
                _ = &mut stop_rx => {
                    let _ = child.kill().await;
                }
            }
        });
        *self.playback.lock().unwrap_or_else(PoisonError::into_inner) = Some(playback);

        Ok(())
    }

    fn cancel(&self) {
        if let Some(stop_tx) = self
            .playing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = stop_tx.send(());
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
