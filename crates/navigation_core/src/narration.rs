use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::{debug, warn};
use voice_integration::{Utterance, VoiceSynthesizer};

/// Session-wide voice guidance switch. Clones share the same flag.
#[derive(Debug, Clone)]
pub struct NarrationSetting(Arc<AtomicBool>);

impl NarrationSetting {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::SeqCst);
    }

    /// Flips the flag and returns the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::SeqCst)
    }
}

impl Default for NarrationSetting {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Forwards lines to the synthesizer without waiting for playback. Failures
/// are logged and dropped.
pub struct NarrationGateway {
    synthesizer: Arc<dyn VoiceSynthesizer>,
    language: String,
}

impl NarrationGateway {
    pub fn new(synthesizer: Arc<dyn VoiceSynthesizer>, language: impl Into<String>) -> Self {
        Self {
            synthesizer,
            language: language.into(),
        }
    }

    pub fn announce(&self, enabled: bool, text: &str) {
        if !enabled {
            debug!(text, "narration: muted, line suppressed");
            return;
        }

        match self
            .synthesizer
            .speak(Utterance::new(text, self.language.clone()))
        {
            Ok(()) => debug!(text, "narration: line forwarded"),
            Err(err) => warn!(text, "narration: synthesis failed: {err:#}"),
        }
    }

    pub fn silence(&self) {
        self.synthesizer.cancel();
    }
}

#[cfg(test)]
#[path = "tests/narration_tests.rs"]
mod tests;
