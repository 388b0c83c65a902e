//! Avatar rendering boundary
//!
//! The avatar is an opaque rendering target: it consumes decoded audio
//! through the playback queue and exposes readiness, character switching,
//! and a lip-sync weight. Headless runs use [`ConsoleAvatar`].

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::Result;

/// Opaque avatar rendering target
pub trait AvatarSink: Send + Sync {
    /// Whether the avatar is loaded and able to animate
    fn is_ready(&self) -> bool;

    /// Switch the displayed character model
    ///
    /// # Errors
    ///
    /// Returns error if the character cannot be loaded
    fn change_character(&self, character: &str) -> Result<()>;

    /// Set the lip-sync weight applied to mouth movement
    fn set_lip_factor(&self, weight: f32);

    /// Current lip-sync weight
    fn lip_factor(&self) -> f32;
}

/// Headless avatar that logs instead of rendering
pub struct ConsoleAvatar {
    ready: AtomicBool,
    lip_factor: Mutex<f32>,
}

impl ConsoleAvatar {
    /// Create an avatar that is immediately ready
    #[must_use]
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
            lip_factor: Mutex::new(1.0),
        }
    }
}

impl Default for ConsoleAvatar {
    fn default() -> Self {
        Self::new()
    }
}

impl AvatarSink for ConsoleAvatar {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn change_character(&self, character: &str) -> Result<()> {
        tracing::info!(character, "avatar character changed");
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    fn set_lip_factor(&self, weight: f32) {
        *self.lip_factor.lock().expect("lip factor lock") = weight;
    }

    fn lip_factor(&self) -> f32 {
        *self.lip_factor.lock().expect("lip factor lock")
    }
}
