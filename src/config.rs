//! # Propagation configuration.
//!
//! Provides [`Config`], the switches deciding which directions
//! [`FrameBus::emit`](crate::FrameBus::emit) sends toward.
//!
//! ```text
//!                  ┌──────────────┐
//!                  │ parent frame │  ◄── notify_parent_frame
//!                  └──────▲───────┘
//!                         │
//!  notify_current_frame ──► current frame (same-origin only)
//!                         │
//!           ┌─────────────┼─────────────┐
//!           ▼             ▼             ▼
//!        child 0       child 1  ...  child N   ◄── notify_child_frames
//! ```
//!
//! A config is copied into the bus at construction and never changes after.

/// Direction switches for a [`FrameBus`](crate::FrameBus).
///
/// ## Field semantics
/// - `notify_current_frame`: deliver to listeners of the emitting frame itself
///   (through the inbound path, never as a direct call)
/// - `notify_parent_frame`: deliver to the parent (top-level) frame, if one exists
/// - `notify_child_frames`: deliver to every child frame present at emit time
///
/// All fields default to `true`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Send to the current frame with a same-origin restriction.
    pub notify_current_frame: bool,

    /// Send to the parent frame without origin restriction.
    pub notify_parent_frame: bool,

    /// Send to each child frame without origin restriction.
    pub notify_child_frames: bool,
}

impl Config {
    /// Only the emitting frame's own listeners are notified.
    #[must_use]
    pub fn local_only() -> Self {
        Self {
            notify_current_frame: true,
            notify_parent_frame: false,
            notify_child_frames: false,
        }
    }

    /// Sets [`notify_current_frame`](Self::notify_current_frame).
    #[inline]
    #[must_use]
    pub fn with_current_frame(mut self, enabled: bool) -> Self {
        self.notify_current_frame = enabled;
        self
    }

    /// Sets [`notify_parent_frame`](Self::notify_parent_frame).
    #[inline]
    #[must_use]
    pub fn with_parent_frame(mut self, enabled: bool) -> Self {
        self.notify_parent_frame = enabled;
        self
    }

    /// Sets [`notify_child_frames`](Self::notify_child_frames).
    #[inline]
    #[must_use]
    pub fn with_child_frames(mut self, enabled: bool) -> Self {
        self.notify_child_frames = enabled;
        self
    }
}

impl Default for Config {
    /// Default configuration: every direction enabled.
    fn default() -> Self {
        Self {
            notify_current_frame: true,
            notify_parent_frame: true,
            notify_child_frames: true,
        }
    }
}
