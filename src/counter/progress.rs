use serde::{Deserialize, Serialize};

/// Number of silent taps a viewer makes before the next one is sent as a real like.
pub const LIKE_THRESHOLD: u8 = 3;

/// The transient "like progress" of one viewer on one entity.
///
/// | state    | tap      | effect                          |
/// |----------|----------|---------------------------------|
/// | n < 3    | n + 1    | none, the marker is visual only |
/// | 3        | 0        | commit one like                 |
///
/// Reaching three markers does not commit by itself; the tap after that does. A viewer who keeps tapping therefore
/// sends a like on taps 4, 8, 12 and so on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LikeProgress(u8);

/// What a single tap did to the progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A marker was added; nothing should be sent.
    Advanced,
    /// The progress was full and has been cleared; exactly one like should be sent.
    Commit,
}

impl LikeProgress {
    pub fn markers(self) -> u8 {
        self.0
    }

    /// Whether at least one silent tap is pending.
    pub fn is_primed(self) -> bool {
        self.0 > 0
    }

    pub fn tap(&mut self) -> Step {
        if self.0 < LIKE_THRESHOLD {
            self.0 += 1;
            Step::Advanced
        } else {
            self.0 = 0;
            Step::Commit
        }
    }
}
