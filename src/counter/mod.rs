//! Per-viewer counter state.
//!
//! A viewer sees view and like counts seeded from the entity they loaded. The counts only change when a counter
//! mutation reports a new value; nothing is rolled back when a mutation fails.

use std::fmt::Display;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::auth::Principal;
use crate::model::{Counter, EntityRef, Kind};

pub use progress::{LikeProgress, Step, LIKE_THRESHOLD};

mod progress;

/// Anything that can add one to a counter and report the value it produced.
pub trait CounterMutator {
    type Error;

    /// Returns `None` when the target does not exist.
    fn increment(
        &self,
        target: &EntityRef,
        counter: Counter,
    ) -> impl Future<Output = Result<Option<u64>, Self::Error>> + Send;
}

/// The displayed view count of a mounted detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCounter {
    views: u64,
}

impl ViewCounter {
    pub fn seeded(views: u64) -> Self {
        Self { views }
    }

    /// Mounts a detail view: counts one view, unconditionally, and displays what the store reports.
    ///
    /// A failed increment is logged and the page keeps the seeded count.
    pub async fn mount<M>(target: &EntityRef, seed: u64, mutator: &M) -> Self
    where
        M: CounterMutator,
        M::Error: Display,
    {
        let mut counter = Self::seeded(seed);
        match mutator.increment(target, Counter::Views).await {
            Ok(result) => counter.settle(result),
            Err(error) => tracing::warn!(%target, %error, "view was not counted"),
        }
        counter
    }

    pub fn views(&self) -> u64 {
        self.views
    }

    /// Replaces the displayed count with a mutation result. A missing entity leaves the count as it was.
    pub fn settle(&mut self, result: Option<u64>) {
        if let Some(views) = result {
            self.views = views;
        }
    }
}

/// How taps on a like button turn into likes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LikeMode {
    /// Every tap sends a like.
    EveryTap,
    /// Taps accumulate [LikeProgress]; only the tap after a full progress sends a like.
    Progress,
}

impl LikeMode {
    pub fn of(kind: Kind) -> Self {
        match kind {
            Kind::Project => LikeMode::EveryTap,
            Kind::Blog => LikeMode::Progress,
        }
    }
}

/// Outcome of a tap on the like button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tap {
    /// Nobody is signed in; nothing changed.
    Ignored,
    /// A silent marker was added.
    Advanced { progress: u8 },
    /// A like has to be sent. Any progress has been cleared.
    Commit,
}

/// Result of a like tap as shown to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub likes: u64,
    pub progress: u8,
    pub primed: bool,
    pub committed: bool,
}

/// The like button of a mounted entity: displayed like count plus the viewer's pending progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeButton {
    likes: u64,
    mode: LikeMode,
    progress: LikeProgress,
}

impl LikeButton {
    pub fn seeded(likes: u64, mode: LikeMode) -> Self {
        Self {
            likes,
            mode,
            progress: LikeProgress::default(),
        }
    }

    pub fn for_target(target: &EntityRef, likes: u64) -> Self {
        Self::seeded(likes, LikeMode::of(target.kind))
    }

    pub fn likes(&self) -> u64 {
        self.likes
    }

    pub fn mode(&self) -> LikeMode {
        self.mode
    }

    pub fn progress(&self) -> LikeProgress {
        self.progress
    }

    /// Applies one tap without touching the store.
    pub fn tap(&mut self, viewer: Option<&Principal>) -> Tap {
        if viewer.is_none() {
            return Tap::Ignored;
        }

        if self.mode == LikeMode::EveryTap {
            return Tap::Commit;
        }

        match self.progress.tap() {
            Step::Advanced => Tap::Advanced {
                progress: self.progress.markers(),
            },
            Step::Commit => Tap::Commit,
        }
    }

    pub fn settle(&mut self, result: Option<u64>) {
        if let Some(likes) = result {
            self.likes = likes;
        }
    }

    /// Taps and, when the tap commits, sends the like and displays the new count.
    pub async fn press<M: CounterMutator>(
        &mut self,
        target: &EntityRef,
        viewer: Option<&Principal>,
        mutator: &M,
    ) -> Result<Tap, M::Error> {
        let tap = self.tap(viewer);
        if tap == Tap::Commit {
            let result = mutator.increment(target, Counter::Likes).await?;
            tracing::debug!(%target, ?result, "sent like");
            self.settle(result);
        }
        Ok(tap)
    }

    pub fn state(&self, tap: Tap) -> LikeState {
        LikeState {
            likes: self.likes,
            progress: self.progress.markers(),
            primed: self.progress.is_primed(),
            committed: tap == Tap::Commit,
        }
    }
}

/// Both counters of one mounted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widgets {
    pub views: ViewCounter,
    pub likes: LikeButton,
}

impl Widgets {
    /// Widgets seeded from stored counts, without counting a view.
    pub fn seeded(target: &EntityRef, views: u64, likes: u64) -> Self {
        Self {
            views: ViewCounter::seeded(views),
            likes: LikeButton::for_target(target, likes),
        }
    }
}
