//! Optional external narrator boundary.
//!
//! A narrator turns a compact snapshot into a short second-person line. Any
//! failure is logged and replaced with a fixed line; nothing here can fail
//! the caller.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::LOG_NARRATOR;
use crate::data::Catalog;
use crate::state::Ledger;

/// Substituted when a narrator answers with nothing.
pub const EMPTY_RESPONSE_FALLBACK: &str = "You stand in the cold wind. Snow pours into your collar \
     and your hands went numb long ago. You feel fate tightening around you.";

/// Substituted when a narrator fails outright.
pub const FAILURE_FALLBACK: &str = "You stand in the blizzard. The world is a grey-white silence. \
     You feel like a cinder about to burn out.";

/// What a narrator is allowed to see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeSnapshot {
    pub location: String,
    pub satiety: f64,
    pub mood: f64,
    pub academic: f64,
    pub money: f64,
    pub last_event: Option<String>,
}

impl NarrativeSnapshot {
    #[must_use]
    pub fn from_ledger(ledger: &Ledger, catalog: &Catalog) -> Self {
        Self {
            location: catalog.location_name(&ledger.location).to_string(),
            satiety: ledger.stats.satiety,
            mood: ledger.stats.mood,
            academic: ledger.stats.academic,
            money: ledger.stats.money,
            last_event: ledger.last_history().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NarratorError {
    #[error("narrator transport failed: {0}")]
    Transport(String),
    #[error("narrator returned a malformed response: {0}")]
    Malformed(String),
    #[error("narrator timed out")]
    Timeout,
}

/// Synchronous narrator collaborator.
pub trait Narrator {
    /// Produce a line for the snapshot.
    ///
    /// # Errors
    ///
    /// Any transport or response failure; callers substitute a fallback.
    fn narrate(&self, snapshot: &NarrativeSnapshot) -> Result<String, NarratorError>;
}

impl<F> Narrator for F
where
    F: Fn(&NarrativeSnapshot) -> Result<String, NarratorError>,
{
    fn narrate(&self, snapshot: &NarrativeSnapshot) -> Result<String, NarratorError> {
        self(snapshot)
    }
}

fn settle(result: Result<String, NarratorError>) -> String {
    match result {
        Ok(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                log::warn!(target: LOG_NARRATOR, "narrator returned an empty line");
                EMPTY_RESPONSE_FALLBACK.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Err(err) => {
            log::warn!(target: LOG_NARRATOR, "narrator failed: {err}");
            FAILURE_FALLBACK.to_string()
        }
    }
}

/// Ask the narrator for a line, never failing.
#[must_use]
pub fn describe(narrator: &dyn Narrator, snapshot: &NarrativeSnapshot) -> String {
    settle(narrator.narrate(snapshot))
}

#[cfg(feature = "async")]
mod nonblocking {
    use std::future::Future;
    use std::time::Duration;

    use super::{NarrativeSnapshot, NarratorError, settle};

    /// Narrator reached over an asynchronous transport.
    pub trait AsyncNarrator {
        fn narrate(
            &self,
            snapshot: &NarrativeSnapshot,
        ) -> impl Future<Output = Result<String, NarratorError>>;
    }

    /// Await the narrator under a client-side timeout, falling back on any failure.
    pub async fn narrate_with_timeout<N: AsyncNarrator>(
        narrator: &N,
        snapshot: &NarrativeSnapshot,
        timeout: Duration,
    ) -> String {
        let result = tokio::time::timeout(timeout, narrator.narrate(snapshot))
            .await
            .unwrap_or(Err(NarratorError::Timeout));
        settle(result)
    }
}

#[cfg(feature = "async")]
pub use nonblocking::{AsyncNarrator, narrate_with_timeout};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Stats;

    fn snapshot() -> NarrativeSnapshot {
        let ledger = Ledger::default().with_stats(Stats {
            satiety: 40.0,
            mood: 20.0,
            ..Stats::default()
        });
        NarrativeSnapshot::from_ledger(&ledger, &Catalog::default())
    }

    #[test]
    fn successful_line_is_trimmed() {
        let narrator = |_: &NarrativeSnapshot| -> Result<String, NarratorError> {
            Ok("  You stand at home.  ".to_string())
        };
        assert_eq!(describe(&narrator, &snapshot()), "You stand at home.");
    }

    #[test]
    fn empty_line_uses_empty_fallback() {
        let narrator =
            |_: &NarrativeSnapshot| -> Result<String, NarratorError> { Ok("   ".to_string()) };
        assert_eq!(describe(&narrator, &snapshot()), EMPTY_RESPONSE_FALLBACK);
    }

    #[test]
    fn errors_are_absorbed() {
        let narrator = |_: &NarrativeSnapshot| -> Result<String, NarratorError> {
            Err(NarratorError::Transport("connection reset".to_string()))
        };
        assert_eq!(describe(&narrator, &snapshot()), FAILURE_FALLBACK);
    }

    #[test]
    fn snapshot_uses_location_id_when_unnamed() {
        let snap = snapshot();
        assert_eq!(snap.location, "HOME");
        assert!((snap.mood - 20.0).abs() < f64::EPSILON);
        assert_eq!(snap.last_event, None);
    }

    #[cfg(feature = "async")]
    mod nonblocking {
        use super::*;
        use std::time::Duration;

        struct Slow;

        impl AsyncNarrator for Slow {
            async fn narrate(&self, _: &NarrativeSnapshot) -> Result<String, NarratorError> {
                tokio::time::sleep(Duration::from_millis(250)).await;
                Ok("too late".to_string())
            }
        }

        struct Quick;

        impl AsyncNarrator for Quick {
            async fn narrate(&self, snap: &NarrativeSnapshot) -> Result<String, NarratorError> {
                Ok(format!("You stand at {}.", snap.location))
            }
        }

        #[tokio::test]
        async fn timeout_falls_back() {
            let line = narrate_with_timeout(&Slow, &snapshot(), Duration::from_millis(10)).await;
            assert_eq!(line, FAILURE_FALLBACK);
        }

        #[tokio::test]
        async fn quick_narrator_passes_through() {
            let line = narrate_with_timeout(&Quick, &snapshot(), Duration::from_secs(1)).await;
            assert_eq!(line, "You stand at HOME.");
        }
    }
}
