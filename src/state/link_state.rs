/// Link state definitions for tracking subpage crawl progress
///
/// Every same-host link discovered on a page gets a `LinkCrawlState` in the
/// shared cache. The state decides whether a rediscovered link is queued again.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current status of a discovered link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    /// Link has been published as a subpage job and not yet finished
    Queued,

    /// Link page was loaded and run through the extraction pipeline
    Processed,

    /// Link page failed to load or extract
    Failed,
}

impl LinkStatus {
    /// Returns true if the link may be queued again when rediscovered
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Returns true if moving from this status to `next` is an expected transition
    ///
    /// Expected transitions are `queued -> processed`, `queued -> failed`
    /// and `failed -> queued` (a retry). Updates outside these are not recorded.
    pub fn can_transition_to(&self, next: LinkStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Processed)
                | (Self::Queued, Self::Failed)
                | (Self::Failed, Self::Queued)
        )
    }

    /// Converts the status to its serialized name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cached crawl state of a single link URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCrawlState {
    pub status: LinkStatus,

    /// How many times the link has been queued
    pub attempts: u32,

    /// Message of the last failure, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What to do with a link that was just discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDecision {
    /// Publish a subpage job and record the link as queued with this attempt count
    Enqueue { attempts: u32 },

    /// The link is queued or already processed
    AlreadyHandled(LinkStatus),

    /// The link failed too often and is never queued again
    Exhausted { attempts: u32 },
}

impl LinkCrawlState {
    /// State recorded when a link is published as a subpage job
    pub fn queued(attempts: u32) -> Self {
        Self {
            status: LinkStatus::Queued,
            attempts,
            error: None,
        }
    }

    /// State recorded after a page was extracted, keeping the attempt count
    pub fn processed(previous: Option<&LinkCrawlState>) -> Self {
        Self {
            status: LinkStatus::Processed,
            attempts: previous.map_or(0, |p| p.attempts),
            error: None,
        }
    }

    /// State recorded after a page failed, keeping the attempt count
    pub fn failed(previous: Option<&LinkCrawlState>, error: impl Into<String>) -> Self {
        Self {
            status: LinkStatus::Failed,
            attempts: previous.map_or(0, |p| p.attempts),
            error: Some(error.into()),
        }
    }

    /// Decides whether a rediscovered link should be queued
    ///
    /// # Arguments
    ///
    /// * `existing` - The cached state of the link, if any
    /// * `max_attempts` - Upper bound on the number of times a link is queued
    ///
    /// # Returns
    ///
    /// * `Enqueue { attempts: 1 }` for links never seen before
    /// * `Enqueue { attempts: n + 1 }` for failed links with `n + 1 <= max_attempts`
    /// * `Exhausted` for failed links past the bound
    /// * `AlreadyHandled` for queued or processed links
    pub fn decide(existing: Option<&LinkCrawlState>, max_attempts: u32) -> LinkDecision {
        match existing {
            None => LinkDecision::Enqueue { attempts: 1 },
            Some(state) if state.status.is_retryable() => {
                let attempts = state.attempts.saturating_add(1);
                if attempts > max_attempts {
                    LinkDecision::Exhausted {
                        attempts: state.attempts,
                    }
                } else {
                    LinkDecision::Enqueue { attempts }
                }
            }
            Some(state) => LinkDecision::AlreadyHandled(state.status),
        }
    }
}
