//! State module for tracking extraction progress
//!
//! # Components
//!
//! - `LinkStatus` / `LinkCrawlState`: Tracks discovered links and their retry budget
//! - `ExtractionMethod` / `ExtractionStrategy`: The method remembered per hostname
//! - `StateCache`: Typed access to both in the shared cache

mod link_state;
mod store;
mod strategy;

// Re-export main types
pub use link_state::{LinkCrawlState, LinkDecision, LinkStatus};
pub use store::{link_key, strategy_key, StateCache, LINK_PREFIX, STRATEGY_PREFIX};
pub use strategy::{ExtractionMethod, ExtractionStrategy};
