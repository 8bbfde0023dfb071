//! Pending-work tracking for the crawl
//!
//! This module holds the two shared structures that decide what gets fetched:
//! - [`Frontier`]: URLs waiting to be dispatched, removed in random order
//! - [`VisitedSet`]: every URL ever enqueued during this process, so a page is
//!   dispatched at most once per run

mod queue;
mod visited;

pub use queue::Frontier;
pub use visited::VisitedSet;
