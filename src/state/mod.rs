//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PaginationPhase`: phase of the per-site pagination state machine
//! - `TerminationReason`: why a site crawl stopped requesting pages
//! - `PaginationState`: page counter and accumulated listings of one crawl

mod pagination;

pub use pagination::{PaginationPhase, PaginationState, TerminationReason};
