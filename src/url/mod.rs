//! URL handling module for Job Harvester
//!
//! This module provides listing-URL normalization, relative link resolution,
//! search-URL construction and the trailing-numeric id heuristic.

mod normalize;
mod search;

pub use normalize::{normalize_url, resolve_link};
pub use search::{build_search_url, trailing_numeric_id, SearchEndpoint};
