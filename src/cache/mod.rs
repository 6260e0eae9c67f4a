//! Result cache for crawl requests
//!
//! Crawl results are cached per logical request (see [`CacheKey`]) with a
//! time-to-live. Expiry is decided against an injectable [`Clock`] so tests
//! control time instead of sleeping.

mod clock;
mod key;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::CacheKey;
pub use store::{CacheEntry, CacheError, CacheHit, CacheStore};
