//! Async helpers that don't belong to any one domain crate.
//!
//! Currently that's just [`SingleFlight`]: collapse concurrent requests for
//! the same key into one piece of work whose result every caller shares.

mod flight;

pub use crate::flight::{Flight, SingleFlight};
