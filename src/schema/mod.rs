//! sighting.record.v1 wire schema
//!
//! This module defines the input format for sightings as supplied by the
//! upstream subject lookup, including the legacy extended-JSON date wrapper.

mod adapter;
mod record;

pub use adapter::*;
pub use record::*;
