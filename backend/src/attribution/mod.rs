//! Splits a model response into its labeled sections and estimates how much of
//! the answer came from the media itself versus web research.
//!
//! The split is a rule-based estimate driven by textual cues, not a measurement
//! of what the model actually used.

pub mod aggregator;
pub mod detector;
pub mod evidence;
pub mod scoring;
pub mod sections;

pub use aggregator::{AggregationError, Aggregator};
