//! Concurrent Redis version reconnaissance: parse targets, drain a shared
//! task queue with a bounded worker pool, classify each probe outcome.
pub mod cli;
pub mod output;
pub mod probe;
pub mod target;
