//! Crate-level tests for the query pipeline.

pub(crate) mod support;

mod pipeline;
