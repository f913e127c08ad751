//! Cross-module tests for the clustering pipeline

mod determinism;
mod end_to_end;
