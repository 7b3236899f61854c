//! Integration tests for Menu-Harvest
//!
//! Snapshot pages stand in for the browser, wiremock serves candidate files
//! and the in-memory or SQLite backends hold cache and queues.

mod common;
mod file_tests;
mod pipeline_tests;
mod storage_tests;
