//! Integration tests for Doc-Harvest
//!
//! These tests use wiremock to stand in for document sites and the
//! retrieval backend, and tempfile for the data root and schedule.

mod extract_tests;
mod pipeline_tests;
