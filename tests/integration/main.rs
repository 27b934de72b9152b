//! Integration tests for the staged crawl pipeline

mod pipeline_tests;
mod support;
