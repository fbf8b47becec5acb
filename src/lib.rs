//! docinsight - document layout analysis and text insight extraction.
//!
//! Submits documents to a layout analysis service, follows asynchronous jobs
//! to completion, reconstructs pages, forms and tables from the returned
//! blocks, and extracts per-page language insights from the page text.

pub mod analysis;
pub mod batch;
pub mod cli;
pub mod config;
pub mod document;
pub mod insights;
pub mod models;
pub mod output;
pub mod rate_limit;
pub mod report;
pub mod services;
