//! Library crate for httpxray-rs exposing reusable modules.
pub mod analyzer;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod report;
pub mod scanner;
pub mod sink;
pub mod types;
