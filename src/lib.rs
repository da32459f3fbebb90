#![deny(missing_docs)]

//! Core library for chunkrelay: accept extraction submissions, run the matching extraction
//! strategy in the background, and deliver normalized chunks to the caller's callback URL in
//! ordered batches.

/// HTTP routing and intake handlers.
pub mod api;
/// Chunk model and validating builder.
pub mod chunk;
/// Environment-driven configuration management.
pub mod config;
/// Sequenced callback delivery.
pub mod delivery;
/// Extraction strategies and their registry.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Intake and pipeline counters.
pub mod metrics;
/// Background pipeline orchestration.
pub mod pipeline;
/// Request normalization and the schema-driven field accessor.
pub mod request;
