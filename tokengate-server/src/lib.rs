//! # tokengate server
//!
//! An edge request mediator that admits each client through a token bucket
//! and forwards admitted requests to an upstream time-data API.
//!
//! ## Quick Start
//!
//! ```bash
//! # Show all available options
//! tokengate --help
//!
//! # Forward to one upstream with the reference limits (burst 10, 1 token / 2s)
//! tokengate --upstream https://time.example.com
//!
//! # Fallback upstreams and a larger burst
//! tokengate --upstream https://a.example.com,https://b.example.com --bucket-size 20
//! ```
//!
//! ## Configuration
//!
//! Configure via CLI arguments or environment variables (CLI takes precedence):
//!
//! ```bash
//! export TOKENGATE_UPSTREAM=https://time.example.com
//! export TOKENGATE_PORT=9090
//! tokengate
//!
//! # List all available environment variables
//! tokengate --list-env-vars
//! ```
//!
//! ## Architecture
//!
//! ```text
//!    client ──► axum router ──► rate-limit middleware ──► proxy handler ──► upstream(s)
//!                                      │
//!                               AdmissionController
//!                             (sharded bucket store,
//!                               background sweep)
//! ```
//!
//! Limiting is per process. Several instances behind a load balancer each
//! enforce their own limits.
//!
//! ### Client Example
//!
//! ```bash
//! curl -i http://localhost:8080/api/timezone/Europe/London
//! ```

pub mod config;
pub mod identity;
pub mod transport;
pub mod types;
pub mod upstream;
