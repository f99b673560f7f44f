//! Transport layer for the edge mediator
//!
//! # Available Transports
//!
//! - [`http`]: axum router with rate-limit middleware and upstream pass-through

pub mod http;
