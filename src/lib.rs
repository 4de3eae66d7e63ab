// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod curate;
pub mod engine;
pub mod error;
pub mod gate;
pub mod health;
pub mod ingest;
pub mod metrics;
pub mod render;
pub mod scheduler;
pub mod search;
pub mod settings;
pub mod store;

// `civic_news_curator::router` as well as `civic_news_curator::api::router`
pub use crate::api::router;
pub use crate::engine::NewsEngine;
pub use crate::error::NewsError;
