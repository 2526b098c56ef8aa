//! # LMS Common Library
//!
//! Shared code for the learning-platform services:
//! - Database initialization, schema and migrations
//! - Event types (`LmsEvent`) and the broadcast `EventBus`
//! - Configuration loading and root folder resolution
//! - SSE and timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
