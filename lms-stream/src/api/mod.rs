//! HTTP API handlers for lms-stream

pub mod buildinfo;
pub mod health;
pub mod identity;
pub mod modules;
pub mod sse;
pub mod stream;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use identity::StudentId;
pub use modules::{create_module, replace_module_content};
pub use sse::event_stream;
pub use stream::{advance_module_stream, get_module_stream};
