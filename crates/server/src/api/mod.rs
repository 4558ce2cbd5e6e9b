// HTTP API routes
//
// Each submodule owns one resource and exposes a `routes()` builder.

pub mod alarm;
pub mod common;
pub mod health;
pub mod register;

pub use common::{ApiError, ErrorResponse};
