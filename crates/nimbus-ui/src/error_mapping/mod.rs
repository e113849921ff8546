//! Maps provider and pipeline errors to nimbus_core::AppError for consistent
//! user-facing messages.

pub mod weather;
