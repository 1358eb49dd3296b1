//! The `utils` module provides shared definitions used across the `homepost`
//! application: the centralized error types and logging initialization.

pub mod error;
pub mod logging;
