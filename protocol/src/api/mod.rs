//! API DTOs module
//!
//! This module contains the data transfer objects of the auth endpoints:
//! - `auth`: login, registration, token refresh
//! - `envelope`: the uniform response envelope

pub mod auth;
pub mod envelope;

pub use auth::*;
pub use envelope::*;
