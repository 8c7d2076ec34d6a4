//! # Blogicum Shared
//!
//! Wire types of the Blogicum JSON API: request and response DTOs and the
//! RFC 7807 error body.

pub mod dto;
pub mod response;

pub use response::{ErrorResponse, FieldError};
