//! # Blogicum Core
//!
//! The domain layer of Blogicum.
//! This crate contains the blog's entities, the visibility and authorization
//! rules, and the list assembly service. It has zero infrastructure
//! dependencies: storage and authentication are reached through [`ports`].

pub mod domain;
pub mod error;
pub mod pagination;
pub mod policy;
pub mod ports;
pub mod services;

pub use error::DomainError;
pub use pagination::{PAGE_SIZE, Page, PageRequest};
pub use services::BlogService;
