//! # Roles Module
//!
//! Named roles with a description, managed over bearer-gated CRUD routes.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;


pub use routes::roles_routes;
