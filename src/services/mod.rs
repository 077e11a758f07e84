// src/services/mod.rs
//
// Clients for external services used by the domain modules

pub mod google;
