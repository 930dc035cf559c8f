//! # Shepherd API Server Library
//!
//! JSON API over the Shepherd core: sign-in, dashboard reports scoped to the
//! caller's place in the organization tree, leader provisioning and alerts.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
