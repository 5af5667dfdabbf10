//! qte-daemon library target.
//!
//! Exposes the controller and router for integration tests. The binary
//! `main.rs` depends on this library target.

pub mod api_types;
pub mod controller;
pub mod routes;
