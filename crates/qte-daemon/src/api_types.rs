//! Request and response types for every qte-daemon HTTP endpoint.
//!
//! These types are `Serialize`/`Deserialize` so Axum can encode/decode them
//! directly; no business logic lives here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

/// Response body when a control command is refused by a gate check (e.g.
/// `start`/`resume` while the emergency stop is latched).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateRefusedResponse {
    pub error: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverrideLossLimitRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
