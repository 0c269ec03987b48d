//! HTTP API handlers for autodiag-api

pub mod guided;
pub mod health;

pub use guided::guided_routes;
pub use health::health_routes;
