// Liveness and readiness probes

pub mod controllers;

pub use controllers::health_controller::{DatabaseProbe, ReadinessProbe};
