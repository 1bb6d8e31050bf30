// Test helpers shared by the integration and unit targets.
//
// Everything runs against the in-memory repositories and a scripted gateway,
// so no database or network is needed.
//
// Usage:
//   #[path = "../helpers/mod.rs"]
//   mod helpers;
//   use helpers::*;

#![allow(dead_code)]

pub mod harness;
pub mod test_data;

pub use fake_gateway::*;
pub use harness::*;
pub use test_data::*;
