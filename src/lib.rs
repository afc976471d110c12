// lib.rs
//
// Signal coordination engine: density and external-policy control for every
// junction, with greenwave overrides for detected emergency vehicles.

pub mod config;
pub mod control_system;
pub mod emergency;
pub mod engine;
pub mod error;
pub mod flow_analyzer;
pub mod global_variables;
pub mod monitoring;
pub mod road_network;
pub mod shared_data;
pub mod vehicles;

pub use config::CoordinatorConfig;
pub use engine::Coordinator;
pub use error::{ConfigError, Result};
