pub mod mode_arbiter;
pub mod policy;
pub mod traffic_light_controller;

pub use mode_arbiter::{ControlMode, ModeArbiter};
pub use policy::{HoldCurrentPolicy, LongestQueuePolicy, PolicyObservation, SignalPolicy};
pub use traffic_light_controller::{
    ControlInput, IntersectionController, SignalState, SignalTiming, TrafficLightController,
};
