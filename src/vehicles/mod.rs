pub mod lifecycle;
pub mod vehicle;

pub use lifecycle::{LifecycleEvent, VehicleLifecycleTracker};
pub use vehicle::{VehicleClass, VehicleId, VehicleRecord};
