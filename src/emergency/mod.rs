pub mod greenwave;
pub mod rsu;

pub use greenwave::{
    Deferral, EmergencyVehicleState, GreenwavePlan, GreenwavePlanner, OverrideSet, PlanEntry,
    ReconcileOutcome, RetireReason, Retirement,
};
pub use rsu::{Detection, RsuDetector};
