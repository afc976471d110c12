pub mod reward;
pub mod traffic_analyzer;

pub use reward::{EmergencyStatus, RewardBreakdown, RewardConfig, RewardShaper};
pub use traffic_analyzer::{collect_traffic_data, ApproachStats, TrafficData};
