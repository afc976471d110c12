// Detection
pub const DEFAULT_RSU_RADIUS_M: f64 = 50.0;
pub const DEFAULT_PROXIMITY_RADIUS_M: f64 = 150.0;

// Greenwave planning
pub const DEFAULT_LOOKAHEAD_JUNCTIONS: usize = 5;
pub const DEFAULT_REDETECTION_TIMEOUT_TICKS: u64 = 10;

// Mode arbitration
pub const DEFAULT_DEBOUNCE_TICKS: u32 = 2;

// Signal timing (ticks)
pub const DEFAULT_CLEARANCE_TICKS: u32 = 3;
pub const DEFAULT_OVERRIDE_CLEARANCE_TICKS: u32 = 2;
pub const DEFAULT_MIN_HOLD_TICKS: u32 = 5;
pub const DEFAULT_MAX_HOLD_TICKS: u32 = 40;

// Density thresholds (vehicles on the green approaches)
pub const DEFAULT_DENSITY_LOW: f64 = 2.0;
pub const DEFAULT_DENSITY_HIGH: f64 = 8.0;

/// Below this speed a vehicle counts as halted.
pub const DEFAULT_HALTING_SPEED_MPS: f64 = 0.1;

// Reward shaping
pub const DEFAULT_EMERGENCY_FAST_SPEED_MPS: f64 = 8.0;
pub const DEFAULT_EMERGENCY_SLOW_SPEED_MPS: f64 = 2.0;
pub const DEFAULT_EMERGENCY_MAX_WAIT_S: f64 = 5.0;
pub const DEFAULT_EMERGENCY_BONUS: f64 = 50.0;
pub const DEFAULT_EMERGENCY_PENALTY: f64 = 50.0;
pub const DEFAULT_HALTED_WEIGHT: f64 = 1.0;
pub const DEFAULT_WAITING_WEIGHT: f64 = 0.1;
pub const DEFAULT_SPEED_WEIGHT: f64 = 0.2;
