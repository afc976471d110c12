use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::road_network::intersection::JunctionId;

/// Who decides a junction's next phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Adaptive timing from approach vehicle counts.
    Density,
    /// Phase choice delegated to the external policy.
    ExternalPolicy,
    /// Phase forced by an active greenwave plan.
    GreenwaveOverride,
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ControlMode::Density => write!(f, "density"),
            ControlMode::ExternalPolicy => write!(f, "external_policy"),
            ControlMode::GreenwaveOverride => write!(f, "greenwave_override"),
        }
    }
}

/// Per-junction mode state machine.
///
/// Override entry and exit are immediate. Switching between the two
/// peacetime modes requires the proximity predicate to disagree with the
/// current mode for `debounce_ticks` consecutive ticks. The debounce is frozen
/// while overridden, and the junction returns to the mode it had on entry.
#[derive(Debug, Clone)]
pub struct ModeArbiter {
    junction: JunctionId,
    mode: ControlMode,
    resume: ControlMode,
    debounce_ticks: u32,
    streak: u32,
}

impl ModeArbiter {
    pub fn new(junction: JunctionId, debounce_ticks: u32) -> Self {
        Self {
            junction,
            mode: ControlMode::Density,
            resume: ControlMode::Density,
            debounce_ticks: debounce_ticks.max(1),
            streak: 0,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Advances the state machine by one tick.
    ///
    /// `overridden`: the planner's override set names this junction.
    /// `emergency_nearby`: an active emergency vehicle is within the proximity radius.
    pub fn step(&mut self, overridden: bool, emergency_nearby: bool) -> ControlMode {
        if overridden {
            if self.mode != ControlMode::GreenwaveOverride {
                info!(
                    "Junction {} entering greenwave override (was {})",
                    self.junction, self.mode
                );
                self.resume = self.mode;
                self.mode = ControlMode::GreenwaveOverride;
                self.streak = 0;
            }
            return self.mode;
        }

        if self.mode == ControlMode::GreenwaveOverride {
            info!(
                "Junction {} leaving greenwave override, back to {}",
                self.junction, self.resume
            );
            self.mode = self.resume;
        }

        let wanted = if emergency_nearby {
            ControlMode::ExternalPolicy
        } else {
            ControlMode::Density
        };
        if wanted == self.mode {
            self.streak = 0;
        } else {
            self.streak += 1;
            if self.streak >= self.debounce_ticks {
                info!("Junction {} switching {} -> {}", self.junction, self.mode, wanted);
                self.mode = wanted;
                self.streak = 0;
            }
        }
        self.mode
    }
}
