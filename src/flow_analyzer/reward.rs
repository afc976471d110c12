use serde::{Deserialize, Serialize};

use crate::flow_analyzer::traffic_analyzer::TrafficData;
use crate::global_variables::*;
use crate::vehicles::vehicle::VehicleId;

/// Tunable reward constants. Magnitudes are operational tuning, not correctness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Emergency vehicles faster than this earn the bonus.
    pub emergency_fast_speed_mps: f64,
    /// Emergency vehicles slower than this are penalised.
    pub emergency_slow_speed_mps: f64,
    /// Emergency vehicles waiting longer than this are penalised.
    pub emergency_max_wait_s: f64,
    pub emergency_bonus: f64,
    pub emergency_penalty: f64,
    pub halted_weight: f64,
    pub waiting_weight: f64,
    pub speed_weight: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            emergency_fast_speed_mps: DEFAULT_EMERGENCY_FAST_SPEED_MPS,
            emergency_slow_speed_mps: DEFAULT_EMERGENCY_SLOW_SPEED_MPS,
            emergency_max_wait_s: DEFAULT_EMERGENCY_MAX_WAIT_S,
            emergency_bonus: DEFAULT_EMERGENCY_BONUS,
            emergency_penalty: DEFAULT_EMERGENCY_PENALTY,
            halted_weight: DEFAULT_HALTED_WEIGHT,
            waiting_weight: DEFAULT_WAITING_WEIGHT,
            speed_weight: DEFAULT_SPEED_WEIGHT,
        }
    }
}

/// Kinematic state of one active emergency vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencyStatus {
    pub vehicle: VehicleId,
    pub speed: f64,
    pub waiting_time: f64,
}

/// Reward decomposed into its terms; `total` is their sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    /// Sum of positive emergency contributions.
    pub emergency_bonus: f64,
    /// Sum of negative emergency contributions (zero or below).
    pub emergency_penalty: f64,
    /// Ordinary-traffic term.
    pub traffic: f64,
    pub total: f64,
}

/// Stateless scalar signal for an external policy or evaluation harness.
#[derive(Debug, Clone, Default)]
pub struct RewardShaper {
    pub config: RewardConfig,
}

impl RewardShaper {
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }

    /// Fast emergency vehicles earn the bonus; slow or long-waiting ones cost
    /// the penalty; anything in between contributes nothing. Ordinary traffic
    /// adds a smaller term penalising halts and waiting and rewarding speed.
    pub fn evaluate(&self, traffic: &TrafficData, emergencies: &[EmergencyStatus]) -> RewardBreakdown {
        let c = &self.config;
        let mut breakdown = RewardBreakdown::default();

        for ev in emergencies {
            if ev.speed < c.emergency_slow_speed_mps || ev.waiting_time > c.emergency_max_wait_s {
                breakdown.emergency_penalty -= c.emergency_penalty;
            } else if ev.speed > c.emergency_fast_speed_mps {
                breakdown.emergency_bonus += c.emergency_bonus;
            }
        }

        let totals = traffic.network_totals();
        breakdown.traffic = c.speed_weight * totals.mean_speed()
            - c.halted_weight * totals.halted as f64
            - c.waiting_weight * totals.total_wait;

        breakdown.total = breakdown.emergency_bonus + breakdown.emergency_penalty + breakdown.traffic;
        breakdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow_analyzer::traffic_analyzer::ApproachStats;
    use crate::road_network::lane::EdgeId;

    fn ev(speed: f64, wait: f64) -> EmergencyStatus {
        EmergencyStatus {
            vehicle: VehicleId::new("amb"),
            speed,
            waiting_time: wait,
        }
    }

    #[test]
    fn emergency_regimes() {
        let shaper = RewardShaper::default();
        let empty = TrafficData::default();
        assert_eq!(shaper.evaluate(&empty, &[ev(12.0, 0.0)]).total, 50.0);
        assert_eq!(shaper.evaluate(&empty, &[ev(1.0, 0.0)]).total, -50.0);
        assert_eq!(shaper.evaluate(&empty, &[ev(12.0, 9.0)]).total, -50.0);
        assert_eq!(shaper.evaluate(&empty, &[ev(5.0, 0.0)]).total, 0.0);
    }

    #[test]
    fn terms_add_up() {
        let shaper = RewardShaper::default();
        let mut traffic = TrafficData::default();
        traffic.approaches.insert(
            EdgeId::new("a"),
            ApproachStats {
                vehicles: 4,
                halted: 2,
                speed_sum: 20.0,
                total_wait: 10.0,
                emergency: 0,
            },
        );
        let r = shaper.evaluate(&traffic, &[ev(12.0, 0.0), ev(0.0, 20.0)]);
        assert_eq!(r.emergency_bonus, 50.0);
        assert_eq!(r.emergency_penalty, -50.0);
        // 0.2 * 5.0 - 1.0 * 2 - 0.1 * 10.0
        assert!((r.traffic - (-2.0)).abs() < 1e-9);
        assert!((r.total - r.traffic).abs() < 1e-9);
        assert!(r.emergency_bonus.abs() > r.traffic.abs());
    }

    #[test]
    fn evaluation_has_no_side_effects() {
        let shaper = RewardShaper::default();
        let traffic = TrafficData::default();
        let evs = [ev(3.0, 1.0)];
        assert_eq!(shaper.evaluate(&traffic, &evs), shaper.evaluate(&traffic, &evs));
    }
}
