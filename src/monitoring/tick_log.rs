use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;

use crate::control_system::mode_arbiter::ControlMode;
use crate::shared_data::{current_timestamp, Tick, TickReport};

/// One CSV row summarising a coordinator tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickLedgerRecord {
    pub tick: Tick,
    pub timestamp: u64,
    pub override_junctions: usize,
    pub policy_junctions: usize,
    pub density_junctions: usize,
    pub clearing_junctions: usize,
    pub deferred_requests: usize,
    pub retired_plans: usize,
    pub emergency_bonus: f64,
    pub emergency_penalty: f64,
    pub traffic_reward: f64,
    pub total_reward: f64,
}

impl TickLedgerRecord {
    pub fn from_report(report: &TickReport) -> Self {
        let count = |mode: ControlMode| report.signals.iter().filter(|s| s.mode == mode).count();
        Self {
            tick: report.tick,
            timestamp: current_timestamp(),
            override_junctions: count(ControlMode::GreenwaveOverride),
            policy_junctions: count(ControlMode::ExternalPolicy),
            density_junctions: count(ControlMode::Density),
            clearing_junctions: report.signals.iter().filter(|s| s.in_clearance).count(),
            deferred_requests: report.deferred.len(),
            retired_plans: report.retired.len(),
            emergency_bonus: report.reward.emergency_bonus,
            emergency_penalty: report.reward.emergency_penalty,
            traffic_reward: report.reward.traffic,
            total_reward: report.reward.total,
        }
    }
}

/// Appends a record to a CSV file, writing the header only when the file is new.
fn log_to_csv<T: Serialize>(path: &Path, record: &T) -> Result<(), Box<dyn Error>> {
    let file_exists = path.exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    wtr.serialize(record)?;
    wtr.flush()?;
    Ok(())
}

pub fn append_tick_record(path: impl AsRef<Path>, report: &TickReport) -> Result<(), Box<dyn Error>> {
    log_to_csv(path.as_ref(), &TickLedgerRecord::from_report(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow_analyzer::reward::RewardBreakdown;
    use crate::road_network::intersection::{JunctionId, PhaseId};
    use crate::shared_data::SignalOutput;
    use std::collections::BTreeMap;
    use std::fs;

    fn report(tick: Tick) -> TickReport {
        TickReport {
            tick,
            signals: vec![
                SignalOutput {
                    junction: JunctionId::new("A"),
                    phase: PhaseId(1),
                    state: "rG".into(),
                    mode: ControlMode::GreenwaveOverride,
                    in_clearance: false,
                },
                SignalOutput {
                    junction: JunctionId::new("B"),
                    phase: PhaseId(0),
                    state: "yr".into(),
                    mode: ControlMode::Density,
                    in_clearance: true,
                },
            ],
            overrides: BTreeMap::new(),
            deferred: Vec::new(),
            lifecycle: Vec::new(),
            retired: Vec::new(),
            rejected_requests: Vec::new(),
            reward: RewardBreakdown {
                emergency_bonus: 5.0,
                emergency_penalty: 0.0,
                traffic: -1.5,
                total: 3.5,
            },
        }
    }

    #[test]
    fn counts_modes_per_tick() {
        let record = TickLedgerRecord::from_report(&report(7));
        assert_eq!(record.tick, 7);
        assert_eq!(record.override_junctions, 1);
        assert_eq!(record.density_junctions, 1);
        assert_eq!(record.policy_junctions, 0);
        assert_eq!(record.clearing_junctions, 1);
        assert_eq!(record.total_reward, 3.5);
    }

    #[test]
    fn header_is_written_once() {
        let path = std::env::temp_dir().join(format!("tick_ledger_{}.csv", std::process::id()));
        let _ = fs::remove_file(&path);
        append_tick_record(&path, &report(1)).unwrap();
        append_tick_record(&path, &report(2)).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<TickLedgerRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.iter().map(|r| r.tick).collect::<Vec<_>>(), vec![1, 2]);
        let _ = fs::remove_file(&path);
    }
}
