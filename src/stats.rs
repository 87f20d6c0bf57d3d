//! Statistics tracking for the simulation.

use crate::field::{Channel, Field};
use crate::population::UpdateReport;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Channel value above which a cell counts as covered
pub const COVERAGE_THRESHOLD: f32 = 1.0;

/// Statistics snapshot for one rendered frame
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    /// Frames completed so far
    pub frame: u64,
    /// Population size
    pub agents: usize,
    /// Life-expiry respawns during this frame
    pub respawns: usize,
    /// Corrective resets of non-finite agents during this frame
    pub anomalies: usize,
    /// Mean of the average channel over the field
    pub mean_intensity: f32,
    /// Fraction of cells above [`COVERAGE_THRESHOLD`]
    pub coverage: f32,
    /// Frames per second (performance)
    pub frames_per_second: f32,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update from the field and this frame's accumulated report
    pub fn update(&mut self, field: &Field, agents: usize, report: UpdateReport) {
        self.agents = agents;
        self.respawns = report.respawns;
        self.anomalies = report.resets;
        self.mean_intensity = field.mean(Channel::Average);
        self.coverage = field.coverage(Channel::Average, COVERAGE_THRESHOLD);
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        let line = format!(
            "F:{:6} | Agents:{:6} | Mean:{:6.1} | Cover:{:5.1}% | Resp:{:4} | {:.0} fps",
            self.frame,
            self.agents,
            self.mean_intensity,
            self.coverage * 100.0,
            self.respawns,
            self.frames_per_second
        );
        if self.anomalies > 0 {
            format!("{} | Anomalies:{}", line, self.anomalies)
        } else {
            line
        }
    }
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    /// All recorded snapshots
    pub snapshots: Vec<FrameStats>,
    /// Recording interval in frames
    pub interval: u64,
}

impl StatsHistory {
    pub fn new(interval: u64) -> Self {
        Self {
            snapshots: Vec::new(),
            interval,
        }
    }

    pub fn record(&mut self, stats: FrameStats) {
        self.snapshots.push(stats);
    }

    /// Latest snapshot at or before `frame`
    pub fn get_at(&self, frame: u64) -> Option<&FrameStats> {
        self.snapshots.iter().rev().find(|s| s.frame <= frame)
    }

    pub fn intensity_series(&self) -> Vec<(u64, f32)> {
        self.snapshots
            .iter()
            .map(|s| (s.frame, s.mean_intensity))
            .collect()
    }

    pub fn coverage_series(&self) -> Vec<(u64, f32)> {
        self.snapshots.iter().map(|s| (s.frame, s.coverage)).collect()
    }

    /// Total corrective resets across recorded snapshots
    pub fn total_anomalies(&self) -> usize {
        self.snapshots.iter().map(|s| s.anomalies).sum()
    }

    /// Save history as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load history from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Blend;

    #[test]
    fn test_stats_update() {
        let mut field = Field::new(10, 10).unwrap();
        field.deposit(1.0, 1.0, [255.0; 4], Blend::Overwrite);
        let mut stats = FrameStats::new();
        stats.update(
            &field,
            7,
            UpdateReport {
                respawns: 2,
                resets: 1,
            },
        );

        assert_eq!(stats.agents, 7);
        assert_eq!(stats.respawns, 2);
        assert_eq!(stats.anomalies, 1);
        assert!((stats.coverage - 0.01).abs() < 1e-6);
        assert!((stats.mean_intensity - 2.55).abs() < 1e-4);
        assert!(stats.summary().contains("Anomalies:1"));
    }

    #[test]
    fn test_stats_history() {
        let mut history = StatsHistory::new(10);
        for i in 0..5 {
            let stats = FrameStats {
                frame: i * 10,
                coverage: i as f32 / 10.0,
                ..FrameStats::default()
            };
            history.record(stats);
        }

        let series = history.coverage_series();
        assert_eq!(series.len(), 5);
        assert_eq!(series[0], (0, 0.0));
        assert_eq!(series[4], (40, 0.4));
        assert_eq!(history.get_at(25).map(|s| s.frame), Some(20));
    }

    #[test]
    fn test_history_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");

        let mut history = StatsHistory::new(5);
        history.record(FrameStats {
            frame: 5,
            agents: 100,
            anomalies: 3,
            ..FrameStats::default()
        });
        history.save(&path).unwrap();

        let loaded = StatsHistory::load(&path).unwrap();
        assert_eq!(loaded.interval, 5);
        assert_eq!(loaded.snapshots, history.snapshots);
        assert_eq!(loaded.total_anomalies(), 3);
    }
}
