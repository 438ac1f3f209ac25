use crate::core::car_time::CarTime;
use crate::core::phase::RacePhase;
use std::fmt;

/// Gap is the distance between a car and a reference car (the one ahead or the leader).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gap {
    /// Reference car itself, inactive car or not enough data yet
    #[default]
    None,
    Time(CarTime),
    /// Trailing car is not behind in time anymore and about to overtake
    Overtaking,
    Laps(u32),
    /// Car crashed
    Out,
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Gap::None => f.pad(""),
            Gap::Time(t) => f.pad(&format!("+{}", t)),
            Gap::Overtaking => f.pad("over"),
            Gap::Laps(1) => f.pad("1 lap"),
            Gap::Laps(n) => f.pad(&format!("{} laps", n)),
            Gap::Out => f.pad("--OUT--"),
        }
    }
}

/// PositionChange compares a car's position with the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionChange {
    Same,
    Up,
    Down,
    /// Car does not take part in the phase
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Running,
    InStand,
    Out,
}

/// RankedRow is one line of the live ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedRow {
    pub pilot_id: u32,
    pub compl_laps: u32,
    pub distance: u32,
    pub total_time: CarTime,
    pub current_section_times: [CarTime; 3],
    pub best_section_times: [CarTime; 3],
    pub best_lap: CarTime,
    pub pit_stop_count: u32,
    pub status: RowStatus,
    pub gap_ahead: Gap,
    pub gap_leader: Gap,
    pub change: PositionChange,
    pub best_lap_highlight: bool,
    pub best_section_highlight: [bool; 3],
}

/// ScreenSnapshot is what the screen manager hands over to a renderer. `final_view` is set on the
/// snapshot taken after all workers stopped and all telemetry was integrated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenSnapshot {
    pub phase: RacePhase,
    pub race_mode: bool,
    pub active: usize,
    pub rows: Vec<RankedRow>,
    pub final_view: bool,
}

impl ScreenSnapshot {
    pub fn get_order(&self) -> Vec<u32> {
        self.rows.iter().map(|row| row.pilot_id).collect()
    }
}

/// Renderer draws snapshots. Layout, colors and cursor handling are up to the implementation.
pub trait Renderer {
    fn render(&mut self, snapshot: &ScreenSnapshot) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_display() {
        assert_eq!(Gap::Time(CarTime::from_millis(1_250)).to_string(), "+1.250");
        assert_eq!(Gap::Laps(1).to_string(), "1 lap");
        assert_eq!(Gap::Laps(3).to_string(), "3 laps");
        assert_eq!(Gap::Out.to_string(), "--OUT--");
        assert_eq!(format!("{:>8}", Gap::Overtaking), "    over");
    }
}
