use crate::core::car_time::CarTime;
use crate::pre::read_sim_pars::SessionPars;
use std::fmt;

/// RacePhase is one segment of a race weekend. The numeric values are the ones stored in the
/// championship progress file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RacePhase {
    StartOfWeekend,
    Practice1,
    Practice2,
    Practice3,
    Qualifying1,
    Qualifying2,
    Qualifying3,
    SprintQualifying1,
    SprintQualifying2,
    SprintQualifying3,
    Sprint,
    Race,
    Finish,
}

/// SessionKind selects how the car workers drive a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// No simulation (weekend boundaries)
    Idle,
    /// Practice and qualifying: free runs until the session clock expires
    Timed,
    /// Sprint and race: a fixed lap count, first car over the line ends it
    Race,
}

const PLAIN_WEEKEND: [RacePhase; 9] = [
    RacePhase::StartOfWeekend,
    RacePhase::Practice1,
    RacePhase::Practice2,
    RacePhase::Practice3,
    RacePhase::Qualifying1,
    RacePhase::Qualifying2,
    RacePhase::Qualifying3,
    RacePhase::Race,
    RacePhase::Finish,
];

const SPRINT_WEEKEND: [RacePhase; 11] = [
    RacePhase::StartOfWeekend,
    RacePhase::Practice1,
    RacePhase::SprintQualifying1,
    RacePhase::SprintQualifying2,
    RacePhase::SprintQualifying3,
    RacePhase::Sprint,
    RacePhase::Qualifying1,
    RacePhase::Qualifying2,
    RacePhase::Qualifying3,
    RacePhase::Race,
    RacePhase::Finish,
];

const RACE_POINTS: [u32; 10] = [25, 20, 15, 10, 8, 6, 5, 3, 2, 1];

impl RacePhase {
    pub const ALL: [RacePhase; 13] = [
        RacePhase::StartOfWeekend,
        RacePhase::Practice1,
        RacePhase::Practice2,
        RacePhase::Practice3,
        RacePhase::Qualifying1,
        RacePhase::Qualifying2,
        RacePhase::Qualifying3,
        RacePhase::SprintQualifying1,
        RacePhase::SprintQualifying2,
        RacePhase::SprintQualifying3,
        RacePhase::Sprint,
        RacePhase::Race,
        RacePhase::Finish,
    ];

    /// lattice returns the ordered phases of a weekend.
    pub fn lattice(includes_sprint: bool) -> &'static [RacePhase] {
        if includes_sprint {
            &SPRINT_WEEKEND
        } else {
            &PLAIN_WEEKEND
        }
    }

    /// get_next_phase returns the successor within the weekend's lattice. Phases that are not part
    /// of the lattice, and `Finish` itself, lead to `Finish`.
    pub fn get_next_phase(self, includes_sprint: bool) -> RacePhase {
        let lattice = RacePhase::lattice(includes_sprint);
        lattice
            .iter()
            .position(|&p| p == self)
            .and_then(|idx| lattice.get(idx + 1).copied())
            .unwrap_or(RacePhase::Finish)
    }

    /// get_previous_phase returns the predecessor within the weekend's lattice, None for
    /// `StartOfWeekend` and for phases outside the lattice.
    pub fn get_previous_phase(self, includes_sprint: bool) -> Option<RacePhase> {
        let lattice = RacePhase::lattice(includes_sprint);
        let idx = lattice.iter().position(|&p| p == self)?;
        idx.checked_sub(1).map(|prev| lattice[prev])
    }

    pub fn enum_value(self) -> u32 {
        match self {
            RacePhase::StartOfWeekend => 0,
            RacePhase::Practice1 => 1,
            RacePhase::Practice2 => 2,
            RacePhase::Practice3 => 3,
            RacePhase::Qualifying1 => 4,
            RacePhase::Qualifying2 => 5,
            RacePhase::Qualifying3 => 6,
            RacePhase::SprintQualifying1 => 7,
            RacePhase::SprintQualifying2 => 8,
            RacePhase::SprintQualifying3 => 9,
            RacePhase::Sprint => 10,
            RacePhase::Race => 11,
            RacePhase::Finish => 99,
        }
    }

    pub fn from_enum_value(value: u32) -> Option<RacePhase> {
        RacePhase::ALL.iter().copied().find(|p| p.enum_value() == value)
    }

    pub fn long_name(self) -> &'static str {
        match self {
            RacePhase::StartOfWeekend => "Start of week-end",
            RacePhase::Practice1 => "Free Practice 1",
            RacePhase::Practice2 => "Free Practice 2",
            RacePhase::Practice3 => "Free Practice 3",
            RacePhase::Qualifying1 => "Qualifying 1",
            RacePhase::Qualifying2 => "Qualifying 2",
            RacePhase::Qualifying3 => "Qualifying 3",
            RacePhase::SprintQualifying1 => "Sprint qualifying 1",
            RacePhase::SprintQualifying2 => "Sprint qualifying 2",
            RacePhase::SprintQualifying3 => "Sprint qualifying 3",
            RacePhase::Sprint => "Sprint",
            RacePhase::Race => "Race",
            RacePhase::Finish => "Finish",
        }
    }

    /// short_tag is the phase part of result file names.
    pub fn short_tag(self) -> &'static str {
        match self {
            RacePhase::StartOfWeekend => "start",
            RacePhase::Practice1 => "F1",
            RacePhase::Practice2 => "F2",
            RacePhase::Practice3 => "F3",
            RacePhase::Qualifying1 => "Q1",
            RacePhase::Qualifying2 => "Q2",
            RacePhase::Qualifying3 => "Q3",
            RacePhase::SprintQualifying1 => "SQ1",
            RacePhase::SprintQualifying2 => "SQ2",
            RacePhase::SprintQualifying3 => "SQ3",
            RacePhase::Sprint => "sprint",
            RacePhase::Race => "race",
            RacePhase::Finish => "finish",
        }
    }

    pub fn session_kind(self) -> SessionKind {
        match self {
            RacePhase::StartOfWeekend | RacePhase::Finish => SessionKind::Idle,
            RacePhase::Sprint | RacePhase::Race => SessionKind::Race,
            _ => SessionKind::Timed,
        }
    }

    /// is_race_mode is true for the phases ranked by distance and total time.
    pub fn is_race_mode(self) -> bool {
        self.session_kind() == SessionKind::Race
    }

    /// is_scoring is true for the phases that award championship points.
    pub fn is_scoring(self) -> bool {
        matches!(self, RacePhase::Sprint | RacePhase::Race)
    }

    /// starts_from_directory is true for the phases whose starting order is the driver directory
    /// order rather than the result of the previous phase.
    pub fn starts_from_directory(self) -> bool {
        matches!(
            self,
            RacePhase::Practice1
                | RacePhase::Practice2
                | RacePhase::Practice3
                | RacePhase::Qualifying1
                | RacePhase::SprintQualifying1
        )
    }

    /// active_participants returns how many cars of the roster take part in the phase.
    pub fn active_participants(self, roster: usize, pars: &SessionPars) -> usize {
        match self {
            RacePhase::Qualifying2 | RacePhase::SprintQualifying2 => {
                roster.min(pars.second_segment_cutoff)
            }
            RacePhase::Qualifying3 | RacePhase::SprintQualifying3 => {
                roster.min(pars.third_segment_cutoff)
            }
            _ => roster,
        }
    }

    /// session_duration returns the simulated length of a timed session.
    pub fn session_duration(self, pars: &SessionPars) -> Option<CarTime> {
        let minutes = match self {
            RacePhase::Practice1 | RacePhase::Practice2 | RacePhase::Practice3 => {
                pars.practice_minutes
            }
            RacePhase::Qualifying1 => pars.qualifying_minutes[0],
            RacePhase::Qualifying2 => pars.qualifying_minutes[1],
            RacePhase::Qualifying3 => pars.qualifying_minutes[2],
            RacePhase::SprintQualifying1 => pars.sprint_qualifying_minutes[0],
            RacePhase::SprintQualifying2 => pars.sprint_qualifying_minutes[1],
            RacePhase::SprintQualifying3 => pars.sprint_qualifying_minutes[2],
            _ => return None,
        };
        Some(CarTime::from_secs(minutes * 60))
    }

    /// required_laps returns the lap count of a sprint or race: the target distance divided by the
    /// track length, rounded up.
    pub fn required_laps(self, track_length_m: u32, pars: &SessionPars) -> Option<u32> {
        let distance_m = match self {
            RacePhase::Sprint => pars.sprint_distance_m,
            RacePhase::Race => pars.race_distance_m,
            _ => return None,
        };
        if track_length_m == 0 {
            return None;
        }
        Some(distance_m.div_ceil(track_length_m))
    }

    /// score returns the championship points for a 0-indexed finishing position.
    pub fn score(self, position: usize) -> u32 {
        match self {
            RacePhase::Race => RACE_POINTS.get(position).copied().unwrap_or(0),
            RacePhase::Sprint if position < 7 => 8 - position as u32,
            _ => 0,
        }
    }
}

impl fmt::Display for RacePhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.long_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_phase_follows_weekend_type() {
        assert_eq!(RacePhase::Practice3.get_next_phase(false), RacePhase::Qualifying1);
        assert_eq!(RacePhase::Practice1.get_next_phase(true), RacePhase::SprintQualifying1);
        assert_eq!(RacePhase::Sprint.get_next_phase(true), RacePhase::Qualifying1);
        assert_eq!(RacePhase::Race.get_next_phase(false), RacePhase::Finish);
        assert_eq!(RacePhase::Race.get_next_phase(true), RacePhase::Finish);
        assert_eq!(RacePhase::Practice2.get_next_phase(true), RacePhase::Finish);
    }

    #[test]
    fn previous_phase_inverts_next_phase() {
        for includes_sprint in [false, true] {
            let lattice = RacePhase::lattice(includes_sprint);
            for pair in lattice.windows(2) {
                assert_eq!(pair[0].get_next_phase(includes_sprint), pair[1]);
                assert_eq!(pair[1].get_previous_phase(includes_sprint), Some(pair[0]));
            }
            assert_eq!(RacePhase::StartOfWeekend.get_previous_phase(includes_sprint), None);
        }
        assert_eq!(RacePhase::Qualifying1.get_previous_phase(true), Some(RacePhase::Sprint));
        assert_eq!(RacePhase::Qualifying1.get_previous_phase(false), Some(RacePhase::Practice3));
    }

    #[test]
    fn race_points_table() {
        let points: Vec<u32> = (0..12).map(|pos| RacePhase::Race.score(pos)).collect();
        assert_eq!(points, vec![25, 20, 15, 10, 8, 6, 5, 3, 2, 1, 0, 0]);
    }

    #[test]
    fn sprint_points_table() {
        let points: Vec<u32> = (0..9).map(|pos| RacePhase::Sprint.score(pos)).collect();
        assert_eq!(points, vec![8, 7, 6, 5, 4, 3, 2, 0, 0]);
        assert_eq!(RacePhase::Qualifying3.score(0), 0);
    }

    #[test]
    fn enum_values_round_trip() {
        for phase in RacePhase::ALL {
            assert_eq!(RacePhase::from_enum_value(phase.enum_value()), Some(phase));
        }
        assert_eq!(RacePhase::from_enum_value(42), None);
    }

    #[test]
    fn participants_and_laps() {
        let pars = SessionPars::default();
        assert_eq!(RacePhase::Qualifying1.active_participants(20, &pars), 20);
        assert_eq!(RacePhase::Qualifying2.active_participants(20, &pars), 15);
        assert_eq!(RacePhase::SprintQualifying3.active_participants(20, &pars), 10);
        assert_eq!(RacePhase::Qualifying3.active_participants(6, &pars), 6);
        assert_eq!(RacePhase::Race.required_laps(5_000, &pars), Some(60));
        assert_eq!(RacePhase::Race.required_laps(5_793, &pars), Some(52));
        assert_eq!(RacePhase::Sprint.required_laps(5_793, &pars), Some(18));
        assert_eq!(RacePhase::Qualifying1.required_laps(5_793, &pars), None);
        assert_eq!(
            RacePhase::Qualifying1.session_duration(&pars),
            Some(CarTime::from_secs(18 * 60))
        );
    }

    #[test]
    fn lap_count_handles_extreme_track_lengths() {
        let pars = SessionPars::default();
        assert_eq!(RacePhase::Race.required_laps(u32::MAX, &pars), Some(1));
        assert_eq!(RacePhase::Sprint.required_laps(u32::MAX - 1, &pars), Some(1));
        assert_eq!(RacePhase::Race.required_laps(pars.race_distance_m, &pars), Some(1));
        assert_eq!(RacePhase::Race.required_laps(1, &pars), Some(pars.race_distance_m));
        assert_eq!(RacePhase::Race.required_laps(0, &pars), None);
    }
}
