use crate::error::SimError;
use anyhow::Context;
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::Path;

/// SectionBounds limits a section time to [min_s, max_s) seconds.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct SectionBounds {
    pub min_s: u32,
    pub max_s: u32,
}

/// SessionPars holds the tunable constants of a weekend simulation. Every field has a default,
/// so a parameter file only needs to list what it changes.
///
/// * `qualifying_crash_probability` - Crash probability per lap attempt in timed sessions
/// * `race_crash_probability` - Crash probability per section in sprint and race
/// * `race_distance_m` - (m) Target distance of the race
/// * `sprint_distance_m` - (m) Target distance of the sprint
/// * `practice_minutes` .. `sprint_qualifying_minutes` - Timed session durations
/// * `second_segment_cutoff` / `third_segment_cutoff` - Field size in Q2/SQ2 and Q3/SQ3
/// * `timed_section_bounds` / `race_section_bounds` - Allowed section times
/// * `pit_penalty_ms` - (ms) Pit stop penalty range [min, max)
/// * `stand_wait_minutes` - Stand wait range between timed runs, inclusive
/// * `grid_delay_ms` - (ms) Start delay added per grid position
/// * `publish_backoff_ms` - (ms, simulated) Retry backoff range while a slot is unconsumed
/// * `controller_poll_ms` - (ms, simulated) Controller sleep when no telemetry is pending
/// * `viewer_refresh_ms` - (ms, wall clock) Ranking refresh cadence
/// * `max_roster` / `max_events` - Upper bounds for the driver directory and the calendar
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionPars {
    pub qualifying_crash_probability: f64,
    pub race_crash_probability: f64,
    pub race_distance_m: u32,
    pub sprint_distance_m: u32,
    pub practice_minutes: u32,
    pub qualifying_minutes: [u32; 3],
    pub sprint_qualifying_minutes: [u32; 3],
    pub second_segment_cutoff: usize,
    pub third_segment_cutoff: usize,
    pub timed_section_bounds: SectionBounds,
    pub race_section_bounds: SectionBounds,
    pub pit_penalty_ms: [u32; 2],
    pub stand_wait_minutes: [u32; 2],
    pub grid_delay_ms: u32,
    pub publish_backoff_ms: [u32; 2],
    pub controller_poll_ms: u32,
    pub viewer_refresh_ms: u64,
    pub max_roster: usize,
    pub max_events: usize,
}

impl Default for SessionPars {
    fn default() -> Self {
        SessionPars {
            qualifying_crash_probability: 1.0 / 1000.0,
            race_crash_probability: 1.0 / 3000.0,
            race_distance_m: 300_000,
            sprint_distance_m: 100_000,
            practice_minutes: 60,
            qualifying_minutes: [18, 15, 12],
            sprint_qualifying_minutes: [12, 10, 8],
            second_segment_cutoff: 15,
            third_segment_cutoff: 10,
            timed_section_bounds: SectionBounds { min_s: 25, max_s: 44 },
            race_section_bounds: SectionBounds { min_s: 25, max_s: 45 },
            pit_penalty_ms: [15_000, 20_000],
            stand_wait_minutes: [1, 7],
            grid_delay_ms: 500,
            publish_backoff_ms: [1, 20],
            controller_poll_ms: 100,
            viewer_refresh_ms: 1000,
            max_roster: 20,
            max_events: 22,
        }
    }
}

impl SessionPars {
    /// validate checks the cross-field requirements that serde cannot express.
    pub fn validate(&self) -> Result<(), SimError> {
        for (name, p) in [
            ("qualifying_crash_probability", self.qualifying_crash_probability),
            ("race_crash_probability", self.race_crash_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimError::InvalidParameter(format!(
                    "{} must be within [0, 1], but is {}",
                    name, p
                )));
            }
        }
        for (name, bounds) in [
            ("timed_section_bounds", self.timed_section_bounds),
            ("race_section_bounds", self.race_section_bounds),
        ] {
            if bounds.min_s >= bounds.max_s {
                return Err(SimError::InvalidParameter(format!(
                    "{} must satisfy min_s < max_s",
                    name
                )));
            }
        }
        for (name, range) in [
            ("pit_penalty_ms", self.pit_penalty_ms),
            ("publish_backoff_ms", self.publish_backoff_ms),
        ] {
            if range[0] >= range[1] {
                return Err(SimError::InvalidParameter(format!(
                    "{} must be an increasing [min, max) range",
                    name
                )));
            }
        }
        if self.stand_wait_minutes[0] > self.stand_wait_minutes[1] {
            return Err(SimError::InvalidParameter(
                "stand_wait_minutes must satisfy min <= max".to_owned(),
            ));
        }
        if self.race_distance_m == 0 || self.sprint_distance_m == 0 {
            return Err(SimError::InvalidParameter(
                "race and sprint distances must be positive".to_owned(),
            ));
        }
        if self.third_segment_cutoff > self.second_segment_cutoff {
            return Err(SimError::InvalidParameter(
                "third_segment_cutoff must not exceed second_segment_cutoff".to_owned(),
            ));
        }
        Ok(())
    }
}

/// read_session_pars reads the JSON file and decodes it into the session parameters struct.
pub fn read_session_pars(filepath: &Path) -> anyhow::Result<SessionPars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open session parameter file {}!",
            filepath.display()
        ))?;
    let pars: SessionPars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse session parameter file {}!",
        filepath.display()
    ))?;
    pars.validate()?;
    Ok(pars)
}
