use crate::core::car_time::CarTime;
use crate::core::phase::RacePhase;
use crate::core::shared_state::CarStat;
use crate::error::SimError;
use crate::pre::reference::{create_semicolon_writer, read_records};
use anyhow::Context;
use std::path::{Path, PathBuf};

/// PhaseResultEntry is one line of a phase result: the pilot and its best times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseResultEntry {
    pub pilot_id: u32,
    pub best_lap: CarTime,
    pub best_section_times: [CarTime; 3],
}

impl From<&CarStat> for PhaseResultEntry {
    fn from(car_stat: &CarStat) -> Self {
        PhaseResultEntry {
            pilot_id: car_stat.pilot_id,
            best_lap: car_stat.best_lap,
            best_section_times: car_stat.best_section_times,
        }
    }
}

/// get_phase_result_path returns `race_<NN>_<tag>.csv` with NN the 1-based event number.
pub fn get_phase_result_path(data_dir: &Path, event_idx: usize, phase: RacePhase) -> PathBuf {
    data_dir.join(format!("race_{:02}_{}.csv", event_idx + 1, phase.short_tag()))
}

/// write_phase_result writes the entries in ranking order as
/// `pilotId;bestLap;bestS1;bestS2;bestS3`.
pub fn write_phase_result(filepath: &Path, entries: &[PhaseResultEntry]) -> anyhow::Result<()> {
    let mut writer = create_semicolon_writer(filepath, "phase result")?;

    for entry in entries.iter() {
        let [s1, s2, s3] = entry.best_section_times;
        writer.write_record([
            entry.pilot_id.to_string(),
            entry.best_lap.to_string(),
            s1.to_string(),
            s2.to_string(),
            s3.to_string(),
        ])?;
    }

    writer
        .flush()
        .context(format!("Failed to write phase result file {}!", filepath.display()))?;
    Ok(())
}

/// read_phase_result reads a phase result written by `write_phase_result`, keeping its order.
pub fn read_phase_result(filepath: &Path) -> anyhow::Result<Vec<PhaseResultEntry>> {
    read_records(
        filepath,
        "phase result",
        |(pilot_id, best_lap, s1, s2, s3): (u32, String, String, String, String), line| {
            let time = |raw: &str| {
                raw.parse::<CarTime>()
                    .map_err(|reason| SimError::parse(filepath, line, reason))
            };
            Ok(PhaseResultEntry {
                pilot_id,
                best_lap: time(&best_lap)?,
                best_section_times: [time(&s1)?, time(&s2)?, time(&s3)?],
            })
        },
    )
}
