use crate::core::phase::RacePhase;
use crate::core::shared_state::CarStat;
use crate::error::SimError;
use crate::pre::reference::{create_semicolon_writer, read_records, DriverDirectory};
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::debug;

/// ScoredEntry is one line of a scored record, written in finishing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredEntry {
    pub pilot_id: u32,
    pub score: u32,
}

/// PilotStanding is the season total of one pilot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PilotStanding {
    pub pilot_id: u32,
    pub name: String,
    pub score: u32,
    pub races_won: u32,
}

/// get_scored_path returns `race_<NN>_<tag>_ranking.csv` with NN the 1-based event number.
pub fn get_scored_path(data_dir: &Path, event_idx: usize, phase: RacePhase) -> PathBuf {
    data_dir.join(format!(
        "race_{:02}_{}_ranking.csv",
        event_idx + 1,
        phase.short_tag()
    ))
}

/// score_ranking awards the phase's points to the cars in finishing order. Crashed cars are not
/// classified and score nothing.
pub fn score_ranking<'a>(
    phase: RacePhase,
    finishing_order: impl IntoIterator<Item = &'a CarStat>,
) -> Vec<ScoredEntry> {
    finishing_order
        .into_iter()
        .enumerate()
        .map(|(position, car_stat)| ScoredEntry {
            pilot_id: car_stat.pilot_id,
            score: if car_stat.crashed {
                0
            } else {
                phase.score(position)
            },
        })
        .collect()
}

pub fn write_scored(filepath: &Path, entries: &[ScoredEntry]) -> anyhow::Result<()> {
    let mut writer = create_semicolon_writer(filepath, "scored ranking")?;
    for entry in entries.iter() {
        writer.write_record([entry.pilot_id.to_string(), entry.score.to_string()])?;
    }
    writer
        .flush()
        .context(format!("Failed to write scored ranking file {}!", filepath.display()))?;
    Ok(())
}

pub fn read_scored(filepath: &Path) -> anyhow::Result<Vec<ScoredEntry>> {
    read_records(
        filepath,
        "scored ranking",
        |(pilot_id, score): (u32, u32), _line| Ok(ScoredEntry { pilot_id, score }),
    )
}

/// accumulate_standings sums scored records per pilot. The first entry of each record counts as
/// a win. The result is sorted by score, then wins, then directory order.
pub fn accumulate_standings(
    directory: &DriverDirectory,
    records: &[Vec<ScoredEntry>],
) -> Result<Vec<PilotStanding>, SimError> {
    let mut standings: Vec<PilotStanding> = directory
        .get_drivers()
        .iter()
        .map(|driver| PilotStanding {
            pilot_id: driver.id,
            name: driver.name.to_owned(),
            score: 0,
            races_won: 0,
        })
        .collect();

    for record in records.iter() {
        for (position, entry) in record.iter().enumerate() {
            let standing = standings
                .iter_mut()
                .find(|standing| standing.pilot_id == entry.pilot_id)
                .ok_or(SimError::UnknownPilot(entry.pilot_id))?;
            standing.score += entry.score;
            if position == 0 {
                standing.races_won += 1;
            }
        }
    }

    // sort_by is stable, equal pilots stay in directory order
    standings.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.races_won.cmp(&a.races_won))
    });
    Ok(standings)
}

/// get_shared_positions returns the 1-based display position of every standing. Pilots equal in
/// score and wins share a position.
pub fn get_shared_positions(standings: &[PilotStanding]) -> Vec<usize> {
    let mut positions = Vec::with_capacity(standings.len());
    for (i, standing) in standings.iter().enumerate() {
        let tied = i > 0
            && standings[i - 1].score == standing.score
            && standings[i - 1].races_won == standing.races_won;
        let pos = if tied { positions[i - 1] } else { i + 1 };
        positions.push(pos);
    }
    positions
}

/// season_standings rebuilds the standings from all sprint and race records of the events up to
/// and including `event_idx`. Missing records belong to phases not driven yet.
pub fn season_standings(
    data_dir: &Path,
    directory: &DriverDirectory,
    event_idx: usize,
) -> anyhow::Result<Vec<PilotStanding>> {
    let mut records = Vec::new();

    for event in 0..=event_idx {
        for phase in [RacePhase::Sprint, RacePhase::Race] {
            let path = get_scored_path(data_dir, event, phase);
            if !path.exists() {
                continue;
            }
            debug!(path = %path.display(), "Reading scored ranking");
            records.push(read_scored(&path)?);
        }
    }

    Ok(accumulate_standings(directory, &records)?)
}
