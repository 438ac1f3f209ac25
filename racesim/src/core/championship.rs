use crate::core::driving::DrivingModel;
use crate::core::handle_session::{handle_session, SessionOutcome, SessionSetup};
use crate::core::phase::SessionKind;
use crate::core::shared_state::CarStat;
use crate::error::{Result, SimError};
use crate::interfaces::screen_interface::ScreenSnapshot;
use crate::post::phase_result::{
    get_phase_result_path, read_phase_result, write_phase_result, PhaseResultEntry,
};
use crate::post::progress::EventProgress;
use crate::post::standings::{
    get_scored_path, score_ranking, season_standings, write_scored, PilotStanding,
};
use crate::pre::read_sim_pars::SessionPars;
use crate::pre::reference::{DriverDirectory, TrackCatalog, TrackEntry};
use anyhow::Context;
use flume::Sender;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DRIVERS_FILE: &str = "drivers.csv";
pub const TRACKS_FILE: &str = "tracks.csv";
pub const PROGRESS_FILE: &str = "championship.txt";

/// Championship ties the reference data, the progress file and the result files of one data
/// directory together.
#[derive(Debug)]
pub struct Championship {
    data_dir: PathBuf,
    pars: SessionPars,
    drivers: DriverDirectory,
    tracks: TrackCatalog,
    progress: EventProgress,
}

impl Championship {
    /// load reads drivers, tracks and the progress file. A missing progress file means the
    /// championship has not started yet.
    pub fn load(data_dir: &Path, pars: SessionPars) -> anyhow::Result<Championship> {
        pars.validate()?;
        let drivers = DriverDirectory::read(&data_dir.join(DRIVERS_FILE), pars.max_roster)?;
        let tracks = TrackCatalog::read(&data_dir.join(TRACKS_FILE), pars.max_events)?;
        let progress =
            EventProgress::read(&data_dir.join(PROGRESS_FILE))?.unwrap_or_else(EventProgress::start);

        debug!(
            drivers = drivers.len(),
            events = tracks.len(),
            ?progress,
            "Championship loaded"
        );
        Ok(Championship {
            data_dir: data_dir.to_path_buf(),
            pars,
            drivers,
            tracks,
            progress,
        })
    }

    pub fn get_drivers(&self) -> &DriverDirectory {
        &self.drivers
    }

    pub fn get_pars(&self) -> &SessionPars {
        &self.pars
    }

    /// get_progress returns the last completed phase.
    pub fn get_progress(&self) -> EventProgress {
        self.progress
    }

    pub fn get_track(&self, event_idx: usize) -> Result<&TrackEntry> {
        self.tracks.get_event(event_idx)
    }

    /// get_next_progress returns the phase to simulate next.
    pub fn get_next_progress(&self) -> Result<EventProgress> {
        self.progress.get_next(&self.tracks)
    }

    /// prepare_session builds the starting field of a phase. Practice, Q1 and SQ1 start in
    /// directory order, every other phase in the order of its predecessor's result. Best times
    /// always start unset.
    pub fn prepare_session(&self, next: EventProgress) -> anyhow::Result<SessionSetup> {
        let phase = next.phase;
        if phase.session_kind() == SessionKind::Idle {
            return Err(SimError::NotRunnable(phase.long_name().to_owned()).into());
        }
        let track = self.get_track(next.event_idx)?;

        let starting_order = if phase.starts_from_directory() {
            self.drivers.get_ids()
        } else {
            let previous = phase
                .get_previous_phase(track.includes_sprint())
                .ok_or_else(|| SimError::NotRunnable(phase.long_name().to_owned()))?;
            let path = get_phase_result_path(&self.data_dir, next.event_idx, previous);
            let entries = read_phase_result(&path).context(format!(
                "{} needs the result of {}",
                phase.long_name(),
                previous.long_name()
            ))?;
            self.check_starting_order(&path, &entries)?;
            entries.iter().map(|entry| entry.pilot_id).collect()
        };

        let car_stats: Vec<CarStat> = starting_order.into_iter().map(CarStat::new).collect();
        let active = phase.active_participants(car_stats.len(), &self.pars);

        Ok(SessionSetup {
            event_idx: next.event_idx,
            phase,
            car_stats,
            active,
            required_laps: phase.required_laps(track.length_m, &self.pars),
            session_duration: phase.session_duration(&self.pars),
        })
    }

    /// check_starting_order makes sure a previous result lists every pilot of the roster once.
    fn check_starting_order(&self, path: &Path, entries: &[PhaseResultEntry]) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in entries.iter() {
            self.drivers.get_driver(entry.pilot_id)?;
            if !seen.insert(entry.pilot_id) {
                return Err(SimError::parse(
                    path,
                    0,
                    format!("pilot {} is listed twice", entry.pilot_id),
                ));
            }
        }
        if seen.len() != self.drivers.len() {
            return Err(SimError::parse(
                path,
                0,
                format!(
                    "expected {} pilots, found {}",
                    self.drivers.len(),
                    seen.len()
                ),
            ));
        }
        Ok(())
    }

    /// run_session simulates a prepared phase, see `handle_session`.
    pub fn run_session<M, F>(
        &self,
        setup: &SessionSetup,
        make_model: F,
        tx: Option<&Sender<ScreenSnapshot>>,
        realtime_factor: f64,
    ) -> Result<SessionOutcome>
    where
        M: DrivingModel,
        F: FnMut(usize, u32) -> Result<M>,
    {
        handle_session(setup, &self.pars, make_model, tx, realtime_factor)
    }

    /// complete_session persists the phase result, the scored ranking of sprints and races, and
    /// finally the progress.
    pub fn complete_session(
        &mut self,
        setup: &SessionSetup,
        outcome: &SessionOutcome,
    ) -> anyhow::Result<()> {
        let phase = setup.phase;

        let ranked = outcome.get_ranked_stats();
        let entries: Vec<PhaseResultEntry> = ranked
            .iter()
            .map(|&car_stat| PhaseResultEntry::from(car_stat))
            .collect();
        let path = get_phase_result_path(&self.data_dir, setup.event_idx, phase);
        write_phase_result(&path, &entries)?;
        info!(path = %path.display(), "Phase result written");

        if phase.is_scoring() {
            let path = get_scored_path(&self.data_dir, setup.event_idx, phase);
            write_scored(&path, &score_ranking(phase, ranked.iter().copied()))?;
            info!(path = %path.display(), "Scored ranking written");
        }

        let progress = EventProgress {
            event_idx: setup.event_idx,
            phase,
        };
        progress.write(&self.data_dir.join(PROGRESS_FILE))?;
        self.progress = progress;
        Ok(())
    }

    /// get_season_standings sums the scored rankings up to and including the current event.
    pub fn get_season_standings(&self) -> anyhow::Result<Vec<PilotStanding>> {
        season_standings(&self.data_dir, &self.drivers, self.progress.event_idx)
    }
}
