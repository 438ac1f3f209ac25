use crate::core::car_time::CarTime;
use crate::core::car_worker::{CarWorker, WorkerOutcome, WorkerPlan};
use crate::core::controller::{Controller, ControllerReport};
use crate::core::driving::DrivingModel;
use crate::core::phase::{RacePhase, SessionKind};
use crate::core::ranking::rank_indices;
use crate::core::screen_manager::ScreenManager;
use crate::core::shared_state::{CarStat, SharedSession, SharedSessionState};
use crate::error::{Result, SimError};
use crate::interfaces::screen_interface::ScreenSnapshot;
use crate::pre::read_sim_pars::SessionPars;
use flume::Sender;
use helpers::general::sim_to_wall;
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};
use tracing::info;

/// SessionSetup is everything needed to run one phase.
///
/// * `car_stats` - Initial stats in starting order, the first `active` cars take part
/// * `required_laps` - Lap count of a sprint or race
/// * `session_duration` - Length of a practice or qualifying session
#[derive(Debug, Clone)]
pub struct SessionSetup {
    pub event_idx: usize,
    pub phase: RacePhase,
    pub car_stats: Vec<CarStat>,
    pub active: usize,
    pub required_laps: Option<u32>,
    pub session_duration: Option<CarTime>,
}

impl SessionSetup {
    /// get_plan returns the worker plan of the car starting from grid position grid_idx.
    pub fn get_plan(&self, grid_idx: usize, pars: &SessionPars) -> Result<WorkerPlan> {
        match (self.phase.session_kind(), self.required_laps, self.session_duration) {
            (SessionKind::Race, Some(laps), _) => Ok(WorkerPlan::Race {
                laps,
                grid_delay: CarTime::from_millis(pars.grid_delay_ms * grid_idx as u32),
            }),
            (SessionKind::Timed, _, Some(session_duration)) => {
                Ok(WorkerPlan::Timed { session_duration })
            }
            _ => Err(SimError::NotRunnable(self.phase.long_name().to_owned())),
        }
    }
}

/// SessionOutcome is the state left behind once every session thread has been joined.
#[derive(Debug)]
pub struct SessionOutcome {
    pub final_state: SharedSessionState,
    pub ranking: Vec<usize>,
    pub worker_outcomes: Vec<WorkerOutcome>,
    pub controller_report: ControllerReport,
    pub final_snapshot: ScreenSnapshot,
}

impl SessionOutcome {
    /// get_ranked_stats returns the final car stats in ranking order.
    pub fn get_ranked_stats(&self) -> Vec<&CarStat> {
        self.ranking
            .iter()
            .map(|&idx| &self.final_state.car_stats[idx])
            .collect()
    }
}

/// handle_session runs a phase: one worker per active car, the controller and the screen
/// manager, all on their own thread. It returns after all of them have been joined.
///
/// `make_model` is called with the grid index and pilot id of every active car.
pub fn handle_session<M, F>(
    setup: &SessionSetup,
    pars: &SessionPars,
    mut make_model: F,
    tx: Option<&Sender<ScreenSnapshot>>,
    realtime_factor: f64,
) -> Result<SessionOutcome>
where
    M: DrivingModel,
    F: FnMut(usize, u32) -> Result<M>,
{
    let active = setup.active.min(setup.car_stats.len());
    let bounds = match setup.phase.session_kind() {
        SessionKind::Race => pars.race_section_bounds,
        _ => pars.timed_section_bounds,
    };

    let mut workers = Vec::with_capacity(active);
    for (grid_idx, car_stat) in setup.car_stats.iter().take(active).enumerate() {
        let model = make_model(grid_idx, car_stat.pilot_id)?;
        workers.push((car_stat.pilot_id, model, setup.get_plan(grid_idx, pars)?));
    }

    let session = SharedSession::new(SharedSessionState::new(setup.car_stats.clone(), active));
    let idle_poll = sim_to_wall(pars.controller_poll_ms as u64, realtime_factor);
    let refresh = Duration::from_millis(pars.viewer_refresh_ms);

    info!(
        event = setup.event_idx + 1,
        phase = %setup.phase,
        active,
        laps = ?setup.required_laps,
        "Starting session"
    );
    let t_start = Instant::now();

    let (worker_outcomes, controller_report, final_snapshot) = thread::scope(|s| {
        let session = &session;

        let controller = s.spawn(move || {
            Controller::new(session, active, setup.required_laps, idle_poll).run()
        });
        let screen_manager = s.spawn(move || {
            ScreenManager::new(session, setup.phase, active, refresh).run(tx)
        });
        let car_workers: Vec<_> = workers
            .into_iter()
            .enumerate()
            .map(|(car_idx, (pilot_id, model, plan))| {
                s.spawn(move || {
                    CarWorker::new(car_idx, pilot_id, session, model, bounds, realtime_factor)
                        .run(plan)
                })
            })
            .collect();

        // join all before persisting anything
        let worker_outcomes = car_workers
            .into_iter()
            .map(|handle| join_unit(handle, "car worker"))
            .collect::<Vec<_>>();
        let controller_report = join_unit(controller, "controller");
        let final_snapshot = join_unit(screen_manager, "screen manager");

        Ok::<_, SimError>((
            worker_outcomes.into_iter().collect::<Result<Vec<_>>>()?,
            controller_report?,
            final_snapshot?,
        ))
    })?;

    let final_state = session.into_state()?;
    let ranking = rank_indices(&final_state.car_stats, active, setup.phase.is_race_mode());

    info!(
        phase = %setup.phase,
        wall_time_s = t_start.elapsed().as_secs_f64(),
        integrated = controller_report.integrated,
        "Session finished"
    );

    Ok(SessionOutcome {
        final_state,
        ranking,
        worker_outcomes,
        controller_report,
        final_snapshot,
    })
}

fn join_unit<T>(handle: ScopedJoinHandle<'_, Result<T>>, unit: &str) -> Result<T> {
    handle
        .join()
        .map_err(|_| SimError::WorkerPanicked(unit.to_owned()))?
}
