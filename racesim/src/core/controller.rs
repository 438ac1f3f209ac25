use crate::core::shared_state::{Integration, SharedSession};
use crate::error::Result;
use std::thread::sleep;
use std::time::Duration;
use tracing::{debug, info};

/// ControllerReport summarises the work of the controller once the session is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerReport {
    pub integrated: usize,
    pub polls: usize,
    pub race_over_by: Option<u32>,
}

/// Controller is the only unit that integrates telemetry into the car stats.
///
/// * `active` - Number of cars taking part, only their slots are scanned
/// * `required_laps` - Lap count that ends a sprint or race, None in timed sessions
/// * `idle_poll` - Wall time to sleep when no slot is pending
pub struct Controller<'a> {
    session: &'a SharedSession,
    active: usize,
    required_laps: Option<u32>,
    idle_poll: Duration,
}

impl<'a> Controller<'a> {
    pub fn new(
        session: &'a SharedSession,
        active: usize,
        required_laps: Option<u32>,
        idle_poll: Duration,
    ) -> Controller<'a> {
        Controller {
            session,
            active,
            required_laps,
            idle_poll,
        }
    }

    /// run integrates telemetry until every worker has stopped and no slot is pending anymore.
    pub fn run(&self) -> Result<ControllerReport> {
        let mut report = ControllerReport::default();

        loop {
            let view = self.session.read_telemetry()?;
            let pending: Vec<usize> = view
                .slots
                .iter()
                .take(self.active)
                .enumerate()
                .filter(|(_, slot)| !slot.consumed)
                .map(|(idx, _)| idx)
                .collect();

            if pending.is_empty() {
                if view.running_count == 0 {
                    break;
                }
                report.polls += 1;
                sleep(self.idle_poll);
                continue;
            }

            for car_idx in pending {
                match self.session.integrate_slot(car_idx, self.required_laps)? {
                    Integration::Skipped => {}
                    Integration::Integrated {
                        effect,
                        race_over_set,
                    } => {
                        report.integrated += 1;
                        if let Some(lap_time) = effect.lap_time {
                            debug!(car_idx, lap_time = %lap_time, "Lap completed");
                        }
                        if race_over_set {
                            let stats = self.session.read_car_stats()?;
                            let pilot_id = stats[car_idx].pilot_id;
                            info!(pilot = pilot_id, "Chequered flag, race is over");
                            report.race_over_by = Some(pilot_id);
                        }
                    }
                }
            }
        }

        debug!(
            integrated = report.integrated,
            polls = report.polls,
            "Controller stopped"
        );
        Ok(report)
    }
}
