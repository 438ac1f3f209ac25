use crate::core::car_time::CarTime;
use crate::core::driving::{CrashRisk, DrivingModel};
use crate::core::shared_state::{CarStatus, SharedSession};
use crate::error::Result;
use crate::pre::read_sim_pars::SectionBounds;
use helpers::general::{sim_to_wall, sleep_remaining};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

/// WorkerPlan selects which kind of session a car worker drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPlan {
    /// Practice and qualifying: runs from the stand until the session time is used up
    Timed { session_duration: CarTime },
    /// Sprint and race: a fixed number of laps, started with a grid delay
    Race { laps: u32, grid_delay: CarTime },
}

/// WorkerOutcome tells how a car worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Session time used up or all laps driven
    Finished,
    Crashed,
    /// Another car completed the race first
    Stopped,
}

/// CarWorker simulates one car and publishes its telemetry into the car's slot.
pub struct CarWorker<'a, M: DrivingModel> {
    car_idx: usize,
    pilot_id: u32,
    session: &'a SharedSession,
    model: M,
    bounds: SectionBounds,
    realtime_factor: f64,
}

impl<'a, M: DrivingModel> CarWorker<'a, M> {
    pub fn new(
        car_idx: usize,
        pilot_id: u32,
        session: &'a SharedSession,
        model: M,
        bounds: SectionBounds,
        realtime_factor: f64,
    ) -> CarWorker<'a, M> {
        CarWorker {
            car_idx,
            pilot_id,
            session,
            model,
            bounds,
            realtime_factor,
        }
    }

    /// run drives the plan to its end. The running counter is decremented exactly once when the
    /// worker stops, whether it finished, crashed, failed or panicked.
    pub fn run(mut self, plan: WorkerPlan) -> Result<WorkerOutcome> {
        let _running = RunningGuard {
            session: self.session,
            pilot_id: self.pilot_id,
        };
        let outcome = match plan {
            WorkerPlan::Timed { session_duration } => self.run_timed(session_duration),
            WorkerPlan::Race { laps, grid_delay } => self.run_race(laps, grid_delay),
        }?;
        debug!(pilot = self.pilot_id, ?outcome, "Car worker stopped");
        Ok(outcome)
    }

    fn run_timed(&mut self, session_duration: CarTime) -> Result<WorkerOutcome> {
        let mut section_time = self.model.base_section_time(self.bounds);
        let mut session_time = CarTime::ZERO;
        let mut waited = Duration::ZERO;
        let mut on_track = false;

        loop {
            // back to the stand
            if on_track {
                waited = self.publish(CarTime::ZERO, CarStatus::Waiting)?;
                on_track = false;
            }
            let stand_wait = self.model.stand_wait();
            session_time += stand_wait;
            self.pace(stand_wait, waited);
            waited = Duration::ZERO;

            // a lap is roughly three times the current section time
            let lap_estimate = CarTime::from_millis(section_time.as_millis() * 3);
            if session_time + lap_estimate > session_duration {
                break;
            }

            if self.model.crashes(CrashRisk::LapAttempt) {
                self.publish(CarTime::ZERO, CarStatus::Crashed)?;
                info!(pilot = self.pilot_id, session_time = %session_time, "Car crashed on its lap attempt");
                return Ok(WorkerOutcome::Crashed);
            }

            on_track = true;
            for _ in 0..3 {
                section_time = self.model.next_section_time(section_time, self.bounds);
                self.pace(section_time, waited);
                waited = self.publish(section_time, CarStatus::Running)?;
                session_time += section_time;
            }
        }

        Ok(WorkerOutcome::Finished)
    }

    fn run_race(&mut self, laps: u32, grid_delay: CarTime) -> Result<WorkerOutcome> {
        let pit_laps = self.model.pit_stop_laps(laps);
        debug!(pilot = self.pilot_id, ?pit_laps, "Pit strategy chosen");

        let mut section_time = self.model.base_section_time(self.bounds) + grid_delay;
        let mut waited = Duration::ZERO;

        let sections = laps * 3;
        for section in 0..sections {
            let lap = section / 3;
            let finish_line = section % 3 == 2;

            if self.model.crashes(CrashRisk::Section) {
                self.publish(CarTime::ZERO, CarStatus::Crashed)?;
                info!(pilot = self.pilot_id, lap, "Car crashed");
                return Ok(WorkerOutcome::Crashed);
            }

            let (reported, status) = if finish_line && pit_laps.contains(&lap) {
                let penalty = self.model.pit_penalty();
                debug!(pilot = self.pilot_id, lap, penalty = %penalty, "Pit stop");
                (section_time + penalty, CarStatus::PitStop)
            } else {
                (section_time, CarStatus::Running)
            };

            self.pace(reported, waited);
            waited = self.publish(reported, status)?;

            // the last crossing ends the race for this car anyway
            if finish_line && section + 1 < sections && self.session.is_race_over()? {
                return Ok(WorkerOutcome::Stopped);
            }
            section_time = self.model.next_section_time(section_time, self.bounds);
        }

        Ok(WorkerOutcome::Finished)
    }

    /// publish retries until the slot is free and returns the wall time spent doing so.
    fn publish(&mut self, section_time: CarTime, status: CarStatus) -> Result<Duration> {
        let t_start = Instant::now();
        while !self.session.try_publish(self.car_idx, section_time, status)? {
            let backoff = self.model.publish_backoff();
            trace!(pilot = self.pilot_id, backoff = %backoff, "Slot not consumed yet");
            sleep(sim_to_wall(backoff.as_millis() as u64, self.realtime_factor));
        }
        Ok(t_start.elapsed())
    }

    fn pace(&self, sim_time: CarTime, already_waited: Duration) {
        sleep_remaining(
            sim_to_wall(sim_time.as_millis() as u64, self.realtime_factor),
            already_waited,
        );
    }
}

/// RunningGuard signs the worker off from the running counter when dropped.
struct RunningGuard<'a> {
    session: &'a SharedSession,
    pilot_id: u32,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.session.decrement_running() {
            error!(pilot = self.pilot_id, error = %e, "Failed to sign off car worker");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::driving::ScriptedDriving;
    use crate::core::shared_state::{CarStat, SharedSessionState};

    const BOUNDS: SectionBounds = SectionBounds { min_s: 25, max_s: 45 };
    const FAST: f64 = 100_000.0;

    fn session(cars: usize) -> SharedSession {
        let stats = (0..cars as u32).map(CarStat::new).collect();
        SharedSession::new(SharedSessionState::new(stats, cars))
    }

    /// drain marks the slot consumed from a helper thread so the worker can keep publishing,
    /// recording every sample it sees.
    fn run_with_drain(
        session: &SharedSession,
        worker: CarWorker<ScriptedDriving>,
        plan: WorkerPlan,
    ) -> (WorkerOutcome, Vec<(CarTime, CarStatus)>) {
        std::thread::scope(|s| {
            let handle = s.spawn(move || worker.run(plan).unwrap());
            let mut seen = Vec::new();
            loop {
                let view = session.read_telemetry().unwrap();
                if !view.slots[0].consumed {
                    seen.push((view.slots[0].section_time, view.slots[0].status));
                    session.integrate_slot(0, None).unwrap();
                } else if view.running_count == 0 {
                    break;
                }
            }
            (handle.join().unwrap(), seen)
        })
    }

    #[test]
    fn race_worker_drives_all_laps_with_grid_delay_and_pit_stop() {
        let session = session(1);
        let model = ScriptedDriving::new([CarTime::from_secs(30)]).with_pit_laps(vec![0]);
        let worker = CarWorker::new(0, 0, &session, model, BOUNDS, FAST);
        let (outcome, seen) = run_with_drain(
            &session,
            worker,
            WorkerPlan::Race {
                laps: 2,
                grid_delay: CarTime::from_millis(500),
            },
        );

        assert_eq!(outcome, WorkerOutcome::Finished);
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[0], (CarTime::from_millis(30_500), CarStatus::Running));
        assert_eq!(seen[2], (CarTime::from_millis(45_500), CarStatus::PitStop));
        assert_eq!(seen[5], (CarTime::from_millis(30_500), CarStatus::Running));
        assert_eq!(session.running_count().unwrap(), 0);
    }

    #[test]
    fn publish_measures_the_wait_and_pace_sleeps_only_the_rest() {
        // 30 s of simulated time are 300 ms of wall time
        const FACTOR: f64 = 100.0;
        let session = session(1);
        session.try_publish(0, CarTime::from_secs(30), CarStatus::Running).unwrap();
        let mut worker = CarWorker::new(
            0,
            0,
            &session,
            ScriptedDriving::new([CarTime::from_secs(30)]),
            BOUNDS,
            FACTOR,
        );

        let waited = std::thread::scope(|s| {
            s.spawn(|| {
                sleep(Duration::from_millis(200));
                session.integrate_slot(0, None).unwrap();
            });
            worker.publish(CarTime::from_secs(31), CarStatus::Running).unwrap()
        });
        assert!(waited >= Duration::from_millis(200), "waited {:?}", waited);

        let t_start = Instant::now();
        worker.pace(CarTime::from_secs(30), waited);
        let paced = t_start.elapsed();
        assert!(paced >= Duration::from_millis(300).saturating_sub(waited), "paced {:?}", paced);
        assert!(paced < Duration::from_millis(250), "paced {:?}", paced);

        // a wait longer than the section leaves nothing to sleep
        let t_start = Instant::now();
        worker.pace(CarTime::from_secs(10), waited);
        assert!(t_start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn race_pacing_catches_up_after_a_slow_consumer() {
        const FACTOR: f64 = 100.0;
        let session = session(1);
        let worker = CarWorker::new(
            0,
            0,
            &session,
            ScriptedDriving::new([CarTime::from_secs(30)]),
            BOUNDS,
            FACTOR,
        );

        let t_start = Instant::now();
        let outcome = std::thread::scope(|s| {
            let handle = s.spawn(move || {
                worker
                    .run(WorkerPlan::Race {
                        laps: 1,
                        grid_delay: CarTime::ZERO,
                    })
                    .unwrap()
            });
            let mut held = false;
            loop {
                let view = session.read_telemetry().unwrap();
                if !view.slots[0].consumed {
                    if !held {
                        // first sample at 300 ms, consumed at 800 ms
                        sleep(Duration::from_millis(500));
                        held = true;
                    }
                    session.integrate_slot(0, None).unwrap();
                } else if view.running_count == 0 {
                    break;
                }
            }
            handle.join().unwrap()
        });
        let elapsed = t_start.elapsed();

        // the second publish waits from 600 to 800 ms, so the third section only sleeps 100 ms
        // and the lap ends at 900 ms instead of 1100 ms
        assert_eq!(outcome, WorkerOutcome::Finished);
        assert!(elapsed >= Duration::from_millis(880), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1050), "elapsed {:?}", elapsed);
    }

    #[test]
    fn race_worker_reports_crash_and_stops() {
        let session = session(1);
        let model = ScriptedDriving::new([CarTime::from_secs(30)]).crash_on_check(4);
        let worker = CarWorker::new(0, 0, &session, model, BOUNDS, FAST);
        let (outcome, seen) = run_with_drain(
            &session,
            worker,
            WorkerPlan::Race {
                laps: 3,
                grid_delay: CarTime::ZERO,
            },
        );

        assert_eq!(outcome, WorkerOutcome::Crashed);
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[4].1, CarStatus::Crashed);
    }

    #[test]
    fn race_worker_stops_at_finish_line_once_race_is_over() {
        let stats = vec![CarStat::new(0), CarStat::new(1)];
        let session = SharedSession::new(SharedSessionState::new(stats, 1));
        // car 1 already completed the race
        session.try_publish(1, CarTime::from_secs(30), CarStatus::Running).unwrap();
        session.integrate_slot(1, Some(0)).unwrap();
        assert!(session.is_race_over().unwrap());

        let worker = CarWorker::new(
            0,
            0,
            &session,
            ScriptedDriving::new([CarTime::from_secs(30)]),
            BOUNDS,
            FAST,
        );
        let (outcome, seen) = run_with_drain(
            &session,
            worker,
            WorkerPlan::Race {
                laps: 5,
                grid_delay: CarTime::ZERO,
            },
        );

        assert_eq!(outcome, WorkerOutcome::Stopped);
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn timed_worker_returns_to_stand_and_respects_session_time() {
        let session = session(1);
        let model = ScriptedDriving::new([CarTime::from_secs(30)])
            .with_stand_wait(CarTime::from_secs(60));
        let worker = CarWorker::new(0, 0, &session, model, SectionBounds { min_s: 25, max_s: 44 }, FAST);
        // stand 60 + lap 90 + stand 60 + lap 90 = 300, the third lap would end at 450
        let (outcome, seen) = run_with_drain(
            &session,
            worker,
            WorkerPlan::Timed {
                session_duration: CarTime::from_secs(400),
            },
        );

        assert_eq!(outcome, WorkerOutcome::Finished);
        let statuses: Vec<CarStatus> = seen.iter().map(|(_, status)| *status).collect();
        use CarStatus::*;
        assert_eq!(
            statuses,
            vec![Running, Running, Running, Waiting, Running, Running, Running, Waiting]
        );
    }

    #[test]
    fn timed_worker_crash_ends_session() {
        let session = session(1);
        let model = ScriptedDriving::new([CarTime::from_secs(30)])
            .with_stand_wait(CarTime::from_secs(60))
            .crash_on_check(0);
        let worker = CarWorker::new(0, 0, &session, model, BOUNDS, FAST);
        let (outcome, seen) = run_with_drain(
            &session,
            worker,
            WorkerPlan::Timed {
                session_duration: CarTime::from_secs(600),
            },
        );

        assert_eq!(outcome, WorkerOutcome::Crashed);
        assert_eq!(seen, vec![(CarTime::ZERO, CarStatus::Crashed)]);
    }
}
