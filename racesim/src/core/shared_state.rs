use crate::core::car_time::CarTime;
use crate::core::gate::ConcurrencyGate;
use crate::error::Result;

/// CarStatus is the status tag a car worker attaches to each telemetry sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarStatus {
    Waiting,  // in the stand during practice/qualifying
    Running,  // on track
    PitStop,  // section included a pit stop
    Crashed,
}

/// TelemetrySlot is the single-sample mailbox between one car worker and the controller.
///
/// The worker may only overwrite the slot while `consumed` is true, the controller may only
/// integrate it while `consumed` is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetrySlot {
    pub section_time: CarTime,
    pub status: CarStatus,
    pub consumed: bool,
}

impl Default for TelemetrySlot {
    fn default() -> Self {
        TelemetrySlot {
            section_time: CarTime::ZERO,
            status: CarStatus::Waiting,
            consumed: true,
        }
    }
}

/// CarStat holds the integrated timing of one car.
///
/// * `distance` - Number of completed sections (lap = distance / 3, section = distance % 3)
/// * `best_section_times` - Best time per section, `CarTime::UNSET` until driven
/// * `current_section_times` - Most recent time per section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarStat {
    pub pilot_id: u32,
    pub total_time: CarTime,
    pub distance: u32,
    pub best_section_times: [CarTime; 3],
    pub current_section_times: [CarTime; 3],
    pub best_lap: CarTime,
    pub pit_stop_count: u32,
    pub crashed: bool,
    pub in_stand: bool,
}

/// IntegrationEffect reports what integrating one sample changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntegrationEffect {
    pub distance_advanced: bool,
    pub lap_time: Option<CarTime>,
}

impl CarStat {
    pub fn new(pilot_id: u32) -> CarStat {
        CarStat {
            pilot_id,
            total_time: CarTime::ZERO,
            distance: 0,
            best_section_times: [CarTime::UNSET; 3],
            current_section_times: [CarTime::ZERO; 3],
            best_lap: CarTime::UNSET,
            pit_stop_count: 0,
            crashed: false,
            in_stand: true,
        }
    }

    pub fn get_compl_laps(&self) -> u32 {
        self.distance / 3
    }

    pub fn get_section_in_lap(&self) -> u32 {
        self.distance % 3
    }

    pub fn get_best_sections_sum(&self) -> CarTime {
        self.best_section_times.iter().copied().sum()
    }

    /// integrate folds one telemetry sample into the stats. A crashed car ignores all further
    /// samples.
    pub fn integrate(&mut self, sample: &TelemetrySlot) -> IntegrationEffect {
        if self.crashed {
            return IntegrationEffect::default();
        }

        match sample.status {
            CarStatus::Crashed => {
                self.crashed = true;
                IntegrationEffect::default()
            }
            CarStatus::Waiting => {
                self.in_stand = true;
                IntegrationEffect::default()
            }
            CarStatus::Running | CarStatus::PitStop => {
                self.in_stand = false;
                if sample.status == CarStatus::PitStop {
                    self.pit_stop_count += 1;
                }

                let section = self.get_section_in_lap() as usize;
                self.distance += 1;
                self.current_section_times[section] = sample.section_time;
                if sample.section_time < self.best_section_times[section] {
                    self.best_section_times[section] = sample.section_time;
                }

                let mut lap_time = None;
                if section == 2 {
                    let t_lap: CarTime = self.current_section_times.iter().copied().sum();
                    if t_lap < self.best_lap {
                        self.best_lap = t_lap;
                    }
                    self.total_time += t_lap;
                    lap_time = Some(t_lap);
                }

                IntegrationEffect {
                    distance_advanced: true,
                    lap_time,
                }
            }
        }
    }
}

/// SharedSessionState is everything the concurrent units of a session share.
///
/// * `running_count` - Car workers still active, decreases monotonically to 0
/// * `race_over` - Set once when the first car completes the required laps
/// * `race_over_by` - Pilot whose crossing set `race_over`
#[derive(Debug, Clone)]
pub struct SharedSessionState {
    pub slots: Vec<TelemetrySlot>,
    pub car_stats: Vec<CarStat>,
    pub running_count: usize,
    pub race_over: bool,
    pub race_over_by: Option<u32>,
}

impl SharedSessionState {
    pub fn new(car_stats: Vec<CarStat>, running_count: usize) -> SharedSessionState {
        SharedSessionState {
            slots: vec![TelemetrySlot::default(); car_stats.len()],
            car_stats,
            running_count,
            race_over: false,
            race_over_by: None,
        }
    }
}

/// Integration is the controller's view of one slot integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
    /// The slot had already been consumed
    Skipped,
    Integrated {
        effect: IntegrationEffect,
        race_over_set: bool,
    },
}

/// TelemetryView is a consistent snapshot of the slots taken in one read section.
#[derive(Debug, Clone)]
pub struct TelemetryView {
    pub slots: Vec<TelemetrySlot>,
    pub running_count: usize,
}

/// ScreenView is a consistent snapshot of the stats taken in one read section.
#[derive(Debug, Clone)]
pub struct ScreenView {
    pub car_stats: Vec<CarStat>,
    pub running_count: usize,
    pub pending: bool,
}

/// SharedSession is the only access path to the shared state. Each accessor is one critical
/// section of the gate.
pub struct SharedSession {
    gate: ConcurrencyGate<SharedSessionState>,
}

impl SharedSession {
    pub fn new(state: SharedSessionState) -> SharedSession {
        SharedSession {
            gate: ConcurrencyGate::new(state),
        }
    }

    pub fn read_car_stats(&self) -> Result<Vec<CarStat>> {
        self.gate.read(|state| state.car_stats.clone())
    }

    pub fn read_telemetry(&self) -> Result<TelemetryView> {
        self.gate.read(|state| TelemetryView {
            slots: state.slots.clone(),
            running_count: state.running_count,
        })
    }

    /// read_screen_view returns the stats together with whether work is still outstanding among
    /// the first `active` cars.
    pub fn read_screen_view(&self, active: usize) -> Result<ScreenView> {
        self.gate.read(|state| ScreenView {
            car_stats: state.car_stats.clone(),
            running_count: state.running_count,
            pending: state.slots.iter().take(active).any(|slot| !slot.consumed),
        })
    }

    pub fn running_count(&self) -> Result<usize> {
        self.gate.read(|state| state.running_count)
    }

    pub fn is_race_over(&self) -> Result<bool> {
        self.gate.read(|state| state.race_over)
    }

    /// try_publish writes a sample into the car's slot if the previous one was consumed. Returns
    /// false, leaving the slot untouched, otherwise.
    pub fn try_publish(&self, car_idx: usize, section_time: CarTime, status: CarStatus) -> Result<bool> {
        self.gate.write(|state| {
            let slot = &mut state.slots[car_idx];
            if !slot.consumed {
                return false;
            }
            *slot = TelemetrySlot {
                section_time,
                status,
                consumed: false,
            };
            true
        })
    }

    /// integrate_slot integrates the car's pending sample, marks it consumed and, in race mode,
    /// sets the race-over flag when the car completes the required laps. All of it happens in a
    /// single write section.
    pub fn integrate_slot(&self, car_idx: usize, required_laps: Option<u32>) -> Result<Integration> {
        self.gate.write(|state| {
            let slot = &mut state.slots[car_idx];
            if slot.consumed {
                return Integration::Skipped;
            }
            let sample = *slot;
            slot.consumed = true;

            let car_stat = &mut state.car_stats[car_idx];
            let effect = car_stat.integrate(&sample);

            let mut race_over_set = false;
            if let Some(laps) = required_laps {
                if effect.distance_advanced && car_stat.get_compl_laps() >= laps && !state.race_over {
                    state.race_over = true;
                    state.race_over_by = Some(car_stat.pilot_id);
                    race_over_set = true;
                }
            }

            Integration::Integrated {
                effect,
                race_over_set,
            }
        })
    }

    /// decrement_running is called exactly once by every car worker when it stops.
    pub fn decrement_running(&self) -> Result<usize> {
        self.gate.write(|state| {
            state.running_count = state.running_count.saturating_sub(1);
            state.running_count
        })
    }

    /// into_state hands the state back once all session threads have been joined.
    pub fn into_state(self) -> Result<SharedSessionState> {
        self.gate.into_inner()
    }
}
