use crate::core::car_time::CarTime;
use crate::error::SimError;
use crate::pre::read_sim_pars::{SectionBounds, SessionPars};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Bernoulli, Distribution, Uniform};
use std::collections::VecDeque;

/// CrashRisk distinguishes the two crash checks, which use different probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashRisk {
    /// Checked once before every timed-session lap attempt
    LapAttempt,
    /// Checked before every sprint/race section
    Section,
}

/// DrivingModel supplies every random decision of a car worker.
pub trait DrivingModel: Send {
    /// Section time the car starts its session with.
    fn base_section_time(&mut self, bounds: SectionBounds) -> CarTime;
    /// Next section time, derived from the current one.
    fn next_section_time(&mut self, current: CarTime, bounds: SectionBounds) -> CarTime;
    fn crashes(&mut self, risk: CrashRisk) -> bool;
    /// 0-indexed laps at whose final section the car pits.
    fn pit_stop_laps(&mut self, total_laps: u32) -> Vec<u32>;
    fn pit_penalty(&mut self) -> CarTime;
    fn stand_wait(&mut self) -> CarTime;
    /// Simulated backoff before retrying an unconsumed slot.
    fn publish_backoff(&mut self) -> CarTime;
}

/// RandomDriving is the regular driving model, seeded per car.
#[derive(Debug)]
pub struct RandomDriving {
    rng: StdRng,
    lap_attempt_crash: Bernoulli,
    section_crash: Bernoulli,
    delta_ms: Uniform<i32>,
    jitter_laps: Uniform<i64>,
    pit_penalty_ms: Uniform<u32>,
    stand_wait_min: Uniform<u32>,
    backoff_ms: Uniform<u32>,
}

impl RandomDriving {
    pub fn new(seed: u64, pars: &SessionPars) -> Result<RandomDriving, SimError> {
        let bernoulli = |p: f64| {
            Bernoulli::new(p).map_err(|e| SimError::InvalidParameter(format!("{}: {}", p, e)))
        };
        Ok(RandomDriving {
            rng: StdRng::seed_from_u64(seed),
            lap_attempt_crash: bernoulli(pars.qualifying_crash_probability)?,
            section_crash: bernoulli(pars.race_crash_probability)?,
            delta_ms: Uniform::new_inclusive(-2_999, 2_999),
            jitter_laps: Uniform::new_inclusive(-5, 5),
            pit_penalty_ms: Uniform::new(pars.pit_penalty_ms[0], pars.pit_penalty_ms[1]),
            stand_wait_min: Uniform::new_inclusive(
                pars.stand_wait_minutes[0],
                pars.stand_wait_minutes[1],
            ),
            backoff_ms: Uniform::new_inclusive(
                pars.publish_backoff_ms[0],
                pars.publish_backoff_ms[1],
            ),
        })
    }

    fn jittered(&mut self, nominal: u32) -> i64 {
        nominal as i64 + self.jitter_laps.sample(&mut self.rng)
    }
}

impl DrivingModel for RandomDriving {
    fn base_section_time(&mut self, bounds: SectionBounds) -> CarTime {
        let millis = self.rng.gen_range(bounds.min_s * 1000..bounds.max_s * 1000);
        CarTime::from_millis(millis)
    }

    fn next_section_time(&mut self, current: CarTime, bounds: SectionBounds) -> CarTime {
        current
            .offset(self.delta_ms.sample(&mut self.rng))
            .clamp_seconds(bounds.min_s, bounds.max_s)
    }

    fn crashes(&mut self, risk: CrashRisk) -> bool {
        match risk {
            CrashRisk::LapAttempt => self.lap_attempt_crash.sample(&mut self.rng),
            CrashRisk::Section => self.section_crash.sample(&mut self.rng),
        }
    }

    fn pit_stop_laps(&mut self, total_laps: u32) -> Vec<u32> {
        let nominal = if total_laps < 35 || self.rng.gen_bool(0.5) {
            vec![total_laps / 3, total_laps / 3 * 2]
        } else {
            vec![total_laps / 4, total_laps / 2, total_laps / 4 * 3]
        };
        nominal
            .into_iter()
            .map(|lap| self.jittered(lap))
            .filter(|&lap| lap >= 0 && lap < total_laps as i64)
            .map(|lap| lap as u32)
            .collect()
    }

    fn pit_penalty(&mut self) -> CarTime {
        CarTime::from_millis(self.pit_penalty_ms.sample(&mut self.rng))
    }

    fn stand_wait(&mut self) -> CarTime {
        CarTime::from_secs(self.stand_wait_min.sample(&mut self.rng) * 60)
    }

    fn publish_backoff(&mut self) -> CarTime {
        CarTime::from_millis(self.backoff_ms.sample(&mut self.rng))
    }
}

/// ScriptedDriving replays a fixed list of section times, which makes sessions reproducible.
/// Once the script is exhausted the last section time is repeated.
#[derive(Debug, Clone)]
pub struct ScriptedDriving {
    sections: VecDeque<CarTime>,
    crash_on_check: Option<usize>,
    crash_checks: usize,
    pit_laps: Vec<u32>,
    pit_penalty: CarTime,
    stand_wait: CarTime,
}

impl ScriptedDriving {
    pub fn new(sections: impl IntoIterator<Item = CarTime>) -> ScriptedDriving {
        ScriptedDriving {
            sections: sections.into_iter().collect(),
            crash_on_check: None,
            crash_checks: 0,
            pit_laps: Vec::new(),
            pit_penalty: CarTime::from_secs(15),
            stand_wait: CarTime::from_secs(60),
        }
    }

    /// crash_on_check makes the n-th crash check (0-indexed) report a crash.
    pub fn crash_on_check(mut self, check: usize) -> ScriptedDriving {
        self.crash_on_check = Some(check);
        self
    }

    pub fn with_pit_laps(mut self, pit_laps: Vec<u32>) -> ScriptedDriving {
        self.pit_laps = pit_laps;
        self
    }

    pub fn with_stand_wait(mut self, stand_wait: CarTime) -> ScriptedDriving {
        self.stand_wait = stand_wait;
        self
    }

    fn pop_or(&mut self, fallback: CarTime) -> CarTime {
        self.sections.pop_front().unwrap_or(fallback)
    }
}

impl DrivingModel for ScriptedDriving {
    fn base_section_time(&mut self, bounds: SectionBounds) -> CarTime {
        self.pop_or(CarTime::from_secs(bounds.min_s))
    }

    fn next_section_time(&mut self, current: CarTime, _bounds: SectionBounds) -> CarTime {
        self.pop_or(current)
    }

    fn crashes(&mut self, _risk: CrashRisk) -> bool {
        let check = self.crash_checks;
        self.crash_checks += 1;
        self.crash_on_check == Some(check)
    }

    fn pit_stop_laps(&mut self, _total_laps: u32) -> Vec<u32> {
        self.pit_laps.clone()
    }

    fn pit_penalty(&mut self) -> CarTime {
        self.pit_penalty
    }

    fn stand_wait(&mut self) -> CarTime {
        self.stand_wait
    }

    fn publish_backoff(&mut self) -> CarTime {
        CarTime::from_millis(1)
    }
}
