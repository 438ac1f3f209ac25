use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// CarTime is a simulated time span with millisecond resolution.
///
/// Best lap and best section times start at `CarTime::UNSET` (999.999s) until the first value is
/// recorded, so a plain "smaller is better" comparison works without special cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CarTime {
    millis: u32,
}

impl CarTime {
    pub const ZERO: CarTime = CarTime { millis: 0 };
    pub const UNSET: CarTime = CarTime { millis: 999_999 };

    pub const fn from_millis(millis: u32) -> CarTime {
        CarTime { millis }
    }

    pub const fn from_secs(secs: u32) -> CarTime {
        CarTime {
            millis: secs * 1000,
        }
    }

    pub fn from_secs_millis(secs: u32, millis: u32) -> CarTime {
        CarTime {
            millis: secs.saturating_mul(1000).saturating_add(millis),
        }
    }

    pub const fn as_millis(self) -> u32 {
        self.millis
    }

    pub const fn seconds(self) -> u32 {
        self.millis / 1000
    }

    pub const fn subsec_millis(self) -> u32 {
        self.millis % 1000
    }

    pub fn is_unset(self) -> bool {
        self == CarTime::UNSET
    }

    pub fn saturating_sub(self, other: CarTime) -> CarTime {
        CarTime {
            millis: self.millis.saturating_sub(other.millis),
        }
    }

    /// offset shifts the time by a signed number of milliseconds, saturating at zero.
    pub fn offset(self, delta_millis: i32) -> CarTime {
        let shifted = self.millis as i64 + delta_millis as i64;
        CarTime {
            millis: shifted.clamp(0, u32::MAX as i64) as u32,
        }
    }

    /// clamp_seconds pulls the whole-second part into [min_secs, max_secs_excl) while keeping the
    /// sub-second part, e.g. 46.250 clamped to [25, 45) becomes 44.250.
    pub fn clamp_seconds(self, min_secs: u32, max_secs_excl: u32) -> CarTime {
        let secs = self.seconds();
        if secs < min_secs {
            CarTime::from_secs_millis(min_secs, self.subsec_millis())
        } else if secs >= max_secs_excl {
            CarTime::from_secs_millis(max_secs_excl.saturating_sub(1), self.subsec_millis())
        } else {
            self
        }
    }

    /// to_hms_string formats the time as `SS.mmm`, `MM:SS.mmm` or `H:MM:SS.mmm`.
    pub fn to_hms_string(self) -> String {
        let secs = self.seconds();
        let ms = self.subsec_millis();
        if secs < 60 {
            format!("{:2}.{:03}", secs, ms)
        } else if secs < 3600 {
            format!("{:2}:{:02}.{:03}", secs / 60, secs % 60, ms)
        } else {
            format!("{}:{:02}:{:02}.{:03}", secs / 3600, (secs / 60) % 60, secs % 60, ms)
        }
    }
}

impl Add for CarTime {
    type Output = CarTime;

    fn add(self, rhs: CarTime) -> CarTime {
        CarTime {
            millis: self.millis.saturating_add(rhs.millis),
        }
    }
}

impl AddAssign for CarTime {
    fn add_assign(&mut self, rhs: CarTime) {
        *self = *self + rhs;
    }
}

impl Sum for CarTime {
    fn sum<I: Iterator<Item = CarTime>>(iter: I) -> CarTime {
        iter.fold(CarTime::ZERO, |acc, t| acc + t)
    }
}

/// Formats as `seconds.milliseconds`, the representation used in the result files.
impl fmt::Display for CarTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = format!("{}.{:03}", self.seconds(), self.subsec_millis());
        f.pad(&text)
    }
}

/// Parses `seconds.milliseconds`. The millisecond part holds one to three digits and is read as
/// an integer count of milliseconds, so both `30.005` and `30.5` denote 30s + 5ms.
impl FromStr for CarTime {
    type Err = String;

    fn from_str(s: &str) -> Result<CarTime, String> {
        let (secs, millis) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| format!("'{}' is not a sec.ms time", s))?;
        if millis.is_empty() || millis.len() > 3 {
            return Err(format!("'{}' needs one to three millisecond digits", s));
        }
        let secs: u32 = secs
            .parse()
            .map_err(|_| format!("'{}' has an invalid seconds part", s))?;
        let millis: u32 = millis
            .parse()
            .map_err(|_| format!("'{}' has an invalid milliseconds part", s))?;
        Ok(CarTime::from_secs_millis(secs, millis))
    }
}
