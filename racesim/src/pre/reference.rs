use crate::error::SimError;
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::str::FromStr;

/// open_semicolon_reader opens a headerless, semicolon separated file.
pub(crate) fn open_semicolon_reader(filepath: &Path, what: &str) -> anyhow::Result<csv::Reader<File>> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!("Failed to open {} file {}!", what, filepath.display()))?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(fh))
}

/// create_semicolon_writer creates (or truncates) a headerless, semicolon separated file.
pub(crate) fn create_semicolon_writer(filepath: &Path, what: &str) -> anyhow::Result<csv::Writer<File>> {
    let fh = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(filepath)
        .context(format!("Failed to create {} file {}!", what, filepath.display()))?;
    Ok(csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(fh))
}

/// read_records deserializes every line of a semicolon separated file and hands each record
/// together with its line number to `convert`.
pub(crate) fn read_records<R, T, F>(filepath: &Path, what: &str, mut convert: F) -> anyhow::Result<Vec<T>>
where
    R: for<'de> Deserialize<'de>,
    F: FnMut(R, usize) -> Result<T, SimError>,
{
    let mut reader = open_semicolon_reader(filepath, what)?;
    let mut out = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| SimError::from_csv(filepath, &e))?;
        let line = record.position().map_or(0, |pos| pos.line() as usize);
        let raw: R = record
            .deserialize(None)
            .map_err(|e| SimError::parse(filepath, line, e.to_string()))?;
        out.push(convert(raw, line)?);
    }

    Ok(out)
}

// DRIVERS -----------------------------------------------------------------------------------------

/// * `id` - Pilot id used in all result files
/// * `short_name` - Up to three letters shown in the live ranking
/// * `name` - Full name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverEntry {
    pub id: u32,
    pub short_name: String,
    pub name: String,
}

/// DriverDirectory is the roster in file order.
#[derive(Debug, Clone)]
pub struct DriverDirectory {
    drivers: Vec<DriverEntry>,
}

impl DriverDirectory {
    pub fn new(drivers: Vec<DriverEntry>) -> Result<DriverDirectory, SimError> {
        let mut seen = HashSet::new();
        for driver in drivers.iter() {
            if !seen.insert(driver.id) {
                return Err(SimError::InvalidParameter(format!(
                    "pilot id {} is listed twice",
                    driver.id
                )));
            }
        }
        Ok(DriverDirectory { drivers })
    }

    /// read reads `id;shortName;fullName` lines.
    pub fn read(filepath: &Path, max_roster: usize) -> anyhow::Result<DriverDirectory> {
        let drivers = read_records(filepath, "driver", |(id, short_name, name): (u32, String, String), line| {
            let len = short_name.chars().count();
            if len == 0 || len > 3 {
                return Err(SimError::parse(
                    filepath,
                    line,
                    format!("short name '{}' must have one to three characters", short_name),
                ));
            }
            if name.is_empty() {
                return Err(SimError::parse(filepath, line, "full name is empty"));
            }
            Ok(DriverEntry { id, short_name, name })
        })?;

        if drivers.is_empty() || drivers.len() > max_roster {
            return Err(SimError::parse(
                filepath,
                0,
                format!("expected 1 to {} drivers, found {}", max_roster, drivers.len()),
            )
            .into());
        }
        Ok(DriverDirectory::new(drivers).context(format!(
            "Invalid driver file {}!",
            filepath.display()
        ))?)
    }

    pub fn get_drivers(&self) -> &[DriverEntry] {
        &self.drivers
    }

    pub fn get_ids(&self) -> Vec<u32> {
        self.drivers.iter().map(|driver| driver.id).collect()
    }

    pub fn get_driver(&self, id: u32) -> Result<&DriverEntry, SimError> {
        self.drivers
            .iter()
            .find(|driver| driver.id == id)
            .ok_or(SimError::UnknownPilot(id))
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

// TRACKS ------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekendType {
    Plain,
    Sprint,
}

impl FromStr for WeekendType {
    type Err = String;

    fn from_str(s: &str) -> Result<WeekendType, String> {
        match s {
            "plain" => Ok(WeekendType::Plain),
            "sprint" => Ok(WeekendType::Sprint),
            _ => Err(format!("weekend type '{}' is neither 'plain' nor 'sprint'", s)),
        }
    }
}

/// * `country` - Country hosting the event
/// * `name` - Track name
/// * `weekend_type` - Whether the weekend includes a sprint
/// * `length_m` - (m) Length of one lap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEntry {
    pub country: String,
    pub name: String,
    pub weekend_type: WeekendType,
    pub length_m: u32,
}

impl TrackEntry {
    pub fn includes_sprint(&self) -> bool {
        self.weekend_type == WeekendType::Sprint
    }
}

/// TrackCatalog is the championship calendar, one event per track in file order.
#[derive(Debug, Clone)]
pub struct TrackCatalog {
    tracks: Vec<TrackEntry>,
}

impl TrackCatalog {
    pub fn new(tracks: Vec<TrackEntry>) -> TrackCatalog {
        TrackCatalog { tracks }
    }

    /// read reads `country;name;weekendType;lengthMeters` lines.
    pub fn read(filepath: &Path, max_events: usize) -> anyhow::Result<TrackCatalog> {
        let tracks = read_records(
            filepath,
            "track",
            |(country, name, weekend_type, length_m): (String, String, String, u32), line| {
                let weekend_type = weekend_type
                    .parse::<WeekendType>()
                    .map_err(|reason: String| SimError::parse(filepath, line, reason))?;
                if length_m == 0 {
                    return Err(SimError::parse(filepath, line, "track length must be positive"));
                }
                Ok(TrackEntry {
                    country,
                    name,
                    weekend_type,
                    length_m,
                })
            },
        )?;

        if tracks.is_empty() || tracks.len() > max_events {
            return Err(SimError::parse(
                filepath,
                0,
                format!("expected 1 to {} tracks, found {}", max_events, tracks.len()),
            )
            .into());
        }
        Ok(TrackCatalog::new(tracks))
    }

    /// get_event returns the track of the 0-indexed event.
    pub fn get_event(&self, event_idx: usize) -> Result<&TrackEntry, SimError> {
        self.tracks
            .get(event_idx)
            .ok_or(SimError::UnknownEvent(event_idx))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
