use crate::core::phase::RacePhase;
use crate::error::SimError;
use crate::pre::reference::TrackCatalog;
use anyhow::Context;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// EventProgress is the last completed phase of the championship.
///
/// * `event_idx` - 0-indexed event (track catalog line)
/// * `phase` - Last phase completed within that event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventProgress {
    pub event_idx: usize,
    pub phase: RacePhase,
}

impl EventProgress {
    /// start is the progress of a championship that has not begun yet.
    pub fn start() -> EventProgress {
        EventProgress {
            event_idx: 0,
            phase: RacePhase::StartOfWeekend,
        }
    }

    /// parse reads the two lines `race=<index>` and `phase=<enumValue>`.
    pub fn parse(filepath: &Path, content: &str) -> Result<EventProgress, SimError> {
        let mut lines = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let mut field = |key: &str| -> Result<(usize, u32), SimError> {
            let (idx, line) = lines
                .next()
                .ok_or_else(|| SimError::parse(filepath, 0, format!("missing '{}=' line", key)))?;
            let value = line
                .trim()
                .strip_prefix(key)
                .and_then(|rest| rest.strip_prefix('='))
                .ok_or_else(|| SimError::parse(filepath, idx + 1, format!("expected '{}='", key)))?;
            let value = value
                .trim()
                .parse::<u32>()
                .map_err(|_| SimError::parse(filepath, idx + 1, format!("'{}' is not a number", value)))?;
            Ok((idx + 1, value))
        };

        let (_, event_idx) = field("race")?;
        let (phase_line, phase_value) = field("phase")?;
        let phase = RacePhase::from_enum_value(phase_value).ok_or_else(|| {
            SimError::parse(filepath, phase_line, format!("unknown phase value {}", phase_value))
        })?;

        Ok(EventProgress {
            event_idx: event_idx as usize,
            phase,
        })
    }

    /// read returns None if the championship has not started, i.e. the file does not exist.
    pub fn read(filepath: &Path) -> anyhow::Result<Option<EventProgress>> {
        let content = match fs::read_to_string(filepath) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).context(format!(
                    "Failed to open progress file {}!",
                    filepath.display()
                ))
            }
        };
        Ok(Some(EventProgress::parse(filepath, &content)?))
    }

    pub fn write(&self, filepath: &Path) -> anyhow::Result<()> {
        fs::write(
            filepath,
            format!("race={}\nphase={}\n", self.event_idx, self.phase.enum_value()),
        )
        .context(format!(
            "Failed to write progress file {}!",
            filepath.display()
        ))
    }

    /// get_next returns the phase to simulate next. After the race the next event starts with
    /// practice; after the last event the championship is over.
    pub fn get_next(&self, catalog: &TrackCatalog) -> Result<EventProgress, SimError> {
        let (event_idx, phase) = match self.phase {
            RacePhase::Race | RacePhase::Finish => (self.event_idx + 1, RacePhase::Practice1),
            phase => {
                let track = catalog.get_event(self.event_idx)?;
                (self.event_idx, phase.get_next_phase(track.includes_sprint()))
            }
        };
        if event_idx >= catalog.len() {
            return Err(SimError::ChampionshipOver(catalog.len()));
        }
        Ok(EventProgress { event_idx, phase })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pre::reference::{TrackEntry, WeekendType};

    fn catalog() -> TrackCatalog {
        let track = |weekend_type| TrackEntry {
            country: "Italy".to_owned(),
            name: "Monza".to_owned(),
            weekend_type,
            length_m: 5793,
        };
        TrackCatalog::new(vec![track(WeekendType::Plain), track(WeekendType::Sprint)])
    }

    #[test]
    fn parses_progress_file() {
        let progress = EventProgress::parse(Path::new("championship.txt"), "race=1\nphase=6\n").unwrap();
        assert_eq!(
            progress,
            EventProgress {
                event_idx: 1,
                phase: RacePhase::Qualifying3
            }
        );
    }

    #[test]
    fn rejects_malformed_progress() {
        let path = Path::new("championship.txt");
        assert!(matches!(
            EventProgress::parse(path, "race=1\nstage=6\n"),
            Err(SimError::Parse { line: 2, .. })
        ));
        assert!(EventProgress::parse(path, "race=x\nphase=6\n").is_err());
        assert!(EventProgress::parse(path, "race=1\nphase=42\n").is_err());
        assert!(EventProgress::parse(path, "race=1\n").is_err());
    }

    #[test]
    fn next_phase_follows_weekend_type() {
        let catalog = catalog();
        let next = EventProgress::start().get_next(&catalog).unwrap();
        assert_eq!(next.phase, RacePhase::Practice1);

        let after_fp1 = EventProgress {
            event_idx: 1,
            phase: RacePhase::Practice1,
        };
        assert_eq!(
            after_fp1.get_next(&catalog).unwrap().phase,
            RacePhase::SprintQualifying1
        );

        let after_race = EventProgress {
            event_idx: 0,
            phase: RacePhase::Race,
        };
        assert_eq!(
            after_race.get_next(&catalog).unwrap(),
            EventProgress {
                event_idx: 1,
                phase: RacePhase::Practice1
            }
        );
    }

    #[test]
    fn championship_ends_after_last_event() {
        let last = EventProgress {
            event_idx: 1,
            phase: RacePhase::Race,
        };
        assert!(matches!(
            last.get_next(&catalog()),
            Err(SimError::ChampionshipOver(2))
        ));
    }

    #[test]
    fn missing_file_means_not_started_and_write_reads_back() {
        let dir = std::env::temp_dir().join(format!("racesim-progress-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("championship.txt");
        let _ = std::fs::remove_file(&path);
        assert_eq!(EventProgress::read(&path).unwrap(), None);

        let progress = EventProgress {
            event_idx: 3,
            phase: RacePhase::Sprint,
        };
        progress.write(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "race=3\nphase=10\n");
        assert_eq!(EventProgress::read(&path).unwrap(), Some(progress));
    }
}
