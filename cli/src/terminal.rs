use racesim::core::car_time::CarTime;
use racesim::core::phase::RacePhase;
use racesim::interfaces::screen_interface::{
    PositionChange, RankedRow, Renderer, RowStatus, ScreenSnapshot,
};
use racesim::post::standings::{get_shared_positions, PilotStanding};
use racesim::pre::reference::{DriverDirectory, TrackEntry};
use std::fmt::Write as FmtWrite;
use std::io::{self, Write};

const RESET: &str = "\x1b[0m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const PURPLE: &str = "\x1b[35m";
const FAINT: &str = "\x1b[2m";
const HIGHLIGHT: &str = "\x1b[7m\x1b[92m\x1b[1m";

/// TerminalRenderer redraws the live ranking in place using ANSI escape sequences.
pub struct TerminalRenderer {
    drivers: DriverDirectory,
}

impl TerminalRenderer {
    pub fn new(drivers: DriverDirectory) -> TerminalRenderer {
        TerminalRenderer { drivers }
    }

    fn get_short_name(&self, pilot_id: u32) -> &str {
        self.drivers
            .get_driver(pilot_id)
            .map(|driver| driver.short_name.as_str())
            .unwrap_or("???")
    }

    fn write_row(&self, out: &mut String, pos: usize, row: &RankedRow, race_mode: bool) -> std::fmt::Result {
        let change = match row.change {
            PositionChange::Same => "=".to_owned(),
            PositionChange::Up => format!("{}↑{}", GREEN, RESET),
            PositionChange::Down => format!("{}↓{}", RED, RESET),
            PositionChange::Inactive => " ".to_owned(),
        };
        let status = match row.status {
            RowStatus::Running => "   ",
            RowStatus::InStand => "PIT",
            RowStatus::Out => "OUT",
        };

        write!(out, "│ {:>2} {} │ {:>3} {:<3} │", pos + 1, change, row.pilot_id, self.get_short_name(row.pilot_id))?;
        for s in 0..3 {
            write!(out, " {} │", highlight(row.best_section_times[s], row.best_section_highlight[s]))?;
        }
        write!(out, " {} │", highlight(row.best_lap, row.best_lap_highlight))?;
        if race_mode {
            write!(
                out,
                " {:>3} │ {:>2} │ {:>11} │",
                row.compl_laps,
                row.pit_stop_count,
                row.total_time.to_hms_string()
            )?;
        }
        writeln!(out, " {:>8} │ {:>8} │ {} │", row.gap_ahead, row.gap_leader, status)
    }
}

fn highlight(t: CarTime, best: bool) -> String {
    if t.is_unset() {
        format!("{}---.---{}", FAINT, RESET)
    } else if best {
        format!("{}{:>7}{}", PURPLE, t, RESET)
    } else {
        format!("{:>7}", t)
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, snapshot: &ScreenSnapshot) -> anyhow::Result<()> {
        let mut out = String::new();
        // save cursor, jump below the header
        write!(out, "\x1b[s\x1b[12;1H")?;
        writeln!(
            out,
            "{} {}{}",
            snapshot.phase.long_name(),
            if snapshot.final_view { "- final classification" } else { "" },
            "\x1b[K"
        )?;
        write!(out, "│ Pos  │ Pilot   │   S1    │   S2    │   S3    │   Lap   │")?;
        if snapshot.race_mode {
            write!(out, " Lap │ PS │    Total    │")?;
        }
        writeln!(out, "   Gap    │  Leader  │     │")?;

        for (pos, row) in snapshot.rows.iter().enumerate() {
            self.write_row(&mut out, pos, row, snapshot.race_mode)?;
        }
        write!(out, "\x1b[u")?;

        let mut stdout = io::stdout().lock();
        stdout.write_all(out.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

/// print_header clears the screen and shows the event and where the phase sits in the weekend.
pub fn print_header(event_idx: usize, track: &TrackEntry, phase: RacePhase) {
    println!("\x1b[2J\x1b[1;1H┌──────────────────────────────────────────────────────┐");
    println!("│ Formula 1 - Manager                                  │");
    println!("└──────────────────────────────────────────────────────┘");
    println!("   Race #{} - '{}' - '{}'", event_idx + 1, track.country, track.name);
    println!("   Phase: '{}'", phase.long_name());

    let mut lattice = String::from("   ");
    for &p in RacePhase::lattice(track.includes_sprint()) {
        if matches!(p, RacePhase::StartOfWeekend | RacePhase::Finish) {
            continue;
        }
        let style = if p == phase { HIGHLIGHT } else { FAINT };
        lattice.push_str(&format!("│{} {} {}", style, p.short_tag(), RESET));
    }
    lattice.push('│');
    println!("{}", lattice);
}

/// print_standings shows the season standings, pilots equal in score and wins share a position.
pub fn print_standings(standings: &[PilotStanding]) {
    println!();
    println!("┌─────┬──────────────────────────────┬───────┬──────────┐");
    println!("│ Pos │ Name                         │ total │ Race won │");
    println!("├─────┼──────────────────────────────┼───────┼──────────┤");
    for (standing, pos) in standings.iter().zip(get_shared_positions(standings)) {
        println!(
            "│ {:>3} │ {:<28} │ {:>5} │ {:>8} │",
            pos, standing.name, standing.score, standing.races_won
        );
    }
    println!("└─────┴──────────────────────────────┴───────┴──────────┘");
}
