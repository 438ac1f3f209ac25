use crate::core::car_time::CarTime;
use crate::core::phase::RacePhase;
use crate::core::ranking::rank_indices;
use crate::core::shared_state::{CarStat, SharedSession};
use crate::error::Result;
use crate::interfaces::screen_interface::{
    Gap, PositionChange, RankedRow, RowStatus, ScreenSnapshot,
};
use flume::Sender;
use helpers::general::argmin_by_key;
use std::thread::sleep;
use std::time::Duration;
use tracing::{debug, warn};

/// ScreenManager periodically ranks the cars and hands the snapshot to the renderer. It only ever
/// reads the shared state.
pub struct ScreenManager<'a> {
    session: &'a SharedSession,
    phase: RacePhase,
    active: usize,
    refresh: Duration,
    previous_order: Vec<u32>,
}

impl<'a> ScreenManager<'a> {
    pub fn new(
        session: &'a SharedSession,
        phase: RacePhase,
        active: usize,
        refresh: Duration,
    ) -> ScreenManager<'a> {
        ScreenManager {
            session,
            phase,
            active,
            refresh,
            previous_order: Vec::new(),
        }
    }

    /// run refreshes the ranking until the session is over and returns the final snapshot. A
    /// renderer that hung up does not stop the session.
    pub fn run(mut self, tx: Option<&Sender<ScreenSnapshot>>) -> Result<ScreenSnapshot> {
        let mut renderer_gone = false;

        loop {
            let view = self.session.read_screen_view(self.active)?;
            let final_view = view.running_count == 0 && !view.pending;
            let snapshot = build_snapshot(
                self.phase,
                &view.car_stats,
                &self.previous_order,
                self.active,
                final_view,
            );
            self.previous_order = snapshot.get_order();

            if let Some(tx) = tx {
                if !renderer_gone && tx.send(snapshot.clone()).is_err() {
                    warn!("Renderer disconnected, continuing without live ranking");
                    renderer_gone = true;
                }
            }

            if final_view {
                debug!(phase = %self.phase, "Final ranking taken");
                return Ok(snapshot);
            }
            sleep(self.refresh);
        }
    }
}

/// build_snapshot ranks the cars and derives gaps, highlights and position changes.
pub fn build_snapshot(
    phase: RacePhase,
    car_stats: &[CarStat],
    previous_order: &[u32],
    active: usize,
    final_view: bool,
) -> ScreenSnapshot {
    let race_mode = phase.is_race_mode();
    let active = active.min(car_stats.len());
    let sorted: Vec<&CarStat> = rank_indices(car_stats, active, race_mode)
        .into_iter()
        .map(|idx| &car_stats[idx])
        .collect();

    let set = |t: CarTime| if t.is_unset() { None } else { Some(t) };
    let best_lap_pos = argmin_by_key(&sorted[..active], |car| set(car.best_lap));
    let best_section_pos: [Option<usize>; 3] = [0, 1, 2]
        .map(|s| argmin_by_key(&sorted[..active], |car| set(car.best_section_times[s])));

    // in races the gaps only mean something once the leader completed a lap
    let gaps_known = !race_mode || sorted.first().map_or(false, |leader| leader.distance >= 3);

    let rows = sorted
        .iter()
        .enumerate()
        .map(|(pos, car)| {
            let is_active = pos < active;

            let status = if car.crashed {
                RowStatus::Out
            } else if !is_active || car.in_stand {
                RowStatus::InStand
            } else {
                RowStatus::Running
            };

            let (gap_ahead, gap_leader) = if car.crashed {
                (Gap::Out, Gap::Out)
            } else if pos == 0 || !is_active || !gaps_known {
                (Gap::None, Gap::None)
            } else {
                (
                    get_gap(sorted[pos - 1], car, race_mode),
                    get_gap(sorted[0], car, race_mode),
                )
            };

            RankedRow {
                pilot_id: car.pilot_id,
                compl_laps: car.get_compl_laps(),
                distance: car.distance,
                total_time: car.total_time,
                current_section_times: car.current_section_times,
                best_section_times: car.best_section_times,
                best_lap: car.best_lap,
                pit_stop_count: car.pit_stop_count,
                status,
                gap_ahead,
                gap_leader,
                change: get_position_change(pos, car.pilot_id, previous_order, is_active),
                best_lap_highlight: best_lap_pos == Some(pos),
                best_section_highlight: [0, 1, 2].map(|s| best_section_pos[s] == Some(pos)),
            }
        })
        .collect();

    ScreenSnapshot {
        phase,
        race_mode,
        active,
        rows,
        final_view,
    }
}

/// get_gap returns the gap of car to a reference car ranked ahead of it.
///
/// In races: cars on the same lap are compared by total time. A car less than one lap behind
/// is projected forward by its two most recent section times first. Otherwise the lap difference
/// is reported. In timed sessions the best laps are compared.
fn get_gap(reference: &CarStat, car: &CarStat, race_mode: bool) -> Gap {
    if !race_mode {
        if reference.best_lap.is_unset() || car.best_lap.is_unset() {
            return Gap::None;
        }
        return Gap::Time(car.best_lap.saturating_sub(reference.best_lap));
    }

    if reference.get_compl_laps() == car.get_compl_laps() {
        if reference.total_time >= car.total_time {
            Gap::Overtaking
        } else {
            Gap::Time(car.total_time.saturating_sub(reference.total_time))
        }
    } else if reference.distance.saturating_sub(car.distance) < 3 {
        let estimated =
            car.total_time + car.current_section_times[0] + car.current_section_times[1];
        if reference.total_time >= estimated {
            Gap::Overtaking
        } else {
            Gap::Time(estimated.saturating_sub(reference.total_time))
        }
    } else {
        Gap::Laps(
            reference
                .get_compl_laps()
                .saturating_sub(car.get_compl_laps()),
        )
    }
}

/// get_position_change: a car found at the same position is unchanged, one found above its
/// current position lost places, anything else gained.
fn get_position_change(
    pos: usize,
    pilot_id: u32,
    previous_order: &[u32],
    is_active: bool,
) -> PositionChange {
    if !is_active {
        return PositionChange::Inactive;
    }
    if previous_order.is_empty() || previous_order.get(pos) == Some(&pilot_id) {
        return PositionChange::Same;
    }
    let above = &previous_order[..pos.min(previous_order.len())];
    if above.contains(&pilot_id) {
        PositionChange::Down
    } else {
        PositionChange::Up
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn race_car(pilot_id: u32, distance: u32, total_s: u32) -> CarStat {
        CarStat {
            distance,
            total_time: CarTime::from_secs(total_s),
            in_stand: false,
            ..CarStat::new(pilot_id)
        }
    }

    #[test]
    fn gaps_use_three_tiers() {
        let mut third = race_car(3, 8, 180);
        third.current_section_times = [CarTime::from_secs(30), CarTime::from_secs(31), CarTime::ZERO];
        let stats = vec![
            race_car(1, 9, 270),
            race_car(2, 9, 275),
            third,
            race_car(4, 3, 95),
        ];
        let snapshot = build_snapshot(RacePhase::Race, &stats, &[], 4, false);

        let gaps: Vec<(Gap, Gap)> = snapshot
            .rows
            .iter()
            .map(|row| (row.gap_ahead, row.gap_leader))
            .collect();
        assert_eq!(gaps[0], (Gap::None, Gap::None));
        assert_eq!(
            gaps[1],
            (Gap::Time(CarTime::from_secs(5)), Gap::Time(CarTime::from_secs(5)))
        );
        // projected 180 + 30 + 31 = 241 is not behind either car ahead
        assert_eq!(gaps[2], (Gap::Overtaking, Gap::Overtaking));
        assert_eq!(gaps[3], (Gap::Laps(1), Gap::Laps(2)));
    }

    #[test]
    fn crashed_and_early_race_cars_have_no_time_gap() {
        let mut crashed = race_car(2, 1, 0);
        crashed.crashed = true;
        let stats = vec![race_car(1, 2, 0), crashed];
        let snapshot = build_snapshot(RacePhase::Race, &stats, &[], 2, false);

        assert_eq!(snapshot.rows[0].gap_ahead, Gap::None);
        assert_eq!(snapshot.rows[1].gap_ahead, Gap::Out);
        assert_eq!(snapshot.rows[1].gap_leader, Gap::Out);
        assert_eq!(snapshot.rows[1].status, RowStatus::Out);
    }

    #[test]
    fn position_changes_against_previous_order() {
        let stats = vec![race_car(1, 6, 100), race_car(2, 6, 90), race_car(3, 3, 50)];
        let snapshot = build_snapshot(RacePhase::Race, &stats, &[1, 2, 3], 2, false);

        assert_eq!(snapshot.get_order(), vec![2, 1, 3]);
        let changes: Vec<PositionChange> = snapshot.rows.iter().map(|row| row.change).collect();
        assert_eq!(
            changes,
            vec![PositionChange::Up, PositionChange::Down, PositionChange::Inactive]
        );
        assert_eq!(snapshot.rows[2].status, RowStatus::InStand);
    }

    #[test]
    fn qualifying_highlights_ignore_unset_times() {
        let mut a = CarStat::new(1);
        a.best_lap = CarTime::from_secs(91);
        a.best_section_times = [
            CarTime::from_secs(30),
            CarTime::from_secs(32),
            CarTime::UNSET,
        ];
        let mut b = CarStat::new(2);
        b.best_lap = CarTime::from_secs(92);
        b.best_section_times = [
            CarTime::from_secs(31),
            CarTime::from_secs(29),
            CarTime::from_secs(30),
        ];
        let c = CarStat::new(3);
        let snapshot = build_snapshot(RacePhase::Qualifying1, &[c, b, a], &[], 3, true);

        assert_eq!(snapshot.get_order(), vec![1, 2, 3]);
        assert!(snapshot.rows[0].best_lap_highlight);
        assert_eq!(snapshot.rows[0].best_section_highlight, [true, false, false]);
        assert_eq!(snapshot.rows[1].best_section_highlight, [false, true, true]);
        assert_eq!(snapshot.rows[1].gap_ahead, Gap::Time(CarTime::from_secs(1)));
        assert_eq!(snapshot.rows[2].gap_ahead, Gap::None);
        assert!(snapshot.final_view);
    }
}
