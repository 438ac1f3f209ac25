use crate::core::shared_state::CarStat;
use helpers::general::argsort_by;
use std::cmp::Ordering;

/// compare_race orders sprint and race cars: running cars before crashed ones, then by distance
/// (more first), then by total time (less first).
pub fn compare_race(a: &CarStat, b: &CarStat) -> Ordering {
    a.crashed
        .cmp(&b.crashed)
        .then_with(|| b.distance.cmp(&a.distance))
        .then_with(|| a.total_time.cmp(&b.total_time))
}

/// compare_qualifying orders practice and qualifying cars by best lap, ties are decided by the
/// sum of the best section times.
pub fn compare_qualifying(a: &CarStat, b: &CarStat) -> Ordering {
    a.best_lap
        .cmp(&b.best_lap)
        .then_with(|| a.get_best_sections_sum().cmp(&b.get_best_sections_sum()))
}

/// rank_indices returns the car indices in ranking order. Only the first `active` cars are
/// ranked, the others keep their order behind them.
pub fn rank_indices(car_stats: &[CarStat], active: usize, race_mode: bool) -> Vec<usize> {
    let active = active.min(car_stats.len());
    let compare = if race_mode {
        compare_race
    } else {
        compare_qualifying
    };

    let mut order = argsort_by(&car_stats[..active], compare);
    order.extend(active..car_stats.len());
    order
}
