use std::cmp::Ordering;
use std::time::Duration;

/// argmin_by_key returns the index of the first strictly smallest key in x, skipping entries for
/// which key returns None. Returns None if no entry has a key.
pub fn argmin_by_key<T, K, F>(x: &[T], mut key: F) -> Option<usize>
where
    K: PartialOrd,
    F: FnMut(&T) -> Option<K>,
{
    let mut best: Option<(usize, K)> = None;

    for (i, el) in x.iter().enumerate() {
        if let Some(val) = key(el) {
            match &best {
                Some((_, val_min)) if !(val < *val_min) => {}
                _ => best = Some((i, val)),
            }
        }
    }

    best.map(|(i, _)| i)
}

/// argsort_by returns the indices that would sort x according to the comparator. The sort is
/// stable, i.e. equal elements keep their original relative order.
pub fn argsort_by<T, F>(x: &[T], mut compare: F) -> Vec<usize>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let mut indices: Vec<usize> = (0..x.len()).collect();
    indices.sort_by(|&a, &b| compare(&x[a], &x[b]));
    indices
}

/// sim_to_wall converts a span of simulated milliseconds into the wall-clock duration it takes
/// when the simulation runs realtime_factor times faster than real time.
pub fn sim_to_wall(sim_millis: u64, realtime_factor: f64) -> Duration {
    if realtime_factor <= 0.0 || !realtime_factor.is_finite() {
        return Duration::from_millis(sim_millis);
    }
    Duration::from_secs_f64(sim_millis as f64 / 1000.0 / realtime_factor)
}

/// sleep_remaining sleeps for target minus the time already spent elsewhere, if anything is left.
pub fn sleep_remaining(target: Duration, already_spent: Duration) {
    if let Some(rest) = target.checked_sub(already_spent) {
        if !rest.is_zero() {
            std::thread::sleep(rest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argsort_is_stable() {
        let x = [3, 1, 2, 1];
        assert_eq!(argsort_by(&x, |a, b| a.cmp(b)), vec![1, 3, 2, 0]);
    }

    #[test]
    fn argmin_skips_missing_and_keeps_first_on_tie() {
        let x = [None, Some(5), Some(3), Some(3)];
        assert_eq!(argmin_by_key(&x, |v| *v), Some(2));
        let empty: [Option<u32>; 2] = [None, None];
        assert_eq!(argmin_by_key(&empty, |v| *v), None);
    }

    #[test]
    fn sim_to_wall_scales_by_factor() {
        assert_eq!(sim_to_wall(60_000, 60.0), Duration::from_secs(1));
        assert_eq!(sim_to_wall(500, 0.0), Duration::from_millis(500));
    }
}
