use racesim::core::car_time::CarTime;
use racesim::core::car_worker::WorkerOutcome;
use racesim::core::championship::Championship;
use racesim::core::driving::ScriptedDriving;
use racesim::core::phase::RacePhase;
use racesim::error::SimError;
use racesim::interfaces::screen_interface::{Gap, RowStatus};
use racesim::post::progress::EventProgress;
use racesim::pre::read_sim_pars::SessionPars;
use std::fs;
use std::path::PathBuf;

const DRIVERS: &str = "1;AAA;Alice Archer\n2;BBB;Bruno Baker\n3;CCC;Chloe Carter\n";

fn data_dir(name: &str, progress: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("racesim-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("drivers.csv"), DRIVERS).unwrap();
    fs::write(dir.join("tracks.csv"), "Italy;Monza;plain;5000\n").unwrap();
    fs::write(dir.join("championship.txt"), progress).unwrap();
    dir
}

fn secs(s: u32) -> CarTime {
    CarTime::from_secs(s)
}

#[test]
fn race_with_a_crash_scores_and_persists() {
    let dir = data_dir("race", "race=0\nphase=6\n");
    fs::write(
        dir.join("race_01_Q3.csv"),
        "1;90.000;30.000;30.000;30.000\n2;91.000;30.000;30.500;30.500\n3;92.000;31.000;30.500;30.500\n",
    )
    .unwrap();
    let pars = SessionPars {
        race_distance_m: 10_000,
        grid_delay_ms: 0,
        viewer_refresh_ms: 5,
        ..SessionPars::default()
    };

    let mut championship = Championship::load(&dir, pars).unwrap();
    let next = championship.get_next_progress().unwrap();
    assert_eq!(next.phase, RacePhase::Race);
    let setup = championship.prepare_session(next).unwrap();
    assert_eq!(setup.required_laps, Some(2));
    assert_eq!(setup.active, 3);

    let outcome = championship
        .run_session(
            &setup,
            |_grid_idx, pilot_id| {
                Ok(match pilot_id {
                    1 => ScriptedDriving::new([secs(30)]),
                    2 => ScriptedDriving::new([secs(40)]),
                    _ => ScriptedDriving::new([secs(30)]).crash_on_check(0),
                })
            },
            None,
            200.0,
        )
        .unwrap();

    assert_eq!(
        outcome.worker_outcomes,
        vec![
            WorkerOutcome::Finished,
            WorkerOutcome::Finished,
            WorkerOutcome::Crashed
        ]
    );
    let state = &outcome.final_state;
    assert_eq!(state.running_count, 0);
    assert!(state.race_over);
    assert_eq!(state.race_over_by, Some(1));
    assert_eq!(outcome.controller_report.race_over_by, Some(1));
    assert_eq!(outcome.controller_report.integrated, 13);
    assert!(state.slots.iter().all(|slot| slot.consumed));

    let ranked = outcome.get_ranked_stats();
    let order: Vec<u32> = ranked.iter().map(|car| car.pilot_id).collect();
    assert_eq!(order, vec![1, 2, 3]);
    assert_eq!(ranked[0].distance, 6);
    assert_eq!(ranked[0].total_time, secs(180));
    assert_eq!(ranked[0].best_lap, secs(90));
    assert_eq!(ranked[1].total_time, secs(240));
    assert!(ranked[2].crashed);
    assert_eq!(ranked[2].distance, 0);

    let snapshot = &outcome.final_snapshot;
    assert!(snapshot.final_view);
    assert_eq!(snapshot.get_order(), vec![1, 2, 3]);
    assert_eq!(snapshot.rows[1].gap_ahead, Gap::Time(secs(60)));
    assert_eq!(snapshot.rows[2].gap_leader, Gap::Out);
    assert_eq!(snapshot.rows[2].status, RowStatus::Out);

    championship.complete_session(&setup, &outcome).unwrap();
    let result = fs::read_to_string(dir.join("race_01_race.csv")).unwrap();
    let pilots: Vec<&str> = result
        .lines()
        .map(|line| line.split(';').next().unwrap())
        .collect();
    assert_eq!(pilots, vec!["1", "2", "3"]);
    assert!(result.starts_with("1;90.000;30.000;30.000;30.000\n"));
    assert_eq!(
        fs::read_to_string(dir.join("race_01_race_ranking.csv")).unwrap(),
        "1;25\n2;20\n3;0\n"
    );
    assert_eq!(
        fs::read_to_string(dir.join("championship.txt")).unwrap(),
        "race=0\nphase=11\n"
    );

    let standings = championship.get_season_standings().unwrap();
    let table: Vec<(u32, u32, u32)> = standings
        .iter()
        .map(|s| (s.pilot_id, s.score, s.races_won))
        .collect();
    assert_eq!(table, vec![(1, 25, 1), (2, 20, 0), (3, 0, 0)]);

    // the calendar holds a single event
    assert!(matches!(
        championship.get_next_progress(),
        Err(SimError::ChampionshipOver(1))
    ));
}

#[test]
fn second_qualifying_segment_runs_the_cut_field() {
    let dir = data_dir("qualifying", "race=0\nphase=4\n");
    fs::write(
        dir.join("race_01_Q1.csv"),
        "3;93.000;31.000;31.000;31.000\n1;94.000;31.000;31.000;32.000\n2;95.000;32.000;31.000;32.000\n",
    )
    .unwrap();
    let pars = SessionPars {
        qualifying_minutes: [18, 2, 1],
        second_segment_cutoff: 2,
        third_segment_cutoff: 1,
        viewer_refresh_ms: 5,
        ..SessionPars::default()
    };

    let mut championship = Championship::load(&dir, pars).unwrap();
    let setup = championship
        .prepare_session(championship.get_next_progress().unwrap())
        .unwrap();
    assert_eq!(setup.phase, RacePhase::Qualifying2);
    assert_eq!(setup.active, 2);
    let starting: Vec<u32> = setup.car_stats.iter().map(|car| car.pilot_id).collect();
    assert_eq!(starting, vec![3, 1, 2]);
    assert!(setup.car_stats.iter().all(|car| car.best_lap.is_unset()));

    // 10s in the stand and a 90s lap fit into 120s once
    let outcome = championship
        .run_session(
            &setup,
            |_grid_idx, pilot_id| {
                let section = if pilot_id == 1 { secs(30) } else { secs(31) };
                Ok(ScriptedDriving::new([section]).with_stand_wait(secs(10)))
            },
            None,
            1_000.0,
        )
        .unwrap();

    assert_eq!(outcome.worker_outcomes.len(), 2);
    let ranked = outcome.get_ranked_stats();
    let order: Vec<u32> = ranked.iter().map(|car| car.pilot_id).collect();
    assert_eq!(order, vec![1, 3, 2]);
    assert_eq!(ranked[0].best_lap, secs(90));
    assert_eq!(ranked[1].best_lap, secs(93));
    assert!(ranked[0].in_stand);
    assert!(ranked[2].best_lap.is_unset());
    assert_eq!(
        outcome.final_snapshot.rows[2].status,
        RowStatus::InStand
    );

    championship.complete_session(&setup, &outcome).unwrap();
    assert!(!dir.join("race_01_Q2_ranking.csv").exists());
    assert_eq!(
        championship.get_progress(),
        EventProgress {
            event_idx: 0,
            phase: RacePhase::Qualifying2
        }
    );

    // Q3 starts from the Q2 result with only the fastest car
    let q3 = championship
        .prepare_session(championship.get_next_progress().unwrap())
        .unwrap();
    let starting: Vec<u32> = q3.car_stats.iter().map(|car| car.pilot_id).collect();
    assert_eq!(starting, vec![1, 3, 2]);
    assert_eq!(q3.active, 1);
}

#[test]
fn missing_previous_result_aborts_preparation() {
    let dir = data_dir("missing", "race=0\nphase=6\n");
    let championship = Championship::load(&dir, SessionPars::default()).unwrap();
    let next = championship.get_next_progress().unwrap();
    let err = championship.prepare_session(next).unwrap_err();
    assert!(err.to_string().contains("Race needs the result of Qualifying 3"));
}

#[test]
fn malformed_progress_file_is_rejected() {
    let dir = data_dir("progress", "race=0\nphase=banana\n");
    let err = Championship::load(&dir, SessionPars::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SimError>(),
        Some(SimError::Parse { line: 2, .. })
    ));
}
