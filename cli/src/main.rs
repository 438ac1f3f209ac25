mod terminal;

use clap::Parser;
use racesim::core::championship::Championship;
use racesim::core::driving::RandomDriving;
use racesim::error::SimError;
use racesim::interfaces::screen_interface::Renderer;
use racesim::pre::read_sim_pars::{read_session_pars, SessionPars};
use racesim::pre::sim_opts::SimOpts;
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use terminal::{print_header, print_standings, TerminalRenderer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// join_renderer waits for the live ranking to end. A failed or panicked renderer is logged and
/// reported as `false`; the simulated phase is persisted regardless.
fn join_renderer(renderer_thread: thread::JoinHandle<anyhow::Result<()>>) -> bool {
    match renderer_thread.join() {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(error = %e, "Live ranking failed, the phase is saved anyway");
            false
        }
        Err(_) => {
            warn!("Renderer thread panicked, the phase is saved anyway");
            false
        }
    }
}

/// ask_confirmation repeats the question until the answer is Y or N.
fn ask_confirmation() -> anyhow::Result<bool> {
    let stdin = io::stdin();
    loop {
        print!(" Do you want to start ? (Y/N): ");
        io::stdout().flush()?;

        let mut answer = String::new();
        if stdin.lock().read_line(&mut answer)? == 0 {
            return Ok(false);
        }
        match answer.trim() {
            "Y" | "y" => return Ok(true),
            "N" | "n" => return Ok(false),
            _ => continue,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();

    let default_level = if sim_opts.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    // get session parameters
    let pars = if let Some(parfile_path) = &sim_opts.parfile_path {
        info!(path = %parfile_path.display(), "Reading session parameters");
        read_session_pars(parfile_path)?
    } else {
        SessionPars::default()
    };

    let mut championship = Championship::load(&sim_opts.data_dir, pars)?;

    let next = match championship.get_next_progress() {
        Ok(next) => next,
        Err(SimError::ChampionshipOver(events)) => {
            println!("   !!! Championship is over after {} events !!!", events);
            print_standings(&championship.get_season_standings()?);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    print_header(next.event_idx, championship.get_track(next.event_idx)?, next.phase);

    if !sim_opts.yes && !ask_confirmation()? {
        println!("Ok, I quit");
        return Ok(());
    }

    let setup = championship.prepare_session(next)?;

    // EXECUTION -----------------------------------------------------------------------------------
    let (tx, rx) = flume::unbounded();
    let drivers = championship.get_drivers().clone();
    let renderer_thread = thread::spawn(move || -> anyhow::Result<()> {
        let mut renderer = TerminalRenderer::new(drivers);
        for snapshot in rx.iter() {
            renderer.render(&snapshot)?;
        }
        Ok(())
    });

    // every car gets its own seed so that no two cars drive alike
    let seed_base = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let pars = championship.get_pars().clone();
    let t_start = Instant::now();

    let outcome = championship.run_session(
        &setup,
        |grid_idx, _pilot_id| RandomDriving::new(seed_base + grid_idx as u64 * 100, &pars),
        Some(&tx),
        sim_opts.realtime_factor,
    );
    drop(tx);
    join_renderer(renderer_thread);
    let outcome = outcome?;

    info!(
        execution_time_ms = t_start.elapsed().as_millis() as u64,
        "Simulation finished"
    );

    // POST-PROCESSING -----------------------------------------------------------------------------
    championship.complete_session(&setup, &outcome)?;
    print_standings(&championship.get_season_standings()?);

    Ok(())
}
