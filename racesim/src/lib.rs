//! Concurrent race weekend simulator.
//!
//! Every phase of a weekend runs one worker thread per car, a controller integrating the
//! telemetry the workers publish, and a screen manager ranking the cars. All of them share one
//! state object behind a reader/writer gate.

pub mod error;

pub mod core {
    pub mod car_time;
    pub mod car_worker;
    pub mod championship;
    pub mod controller;
    pub mod driving;
    pub mod gate;
    pub mod handle_session;
    pub mod phase;
    pub mod ranking;
    pub mod screen_manager;
    pub mod shared_state;
}

pub mod interfaces {
    pub mod screen_interface;
}

pub mod post {
    pub mod phase_result;
    pub mod progress;
    pub mod standings;
}

pub mod pre {
    pub mod read_sim_pars;
    pub mod reference;
    pub mod sim_opts;
}
