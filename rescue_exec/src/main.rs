//! Main rescue robot executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Feed the watchdog
//!         - Input acquisition from the script:
//!             - Sensor frames
//!             - Telecommands
//!         - Control cycle (see `ctrl_loop`):
//!             - Sensor filtering
//!             - Telecommand processing
//!             - Hazard check
//!             - Navigation or manual control
//!         - Archiving of telemetry and hazard events
//!
//! # Modules
//!
//! All stateful modules (e.g. `nav_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::{eyre, WrapErr}, Report};
use log::{debug, info, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use comms_if::eqpt::sens::SensorFrame;
use rescue_lib::{
    ctrl_loop,
    data_store::DataStore,
    hazard_mgr,
    nav_ctrl,
    params::RescueExecParams,
    sensors,
    tm::TmRecord,
    watchdog::Watchdog,
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    script_interpreter::{PendingEntries, ScriptEntry, ScriptInterpreter},
    session::Session,
    time::MonotonicClock,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let exec_params: RescueExecParams = util::params::load("rescue_exec.toml")
        .wrap_err("Could not load the exec params")?;

    // Initialise session
    let session = Session::new(
        "rescue_exec",
        &exec_params.sessions_dir
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Rescue Robot Executable\n");
    info!("Session directory: {:?}", session.session_root);
    info!("Board role: {:?}\n", exec_params.board_role);

    // ---- LOAD PARAMETERS ----

    let sensors_params: sensors::Params = util::params::load("sensors.toml")
        .wrap_err("Could not load the sensor params")?;
    let hazard_params: hazard_mgr::Params = util::params::load("hazard.toml")
        .wrap_err("Could not load the hazard params")?;
    let nav_params: nav_ctrl::Params = util::params::load("nav_ctrl.toml")
        .wrap_err("Could not load the navigation params")?;

    info!("Parameters loaded");

    // ---- INITIALISE SCRIPT ----

    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    let script_path = script_path(&args)?;

    info!("Loading script from \"{}\"", script_path);

    let mut script = ScriptInterpreter::new(script_path)
        .wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} entries\n",
        script.get_duration(),
        script.get_num_entries()
    );

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ds = DataStore::init(&exec_params, sensors_params, hazard_params, nav_params)
        .wrap_err("Failed to initialise the control core")?;

    let mut tm_archiver = Archiver::from_path(&session, "telemetry.csv")
        .wrap_err("Failed to create the telemetry archive")?;
    let mut hazard_archiver = Archiver::from_path(&session, "hazard_events.csv")
        .wrap_err("Failed to create the hazard event archive")?;

    info!("Module initialisation complete\n");

    let cycle_period = Duration::from_millis(exec_params.cycle_period_ms);
    let clock = MonotonicClock::new();

    let mut watchdog = Watchdog::start(exec_params.watchdog_timeout_ms)
        .wrap_err("Failed to start the watchdog")?;

    // Sensor readings are held from one scripted frame to the next
    let mut frame: Option<SensorFrame> = None;

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        watchdog.feed();

        let now_ms = clock.now_ms();

        // ---- INPUT ----

        let mut tcs = Vec::new();

        match script.get_pending(now_ms as f64 / 1000.0) {
            PendingEntries::None => (),
            PendingEntries::Some(entries) => {
                for entry in entries {
                    match entry {
                        ScriptEntry::Tc(tc) => tcs.push(tc),
                        ScriptEntry::Sensors(f) => frame = Some(f),
                    }
                }
            },
            PendingEntries::EndOfScript => {
                info!("End of script reached, stopping");
                break
            }
        }

        // ---- CONTROL ----

        let out = ctrl_loop::tick(&mut ds, now_ms, frame, &tcs);

        // ---- WRITE ARCHIVES ----

        if let Err(e) = tm_archiver.serialise(TmRecord::from(&out.tm)) {
            warn!("Could not archive telemetry: {}", e);
        }

        for event in out.hazard_events.iter() {
            if let Err(e) = hazard_archiver.serialise(event) {
                warn!("Could not archive hazard event: {}", e);
            }
        }

        // ---- TELEMETRY ----

        if exec_params.tm_log_period_cycles > 0
            && ds.num_cycles % exec_params.tm_log_period_cycles == 0
        {
            match serde_json::to_string(&out.tm) {
                Ok(s) => debug!("TM: {}", s),
                Err(e) => warn!("Could not serialise telemetry: {}", e),
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;
        ds.last_loop_time_ms = cycle_dur.as_secs_f64() * 1000.0;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            },
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }
    }

    // ---- SHUTDOWN ----

    watchdog.stop();

    info!("End of execution");

    Ok(())
}

/// The script path, which must be the only argument after the program name.
fn script_path(args: &[String]) -> Result<&str, Report> {
    match args {
        [_, path] => Ok(path.as_str()),
        _ => Err(eyre!(
            "Expected exactly one argument (the script path), found {}",
            args.len().saturating_sub(1)
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_script_path() {
        let args = vec!["rescue_exec".to_string(), "scripts/patrol_demo.txt".to_string()];
        assert_eq!(script_path(&args).unwrap(), "scripts/patrol_demo.txt");

        assert!(script_path(&["rescue_exec".to_string()]).is_err());
        assert!(script_path(&[]).is_err());
    }
}
