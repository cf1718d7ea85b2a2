//! # Software watchdog
//!
//! A background thread which must be fed once per control cycle. If the loop
//! stops feeding it for longer than the timeout the starvation action runs,
//! which on the robot aborts the whole process. A core that is not cycling
//! cannot be trusted to stop the motors itself.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, error};
use util::time::MonotonicClock;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WatchdogError {
    #[error("The watchdog timeout must be non-zero")]
    ZeroTimeout,

    #[error("Could not start the watchdog thread: {0}")]
    SpawnError(std::io::Error),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct Watchdog {
    clock: MonotonicClock,
    last_fed_ms: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Watchdog {
    /// Start a watchdog which aborts the process when starved.
    pub fn start(timeout_ms: u64) -> Result<Self, WatchdogError> {
        Self::start_with_action(timeout_ms, move || {
            error!(
                "Watchdog not fed for more than {} ms, aborting",
                timeout_ms
            );
            log::logger().flush();
            std::process::abort();
        })
    }

    /// Start a watchdog which runs `on_starve` once when starved, after which
    /// the watchdog thread exits.
    pub fn start_with_action<F>(timeout_ms: u64, on_starve: F) -> Result<Self, WatchdogError>
    where
        F: FnOnce() + Send + 'static
    {
        if timeout_ms == 0 {
            return Err(WatchdogError::ZeroTimeout);
        }

        let clock = MonotonicClock::new();
        let last_fed_ms = Arc::new(AtomicU64::new(clock.now_ms()));
        let stop = Arc::new(AtomicBool::new(false));

        let poll = Duration::from_millis((timeout_ms / 10).max(1).min(100));

        let thread_last_fed = last_fed_ms.clone();
        let thread_stop = stop.clone();

        let handle = thread::Builder::new()
            .name("watchdog".into())
            .spawn(move || {
                loop {
                    thread::sleep(poll);

                    if thread_stop.load(Ordering::SeqCst) {
                        return;
                    }

                    let since_fed = clock
                        .now_ms()
                        .saturating_sub(thread_last_fed.load(Ordering::SeqCst));

                    if since_fed > timeout_ms {
                        on_starve();
                        return;
                    }
                }
            })
            .map_err(WatchdogError::SpawnError)?;

        debug!("Watchdog started with a {} ms timeout", timeout_ms);

        Ok(Self {
            clock,
            last_fed_ms,
            stop,
            handle: Some(handle),
        })
    }

    pub fn feed(&self) {
        self.last_fed_ms.store(self.clock.now_ms(), Ordering::SeqCst);
    }

    /// Stop the watchdog thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);

        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                error!("Watchdog thread panicked");
            }
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn flagged_watchdog(timeout_ms: u64) -> (Watchdog, Arc<AtomicBool>) {
        let starved = Arc::new(AtomicBool::new(false));
        let flag = starved.clone();

        let wd = Watchdog::start_with_action(timeout_ms, move || {
            flag.store(true, Ordering::SeqCst);
        }).unwrap();

        (wd, starved)
    }

    #[test]
    fn test_starved() {
        let (_wd, starved) = flagged_watchdog(50);

        thread::sleep(Duration::from_millis(500));
        assert!(starved.load(Ordering::SeqCst));
    }

    #[test]
    fn test_fed() {
        let (mut wd, starved) = flagged_watchdog(300);

        for _ in 0..20 {
            wd.feed();
            thread::sleep(Duration::from_millis(20));
        }
        wd.stop();

        assert!(!starved.load(Ordering::SeqCst));
    }

    #[test]
    fn test_zero_timeout() {
        assert!(matches!(
            Watchdog::start_with_action(0, || ()),
            Err(WatchdogError::ZeroTimeout)
        ));
    }
}
