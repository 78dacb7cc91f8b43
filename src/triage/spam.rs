//! Per-user sliding-window spam guard.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use crate::base::config::Config;

/// Counter state for one user inside the current window.
struct UserSpamState {
    window_start: Instant,
    count: u32,
}

/// Per-user sliding counter that bounds message throughput.
///
/// This is trivially cloneable and can be passed around without an outer
/// `Arc` or `Mutex`; the counters are shared across clones.
#[derive(Clone)]
pub struct SpamGuard {
    max: u32,
    window: Duration,
    states: Arc<Mutex<HashMap<String, UserSpamState>>>,
}

impl SpamGuard {
    pub fn new(config: &Config) -> Self {
        Self {
            max: config.spam_max,
            window: Duration::from_secs(config.spam_window_secs),
            states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a message from `user_id` at `now` and report whether it must be
    /// blocked.
    ///
    /// At the threshold the counter stops incrementing, so a blocked user is
    /// unblocked as soon as one full window has elapsed since the window
    /// started.
    pub fn check_and_record(&self, user_id: &str, now: Instant) -> bool {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());

        match states.get_mut(user_id) {
            Some(state) => {
                if now.duration_since(state.window_start) >= self.window {
                    state.window_start = now;
                    state.count = 1;
                    return false;
                }

                if state.count >= self.max {
                    return true;
                }

                state.count += 1;
                false
            }
            None => {
                states.insert(user_id.to_string(), UserSpamState { window_start: now, count: 1 });
                false
            }
        }
    }
}
