//! Start/stop state machine shared by bots and transports.
//!
//! ```text
//! Stopped ──start()──▶ Starting ──ok──▶ Running
//!    ▲                    │                │
//!    └──────── err ───────┘             stop()
//!    │                                     ▼
//!    └────────────── ok ─────────────  Stopping ──err──▶ Running
//! ```
//!
//! Both transitions are idempotent: starting a running component and stopping
//! a stopped one return immediately without touching the adapter.

use std::fmt;
use std::future::Future;

use parking_lot::Mutex;

/// Lifecycle state of a bot or transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
        }
    }
}

/// Guarded lifecycle state.
///
/// The lock is never held across an await; the adapter procedure runs while
/// the state is `Starting` or `Stopping`, which rejects concurrent transitions.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: Mutex<LifecycleState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Runs `start` unless already running.
    ///
    /// Returns `Ok(true)` when the component is running afterwards and
    /// `Ok(false)` when another transition is in flight.
    pub async fn start_with<F, Fut, E>(&self, start: F) -> Result<bool, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        {
            let mut state = self.state.lock();
            match *state {
                LifecycleState::Running => return Ok(true),
                LifecycleState::Starting | LifecycleState::Stopping => return Ok(false),
                LifecycleState::Stopped => *state = LifecycleState::Starting,
            }
        }

        let guard = Transition::new(&self.state, LifecycleState::Stopped);
        start().await?;
        guard.finish(LifecycleState::Running);
        Ok(true)
    }

    /// Runs `stop` unless already stopped.
    ///
    /// Returns `Ok(true)` when the component is stopped afterwards. A failed
    /// stop leaves the component running.
    pub async fn stop_with<F, Fut, E>(&self, stop: F) -> Result<bool, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        {
            let mut state = self.state.lock();
            match *state {
                LifecycleState::Stopped => return Ok(true),
                LifecycleState::Starting | LifecycleState::Stopping => return Ok(false),
                LifecycleState::Running => *state = LifecycleState::Stopping,
            }
        }

        let guard = Transition::new(&self.state, LifecycleState::Running);
        stop().await?;
        guard.finish(LifecycleState::Stopped);
        Ok(true)
    }
}

/// Restores the fallback state if a transition fails or its future is dropped.
struct Transition<'a> {
    state: &'a Mutex<LifecycleState>,
    fallback: Option<LifecycleState>,
}

impl<'a> Transition<'a> {
    fn new(state: &'a Mutex<LifecycleState>, fallback: LifecycleState) -> Self {
        Self {
            state,
            fallback: Some(fallback),
        }
    }

    fn finish(mut self, target: LifecycleState) {
        self.fallback = None;
        *self.state.lock() = target;
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        if let Some(fallback) = self.fallback.take() {
            *self.state.lock() = fallback;
        }
    }
}
