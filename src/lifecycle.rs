//! Keeps the server alive only while the UI keeps pinging it.
//!
//! The supervisor moves through `Starting -> Running -> Terminating -> Terminated`.
//! Any of a heartbeat timeout, an explicit shutdown request, or an OS signal
//! moves it to `Terminating`; the first reason recorded wins and there is no
//! way back to `Running`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const CHECK_INTERVAL: Duration = Duration::from_secs(10);
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    HeartbeatTimeout,
    ShutdownRequested,
    Signal,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TerminationReason::HeartbeatTimeout => "heartbeat timeout",
            TerminationReason::ShutdownRequested => "shutdown requested",
            TerminationReason::Signal => "signal received",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Running,
    Terminating(TerminationReason),
    Terminated(TerminationReason),
}

impl LifecycleState {
    pub fn reason(&self) -> Option<TerminationReason> {
        match self {
            LifecycleState::Terminating(r) | LifecycleState::Terminated(r) => Some(*r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LifecycleConfig {
    pub check_interval: Duration,
    pub idle_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            check_interval: CHECK_INTERVAL,
            idle_timeout: IDLE_TIMEOUT,
            shutdown_grace: SHUTDOWN_GRACE,
        }
    }
}

#[derive(Debug)]
pub struct Supervisor {
    config: LifecycleConfig,
    last_seen: RwLock<Instant>,
    state: watch::Sender<LifecycleState>,
}

impl Supervisor {
    pub fn new(config: LifecycleConfig) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            config,
            last_seen: RwLock::new(Instant::now()),
            state,
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn heartbeat(&self) {
        *self.last_seen.write() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        let last_seen = *self.last_seen.read();
        Instant::now().saturating_duration_since(last_seen)
    }

    pub fn mark_running(&self) {
        self.state.send_if_modified(|state| {
            if *state == LifecycleState::Starting {
                *state = LifecycleState::Running;
                true
            } else {
                false
            }
        });
    }

    /// Moves to `Terminating`. Returns false if termination was already underway.
    pub fn terminate(&self, reason: TerminationReason) -> bool {
        let changed = self.state.send_if_modified(|state| match state {
            LifecycleState::Starting | LifecycleState::Running => {
                *state = LifecycleState::Terminating(reason);
                true
            }
            _ => false,
        });
        if changed {
            log::info!("Shutting down server ({reason})...");
        }
        changed
    }

    /// Records the final state once the server has stopped.
    pub fn mark_terminated(&self) -> Option<TerminationReason> {
        self.state.send_if_modified(|state| match *state {
            LifecycleState::Terminating(reason) => {
                *state = LifecycleState::Terminated(reason);
                true
            }
            _ => false,
        });
        self.state().reason()
    }

    /// Terminates after the grace delay, leaving time for the HTTP response.
    pub fn request_shutdown(self: &Arc<Self>) -> JoinHandle<()> {
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(supervisor.config.shutdown_grace).await;
            supervisor.terminate(TerminationReason::ShutdownRequested);
        })
    }

    /// Polls the heartbeat every `check_interval` and terminates once the UI
    /// has been silent for longer than `idle_timeout`.
    pub fn spawn_monitor(self: &Arc<Self>) -> JoinHandle<()> {
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(supervisor.config.check_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if supervisor.state().reason().is_some() {
                    return;
                }
                let idle = supervisor.idle_for();
                if idle > supervisor.config.idle_timeout {
                    log::warn!("No heartbeat for {} seconds", idle.as_secs());
                    supervisor.terminate(TerminationReason::HeartbeatTimeout);
                    return;
                }
            }
        })
    }

    pub fn spawn_signal_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            match wait_for_shutdown_signal().await {
                Ok(()) => {
                    supervisor.terminate(TerminationReason::Signal);
                }
                Err(e) => log::error!("Signal handler failed: {e}"),
            }
        })
    }
}

/// Resolves once the supervisor leaves the running states.
pub async fn wait_for_termination(
    mut state: watch::Receiver<LifecycleState>,
) -> Option<TerminationReason> {
    let result = state.wait_for(|s| s.reason().is_some()).await;
    result.ok().and_then(|s| s.reason())
}

async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = term.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn supervisor() -> Arc<Supervisor> {
        let supervisor = Arc::new(Supervisor::new(LifecycleConfig::default()));
        supervisor.mark_running();
        supervisor
    }

    #[tokio::test(start_paused = true)]
    async fn stays_alive_within_timeout_then_terminates() {
        let supervisor = supervisor();
        supervisor.spawn_monitor();
        supervisor.heartbeat();

        sleep(Duration::from_secs(59)).await;
        assert_eq!(supervisor.state(), LifecycleState::Running);

        sleep(Duration::from_secs(12)).await;
        assert_eq!(
            supervisor.state(),
            LifecycleState::Terminating(TerminationReason::HeartbeatTimeout)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeats_keep_it_running() {
        let supervisor = supervisor();
        supervisor.spawn_monitor();

        for _ in 0..10 {
            sleep(Duration::from_secs(30)).await;
            supervisor.heartbeat();
        }
        assert_eq!(supervisor.state(), LifecycleState::Running);
        assert!(supervisor.idle_for() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_grace_delay() {
        let supervisor = supervisor();
        supervisor.request_shutdown();

        sleep(Duration::from_millis(50)).await;
        assert_eq!(supervisor.state(), LifecycleState::Running);

        sleep(Duration::from_millis(100)).await;
        assert_eq!(
            supervisor.state(),
            LifecycleState::Terminating(TerminationReason::ShutdownRequested)
        );
    }

    #[tokio::test]
    async fn first_reason_wins() {
        let supervisor = supervisor();
        assert!(supervisor.terminate(TerminationReason::Signal));
        assert!(!supervisor.terminate(TerminationReason::HeartbeatTimeout));
        assert_eq!(
            supervisor.mark_terminated(),
            Some(TerminationReason::Signal)
        );
        assert_eq!(
            supervisor.state(),
            LifecycleState::Terminated(TerminationReason::Signal)
        );
        assert!(!supervisor.terminate(TerminationReason::ShutdownRequested));
    }

    #[tokio::test]
    async fn waiter_sees_termination() {
        let supervisor = supervisor();
        let waiter = tokio::spawn(wait_for_termination(supervisor.subscribe()));
        supervisor.terminate(TerminationReason::ShutdownRequested);
        assert_eq!(
            waiter.await.unwrap(),
            Some(TerminationReason::ShutdownRequested)
        );
    }
}
