//! Background tick driving train movement and timed transitions

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::error::CrossingResult;
use crate::machine::{CrossingStateMachine, TRAIN_ABSENT, TRAIN_AT_CROSSING};
use crate::models::CrossingState;
use crate::system::RailwaySystem;

/// Advance one crossing by a single tick.
///
/// Moves an active train, re-derives the countdown, and fires the timed
/// transition for the current state once its dwell has elapsed and the
/// crossing may advance. Returns the state entered, if any.
pub(crate) fn advance_crossing(
    machine: &mut CrossingStateMachine,
) -> CrossingResult<Option<CrossingState>> {
    machine.advance_train();

    let dwell = machine.dwell().as_secs_f64();
    let (warning, barrier, passing) = {
        let timing = machine.timing();
        (
            timing.warning_dwell_secs,
            timing.barrier_dwell_secs,
            timing.passing_dwell_secs,
        )
    };

    let target = match machine.state() {
        CrossingState::Warning if dwell >= warning => CrossingState::Countdown,
        CrossingState::Countdown if machine.refresh_countdown() == 0 => CrossingState::BarrierDown,
        CrossingState::BarrierDown if dwell >= barrier => CrossingState::TrainPassing,
        CrossingState::TrainPassing
            if dwell >= passing && machine.train_position() >= TRAIN_AT_CROSSING =>
        {
            CrossingState::Idle
        }
        _ => return Ok(None),
    };

    if !machine.can_advance() {
        return Ok(None);
    }

    machine.transition(target)?;
    if target == CrossingState::Idle {
        machine.set_train_position(TRAIN_ABSENT);
    }
    Ok(Some(target))
}

/// Handle to the running tick loop.
///
/// The loop stops on [`Scheduler::stop`]; dropping the handle aborts it.
pub struct Scheduler {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn the tick loop on the current tokio runtime
    pub fn start(system: Arc<RailwaySystem>) -> Self {
        let period = system.config().tick_interval();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let system = system.clone();
                        // A panicking tick must not end the loop
                        if let Err(e) = tokio::task::spawn_blocking(move || system.tick()).await {
                            error!(error = %e, "Scheduler tick aborted");
                        }
                    }
                }
            }
            debug!("Scheduler loop exited");
        });

        info!(interval_ms = period.as_millis() as u64, "Scheduler started");
        Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the loop and wait for the in-flight tick to finish
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "Scheduler task failed");
            }
        }
        info!("Scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::SystemConfig;
    use crate::events::EventLog;
    use crate::models::ApproachParams;
    use std::time::Duration;

    fn crossing() -> (CrossingStateMachine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let machine = CrossingStateMachine::new(
            0,
            &SystemConfig::default().with_seed(1),
            clock.clone(),
            Arc::new(EventLog::new(50)),
        );
        (machine, clock)
    }

    #[test]
    fn idle_crossing_does_nothing() {
        let (mut m, clock) = crossing();
        clock.advance_secs(100.0);
        assert_eq!(advance_crossing(&mut m).unwrap(), None);
        assert_eq!(m.train_position(), TRAIN_ABSENT);
    }

    #[test]
    fn warning_waits_for_dwell() {
        let (mut m, clock) = crossing();
        m.set_train(&ApproachParams {
            train_speed: 200.0,
            train_distance: 100.0,
            weather: None,
        });
        m.transition(CrossingState::Warning).unwrap();
        m.set_train_position(0.0);

        clock.advance_secs(2.0);
        assert_eq!(advance_crossing(&mut m).unwrap(), None);
        clock.advance_secs(1.0);
        assert_eq!(
            advance_crossing(&mut m).unwrap(),
            Some(CrossingState::Countdown)
        );
        assert_eq!(m.train_position(), 20.0);
    }

    #[test]
    fn passing_needs_train_clear_of_crossing() {
        let (mut m, clock) = crossing();
        for state in [
            CrossingState::Warning,
            CrossingState::Countdown,
            CrossingState::BarrierDown,
            CrossingState::TrainPassing,
        ] {
            m.transition(state).unwrap();
        }
        m.set_train_position(50.0);
        clock.advance_secs(10.0);
        assert_eq!(advance_crossing(&mut m).unwrap(), None);

        m.set_train_position(TRAIN_AT_CROSSING);
        assert_eq!(advance_crossing(&mut m).unwrap(), Some(CrossingState::Idle));
        assert_eq!(m.train_position(), TRAIN_ABSENT);
    }

    #[test]
    fn emergency_is_never_advanced() {
        let (mut m, clock) = crossing();
        m.transition(CrossingState::Emergency).unwrap();
        clock.advance_secs(600.0);
        assert_eq!(advance_crossing(&mut m).unwrap(), None);
        assert_eq!(m.state(), CrossingState::Emergency);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn loop_ticks_until_stopped() {
        let config = SystemConfig {
            tick_interval_ms: 10,
            ..SystemConfig::default()
        };
        let system = Arc::new(RailwaySystem::new(config));
        let scheduler = Scheduler::start(system.clone());
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(120)).await;
        scheduler.stop().await;

        let uptime = system.get_status().global_state.uptime;
        assert!(uptime >= 2, "uptime {uptime}");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(system.get_status().global_state.uptime, uptime);
    }
}
