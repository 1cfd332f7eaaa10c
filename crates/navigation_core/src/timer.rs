use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::debug;

/// Receives timer output. Callbacks run while the timer's stop gate is held,
/// so they must not call [`StepTimer::cancel`] on the timer that invoked them.
pub trait StepListener: Send + Sync + 'static {
    fn on_step(&self, cursor: usize, instruction: &str);
    fn on_arrival(&self, cursor: usize);
}

/// Advances a step cursor once per tick. Moving past the last step (or
/// starting with no steps at all) signals arrival once and stops.
pub struct StepTimer {
    stopped: Arc<Mutex<bool>>,
    task: JoinHandle<()>,
}

impl StepTimer {
    /// Must be called from within a tokio runtime.
    pub fn start<L: StepListener>(steps: Vec<String>, tick_interval: Duration, listener: L) -> Self {
        let stopped = Arc::new(Mutex::new(false));
        let tick_interval = tick_interval.max(Duration::from_millis(1));
        let task = tokio::spawn(run_steps(
            steps,
            tick_interval,
            listener,
            Arc::clone(&stopped),
        ));
        Self { stopped, task }
    }

    /// Idempotent. Once this returns, the listener is never called again.
    pub fn cancel(&self) {
        *lock(&self.stopped) = true;
        self.task.abort();
    }
}

fn lock(gate: &Mutex<bool>) -> MutexGuard<'_, bool> {
    gate.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_steps<L: StepListener>(
    steps: Vec<String>,
    tick_interval: Duration,
    listener: L,
    stopped: Arc<Mutex<bool>>,
) {
    if steps.is_empty() {
        let mut gate = lock(&stopped);
        if !*gate {
            *gate = true;
            debug!("timer: no steps, signalling arrival immediately");
            listener.on_arrival(0);
        }
        return;
    }

    let mut ticker = interval_at(Instant::now() + tick_interval, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cursor = 0;

    loop {
        ticker.tick().await;
        cursor += 1;

        let mut gate = lock(&stopped);
        if *gate {
            return;
        }
        match steps.get(cursor) {
            Some(instruction) => listener.on_step(cursor, instruction),
            None => {
                *gate = true;
                debug!(cursor, "timer: past last step, signalling arrival");
                listener.on_arrival(cursor);
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/timer_tests.rs"]
mod tests;
