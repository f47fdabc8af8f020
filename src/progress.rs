//! Simulated progress for steps whose real progress cannot be observed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const MAX_PERCENTAGE: f64 = 100.0;

/// Advisory progress percentage, optionally advanced by a background ticker.
///
/// Only one simulation runs at a time. Nothing here is ever awaited by the
/// step sequence; dropping the simulator stops the ticker.
pub struct ProgressSimulator {
    state: Arc<Mutex<ProgressState>>,
    changes: watch::Sender<f64>,
    tick: Duration,
}

#[derive(Default)]
struct ProgressState {
    percentage: f64,
    simulation: Option<Simulation>,
    generation: u64,
}

struct Simulation {
    generation: u64,
    from: f64,
    target: f64,
    duration: Duration,
    started_at: Instant,
    ticker: JoinHandle<()>,
}

impl Simulation {
    fn value_at(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return self.target;
        }
        let fraction =
            now.duration_since(self.started_at).as_secs_f64() / self.duration.as_secs_f64();
        self.from + (self.target - self.from) * fraction.min(1.0)
    }
}

impl ProgressSimulator {
    pub fn new(tick: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProgressState::default())),
            changes: watch::Sender::new(0.0),
            tick,
        }
    }

    pub fn percentage(&self) -> f64 {
        lock(&self.state).percentage
    }

    pub fn is_simulating(&self) -> bool {
        lock(&self.state).simulation.is_some()
    }

    /// Receive the percentage every time it changes.
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.changes.subscribe()
    }

    /// Explicit reset. Stops any running simulation.
    pub fn set(&self, percentage: f64) {
        let mut state = lock(&self.state);
        stop_simulation(&mut state);
        state.percentage = percentage.clamp(0.0, MAX_PERCENTAGE);
        publish(&self.changes, state.percentage);
    }

    pub fn increase_by(&self, delta: f64) {
        let mut state = lock(&self.state);
        state.percentage = (state.percentage + delta.max(0.0)).min(MAX_PERCENTAGE);
        publish(&self.changes, state.percentage);
    }

    /// Advance linearly from the current percentage to `target` over `duration`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, target: f64, duration: Duration) {
        let mut state = lock(&self.state);
        stop_simulation(&mut state);

        state.generation += 1;
        let generation = state.generation;
        let ticker = tokio::spawn(tick_loop(
            Arc::clone(&self.state),
            self.changes.clone(),
            generation,
            self.tick,
        ));
        state.simulation = Some(Simulation {
            generation,
            from: state.percentage,
            target: target.clamp(state.percentage, MAX_PERCENTAGE),
            duration,
            started_at: Instant::now(),
            ticker,
        });
    }

    /// Stop ticking and keep whatever percentage the simulation reached.
    pub fn finish(&self) {
        let mut state = lock(&self.state);
        stop_simulation(&mut state);
    }
}

impl Drop for ProgressSimulator {
    fn drop(&mut self) {
        self.finish();
    }
}

async fn tick_loop(
    state: Arc<Mutex<ProgressState>>,
    changes: watch::Sender<f64>,
    generation: u64,
    tick: Duration,
) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(simulation) = guard
            .simulation
            .as_ref()
            .filter(|s| s.generation == generation)
        else {
            return;
        };

        let now = Instant::now();
        let value = simulation.value_at(now);
        let done = now.duration_since(simulation.started_at) >= simulation.duration;
        if value > guard.percentage {
            guard.percentage = value;
            publish(&changes, value);
        }
        if done {
            return;
        }
    }
}

fn stop_simulation(state: &mut ProgressState) {
    if let Some(simulation) = state.simulation.take() {
        simulation.ticker.abort();
    }
}

fn publish(changes: &watch::Sender<f64>, percentage: f64) {
    changes.send_replace(percentage);
}

fn lock(state: &Mutex<ProgressState>) -> MutexGuard<'_, ProgressState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
