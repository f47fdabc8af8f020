//! Step lifecycle: launch, stream, wait, kill

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::{Result, StepError};
use super::spawner::{OutputLine, ProcessExit, Spawner};
use super::{Step, StepEvent, StepStatus};

const STDERR_TAIL_LINES: usize = 100;

/// Launches steps one at a time through a [`Spawner`].
pub struct StepRunner<S> {
    spawner: Arc<S>,
}

impl<S> Clone for StepRunner<S> {
    fn clone(&self) -> Self {
        Self {
            spawner: Arc::clone(&self.spawner),
        }
    }
}

impl<S: Spawner> StepRunner<S> {
    pub fn new(spawner: Arc<S>) -> Self {
        Self { spawner }
    }

    /// Create a pending run for `step`.
    ///
    /// Fails with [`StepError::Cancelled`] when `stopping` has fired, unless the
    /// step is a cleanup step flagged to run during abort. Regular steps are
    /// bound to `stopping`, so a cancellation landing after this check still
    /// kills the process as soon as it is spawned.
    pub fn prepare(&self, step: Step, stopping: &CancellationToken) -> Result<StepRun<S>> {
        let cancel = if step.runs_during_abort {
            CancellationToken::new()
        } else if stopping.is_cancelled() {
            debug!(command = %step, "refusing to launch step, stop requested");
            return Err(StepError::Cancelled);
        } else {
            stopping.child_token()
        };

        Ok(StepRun {
            step,
            spawner: Arc::clone(&self.spawner),
            handle: StepRunHandle {
                status: Arc::new(watch::Sender::new(StepStatus::Pending)),
                cancel,
                terminated: CancellationToken::new(),
            },
        })
    }

    /// Prepare and run `step` to completion.
    pub async fn run<F>(&self, step: Step, stopping: &CancellationToken, on_event: F) -> Result<()>
    where
        F: FnMut(StepEvent),
    {
        self.prepare(step, stopping)?.run(on_event).await
    }
}

/// Shared control over a step run. Cheap to clone.
#[derive(Clone)]
pub struct StepRunHandle {
    status: Arc<watch::Sender<StepStatus>>,
    cancel: CancellationToken,
    terminated: CancellationToken,
}

impl StepRunHandle {
    pub fn status(&self) -> StepStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<StepStatus> {
        self.status.subscribe()
    }

    /// Stop the run if it has not finished yet.
    ///
    /// Returns `false` when the run had already reached a terminal status, in
    /// which case nothing happens.
    pub fn kill(&self) -> bool {
        let stopped = self.status.send_if_modified(|status| {
            if status.is_terminal() {
                false
            } else {
                *status = StepStatus::Stopped;
                true
            }
        });
        if stopped {
            self.cancel.cancel();
        }
        stopped
    }

    /// Resolves once the run has released its process.
    pub async fn terminated(&self) {
        self.terminated.cancelled().await
    }

    /// Record a terminal status unless the run was stopped first.
    fn finish(&self, next: StepStatus) -> StepStatus {
        self.status.send_if_modified(|status| {
            if *status == StepStatus::Stopped {
                false
            } else {
                *status = next;
                true
            }
        });
        self.status()
    }
}

/// A launched (or about to be launched) step. Consumed by [`StepRun::run`].
pub struct StepRun<S> {
    step: Step,
    spawner: Arc<S>,
    handle: StepRunHandle,
}

impl<S: Spawner> StepRun<S> {
    pub fn step(&self) -> &Step {
        &self.step
    }

    pub fn handle(&self) -> StepRunHandle {
        self.handle.clone()
    }

    /// Spawn the process and wait for it to exit or be killed.
    ///
    /// Output is delivered to `on_event` line by line. Nothing is delivered
    /// once the run has been stopped.
    pub async fn run<F>(self, mut on_event: F) -> Result<()>
    where
        F: FnMut(StepEvent),
    {
        let handle = self.handle.clone();
        if handle.cancel.is_cancelled() {
            handle.kill();
            return Err(StepError::Cancelled);
        }

        let (tx, mut output) = mpsc::unbounded_channel();
        let exit = match self.spawner.spawn(&self.step, tx, handle.cancel.clone()) {
            Ok(exit) => exit,
            Err(source) => {
                handle.finish(StepStatus::Failed);
                on_event(StepEvent::Error(source.to_string()));
                return Err(StepError::Spawn {
                    command: self.step.command_line(),
                    source,
                });
            }
        };
        handle.status.send_if_modified(|status| {
            if *status == StepStatus::Pending {
                *status = StepStatus::Running;
                true
            } else {
                false
            }
        });

        let mut stderr_tail = VecDeque::new();
        let mut deliver = |line: OutputLine| {
            if handle.status() == StepStatus::Stopped {
                return;
            }
            match line {
                OutputLine::Stdout(line) => on_event(StepEvent::Stdout(line)),
                OutputLine::Stderr(line) => {
                    if stderr_tail.len() == STDERR_TAIL_LINES {
                        stderr_tail.pop_front();
                    }
                    stderr_tail.push_back(line.clone());
                    on_event(StepEvent::Stderr(line));
                }
            }
        };

        tokio::pin!(exit);
        let exit = loop {
            tokio::select! {
                biased;
                Some(line) = output.recv() => deliver(line),
                exit = &mut exit => break exit.unwrap_or(ProcessExit::Exited(None)),
            }
        };
        while let Ok(line) = output.try_recv() {
            deliver(line);
        }

        debug!(command = %self.step, ?exit, "step ended");
        match exit {
            ProcessExit::Exited(code) if handle.status() != StepStatus::Stopped => {
                on_event(StepEvent::Exit(code));
                if code == Some(0) {
                    handle.finish(StepStatus::Succeeded);
                    Ok(())
                } else {
                    handle.finish(StepStatus::Failed);
                    Err(StepError::Failed {
                        command: self.step.command_line(),
                        exit_code: code,
                        stderr: stderr_tail.into_iter().collect::<Vec<_>>().join("\n"),
                    })
                }
            }
            _ => {
                handle.kill();
                Err(StepError::Cancelled)
            }
        }
    }
}

impl<S> Drop for StepRun<S> {
    fn drop(&mut self) {
        self.handle.terminated.cancel();
    }
}
