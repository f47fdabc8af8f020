//! Process invocation backend

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Step;

/// A single line of process output, without its trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// How a spawned process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    /// Exited on its own. `None` when terminated by a signal we did not send.
    Exited(Option<i32>),
    /// Terminated because its cancellation token fired.
    Killed,
}

/// Launches external processes.
///
/// Output lines go to `output` as they arrive. The returned receiver resolves
/// once the process has ended. Cancelling `cancel` must terminate the process
/// and resolve the receiver with [`ProcessExit::Killed`].
pub trait Spawner: Send + Sync {
    fn spawn(
        &self,
        step: &Step,
        output: mpsc::UnboundedSender<OutputLine>,
        cancel: CancellationToken,
    ) -> std::io::Result<oneshot::Receiver<ProcessExit>>;
}

/// Spawner backed by `tokio::process`.
///
/// Each step runs in its own process group, so a terminal Ctrl-C reaches
/// `rns` only and stopping a step signals everything it started.
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    kill_grace: Duration,
    drain_grace: Duration,
}

impl TokioSpawner {
    pub fn new() -> Self {
        Self {
            kill_grace: Duration::from_secs(3),
            drain_grace: Duration::from_secs(2),
        }
    }

    /// How long a terminated process gets to exit before it is killed outright.
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    /// How long to keep reading output after the process exited. Background
    /// children can hold the pipes open long after that.
    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }
}

impl Default for TokioSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl Spawner for TokioSpawner {
    fn spawn(
        &self,
        step: &Step,
        output: mpsc::UnboundedSender<OutputLine>,
        cancel: CancellationToken,
    ) -> std::io::Result<oneshot::Receiver<ProcessExit>> {
        let mut command = Command::new(&step.command);
        command
            .args(&step.args)
            .envs(&step.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &step.working_dir {
            command.current_dir(dir);
        }
        isolate(&mut command);

        let mut child = command.spawn()?;
        let group = child.id();
        debug!(pid = ?group, command = %step, "spawned step");

        let mut readers = [
            forward_lines(child.stdout.take(), output.clone(), OutputLine::Stdout),
            forward_lines(child.stderr.take(), output, OutputLine::Stderr),
        ];

        let (exit_tx, exit_rx) = oneshot::channel();
        let kill_grace = self.kill_grace;
        let drain_grace = self.drain_grace;
        tokio::spawn(async move {
            let exit = tokio::select! {
                status = child.wait() => {
                    let code = status.ok().and_then(|s| s.code());
                    let drained = async {
                        for reader in &mut readers {
                            let _ = reader.await;
                        }
                    };
                    let exit = tokio::select! {
                        _ = drained => ProcessExit::Exited(code),
                        _ = tokio::time::sleep(drain_grace) => {
                            debug!(pid = ?group, "output still open after exit, detaching");
                            ProcessExit::Exited(code)
                        }
                        _ = cancel.cancelled() => {
                            if let Some(group) = group {
                                terminate_group(group);
                            }
                            ProcessExit::Killed
                        }
                    };
                    for reader in &readers {
                        reader.abort();
                    }
                    exit
                }
                _ = cancel.cancelled() => {
                    terminate(&mut child, group, kill_grace).await;
                    // Grandchildren may still hold the pipes open
                    for reader in &readers {
                        reader.abort();
                    }
                    ProcessExit::Killed
                }
            };
            let _ = exit_tx.send(exit);
        });

        Ok(exit_rx)
    }
}

fn forward_lines<R>(
    stream: Option<R>,
    tx: mpsc::UnboundedSender<OutputLine>,
    wrap: fn(String) -> OutputLine,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(stream) = stream else {
            return;
        };
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(wrap(line)).is_err() {
                break;
            }
        }
    })
}

/// Ask the process group to terminate, escalating to a hard kill after `grace`.
async fn terminate(child: &mut Child, group: Option<u32>, grace: Duration) {
    if !group.is_some_and(terminate_group) {
        let _ = child.kill().await;
        return;
    }

    if tokio::time::timeout(grace, child.wait()).await.is_err() {
        debug!(pid = ?group, "process ignored SIGTERM, killing");
        if let Some(group) = group {
            kill_group(group);
        }
        let _ = child.kill().await;
    }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        fn isolate(command: &mut Command) {
            command.process_group(0);
        }

        fn terminate_group(group: u32) -> bool {
            killpg(Pid::from_raw(group as i32), Signal::SIGTERM).is_ok()
        }

        fn kill_group(group: u32) {
            let _ = killpg(Pid::from_raw(group as i32), Signal::SIGKILL);
        }
    } else {
        fn isolate(_command: &mut Command) {}

        fn terminate_group(_group: u32) -> bool {
            false
        }

        fn kill_group(_group: u32) {}
    }
}
