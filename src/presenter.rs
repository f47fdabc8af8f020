//! Progress and script output display

use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{Clear, ClearType};
use tokio::task::JoinHandle;

use crate::progress::ProgressSimulator;

const BAR_WIDTH: usize = 30;

/// Display sink for progress and raw script output.
pub trait Presenter: Send + Sync {
    fn set_progress_percentage(&self, percentage: f64);
    fn increase_progress_percentage_by(&self, delta: f64);
    /// Simulate progress growing by `increase` points over `duration`.
    fn start_progress_increase_simulation(&self, increase: f64, duration: Duration);
    fn finish_progress_increase_simulation(&self);
    fn set_script_output(&self, line: &str);
}

/// Renders a progress bar on the last terminal line with script output
/// scrolling above it.
pub struct TerminalPresenter {
    progress: ProgressSimulator,
    screen: Arc<Mutex<Screen>>,
    renderer: JoinHandle<()>,
}

struct Screen {
    percentage: f64,
    interactive: bool,
    show_progress: bool,
}

impl TerminalPresenter {
    /// Must be called from within a tokio runtime.
    pub fn new(tick: Duration, show_progress: bool) -> Self {
        let progress = ProgressSimulator::new(tick);
        let screen = Arc::new(Mutex::new(Screen {
            percentage: 0.0,
            interactive: io::stdout().is_terminal(),
            show_progress,
        }));

        let mut changes = progress.subscribe();
        let render_screen = Arc::clone(&screen);
        let renderer = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let percentage = *changes.borrow_and_update();
                let mut screen = render_screen.lock().unwrap_or_else(PoisonError::into_inner);
                screen.percentage = percentage;
                let _ = screen.draw_progress(&mut io::stdout());
            }
        });

        Self {
            progress,
            screen,
            renderer,
        }
    }

    pub fn percentage(&self) -> f64 {
        self.progress.percentage()
    }

    /// Move past the progress bar so later output starts on a clean line.
    pub fn close(&self) {
        let screen = self.screen.lock().unwrap_or_else(PoisonError::into_inner);
        if screen.interactive && screen.show_progress {
            let mut out = io::stdout();
            let _ = writeln!(out);
            let _ = out.flush();
        }
    }
}

impl Drop for TerminalPresenter {
    fn drop(&mut self) {
        self.renderer.abort();
    }
}

impl Screen {
    fn draw_progress(&self, out: &mut impl Write) -> io::Result<()> {
        if !self.interactive || !self.show_progress {
            return Ok(());
        }
        queue!(
            out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(render_bar(self.percentage).cyan()),
        )?;
        out.flush()
    }

    fn print_line(&self, out: &mut impl Write, line: &str) -> io::Result<()> {
        if self.interactive {
            queue!(
                out,
                MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(line.dark_grey()),
                Print("\n"),
            )?;
            self.draw_progress(out)
        } else {
            writeln!(out, "{}", line)
        }
    }
}

fn render_bar(percentage: f64) -> String {
    let filled = ((percentage / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percentage
    )
}

impl Presenter for TerminalPresenter {
    fn set_progress_percentage(&self, percentage: f64) {
        self.progress.set(percentage);
    }

    fn increase_progress_percentage_by(&self, delta: f64) {
        self.progress.increase_by(delta);
    }

    fn start_progress_increase_simulation(&self, increase: f64, duration: Duration) {
        let target = self.progress.percentage() + increase;
        self.progress.start(target, duration);
    }

    fn finish_progress_increase_simulation(&self) {
        self.progress.finish();
    }

    fn set_script_output(&self, line: &str) {
        let screen = self.screen.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = screen.print_line(&mut io::stdout(), line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_bar() {
        assert_eq!(render_bar(0.0), format!("[{}]   0%", "-".repeat(30)));
        assert_eq!(render_bar(100.0), format!("[{}] 100%", "#".repeat(30)));
        assert_eq!(
            render_bar(50.0),
            format!("[{}{}]  50%", "#".repeat(15), "-".repeat(15))
        );
    }

    #[test]
    fn test_plain_output_when_not_interactive() {
        let screen = Screen {
            percentage: 40.0,
            interactive: false,
            show_progress: true,
        };
        let mut out = Vec::new();
        screen
            .print_line(&mut out, "info Installing CocoaPods")
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "info Installing CocoaPods\n"
        );
    }

    #[tokio::test]
    async fn test_simulation_is_relative_to_current() {
        let presenter = TerminalPresenter::new(Duration::from_millis(10), false);
        presenter.set_progress_percentage(12.0);
        presenter.start_progress_increase_simulation(68.0, Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(200)).await;
        presenter.finish_progress_increase_simulation();

        assert!((presenter.percentage() - 80.0).abs() < 1e-9);
    }
}
