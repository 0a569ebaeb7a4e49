//! Interactive shell.
//!
//! Each input line is resolved to an [`Action`] and spawned as a local task,
//! so the shell keeps reading while requests are in flight. Between lines the
//! loop wakes up for the app's timers (search debounce, notice expiry).
//! Delete confirmations are answered by the next input line.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::LocalSet;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::api::PeopleApi;
use crate::app::{Action, App, UiSettings};
use crate::config::Config;
use crate::error::Result;
use crate::render::OutputFormat;
use crate::schedule::SystemClock;
use crate::surface::{is_yes, Prompt, TerminalSurface};
use crate::transport::{HttpTransport, ReqwestTransport};

/// Upper bound on how long the loop sleeps without checking timers.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// What to do with one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Nothing was typed.
    Empty,
    /// Print the command list.
    Help,
    /// Leave the shell.
    Quit,
    /// Run an app action.
    Action(Action),
}

/// Parse one shell input line.
///
/// # Errors
///
/// Returns a validation error for unknown commands or missing arguments.
pub fn parse_line(line: &str) -> Result<Line> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Line::Empty);
    }
    let (name, args) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match name.to_lowercase().as_str() {
        "help" | "?" => Ok(Line::Help),
        "quit" | "exit" => Ok(Line::Quit),
        _ => Action::from_name(name, args).map(Line::Action),
    }
}

/// A [`Prompt`] answered by the next line typed into the shell.
#[derive(Debug, Default)]
pub struct ShellPrompt {
    pending: RefCell<Option<oneshot::Sender<String>>>,
}

impl ShellPrompt {
    /// Give `line` to the waiting question.
    ///
    /// Returns the line back if no question is waiting.
    pub fn answer(&self, line: String) -> Option<String> {
        let waiting = self.pending.borrow_mut().take();
        match waiting {
            Some(tx) => {
                let _ = tx.send(line);
                None
            }
            None => Some(line),
        }
    }

    /// Whether a question is waiting for its answer.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.pending.borrow().is_some()
    }
}

#[async_trait(?Send)]
impl Prompt for ShellPrompt {
    async fn confirm(&self, message: &str) -> bool {
        let (tx, rx) = oneshot::channel();
        if self.pending.borrow_mut().replace(tx).is_some() {
            debug!("Earlier question superseded; treating it as declined");
        }
        println!("{message} [y/N]");
        rx.await.is_ok_and(|answer| is_yes(&answer))
    }
}

/// Run the shell against the configured server until `quit` or end of input.
///
/// # Errors
///
/// Currently always succeeds; action failures are shown as notices.
pub async fn run(config: &Config) -> Result<()> {
    LocalSet::new().run_until(run_local(config)).await
}

async fn run_local(config: &Config) -> Result<()> {
    let surface = Rc::new(TerminalSurface::new(OutputFormat::Table, true));
    let prompt = Rc::new(ShellPrompt::default());
    let api = PeopleApi::from_config(ReqwestTransport::new(), config);
    let app = Rc::new(App::new(
        api,
        UiSettings::from_config(config),
        surface,
        prompt.clone(),
        Rc::new(SystemClock),
    ));

    info!(base_url = %app.api().base_url(), "Shell started");
    print_help();
    run_action(&app, Action::Refresh).await;

    let mut lines = spawn_reader();
    loop {
        let wake = wake_at(&app, Instant::now());

        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else { break };
                let Some(line) = prompt.answer(line) else { continue };
                match parse_line(&line) {
                    Ok(Line::Empty) => {}
                    Ok(Line::Help) => print_help(),
                    Ok(Line::Quit) => break,
                    Ok(Line::Action(action)) => run_action(&app, action).await,
                    Err(e) => println!("error: {e}"),
                }
            }
            () = sleep_until(wake) => {
                app.poll();
            }
        }
    }

    debug!("Shell finished");
    Ok(())
}

/// Spawn `action` and let it run up to its first await, so any timer it
/// arms is visible to the next [`wake_at`].
async fn run_action<T: HttpTransport + 'static>(app: &Rc<App<T>>, action: Action) {
    let app = Rc::clone(app);
    tokio::task::spawn_local(async move {
        if let Err(e) = app.dispatch(action).await {
            debug!(error = %e, "Action failed");
        }
    });
    tokio::task::yield_now().await;
}

/// When the loop must wake up next: the app's earliest timer, capped by
/// [`IDLE_POLL`].
fn wake_at<T: HttpTransport>(app: &App<T>, now: Instant) -> Instant {
    let idle = now + IDLE_POLL;
    app.next_deadline().map_or(idle, |deadline| deadline.min(idle))
}

/// Read stdin on a plain thread; a blocked read must not hold up shutdown.
fn spawn_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read input");
                    break;
                }
            }
        }
    });
    rx
}

fn print_help() {
    println!("Commands:");
    for (usage, what) in Action::USAGE {
        println!("  {usage:<16} {what}");
    }
    println!("  help             show this list");
    println!("  quit             leave the shell");
}
