//! Host ports: where the client paints, and how it asks the user.
//!
//! The [`App`](crate::app::App) never prints. It pushes table views,
//! notices, the busy flag, and the modal state to a [`Surface`], and asks
//! for delete confirmation through a [`Prompt`]. The terminal
//! implementations live here; tests use recording fakes.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::Write as _;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::form::ModalSession;
use crate::notice::{Notice, NoticeKind};
use crate::render::{render, OutputFormat, TableView};

/// The display port.
pub trait Surface: fmt::Debug {
    /// Redraw the whole table from `view`.
    fn paint(&self, view: &TableView);

    /// Show `notice`, replacing whatever notice was visible.
    fn notify(&self, notice: &Notice);

    /// Hide the visible notice.
    fn dismiss(&self);

    /// Turn the busy indicator on or off.
    fn set_busy(&self, busy: bool);

    /// Show the modal for `session`, or hide it.
    fn modal(&self, session: Option<&ModalSession>);
}

/// The confirmation port.
#[async_trait(?Send)]
pub trait Prompt: fmt::Debug {
    /// Ask a yes/no question; anything but an explicit yes is a no.
    async fn confirm(&self, message: &str) -> bool;
}

/// Whether an answer counts as yes.
#[must_use]
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// A [`Surface`] writing to the terminal.
///
/// In live mode every paint is printed right away (interactive shell).
/// Otherwise only the latest view is kept and printed by
/// [`TerminalSurface::flush`] (one-shot commands).
#[derive(Debug)]
pub struct TerminalSurface {
    format: OutputFormat,
    live: bool,
    last_view: RefCell<Option<TableView>>,
    busy: Cell<bool>,
    errors: Cell<usize>,
}

impl TerminalSurface {
    /// Create a surface printing tables in `format`.
    #[must_use]
    pub fn new(format: OutputFormat, live: bool) -> Self {
        Self {
            format,
            live,
            last_view: RefCell::new(None),
            busy: Cell::new(false),
            errors: Cell::new(0),
        }
    }

    /// Print the latest view, if one was painted.
    pub fn flush(&self) {
        if let Some(view) = self.last_view.borrow_mut().take() {
            self.print_view(&view);
        }
    }

    /// Whether the busy indicator is on.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Whether any error notice has been shown.
    #[must_use]
    pub fn had_error(&self) -> bool {
        self.errors.get() > 0
    }

    fn print_view(&self, view: &TableView) {
        match render(view, self.format) {
            Ok(text) => {
                let mut out = std::io::stdout().lock();
                let _ = out.write_all(text.as_bytes());
                if !text.ends_with('\n') {
                    let _ = writeln!(out);
                }
                let _ = out.flush();
            }
            Err(e) => warn!(error = %e, "Failed to render table"),
        }
    }
}

impl Surface for TerminalSurface {
    fn paint(&self, view: &TableView) {
        if self.live {
            if !view.query.is_empty() {
                println!("-- filter: {:?} ({} rows)", view.query, view.rows.len());
            }
            self.print_view(view);
        } else {
            *self.last_view.borrow_mut() = Some(view.clone());
        }
    }

    fn notify(&self, notice: &Notice) {
        if notice.kind == NoticeKind::Error {
            self.errors.set(self.errors.get() + 1);
        }
        let line = match notice.kind {
            NoticeKind::Error => format!("error: {}", notice.message),
            NoticeKind::Success | NoticeKind::Info => notice.message.clone(),
        };
        if self.live {
            println!("{line}");
        } else {
            eprintln!("{line}");
        }
    }

    fn dismiss(&self) {}

    fn set_busy(&self, busy: bool) {
        if self.live && busy && !self.busy.get() {
            println!("(working...)");
        }
        self.busy.set(busy);
    }

    fn modal(&self, session: Option<&ModalSession>) {
        if !self.live {
            return;
        }
        let Some(session) = session else {
            println!("-- form closed");
            return;
        };
        let fields = session.fields();
        let lock = if session.dni_editable() { "" } else { " (locked)" };
        let submit = if session.is_submitting() {
            "saving..."
        } else {
            session.submit_label()
        };
        println!("-- {} --", session.title());
        println!("   name: {}", fields.name);
        println!("   dni:  {}{lock}", fields.dni);
        println!("   age:  {}", fields.age);
        println!("   [{submit}]");
    }
}

/// A [`Prompt`] that reads the answer from standard input.
#[derive(Debug, Default)]
pub struct StdinPrompt;

#[async_trait(?Send)]
impl Prompt for StdinPrompt {
    async fn confirm(&self, message: &str) -> bool {
        eprint!("{message} [y/N] ");
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut answer).await {
            Ok(_) => is_yes(&answer),
            Err(e) => {
                warn!(error = %e, "Could not read confirmation; assuming no");
                false
            }
        }
    }
}

/// A [`Prompt`] that always says yes.
#[derive(Debug, Default)]
pub struct AssumeYes;

#[async_trait(?Send)]
impl Prompt for AssumeYes {
    async fn confirm(&self, _message: &str) -> bool {
        true
    }
}
