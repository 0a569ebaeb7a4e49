//! Test doubles for the transport and host ports.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::PeopleApi;
use crate::app::{App, UiSettings};
use crate::error::{Error, Result};
use crate::form::ModalSession;
use crate::logging::init_test_logging;
use crate::notice::{Notice, NoticeKind};
use crate::person::Person;
use crate::render::TableView;
use crate::schedule::ManualClock;
use crate::surface::{Prompt, Surface};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, RetryPolicy};

/// One scripted reaction of [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Answer immediately.
    Respond(HttpResponse),
    /// Answer after a delay on the tokio clock.
    Delayed(Duration, HttpResponse),
    /// Fail as if the connection broke.
    Network(String),
    /// Never answer.
    Hang,
}

impl Scripted {
    pub fn respond(status: u16, text: &str) -> Self {
        Self::Respond(HttpResponse::new(status, text))
    }

    pub fn delayed(delay: Duration, status: u16, text: &str) -> Self {
        Self::Delayed(delay, HttpResponse::new(status, text))
    }

    pub fn network(message: &str) -> Self {
        Self::Network(message.to_string())
    }

    /// A 200 carrying `people` as a JSON array.
    pub fn people(people: &[Person]) -> Self {
        Self::respond(200, &serde_json::to_string(people).unwrap())
    }
}

/// Answers requests from a script, in order, and records every request.
///
/// Requests beyond the end of the script fail with a network error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, step: Scripted) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Delayed(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Some(Scripted::Network(message)) => Err(Error::network(message)),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(Error::network("script exhausted")),
        }
    }
}

/// A [`Surface`] that remembers everything it was asked to show.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub paints: RefCell<Vec<TableView>>,
    pub notices: RefCell<Vec<Notice>>,
    pub busy: RefCell<Vec<bool>>,
    pub modals: RefCell<Vec<Option<ModalSession>>>,
    pub dismissed: Cell<usize>,
}

impl RecordingSurface {
    pub fn last_paint(&self) -> Option<TableView> {
        self.paints.borrow().last().cloned()
    }

    /// Identifiers of the most recent paint, in display order.
    pub fn last_keys(&self) -> Vec<String> {
        self.last_paint()
            .map(|view| view.rows.into_iter().map(|p| p.dni).collect())
            .unwrap_or_default()
    }

    pub fn last_notice(&self) -> Option<(NoticeKind, String)> {
        self.notices
            .borrow()
            .last()
            .map(|n| (n.kind, n.message.clone()))
    }

    pub fn last_modal(&self) -> Option<ModalSession> {
        self.modals.borrow().last().cloned().flatten()
    }

    pub fn paint_count(&self) -> usize {
        self.paints.borrow().len()
    }
}

impl Surface for RecordingSurface {
    fn paint(&self, view: &TableView) {
        self.paints.borrow_mut().push(view.clone());
    }

    fn notify(&self, notice: &Notice) {
        self.notices.borrow_mut().push(notice.clone());
    }

    fn dismiss(&self) {
        self.dismissed.set(self.dismissed.get() + 1);
    }

    fn set_busy(&self, busy: bool) {
        self.busy.borrow_mut().push(busy);
    }

    fn modal(&self, session: Option<&ModalSession>) {
        self.modals.borrow_mut().push(session.cloned());
    }
}

/// A [`Prompt`] that always gives the same answer.
#[derive(Debug)]
pub struct FixedPrompt {
    answer: bool,
    pub asked: RefCell<Vec<String>>,
}

impl FixedPrompt {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: RefCell::new(Vec::new()),
        }
    }
}

#[async_trait(?Send)]
impl Prompt for FixedPrompt {
    async fn confirm(&self, message: &str) -> bool {
        self.asked.borrow_mut().push(message.to_string());
        self.answer
    }
}

/// An [`App`] wired to fakes, plus handles on those fakes.
#[derive(Debug)]
pub struct Harness {
    pub app: App<ScriptedTransport>,
    pub surface: Rc<RecordingSurface>,
    pub prompt: Rc<FixedPrompt>,
    pub clock: Rc<ManualClock>,
}

impl Harness {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self::with_prompt(script, true)
    }

    pub fn with_prompt(script: impl IntoIterator<Item = Scripted>, answer: bool) -> Self {
        init_test_logging();
        let api = PeopleApi::new(ScriptedTransport::new(script), "http://api.test/people")
            .with_retry_policy(RetryPolicy {
                tries: 2,
                base_delay: Duration::from_millis(150),
                max_jitter: Duration::ZERO,
            });
        let surface = Rc::new(RecordingSurface::default());
        let prompt = Rc::new(FixedPrompt::new(answer));
        let clock = Rc::new(ManualClock::new());
        let app = App::new(
            api,
            UiSettings::default(),
            surface.clone(),
            prompt.clone(),
            clock.clone(),
        );
        Self {
            app,
            surface,
            prompt,
            clock,
        }
    }

    pub fn transport(&self) -> &ScriptedTransport {
        self.app.api().transport()
    }

    /// Fill the cache from a scripted list call.
    pub async fn seed(&self, people: &[Person]) {
        self.transport().push(Scripted::people(people));
        self.app.refresh().await.unwrap();
    }
}
