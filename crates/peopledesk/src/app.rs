//! The application controller.
//!
//! [`App`] owns the cache, the form, the notice board and the in-flight
//! bookkeeping, and wires them to the API client and the host ports. Host
//! layers (CLI, shell) only ever talk to it through [`Action`]s or its
//! async operations.
//!
//! # Concurrency
//!
//! Everything runs on one thread. Operations borrow `&self` and may overlap
//! (the shell spawns each action as a local task); every `RefCell` borrow is
//! released before the next `.await`. Overlap is resolved as follows:
//!
//! - A list response is applied only if no newer list request and no local
//!   mutation happened since it was issued (generation token).
//! - A delete, or a save, for an identifier that already has an operation in
//!   flight is refused.
//! - A failed delete restores the pre-delete snapshot if nothing else touched
//!   the cache meanwhile; otherwise it puts the removed record back at its
//!   old position if it is missing.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::PeopleApi;
use crate::cache::{CacheSnapshot, PeopleCache};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::form::{CloseReason, Field, FormController, FormMode, ModalSession};
use crate::inflight::{Generation, KeyLocks, LoadingCounter};
use crate::notice::{Notice, NoticeBoard, NoticeKind};
use crate::person::Person;
use crate::render::{normalize_query, project, TableView};
use crate::schedule::{Clock, Debouncer};
use crate::surface::{Prompt, Surface};
use crate::transport::HttpTransport;

/// Interface timings and switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiSettings {
    /// Quiet period before typed search input is applied.
    pub search_debounce: Duration,
    /// Lifetime of a notice.
    pub notice: Duration,
    /// Lifetime of the notice shown after a list refresh.
    pub refresh_notice: Duration,
    /// Ask before deleting.
    pub confirm_deletes: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(200),
            notice: Duration::from_millis(3_500),
            refresh_notice: Duration::from_millis(1_200),
            confirm_deletes: true,
        }
    }
}

impl UiSettings {
    /// Settings from the `[ui]` section of `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            search_debounce: config.search_debounce(),
            notice: config.notice_duration(),
            refresh_notice: config.refresh_notice_duration(),
            confirm_deletes: config.ui.confirm_deletes,
        }
    }
}

/// A user command, resolved by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open an empty create form.
    New,
    /// Open the edit form for a record.
    Edit(String),
    /// Delete a record.
    Delete(String),
    /// Submit the open form.
    Submit,
    /// Close the form with the cancel button.
    Cancel,
    /// Close the form with the close button.
    Close,
    /// Close the form by clicking the backdrop.
    Backdrop,
    /// Reload the list from the server.
    Refresh,
    /// Type into the search box (debounced).
    Search(String),
    /// Type into a form input.
    Set(Field, String),
}

impl Action {
    /// Names accepted by [`Action::from_name`], with their argument syntax.
    pub const USAGE: &'static [(&'static str, &'static str)] = &[
        ("new", "open an empty form"),
        ("edit DNI", "open the form for a person"),
        ("delete DNI", "delete a person"),
        ("set FIELD VALUE", "fill a form field (name, dni, age)"),
        ("submit", "save the open form"),
        ("cancel", "close the form"),
        ("close", "close the form"),
        ("backdrop", "close the form"),
        ("search [QUERY]", "filter the table; empty clears"),
        ("refresh", "reload the list"),
    ];

    /// Resolve an action from its name and raw argument text.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown names or missing arguments.
    pub fn from_name(name: &str, args: &str) -> Result<Self> {
        let args = args.trim();
        let required = |what: &str| {
            if args.is_empty() {
                Err(Error::validation(format!("{name} needs {what}")))
            } else {
                Ok(args.to_string())
            }
        };

        match name.to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "edit" => required("a DNI").map(Self::Edit),
            "delete" => required("a DNI").map(Self::Delete),
            "submit" => Ok(Self::Submit),
            "cancel" => Ok(Self::Cancel),
            "close" => Ok(Self::Close),
            "backdrop" => Ok(Self::Backdrop),
            "refresh" => Ok(Self::Refresh),
            "search" => Ok(Self::Search(args.to_string())),
            "set" => {
                let (field, value) = args
                    .split_once(char::is_whitespace)
                    .unwrap_or((args, ""));
                Ok(Self::Set(field.parse()?, value.trim().to_string()))
            }
            other => Err(Error::validation(format!("unknown command {other:?}"))),
        }
    }
}

#[derive(Debug)]
struct SearchState {
    query: String,
    debouncer: Debouncer<String>,
}

/// Keeps the busy indicator on while alive.
struct Busy<'a> {
    loading: &'a LoadingCounter,
    surface: &'a dyn Surface,
}

impl<'a> Busy<'a> {
    fn start(loading: &'a LoadingCounter, surface: &'a dyn Surface) -> Self {
        if loading.begin() {
            surface.set_busy(true);
        }
        Self { loading, surface }
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        if self.loading.end() {
            self.surface.set_busy(false);
        }
    }
}

/// The people directory client.
#[derive(Debug)]
pub struct App<T> {
    api: PeopleApi<T>,
    settings: UiSettings,
    cache: RefCell<PeopleCache>,
    form: RefCell<FormController>,
    notices: RefCell<NoticeBoard>,
    search: RefCell<SearchState>,
    loading: LoadingCounter,
    list_generation: Generation,
    locks: KeyLocks,
    surface: Rc<dyn Surface>,
    prompt: Rc<dyn Prompt>,
    clock: Rc<dyn Clock>,
}

impl<T: HttpTransport> App<T> {
    /// Create a client with an empty cache and the modal closed.
    pub fn new(
        api: PeopleApi<T>,
        settings: UiSettings,
        surface: Rc<dyn Surface>,
        prompt: Rc<dyn Prompt>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let search = SearchState {
            query: String::new(),
            debouncer: Debouncer::new(settings.search_debounce),
        };
        Self {
            api,
            settings,
            cache: RefCell::new(PeopleCache::new()),
            form: RefCell::new(FormController::new()),
            notices: RefCell::new(NoticeBoard::new()),
            search: RefCell::new(search),
            loading: LoadingCounter::new(),
            list_generation: Generation::new(),
            locks: KeyLocks::new(),
            surface,
            prompt,
            clock,
        }
    }

    /// The API client.
    pub fn api(&self) -> &PeopleApi<T> {
        &self.api
    }

    /// The interface settings.
    pub fn settings(&self) -> &UiSettings {
        &self.settings
    }

    /// Cached records in cache order.
    pub fn people(&self) -> Vec<Person> {
        self.cache.borrow().people().to_vec()
    }

    /// The rows the table currently shows.
    pub fn view(&self) -> TableView {
        let query = self.search.borrow().query.clone();
        project(self.cache.borrow().people(), &query)
    }

    /// The applied search query.
    pub fn query(&self) -> String {
        self.search.borrow().query.clone()
    }

    /// The open modal, if any.
    pub fn modal(&self) -> Option<ModalSession> {
        self.form.borrow().session().cloned()
    }

    /// The visible notice, if any.
    pub fn notice(&self) -> Option<Notice> {
        self.notices.borrow().current(self.clock.now()).cloned()
    }

    /// Whether any operation is in flight.
    pub fn is_busy(&self) -> bool {
        self.loading.is_busy()
    }

    /// Run `action`.
    ///
    /// # Errors
    ///
    /// Returns the error that was surfaced as a notice, if any.
    pub async fn dispatch(&self, action: Action) -> Result<()> {
        debug!(?action, "Dispatching");
        match action {
            Action::New => {
                self.open_new();
                Ok(())
            }
            Action::Edit(dni) => self.open_edit(&dni).await,
            Action::Delete(dni) => self.delete(&dni).await,
            Action::Submit => self.submit().await,
            Action::Cancel => {
                self.close(CloseReason::Cancel);
                Ok(())
            }
            Action::Close => {
                self.close(CloseReason::CloseButton);
                Ok(())
            }
            Action::Backdrop => {
                self.close(CloseReason::Backdrop);
                Ok(())
            }
            Action::Refresh => self.refresh().await,
            Action::Search(query) => {
                self.search_input(&query);
                Ok(())
            }
            Action::Set(field, value) => self.set_field(field, value),
        }
    }

    // === List and search ===

    /// Reload the list from the server and repaint.
    ///
    /// A response that was superseded while in flight is dropped. A body
    /// that is not an array shows an empty table.
    ///
    /// # Errors
    ///
    /// Returns the list error after surfacing it.
    pub async fn refresh(&self) -> Result<()> {
        let token = self.list_generation.advance();
        let result = {
            let _busy = self.busy();
            self.api.list().await
        };

        if !self.list_generation.is_current(token) {
            debug!(token, "Discarding superseded list response");
            return Ok(());
        }

        match result {
            Ok(body) => {
                let people = body.people().unwrap_or_else(|| {
                    warn!("List response is not an array; showing an empty table");
                    Vec::new()
                });
                info!(count = people.len(), "List loaded");
                self.cache.borrow_mut().replace_all(people);
                self.repaint();
                self.notify(NoticeKind::Success, "List updated", self.settings.refresh_notice);
                Ok(())
            }
            Err(e) => self.fail(format!("Failed to load people: {e}"), e),
        }
    }

    /// Feed raw search box input; applied after the quiet period.
    pub fn search_input(&self, raw: &str) {
        let now = self.clock.now();
        self.search
            .borrow_mut()
            .debouncer
            .schedule(raw.to_string(), now);
    }

    /// Apply a search query immediately, dropping pending input.
    pub fn search_now(&self, raw: &str) {
        {
            let mut search = self.search.borrow_mut();
            search.debouncer.cancel();
            search.query = normalize_query(raw);
        }
        self.repaint();
    }

    /// Fire whatever timers are due: pending search input, notice expiry.
    ///
    /// Returns `true` if anything changed on screen.
    pub fn poll(&self) -> bool {
        let now = self.clock.now();
        let mut changed = false;

        let due = self.search.borrow_mut().debouncer.tick(now);
        if let Some(raw) = due {
            let query = normalize_query(&raw);
            debug!(%query, "Applying search");
            self.search.borrow_mut().query = query;
            self.repaint();
            changed = true;
        }

        let expired = self.notices.borrow_mut().tick(now);
        if expired {
            self.surface.dismiss();
            changed = true;
        }
        changed
    }

    /// The earliest instant at which [`App::poll`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let search = self.search.borrow().debouncer.deadline();
        let notice = self.notices.borrow().deadline();
        match (search, notice) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // === Form ===

    /// Open an empty create form.
    pub fn open_new(&self) {
        self.form.borrow_mut().open_new();
        self.paint_modal();
    }

    /// Open the edit form for `dni` and pre-fill it.
    ///
    /// The record is fetched from the server, falling back to the cached
    /// copy. If neither has it an informational notice is shown and the form
    /// stays open with only the identifier.
    ///
    /// # Errors
    ///
    /// Never fails; lookup problems are reported as notices.
    pub async fn open_edit(&self, dni: &str) -> Result<()> {
        let epoch = self.form.borrow_mut().open_edit(dni).epoch();
        self.paint_modal();

        match self.lookup(dni).await {
            Some(person) => {
                let filled = self.form.borrow_mut().prefill(epoch, &person);
                if filled {
                    self.paint_modal();
                } else {
                    debug!(dni, "Form closed before its record arrived");
                }
            }
            None => {
                self.notify(
                    NoticeKind::Info,
                    format!("No data found for DNI {dni}"),
                    self.settings.notice,
                );
            }
        }
        Ok(())
    }

    /// The authoritative record for `dni`, or the cached copy.
    pub async fn lookup(&self, dni: &str) -> Option<Person> {
        let fetched = {
            let _busy = self.busy();
            self.api.get_one(dni).await
        };
        match fetched {
            Ok(body) => body.person().or_else(|| {
                warn!(dni, "Record response is not a person; using cached copy");
                self.cache.borrow().find(dni).cloned()
            }),
            Err(e) => {
                warn!(dni, error = %e, "Fetching record failed; using cached copy");
                self.cache.borrow().find(dni).cloned()
            }
        }
    }

    /// Type into a form input.
    ///
    /// # Errors
    ///
    /// Fails (with a notice) if no form is open or the identifier is locked.
    pub fn set_field(&self, field: Field, value: impl Into<String>) -> Result<()> {
        let result = self.form.borrow_mut().set_field(field, value);
        match result {
            Ok(()) => {
                self.paint_modal();
                Ok(())
            }
            Err(e) => self.fail(e.to_string(), e),
        }
    }

    /// Close the form.
    pub fn close(&self, reason: CloseReason) {
        let closed = self.form.borrow_mut().close(reason);
        if closed.is_some() {
            self.paint_modal();
        }
    }

    /// Validate and save the open form.
    ///
    /// Invalid input never reaches the network. A submit while a save is in
    /// flight does nothing. On success the cache is updated, the table
    /// repainted and the form closed; on failure the form stays open with
    /// its fields.
    ///
    /// # Errors
    ///
    /// Returns the validation, conflict or save error after surfacing it.
    pub async fn submit(&self) -> Result<()> {
        let begun = self.form.borrow_mut().begin_submit();
        let submission = match begun {
            Ok(Some(submission)) => submission,
            Ok(None) => return Ok(()),
            Err(e) if e.is_validation() => {
                return self.fail(format!("Please fill in every field correctly: {e}"), e)
            }
            Err(e) => return self.fail(e.to_string(), e),
        };
        let epoch = submission.epoch;
        let person = submission.person;
        self.paint_modal();

        let Some(guard) = self.locks.try_lock(&person.dni) else {
            self.form.borrow_mut().finish_submit(epoch, false);
            self.paint_modal();
            let err = Error::Busy { dni: person.dni };
            return self.fail(err.to_string(), err);
        };

        let result = {
            let _busy = self.busy();
            match &submission.mode {
                FormMode::New => self.api.create(&person).await,
                FormMode::Edit { dni } => self.api.update(dni, &person).await,
            }
        };
        drop(guard);

        match result {
            Ok(body) => {
                let message = match &submission.mode {
                    FormMode::New => {
                        let record = body.person().unwrap_or_else(|| person.clone());
                        self.cache.borrow_mut().insert(record);
                        "Created successfully"
                    }
                    FormMode::Edit { dni } => {
                        if !self.cache.borrow_mut().replace_by_key(dni, person.clone()) {
                            debug!(%dni, "Updated record is not cached");
                        }
                        "Updated successfully"
                    }
                };
                self.list_generation.advance();
                self.form.borrow_mut().finish_submit(epoch, true);
                self.repaint();
                self.paint_modal();
                self.notify(NoticeKind::Success, message, self.settings.notice);
                Ok(())
            }
            Err(e) => {
                self.form.borrow_mut().finish_submit(epoch, false);
                self.paint_modal();
                let message = if e.is_conflict() {
                    format!("DNI {} already exists. Use a different one.", person.dni)
                } else {
                    format!("Failed to save: {e}")
                };
                self.fail(message, e)
            }
        }
    }

    // === Delete ===

    /// Delete `dni` optimistically.
    ///
    /// After confirmation the row disappears at once; the request follows.
    /// If it fails the row comes back and an error notice is shown.
    ///
    /// # Errors
    ///
    /// Returns the busy or delete error after surfacing it. Declining the
    /// confirmation is not an error.
    pub async fn delete(&self, dni: &str) -> Result<()> {
        if self.settings.confirm_deletes
            && !self
                .prompt
                .confirm(&format!("Delete person with DNI {dni}?"))
                .await
        {
            debug!(dni, "Delete declined");
            return Ok(());
        }

        let Some(_guard) = self.locks.try_lock(dni) else {
            let err = Error::Busy {
                dni: dni.to_string(),
            };
            return self.fail(err.to_string(), err);
        };

        let (snapshot, removed, revision) = {
            let mut cache = self.cache.borrow_mut();
            let snapshot = cache.snapshot();
            let removed = cache.remove_by_key(dni);
            (snapshot, removed, cache.revision())
        };
        self.list_generation.advance();
        self.repaint();

        let result = {
            let _busy = self.busy();
            self.api.delete(dni).await
        };

        match result {
            Ok(_) => {
                info!(dni, "Deleted");
                self.notify(NoticeKind::Success, "Deleted successfully", self.settings.notice);
                Ok(())
            }
            Err(e) => {
                self.rollback(snapshot, revision, removed);
                self.repaint();
                self.fail(format!("Failed to delete: {e}"), e)
            }
        }
    }

    fn rollback(&self, snapshot: CacheSnapshot, revision: u64, removed: Option<(usize, Person)>) {
        let mut cache = self.cache.borrow_mut();
        if cache.revision() == revision {
            debug!("Restoring cache snapshot after failed delete");
            cache.restore(snapshot);
        } else if let Some((index, person)) = removed {
            let dni = person.dni.clone();
            if !cache.insert_at(index, person) {
                debug!(%dni, "Record already back in cache; nothing to roll back");
            }
        }
    }

    // === Painting ===

    fn busy(&self) -> Busy<'_> {
        Busy::start(&self.loading, self.surface.as_ref())
    }

    fn repaint(&self) {
        let view = self.view();
        self.surface.paint(&view);
    }

    fn paint_modal(&self) {
        let session = self.modal();
        self.surface.modal(session.as_ref());
    }

    fn notify(&self, kind: NoticeKind, message: impl Into<String>, duration: Duration) {
        let now = self.clock.now();
        let notice = self
            .notices
            .borrow_mut()
            .show(kind, message, duration, now)
            .clone();
        self.surface.notify(&notice);
    }

    fn fail(&self, message: String, err: Error) -> Result<()> {
        debug!(error = %err, "{message}");
        self.notify(NoticeKind::Error, message, self.settings.notice);
        Err(err)
    }
}
