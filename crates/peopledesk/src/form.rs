//! The create/edit form and its modal lifecycle.
//!
//! The controller is a small state machine:
//!
//! ```text
//! closed ──open_new──▶ open(new)
//! closed ──open_edit─▶ open(edit, dni)
//! open(*) ──close────▶ closed   (close button, cancel, backdrop, submitted)
//! ```
//!
//! It holds raw text exactly as typed; [`validate`] turns it into a
//! [`Person`] right before submission. Every opened session gets a fresh
//! epoch so late async results (a pre-fill fetch, a save response) can tell
//! whether the session they belong to is still the one on screen.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Error, Result};
use crate::person::{Person, MAX_AGE};

/// Which kind of form is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    /// Creating a record; the identifier is editable.
    New,
    /// Editing the record with this identifier; the identifier is locked.
    Edit {
        /// Identifier of the record being edited.
        dni: String,
    },
}

/// Raw text of the three form inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    /// Name input.
    pub name: String,
    /// Identifier input.
    pub dni: String,
    /// Age input.
    pub age: String,
}

impl FormFields {
    /// Fields pre-filled from an existing record.
    #[must_use]
    pub fn from_person(person: &Person) -> Self {
        Self {
            name: person.name.clone(),
            dni: person.dni.clone(),
            age: person.age.to_string(),
        }
    }
}

/// A form input, addressable by name from the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// The name input.
    Name,
    /// The identifier input.
    Dni,
    /// The age input.
    Age,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Dni => write!(f, "dni"),
            Self::Age => write!(f, "age"),
        }
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "dni" => Ok(Self::Dni),
            "age" => Ok(Self::Age),
            other => Err(Error::validation(format!(
                "unknown field {other:?} (expected name, dni or age)"
            ))),
        }
    }
}

/// How the modal was dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The close button.
    CloseButton,
    /// The cancel button.
    Cancel,
    /// A click on the backdrop.
    Backdrop,
    /// A successful submission.
    Submitted,
}

/// State of the open modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalSession {
    mode: FormMode,
    fields: FormFields,
    submitting: bool,
    epoch: u64,
}

impl ModalSession {
    /// The form mode.
    #[must_use]
    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    /// Current input text.
    #[must_use]
    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    /// Whether a save request is in flight; the submit control is disabled.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Identity of this session.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether the identifier input accepts edits.
    #[must_use]
    pub fn dni_editable(&self) -> bool {
        matches!(self.mode, FormMode::New)
    }

    /// Modal heading.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self.mode {
            FormMode::New => "New person",
            FormMode::Edit { .. } => "Edit person",
        }
    }

    /// Label of the submit control.
    #[must_use]
    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            FormMode::New => "Create",
            FormMode::Edit { .. } => "Update",
        }
    }
}

/// A validated submission ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Mode of the session that produced it.
    pub mode: FormMode,
    /// The record to send.
    pub person: Person,
    /// Epoch of the session that produced it.
    pub epoch: u64,
}

/// Validate raw form text.
///
/// `name` and `dni` must be non-empty after trimming; `age` must be a base-10
/// integer in `0..=130`. All violations are reported in one message.
///
/// # Errors
///
/// Returns [`Error::Validation`] listing every violated rule.
pub fn validate(fields: &FormFields) -> Result<Person> {
    let name = fields.name.trim();
    let dni = fields.dni.trim();
    let age = parse_age(&fields.age);

    let mut problems = Vec::new();
    if name.is_empty() {
        problems.push("name is required".to_string());
    }
    if dni.is_empty() {
        problems.push("DNI is required".to_string());
    }
    if age.is_none() {
        problems.push(format!("age must be a whole number between 0 and {MAX_AGE}"));
    }

    match age {
        Some(age) if problems.is_empty() => Ok(Person::new(name, dni, age)),
        _ => Err(Error::validation(problems.join("; "))),
    }
}

fn parse_age(raw: &str) -> Option<u32> {
    let value: i64 = raw.trim().parse().ok()?;
    u32::try_from(value).ok().filter(|age| *age <= MAX_AGE)
}

/// Owns the single modal session.
#[derive(Debug, Default)]
pub struct FormController {
    session: Option<ModalSession>,
    epochs: u64,
}

impl FormController {
    /// Create a controller with the modal closed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The open session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&ModalSession> {
        self.session.as_ref()
    }

    /// Whether the modal is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Open an empty create form, replacing any open session.
    pub fn open_new(&mut self) -> &ModalSession {
        self.open(FormMode::New, FormFields::default())
    }

    /// Open the edit form for `dni` with only the identifier filled in.
    ///
    /// The caller fetches the record and hands it to [`FormController::prefill`].
    pub fn open_edit(&mut self, dni: &str) -> &ModalSession {
        let fields = FormFields {
            dni: dni.to_string(),
            ..FormFields::default()
        };
        self.open(
            FormMode::Edit {
                dni: dni.to_string(),
            },
            fields,
        )
    }

    fn open(&mut self, mode: FormMode, fields: FormFields) -> &ModalSession {
        self.epochs += 1;
        debug!(?mode, epoch = self.epochs, "Opening form");
        self.session.insert(ModalSession {
            mode,
            fields,
            submitting: false,
            epoch: self.epochs,
        })
    }

    /// Fill the edit form of session `epoch` from `person`.
    ///
    /// Returns `false` (and changes nothing) if that session is gone.
    pub fn prefill(&mut self, epoch: u64, person: &Person) -> bool {
        match &mut self.session {
            Some(session)
                if session.epoch == epoch && matches!(session.mode, FormMode::Edit { .. }) =>
            {
                session.fields.name.clone_from(&person.name);
                session.fields.age = person.age.to_string();
                true
            }
            _ => false,
        }
    }

    /// Close the modal, returning the session that was open.
    pub fn close(&mut self, reason: CloseReason) -> Option<ModalSession> {
        let session = self.session.take();
        if let Some(session) = &session {
            debug!(?reason, epoch = session.epoch, "Closing form");
        }
        session
    }

    /// Update one input of the open form.
    ///
    /// # Errors
    ///
    /// Fails if no form is open, or on an attempt to change the identifier
    /// of a record being edited.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) -> Result<()> {
        let session = self
            .session
            .as_mut()
            .ok_or(Error::NoForm)?;
        let value = value.into();
        match field {
            Field::Name => session.fields.name = value,
            Field::Age => session.fields.age = value,
            Field::Dni if session.dni_editable() => session.fields.dni = value,
            Field::Dni => {
                return Err(Error::validation("the DNI of an existing person cannot be changed"))
            }
        }
        Ok(())
    }

    /// Validate the open form and mark it as submitting.
    ///
    /// Returns `Ok(None)` if a submission is already in flight; the caller
    /// must not issue another request.
    ///
    /// # Errors
    ///
    /// Fails if no form is open or the fields are invalid. The form stays
    /// open and enabled in both cases.
    pub fn begin_submit(&mut self) -> Result<Option<Submission>> {
        let session = self
            .session
            .as_mut()
            .ok_or(Error::NoForm)?;
        if session.submitting {
            debug!(epoch = session.epoch, "Submit ignored; already submitting");
            return Ok(None);
        }

        let mut person = validate(&session.fields)?;
        if let FormMode::Edit { dni } = &session.mode {
            person.dni.clone_from(dni);
        }
        session.submitting = true;
        Ok(Some(Submission {
            mode: session.mode.clone(),
            person,
            epoch: session.epoch,
        }))
    }

    /// Re-enable the submit control of session `epoch`, closing it on success.
    ///
    /// Returns `true` if the modal was closed.
    pub fn finish_submit(&mut self, epoch: u64, success: bool) -> bool {
        match &mut self.session {
            Some(session) if session.epoch == epoch => {
                session.submitting = false;
                if success {
                    self.close(CloseReason::Submitted);
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }
}
