//! `peopledesk` - A client for a remote people directory
//!
//! This library keeps a local copy of a people collection served over REST,
//! projects it into a searchable table, and drives the create/edit form and
//! the optimistic delete flow. Rendering and confirmation are host ports, so
//! the same [`App`] backs the `pdesk` one-shot commands and its shell.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod form;
pub mod inflight;
pub mod logging;
pub mod notice;
pub mod person;
pub mod render;
pub mod schedule;
pub mod surface;
pub mod transport;

#[cfg(test)]
mod testing;

pub use api::PeopleApi;
pub use app::{Action, App, UiSettings};
pub use config::Config;
pub use error::{Error, Result};
pub use form::Field;
pub use logging::init_logging;
pub use person::Person;
pub use schedule::{Clock, SystemClock};
pub use transport::{HttpTransport, ReqwestTransport};
