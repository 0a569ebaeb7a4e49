//! The `Person` record exchanged with the remote directory.

use serde::{Deserialize, Serialize};

/// Inclusive upper bound for a person's age.
pub const MAX_AGE: u32 = 130;

/// A person in the remote directory.
///
/// `dni` is the unique key, both in the local cache and on the server. The
/// client never generates a `dni` nor changes it on an existing record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Person {
    /// Display name.
    pub name: String,
    /// National identifier; the record key.
    pub dni: String,
    /// Age in years, `0..=130`.
    pub age: u32,
}

impl Person {
    /// Create a new person record.
    #[must_use]
    pub fn new(name: impl Into<String>, dni: impl Into<String>, age: u32) -> Self {
        Self {
            name: name.into(),
            dni: dni.into(),
            age,
        }
    }

    /// Check whether `name` or `dni` contains `needle`.
    ///
    /// `needle` must already be lowercase; the record fields are lowered here.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.dni.to_lowercase().contains(needle)
    }

    /// Key used to order rows: the lowercased name.
    #[must_use]
    pub fn sort_key(&self) -> String {
        self.name.to_lowercase()
    }
}
