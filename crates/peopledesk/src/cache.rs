//! Local mirror of the remote people collection.
//!
//! The cache keeps records in the order the server (and later local
//! mutations) produced them; sorting happens only at render time. All
//! mutations go through the named operations below and bump a revision
//! counter, which lets an optimistic update tell whether anything else
//! touched the cache while its request was in flight.

use tracing::{debug, warn};

use crate::person::Person;

/// In-memory, ordered collection of people keyed by `dni`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeopleCache {
    people: Vec<Person>,
    revision: u64,
}

/// A copy of the cache taken before an optimistic mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
    people: Vec<Person>,
}

impl CacheSnapshot {
    /// Records in the snapshot, in cache order.
    #[must_use]
    pub fn people(&self) -> &[Person] {
        &self.people
    }
}

impl PeopleCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records in cache order.
    #[must_use]
    pub fn people(&self) -> &[Person] {
        &self.people
    }

    /// Number of cached records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.people.len()
    }

    /// Whether the cache holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Mutation counter; changes on every successful mutation.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Find a record by key.
    #[must_use]
    pub fn find(&self, dni: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.dni == dni)
    }

    /// Position of a record by key.
    #[must_use]
    pub fn position(&self, dni: &str) -> Option<usize> {
        self.people.iter().position(|p| p.dni == dni)
    }

    /// Whether a record with this key is cached.
    #[must_use]
    pub fn contains(&self, dni: &str) -> bool {
        self.position(dni).is_some()
    }

    /// Replace the whole collection with a fresh server listing.
    pub fn replace_all(&mut self, people: Vec<Person>) {
        debug!(count = people.len(), "Replacing cache contents");
        self.people = people;
        self.bump();
    }

    /// Append a record.
    ///
    /// If the key is already cached the existing entry is replaced in place,
    /// keeping keys unique.
    pub fn insert(&mut self, person: Person) {
        if let Some(index) = self.position(&person.dni) {
            warn!(dni = %person.dni, "Inserted record already cached; replacing it");
            self.people[index] = person;
        } else {
            self.people.push(person);
        }
        self.bump();
    }

    /// Insert a record at `index` (clamped to the end).
    ///
    /// Returns `false` and leaves the cache alone if the key is already
    /// present.
    pub fn insert_at(&mut self, index: usize, person: Person) -> bool {
        if self.contains(&person.dni) {
            return false;
        }
        let index = index.min(self.people.len());
        self.people.insert(index, person);
        self.bump();
        true
    }

    /// Replace the record with key `dni` in place.
    ///
    /// Returns `false` if no such record is cached.
    pub fn replace_by_key(&mut self, dni: &str, person: Person) -> bool {
        match self.position(dni) {
            Some(index) => {
                self.people[index] = person;
                self.bump();
                true
            }
            None => {
                debug!(dni, "No cached record to replace");
                false
            }
        }
    }

    /// Remove the record with key `dni`, returning its former position.
    pub fn remove_by_key(&mut self, dni: &str) -> Option<(usize, Person)> {
        let index = self.position(dni)?;
        let person = self.people.remove(index);
        self.bump();
        Some((index, person))
    }

    /// Copy the current contents.
    #[must_use]
    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            people: self.people.clone(),
        }
    }

    /// Put back the contents of `snapshot`.
    pub fn restore(&mut self, snapshot: CacheSnapshot) {
        debug!(count = snapshot.people.len(), "Restoring cache snapshot");
        self.people = snapshot.people;
        self.bump();
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}
