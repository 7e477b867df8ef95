use crate::error::StoreError;
use parking_lot::RwLock;
use std::collections::HashMap;

/// An entity that can be kept in a [`Store`]
pub trait Resource: Clone + Send + Sync {
    /// The primary key
    fn id(&self) -> &str;

    /// The secondary key used by [`Store::get_by_name`]
    fn name(&self) -> &str;

    /// Whether `name` refers to this entity. Exact by default.
    fn name_matches(&self, name: &str) -> bool {
        self.name() == name
    }

    /// Whether this entity currently claims its name. Only claiming
    /// entities take part in the uniqueness check.
    fn holds_name(&self) -> bool {
        true
    }

    fn version(&self) -> u64;

    fn set_version(&mut self, version: u64);
}

struct Slot<T> {
    seq: u64,
    value: T,
}

struct Entries<T> {
    slots: HashMap<String, Slot<T>>,
    next_seq: u64,
}

impl<T: Resource> Entries<T> {
    fn new() -> Self {
        Self {
            slots: HashMap::new(),
            next_seq: 0,
        }
    }

    fn upsert(&mut self, value: T) {
        let id = value.id().to_string();
        match self.slots.get_mut(&id) {
            Some(slot) => slot.value = value,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.slots.insert(id, Slot { seq, value });
            }
        }
    }

    fn name_taken(&self, name: &str, except_id: &str) -> bool {
        self.slots.values().any(|slot| {
            slot.value.id() != except_id && slot.value.holds_name() && slot.value.name_matches(name)
        })
    }
}

/// A keyed, versioned, thread-safe collection of resources.
///
/// Entries keep their insertion sequence, so [`Store::all`] lists them in
/// creation order. Compound operations run under a single write lock.
pub struct Store<T> {
    entries: RwLock<Entries<T>>,
    seed: Vec<T>,
}

impl<T: Resource> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> Store<T> {
    pub fn new() -> Self {
        Self::with_seed(Vec::new())
    }

    /// A store that starts with, and is reset to, the given entries
    pub fn with_seed(seed: Vec<T>) -> Self {
        let mut entries = Entries::new();
        for value in seed.iter().cloned() {
            entries.upsert(value);
        }
        Self {
            entries: RwLock::new(entries),
            seed,
        }
    }

    /// Inserts or replaces the entry with the same id
    pub fn add(&self, value: T) {
        self.entries.write().upsert(value);
    }

    /// Same as [`Store::add`]
    pub fn update(&self, value: T) {
        self.add(value);
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.entries.read().slots.get(id).map(|slot| slot.value.clone())
    }

    /// Linear scan for the entry with this name.
    ///
    /// The entry holding the name wins over released namesakes; ties go
    /// to the oldest.
    pub fn get_by_name(&self, name: &str) -> Option<T> {
        let entries = self.entries.read();
        entries
            .slots
            .values()
            .filter(|slot| slot.value.name_matches(name))
            .min_by_key(|slot| (!slot.value.holds_name(), slot.seq))
            .map(|slot| slot.value.clone())
    }

    /// Removes the entry, returning it if it existed
    pub fn delete(&self, id: &str) -> Option<T> {
        self.entries.write().slots.remove(id).map(|slot| slot.value)
    }

    pub fn all(&self) -> Vec<T> {
        let entries = self.entries.read();
        let mut slots: Vec<&Slot<T>> = entries.slots.values().collect();
        slots.sort_by_key(|slot| slot.seq);
        slots.into_iter().map(|slot| slot.value.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resets the store to its seed entries
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        *entries = Entries::new();
        for value in self.seed.iter().cloned() {
            entries.upsert(value);
        }
    }

    /// Inserts a new entry, failing if the id exists or the name is held
    pub fn create(&self, value: T) -> Result<T, StoreError> {
        let mut entries = self.entries.write();
        if entries.slots.contains_key(value.id()) {
            return Err(StoreError::Conflict(value.id().to_string()));
        }
        if value.holds_name() && entries.name_taken(value.name(), value.id()) {
            return Err(StoreError::Conflict(value.name().to_string()));
        }
        entries.upsert(value.clone());
        Ok(value)
    }

    /// Replaces an existing entry under optimistic concurrency.
    ///
    /// `apply` builds the replacement from the stored entry. When
    /// `expected_version` is given it must equal the stored version. The
    /// stored version is incremented on success.
    pub fn replace<F>(
        &self,
        id: &str,
        expected_version: Option<u64>,
        apply: F,
    ) -> Result<T, StoreError>
    where
        F: FnOnce(&T) -> T,
    {
        let mut entries = self.entries.write();
        let current = entries
            .slots
            .get(id)
            .map(|slot| &slot.value)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let actual = current.version();
        if let Some(expected) = expected_version {
            if expected != actual {
                return Err(StoreError::VersionMismatch { expected, actual });
            }
        }

        let mut replacement = apply(current);
        if replacement.id() != id {
            return Err(StoreError::Conflict(replacement.id().to_string()));
        }
        if replacement.holds_name() && entries.name_taken(replacement.name(), id) {
            return Err(StoreError::Conflict(replacement.name().to_string()));
        }

        replacement.set_version(actual + 1);
        entries.upsert(replacement.clone());
        Ok(replacement)
    }

    /// Mutates an entry in place and returns whatever `f` returns
    pub fn modify<F, R>(&self, id: &str, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut entries = self.entries.write();
        let slot = entries
            .slots
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(f(&mut slot.value))
    }
}
