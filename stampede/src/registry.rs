use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Insertion-ordered table of named entries.
///
/// Entries are only ever added, and every entry is internally synchronized (atomics or a
/// lock-free bucket), so recording only needs the read lock once a name exists.
#[derive(Debug)]
pub(crate) struct Registry<T> {
    inner: RwLock<Table<T>>,
}

#[derive(Debug)]
struct Table<T> {
    index: HashMap<String, usize>,
    entries: Vec<(String, T)>,
}

impl<T: Default> Registry<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Table {
                index: HashMap::new(),
                entries: Vec::new(),
            }),
        }
    }

    /// Runs `f` against the entry for `name`, creating it first if needed.
    pub fn with<R>(&self, name: &str, f: impl FnOnce(&T) -> R) -> R {
        {
            // NOTE: Entries never hold partially-applied state, so a poisoned lock is still usable.
            let table = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&idx) = table.index.get(name) {
                return f(&table.entries[idx].1);
            }
        }

        let mut table = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have inserted the name between the two locks.
        let idx = match table.index.get(name) {
            Some(&idx) => idx,
            None => {
                let idx = table.entries.len();
                table.entries.push((name.to_string(), T::default()));
                table.index.insert(name.to_string(), idx);
                idx
            }
        };
        f(&table.entries[idx].1)
    }

    /// Runs `f` against the entry for `name` without creating it.
    pub fn get<R>(&self, name: &str, f: impl FnOnce(&T) -> R) -> Option<R> {
        let table = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        table.index.get(name).map(|&idx| f(&table.entries[idx].1))
    }

    /// Maps every entry in insertion order.
    pub fn map<R>(&self, mut f: impl FnMut(&str, &T) -> R) -> Vec<R> {
        let table = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        table
            .entries
            .iter()
            .map(|(name, entry)| f(name, entry))
            .collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}

impl<T: Default> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
