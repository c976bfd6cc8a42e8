//! Thread-safe touch cache using DashMap.
//!
//! Remembers the last invocation counter seen for each function across
//! reconciliation rounds. Entries are never evicted; the function set is
//! bounded by what is deployed on the gateway.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::types::FunctionName;

/// Last observed counter for one function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEntry {
    /// Nothing trustworthy recorded yet: first sighting or after a counter reset.
    Unknown,
    /// Counter value recorded at the end of the previous round.
    Seen(f64),
}

impl TouchEntry {
    /// The recorded counter, if any.
    pub fn value(&self) -> Option<f64> {
        match self {
            TouchEntry::Unknown => None,
            TouchEntry::Seen(value) => Some(*value),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TouchEntry::Unknown)
    }
}

impl fmt::Display for TouchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TouchEntry::Unknown => write!(f, "unknown"),
            TouchEntry::Seen(value) => write!(f, "{}", value),
        }
    }
}

/// Cloneable handle to the process-wide touch cache.
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct TouchCache {
    entries: Arc<DashMap<FunctionName, TouchEntry>>,
}

impl TouchCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current entry for a function, creating it as `Unknown` on first sight.
    pub fn observe(&self, name: &FunctionName) -> TouchEntry {
        *self
            .entries
            .entry(name.clone())
            .or_insert(TouchEntry::Unknown)
    }

    /// Current entry for a function without creating one.
    pub fn get(&self, name: &FunctionName) -> Option<TouchEntry> {
        self.entries.get(name).map(|entry| *entry)
    }

    /// Overwrite the entry for a function.
    pub fn store(&self, name: &FunctionName, entry: TouchEntry) {
        self.entries.insert(name.clone(), entry);
    }

    /// Check if a function has an entry.
    pub fn contains(&self, name: &FunctionName) -> bool {
        self.entries.contains_key(name)
    }

    /// Get the number of tracked functions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of all entries, sorted by function name.
    pub fn snapshot(&self) -> Vec<(FunctionName, TouchEntry)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> FunctionName {
        FunctionName::new(s).unwrap()
    }

    #[test]
    fn test_observe_creates_unknown() {
        let cache = TouchCache::new();
        let f1 = name("f1");

        assert_eq!(cache.get(&f1), None);
        assert_eq!(cache.observe(&f1), TouchEntry::Unknown);
        assert_eq!(cache.get(&f1), Some(TouchEntry::Unknown));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_store_overwrites() {
        let cache = TouchCache::new();
        let f1 = name("f1");

        cache.store(&f1, TouchEntry::Seen(10.0));
        assert_eq!(cache.observe(&f1), TouchEntry::Seen(10.0));

        cache.store(&f1, TouchEntry::Unknown);
        assert_eq!(cache.get(&f1), Some(TouchEntry::Unknown));
    }

    #[test]
    fn test_clones_share_state() {
        let cache = TouchCache::new();
        let handle = cache.clone();

        handle.store(&name("f1"), TouchEntry::Seen(3.0));
        assert!(cache.contains(&name("f1")));
        assert_eq!(
            cache.snapshot(),
            vec![(name("f1"), TouchEntry::Seen(3.0))]
        );
    }

    #[test]
    fn test_entry_display() {
        assert_eq!(TouchEntry::Unknown.to_string(), "unknown");
        assert_eq!(TouchEntry::Seen(42.0).to_string(), "42");
        assert_eq!(TouchEntry::Seen(42.0).value(), Some(42.0));
        assert!(TouchEntry::Unknown.is_unknown());
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let cache = TouchCache::new();

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let cache = cache.clone();
                thread::spawn(move || {
                    let f = name(&format!("func-{}", i));
                    cache.observe(&f);
                    cache.store(&f, TouchEntry::Seen(i as f64));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 10);
        assert_eq!(cache.get(&name("func-7")), Some(TouchEntry::Seen(7.0)));
    }
}
