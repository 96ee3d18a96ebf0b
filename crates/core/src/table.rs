//! Open-addressed hash table with tombstone deletion.
//!
//! This is not `std::collections::HashMap`: the VM's globals table and the
//! interner both depend on the exact probing/growth/tombstone behavior
//! described below, so it is hand-rolled to match.
//!
//! - Capacity is always a power of two, starting at 8.
//! - Grows (doubling) when `count + 1` would exceed 75% load.
//! - A deleted entry becomes a tombstone: `key = None`, `value =
//!   Bool(true)`. An empty, never-used slot is `key = None`, `value =
//!   Nil`. `count` includes tombstones until the next grow, matching the
//!   reference table's bookkeeping (`spec.md` §4.3 and testable property
//!   in §8).

use crate::value::{ObjString, Value};
use std::rc::Rc;

const INITIAL_CAPACITY: usize = 8;
const MAX_LOAD: f64 = 0.75;

#[derive(Clone)]
struct Entry {
    key: Option<Rc<ObjString>>,
    value: Value,
}

impl Entry {
    fn empty() -> Self {
        Entry {
            key: None,
            value: Value::Nil,
        }
    }

    fn is_tombstone(&self) -> bool {
        self.key.is_none() && matches!(self.value, Value::Bool(true))
    }

    fn is_empty_slot(&self) -> bool {
        self.key.is_none() && !self.is_tombstone()
    }
}

/// An open-addressed, linearly-probed table from interned strings to
/// [`Value`]s. Used for both the VM's globals and the string interner
/// (whose "values" are the canonical `Rc<ObjString>` itself, looked up by
/// content rather than by key).
pub struct Table {
    entries: Vec<Entry>,
    count: usize,
}

impl Table {
    pub fn new() -> Self {
        Table {
            entries: Vec::new(),
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Linear probe starting at `hash % capacity`, matching `cw_find_entry`:
    /// returns the slot where `key` is found, or the first tombstone/empty
    /// slot seen along the way if it's absent (tombstones are reused so
    /// repeated insert/delete doesn't exhaust the table).
    fn find_entry(entries: &[Entry], key: &Rc<ObjString>) -> usize {
        let capacity = entries.len();
        let mut index = (key.hash as usize) & (capacity - 1);
        let mut tombstone: Option<usize> = None;
        loop {
            let entry = &entries[index];
            match &entry.key {
                Some(k) if Rc::ptr_eq(k, key) => return index,
                None => {
                    if entry.is_tombstone() {
                        if tombstone.is_none() {
                            tombstone = Some(index);
                        }
                    } else {
                        return tombstone.unwrap_or(index);
                    }
                }
                _ => {}
            }
            index = (index + 1) & (capacity - 1);
        }
    }

    fn grow(&mut self) {
        let new_capacity = if self.capacity() == 0 {
            INITIAL_CAPACITY
        } else {
            self.capacity() * 2
        };
        let mut new_entries = vec![Entry::empty(); new_capacity];
        let mut new_count = 0;
        for entry in &self.entries {
            if let Some(key) = &entry.key {
                let index = Self::find_entry(&new_entries, key);
                new_entries[index] = Entry {
                    key: Some(key.clone()),
                    value: entry.value.clone(),
                };
                new_count += 1;
            }
        }
        self.entries = new_entries;
        self.count = new_count;
    }

    /// Insert or overwrite `key => value`. Returns `true` if this created a
    /// brand new key (matching `cw_table_insert`'s return value), `false`
    /// if it overwrote an existing one.
    pub fn insert(&mut self, key: &Rc<ObjString>, value: Value) -> bool {
        if self.capacity() == 0 || (self.count + 1) as f64 > self.capacity() as f64 * MAX_LOAD {
            self.grow();
        }
        let index = Self::find_entry(&self.entries, key);
        let entry = &mut self.entries[index];
        let is_new_key = entry.key.is_none();
        if is_new_key && !entry.is_tombstone() {
            self.count += 1;
        }
        entry.key = Some(key.clone());
        entry.value = value;
        is_new_key
    }

    pub fn get(&self, key: &Rc<ObjString>) -> Option<&Value> {
        if self.capacity() == 0 {
            return None;
        }
        let index = Self::find_entry(&self.entries, key);
        self.entries[index].key.as_ref().map(|_| &self.entries[index].value)
    }

    /// Delete `key`, leaving a tombstone in its slot. Returns `true` if the
    /// key was present.
    pub fn delete(&mut self, key: &Rc<ObjString>) -> bool {
        if self.capacity() == 0 {
            return false;
        }
        let index = Self::find_entry(&self.entries, key);
        if self.entries[index].key.is_none() {
            return false;
        }
        self.entries[index] = Entry {
            key: None,
            value: Value::Bool(true),
        };
        true
    }

    /// Probe by content rather than by `Rc` identity: used when interning,
    /// to find an existing `ObjString` with the same bytes before
    /// allocating a new one (`cw_table_find_key` in the original).
    pub fn find_string(&self, bytes: &[u8], hash: u32) -> Option<Rc<ObjString>> {
        if self.capacity() == 0 {
            return None;
        }
        let capacity = self.capacity();
        let mut index = (hash as usize) & (capacity - 1);
        loop {
            let entry = &self.entries[index];
            match &entry.key {
                Some(k) => {
                    if k.hash == hash && k.as_bytes() == bytes {
                        return Some(k.clone());
                    }
                }
                None => {
                    if !entry.is_tombstone() {
                        return None;
                    }
                }
            }
            index = (index + 1) & (capacity - 1);
        }
    }

    /// Return the canonical interned `ObjString` for `bytes`, allocating
    /// and registering a new one only if no equal string has been seen by
    /// this table before. Both the compiler (building string constants)
    /// and the VM (concatenating strings at runtime) call through this
    /// same table, so the two share one interning index (`spec.md` §3,
    /// testable property in §8).
    pub fn intern(&mut self, bytes: Vec<u8>) -> Rc<ObjString> {
        let hash = crate::value::fnv1a_hash(&bytes);
        if let Some(existing) = self.find_string(&bytes, hash) {
            return existing;
        }
        let interned = Rc::new(ObjString::new(bytes));
        self.insert(&interned, Value::Nil);
        interned
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Rc<ObjString> {
        Rc::new(ObjString::new(s.as_bytes().to_vec()))
    }

    #[test]
    fn insert_then_get_round_trips() {
        let mut t = Table::new();
        let k = key("answer");
        assert!(t.insert(&k, Value::Number(42.0)));
        assert_eq!(t.get(&k), Some(&Value::Number(42.0)));
    }

    #[test]
    fn reinsert_overwrites_and_reports_not_new() {
        let mut t = Table::new();
        let k = key("x");
        assert!(t.insert(&k, Value::Number(1.0)));
        assert!(!t.insert(&k, Value::Number(2.0)));
        assert_eq!(t.get(&k), Some(&Value::Number(2.0)));
    }

    #[test]
    fn delete_leaves_tombstone_not_found_on_get() {
        let mut t = Table::new();
        let k = key("gone");
        t.insert(&k, Value::Nil);
        assert!(t.delete(&k));
        assert_eq!(t.get(&k), None);
        // Deleting again reports absent.
        assert!(!t.delete(&k));
    }

    #[test]
    fn tombstone_slot_is_reused_on_insert() {
        let mut t = Table::new();
        let a = key("a");
        let b = key("b");
        t.insert(&a, Value::Number(1.0));
        t.delete(&a);
        // Table should still find b fine by probing past the tombstone.
        t.insert(&b, Value::Number(2.0));
        assert_eq!(t.get(&b), Some(&Value::Number(2.0)));
    }

    #[test]
    fn grows_past_load_factor_without_losing_entries() {
        let mut t = Table::new();
        let mut keys = Vec::new();
        for i in 0..100 {
            let k = key(&format!("key{i}"));
            t.insert(&k, Value::Number(i as f64));
            keys.push(k);
        }
        for (i, k) in keys.iter().enumerate() {
            assert_eq!(t.get(k), Some(&Value::Number(i as f64)));
        }
    }

    #[test]
    fn find_string_matches_by_content_not_identity() {
        let mut t = Table::new();
        let k = key("shared");
        t.insert(&k, Value::Nil);
        let bytes = b"shared";
        let hash = crate::value::fnv1a_hash(bytes);
        let found = t.find_string(bytes, hash);
        assert!(found.is_some());
        assert!(Rc::ptr_eq(&found.unwrap(), &k));
    }

    #[test]
    fn find_string_absent_returns_none() {
        let t = Table::new();
        assert!(t.find_string(b"nope", crate::value::fnv1a_hash(b"nope")).is_none());
    }
}
