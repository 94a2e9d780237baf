//! Typed per-call attribute storage.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// A named key for a value of type `T` in [`Attributes`].
///
/// A key is identified by its name together with `T`: two keys with the same
/// name but different value types address separate slots. Declare keys as
/// `const` items so every use site shares one name.
pub struct AttributeKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AttributeKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> fmt::Debug for AttributeKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttributeKey({})", self.name)
    }
}

/// Request-scoped storage shared by the receive accessors and pipeline steps.
///
/// Single-writer: the owning call is borrowed mutably for the duration of a
/// receive, so no synchronization is needed.
#[derive(Default)]
pub struct Attributes {
    values: HashMap<(&'static str, TypeId), Box<dyn Any + Send + Sync>>,
}

fn slot<T: Any>(key: &AttributeKey<T>) -> (&'static str, TypeId) {
    (key.name, TypeId::of::<T>())
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`, if present.
    pub fn get<T: Any + Send + Sync>(&self, key: &AttributeKey<T>) -> Option<&T> {
        self.values.get(&slot(key))?.downcast_ref::<T>()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn put<T: Any + Send + Sync>(&mut self, key: &AttributeKey<T>, value: T) {
        self.values.insert(slot(key), Box::new(value));
    }

    pub fn contains<T: Any + Send + Sync>(&self, key: &AttributeKey<T>) -> bool {
        self.get(key).is_some()
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove<T: Any + Send + Sync>(&mut self, key: &AttributeKey<T>) -> Option<T> {
        let boxed = self.values.remove(&slot(key))?;
        boxed.downcast::<T>().ok().map(|value| *value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.values.keys().map(|(name, _)| *name).collect();
        names.sort();
        f.debug_struct("Attributes").field("keys", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNT: AttributeKey<u32> = AttributeKey::new("Count");
    const LABEL: AttributeKey<String> = AttributeKey::new("Label");
    const COUNT_AS_STRING: AttributeKey<String> = AttributeKey::new("Count");

    #[test]
    fn put_get_remove() {
        let mut attributes = Attributes::new();
        assert!(attributes.get(&COUNT).is_none());

        attributes.put(&COUNT, 3);
        attributes.put(&LABEL, "first".to_string());
        assert_eq!(attributes.get(&COUNT), Some(&3));
        assert_eq!(attributes.len(), 2);

        attributes.put(&COUNT, 4);
        assert_eq!(attributes.remove(&COUNT), Some(4));
        assert!(!attributes.contains(&COUNT));
    }

    #[test]
    fn same_name_with_other_type_is_a_separate_slot() {
        let mut attributes = Attributes::new();
        attributes.put(&COUNT, 7);
        assert!(attributes.get(&COUNT_AS_STRING).is_none());
        assert!(attributes.remove(&COUNT_AS_STRING).is_none());

        attributes.put(&COUNT_AS_STRING, "seven".to_string());
        assert_eq!(attributes.get(&COUNT), Some(&7));
        assert_eq!(attributes.get(&COUNT_AS_STRING).map(String::as_str), Some("seven"));
        assert_eq!(attributes.len(), 2);
    }
}
