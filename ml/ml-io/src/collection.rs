//! Ordered collections addressable by index and by unique name.

use std::collections::HashSet;

use hashbrown::HashMap;
use tracing::debug;

use crate::error::{IoError, Result};

/// An item that carries its own name.
pub trait Named {
    /// Returns the item's name, unique within its collection.
    fn name(&self) -> &str;
}

/// Read-only, insertion-ordered items, each reachable by position or name.
///
/// Built once in `O(n)`; index and name lookups are `O(1)`.
///
/// # Example
///
/// ```
/// use ml_io::{Named, NamedCollection};
///
/// struct Layer(&'static str);
///
/// impl Named for Layer {
///     fn name(&self) -> &str {
///         self.0
///     }
/// }
///
/// let layers = NamedCollection::new(vec![Layer("image"), Layer("mask")]).unwrap();
///
/// assert_eq!(layers.len(), 2);
/// assert_eq!(layers.index_for("mask"), Some(1));
/// assert_eq!(layers.get(0).unwrap().name(), "image");
/// assert!(layers.get_by_name("depth").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct NamedCollection<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Named> NamedCollection<T> {
    /// Builds a collection, preserving the order of `items`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::DuplicateName`] if two items share a name.
    pub fn new(items: Vec<T>) -> Result<Self> {
        let mut index = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if index.insert(item.name().to_string(), i).is_some() {
                return Err(IoError::duplicate_name(item.name()));
            }
        }
        debug!(len = items.len(), "named collection built");
        Ok(Self { items, index })
    }

    /// Returns the item at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::IndexOutOfRange`] if `index >= len()`.
    pub fn get(&self, index: usize) -> Result<&T> {
        self.items
            .get(index)
            .ok_or_else(|| IoError::index_out_of_range(index, self.items.len()))
    }

    /// Returns the item named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::KeyNotFound`] if no item has that name.
    pub fn get_by_name(&self, name: &str) -> Result<&T> {
        self.index_for(name)
            .and_then(|i| self.items.get(i))
            .ok_or_else(|| IoError::key_not_found(name))
    }

    /// Returns the position of the item named `name`.
    #[must_use]
    pub fn index_for(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Returns `true` if an item is named `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns every item in construction order.
    #[must_use]
    pub fn all(&self) -> &[T] {
        &self.items
    }

    /// Returns the set of names.
    #[must_use]
    pub fn keys(&self) -> HashSet<&str> {
        self.index.keys().map(String::as_str).collect()
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the collection holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over items in construction order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> Default for NamedCollection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<'a, T: Named> IntoIterator for &'a NamedCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
