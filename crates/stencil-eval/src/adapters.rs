//! Lazy list and map views.
//!
//! Containers are exposed through adapters rather than concrete
//! collections, so a list can be backed by owned storage or computed on
//! demand from an index function (see `range`).

use crate::value::{Value, ValuesList, ValuesMap};
use std::fmt;
use std::rc::Rc;

/// Source of list elements.
pub trait ListSource {
    fn len(&self) -> usize;

    fn get(&self, index: usize) -> Option<Value>;

    /// Whether elements handed out borrow from storage this source owns.
    fn owns_storage(&self) -> bool {
        false
    }
}

/// Source of map entries.
pub trait MapSource {
    fn len(&self) -> usize;

    fn get_value_by_name(&self, name: &str) -> Option<Value>;

    /// Keys in iteration order.
    fn keys(&self) -> Vec<String>;

    fn owns_storage(&self) -> bool {
        false
    }
}

struct OwnedList(ValuesList);

impl ListSource for OwnedList {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn get(&self, index: usize) -> Option<Value> {
        self.0.get(index).cloned()
    }

    fn owns_storage(&self) -> bool {
        true
    }
}

struct IndexFnList<F> {
    len: usize,
    at: F,
}

impl<F: Fn(usize) -> Value> ListSource for IndexFnList<F> {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> Option<Value> {
        (index < self.len).then(|| (self.at)(index))
    }
}

struct OwnedMap(ValuesMap);

impl MapSource for OwnedMap {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn get_value_by_name(&self, name: &str) -> Option<Value> {
        self.0.get(name).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    fn owns_storage(&self) -> bool {
        true
    }
}

/// Shared handle to a list source.
#[derive(Clone)]
pub struct ListAdapter {
    source: Rc<dyn ListSource>,
}

impl ListAdapter {
    pub fn new(source: Rc<dyn ListSource>) -> Self {
        Self { source }
    }

    /// A list owning `values`.
    pub fn from_values(values: ValuesList) -> Self {
        Self::new(Rc::new(OwnedList(values)))
    }

    /// A list of `len` elements where element `i` is `at(i)`, computed on
    /// every access. Memory use does not depend on `len`.
    pub fn from_index_fn(len: usize, at: impl Fn(usize) -> Value + 'static) -> Self {
        Self::new(Rc::new(IndexFnList { len, at }))
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.source.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).filter_map(move |idx| self.get(idx))
    }

    pub fn should_extend_lifetime(&self) -> bool {
        self.source.owns_storage()
    }
}

impl fmt::Debug for ListAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListAdapter")
            .field("len", &self.len())
            .field("owns_storage", &self.source.owns_storage())
            .finish()
    }
}

/// Shared handle to a map source.
#[derive(Clone)]
pub struct MapAdapter {
    source: Rc<dyn MapSource>,
}

impl MapAdapter {
    pub fn new(source: Rc<dyn MapSource>) -> Self {
        Self { source }
    }

    /// A map owning `values`.
    pub fn from_values(values: ValuesMap) -> Self {
        Self::new(Rc::new(OwnedMap(values)))
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_value_by_name(&self, name: &str) -> Option<Value> {
        self.source.get_value_by_name(name)
    }

    pub fn has_key(&self, name: &str) -> bool {
        self.get_value_by_name(name).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        self.source.keys()
    }

    pub fn should_extend_lifetime(&self) -> bool {
        self.source.owns_storage()
    }
}

impl fmt::Debug for MapAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapAdapter")
            .field("keys", &self.keys())
            .field("owns_storage", &self.source.owns_storage())
            .finish()
    }
}
