//! Render-pass value pool.
//!
//! The pool owns every heap-backed payload (strings, lists, maps) that an
//! evaluation step hands out beyond its own lifetime. It is append-only:
//! nothing is released until the pool itself is dropped at the end of the
//! render pass. Handles are cheap to clone and all refer to the same
//! storage; a pool must not be shared across concurrent render passes.

use crate::adapters::{ListAdapter, MapAdapter};
use crate::value::{Value, ValueData, ValuesList, ValuesMap};
use std::cell::RefCell;
use std::rc::Rc;
use stencil_types::TargetString;

#[derive(Debug)]
enum PoolSlot {
    String(Rc<TargetString>),
    List(ListAdapter),
    Map(MapAdapter),
}

/// Append-only arena for one render pass.
#[derive(Debug, Clone, Default)]
pub struct ValuePool {
    slots: Rc<RefCell<Vec<PoolSlot>>>,
}

impl ValuePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `data` in a value, retaining any heap payload in the pool.
    pub fn create(&self, data: ValueData) -> Value {
        let slot = match &data {
            ValueData::String(s) => Some(PoolSlot::String(Rc::clone(s))),
            ValueData::List(list) => Some(PoolSlot::List(list.clone())),
            ValueData::Map(map) => Some(PoolSlot::Map(map.clone())),
            _ => None,
        };
        if let Some(slot) = slot {
            self.slots.borrow_mut().push(slot);
        }
        Value::new(data)
    }

    pub fn create_string(&self, s: impl Into<TargetString>) -> Value {
        self.create(ValueData::String(Rc::new(s.into())))
    }

    pub fn create_list(&self, values: ValuesList) -> Value {
        self.create(ValueData::List(ListAdapter::from_values(values)))
    }

    /// A lazily generated list; see [`ListAdapter::from_index_fn`].
    pub fn create_index_list(&self, len: usize, at: impl Fn(usize) -> Value + 'static) -> Value {
        self.create(ValueData::List(ListAdapter::from_index_fn(len, at)))
    }

    pub fn create_map(&self, values: ValuesMap) -> Value {
        self.create(ValueData::Map(MapAdapter::from_values(values)))
    }

    /// Number of payloads owned by the pool.
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
