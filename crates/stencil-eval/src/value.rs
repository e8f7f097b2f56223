//! Runtime value representation.
//!
//! A [`Value`] is a closed variant over the kinds a template expression can
//! produce, plus two ownership markers:
//!
//! - *temporary*: the value is a scratch result nobody else refers to, so
//!   its storage may be reused as an output buffer.
//! - *parent*: a shared back-reference to the value this one was derived
//!   from (e.g. the list an element was indexed out of). The parent is kept
//!   alive at least as long as any value pointing at it.

use crate::adapters::{ListAdapter, MapAdapter};
use crate::callable::Callable;
use crate::operations;
use stencil_types::{CharWidth, TargetString};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Ordered list of values.
pub type ValuesList = Vec<Value>;

/// Ordered-key mapping of values.
pub type ValuesMap = BTreeMap<String, Value>;

/// Identity of a built-in pseudo-function.
///
/// Global lookups of `range` (and `loop.cycle` inside a loop) yield one of
/// these instead of a [`Callable`]; the call expression matches on it
/// before falling back to generic invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFn {
    Range,
    LoopCycle,
}

/// Payload of a [`Value`].
#[derive(Debug, Clone, Default)]
pub enum ValueData {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(Rc<TargetString>),
    List(ListAdapter),
    Map(MapAdapter),
    Callable(Rc<Callable>),
    Builtin(BuiltinFn),
}

/// A template runtime value.
#[derive(Debug, Clone, Default)]
pub struct Value {
    data: ValueData,
    temporary: bool,
    parent: Option<Rc<Value>>,
}

impl Value {
    pub fn new(data: ValueData) -> Self {
        Self {
            data,
            temporary: false,
            parent: None,
        }
    }

    /// The empty value.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin(function: BuiltinFn) -> Self {
        Self::new(ValueData::Builtin(function))
    }

    pub fn data(&self) -> &ValueData {
        &self.data
    }

    pub fn into_data(self) -> ValueData {
        self.data
    }

    /// Replace the payload. The old parent link is dropped because the new
    /// payload no longer aliases it.
    pub fn set_data(&mut self, data: ValueData) {
        self.data = data;
        self.parent = None;
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.data, ValueData::Empty)
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    pub fn set_temporary(&mut self, temporary: bool) {
        self.temporary = temporary;
    }

    /// Builder form of [`Value::set_temporary`]`(true)`.
    pub fn into_temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    /// Whether values derived from this one must keep it alive.
    ///
    /// True when this value already hangs off a parent, or when it is a
    /// container adapter owning the storage its elements come from.
    pub fn extends_lifetime(&self) -> bool {
        if self.parent.is_some() {
            return true;
        }
        match &self.data {
            ValueData::List(list) => list.should_extend_lifetime(),
            ValueData::Map(map) => map.should_extend_lifetime(),
            _ => false,
        }
    }

    /// Keep `parent` alive for as long as this value lives.
    pub fn set_parent(&mut self, parent: Value) {
        self.parent = Some(Rc::new(parent));
    }

    pub fn parent(&self) -> Option<&Value> {
        self.parent.as_deref()
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn as_bool(&self) -> Option<bool> {
        match self.data {
            ValueData::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.data {
            ValueData::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self.data {
            ValueData::Double(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_target_string(&self) -> Option<&TargetString> {
        match &self.data {
            ValueData::String(s) => Some(&**s),
            _ => None,
        }
    }

    /// Mutable access to a string payload, cloning it first if it is
    /// shared with another value.
    pub fn string_mut(&mut self) -> Option<&mut TargetString> {
        match &mut self.data {
            ValueData::String(s) => Some(Rc::make_mut(s)),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListAdapter> {
        match &self.data {
            ValueData::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapAdapter> {
        match &self.data {
            ValueData::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Rc<Callable>> {
        match &self.data {
            ValueData::Callable(callable) => Some(callable),
            _ => None,
        }
    }

    pub fn as_builtin(&self) -> Option<BuiltinFn> {
        match self.data {
            ValueData::Builtin(function) => Some(function),
            _ => None,
        }
    }

    /// Human-readable kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.data {
            ValueData::Empty => "empty",
            ValueData::Bool(_) => "bool",
            ValueData::Int(_) => "int",
            ValueData::Double(_) => "double",
            ValueData::String(_) => "string",
            ValueData::List(_) => "list",
            ValueData::Map(_) => "map",
            ValueData::Callable(_) => "callable",
            ValueData::Builtin(_) => "builtin",
        }
    }

    // ── Conversions ──────────────────────────────────────────────────────

    /// Template truthiness.
    pub fn to_bool(&self) -> bool {
        match &self.data {
            ValueData::Empty => false,
            ValueData::Bool(b) => *b,
            ValueData::Int(i) => *i != 0,
            ValueData::Double(d) => *d != 0.0,
            ValueData::String(s) => !s.is_empty(),
            ValueData::List(list) => !list.is_empty(),
            ValueData::Map(map) => !map.is_empty(),
            ValueData::Callable(_) | ValueData::Builtin(_) => true,
        }
    }

    /// Integer view of the value, or `default` when it has none.
    pub fn to_int(&self, default: i64) -> i64 {
        match &self.data {
            ValueData::Int(i) => *i,
            ValueData::Double(d) => *d as i64,
            ValueData::Bool(b) => i64::from(*b),
            ValueData::String(s) => {
                let text = s.to_string();
                let text = text.trim();
                text.parse::<i64>()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().map(|d| d as i64))
                    .unwrap_or(default)
            }
            _ => default,
        }
    }

    /// Floating-point view of the value, if it is numeric.
    pub fn to_double(&self) -> Option<f64> {
        match self.data {
            ValueData::Int(i) => Some(i as f64),
            ValueData::Double(d) => Some(d),
            ValueData::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Render the value as template text of the given width.
    pub fn to_target_string(&self, width: CharWidth) -> TargetString {
        match &self.data {
            ValueData::String(s) => (**s).clone().into_width(width),
            _ => {
                let mut text = String::new();
                self.write_text(&mut text, false);
                TargetString::from_str_with_width(&text, width)
            }
        }
    }

    fn write_text(&self, out: &mut String, quoted: bool) {
        match &self.data {
            ValueData::Empty => {
                if quoted {
                    out.push_str("none");
                }
            }
            ValueData::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            ValueData::Int(i) => out.push_str(&i.to_string()),
            ValueData::Double(d) => out.push_str(&format_double(*d)),
            ValueData::String(s) => {
                if quoted {
                    out.push('\'');
                    out.push_str(&s.to_string());
                    out.push('\'');
                } else {
                    out.push_str(&s.to_string());
                }
            }
            ValueData::List(list) => {
                out.push('[');
                for (idx, item) in list.iter().enumerate() {
                    if idx > 0 {
                        out.push_str(", ");
                    }
                    item.write_text(out, true);
                }
                out.push(']');
            }
            ValueData::Map(map) => {
                out.push('{');
                for (idx, key) in map.keys().iter().enumerate() {
                    if idx > 0 {
                        out.push_str(", ");
                    }
                    out.push('\'');
                    out.push_str(key);
                    out.push_str("': ");
                    map.get_value_by_name(key)
                        .unwrap_or_default()
                        .write_text(out, true);
                }
                out.push('}');
            }
            ValueData::Callable(_) | ValueData::Builtin(_) => {}
        }
    }
}

fn format_double(d: f64) -> String {
    if d.is_finite() && d.fract() == 0.0 && d.abs() < 1e16 {
        format!("{d:.1}")
    } else {
        format!("{d}")
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        operations::equals(self, other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_target_string(CharWidth::Narrow))
    }
}

impl From<ValueData> for Value {
    fn from(data: ValueData) -> Self {
        Self::new(data)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::new(ValueData::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::new(ValueData::Int(i))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::new(ValueData::Int(i64::from(i)))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Self::new(ValueData::Double(d))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::new(ValueData::String(Rc::new(TargetString::from(s))))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::new(ValueData::String(Rc::new(TargetString::from(s))))
    }
}

impl From<TargetString> for Value {
    fn from(s: TargetString) -> Self {
        Self::new(ValueData::String(Rc::new(s)))
    }
}

impl From<ListAdapter> for Value {
    fn from(list: ListAdapter) -> Self {
        Self::new(ValueData::List(list))
    }
}

impl From<MapAdapter> for Value {
    fn from(map: MapAdapter) -> Self {
        Self::new(ValueData::Map(map))
    }
}

impl From<Callable> for Value {
    fn from(callable: Callable) -> Self {
        Self::new(ValueData::Callable(Rc::new(callable)))
    }
}
