//! Call argument binding.
//!
//! Matches the positional and keyword arguments of a call against a
//! declared parameter list, `*args`/`**kwargs` style:
//!
//! 1. Formals named by a keyword argument bind to it.
//! 2. Positional arguments fill the still-open formals as one contiguous
//!    window over the open-formal chain. The window is anchored at the
//!    first open mandatory formal, grows backward toward the first open
//!    formal while positionals remain, then forward.
//! 3. Open formals take their defaults; an open mandatory formal marks
//!    the binding as failed.
//! 4. Unmatched keywords and unconsumed positionals become overflow.

use crate::context::RenderContext;
use crate::expression::{Expression, ExpressionPtr};
use crate::value::Value;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Catch-all marker for extra positional arguments.
pub const VARARGS: &str = "*args";

/// Catch-all marker for extra keyword arguments.
pub const KWARGS: &str = "**kwargs";

/// Actual arguments of a call.
#[derive(Debug, Clone, Default)]
pub struct CallParams {
    pub pos_params: Vec<ExpressionPtr>,
    pub kw_params: BTreeMap<String, ExpressionPtr>,
}

impl CallParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(pos_params: Vec<ExpressionPtr>) -> Self {
        Self {
            pos_params,
            kw_params: BTreeMap::new(),
        }
    }

    pub fn with_positional(mut self, expr: ExpressionPtr) -> Self {
        self.pos_params.push(expr);
        self
    }

    pub fn with_keyword(mut self, name: impl Into<String>, expr: ExpressionPtr) -> Self {
        self.kw_params.insert(name.into(), expr);
        self
    }
}

/// A declared formal parameter.
#[derive(Debug, Clone)]
pub struct ArgumentInfo {
    pub name: String,
    pub mandatory: bool,
    pub default_value: Option<Value>,
}

impl ArgumentInfo {
    /// Optional parameter without a default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mandatory: false,
            default_value: None,
        }
    }

    pub fn mandatory(name: impl Into<String>) -> Self {
        Self {
            mandatory: true,
            ..Self::new(name)
        }
    }

    pub fn with_default(name: impl Into<String>, default_value: impl Into<Value>) -> Self {
        Self {
            default_value: Some(default_value.into()),
            ..Self::new(name)
        }
    }

    /// `*args` and `**kwargs` are markers, never bound themselves.
    pub fn is_catch_all(&self) -> bool {
        self.name == VARARGS || self.name == KWARGS
    }
}

/// Result of binding a call against its formals.
#[derive(Debug, Clone, Default)]
pub struct ParsedArguments {
    /// Formal name → bound expression (explicit argument or default).
    pub args: BTreeMap<String, ExpressionPtr>,
    /// Positional arguments no formal consumed, in call order.
    pub extra_pos_args: Vec<ExpressionPtr>,
    /// Keyword arguments matching no formal.
    pub extra_kw_args: BTreeMap<String, ExpressionPtr>,
    missing_mandatory: Vec<String>,
}

impl ParsedArguments {
    /// False when at least one mandatory formal stayed unbound.
    pub fn is_succeeded(&self) -> bool {
        self.missing_mandatory.is_empty()
    }

    /// Every mandatory formal left unbound, in declaration order.
    pub fn missing_mandatory(&self) -> &[String] {
        &self.missing_mandatory
    }

    pub fn get(&self, name: &str) -> Option<&ExpressionPtr> {
        self.args.get(name)
    }

    /// Evaluate the expression bound to `name`, or Empty if unbound.
    pub fn evaluate(&self, name: &str, ctx: &mut RenderContext) -> Value {
        match self.args.get(name) {
            Some(expr) => expr.evaluate(ctx),
            None => Value::empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    NotFound,
    NotFoundMandatory,
    Keyword,
    Positional,
    Ignored,
}

/// Per-formal bookkeeping. `prev`/`next` link the formals still open
/// after keyword matching.
struct Slot<'a> {
    state: SlotState,
    prev: Option<usize>,
    next: Option<usize>,
    info: &'a ArgumentInfo,
}

/// Bind `params` against `formals`.
///
/// Never fails outright: check [`ParsedArguments::is_succeeded`].
pub fn parse_call_params(formals: &[ArgumentInfo], params: &CallParams) -> ParsedArguments {
    let mut result = ParsedArguments::default();
    let mut slots: Vec<Slot<'_>> = Vec::with_capacity(formals.len());
    let mut first_mandatory = None;
    let mut last_open: Option<usize> = None;

    // Keyword matches first
    for (idx, info) in formals.iter().enumerate() {
        let mut slot = Slot {
            state: SlotState::NotFound,
            prev: None,
            next: None,
            info,
        };

        if info.is_catch_all() {
            slot.state = SlotState::Ignored;
        } else if let Some(expr) = params.kw_params.get(&info.name) {
            result.args.insert(info.name.clone(), Rc::clone(expr));
            slot.state = SlotState::Keyword;
        } else {
            if info.mandatory {
                slot.state = SlotState::NotFoundMandatory;
                first_mandatory.get_or_insert(idx);
            }
            if let Some(prev) = last_open {
                slots[prev].next = Some(idx);
            }
            slot.prev = last_open;
            last_open = Some(idx);
        }

        slots.push(slot);
    }

    // Positional window
    let (head, consumed) = positional_window(&slots, first_mandatory, params.pos_params.len());

    let mut cursor = Some(head);
    for expr in params.pos_params.iter().take(consumed) {
        let Some(idx) = cursor else { break };
        let slot = &mut slots[idx];
        result.args.insert(slot.info.name.clone(), Rc::clone(expr));
        slot.state = SlotState::Positional;
        cursor = slot.next;
    }

    // Defaults and mandatory check; keep scanning after the first miss
    for slot in &slots {
        match slot.state {
            SlotState::NotFound => {
                if let Some(default_value) = slot.info.default_value.as_ref().filter(|v| !v.is_empty()) {
                    result.args.insert(
                        slot.info.name.clone(),
                        Rc::new(Expression::Constant(default_value.clone())),
                    );
                }
            }
            SlotState::NotFoundMandatory => {
                result.missing_mandatory.push(slot.info.name.clone());
            }
            SlotState::Keyword | SlotState::Positional | SlotState::Ignored => {}
        }
    }

    // Overflow
    for (name, expr) in &params.kw_params {
        if !result.args.contains_key(name) {
            result.extra_kw_args.insert(name.clone(), Rc::clone(expr));
        }
    }
    result
        .extra_pos_args
        .extend(params.pos_params.iter().skip(consumed).cloned());

    result
}

/// Returns the first formal receiving a positional argument and the
/// number of positional arguments consumed.
fn positional_window(
    slots: &[Slot<'_>],
    first_mandatory: Option<usize>,
    available: usize,
) -> (usize, usize) {
    let mut head = first_mandatory.unwrap_or(0);
    while head < slots.len() && slots[head].state == SlotState::Keyword {
        head += 1;
    }

    if available == 0 || head >= slots.len() || slots[head].state == SlotState::Ignored {
        return (head, 0);
    }

    let mut tail = head;
    let mut consumed = 1;
    while consumed < available {
        if let Some(prev) = slots[head].prev {
            head = prev;
        } else if let Some(next) = slots[tail].next {
            tail = next;
        } else {
            break;
        }
        consumed += 1;
    }
    (head, consumed)
}
