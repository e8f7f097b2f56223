//! Value-kind dispatch for operators and indexing.

use crate::context::RenderContext;
use crate::pool::ValuePool;
use crate::value::{Value, ValueData};
use std::cmp::Ordering;
use stencil_types::{BinaryOperation, TargetString, UnaryOperation};

/// Operands after numeric promotion.
enum Numbers {
    Ints(i64, i64),
    Doubles(f64, f64),
}

fn as_integer(value: &Value) -> Option<i64> {
    match value.data() {
        ValueData::Int(i) => Some(*i),
        ValueData::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn numbers(left: &Value, right: &Value) -> Option<Numbers> {
    if let (Some(a), Some(b)) = (as_integer(left), as_integer(right)) {
        return Some(Numbers::Ints(a, b));
    }
    Some(Numbers::Doubles(left.to_double()?, right.to_double()?))
}

/// Structural equality with int/double promotion.
pub fn equals(left: &Value, right: &Value) -> bool {
    match (left.data(), right.data()) {
        (ValueData::Empty, ValueData::Empty) => true,
        (ValueData::String(a), ValueData::String(b)) => {
            if a.width() == b.width() {
                a == b
            } else {
                a.to_chars() == b.to_chars()
            }
        }
        (ValueData::List(a), ValueData::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| equals(&x, &y))
        }
        (ValueData::Map(a), ValueData::Map(b)) => {
            let keys = a.keys();
            keys == b.keys()
                && keys.iter().all(|key| {
                    match (a.get_value_by_name(key), b.get_value_by_name(key)) {
                        (Some(x), Some(y)) => equals(&x, &y),
                        _ => false,
                    }
                })
        }
        (ValueData::Callable(a), ValueData::Callable(b)) => std::rc::Rc::ptr_eq(a, b),
        (ValueData::Builtin(a), ValueData::Builtin(b)) => a == b,
        _ => match numbers(left, right) {
            Some(Numbers::Ints(a, b)) => a == b,
            Some(Numbers::Doubles(a, b)) => a == b,
            None => false,
        },
    }
}

/// Ordering for comparison operators; `None` when the kinds don't compare.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (left.as_target_string(), right.as_target_string()) {
        return Some(a.to_chars().cmp(&b.to_chars()));
    }
    match numbers(left, right)? {
        Numbers::Ints(a, b) => Some(a.cmp(&b)),
        Numbers::Doubles(a, b) => a.partial_cmp(&b),
    }
}

/// Apply a unary operator.
pub fn unary_operation(op: UnaryOperation, value: &Value) -> Value {
    match op {
        UnaryOperation::LogicalNot => Value::from(!value.to_bool()),
        UnaryOperation::UnaryMinus => match value.data() {
            ValueData::Int(i) => Value::from(i.wrapping_neg()),
            ValueData::Double(d) => Value::from(-d),
            ValueData::Bool(b) => Value::from(-i64::from(*b)),
            _ => Value::empty(),
        },
        UnaryOperation::UnaryPlus => match value.data() {
            ValueData::Int(_) | ValueData::Double(_) => Value::new(value.data().clone()),
            ValueData::Bool(b) => Value::from(i64::from(*b)),
            _ => Value::empty(),
        },
    }
}

/// Apply a comparison or arithmetic operator.
///
/// Logical, membership and concatenation operators are handled by the
/// binary expression node itself and yield Empty here.
pub fn binary_math(op: BinaryOperation, left: &Value, right: &Value, pool: &ValuePool) -> Value {
    match op {
        BinaryOperation::LogicalEq => Value::from(equals(left, right)),
        BinaryOperation::LogicalNe => Value::from(!equals(left, right)),
        BinaryOperation::LogicalGt => Value::from(compare(left, right) == Some(Ordering::Greater)),
        BinaryOperation::LogicalLt => Value::from(compare(left, right) == Some(Ordering::Less)),
        BinaryOperation::LogicalGe => Value::from(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOperation::LogicalLe => Value::from(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOperation::Plus => plus(left, right, pool),
        BinaryOperation::Minus => match numbers(left, right) {
            Some(Numbers::Ints(a, b)) => Value::from(a.wrapping_sub(b)),
            Some(Numbers::Doubles(a, b)) => Value::from(a - b),
            None => Value::empty(),
        },
        BinaryOperation::Mul => mul(left, right, pool),
        BinaryOperation::Div => match (left.to_double(), right.to_double()) {
            (Some(_), Some(b)) if b == 0.0 => Value::empty(),
            (Some(a), Some(b)) => Value::from(a / b),
            _ => Value::empty(),
        },
        BinaryOperation::DivReminder => match numbers(left, right) {
            Some(Numbers::Ints(_, 0)) => Value::empty(),
            Some(Numbers::Ints(a, b)) => {
                let r = a.wrapping_rem(b);
                Value::from(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
            }
            Some(Numbers::Doubles(_, b)) if b == 0.0 => Value::empty(),
            Some(Numbers::Doubles(a, b)) => {
                let r = a % b;
                Value::from(if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r })
            }
            None => Value::empty(),
        },
        BinaryOperation::DivInteger => match numbers(left, right) {
            Some(Numbers::Ints(_, 0)) => Value::empty(),
            Some(Numbers::Ints(a, b)) => {
                let q = a.wrapping_div(b);
                let floored = a.wrapping_rem(b) != 0 && (a < 0) != (b < 0);
                Value::from(if floored { q - 1 } else { q })
            }
            Some(Numbers::Doubles(_, b)) if b == 0.0 => Value::empty(),
            Some(Numbers::Doubles(a, b)) => Value::from((a / b).floor()),
            None => Value::empty(),
        },
        BinaryOperation::Pow => match numbers(left, right) {
            Some(Numbers::Ints(a, b)) => u32::try_from(b)
                .ok()
                .and_then(|exp| a.checked_pow(exp))
                .map(Value::from)
                .unwrap_or_else(|| Value::from((a as f64).powf(b as f64))),
            Some(Numbers::Doubles(a, b)) => Value::from(a.powf(b)),
            None => Value::empty(),
        },
        BinaryOperation::LogicalAnd
        | BinaryOperation::LogicalOr
        | BinaryOperation::In
        | BinaryOperation::StringConcat => Value::empty(),
    }
}

fn plus(left: &Value, right: &Value, pool: &ValuePool) -> Value {
    match (left.data(), right.data()) {
        (ValueData::String(a), ValueData::String(b)) => match (**a).clone().concat(b) {
            Ok(s) => pool.create_string(s),
            Err(err) => {
                tracing::warn!(%err, "string addition yields empty");
                Value::empty()
            }
        },
        (ValueData::List(a), ValueData::List(b)) => {
            pool.create_list(a.iter().chain(b.iter()).collect())
        }
        _ => match numbers(left, right) {
            Some(Numbers::Ints(a, b)) => Value::from(a.wrapping_add(b)),
            Some(Numbers::Doubles(a, b)) => Value::from(a + b),
            None => Value::empty(),
        },
    }
}

fn mul(left: &Value, right: &Value, pool: &ValuePool) -> Value {
    let repeat = |s: &TargetString, times: i64| {
        let count = usize::try_from(times).unwrap_or(0);
        pool.create_string(s.map_chars(|chars| chars.repeat(count)))
    };
    match (left.data(), right.data()) {
        (ValueData::String(s), ValueData::Int(n)) | (ValueData::Int(n), ValueData::String(s)) => {
            repeat(&**s, *n)
        }
        _ => match numbers(left, right) {
            Some(Numbers::Ints(a, b)) => Value::from(a.wrapping_mul(b)),
            Some(Numbers::Doubles(a, b)) => Value::from(a * b),
            None => Value::empty(),
        },
    }
}

fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

/// Generic indexing and member access.
///
/// Lists index by integer (negative counts from the end), maps by string
/// key, strings by integer (yielding a one-character string). Anything
/// else yields Empty.
pub fn subscript(base: &Value, key: &Value, ctx: &RenderContext) -> Value {
    match base.data() {
        ValueData::List(list) => key
            .as_int()
            .and_then(|idx| resolve_index(list.len(), idx))
            .and_then(|idx| list.get(idx))
            .unwrap_or_default(),
        ValueData::Map(map) => key
            .as_target_string()
            .and_then(|name| map.get_value_by_name(&name.to_string()))
            .unwrap_or_default(),
        ValueData::String(s) => {
            let chars = s.to_chars();
            match key.as_int().and_then(|idx| resolve_index(chars.len(), idx)) {
                Some(idx) => ctx
                    .pool()
                    .create_string(TargetString::from_chars(vec![chars[idx]], s.width())),
                None => Value::empty(),
            }
        }
        _ => Value::empty(),
    }
}
