//! Call expressions and the `range` / `loop.cycle` built-ins.

use crate::binder::{parse_call_params, ArgumentInfo, CallParams};
use crate::callable::{Callable, CallableBody, CallableKind};
use crate::context::RenderContext;
use crate::expression::ExpressionPtr;
use crate::operations::subscript;
use crate::pool::ValuePool;
use crate::stream::OutStream;
use crate::value::{BuiltinFn, Value, ValueData, ValuesMap};
use std::rc::Rc;
use stencil_types::TargetString;

/// Member looked up on non-callable callees before giving up.
const CALL_OPERATOR: &str = "operator()";

/// `callee(args...)`
#[derive(Debug)]
pub struct CallExpression {
    value_ref: ExpressionPtr,
    params: CallParams,
}

impl CallExpression {
    pub fn new(value_ref: ExpressionPtr, params: CallParams) -> Self {
        Self { value_ref, params }
    }

    pub fn params(&self) -> &CallParams {
        &self.params
    }

    /// The callee expression is evaluated exactly once per call.
    pub fn evaluate(&self, ctx: &mut RenderContext) -> Value {
        let callee = self.value_ref.evaluate(ctx);
        self.dispatch(callee, ctx)
    }

    /// Statement callables write straight into `stream`; everything else
    /// is evaluated and written.
    pub fn render(&self, stream: &mut dyn OutStream, ctx: &mut RenderContext) {
        let callee = self.value_ref.evaluate(ctx);
        let Some(callable) = resolve_callable(&callee, ctx) else {
            let value = self.dispatch(callee, ctx);
            stream.write_value(&value);
            return;
        };

        match callable.body() {
            CallableBody::Expression(f) => {
                let value = f(&self.params, ctx);
                stream.write_value(&value);
            }
            CallableBody::Statement(f) => f(&self.params, stream, ctx),
        }
    }

    fn dispatch(&self, callee: Value, ctx: &mut RenderContext) -> Value {
        match callee.as_builtin() {
            Some(BuiltinFn::Range) => self.call_global_range(ctx),
            Some(BuiltinFn::LoopCycle) => self.call_loop_cycle(ctx),
            None => self.call_arbitrary_fn(&callee, ctx),
        }
    }

    fn call_arbitrary_fn(&self, callee: &Value, ctx: &mut RenderContext) -> Value {
        let Some(callable) = resolve_callable(callee, ctx) else {
            tracing::trace!(kind = callee.kind_name(), "call on non-callable value");
            return Value::empty();
        };

        if !matches!(
            callable.kind(),
            CallableKind::GlobalFunc | CallableKind::UserCallable
        ) {
            tracing::trace!(kind = ?callable.kind(), "callable kind not invocable here");
            return Value::empty();
        }

        match callable.body() {
            CallableBody::Expression(f) => f(&self.params, ctx),
            CallableBody::Statement(f) => {
                let renderer = ctx.renderer();
                let mut buffer = TargetString::empty(renderer.target_width());
                {
                    let mut stream = renderer.get_stream_on_string(&mut buffer);
                    f(&self.params, stream.as_mut(), ctx);
                }
                ctx.pool().create_string(buffer)
            }
        }
    }

    /// `range([start,] stop[, step])` as a lazy list.
    fn call_global_range(&self, ctx: &mut RenderContext) -> Value {
        let formals = [
            ArgumentInfo::new("start"),
            ArgumentInfo::mandatory("stop"),
            ArgumentInfo::new("step"),
        ];
        let args = parse_call_params(&formals, &self.params);
        if !args.is_succeeded() {
            tracing::trace!(missing = ?args.missing_mandatory(), "range: bad arguments");
            return Value::empty();
        }

        let start = args.evaluate("start", ctx).to_int(0);
        let stop = args.evaluate("stop", ctx).to_int(0);
        let step = match args.get("step") {
            Some(expr) => expr.evaluate(ctx).to_int(0),
            None => 1,
        };
        if step == 0 {
            tracing::trace!("range: zero step");
            return Value::empty();
        }

        // The span of two i64 bounds needs 65 bits.
        let count = (i128::from(stop) - i128::from(start)) / i128::from(step);
        let count = if count <= 0 {
            0
        } else {
            usize::try_from(count).unwrap_or(usize::MAX)
        };
        ctx.pool().create_index_list(count, move |idx| {
            let at = i128::from(start) + i128::from(step) * idx as i128;
            Value::from(at as i64)
        })
    }

    /// `loop.cycle(a, b, ...)`: picks the positional argument at
    /// `loop.index0 mod N`. Only the selected argument is evaluated.
    fn call_loop_cycle(&self, ctx: &mut RenderContext) -> Value {
        let Some(loop_value) = ctx.find_value("loop") else {
            tracing::trace!("loop.cycle outside of a loop");
            return Value::empty();
        };
        let Some(loop_map) = loop_value.as_map() else {
            return Value::empty();
        };

        let choices = &self.params.pos_params;
        let Ok(count) = i64::try_from(choices.len()) else {
            return Value::empty();
        };
        if count == 0 {
            return Value::empty();
        }

        let base_idx = loop_map
            .get_value_by_name("index0")
            .unwrap_or_default()
            .to_int(0);
        let idx = base_idx.rem_euclid(count) as usize;
        choices[idx].evaluate(ctx)
    }
}

/// The callee itself, or its `operator()` member.
fn resolve_callable(callee: &Value, ctx: &RenderContext) -> Option<Rc<Callable>> {
    if let Some(callable) = callee.as_callable() {
        return Some(Rc::clone(callable));
    }
    subscript(callee, &Value::from(CALL_OPERATOR), ctx)
        .as_callable()
        .cloned()
}

/// Install the `range` built-in into a global scope.
pub fn setup_globals(globals: &mut ValuesMap, pool: &ValuePool) {
    globals.insert(
        "range".to_string(),
        pool.create(ValueData::Builtin(BuiltinFn::Range)),
    );
}

/// The value the loop machinery stores as `loop.cycle`.
pub fn loop_cycle_value() -> Value {
    Value::builtin(BuiltinFn::LoopCycle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;

    fn constant(v: impl Into<Value>) -> ExpressionPtr {
        Rc::new(Expression::Constant(v.into()))
    }

    fn call(callee: Value, params: CallParams) -> CallExpression {
        CallExpression::new(constant(callee), params)
    }

    fn ints(value: &Value) -> Vec<i64> {
        value
            .as_list()
            .map(|list| list.iter().filter_map(|v| v.as_int()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_range_single_argument() {
        let mut ctx = RenderContext::default();
        let params = CallParams::positional(vec![constant(4)]);
        let result = call(Value::builtin(BuiltinFn::Range), params).evaluate(&mut ctx);
        assert_eq!(ints(&result), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_range_negative_step() {
        let mut ctx = RenderContext::default();
        let params = CallParams::positional(vec![constant(5), constant(0), constant(-2)]);
        let result = call(Value::builtin(BuiltinFn::Range), params).evaluate(&mut ctx);
        assert_eq!(ints(&result), vec![5, 3]);
    }

    #[test]
    fn test_range_span_wider_than_i64() {
        let mut ctx = RenderContext::default();
        let start = -5_000_000_000_000_000_000_i64;
        let stop = 5_000_000_000_000_000_000_i64;
        let params = CallParams::positional(vec![constant(start), constant(stop)]);
        let result = call(Value::builtin(BuiltinFn::Range), params).evaluate(&mut ctx);
        let list = result.as_list().unwrap();
        assert_eq!(list.len() as u128, 10_000_000_000_000_000_000_u128);
        assert_eq!(list.get(0).and_then(|v| v.as_int()), Some(start));
        assert_eq!(list.get(list.len() - 1).and_then(|v| v.as_int()), Some(stop - 1));
    }

    #[test]
    fn test_range_without_stop_is_empty() {
        let mut ctx = RenderContext::default();
        let params = CallParams::new().with_keyword("start", constant(1));
        let result = call(Value::builtin(BuiltinFn::Range), params).evaluate(&mut ctx);
        assert!(result.is_empty());
    }

    #[test]
    fn test_special_func_is_not_invoked() {
        let mut ctx = RenderContext::default();
        let callee = Value::from(Callable::expression(CallableKind::SpecialFunc, |_, _| {
            Value::from(1)
        }));
        let result = call(callee, CallParams::new()).evaluate(&mut ctx);
        assert!(result.is_empty());
    }

    #[test]
    fn test_setup_globals_installs_range() {
        let pool = ValuePool::new();
        let mut globals = ValuesMap::new();
        setup_globals(&mut globals, &pool);
        assert_eq!(
            globals.get("range").and_then(Value::as_builtin),
            Some(BuiltinFn::Range)
        );
    }
}
