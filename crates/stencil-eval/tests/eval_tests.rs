//! Expression evaluation tests.
//!
//! Covers:
//! - `range` and `loop.cycle` built-ins
//! - Call argument binding
//! - Operator semantics (short-circuit, lazy `in`, concatenation)
//! - Subscript lifetime chains
//! - Statement and expression callables, `operator()` fallback
//! - Temporary flags and construction errors

use std::cell::Cell;
use std::rc::Rc;
use stencil_eval::*;
use stencil_types::{BinaryOperation, CharWidth, ErrorCode, TargetString, UnaryOperation, WideString};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn constant(v: impl Into<Value>) -> ExpressionPtr {
    Expression::Constant(v.into()).into_ptr()
}

fn var(name: &str) -> ExpressionPtr {
    Expression::ValueRef(ValueRefExpression::new(name)).into_ptr()
}

fn call(callee: ExpressionPtr, params: CallParams) -> ExpressionPtr {
    Expression::Call(CallExpression::new(callee, params)).into_ptr()
}

fn binary(op: BinaryOperation, left: ExpressionPtr, right: ExpressionPtr) -> ExpressionPtr {
    Expression::Binary(BinaryExpression::new(op, left, right).unwrap()).into_ptr()
}

fn positional(args: Vec<ExpressionPtr>) -> CallParams {
    CallParams::positional(args)
}

/// Context with `range` installed in the global scope.
fn context() -> RenderContext {
    let pool = ValuePool::new();
    let mut globals = ValuesMap::new();
    setup_globals(&mut globals, &pool);
    RenderContext::with_pool(globals, pool)
}

/// Expression callable that bumps `counter` and returns `result`.
fn counting(counter: &Rc<Cell<usize>>, result: Value) -> Value {
    let counter = Rc::clone(counter);
    Value::from(Callable::expression(CallableKind::GlobalFunc, move |_, _| {
        counter.set(counter.get() + 1);
        result.clone()
    }))
}

/// `f()` for a counting callable.
fn counted_call(counter: &Rc<Cell<usize>>, result: Value) -> ExpressionPtr {
    call(constant(counting(counter, result)), CallParams::new())
}

fn ints(value: &Value) -> Vec<i64> {
    value
        .as_list()
        .map(|list| list.iter().filter_map(|v| v.as_int()).collect())
        .unwrap_or_default()
}

fn render_to_string(expr: &Expression, ctx: &mut RenderContext) -> TargetString {
    let mut buffer = TargetString::empty(ctx.renderer().target_width());
    {
        let mut stream = StringStream::new(&mut buffer);
        expr.render(&mut stream, ctx);
    }
    buffer
}

fn loop_scope(ctx: &mut RenderContext, index0: i64) {
    let mut entries = ValuesMap::new();
    entries.insert("index0".to_string(), Value::from(index0));
    entries.insert("cycle".to_string(), loop_cycle_value());
    let loop_value = ctx.pool().create_map(entries);
    ctx.push_scope();
    ctx.define("loop", loop_value);
}

fn loop_cycle(args: Vec<ExpressionPtr>) -> ExpressionPtr {
    let method = SubscriptExpression::new(var("loop")).with_index(constant("cycle"));
    call(Expression::Subscript(method).into_ptr(), positional(args))
}

// ══════════════════════════════════════════════════════════════════════════════
// range
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_range_stop_only() {
    let mut ctx = context();
    let result = call(var("range"), positional(vec![constant(5)])).evaluate(&mut ctx);
    assert_eq!(ints(&result), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_range_length_uses_truncating_division() {
    let mut ctx = context();
    let args = vec![constant(2), constant(10), constant(3)];
    let result = call(var("range"), positional(args)).evaluate(&mut ctx);
    assert_eq!(ints(&result), vec![2, 5]);
}

#[test]
fn test_range_zero_step_is_empty() {
    let mut ctx = context();
    let args = vec![constant(0), constant(5), constant(0)];
    let result = call(var("range"), positional(args)).evaluate(&mut ctx);
    assert!(result.is_empty());
}

#[test]
fn test_range_backwards_without_step_has_no_elements() {
    let mut ctx = context();
    let args = vec![constant(10), constant(0)];
    let result = call(var("range"), positional(args)).evaluate(&mut ctx);
    let list = result.as_list().unwrap();
    assert!(list.is_empty());
}

#[test]
fn test_range_stop_by_keyword() {
    let mut ctx = context();
    let params = CallParams::new().with_keyword("stop", constant(3));
    let result = call(var("range"), params).evaluate(&mut ctx);
    assert_eq!(ints(&result), vec![0, 1, 2]);
}

#[test]
fn test_range_is_lazy() {
    let mut ctx = context();
    let before = ctx.pool().len();
    let args = vec![constant(0), constant(2_000_000_000_i64), constant(2)];
    let result = call(var("range"), positional(args)).evaluate(&mut ctx);
    let list = result.as_list().unwrap();
    assert_eq!(list.len(), 1_000_000_000);
    assert_eq!(list.get(999_999_999).and_then(|v| v.as_int()), Some(1_999_999_998));
    assert!(list.get(1_000_000_000).is_none());
    assert_eq!(ctx.pool().len(), before + 1);
}

#[test]
fn test_range_length_beyond_i64() {
    let mut ctx = context();
    let start = -5_000_000_000_000_000_000_i64;
    let stop = 5_000_000_000_000_000_000_i64;
    let args = vec![constant(start), constant(stop)];
    let result = call(var("range"), positional(args)).evaluate(&mut ctx);
    let list = result.as_list().unwrap();
    assert_eq!(list.len() as u128, 10_000_000_000_000_000_000_u128);
    assert_eq!(list.get(0).and_then(|v| v.as_int()), Some(start));
    assert_eq!(
        list.get(list.len() - 1).and_then(|v| v.as_int()),
        Some(4_999_999_999_999_999_999)
    );
}

#[test]
fn test_range_negative_step_truncates() {
    let mut ctx = context();
    let args = vec![constant(5), constant(0), constant(-2)];
    let result = call(var("range"), positional(args)).evaluate(&mut ctx);
    assert_eq!(ints(&result), vec![5, 3]);
}

#[test]
fn test_range_renders_as_list() {
    let mut ctx = context();
    let expr = call(var("range"), positional(vec![constant(3)]));
    assert_eq!(render_to_string(&expr, &mut ctx).to_string(), "[0, 1, 2]");
}

// ══════════════════════════════════════════════════════════════════════════════
// loop.cycle
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_loop_cycle_wraps_index() {
    let mut ctx = context();
    let expr = loop_cycle(vec![constant("odd"), constant("even"), constant("third")]);
    for (index0, expected) in [(0, "odd"), (1, "even"), (2, "third"), (4, "even")] {
        loop_scope(&mut ctx, index0);
        assert_eq!(expr.evaluate(&mut ctx).to_string(), expected);
        ctx.pop_scope();
    }
}

#[test]
fn test_loop_cycle_evaluates_only_selected_argument() {
    let mut ctx = context();
    let counters: Vec<Rc<Cell<usize>>> = (0..3).map(|_| Rc::new(Cell::new(0))).collect();
    let args = counters
        .iter()
        .enumerate()
        .map(|(idx, counter)| counted_call(counter, Value::from(idx as i64)))
        .collect();
    let expr = loop_cycle(args);

    loop_scope(&mut ctx, 5);
    assert_eq!(expr.evaluate(&mut ctx).as_int(), Some(2));
    let hits: Vec<usize> = counters.iter().map(|c| c.get()).collect();
    assert_eq!(hits, vec![0, 0, 1]);
}

#[test]
fn test_loop_cycle_outside_loop_is_empty() {
    let mut ctx = context();
    let counter = Rc::new(Cell::new(0));
    let expr = call(
        constant(loop_cycle_value()),
        positional(vec![counted_call(&counter, Value::from(1))]),
    );
    assert!(expr.evaluate(&mut ctx).is_empty());
    assert_eq!(counter.get(), 0);
}

#[test]
fn test_loop_cycle_without_arguments_is_empty() {
    let mut ctx = context();
    loop_scope(&mut ctx, 3);
    assert!(loop_cycle(Vec::new()).evaluate(&mut ctx).is_empty());
}

// ══════════════════════════════════════════════════════════════════════════════
// Argument binding
// ══════════════════════════════════════════════════════════════════════════════

fn bound(parsed: &ParsedArguments, name: &str) -> Value {
    let mut ctx = RenderContext::default();
    parsed.evaluate(name, &mut ctx)
}

fn binding_example() -> (Vec<ArgumentInfo>, CallParams) {
    let formals = vec![
        ArgumentInfo::with_default("param1", "Hello"),
        ArgumentInfo::mandatory("param2"),
        ArgumentInfo::with_default("param3", "World"),
    ];
    let params = positional(vec![constant(1), constant(2), constant(4), constant(6)])
        .with_keyword("param3", constant(3))
        .with_keyword("extraValue", constant(5));
    (formals, params)
}

#[test]
fn test_binding_mixed_positional_and_keyword() {
    let (formals, params) = binding_example();
    let parsed = parse_call_params(&formals, &params);

    assert!(parsed.is_succeeded());
    assert_eq!(bound(&parsed, "param1").as_int(), Some(1));
    assert_eq!(bound(&parsed, "param2").as_int(), Some(2));
    assert_eq!(bound(&parsed, "param3").as_int(), Some(3));

    let mut ctx = RenderContext::default();
    let extra: Vec<i64> = parsed
        .extra_pos_args
        .iter()
        .filter_map(|e| e.evaluate(&mut ctx).as_int())
        .collect();
    assert_eq!(extra, vec![4, 6]);
    assert_eq!(parsed.extra_kw_args.keys().collect::<Vec<_>>(), vec!["extraValue"]);
}

#[test]
fn test_binding_is_idempotent() {
    let (formals, params) = binding_example();
    let first = parse_call_params(&formals, &params);
    let second = parse_call_params(&formals, &params);

    assert_eq!(
        first.args.keys().collect::<Vec<_>>(),
        second.args.keys().collect::<Vec<_>>()
    );
    for (name, expr) in &first.args {
        let other = &second.args[name];
        match (expr.as_ref(), other.as_ref()) {
            (Expression::Constant(a), Expression::Constant(b)) => assert_eq!(a, b),
            _ => panic!("unexpected binding for {name}"),
        }
    }
    assert_eq!(first.extra_pos_args.len(), second.extra_pos_args.len());
    assert!(first
        .extra_pos_args
        .iter()
        .zip(&second.extra_pos_args)
        .all(|(a, b)| Rc::ptr_eq(a, b)));
    assert_eq!(first.missing_mandatory(), second.missing_mandatory());
}

#[test]
fn test_binding_defaults_fill_gaps() {
    let formals = vec![
        ArgumentInfo::with_default("param1", "Hello"),
        ArgumentInfo::mandatory("param2"),
        ArgumentInfo::with_default("param3", "World"),
    ];
    let parsed = parse_call_params(&formals, &positional(vec![constant(7)]));
    assert!(parsed.is_succeeded());
    assert_eq!(bound(&parsed, "param1").to_string(), "Hello");
    assert_eq!(bound(&parsed, "param2").as_int(), Some(7));
    assert_eq!(bound(&parsed, "param3").to_string(), "World");
}

#[test]
fn test_binding_reports_every_missing_mandatory() {
    let formals = vec![
        ArgumentInfo::mandatory("a"),
        ArgumentInfo::new("b"),
        ArgumentInfo::mandatory("c"),
    ];
    let parsed = parse_call_params(&formals, &CallParams::new());
    assert!(!parsed.is_succeeded());
    assert_eq!(parsed.missing_mandatory(), ["a".to_string(), "c".to_string()]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Operators
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_in_evaluates_sequence_only_inside_test() {
    let mut ctx = context();
    let counter = Rc::new(Cell::new(0));
    let seq = ctx.pool().create_list(vec![Value::from(1), Value::from(2)]);
    let expr = binary(BinaryOperation::In, constant(2), counted_call(&counter, seq));
    assert_eq!(counter.get(), 0);

    assert_eq!(expr.evaluate(&mut ctx).as_bool(), Some(true));
    assert_eq!(counter.get(), 1);
}

#[test]
fn test_and_or_short_circuit() {
    let mut ctx = context();
    let counter = Rc::new(Cell::new(0));

    let and = binary(
        BinaryOperation::LogicalAnd,
        constant(false),
        counted_call(&counter, Value::from(true)),
    );
    assert_eq!(and.evaluate(&mut ctx).as_bool(), Some(false));

    let or = binary(
        BinaryOperation::LogicalOr,
        constant(1),
        counted_call(&counter, Value::from(false)),
    );
    assert_eq!(or.evaluate(&mut ctx).as_bool(), Some(true));
    assert_eq!(counter.get(), 0);

    let and = binary(
        BinaryOperation::LogicalAnd,
        constant("x"),
        counted_call(&counter, Value::from(0)),
    );
    assert_eq!(and.evaluate(&mut ctx).as_bool(), Some(false));
    assert_eq!(counter.get(), 1);
}

#[test]
fn test_arithmetic() {
    let mut ctx = context();
    let eval = |ctx: &mut RenderContext, op, l: i64, r: i64| {
        binary(op, constant(l), constant(r)).evaluate(ctx)
    };
    assert_eq!(eval(&mut ctx, BinaryOperation::Div, 7, 2).as_double(), Some(3.5));
    assert_eq!(eval(&mut ctx, BinaryOperation::DivInteger, -7, 2).as_int(), Some(-4));
    assert_eq!(eval(&mut ctx, BinaryOperation::DivReminder, -7, 2).as_int(), Some(1));
    assert_eq!(eval(&mut ctx, BinaryOperation::Pow, 2, 10).as_int(), Some(1024));
    assert!(eval(&mut ctx, BinaryOperation::Div, 1, 0).is_empty());
    assert_eq!(eval(&mut ctx, BinaryOperation::LogicalLt, 1, 2).as_bool(), Some(true));
}

#[test]
fn test_unary_result_is_temporary() {
    let mut ctx = context();
    let expr = Expression::Unary(UnaryExpression::new(UnaryOperation::UnaryMinus, constant(3)));
    let result = expr.evaluate(&mut ctx);
    assert_eq!(result.as_int(), Some(-3));
    assert!(result.is_temporary());
}

#[test]
fn test_concat_renders_operands() {
    let mut ctx = context();
    let inner = binary(BinaryOperation::StringConcat, constant(1), constant("x"));
    let outer = binary(BinaryOperation::StringConcat, inner, constant(2.5));
    let result = outer.evaluate(&mut ctx);
    assert_eq!(result.to_string(), "1x2.5");
    assert!(result.is_temporary());
}

#[test]
fn test_concat_leaves_named_operand_untouched() {
    let mut globals = ValuesMap::new();
    globals.insert("name".to_string(), Value::from("abc"));
    let mut ctx = RenderContext::new(globals);

    let expr = binary(BinaryOperation::StringConcat, var("name"), constant("!"));
    assert_eq!(expr.evaluate(&mut ctx).to_string(), "abc!");
    assert_eq!(ctx.find_value("name").unwrap().to_string(), "abc");
}

#[test]
fn test_concat_width_mismatch_is_empty() {
    let mut ctx = context();
    let wide = Value::from(TargetString::Wide(WideString::from("b")));
    let expr = binary(BinaryOperation::StringConcat, constant("a"), constant(wide));
    assert!(expr.evaluate(&mut ctx).is_empty());
}

#[test]
fn test_binary_result_reuses_temporary_left_operand() {
    let mut ctx = context();
    let sum = binary(BinaryOperation::Plus, constant(1), constant(2));
    let expr = binary(BinaryOperation::Mul, sum, constant(4));
    let result = expr.evaluate(&mut ctx);
    assert_eq!(result.as_int(), Some(12));
    assert!(result.is_temporary());
}

// ══════════════════════════════════════════════════════════════════════════════
// Subscripts & constructors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_subscript_element_outlives_parent() {
    let mut ctx = context();
    let inner = Expression::Tuple(TupleCreator::new(vec![constant(1), constant("kept")])).into_ptr();
    let outer = Expression::Tuple(TupleCreator::new(vec![inner, constant(3)])).into_ptr();
    let expr = Expression::Subscript(
        SubscriptExpression::new(outer)
            .with_index(constant(0))
            .with_index(constant(-1)),
    );

    let child = expr.evaluate(&mut ctx);
    drop(expr);
    drop(ctx);

    assert_eq!(child.to_string(), "kept");
    let parent = child.parent().unwrap();
    assert_eq!(parent.to_string(), "[1, 'kept']");
    let grandparent = parent.parent().unwrap();
    assert_eq!(grandparent.as_list().map(ListAdapter::len), Some(2));
}

#[test]
fn test_subscript_map_and_missing_keys() {
    let mut ctx = context();
    let dict = Expression::Dict(DictCreator::new(vec![
        ("a".to_string(), constant(1)),
        ("b".to_string(), constant("two")),
    ]))
    .into_ptr();

    let hit = SubscriptExpression::new(Rc::clone(&dict)).with_index(constant("b"));
    assert_eq!(hit.evaluate(&mut ctx).to_string(), "two");

    let miss = SubscriptExpression::new(dict).with_index(constant("zzz"));
    assert!(miss.evaluate(&mut ctx).is_empty());
}

#[test]
fn test_dict_evaluates_entries_in_order() {
    let mut ctx = context();
    let order = Rc::new(std::cell::RefCell::new(Vec::new()));
    let entry = |tag: &'static str| {
        let order = Rc::clone(&order);
        let f = Callable::expression(CallableKind::GlobalFunc, move |_, _| {
            order.borrow_mut().push(tag);
            Value::from(tag)
        });
        call(constant(f), CallParams::new())
    };
    let dict = Expression::Dict(DictCreator::new(vec![
        ("z".to_string(), entry("first")),
        ("a".to_string(), entry("second")),
    ]));
    dict.evaluate(&mut ctx);
    assert_eq!(*order.borrow(), vec!["first", "second"]);
}

#[test]
fn test_unresolved_name_is_empty() {
    let mut ctx = context();
    assert!(var("nothing").evaluate(&mut ctx).is_empty());
}

// ══════════════════════════════════════════════════════════════════════════════
// Callables
// ══════════════════════════════════════════════════════════════════════════════

fn greeter() -> Value {
    Value::from(Callable::statement(CallableKind::UserCallable, |_, out, _| {
        out.write_value(&Value::from("hi "));
        out.write_value(&Value::from(42));
    }))
}

#[test]
fn test_statement_callable_evaluates_to_string() {
    let mut ctx = context();
    let result = call(constant(greeter()), CallParams::new()).evaluate(&mut ctx);
    assert_eq!(result.to_string(), "hi 42");
}

#[test]
fn test_statement_callable_renders_to_stream() {
    let mut ctx = context();
    let expr = call(constant(greeter()), CallParams::new());
    assert_eq!(render_to_string(&expr, &mut ctx).to_string(), "hi 42");
}

#[test]
fn test_statement_callable_uses_target_width() {
    let mut ctx = context().with_settings(RenderSettings {
        target_width: CharWidth::Wide,
    });
    let result = call(constant(greeter()), CallParams::new()).evaluate(&mut ctx);
    assert_eq!(
        result.as_target_string().map(TargetString::width),
        Some(CharWidth::Wide)
    );
}

#[test]
fn test_callable_receives_params() {
    let mut ctx = context();
    let add = Value::from(Callable::expression(CallableKind::GlobalFunc, |params, ctx| {
        let args = parse_call_params(
            &[ArgumentInfo::mandatory("a"), ArgumentInfo::with_default("b", 10)],
            params,
        );
        let a = args.evaluate("a", ctx).to_int(0);
        let b = args.evaluate("b", ctx).to_int(0);
        Value::from(a + b)
    }));
    let expr = call(constant(add), positional(vec![constant(5)]));
    assert_eq!(expr.evaluate(&mut ctx).as_int(), Some(15));
}

#[test]
fn test_call_operator_fallback() {
    let mut ctx = context();
    let counter = Rc::new(Cell::new(0));
    let mut members = ValuesMap::new();
    members.insert("operator()".to_string(), counting(&counter, Value::from(7)));
    let object = ctx.pool().create_map(members);

    let expr = call(constant(object), CallParams::new());
    assert_eq!(expr.evaluate(&mut ctx).as_int(), Some(7));
    assert_eq!(render_to_string(&expr, &mut ctx).to_string(), "7");
    assert_eq!(counter.get(), 2);
}

#[test]
fn test_callee_is_evaluated_once() {
    let mut ctx = context();
    let counter = Rc::new(Cell::new(0));
    let factory = counted_call(&counter, counting(&Rc::new(Cell::new(0)), Value::from(1)));
    let expr = call(factory, CallParams::new());
    assert_eq!(expr.evaluate(&mut ctx).as_int(), Some(1));
    assert_eq!(counter.get(), 1);
}

#[test]
fn test_macro_kind_is_not_invoked_from_expression() {
    let mut ctx = context();
    let counter = Rc::new(Cell::new(0));
    let seen = Rc::clone(&counter);
    let callee = Value::from(Callable::expression(CallableKind::Macro, move |_, _| {
        seen.set(seen.get() + 1);
        Value::from(1)
    }));
    assert!(call(constant(callee), CallParams::new()).evaluate(&mut ctx).is_empty());
    assert_eq!(counter.get(), 0);
}

// ══════════════════════════════════════════════════════════════════════════════
// Testers & full expressions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_is_expression() {
    let mut ctx = context();
    let expr = IsExpression::new(var("missing"), "undefined", CallParams::new()).unwrap();
    let result = expr.evaluate(&mut ctx);
    assert_eq!(result.as_bool(), Some(true));
    assert!(result.is_temporary());
}

#[test]
fn test_is_in_with_positional_sequence() {
    let mut ctx = context();
    let params = positional(vec![constant("haystack")]);
    let expr = IsExpression::new(constant("hay"), "in", params).unwrap();
    assert_eq!(expr.evaluate(&mut ctx).as_bool(), Some(true));
}

#[test]
fn test_unknown_names_fail_construction() {
    let err = IsExpression::new(constant(1), "prime", CallParams::new()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::UNKNOWN_TESTER);

    let err = ExpressionFilter::new("shout", CallParams::new()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::UNKNOWN_FILTER);
}

#[test]
fn test_full_expression_conditional() {
    let mut ctx = context();
    let full = |test: bool, alt: Option<ExpressionPtr>| {
        FullExpression::new(constant("yes")).with_tester(IfExpression::new(constant(test), alt))
    };

    assert_eq!(full(true, Some(constant("no"))).evaluate(&mut ctx).to_string(), "yes");
    assert_eq!(full(false, Some(constant("no"))).evaluate(&mut ctx).to_string(), "no");
    assert!(full(false, None).evaluate(&mut ctx).is_empty());
}

#[test]
fn test_full_expression_evaluates_primary_before_test() {
    let mut ctx = context();
    let counter = Rc::new(Cell::new(0));
    let full = FullExpression::new(counted_call(&counter, Value::from("primary")))
        .with_tester(IfExpression::new(constant(false), None));
    assert!(full.evaluate(&mut ctx).is_empty());
    assert_eq!(counter.get(), 1);
}

#[test]
fn test_full_expression_without_tester_streams_directly() {
    let mut ctx = context();
    let full = Expression::Full(FullExpression::new(call(constant(greeter()), CallParams::new())));
    assert_eq!(render_to_string(&full, &mut ctx).to_string(), "hi 42");
    assert_eq!(render_to_string(&Expression::Full(FullExpression::default()), &mut ctx).to_string(), "");
}

#[test]
fn test_values_from_json_scope() {
    let pool = ValuePool::new();
    let globals = values_from_json(
        &serde_json::json!({ "items": ["a", "b", "c"], "user": { "name": "Ada" } }),
        &pool,
    );
    let mut ctx = RenderContext::with_pool(globals, pool);

    let item = SubscriptExpression::new(var("items")).with_index(constant(1));
    assert_eq!(item.evaluate(&mut ctx).to_string(), "b");

    let name = SubscriptExpression::new(var("user")).with_index(constant("name"));
    assert_eq!(name.evaluate(&mut ctx).to_string(), "Ada");
}
