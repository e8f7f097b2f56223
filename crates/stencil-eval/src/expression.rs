//! Expression nodes.
//!
//! Every node supports `evaluate`, producing a [`Value`], and `render`,
//! writing to an output stream. Rendering defaults to evaluate-then-write;
//! full expressions without a tester and call expressions stream directly
//! so large output is never buffered into an intermediate value.

use crate::binder::CallParams;
use crate::call::CallExpression;
use crate::context::RenderContext;
use crate::filters::ExpressionFilter;
use crate::operations::{binary_math, subscript, unary_operation};
use crate::pool::ValuePool;
use crate::stream::OutStream;
use crate::testers::{create_tester, Tester};
use crate::value::{Value, ValueData, ValuesList, ValuesMap};
use std::rc::Rc;
use stencil_types::{BinaryOperation, TemplateError, UnaryOperation};

/// Shared handle to an expression node.
pub type ExpressionPtr = Rc<Expression>;

/// The expression node kinds.
#[derive(Debug)]
pub enum Expression {
    Constant(Value),
    ValueRef(ValueRefExpression),
    Subscript(SubscriptExpression),
    Filtered(FilteredExpression),
    Unary(UnaryExpression),
    Binary(BinaryExpression),
    Tuple(TupleCreator),
    Dict(DictCreator),
    Is(IsExpression),
    Call(CallExpression),
    Full(FullExpression),
}

impl Expression {
    pub fn into_ptr(self) -> ExpressionPtr {
        Rc::new(self)
    }

    /// Evaluate the expression to a value.
    pub fn evaluate(&self, ctx: &mut RenderContext) -> Value {
        match self {
            Self::Constant(value) => value.clone(),
            Self::ValueRef(e) => e.evaluate(ctx),
            Self::Subscript(e) => e.evaluate(ctx),
            Self::Filtered(e) => e.evaluate(ctx),
            Self::Unary(e) => e.evaluate(ctx),
            Self::Binary(e) => e.evaluate(ctx),
            Self::Tuple(e) => e.evaluate(ctx),
            Self::Dict(e) => e.evaluate(ctx),
            Self::Is(e) => e.evaluate(ctx),
            Self::Call(e) => e.evaluate(ctx),
            Self::Full(e) => e.evaluate(ctx),
        }
    }

    /// Write the expression's output to `stream`.
    pub fn render(&self, stream: &mut dyn OutStream, ctx: &mut RenderContext) {
        match self {
            Self::Full(e) => e.render(stream, ctx),
            Self::Call(e) => e.render(stream, ctx),
            _ => {
                let value = self.evaluate(ctx);
                stream.write_value(&value);
            }
        }
    }
}

// ── Names & indexing ─────────────────────────────────────────────────────────

/// A variable reference. Unresolved names evaluate to Empty.
#[derive(Debug)]
pub struct ValueRefExpression {
    name: String,
}

impl ValueRefExpression {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn evaluate(&self, ctx: &mut RenderContext) -> Value {
        ctx.find_value(&self.name).unwrap_or_else(|| {
            tracing::trace!(name = %self.name, "unresolved name");
            Value::empty()
        })
    }
}

/// `base[i][j]...`
#[derive(Debug)]
pub struct SubscriptExpression {
    value: ExpressionPtr,
    subscript_exprs: Vec<ExpressionPtr>,
}

impl SubscriptExpression {
    pub fn new(value: ExpressionPtr) -> Self {
        Self {
            value,
            subscript_exprs: Vec::new(),
        }
    }

    pub fn add_index(&mut self, index: ExpressionPtr) {
        self.subscript_exprs.push(index);
    }

    pub fn with_index(mut self, index: ExpressionPtr) -> Self {
        self.add_index(index);
        self
    }

    /// Applies the indices left to right. Each step that reads out of a
    /// lifetime-extending base links the result back to that base, so a
    /// chain of indices keeps every container on the path alive.
    pub fn evaluate(&self, ctx: &mut RenderContext) -> Value {
        let mut cur = self.value.evaluate(ctx);
        for index in &self.subscript_exprs {
            let key = index.evaluate(ctx);
            let mut new_val = subscript(&cur, &key, ctx);
            if cur.extends_lifetime() {
                new_val.set_parent(cur);
            }
            cur = new_val;
        }
        cur
    }
}

// ── Filters & operators ──────────────────────────────────────────────────────

/// `expr | filter | filter ...`
#[derive(Debug)]
pub struct FilteredExpression {
    expression: ExpressionPtr,
    filter: ExpressionFilter,
}

impl FilteredExpression {
    pub fn new(expression: ExpressionPtr, filter: ExpressionFilter) -> Self {
        Self { expression, filter }
    }

    pub fn evaluate(&self, ctx: &mut RenderContext) -> Value {
        let orig_result = self.expression.evaluate(ctx);
        let mut result = self.filter.evaluate(&orig_result, ctx);
        result.set_temporary(true);
        result
    }
}

#[derive(Debug)]
pub struct UnaryExpression {
    operation: UnaryOperation,
    expr: ExpressionPtr,
}

impl UnaryExpression {
    pub fn new(operation: UnaryOperation, expr: ExpressionPtr) -> Self {
        Self { operation, expr }
    }

    pub fn evaluate(&self, ctx: &mut RenderContext) -> Value {
        let operand = self.expr.evaluate(ctx);
        unary_operation(self.operation, &operand).into_temporary()
    }
}

#[derive(Debug)]
pub struct BinaryExpression {
    operation: BinaryOperation,
    left: ExpressionPtr,
    right: ExpressionPtr,
    in_tester: Option<Box<dyn Tester>>,
}

impl BinaryExpression {
    /// For `In`, the right operand becomes the `seq` argument of an `in`
    /// tester, so it is evaluated only inside the membership test.
    pub fn new(
        operation: BinaryOperation,
        left: ExpressionPtr,
        right: ExpressionPtr,
    ) -> Result<Self, TemplateError> {
        let in_tester = if operation == BinaryOperation::In {
            let params = CallParams::new().with_keyword("seq", Rc::clone(&right));
            Some(create_tester("in", params)?)
        } else {
            None
        };
        Ok(Self {
            operation,
            left,
            right,
            in_tester,
        })
    }

    pub fn operation(&self) -> BinaryOperation {
        self.operation
    }

    pub fn evaluate(&self, ctx: &mut RenderContext) -> Value {
        let left = self.left.evaluate(ctx);
        let data = match self.operation {
            BinaryOperation::LogicalAnd => {
                ValueData::Bool(left.to_bool() && self.right.evaluate(ctx).to_bool())
            }
            BinaryOperation::LogicalOr => {
                ValueData::Bool(left.to_bool() || self.right.evaluate(ctx).to_bool())
            }
            BinaryOperation::In => {
                let found = match &self.in_tester {
                    Some(tester) => tester.test(&left, ctx),
                    None => false,
                };
                ValueData::Bool(found)
            }
            BinaryOperation::StringConcat => {
                let right = self.right.evaluate(ctx);
                return concat(left, &right, ctx);
            }
            op => {
                let right = self.right.evaluate(ctx);
                binary_math(op, &left, &right, ctx.pool()).into_data()
            }
        };

        let mut result = scratch_cell(left, ctx.pool());
        result.set_data(data);
        result
    }
}

/// The output cell for a binary result: a temporary left operand is reused,
/// anything else gets a fresh temporary.
fn scratch_cell(left: Value, pool: &ValuePool) -> Value {
    if left.is_temporary() {
        left
    } else {
        pool.create(ValueData::Empty).into_temporary()
    }
}

fn concat(left: Value, right: &Value, ctx: &RenderContext) -> Value {
    let renderer = ctx.renderer();
    let right_str = renderer.get_as_target_string(right);

    let mut result = if left.is_temporary() && left.as_target_string().is_some() {
        left
    } else {
        let left_str = renderer.get_as_target_string(&left);
        let mut cell = scratch_cell(left, ctx.pool());
        cell.set_data(ValueData::String(Rc::new(left_str)));
        cell
    };

    if let Some(buffer) = result.string_mut() {
        if let Err(err) = buffer.append(&right_str) {
            tracing::warn!(%err, "string concatenation yields empty");
            return Value::empty();
        }
    }
    result
}

// ── Constructors ─────────────────────────────────────────────────────────────

/// `(a, b, ...)` / `[a, b, ...]`
#[derive(Debug)]
pub struct TupleCreator {
    exprs: Vec<ExpressionPtr>,
}

impl TupleCreator {
    pub fn new(exprs: Vec<ExpressionPtr>) -> Self {
        Self { exprs }
    }

    pub fn evaluate(&self, ctx: &mut RenderContext) -> Value {
        let result: ValuesList = self.exprs.iter().map(|e| e.evaluate(ctx)).collect();
        ctx.pool().create_list(result)
    }
}

/// `{'key': value, ...}`; entries are evaluated in source order.
#[derive(Debug)]
pub struct DictCreator {
    exprs: Vec<(String, ExpressionPtr)>,
}

impl DictCreator {
    pub fn new(exprs: Vec<(String, ExpressionPtr)>) -> Self {
        Self { exprs }
    }

    pub fn evaluate(&self, ctx: &mut RenderContext) -> Value {
        let mut result = ValuesMap::new();
        for (key, expr) in &self.exprs {
            let value = expr.evaluate(ctx);
            result.insert(key.clone(), value);
        }
        ctx.pool().create_map(result)
    }
}

// ── Tests & conditionals ─────────────────────────────────────────────────────

/// `value is tester(...)`
#[derive(Debug)]
pub struct IsExpression {
    value: ExpressionPtr,
    tester: Box<dyn Tester>,
}

impl IsExpression {
    pub fn new(
        value: ExpressionPtr,
        tester: &str,
        params: CallParams,
    ) -> Result<Self, TemplateError> {
        Ok(Self {
            value,
            tester: create_tester(tester, params)?,
        })
    }

    pub fn evaluate(&self, ctx: &mut RenderContext) -> Value {
        let value = self.value.evaluate(ctx);
        let passed = self.tester.test(&value, ctx);
        ctx.pool().create(ValueData::Bool(passed)).into_temporary()
    }
}

/// The `if test else alt` tail of a full expression.
#[derive(Debug)]
pub struct IfExpression {
    test_expr: ExpressionPtr,
    alt_value: Option<ExpressionPtr>,
}

impl IfExpression {
    pub fn new(test_expr: ExpressionPtr, alt_value: Option<ExpressionPtr>) -> Self {
        Self {
            test_expr,
            alt_value,
        }
    }

    pub fn evaluate(&self, ctx: &mut RenderContext) -> bool {
        self.test_expr.evaluate(ctx).to_bool()
    }

    pub fn evaluate_alt_value(&self, ctx: &mut RenderContext) -> Value {
        match &self.alt_value {
            Some(alt) => alt.evaluate(ctx),
            None => Value::empty(),
        }
    }
}

/// `expr [if test [else alt]]`
#[derive(Debug, Default)]
pub struct FullExpression {
    expression: Option<ExpressionPtr>,
    tester: Option<IfExpression>,
}

impl FullExpression {
    pub fn new(expression: ExpressionPtr) -> Self {
        Self {
            expression: Some(expression),
            tester: None,
        }
    }

    pub fn set_expression(&mut self, expression: ExpressionPtr) {
        self.expression = Some(expression);
    }

    pub fn set_tester(&mut self, tester: IfExpression) {
        self.tester = Some(tester);
    }

    pub fn with_tester(mut self, tester: IfExpression) -> Self {
        self.set_tester(tester);
        self
    }

    /// The primary expression is evaluated before the test.
    pub fn evaluate(&self, ctx: &mut RenderContext) -> Value {
        let Some(expression) = &self.expression else {
            return Value::empty();
        };

        let result = expression.evaluate(ctx);
        match &self.tester {
            Some(tester) if !tester.evaluate(ctx) => tester.evaluate_alt_value(ctx),
            _ => result,
        }
    }

    pub fn render(&self, stream: &mut dyn OutStream, ctx: &mut RenderContext) {
        match (&self.expression, &self.tester) {
            (Some(expression), None) => expression.render(stream, ctx),
            (None, None) => {}
            _ => {
                let value = self.evaluate(ctx);
                stream.write_value(&value);
            }
        }
    }
}
