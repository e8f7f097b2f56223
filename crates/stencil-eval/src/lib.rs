//! Stencil expression evaluator.
//!
//! Evaluates template expression trees against a [`RenderContext`]:
//! value model, render-pass [`ValuePool`], call argument binding, filter
//! and tester glue, and the `range` / `loop.cycle` built-ins.
//!
//! Evaluation never fails. Unresolved names, kind mismatches, bad call
//! arguments and similar soft failures produce an Empty value. Only tree
//! construction (unknown filter or tester names) returns an error.

pub mod adapters;
pub mod binder;
pub mod call;
pub mod callable;
pub mod context;
pub mod expression;
pub mod filters;
pub mod json;
pub mod operations;
pub mod pool;
pub mod stream;
pub mod testers;
pub mod value;

pub use adapters::{ListAdapter, ListSource, MapAdapter, MapSource};
pub use binder::{parse_call_params, ArgumentInfo, CallParams, ParsedArguments, KWARGS, VARARGS};
pub use call::{loop_cycle_value, setup_globals, CallExpression};
pub use callable::{Callable, CallableBody, CallableKind, CallableShape};
pub use context::{RenderContext, RenderSettings, RendererCallback, TextRenderer};
pub use expression::{
    BinaryExpression, DictCreator, Expression, ExpressionPtr, FilteredExpression,
    FullExpression, IfExpression, IsExpression, SubscriptExpression, TupleCreator,
    UnaryExpression, ValueRefExpression,
};
pub use filters::{create_filter, ExpressionFilter, Filter};
pub use json::{value_from_json, values_from_json};
pub use pool::ValuePool;
pub use stream::{OutStream, StringStream};
pub use testers::{create_tester, Tester};
pub use value::{BuiltinFn, Value, ValueData, ValuesList, ValuesMap};
