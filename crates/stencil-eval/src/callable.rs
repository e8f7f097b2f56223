//! Invocable template values.

use crate::binder::CallParams;
use crate::context::RenderContext;
use crate::stream::OutStream;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// Where a callable came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallableKind {
    /// Function installed in the global scope by the embedder.
    GlobalFunc,
    /// Engine-internal helper; not invocable from value positions.
    SpecialFunc,
    /// Template macro.
    Macro,
    /// Callable supplied with the render data.
    UserCallable,
}

/// Whether a callable returns a value or writes output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallableShape {
    Expression,
    Statement,
}

/// A callable that produces a value.
pub type ExpressionCallableFn = dyn Fn(&CallParams, &mut RenderContext) -> Value;

/// A callable that writes straight into an output stream.
pub type StatementCallableFn = dyn Fn(&CallParams, &mut dyn OutStream, &mut RenderContext);

#[derive(Clone)]
pub enum CallableBody {
    Expression(Rc<ExpressionCallableFn>),
    Statement(Rc<StatementCallableFn>),
}

/// An invocable entity, tagged by origin and by shape.
#[derive(Clone)]
pub struct Callable {
    kind: CallableKind,
    body: CallableBody,
}

impl Callable {
    pub fn expression(
        kind: CallableKind,
        f: impl Fn(&CallParams, &mut RenderContext) -> Value + 'static,
    ) -> Self {
        Self {
            kind,
            body: CallableBody::Expression(Rc::new(f)),
        }
    }

    pub fn statement(
        kind: CallableKind,
        f: impl Fn(&CallParams, &mut dyn OutStream, &mut RenderContext) + 'static,
    ) -> Self {
        Self {
            kind,
            body: CallableBody::Statement(Rc::new(f)),
        }
    }

    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    pub fn shape(&self) -> CallableShape {
        match self.body {
            CallableBody::Expression(_) => CallableShape::Expression,
            CallableBody::Statement(_) => CallableShape::Statement,
        }
    }

    pub fn body(&self) -> &CallableBody {
        &self.body
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("kind", &self.kind)
            .field("shape", &self.shape())
            .finish()
    }
}
