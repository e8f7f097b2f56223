//! Render context: scope chain, value pool and render callback.

use crate::pool::ValuePool;
use crate::stream::{OutStream, StringStream};
use crate::value::{Value, ValuesMap};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use stencil_types::{CharWidth, TargetString};

/// Engine-side string conversion hooks.
pub trait RendererCallback {
    /// Width of strings this renderer produces.
    fn target_width(&self) -> CharWidth;

    /// Convert a value to target text. Strings keep their own width;
    /// everything else is rendered at [`RendererCallback::target_width`].
    fn get_as_target_string(&self, value: &Value) -> TargetString {
        match value.as_target_string() {
            Some(s) => s.clone(),
            None => value.to_target_string(self.target_width()),
        }
    }

    /// An output stream appending into `buffer`.
    fn get_stream_on_string<'a>(&self, buffer: &'a mut TargetString) -> Box<dyn OutStream + 'a> {
        Box::new(StringStream::new(buffer))
    }
}

/// Settings for the default renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default)]
    pub target_width: CharWidth,
}

/// Default [`RendererCallback`].
#[derive(Debug, Clone, Default)]
pub struct TextRenderer {
    settings: RenderSettings,
}

impl TextRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }
}

impl RendererCallback for TextRenderer {
    fn target_width(&self) -> CharWidth {
        self.settings.target_width
    }
}

/// State for one render pass.
///
/// Variables are looked up from innermost scope outward. `define` always
/// writes to the innermost scope. The context is single-threaded; render
/// passes running in parallel each need their own context.
pub struct RenderContext {
    scopes: Vec<ValuesMap>,
    pool: ValuePool,
    renderer: Rc<dyn RendererCallback>,
}

impl RenderContext {
    /// Create a context with `globals` as the outermost scope and a fresh pool.
    pub fn new(globals: ValuesMap) -> Self {
        Self::with_pool(globals, ValuePool::new())
    }

    /// Create a context around an existing pool.
    pub fn with_pool(globals: ValuesMap, pool: ValuePool) -> Self {
        Self {
            scopes: vec![globals],
            pool,
            renderer: Rc::new(TextRenderer::default()),
        }
    }

    /// Replace the render callback.
    pub fn with_renderer(mut self, renderer: Rc<dyn RendererCallback>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Use the default renderer with the given settings.
    pub fn with_settings(self, settings: RenderSettings) -> Self {
        self.with_renderer(Rc::new(TextRenderer::new(settings)))
    }

    pub fn pool(&self) -> &ValuePool {
        &self.pool
    }

    pub fn renderer(&self) -> Rc<dyn RendererCallback> {
        Rc::clone(&self.renderer)
    }

    /// Look up a variable, searching from innermost to outermost scope.
    pub fn find_value(&self, name: &str) -> Option<Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
    }

    /// Define a variable in the current (innermost) scope.
    pub fn define(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(ValuesMap::new());
    }

    /// Pop the innermost scope. The global scope is never popped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(ValuesMap::new())
    }
}
