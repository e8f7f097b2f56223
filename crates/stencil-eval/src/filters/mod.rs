//! Filters and filter chains.

mod string_converter;

pub use string_converter::{ConverterMode, StringConverter};

use crate::binder::CallParams;
use crate::context::RenderContext;
use crate::value::Value;
use std::fmt;
use stencil_types::TemplateError;

/// A value transformation applied with `|`.
pub trait Filter: fmt::Debug {
    fn filter(&self, base: &Value, ctx: &mut RenderContext) -> Value;
}

/// Look up a filter by name and bind its arguments.
pub fn create_filter(name: &str, params: CallParams) -> Result<Box<dyn Filter>, TemplateError> {
    let mode = match name {
        "trim" => ConverterMode::Trim,
        "title" => ConverterMode::Title,
        "wordcount" => ConverterMode::WordCount,
        "upper" => ConverterMode::Upper,
        "lower" => ConverterMode::Lower,
        "replace" => ConverterMode::Replace,
        "truncate" => ConverterMode::Truncate,
        "urlencode" => ConverterMode::UrlEncode,
        _ => {
            return Err(TemplateError::UnknownFilter {
                name: name.to_string(),
            })
        }
    };

    tracing::debug!(filter = name, "filter created");
    Ok(Box::new(StringConverter::new(params, mode)))
}

/// One link of a filter chain. `a | f | g` is `g` with parent `f`; the
/// parent is applied first.
#[derive(Debug)]
pub struct ExpressionFilter {
    name: String,
    filter: Box<dyn Filter>,
    parent: Option<Box<ExpressionFilter>>,
}

impl ExpressionFilter {
    pub fn new(name: &str, params: CallParams) -> Result<Self, TemplateError> {
        Ok(Self {
            name: name.to_string(),
            filter: create_filter(name, params)?,
            parent: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_parent_filter(&mut self, parent: ExpressionFilter) {
        self.parent = Some(Box::new(parent));
    }

    pub fn with_parent(mut self, parent: ExpressionFilter) -> Self {
        self.set_parent_filter(parent);
        self
    }

    pub fn evaluate(&self, base: &Value, ctx: &mut RenderContext) -> Value {
        match &self.parent {
            Some(parent) => {
                let intermediate = parent.evaluate(base, ctx);
                self.filter.filter(&intermediate, ctx)
            }
            None => self.filter.filter(base, ctx),
        }
    }
}
