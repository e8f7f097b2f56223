//! Testers: predicates used by `is` and by the `in` operator.

use crate::binder::{parse_call_params, ArgumentInfo, CallParams, ParsedArguments};
use crate::context::RenderContext;
use crate::operations::equals;
use crate::value::{Value, ValueData};
use std::fmt;
use stencil_types::TemplateError;

pub trait Tester: fmt::Debug {
    fn test(&self, value: &Value, ctx: &mut RenderContext) -> bool;
}

/// Look up a tester by name and bind its arguments.
pub fn create_tester(name: &str, params: CallParams) -> Result<Box<dyn Tester>, TemplateError> {
    let tester: Box<dyn Tester> = match name {
        "in" => Box::new(InTester::new(params)),
        "defined" => Box::new(DefinedTester { expect_defined: true }),
        "undefined" => Box::new(DefinedTester {
            expect_defined: false,
        }),
        _ => {
            return Err(TemplateError::UnknownTester {
                name: name.to_string(),
            })
        }
    };

    tracing::debug!(tester = name, "tester created");
    Ok(tester)
}

/// Membership in `seq`: list element, map key or substring.
///
/// `seq` is evaluated on every test, never at construction.
#[derive(Debug)]
pub struct InTester {
    args: ParsedArguments,
}

impl InTester {
    pub fn new(params: CallParams) -> Self {
        Self {
            args: parse_call_params(&[ArgumentInfo::mandatory("seq")], &params),
        }
    }
}

impl Tester for InTester {
    fn test(&self, value: &Value, ctx: &mut RenderContext) -> bool {
        let seq = self.args.evaluate("seq", ctx);
        match seq.data() {
            ValueData::List(list) => list.iter().any(|item| equals(&item, value)),
            ValueData::Map(map) => value
                .as_target_string()
                .is_some_and(|key| map.has_key(&key.to_string())),
            ValueData::String(haystack) => value.as_target_string().is_some_and(|needle| {
                let needle = needle.to_chars();
                needle.is_empty()
                    || haystack
                        .to_chars()
                        .windows(needle.len())
                        .any(|window| window == needle.as_slice())
            }),
            _ => false,
        }
    }
}

#[derive(Debug)]
struct DefinedTester {
    expect_defined: bool,
}

impl Tester for DefinedTester {
    fn test(&self, value: &Value, _ctx: &mut RenderContext) -> bool {
        value.is_empty() != self.expect_defined
    }
}
