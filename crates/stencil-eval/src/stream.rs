//! Output stream sink.

use crate::value::Value;
use stencil_types::TargetString;

/// Destination for rendered values.
pub trait OutStream {
    fn write_value(&mut self, value: &Value);
}

/// Stream appending rendered values to a string buffer, in the buffer's width.
pub struct StringStream<'a> {
    buffer: &'a mut TargetString,
}

impl<'a> StringStream<'a> {
    pub fn new(buffer: &'a mut TargetString) -> Self {
        Self { buffer }
    }
}

impl OutStream for StringStream<'_> {
    fn write_value(&mut self, value: &Value) {
        let text = value.to_target_string(self.buffer.width());
        if let Err(err) = self.buffer.append(&text) {
            tracing::warn!(%err, "dropped value written to string stream");
        }
    }
}
