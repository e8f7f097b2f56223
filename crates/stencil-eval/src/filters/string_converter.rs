//! String conversion filters: trim, title, wordcount, upper, lower,
//! replace, truncate and urlencode.
//!
//! Each filter works on the character sequence of its input and keeps the
//! input's character width. Non-string inputs are first rendered through
//! the context's renderer.

use super::Filter;
use crate::binder::{parse_call_params, ArgumentInfo, CallParams, ParsedArguments};
use crate::context::RenderContext;
use crate::value::{Value, ValueData};
use stencil_types::{TargetString, WideString};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterMode {
    Trim,
    Title,
    WordCount,
    Upper,
    Lower,
    Replace,
    Truncate,
    UrlEncode,
}

#[derive(Debug)]
pub struct StringConverter {
    mode: ConverterMode,
    args: ParsedArguments,
}

impl StringConverter {
    pub fn new(params: CallParams, mode: ConverterMode) -> Self {
        let formals = match mode {
            ConverterMode::Replace => vec![
                ArgumentInfo::mandatory("old"),
                ArgumentInfo::mandatory("new"),
                ArgumentInfo::with_default("count", 0),
            ],
            ConverterMode::Truncate => vec![
                ArgumentInfo::with_default("length", 255),
                ArgumentInfo::with_default("killwords", false),
                ArgumentInfo::with_default("end", "..."),
                ArgumentInfo::new("leeway"),
            ],
            _ => Vec::new(),
        };
        let args = parse_call_params(&formals, &params);
        if !args.is_succeeded() {
            tracing::trace!(?mode, missing = ?args.missing_mandatory(), "filter arguments missing");
        }
        Self { mode, args }
    }

    pub fn mode(&self) -> ConverterMode {
        self.mode
    }

    fn replace(&self, text: &TargetString, ctx: &mut RenderContext) -> TargetString {
        let old = string_arg(&self.args.evaluate("old", ctx));
        let new = string_arg(&self.args.evaluate("new", ctx));
        let count = self.args.evaluate("count", ctx).to_int(0);
        text.map_chars(|chars| replace_chars(chars, &old, &new, count))
    }

    fn truncate(&self, text: &TargetString, ctx: &mut RenderContext) -> TargetString {
        let length = self.args.evaluate("length", ctx).to_int(0);
        let killwords = self.args.evaluate("killwords", ctx).to_bool();
        let end = string_arg(&self.args.evaluate("end", ctx));
        let leeway = self.args.evaluate("leeway", ctx).to_int(5);
        text.map_chars(|chars| truncate_chars(chars, length, killwords, &end, leeway))
    }
}

impl Filter for StringConverter {
    fn filter(&self, base: &Value, ctx: &mut RenderContext) -> Value {
        let text = ctx.renderer().get_as_target_string(base);

        let result = match self.mode {
            ConverterMode::Trim => text.map_chars(trim_all),
            ConverterMode::Title => text.map_chars(title_case),
            ConverterMode::WordCount => {
                let count = i64::try_from(word_count(&text.to_chars())).unwrap_or(i64::MAX);
                return ctx.pool().create(ValueData::Int(count)).into_temporary();
            }
            ConverterMode::Upper => {
                text.map_chars(|chars| chars.iter().map(char::to_ascii_uppercase).collect())
            }
            ConverterMode::Lower => {
                text.map_chars(|chars| chars.iter().map(char::to_ascii_lowercase).collect())
            }
            ConverterMode::Replace => self.replace(&text, ctx),
            ConverterMode::Truncate => self.truncate(&text, ctx),
            ConverterMode::UrlEncode => url_encode(&text),
        };

        ctx.pool().create_string(result).into_temporary()
    }
}

/// Characters of a string argument; anything else reads as "".
fn string_arg(value: &Value) -> Vec<char> {
    value
        .as_target_string()
        .map(TargetString::to_chars)
        .unwrap_or_default()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

/// Strip both ends and collapse each inner whitespace run to its first
/// character.
fn trim_all(chars: &[char]) -> Vec<char> {
    let Some(start) = chars.iter().position(|c| !c.is_whitespace()) else {
        return Vec::new();
    };
    let end = chars
        .iter()
        .rposition(|c| !c.is_whitespace())
        .unwrap_or(start);

    let mut out = Vec::with_capacity(end + 1 - start);
    let mut in_space = false;
    for &c in &chars[start..=end] {
        if c.is_whitespace() {
            if !in_space {
                out.push(c);
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Upper-case the first letter of each word; everything else passes
/// through unchanged.
fn title_case(chars: &[char]) -> Vec<char> {
    let mut is_delim = true;
    chars
        .iter()
        .map(|&c| {
            let mapped = if is_delim && c.is_alphabetic() {
                c.to_ascii_uppercase()
            } else {
                c
            };
            is_delim = !is_word_char(c);
            mapped
        })
        .collect()
}

fn word_count(chars: &[char]) -> usize {
    let mut count = 0;
    let mut is_delim = true;
    for &c in chars {
        if is_delim && is_word_char(c) {
            count += 1;
        }
        is_delim = !is_word_char(c);
    }
    count
}

/// `count == 0` replaces every occurrence in one left-to-right pass. A
/// positive count replaces the first occurrence `count` times, rescanning
/// the rewritten text from the start each time. A negative count replaces
/// nothing. An empty pattern never matches.
fn replace_chars(src: &[char], old: &[char], new: &[char], count: i64) -> Vec<char> {
    if old.is_empty() || count < 0 {
        return src.to_vec();
    }

    if count == 0 {
        let mut out = Vec::with_capacity(src.len());
        let mut idx = 0;
        while idx < src.len() {
            if src[idx..].starts_with(old) {
                out.extend_from_slice(new);
                idx += old.len();
            } else {
                out.push(src[idx]);
                idx += 1;
            }
        }
        return out;
    }

    let mut out = src.to_vec();
    for _ in 0..count {
        let Some(pos) = find_chars(&out, old) else {
            break;
        };
        out.splice(pos..pos + old.len(), new.iter().copied());
    }
    out
}

fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn truncate_chars(src: &[char], length: i64, killwords: bool, end: &[char], leeway: i64) -> Vec<char> {
    let length = usize::try_from(length).unwrap_or(0);
    if src.len() <= length {
        return src.to_vec();
    }

    let mut out = src.to_vec();
    if killwords {
        let leeway = usize::try_from(leeway).unwrap_or(0);
        if src.len() > length.saturating_add(leeway) {
            out.truncate(length);
            out.extend_from_slice(end);
        }
        return out;
    }

    // Let a word that straddles the cut run on for up to `leeway` chars.
    let mut pos = length;
    let mut leeway = leeway;
    if leeway != 0 {
        while leeway != 0 && pos < out.len() && is_word_char(out[pos]) {
            leeway -= 1;
            pos += 1;
        }
        if pos == out.len() {
            return out;
        }
    }

    if is_word_char(out[pos]) {
        while pos != 0 && is_word_char(out[pos]) {
            pos -= 1;
        }
    }
    out.truncate(pos);
    while out.last().is_some_and(|c| c.is_whitespace()) {
        out.pop();
    }
    out.extend_from_slice(end);
    out
}

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Percent-encode. Narrow strings encode each UTF-8 byte; wide strings
/// encode each code point as its significant big-endian bytes.
fn url_encode(text: &TargetString) -> TargetString {
    match text {
        TargetString::Narrow(s) => {
            let mut out = String::with_capacity(s.len());
            for &byte in s.as_bytes() {
                encode_unit(u32::from(byte), &mut |c| out.push(c));
            }
            TargetString::Narrow(out)
        }
        TargetString::Wide(w) => {
            let mut out = Vec::with_capacity(w.len());
            for &c in w.as_chars() {
                encode_unit(u32::from(c), &mut |c| out.push(c));
            }
            TargetString::Wide(WideString(out))
        }
    }
}

fn encode_unit(unit: u32, out: &mut impl FnMut(char)) {
    match unit {
        0x20 => out('+'),
        0x00..=0x7f if !is_reserved(unit as u8) => out(char::from(unit as u8)),
        _ => {
            let bytes = unit.to_be_bytes();
            let skip = bytes.iter().take(3).take_while(|&&b| b == 0).count();
            for &byte in &bytes[skip..] {
                out('%');
                out(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
                out(char::from(HEX_DIGITS[usize::from(byte & 0x0f)]));
            }
        }
    }
}

fn is_reserved(byte: u8) -> bool {
    matches!(
        byte,
        b'+' | b'"'
            | b'%'
            | b'-'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b','
            | b'/'
            | b':'
            | b';'
            | b'='
            | b'?'
            | b'@'
            | b'['
            | b']'
    )
}
