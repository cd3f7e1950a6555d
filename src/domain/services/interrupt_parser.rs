#[cfg(test)]
#[path = "interrupt_parser_test.rs"]
mod tests;

use std::str::Chars;

use serde_json::Value;

use crate::domain::models::InterruptPayload;
use crate::domain::models::InterruptRequest;

fn recognized(req: InterruptRequest) -> InterruptPayload {
    return InterruptPayload::Recognized {
        tool_name: req.tool_name,
        args: req.args,
        message: req.message,
    };
}

/// Only a JSON object can describe a request. Sequences are refused before
/// they reach the derived deserializer, which would accept them positionally.
fn parse_object(text: &str) -> Result<InterruptRequest, String> {
    let value = serde_json::from_str::<Value>(text).map_err(|err| return err.to_string())?;
    if !value.is_object() {
        return Err("interrupt payload is not an object".to_string());
    }

    return serde_json::from_value::<InterruptRequest>(value).map_err(|err| return err.to_string());
}

fn push_word(out: &mut String, word: &mut String) {
    let literal = match word.as_str() {
        "True" => "true",
        "False" => "false",
        "None" => "null",
        other => other,
    };
    out.push_str(literal);
    word.clear();
}

fn push_quoted(out: &mut String, chars: &mut Chars, quote: char) {
    out.push('"');
    while let Some(c) = chars.next() {
        if c == quote {
            break;
        }
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    if escaped == '\'' {
                        out.push('\'');
                    } else {
                        out.push('\\');
                        out.push(escaped);
                    }
                }
            }
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out.push('"');
}

/// Rewrites a mapping printed in single-quoted literal style, e.g.
/// `{'tool_name': 'generate_image', 'ok': True}`, as JSON.
fn normalize_mapping_literal(text: &str) -> Option<String> {
    if !text.starts_with('{') || !text.ends_with('}') {
        return None;
    }

    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                push_word(&mut out, &mut word);
                push_quoted(&mut out, &mut chars, c);
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' || c == '-' => word.push(c),
            _ => {
                push_word(&mut out, &mut word);
                out.push(c);
            }
        }
    }
    push_word(&mut out, &mut word);

    return Some(out);
}

pub struct InterruptPayloadParser {}

impl InterruptPayloadParser {
    /// Parses the text that followed the interrupt marker. Never fails: a
    /// payload that cannot be read becomes `Unrecognized` with a diagnostic
    /// reason, so a detected interrupt always yields a request.
    pub fn parse(raw: &str) -> InterruptPayload {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            tracing::warn!("Received empty interrupt message");
            return InterruptPayload::Unrecognized {
                raw: raw.to_string(),
                reason: "Received empty interrupt message.".to_string(),
            };
        }

        let err = match parse_object(trimmed) {
            Ok(req) => return recognized(req),
            Err(err) => err,
        };

        if let Some(normalized) = normalize_mapping_literal(trimmed) {
            if let Ok(req) = parse_object(&normalized) {
                tracing::debug!(payload = trimmed, "Parsed interrupt from mapping literal");
                return recognized(req);
            }
        }

        tracing::warn!(payload = trimmed, error = %err, "Failed to parse interrupt message");
        return InterruptPayload::Unrecognized {
            raw: raw.to_string(),
            reason: format!("Could not parse interrupt message: {err}"),
        };
    }
}
