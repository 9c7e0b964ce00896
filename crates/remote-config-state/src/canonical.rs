//! Canonical JSON encoding used for TUF signature verification.
//!
//! Backends sign the OLPC canonical form of the `signed` member: object keys
//! sorted bytewise, no insignificant whitespace, integers only, and strings
//! where only `"` and `\` are escaped. Verification re-encodes the parsed
//! document so the byte layout of the wire payload never matters.

use serde_json::{Number, Value};
use thiserror::Error;

/// Values that have no canonical representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalError {
    #[error("non-integral number '{0}' cannot be canonicalised")]
    NonIntegralNumber(String),
}

/// Encodes `value` into its canonical byte representation.
pub fn to_canonical_vec(value: &Value) -> Result<Vec<u8>, CanonicalError> {
    let mut out = Vec::with_capacity(256);
    write_value(&mut out, value)?;
    Ok(out)
}

fn write_value(out: &mut Vec<u8>, value: &Value) -> Result<(), CanonicalError> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(number) => write_number(out, number)?,
        Value::String(text) => write_string(out, text),
        Value::Array(items) => {
            out.push(b'[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_value(out, item)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            // Map iteration order depends on serde_json's `preserve_order` feature.
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            out.push(b'{');
            for (idx, (key, item)) in entries.into_iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_string(out, key);
                out.push(b':');
                write_value(out, item)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

fn write_number(out: &mut Vec<u8>, number: &Number) -> Result<(), CanonicalError> {
    if let Some(value) = number.as_u64() {
        out.extend_from_slice(value.to_string().as_bytes());
    } else if let Some(value) = number.as_i64() {
        out.extend_from_slice(value.to_string().as_bytes());
    } else {
        match number.as_f64() {
            // Integral floats (e.g. `3.0`) are written as plain integers.
            Some(value)
                if value.is_finite()
                    && value.fract() == 0.0
                    && value.abs() < 9_007_199_254_740_992.0 =>
            {
                out.extend_from_slice((value as i64).to_string().as_bytes());
            }
            _ => return Err(CanonicalError::NonIntegralNumber(number.to_string())),
        }
    }
    Ok(())
}

fn write_string(out: &mut Vec<u8>, text: &str) {
    out.push(b'"');
    for byte in text.bytes() {
        if byte == b'"' || byte == b'\\' {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out.push(b'"');
}
