//! Value conversions: number formatting, string conversion and JSON
//! serialization.

use core_types::{ScriptArray, ScriptValue};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Number, Value as Json};

/// Largest integer magnitude printed without an exponent.
const INTEGER_LIMIT: f64 = 1e21;

/// Format a number the way the probe language prints it.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if n == 0.0 {
        return "0".to_owned();
    }
    if n.fract() == 0.0 && n.abs() < INTEGER_LIMIT {
        return format!("{n:.0}");
    }
    let mut buffer = ryu::Buffer::new();
    let text = buffer.format_finite(n);
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => text.to_owned(),
    }
}

/// Arrays nested deeper than this render as empty strings and fail JSON
/// conversion.
pub const MAX_CONVERSION_DEPTH: usize = 256;

/// String conversion used by concatenation, `print` and `join`.
pub fn to_display_string(value: &ScriptValue) -> String {
    display(value, &mut Vec::new())
}

fn display(value: &ScriptValue, joining: &mut Vec<ScriptArray>) -> String {
    match value {
        ScriptValue::Undefined => "undefined".to_owned(),
        ScriptValue::Null => "null".to_owned(),
        ScriptValue::Boolean(b) => b.to_string(),
        ScriptValue::Number(n) => number_to_string(*n),
        ScriptValue::String(s) => s.as_str().to_owned(),
        ScriptValue::Array(a) => join_elements(a, ",", joining),
        ScriptValue::Object(_) => "[object Object]".to_owned(),
        ScriptValue::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
    }
}

/// `Array.prototype.join`. Nullish elements, and arrays that are already
/// being joined further out, render as empty strings.
pub fn join(array: &ScriptArray, separator: &str) -> String {
    join_elements(array, separator, &mut Vec::new())
}

fn join_elements(array: &ScriptArray, separator: &str, joining: &mut Vec<ScriptArray>) -> String {
    if joining.len() >= MAX_CONVERSION_DEPTH || joining.iter().any(|a| ScriptArray::ptr_eq(a, array)) {
        return String::new();
    }
    joining.push(array.clone());
    let text = array
        .to_vec()
        .iter()
        .map(|element| match element {
            ScriptValue::Undefined | ScriptValue::Null => String::new(),
            other => display(other, joining),
        })
        .collect::<Vec<_>>()
        .join(separator);
    joining.pop();
    text
}

/// Numeric conversion used by arithmetic and comparison.
pub fn to_number(value: &ScriptValue) -> f64 {
    match value {
        ScriptValue::Undefined => f64::NAN,
        ScriptValue::Null => 0.0,
        ScriptValue::Boolean(b) => f64::from(u8::from(*b)),
        ScriptValue::Number(n) => *n,
        ScriptValue::String(s) => string_to_number(s.as_str()),
        ScriptValue::Array(a) if a.len() <= 1 => string_to_number(&to_display_string(value)),
        ScriptValue::Array(_) | ScriptValue::Object(_) | ScriptValue::Function(_) => f64::NAN,
    }
}

fn string_to_number(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |v| v as f64);
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts "inf" and "nan", the probe language does not.
        _ if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => trimmed.parse().unwrap_or(f64::NAN),
    }
}

/// `parseInt`: leading whitespace, optional sign, digits in `radix` (10 by
/// default, 16 for a `0x` prefix). Stops at the first invalid digit.
pub fn parse_int(text: &str, radix: Option<u32>) -> f64 {
    let mut rest = text.trim_start();
    let mut sign = 1.0;
    if let Some(stripped) = rest.strip_prefix('-') {
        sign = -1.0;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }
    let mut radix = radix.unwrap_or(0);
    if radix == 0 || radix == 16 {
        if let Some(stripped) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            rest = stripped;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let digits: Vec<u32> = rest.chars().map_while(|c| c.to_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let magnitude = digits
        .iter()
        .fold(0.0, |acc, &d| acc * f64::from(radix) + f64::from(d));
    sign * magnitude
}

fn json_number(n: f64) -> Json {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        // Integral values print without a trailing ".0".
        return Json::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(Json::Null, Json::Number)
}

/// Why a value has no JSON text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonError {
    /// An array or object contains itself
    Cyclic,
    /// Nesting exceeds [`MAX_CONVERSION_DEPTH`]
    TooDeep,
}

/// Convert a value to JSON. `Ok(None)` means the value has no JSON form
/// (undefined or a function) and is skipped by the enclosing object.
pub fn to_json(value: &ScriptValue) -> Result<Option<Json>, JsonError> {
    json_value(value, &mut Vec::new())
}

fn enter(value: &ScriptValue, open: &mut Vec<ScriptValue>) -> Result<(), JsonError> {
    if open.iter().any(|outer| outer.strict_equals(value)) {
        return Err(JsonError::Cyclic);
    }
    if open.len() >= MAX_CONVERSION_DEPTH {
        return Err(JsonError::TooDeep);
    }
    open.push(value.clone());
    Ok(())
}

fn json_value(value: &ScriptValue, open: &mut Vec<ScriptValue>) -> Result<Option<Json>, JsonError> {
    let json = match value {
        ScriptValue::Undefined | ScriptValue::Function(_) => return Ok(None),
        ScriptValue::Null => Json::Null,
        ScriptValue::Boolean(b) => Json::Bool(*b),
        ScriptValue::Number(n) => json_number(*n),
        ScriptValue::String(s) => Json::String(s.as_str().to_owned()),
        ScriptValue::Array(a) => {
            enter(value, open)?;
            let mut items = Vec::with_capacity(a.len());
            for element in a.to_vec() {
                items.push(json_value(&element, open)?.unwrap_or(Json::Null));
            }
            open.pop();
            Json::Array(items)
        }
        ScriptValue::Object(o) => {
            enter(value, open)?;
            let mut map = Map::new();
            for (key, property) in o.entries() {
                if let Some(json) = json_value(&property, open)? {
                    map.insert(key, json);
                }
            }
            open.pop();
            Json::Object(map)
        }
    };
    Ok(Some(json))
}

/// `JSON.stringify(value, _, indent)`.
pub fn stringify(value: &ScriptValue, indent: usize) -> Result<Option<String>, JsonError> {
    let Some(json) = to_json(value)? else {
        return Ok(None);
    };
    if indent == 0 {
        return Ok(Some(json.to_string()));
    }
    let indent = " ".repeat(indent.min(10));
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    if json.serialize(&mut serializer).is_err() {
        return Ok(None);
    }
    Ok(String::from_utf8(out).ok())
}
