//! Builtin globals and the methods of arrays and strings

use core_types::{ErrorKind, FunctionHandle, FunctionKind, ScriptObject, ScriptValue};
use regex::Regex;

use crate::budget::ELEMENT_SIZE;
use crate::exception::{Abort, EvalResult};
use crate::format::{join, parse_int, stringify, to_display_string, to_number, JsonError};
use crate::scope::Scope;
use crate::vm::Vm;

/// Functions every profiling context starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `print(...values)`
    Print,
    /// `parseInt(text, radix?)`
    ParseInt,
    /// `seal(value)`
    Seal,
    /// `JSON.stringify(value, replacer?, indent?)`
    JsonStringify,
    /// `Object.keys(value)`
    ObjectKeys,
}

impl Builtin {
    const ALL: [Builtin; 5] = [
        Builtin::Print,
        Builtin::ParseInt,
        Builtin::Seal,
        Builtin::JsonStringify,
        Builtin::ObjectKeys,
    ];

    /// Name the builtin is bound under.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::ParseInt => "parseInt",
            Builtin::Seal => "seal",
            Builtin::JsonStringify => "stringify",
            Builtin::ObjectKeys => "keys",
        }
    }

    fn from_id(id: u32) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    fn handle(self) -> ScriptValue {
        ScriptValue::Function(FunctionHandle::new(self.name(), FunctionKind::Builtin(self as u32)))
    }
}

/// Bind the builtin globals in `scope`.
pub(crate) fn install_globals(scope: &Scope) {
    for builtin in [Builtin::Print, Builtin::ParseInt, Builtin::Seal] {
        scope.declare(builtin.name(), builtin.handle(), true);
    }
    let json = ScriptObject::new();
    json.set("stringify", Builtin::JsonStringify.handle());
    json.seal();
    scope.declare("JSON", ScriptValue::Object(json), false);

    let object = ScriptObject::new();
    object.set("keys", Builtin::ObjectKeys.handle());
    object.seal();
    scope.declare("Object", ScriptValue::Object(object), false);

    scope.declare("undefined", ScriptValue::Undefined, false);
    scope.declare("NaN", ScriptValue::Number(f64::NAN), false);
    scope.declare("Infinity", ScriptValue::Number(f64::INFINITY), false);
}

fn arg(args: &[ScriptValue], index: usize) -> ScriptValue {
    args.get(index).cloned().unwrap_or_default()
}

/// Resolve a possibly negative position argument against `len`.
fn relative_index(value: Option<&ScriptValue>, len: usize, default: usize) -> usize {
    match value {
        None | Some(ScriptValue::Undefined) => default,
        Some(value) => {
            let n = to_number(value);
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            if n < 0.0 {
                (len as f64 + n).max(0.0) as usize
            } else {
                n.min(len as f64) as usize
            }
        }
    }
}

fn not_a_function(receiver: &ScriptValue, name: &str, line: u32) -> Abort {
    let kind = match receiver {
        ScriptValue::Array(_) => "array",
        _ => "string",
    };
    Abort::error(ErrorKind::TypeError, format!("{kind}.{name} is not a function"), line)
}

impl Vm<'_> {
    pub(crate) fn call_builtin(&mut self, id: u32, args: &[ScriptValue], line: u32) -> EvalResult<ScriptValue> {
        let Some(builtin) = Builtin::from_id(id) else {
            return Err(Abort::error(ErrorKind::InternalError, format!("unknown builtin #{id}"), line));
        };
        match builtin {
            Builtin::Print => {
                let text = args.iter().map(to_display_string).collect::<Vec<_>>().join(" ");
                (self.ctx.print)(&text);
                Ok(ScriptValue::Undefined)
            }
            Builtin::ParseInt => {
                let text = to_display_string(&arg(args, 0));
                let radix = args
                    .get(1)
                    .map(to_number)
                    .filter(|r| r.is_finite() && *r != 0.0)
                    .map(|r| r.trunc().clamp(0.0, 64.0) as u32);
                Ok(ScriptValue::Number(parse_int(&text, radix)))
            }
            Builtin::Seal => {
                let value = arg(args, 0);
                match &value {
                    ScriptValue::Object(obj) => obj.seal(),
                    ScriptValue::Array(arr) => arr.seal(),
                    _ => {}
                }
                Ok(value)
            }
            Builtin::JsonStringify => {
                let indent = args
                    .get(2)
                    .map(to_number)
                    .filter(|n| n.is_finite() && *n > 0.0)
                    .map_or(0, |n| n as usize);
                match stringify(&arg(args, 0), indent) {
                    Ok(Some(text)) => self.new_string(text, line),
                    Ok(None) => Ok(ScriptValue::Undefined),
                    Err(JsonError::Cyclic) => Err(Abort::error(ErrorKind::TypeError, "cyclic object value", line)),
                    Err(JsonError::TooDeep) => {
                        Err(Abort::error(ErrorKind::RangeError, "value nested too deeply", line))
                    }
                }
            }
            Builtin::ObjectKeys => {
                let keys = match &arg(args, 0) {
                    ScriptValue::Object(obj) => obj.keys(),
                    ScriptValue::Array(arr) => (0..arr.len()).map(|i| i.to_string()).collect(),
                    ScriptValue::String(s) => (0..s.as_str().chars().count()).map(|i| i.to_string()).collect(),
                    other @ (ScriptValue::Undefined | ScriptValue::Null) => {
                        return Err(Abort::error(
                            ErrorKind::TypeError,
                            format!("cannot convert {} to object", to_display_string(other)),
                            line,
                        ))
                    }
                    _ => Vec::new(),
                };
                let keys = keys
                    .into_iter()
                    .map(|key| self.new_string(key, line))
                    .collect::<EvalResult<Vec<_>>>()?;
                self.new_array(keys, line)
            }
        }
    }

    /// Invoke `receiver.name(...args)` on an array or string.
    pub(crate) fn call_method(&mut self, receiver: &ScriptValue, name: &str, args: Vec<ScriptValue>, line: u32) -> EvalResult<ScriptValue> {
        match receiver {
            ScriptValue::Array(_) => self.array_method(receiver, name, args, line),
            ScriptValue::String(s) => self.string_method(s.as_str(), receiver, name, args, line),
            _ => Err(not_a_function(receiver, name, line)),
        }
    }

    fn array_method(&mut self, receiver: &ScriptValue, name: &str, args: Vec<ScriptValue>, line: u32) -> EvalResult<ScriptValue> {
        let ScriptValue::Array(arr) = receiver else {
            return Err(not_a_function(receiver, name, line));
        };
        match name {
            "push" => {
                if arr.is_sealed() {
                    return Err(Abort::error(ErrorKind::TypeError, "cannot push to a sealed array", line));
                }
                self.charge(ELEMENT_SIZE.saturating_mul(args.len()), "growing an array", line)?;
                for value in args {
                    arr.push(value);
                }
                Ok(ScriptValue::Number(arr.len() as f64))
            }
            "join" => {
                let separator = match args.first() {
                    None | Some(ScriptValue::Undefined) => ",".to_owned(),
                    Some(sep) => to_display_string(sep),
                };
                let text = join(arr, &separator);
                self.new_string(text, line)
            }
            "indexOf" => {
                let needle = arg(&args, 0);
                let elements = arr.to_vec();
                let start = relative_index(args.get(1), elements.len(), 0);
                let found = elements
                    .iter()
                    .enumerate()
                    .skip(start)
                    .find(|(_, element)| element.strict_equals(&needle))
                    .map_or(-1.0, |(i, _)| i as f64);
                Ok(ScriptValue::Number(found))
            }
            "slice" => {
                let elements = arr.to_vec();
                let start = relative_index(args.first(), elements.len(), 0);
                let end = relative_index(args.get(1), elements.len(), elements.len());
                let slice = elements.get(start..end.max(start)).unwrap_or_default().to_vec();
                self.new_array(slice, line)
            }
            "forEach" | "map" | "filter" => {
                let callback = arg(&args, 0);
                if !matches!(callback, ScriptValue::Function(_)) {
                    return Err(Abort::error(
                        ErrorKind::TypeError,
                        format!("{} is not a function", to_display_string(&callback)),
                        line,
                    ));
                }
                let mut results = Vec::new();
                for (index, element) in arr.to_vec().into_iter().enumerate() {
                    let call_args = [element.clone(), ScriptValue::Number(index as f64), receiver.clone()];
                    let result = self.call_value(&callback, &call_args, line)?;
                    match name {
                        "map" => results.push(result),
                        "filter" if result.is_truthy() => results.push(element),
                        _ => {}
                    }
                }
                if name == "forEach" {
                    Ok(ScriptValue::Undefined)
                } else {
                    self.new_array(results, line)
                }
            }
            _ => Err(not_a_function(receiver, name, line)),
        }
    }

    fn string_method(&mut self, text: &str, receiver: &ScriptValue, name: &str, args: Vec<ScriptValue>, line: u32) -> EvalResult<ScriptValue> {
        match name {
            "indexOf" => {
                let needle = to_display_string(&arg(&args, 0));
                let chars: Vec<char> = text.chars().collect();
                let start = relative_index(args.get(1), chars.len(), 0);
                let byte_start = text.char_indices().nth(start).map_or(text.len(), |(b, _)| b);
                let found = text[byte_start..]
                    .find(&needle)
                    .map_or(-1.0, |b| (start + text[byte_start..byte_start + b].chars().count()) as f64);
                Ok(ScriptValue::Number(found))
            }
            "slice" => {
                let chars: Vec<char> = text.chars().collect();
                let start = relative_index(args.first(), chars.len(), 0);
                let end = relative_index(args.get(1), chars.len(), chars.len());
                let slice: String = chars.get(start..end.max(start)).unwrap_or_default().iter().collect();
                self.new_string(slice, line)
            }
            "split" => {
                let pieces: Vec<String> = match args.first() {
                    None | Some(ScriptValue::Undefined) => vec![text.to_owned()],
                    Some(separator) => {
                        let separator = to_display_string(separator);
                        if separator.is_empty() {
                            text.chars().map(String::from).collect()
                        } else {
                            text.split(separator.as_str()).map(str::to_owned).collect()
                        }
                    }
                };
                let pieces = pieces
                    .into_iter()
                    .map(|piece| self.new_string(piece, line))
                    .collect::<EvalResult<Vec<_>>>()?;
                self.new_array(pieces, line)
            }
            "match" => {
                let pattern = to_display_string(&arg(&args, 0));
                let regex = Regex::new(&pattern).map_err(|e| {
                    Abort::error(ErrorKind::SyntaxError, format!("invalid regular expression: {e}"), line)
                })?;
                let Some(captures) = regex.captures(text) else {
                    return Ok(ScriptValue::Null);
                };
                let groups = captures
                    .iter()
                    .map(|group| match group {
                        Some(m) => self.new_string(m.as_str().to_owned(), line),
                        None => Ok(ScriptValue::Undefined),
                    })
                    .collect::<EvalResult<Vec<_>>>()?;
                self.new_array(groups, line)
            }
            _ => Err(not_a_function(receiver, name, line)),
        }
    }
}
