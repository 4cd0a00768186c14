//! Abrupt completion of evaluation
//!
//! A script-level exception carries the thrown value and, when it began as a
//! host error, the original [`ProfilerError`]. An exception that escapes the
//! program is reported as that original error if it still has one, or as a
//! [`ScriptError`] built from the thrown value.

use core_types::{
    ErrorKind, ProfilerError, ScriptError, ScriptObject, ScriptValue, SourceLocation,
};

use crate::format::to_display_string;

/// A value in flight between `throw` and `catch`.
#[derive(Debug, Clone)]
pub struct Thrown {
    /// The thrown value
    pub value: ScriptValue,
    /// Host error this exception was raised from
    pub origin: Option<ProfilerError>,
    /// Line (relative to the evaluated source) where it was raised
    pub line: u32,
}

impl Thrown {
    /// Report an uncaught exception against the evaluated file.
    pub fn into_profiler_error(self, filename: &str, base_line: u32) -> ProfilerError {
        if let Some(origin) = self.origin {
            return origin;
        }
        let location = SourceLocation::new(filename, base_line.saturating_add(self.line.saturating_sub(1)));
        let (kind, message) = match &self.value {
            ScriptValue::Object(obj) => match (obj.get("name"), obj.get("message")) {
                (Some(ScriptValue::String(name)), Some(message)) => {
                    (ErrorKind::from_name(name.as_str()), to_display_string(&message))
                }
                _ => (ErrorKind::Error, format!("uncaught exception: {}", to_display_string(&self.value))),
            },
            other => (ErrorKind::Error, format!("uncaught exception: {}", to_display_string(other))),
        };
        ScriptError::new(kind, message, location).into()
    }
}

/// Why evaluation stopped early.
#[derive(Debug, Clone)]
pub enum Abort {
    /// A catchable exception
    Throw(Thrown),
    /// An error no script handler may intercept
    Fatal(ProfilerError),
}

impl Abort {
    /// Throw a fresh error object of `kind`.
    pub fn error(kind: ErrorKind, message: impl Into<String>, line: u32) -> Self {
        Abort::Throw(Thrown {
            value: ScriptValue::Object(error_object(kind, &message.into())),
            origin: None,
            line,
        })
    }

    /// Raise a host error into script. Fatal errors bypass handlers.
    pub fn from_host(error: ProfilerError, line: u32) -> Self {
        if error.is_fatal() {
            return Abort::Fatal(error);
        }
        let message = match &error {
            ProfilerError::Script(script) => script.message.clone(),
            other => other.to_string(),
        };
        Abort::Throw(Thrown {
            value: ScriptValue::Object(error_object(error.script_kind(), &message)),
            origin: Some(error),
            line,
        })
    }
}

/// Build an error object with `name` and `message` properties.
pub fn error_object(kind: ErrorKind, message: &str) -> ScriptObject {
    let obj = ScriptObject::new();
    obj.set("name", ScriptValue::from(kind.name()));
    obj.set("message", ScriptValue::from(message));
    obj
}

/// Result of evaluating one node.
pub type EvalResult<T> = Result<T, Abort>;
