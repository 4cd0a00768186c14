//! One profiling session: setup, evaluation, teardown.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use core_types::{
    HeapRef, ProfilerError, ProfilerResult, ProfilingContext, ProfilingRuntime, ScriptValue,
    StringFactory, TargetRuntime, TargetString,
};
use tracing::{debug, info, warn};

use crate::bindings::{SessionBindings, CORE_OPERATIONS, HELPER_OPERATIONS};
use crate::config::ProfilerConfig;
use crate::descriptor::{SessionOutcome, SessionStats};
use crate::id_table::IdentifierTable;
use crate::string_mirror::StringMirror;

/// What to run and against which named objects.
///
/// # Examples
///
/// ```
/// use memory_profiler::ProfileRequest;
///
/// let request = ProfileRequest::new("getGCRoots().length", "probe.js")
///     .with_line(5)
///     .with_argument("verbose");
/// assert_eq!(request.line, 5);
/// assert_eq!(request.argument.as_deref(), Some("verbose"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRequest {
    /// Profiling script source
    pub script: String,
    /// File name errors are attributed to
    pub filename: String,
    /// Line the script starts on
    pub line: u32,
    /// Target object whose properties name interesting objects
    pub named_objects: Option<HeapRef>,
    /// Bound to the `argument` global
    pub argument: Option<Arc<str>>,
}

impl ProfileRequest {
    /// Request to run `script`, attributed to `filename` from line 1.
    pub fn new(script: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            filename: filename.into(),
            line: 1,
            named_objects: None,
            argument: None,
        }
    }

    /// Set the first line number.
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    /// Set the named-objects root.
    pub fn with_named_objects(mut self, root: HeapRef) -> Self {
        self.named_objects = Some(root);
        self
    }

    /// Set the `argument` global.
    pub fn with_argument(mut self, argument: impl Into<Arc<str>>) -> Self {
        self.argument = Some(argument.into());
        self
    }
}

/// A script result, copied out of the profiling context.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ProfileValue {
    /// No value; also what arrays, objects and functions become
    #[default]
    Undefined,
    /// `null`
    Null,
    /// A boolean
    Boolean(bool),
    /// A number
    Number(f64),
    /// A string, deep-copied
    String(String),
}

impl ProfileValue {
    /// Copy `value` out of its context.
    pub fn from_script(value: &ScriptValue) -> Self {
        match value {
            ScriptValue::Null => ProfileValue::Null,
            ScriptValue::Boolean(b) => ProfileValue::Boolean(*b),
            ScriptValue::Number(n) => ProfileValue::Number(*n),
            ScriptValue::String(s) => ProfileValue::String(s.as_str().to_owned()),
            ScriptValue::Undefined
            | ScriptValue::Array(_)
            | ScriptValue::Object(_)
            | ScriptValue::Function(_) => ProfileValue::Undefined,
        }
    }

    /// The string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ProfileValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ProfileValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileValue::Undefined => f.write_str("undefined"),
            ProfileValue::Null => f.write_str("null"),
            ProfileValue::Boolean(b) => write!(f, "{b}"),
            ProfileValue::Number(n) => write!(f, "{n}"),
            ProfileValue::String(s) => f.write_str(s),
        }
    }
}

/// Lifecycle of a [`ProfilingSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing allocated yet
    Uninitialized,
    /// Context, table and operations are ready
    Running,
    /// The script ran to completion
    Completed,
    /// Setup or evaluation failed
    Failed,
}

/// Owns everything one profiling invocation allocates.
///
/// Teardown runs exactly once, either explicitly or on drop, whichever
/// comes first.
pub struct ProfilingSession<'t, T: ?Sized, R: ProfilingRuntime> {
    target: &'t T,
    runtime: &'t R,
    config: ProfilerConfig,
    state: SessionState,
    context: Option<R::Context>,
    table: IdentifierTable,
    mirror: StringMirror,
    named_objects: Option<HeapRef>,
    objects: usize,
    host_calls: usize,
    strings_mirrored: usize,
    started: Instant,
    elapsed: Option<Duration>,
}

impl<'t, T, R> ProfilingSession<'t, T, R>
where
    T: TargetRuntime + ?Sized,
    R: ProfilingRuntime,
{
    /// Create a session; nothing is allocated until [`setup`](Self::setup).
    pub fn new(target: &'t T, runtime: &'t R, config: ProfilerConfig) -> Self {
        Self {
            target,
            runtime,
            config,
            state: SessionState::Uninitialized,
            context: None,
            table: IdentifierTable::default(),
            mirror: StringMirror::new(),
            named_objects: None,
            objects: 0,
            host_calls: 0,
            strings_mirrored: 0,
            started: Instant::now(),
            elapsed: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Objects reached by the heap walk.
    pub fn object_count(&self) -> usize {
        self.objects
    }

    /// Create the context, walk the heap and register every operation.
    ///
    /// On failure the session is torn down and left [`SessionState::Failed`].
    pub fn setup(&mut self, request: &ProfileRequest) -> ProfilerResult<()> {
        if self.state != SessionState::Uninitialized {
            return Err(ProfilerError::usage("profiling session was already set up"));
        }
        match self.try_setup(request) {
            Ok(()) => {
                self.state = SessionState::Running;
                info!(objects = self.table.len(), "profiling session ready");
                Ok(())
            }
            Err(error) => {
                warn!(%error, "profiling session setup failed");
                self.state = SessionState::Failed;
                self.teardown();
                Err(error)
            }
        }
    }

    fn try_setup(&mut self, request: &ProfileRequest) -> ProfilerResult<()> {
        let mut context = self.runtime.create_context()?;
        self.table = IdentifierTable::with_capacity(self.config.initial_table_capacity)?;
        self.table.assign_ids(self.target)?;
        self.table.build_reverse_index()?;
        self.objects = self.table.len();
        self.named_objects = request.named_objects;

        let helpers = if self.config.register_helpers {
            HELPER_OPERATIONS
        } else {
            &[]
        };
        for name in CORE_OPERATIONS.iter().chain(helpers) {
            context
                .define_host_function(name)
                .map_err(|e| ProfilerError::setup(format!("registering {name}: {e}")))?;
        }
        let argument = match &request.argument {
            Some(chars) => {
                let target = TargetString::new(chars.clone());
                ScriptValue::String(self.mirror.mirror(&mut context, &target)?)
            }
            None => ScriptValue::Null,
        };
        context.define_global("argument", argument)?;
        let script_name = context.new_string(&request.filename)?;
        context.define_global("scriptName", ScriptValue::String(script_name))?;
        self.context = Some(context);
        Ok(())
    }

    /// Evaluate the script and copy its result out.
    ///
    /// The session is torn down before this returns, whatever the outcome.
    pub fn run(&mut self, request: &ProfileRequest) -> ProfilerResult<ProfileValue> {
        if self.state != SessionState::Running {
            return Err(ProfilerError::usage("profiling session is not running"));
        }
        let result = self.evaluate(request);
        self.state = match &result {
            Ok(_) => SessionState::Completed,
            Err(_) => SessionState::Failed,
        };
        self.teardown();
        result
    }

    fn evaluate(&mut self, request: &ProfileRequest) -> ProfilerResult<ProfileValue> {
        let Some(context) = self.context.as_mut() else {
            return Err(ProfilerError::usage("profiling session has no context"));
        };
        let mut bindings = SessionBindings::new(
            self.target,
            &self.table,
            &mut self.mirror,
            &self.config,
            self.named_objects,
        );
        let result = context.evaluate(&request.script, &request.filename, request.line, &mut bindings);
        self.host_calls = bindings.calls();
        debug!(host_calls = self.host_calls, "profiling script finished");
        result.map(|value| ProfileValue::from_script(&value))
    }
}

impl<T: ?Sized, R: ProfilingRuntime> ProfilingSession<'_, T, R> {
    /// Release the context, the mirror and the table. Safe to call twice.
    pub fn teardown(&mut self) {
        if self.elapsed.is_some() {
            return;
        }
        self.elapsed = Some(self.started.elapsed());
        self.strings_mirrored = self.mirror.len();
        self.context = None;
        self.mirror.release();
        self.table.release();
        if matches!(self.state, SessionState::Uninitialized | SessionState::Running) {
            self.state = SessionState::Failed;
        }
        info!(
            state = ?self.state,
            objects = self.objects,
            strings = self.strings_mirrored,
            host_calls = self.host_calls,
            "profiling session torn down"
        );
    }

    /// Summary of the session; `error` is the failure it ended with.
    pub fn stats(&self, error: Option<&ProfilerError>) -> SessionStats {
        let strings_mirrored = if self.elapsed.is_some() {
            self.strings_mirrored
        } else {
            self.mirror.len()
        };
        SessionStats {
            objects: self.objects,
            strings_mirrored,
            host_calls: self.host_calls,
            outcome: match self.state {
                SessionState::Completed => SessionOutcome::Completed,
                _ => SessionOutcome::Failed,
            },
            elapsed: self.elapsed.unwrap_or_else(|| self.started.elapsed()),
            error: error.map(ToString::to_string),
        }
    }
}

impl<T: ?Sized, R: ProfilingRuntime> Drop for ProfilingSession<'_, T, R> {
    fn drop(&mut self) {
        self.teardown();
    }
}
