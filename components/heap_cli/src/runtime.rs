//! Runs profiling scripts against a loaded heap
//!
//! Every script gets its own profiling session: a fresh heap walk, a fresh
//! context, fresh ids. Nothing carries over between runs except the heap.

use std::fmt;
use std::path::Path;

use core_types::{GcThing, HeapRef, RootMapControl, TargetRuntime};
use interpreter::{ContextOptions, Interpreter};
use memory_manager::{load_snapshot, Heap, LoadedHeap};
use memory_profiler::{MemoryProfiler, ProfileRequest, ProfileValue, ProfilerConfig, SessionStats};
use tracing::info;

use crate::error::{CliError, CliResult};

/// Heap plus profiler, ready to run scripts.
pub struct ProbeRunner {
    heap: Heap,
    named_objects: Option<HeapRef>,
    profiler: MemoryProfiler,
    interpreter: Interpreter,
    argument: Option<String>,
    line: u32,
}

impl fmt::Debug for ProbeRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeRunner")
            .field("objects", &self.heap.len())
            .field("named_objects", &self.named_objects)
            .field("options", self.interpreter.options())
            .field("argument", &self.argument)
            .field("line", &self.line)
            .finish_non_exhaustive()
    }
}

impl ProbeRunner {
    /// Create a runner over an already built heap.
    ///
    /// # Example
    /// ```
    /// use heap_cli::ProbeRunner;
    /// use memory_manager::Heap;
    ///
    /// let mut heap = Heap::new();
    /// let root = heap.allocate_plain();
    /// heap.add_object_root(root, "root").unwrap();
    ///
    /// let runner = ProbeRunner::new(heap, None);
    /// let value = runner.execute_string("getGCRoots().length", "inline.js").unwrap();
    /// assert_eq!(value.to_string(), "1");
    /// ```
    pub fn new(heap: Heap, named_objects: Option<HeapRef>) -> Self {
        Self {
            heap,
            named_objects,
            profiler: MemoryProfiler::new(),
            interpreter: Interpreter::new(),
            argument: None,
            line: 1,
        }
    }

    /// Load a snapshot file; its named objects become the named root.
    pub fn from_snapshot(path: impl AsRef<Path>) -> CliResult<Self> {
        let LoadedHeap { heap, named_objects } = load_snapshot(path.as_ref())?;
        info!(path = %path.as_ref().display(), objects = heap.len(), "loaded heap snapshot");
        Ok(Self::new(heap, named_objects))
    }

    /// Use a different profiler configuration.
    pub fn with_config(mut self, config: ProfilerConfig) -> Self {
        self.profiler = MemoryProfiler::with_config(config);
        self
    }

    /// Use different profiling context limits.
    pub fn with_context_options(mut self, options: ContextOptions) -> Self {
        self.interpreter = Interpreter::with_options(options);
        self
    }

    /// Bind `argument` in every script.
    pub fn with_argument(mut self, argument: Option<String>) -> Self {
        self.argument = argument;
        self
    }

    /// Line number scripts start on.
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    /// Use the GC root registered as `name` as the named-objects root.
    pub fn with_named_root(mut self, name: &str) -> CliResult<Self> {
        let mut found = None;
        self.heap.map_gc_roots(&mut |root| match root.thing {
            GcThing::Object(object) if root.name == Some(name) => {
                found = Some(object);
                RootMapControl::Stop
            }
            _ => RootMapControl::Next,
        });
        self.named_objects = Some(found.ok_or_else(|| CliError::UnknownRoot(name.to_string()))?);
        Ok(self)
    }

    /// The profiled heap.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Profile the heap with a script file.
    pub fn execute_file(&self, path: impl AsRef<Path>) -> CliResult<ProfileValue> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        self.execute_string(&source, &path.display().to_string())
    }

    /// Profile the heap with `source`, attributing errors to `filename`.
    pub fn execute_string(&self, source: &str, filename: &str) -> CliResult<ProfileValue> {
        let mut request = ProfileRequest::new(source, filename).with_line(self.line);
        if let Some(root) = self.named_objects {
            request = request.with_named_objects(root);
        }
        if let Some(argument) = &self.argument {
            request = request.with_argument(argument.as_str());
        }
        Ok(self.profiler.profile(&self.heap, &self.interpreter, &request)?)
    }

    /// Statistics of the last run.
    pub fn last_stats(&self) -> Option<SessionStats> {
        self.profiler.last_stats()
    }

    /// Start the interactive loop.
    pub fn repl(&self) -> CliResult<()> {
        crate::repl::run_repl(self)
    }
}
