//! Top-level dispatcher enforcing one session at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use core_types::{ProfilerError, ProfilerResult, ProfilingRuntime, TargetRuntime};
use parking_lot::Mutex;
use tracing::{info_span, warn};

use crate::config::ProfilerConfig;
use crate::descriptor::SessionStats;
use crate::session::{ProfileRequest, ProfileValue, ProfilingSession};

/// Clears the active flag when the session that set it ends.
struct ActiveGuard<'a>(&'a AtomicBool);

impl<'a> ActiveGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ActiveGuard(flag))
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs profiling sessions, at most one at a time.
///
/// # Examples
///
/// ```
/// use memory_profiler::MemoryProfiler;
///
/// let profiler = MemoryProfiler::new();
/// assert!(!profiler.is_active());
/// assert!(profiler.last_stats().is_none());
/// ```
#[derive(Debug, Default)]
pub struct MemoryProfiler {
    config: ProfilerConfig,
    active: AtomicBool,
    last: Mutex<Option<SessionStats>>,
}

impl MemoryProfiler {
    /// Create a dispatcher with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dispatcher with `config`.
    pub fn with_config(config: ProfilerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The process-wide dispatcher behind [`profile_memory`].
    pub fn global() -> &'static MemoryProfiler {
        static GLOBAL: OnceLock<MemoryProfiler> = OnceLock::new();
        GLOBAL.get_or_init(MemoryProfiler::new)
    }

    /// Configuration applied to every session.
    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Returns true while a session is running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Statistics of the most recent session that got past the active check.
    pub fn last_stats(&self) -> Option<SessionStats> {
        self.last.lock().clone()
    }

    /// Run one profiling session over `target`, evaluating the request's
    /// script in a fresh context from `runtime`.
    ///
    /// Fails with [`ProfilerError::Usage`] without side effects if a session
    /// is already running on this dispatcher.
    pub fn profile<T, R>(&self, target: &T, runtime: &R, request: &ProfileRequest) -> ProfilerResult<ProfileValue>
    where
        T: TargetRuntime + ?Sized,
        R: ProfilingRuntime,
    {
        let Some(_guard) = ActiveGuard::acquire(&self.active) else {
            warn!(filename = %request.filename, "rejected nested profiling request");
            return Err(ProfilerError::usage("a profiling session is already running"));
        };
        let span = info_span!("profile", filename = %request.filename);
        let _enter = span.enter();

        let mut session = ProfilingSession::new(target, runtime, self.config.clone());
        let result = session.setup(request).and_then(|()| session.run(request));
        session.teardown();
        *self.last.lock() = Some(session.stats(result.as_ref().err()));
        result
    }
}

/// Profile `target` with the process-wide [`MemoryProfiler`].
pub fn profile_memory<T, R>(target: &T, runtime: &R, request: &ProfileRequest) -> ProfilerResult<ProfileValue>
where
    T: TargetRuntime + ?Sized,
    R: ProfilingRuntime,
{
    MemoryProfiler::global().profile(target, runtime, request)
}
