//! Source attribution for script errors and for target functions.

use std::fmt;
use std::sync::Arc;

/// A file/line pair used to attribute script errors.
///
/// # Examples
///
/// ```
/// use core_types::SourceLocation;
///
/// let location = SourceLocation::new("probe.js", 3);
/// assert_eq!(location.to_string(), "probe.js:3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// File name given when the script was evaluated
    pub filename: String,
    /// 1-based line number
    pub line: u32,
}

impl SourceLocation {
    /// Creates a location.
    pub fn new(filename: impl Into<String>, line: u32) -> Self {
        Self {
            filename: filename.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.line)
    }
}

/// Script attached to a target function.
///
/// Natively implemented functions have no script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInfo {
    /// File the function was compiled from
    pub filename: Arc<str>,
    /// First line of the function's source
    pub base_line: u32,
    /// Number of lines the function's source spans
    pub line_extent: u32,
    /// Size of the compiled script in bytes
    pub size: usize,
}

impl ScriptInfo {
    /// Last line of the function's source.
    ///
    /// A zero extent is treated as a single line; the result saturates at
    /// `u32::MAX`.
    pub fn line_end(&self) -> u32 {
        self.base_line.saturating_add(self.line_extent.max(1) - 1)
    }
}
