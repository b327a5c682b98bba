//! Source locations and the diagnostics buffer.

use serde::{Deserialize, Serialize};

/// A position in the input file. Lines and columns are 1-based; a zero line
/// marks a location that did not come from source (synthesized nodes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loc {
    pub line: u32,
    pub col: u32,
}

impl Loc {
    pub const NONE: Loc = Loc { line: 0, col: 0 };

    pub fn new(line: u32, col: u32) -> Self {
        Loc { line, col }
    }

    pub fn is_none(&self) -> bool {
        self.line == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub loc: Loc,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    /// Render as `file:line:col: error: message`, with the offending source
    /// line and a caret when the location is known.
    pub fn render(&self, file: &str, source: Option<&str>) -> String {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        if self.loc.is_none() {
            return format!("{}: {}: {}", file, level, self.message);
        }
        let mut out = format!(
            "{}:{}:{}: {}: {}",
            file, self.loc.line, self.loc.col, level, self.message
        );
        if let Some(src) = source {
            if let Some(line) = src.lines().nth(self.loc.line as usize - 1) {
                out.push('\n');
                out.push_str(line);
                out.push('\n');
                for _ in 1..self.loc.col {
                    out.push(' ');
                }
                out.push('^');
            }
        }
        out
    }
}

/// Ordered diagnostics buffer for one compilation.
#[derive(Debug)]
pub struct Diagnostics {
    pub file: String,
    diags: Vec<Diagnostic>,
    error_count: usize,
}

impl Diagnostics {
    pub fn new(file: impl Into<String>) -> Self {
        Diagnostics {
            file: file.into(),
            diags: Vec::new(),
            error_count: 0,
        }
    }

    pub fn error(&mut self, loc: Loc, message: impl Into<String>) {
        self.error_count += 1;
        self.diags.push(Diagnostic {
            loc,
            severity: Severity::Error,
            message: message.into(),
        });
    }

    pub fn warning(&mut self, loc: Loc, message: impl Into<String>) {
        self.diags.push(Diagnostic {
            loc,
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diags.iter()
    }

    pub fn len(&self) -> usize {
        self.diags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    pub fn render_all(&self, source: Option<&str>) -> Vec<String> {
        self.diags
            .iter()
            .map(|d| d.render(&self.file, source))
            .collect()
    }
}
