//! Script source cache for diagnostic rendering.
//!
//! Engines do not always hand back the text of the line an exception was
//! thrown from. When a host registers its scripts here, emitters can recover
//! the line from `source_name` + `line`.

use std::collections::HashMap;

/// A cached script with line information.
#[derive(Debug, Clone)]
pub struct ScriptSource {
    /// Resource name the engine reports for this script
    pub name: String,
    /// Script text
    pub source: String,
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
}

impl ScriptSource {
    fn new(name: String, source: String) -> Self {
        let line_starts = compute_line_starts(&source);
        Self {
            name,
            source,
            line_starts,
        }
    }

    /// Get the text of a specific line (1-indexed).
    pub fn line_text(&self, line: u32) -> Option<&str> {
        if line == 0 {
            return None;
        }

        let idx = (line - 1) as usize;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .copied()
            .unwrap_or(self.source.len());

        let text = &self.source[start..end];
        Some(text.trim_end_matches('\n').trim_end_matches('\r'))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

fn compute_line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, c) in source.char_indices() {
        if c == '\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// Cache of script sources keyed by resource name.
#[derive(Debug, Default)]
pub struct SourceCache {
    scripts: HashMap<String, ScriptSource>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
        }
    }

    /// Register a script. Re-registering a name replaces its text.
    pub fn add_script(&mut self, name: impl Into<String>, source: impl Into<String>) {
        let name = name.into();
        let script = ScriptSource::new(name.clone(), source.into());
        self.scripts.insert(name, script);
    }

    pub fn get(&self, name: &str) -> Option<&ScriptSource> {
        self.scripts.get(name)
    }

    /// Text of `line` in the script called `name`.
    pub fn line_text(&self, name: &str, line: u32) -> Option<&str> {
        self.scripts.get(name)?.line_text(line)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}
