// ---------------------------------------------------------------------------
// line_editor: rustyline wrapper for the lantern REPL
// ---------------------------------------------------------------------------
//
// Emacs-style editing with persistent history in ~/.lantern_history.
// Only commands the player actually submitted are remembered, so "again"
// at the prompt and arrow-key recall agree.

use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor, EditMode};
use std::path::{Path, PathBuf};

/// Maximum number of history entries to retain.
const MAX_HISTORY: usize = 1000;

/// History file name (stored in the user's home directory).
const HISTORY_FILE: &str = ".lantern_history";

/// Result of a single line read.
pub enum ReadResult {
    Line(String),
    /// Ctrl-C: abandon the current line and re-prompt.
    Interrupted,
    /// Ctrl-D or closed stdin.
    Eof,
}

pub struct LineEditor {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
}

impl LineEditor {
    /// An editor with history loaded from `~/.lantern_history`. A missing
    /// or unreadable history file starts an empty history.
    pub fn new() -> Result<Self, ReadlineError> {
        Self::with_history(home_dir().map(|home| home.join(HISTORY_FILE)))
    }

    pub fn with_history(history_path: Option<PathBuf>) -> Result<Self, ReadlineError> {
        let config = Config::builder()
            .edit_mode(EditMode::Emacs)
            .max_history_size(MAX_HISTORY)?
            .auto_add_history(false)
            .build();
        let mut editor = DefaultEditor::with_config(config)?;
        if let Some(path) = &history_path {
            let _ = editor.load_history(path);
        }
        Ok(Self { editor, history_path })
    }

    pub fn history_path(&self) -> Option<&Path> {
        self.history_path.as_deref()
    }

    pub fn read_line(&mut self, prompt: &str) -> ReadResult {
        match self.editor.readline(prompt) {
            Ok(line) => ReadResult::Line(line),
            Err(ReadlineError::Interrupted) => ReadResult::Interrupted,
            Err(_) => ReadResult::Eof,
        }
    }

    /// Remember a submitted command and persist the history. Write
    /// failures are ignored.
    pub fn add_history(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let _ = self.editor.add_history_entry(line);
        if let Some(path) = &self.history_path {
            let _ = self.editor.save_history(path);
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_file_name() {
        if let Some(home) = home_dir() {
            let ed = LineEditor::new().unwrap();
            assert_eq!(ed.history_path(), Some(home.join(".lantern_history").as_path()));
        }
    }

    #[test]
    fn test_history_is_persisted() {
        let tmp = std::env::temp_dir().join("lantern_test_history");
        let _ = std::fs::remove_file(&tmp);
        let mut ed = LineEditor::with_history(Some(tmp.clone())).unwrap();
        ed.add_history("take lamp");
        ed.add_history("   ");
        let saved = std::fs::read_to_string(&tmp).unwrap_or_default();
        let _ = std::fs::remove_file(&tmp);
        assert!(saved.contains("take lamp"));
    }

    #[test]
    fn test_corrupt_history_file_does_not_crash() {
        let tmp = std::env::temp_dir().join("lantern_test_corrupt_history");
        std::fs::write(&tmp, b"\xff\xfe\x00\x01binary garbage\n\x80\x90").unwrap();
        let ed = LineEditor::with_history(Some(tmp.clone()));
        let _ = std::fs::remove_file(&tmp);
        assert!(ed.is_ok());
    }
}
