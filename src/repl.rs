//! Interactive line source backed by rustyline

use std::io;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::shell::LineSource;

/// Line editing, history and prompt rendering for interactive sessions.
pub struct ReplSource {
    editor: DefaultEditor,
}

impl ReplSource {
    pub fn new() -> rustyline::Result<Self> {
        Ok(ReplSource {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for ReplSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            // Ctrl+C clears the pending line; the loop re-prompts.
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            // Ctrl+D bails the current context.
            Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
        }
    }
}
