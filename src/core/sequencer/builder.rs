use crate::domain::error::{SeqComError, SeqComResult};
use std::path::Path;

/// Script-memory write command the generation pass renumbers lines with
pub const SCRIPT_WRITE_LINE: &str = ":scr_wrl";
/// Script-memory read command
pub const SCRIPT_READ_LINE: &str = ":scr_rdl";
/// Start/stop command for on-device script execution
pub const SCRIPT_RUN: &str = ":scr_run";
/// Lines starting with this prefix are skipped by batch runs
pub const COMMENT_PREFIX: &str = ">>>";

/// Recipe for one built command line
#[derive(Debug, Clone, Default)]
pub struct CommandTemplate {
    pub command_type: String,
    pub wrapper_type: Option<String>,
    pub variable: Option<String>,
    pub use_index: bool,
}

/// One entry of a generation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCommand {
    pub index: u32,
    pub command: String,
}

/// Builder state: the editable script buffer, the list of lines actually
/// built through it, and the monotonic index counter.
#[derive(Debug, Clone, Default)]
pub struct ScriptBuilder {
    buffer: String,
    commands: Vec<String>,
    index_counter: u32,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a command line from the template and append it.
    ///
    /// The variable renders as `wrapper{var}` when a wrapper is given and as
    /// the default `${var}` wrap otherwise. Indexed commands take the current
    /// counter value and advance it; non-indexed commands never touch it.
    pub fn add_command(&mut self, template: &CommandTemplate) -> String {
        let command_type = template.command_type.trim();

        let variable = template
            .variable
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(|var| match template.wrapper_type.as_deref().filter(|w| !w.is_empty()) {
                Some(wrapper) => format!("{}{{{}}}", wrapper, var),
                None => format!("${{{}}}", var),
            })
            .unwrap_or_default();

        let line = if template.use_index {
            let line = format!("{} {} \"{}\"", command_type, self.index_counter, variable);
            self.index_counter += 1;
            line
        } else {
            format!("{} \"{}\"", command_type, variable)
        };

        self.buffer.push_str(&line);
        self.buffer.push('\n');
        self.commands.push(line.clone());
        line
    }

    /// Replace the index counter with a parsed value.
    ///
    /// A non-numeric value leaves the counter untouched.
    pub fn set_index(&mut self, value: &str) -> SeqComResult<u32> {
        let parsed = value.trim().parse::<u32>().map_err(|_| {
            SeqComError::Validation(format!("index must be a non-negative integer: '{}'", value))
        })?;
        self.index_counter = parsed;
        Ok(parsed)
    }

    /// Full reset of buffer, command list and counter.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.commands.clear();
        self.index_counter = 0;
    }

    /// Replace the buffer with operator-edited text. The command list and
    /// counter are untouched: only built or loaded lines are tracked.
    pub fn set_buffer(&mut self, text: &str) {
        self.buffer = text.to_string();
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn index(&self) -> u32 {
        self.index_counter
    }

    /// Replace buffer and command list from loaded text; the counter resumes
    /// at the number of non-blank lines so indexed adds continue correctly.
    pub fn load_text(&mut self, text: &str) {
        self.buffer = text.to_string();
        self.commands = script_lines(text).map(str::to_string).collect();
        self.index_counter = self.commands.len() as u32;
    }

    /// Persist the raw buffer as plain UTF-8 text, no header or metadata.
    pub fn save(&self, path: &Path) -> SeqComResult<()> {
        std::fs::write(path, &self.buffer)?;
        Ok(())
    }

    pub fn load(&mut self, path: &Path) -> SeqComResult<()> {
        let text = std::fs::read_to_string(path)?;
        self.load_text(&text);
        Ok(())
    }
}

/// Non-blank lines of a script buffer, in order.
pub(crate) fn script_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter(|line| !line.trim().is_empty())
}

/// Pure generation pass: renumber every non-blank buffer line under a fresh
/// local index starting at 0. Sends nothing and shares no state with the
/// command list.
pub fn generate(buffer: &str) -> Vec<GeneratedCommand> {
    script_lines(buffer)
        .enumerate()
        .map(|(index, line)| GeneratedCommand {
            index: index as u32,
            command: format!("{} {} {}", SCRIPT_WRITE_LINE, index, line),
        })
        .collect()
}
