//! System prompt and task message assembly

use chrono::Local;

/// Builds the system prompt and the opening user message for a session
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    persona: String,
    output_dir: Option<String>,
}

impl ContextBuilder {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            output_dir: None,
        }
    }

    /// Directory inside the desktop where the model should save its work
    pub fn with_output_dir(mut self, dir: impl Into<String>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Capability header, then persona, then where to save results
    pub fn build_system_prompt(&self) -> String {
        let mut parts = vec![self.capabilities()];

        if !self.persona.trim().is_empty() {
            parts.push(self.persona.trim().to_string());
        }

        if let Some(dir) = &self.output_dir {
            parts.push(format!("Save files you produce under {}.", dir));
        }

        parts.join("\n\n")
    }

    fn capabilities(&self) -> String {
        let today = Local::now().format("%A, %B %-d, %Y");
        format!(
            r#"<SYSTEM_CAPABILITY>
* You are using an Ubuntu virtual machine with internet access.
* You can run shell commands with the bash tool, control the desktop with the computer tool,
  edit files with the str_replace_editor tool and run Python with the code_execution tool.
* To open chromium, run: "(DISPLAY=:1 chromium --no-sandbox &)" in the terminal.
* The current date is {}.
</SYSTEM_CAPABILITY>"#,
            today
        )
    }

    /// Opening user message: the task, plus optional additional context
    pub fn task_message(task: &str, description: Option<&str>) -> String {
        match description.map(str::trim).filter(|d| !d.is_empty()) {
            Some(description) => format!(
                "Please help me with the following task: {}\n\nAdditional context: {}",
                task.trim(),
                description
            ),
            None => format!("Please help me with the following task: {}", task.trim()),
        }
    }
}
