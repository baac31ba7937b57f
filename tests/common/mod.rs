//! Shared test support: a scripted command runner.
//!
//! Commands are matched by longest prefix against the full command line
//! (`program arg1 arg2 ...`); unmatched commands succeed with empty output.
//! Every invocation is recorded for assertions. `curl -o` downloads are
//! materialized as stub files so install flows can move them into place.

use dind_setup::exec::{CommandOutput, CommandRunner};
use std::path::Path;
use std::sync::Mutex;

/// A successful command output with the given stdout.
pub fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
        exit_code: Some(0),
        success: true,
    }
}

/// A failed command output with the given stderr.
pub fn err(stderr: &str) -> CommandOutput {
    CommandOutput {
        stdout: String::new(),
        stderr: stderr.to_string(),
        exit_code: Some(1),
        success: false,
    }
}

#[derive(Default)]
pub struct FakeRunner {
    responses: Vec<(String, CommandOutput)>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for every command line starting with `prefix`.
    /// The longest matching prefix wins.
    pub fn on(mut self, prefix: &str, output: CommandOutput) -> Self {
        self.responses.push((prefix.to_string(), output));
        self
    }

    /// All recorded command lines.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded command lines starting with `prefix`.
    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }

    fn dispatch(&self, program: &str, args: &[&str]) -> CommandOutput {
        let cmdline = if args.is_empty() {
            program.to_string()
        } else {
            format!("{} {}", program, args.join(" "))
        };
        self.calls.lock().unwrap().push(cmdline.clone());

        // curl -o <dest>: materialize the download so installs can proceed
        if program == "curl" {
            if let Some(pos) = args.iter().position(|a| *a == "-o") {
                if let Some(dest) = args.get(pos + 1) {
                    if let Some(parent) = Path::new(dest).parent() {
                        let _ = std::fs::create_dir_all(parent);
                    }
                    let _ = std::fs::write(dest, b"#!/bin/sh\nexit 0\n");
                }
            }
        }

        self.responses
            .iter()
            .filter(|(prefix, _)| cmdline.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| ok(""))
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<CommandOutput> {
        Ok(self.dispatch(program, args))
    }

    fn run_in(&self, _dir: &Path, program: &str, args: &[&str]) -> anyhow::Result<CommandOutput> {
        Ok(self.dispatch(program, args))
    }

    fn apply_with_env(
        &self,
        program: &str,
        args: &[&str],
        _env: &[(&str, &str)],
    ) -> anyhow::Result<CommandOutput> {
        Ok(self.dispatch(program, args))
    }
}
