//! TestWorld pattern for declarative integration test setup.

use anyhow::Result;
use assert_cmd::Command;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Declarative test environment builder.
///
/// Every run gets `HOME` and `XDG_CONFIG_HOME` pointed into the temp
/// directory, so the user's own config file never leaks into a test.
///
/// # Example
/// ```no_run
/// use lamina_testing::TestWorld;
///
/// let world = TestWorld::new()
///     .with_file("data/a.txt", "hello")
///     .with_env("LAMINA_OUTPUT", "json");
///
/// let result = world.run(&["ls", "data"]).unwrap();
/// assert!(result.success());
/// ```
pub struct TestWorld {
    temp_dir: TempDir,
    cwd: PathBuf,
    env_vars: HashMap<String, String>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    /// Create a new isolated test environment.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cwd = temp_dir.path().join("work");
        std::fs::create_dir_all(&cwd).expect("Failed to create work dir");
        Self {
            temp_dir,
            cwd,
            env_vars: HashMap::new(),
        }
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the temp directory root.
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory the binary resolves as its config home
    pub fn config_home(&self) -> PathBuf {
        self.temp_dir.path().join("config")
    }

    /// Set an environment variable for CLI execution.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Write a file relative to the working directory.
    pub fn with_file(self, relative: &str, content: &str) -> Self {
        let path = self.cwd.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        self
    }

    /// Write `<config home>/lamina/<name>`; `config.toml` is picked up by default.
    pub fn with_config(self, name: &str, content: &str) -> Self {
        let dir = self.config_home().join("lamina");
        std::fs::create_dir_all(&dir).expect("Failed to create config dir");
        std::fs::write(dir.join(name), content).expect("Failed to write config");
        self
    }

    /// Configure a CLI command with this test environment's settings.
    pub fn configure_command<'a>(&self, cmd: &'a mut Command) -> &'a mut Command {
        cmd.current_dir(&self.cwd)
            .env("HOME", self.temp_dir.path())
            .env("XDG_CONFIG_HOME", self.config_home())
            .env_remove("LAMINA_CONFIG")
            .env_remove("NO_COLOR");

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run the `lamina` binary with `args` and capture its output.
    ///
    /// Uses `Command::cargo_bin()`, which needs the binary built by the
    /// surrounding `cargo test`.
    #[allow(deprecated)]
    pub fn run(&self, args: &[&str]) -> Result<CliResult> {
        let mut cmd = Command::cargo_bin("lamina")
            .map_err(|e| anyhow::anyhow!("Failed to find lamina binary: {}", e))?;
        self.configure_command(&mut cmd);
        cmd.args(args);

        let output = cmd.output()?;
        Ok(CliResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Result of a CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    pub status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CliResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Parse stdout as JSON.
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.stdout)?)
    }

    /// Parse stdout as JSON lines.
    pub fn json_lines(&self) -> Result<Vec<serde_json::Value>> {
        self.stdout
            .lines()
            .map(|line| -> Result<serde_json::Value> { Ok(serde_json::from_str(line)?) })
            .collect()
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}
