//! Common test utilities for vmpilot integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Isolated home directory and config file for one test
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub config_path: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let config_path = temp_dir.path().join(".vmpilot").join("config.json");
        Ok(Self {
            temp_dir,
            config_path,
        })
    }

    /// Command pointed at this environment's config file
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_vmpilot"));
        cmd.env("HOME", self.temp_dir.path());
        cmd.arg("--config").arg(&self.config_path);
        cmd
    }

    /// Write a config file from raw JSON
    pub fn write_config(&self, json: &str) -> anyhow::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, json)?;
        Ok(())
    }

    /// Write a file next to the config and return its path
    pub fn write_file(&self, name: &str, content: &str) -> anyhow::Result<PathBuf> {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
