#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;

pub const SECTION_ID: &str = "0190a0c4-7d1e-7a3b-9c2d-5e6f70819203";

/// Runs the `jadwal` binary against a throwaway database and config
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self { temp_dir, db_path }
    }

    /// A command wired to this harness's database. `JADWAL_CONFIG` points at
    /// a file that does not exist so a developer's `jadwal.toml` is ignored.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("jadwal").expect("Failed to find jadwal binary");
        cmd.env("JADWAL_DATABASE_PATH", &self.db_path)
            .env("JADWAL_CONFIG", self.temp_dir.path().join("absent.toml"))
            .env_remove("JADWAL_DEFAULT_TENANT")
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Runs a successful command and returns its stdout.
    pub fn stdout_of(&self, args: &[&str]) -> String {
        let output = self.run_success(args).get_output().stdout.clone();
        String::from_utf8(output).expect("stdout is not UTF-8")
    }

    /// Registers a tenant in Asia/Jakarta and returns its ID.
    pub fn add_tenant(&self, name: &str) -> String {
        let stdout = self.stdout_of(&["tenant", "add", name, "--timezone", "Asia/Jakarta"]);
        extract_id(&stdout)
    }

    /// Creates a Monday 08:00-09:00 schedule for Q1 2025 and returns its ID.
    pub fn add_monday_schedule(&self, slug: &str) -> String {
        let stdout = self.stdout_of(&[
            "schedule", "add",
            "--section", SECTION_ID,
            "--from", "2025-01-01",
            "--to", "2025-03-31",
            "--slug", slug,
            "--on", "mon",
            "--start", "08:00",
            "--end", "09:00",
        ]);
        extract_id(&stdout)
    }
}

/// Pulls the UUID out of a "(ID: ...)" confirmation line.
pub fn extract_id(stdout: &str) -> String {
    let start = stdout.find("(ID: ").expect("no ID in output") + "(ID: ".len();
    stdout[start..start + 36].to_string()
}

/// Counts table rows whose first column holds `needle`.
pub fn count_rows_containing(stdout: &str, needle: &str) -> usize {
    stdout.lines().filter(|line| line.contains(needle)).count()
}
