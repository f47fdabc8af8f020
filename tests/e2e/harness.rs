use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// A throwaway workspace with its own settings file and fake tools.
pub struct CliHarness {
    _root: TempDir,
    workspace: PathBuf,
}

impl CliHarness {
    pub fn new(name: &str) -> Self {
        let root = tempfile::Builder::new()
            .prefix(&format!("rns-e2e-{}-", name))
            .tempdir()
            .expect("create temp workspace");
        let workspace = root.path().to_path_buf();
        fs::create_dir_all(workspace.join("bin")).expect("create bin dir");
        fs::create_dir_all(workspace.join("apps")).expect("create apps dir");

        let h = Self {
            _root: root,
            workspace,
        };
        h.write_settings(&format!(
            r#"[workspace]
scratch_location = "{scratch}"
generation_horizon_ms = 1000
tick_interval_ms = 50

[app]
appsLocation = "{apps}"
someVariable = 123
"#,
            scratch = h.scratch_path().display(),
            apps = h.apps_path().display(),
        ));
        h
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn apps_path(&self) -> PathBuf {
        self.workspace.join("apps")
    }

    pub fn scratch_path(&self) -> PathBuf {
        self.workspace.join("scratch")
    }

    pub fn write_settings(&self, content: &str) {
        fs::write(self.workspace.join("rns.toml"), content).expect("write rns.toml");
    }

    pub fn add_app(&self, directory: &str) {
        fs::create_dir_all(self.apps_path().join(directory)).expect("create app dir");
    }

    /// Install a `/bin/sh` script named `name` ahead of the real tools.
    #[cfg(unix)]
    pub fn fake_tool(&self, name: &str, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = self.workspace.join("bin").join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write fake tool");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("make fake tool executable");
    }

    pub fn run_cli(&self, args: &[&str]) -> Output {
        let path = std::env::var_os("PATH").unwrap_or_default();
        let mut paths = vec![self.workspace.join("bin")];
        paths.extend(std::env::split_paths(&path));

        Command::new(env!("CARGO_BIN_EXE_rns"))
            .args(args)
            .current_dir(&self.workspace)
            .env("PATH", std::env::join_paths(paths).expect("join PATH"))
            .env("NO_COLOR", "1")
            .env_remove("RNS_CONFIG")
            .env_remove("RNS_APPS_LOCATION")
            .env_remove("RNS_LOG")
            .output()
            .expect("run rns")
    }
}

pub fn combined(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}
