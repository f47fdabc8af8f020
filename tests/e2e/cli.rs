#![cfg(unix)]

use serial_test::serial;

use crate::harness::{combined, CliHarness};

const FAKE_NPM: &str = r#"if [ "$1" = "install" ]; then
  echo "added 1203 packages in 41s"
  exit 0
fi
echo "Welcome to Metro"
echo "(NOBRIDGE) LOG  hello from the app"
echo "script: $*"
echo "SOME_VARIABLE=$SOME_VARIABLE"
exit 0"#;

#[test]
#[serial]
fn test_run_installs_and_serves() {
    let h = CliHarness::new("run_serve");
    h.add_app("native-app");
    h.fake_tool("npm", FAKE_NPM);

    let output = h.run_cli(&["run"]);
    assert!(
        output.status.success(),
        "rns run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("added 1203 packages"), "stdout: {}", stdout);
    assert!(stdout.contains("script: start"), "stdout: {}", stdout);
    assert!(stdout.contains("SOME_VARIABLE=123"), "stdout: {}", stdout);
    assert!(
        stderr.contains("hello from the app"),
        "bridge logs should be narrated.\nstderr: {}",
        stderr
    );
    assert!(
        !stdout.contains("(NOBRIDGE)"),
        "bridge logs should not reach the raw output.\nstdout: {}",
        stdout
    );
}

#[test]
#[serial]
fn test_run_custom_script() {
    let h = CliHarness::new("run_script");
    h.add_app("native-app");
    h.fake_tool("npm", FAKE_NPM);

    let output = h.run_cli(&["run", "--command", "android"]);
    assert!(output.status.success(), "{}", combined(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("script: run android"));
}

#[test]
#[serial]
fn test_run_install_failure() {
    let h = CliHarness::new("run_install_fail");
    h.add_app("native-app");
    h.fake_tool("npm", "echo 'npm ERR! code ERESOLVE' >&2\nexit 1");

    let output = h.run_cli(&["run"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("npm install"), "stderr: {}", stderr);
    assert!(stderr.contains("ERESOLVE"), "stderr: {}", stderr);
}

#[test]
#[serial]
fn test_create_relocates_generated_app() {
    let h = CliHarness::new("create");
    h.fake_tool(
        "npx",
        r#"echo "Downloading template"
mkdir -p "$3/ios" "$3/.git"
echo '{"name":"'"$3"'"}' > "$3/package.json""#,
    );
    h.fake_tool("rsync", r#"cp -R "$2". "$3""#);
    h.fake_tool("bundle", "echo 'Could not locate Gemfile' >&2\nexit 1");

    let output = h.run_cli(&["create", "shop app"]);
    assert!(
        output.status.success(),
        "rns create failed: {}",
        combined(&output)
    );

    let app_dir = h.apps_path().join("shop-app");
    assert!(app_dir.join("package.json").exists());
    assert!(app_dir.join("ios").is_dir());
    assert!(!app_dir.join(".git").exists(), "generator metadata kept");
    assert!(
        !h.scratch_path().join("ShopApp").exists(),
        "scratch copy kept"
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("Downloading template"), "stdout: {}", stdout);
    assert!(stdout.contains("Created ShopApp"), "stdout: {}", stdout);
    assert!(
        stderr.contains("iOS dependency install failed"),
        "expected a native deps warning.\nstderr: {}",
        stderr
    );
}

#[test]
#[serial]
fn test_create_generator_failure() {
    let h = CliHarness::new("create_fail");
    h.fake_tool("npx", "echo 'npm ERR! 404 Not Found' >&2\nexit 1");

    let output = h.run_cli(&["create"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("App creation failed"), "stderr: {}", stderr);
    assert!(!h.apps_path().join("native-app").exists());
}
