use serial_test::serial;

use crate::harness::{combined, CliHarness};

#[test]
#[serial]
fn test_run_unknown_app_lists_alternatives() {
    let h = CliHarness::new("run_unknown");
    h.add_app("native-app");
    h.add_app("shop-app");

    let output = h.run_cli(&["run", "OtherApp"]);
    assert!(
        !output.status.success(),
        "rns run should fail for an unknown app"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("The react native app OtherApp does not exist"),
        "expected a missing app message.\nstderr: {}",
        stderr
    );
    assert!(
        stderr.contains("native-app, shop-app"),
        "expected the available apps to be listed.\nstderr: {}",
        stderr
    );
}

#[test]
#[serial]
fn test_run_without_any_app() {
    let h = CliHarness::new("run_empty");

    let output = h.run_cli(&["run"]);
    assert!(!output.status.success());

    let text = combined(&output);
    assert!(
        text.contains("No apps found"),
        "expected an empty apps location message.\nOutput:\n{}",
        text
    );
}

#[test]
#[serial]
fn test_invalid_settings_file() {
    let h = CliHarness::new("bad_settings");
    h.write_settings("[workspace\nscratch_location = ");

    let output = h.run_cli(&["run"]);
    assert!(!output.status.success());

    let text = combined(&output);
    assert!(
        text.contains("Invalid settings"),
        "expected a settings parse error.\nOutput:\n{}",
        text
    );
}

#[test]
#[serial]
fn test_apps_location_flag_overrides_settings() {
    let h = CliHarness::new("apps_flag");
    let elsewhere = h.workspace().join("elsewhere");
    std::fs::create_dir_all(elsewhere.join("shop-app")).unwrap();

    let output = h.run_cli(&[
        "run",
        "--apps-location",
        elsewhere.to_str().unwrap(),
        "OtherApp",
    ]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Available apps: shop-app"),
        "expected apps from the overridden location.\nstderr: {}",
        stderr
    );
}
