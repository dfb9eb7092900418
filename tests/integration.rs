//! Integration tests for the uitest CLI.
//!
//! These tests drive the compiled `uitest` binary against the `mock_driver`
//! binary, which speaks just enough WebDriver to stand in for a real
//! chromedriver plus the portal it would be steering. Each test spawns its
//! own mock on an ephemeral port, so they are safe to run in parallel.

use std::env;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use uitest::common::parse_listen_address;

/// Everything a test needs: an isolated config directory so a developer's
/// real ~/.config/uitest never leaks in, and the fixture scenarios.
struct TestContext {
    temp_dir: PathBuf,
    config_dir: PathBuf,
    fixtures_dir: PathBuf,
}

impl TestContext {
    fn new(test_name: &str) -> Self {
        let temp_dir = env::temp_dir().join("uitest-tests").join(test_name);
        let _ = fs::remove_dir_all(&temp_dir);
        fs::create_dir_all(&temp_dir).expect("failed to create temp dir");

        let config_dir = temp_dir.join("config");
        fs::create_dir_all(&config_dir).expect("failed to create config dir");

        let fixtures_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self {
            temp_dir,
            config_dir,
            fixtures_dir,
        }
    }

    /// Path to a fixture scenario, as an argument-ready string.
    fn fixture(&self, name: &str) -> String {
        self.fixtures_dir.join(name).display().to_string()
    }

    /// Write a config file the binary will pick up via XDG_CONFIG_HOME.
    fn create_config(&self, content: &str) {
        let dir = self.config_dir.join("uitest");
        fs::create_dir_all(&dir).expect("failed to create config subdir");
        fs::write(dir.join("config.toml"), content).expect("failed to write config");
    }

    fn run_uitest(&self, args: &[&str]) -> CliOutput {
        let output = Command::new(uitest_binary())
            .args(args)
            .env("XDG_CONFIG_HOME", &self.config_dir)
            .output()
            .expect("failed to run uitest binary");

        CliOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }

    fn run_uitest_ok(&self, args: &[&str]) -> CliOutput {
        let output = self.run_uitest(args);
        assert!(
            output.success,
            "uitest {:?} failed\nstdout:\n{}\nstderr:\n{}",
            args, output.stdout, output.stderr
        );
        output
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if env::var("PRESERVE_UITEST_TEST_ARTIFACTS").is_err() {
            let _ = fs::remove_dir_all(&self.temp_dir);
        }
    }
}

struct CliOutput {
    stdout: String,
    stderr: String,
    success: bool,
    code: Option<i32>,
}

/// A running mock WebDriver process. Killed on drop.
struct MockDriver {
    child: Child,
    endpoint: String,
}

impl MockDriver {
    fn start() -> Self {
        let mut child = Command::new(mock_driver_binary())
            .stdout(Stdio::piped())
            .spawn()
            .expect("failed to spawn mock driver");

        let stdout = child.stdout.take().expect("mock driver has no stdout");
        let first_line = BufReader::new(stdout)
            .lines()
            .next()
            .expect("mock driver exited before announcing its address")
            .expect("failed to read mock driver output");
        let addr = parse_listen_address(&first_line)
            .unwrap_or_else(|| panic!("no listen address in '{first_line}'"));

        Self {
            child,
            endpoint: format!("http://{addr}"),
        }
    }
}

impl Drop for MockDriver {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn uitest_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_uitest"))
}

fn mock_driver_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mock_driver"))
}

/// Path to one of the scenario files shipped with the crate.
fn shipped_scenario(name: &str) -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
        .display()
        .to_string()
}

/// A config that keeps element waits short so failure tests finish quickly.
const FAST_CONFIG: &str = "[timeouts]\nfind_ms = 400\npoll_ms = 50\n";

// ============== Tests ==============

#[test]
fn shipped_suite_passes_against_mock_portal() {
    let ctx = TestContext::new("shipped_suite");
    let mock = MockDriver::start();

    let scenarios = [
        shipped_scenario("portal_home.yaml"),
        shipped_scenario("portal_login.yaml"),
        shipped_scenario("work_order.yaml"),
        shipped_scenario("greeting.yaml"),
    ];

    let output = ctx.run_uitest_ok(&[
        "run",
        &scenarios[0],
        &scenarios[1],
        &scenarios[2],
        &scenarios[3],
        "--base-url",
        "http://portal.test",
        "--webdriver-url",
        &mock.endpoint,
    ]);

    assert!(
        output.stdout.contains("4 passed, 0 failed"),
        "unexpected summary:\n{}",
        output.stdout
    );
    assert!(output.stdout.contains("Portal login"));
    assert!(output.stdout.contains("Work order creation"));
    assert!(!output.stdout.contains("Scenario Failed"));
}

#[test]
fn missing_element_fails_after_the_wait() {
    let ctx = TestContext::new("missing_element");
    ctx.create_config(FAST_CONFIG);
    let mock = MockDriver::start();

    let output = ctx.run_uitest(&[
        "run",
        &ctx.fixture("missing_element.yaml"),
        "--base-url",
        "http://portal.test",
        "--webdriver-url",
        &mock.endpoint,
    ]);

    assert!(!output.success, "run should fail:\n{}", output.stdout);
    assert_eq!(output.code, Some(1));
    assert!(
        output.stdout.contains("No element matched '#does-not-exist'"),
        "missing element error not reported:\n{}",
        output.stdout
    );
    assert!(output.stdout.contains("Scenario Failed"));
    assert!(output.stderr.contains("1 of 1 scenarios failed"));
}

#[test]
fn navigation_to_unreachable_host_is_reported() {
    let ctx = TestContext::new("navigation_error");
    let mock = MockDriver::start();

    let output = ctx.run_uitest(&[
        "run",
        &ctx.fixture("unreachable.yaml"),
        "--base-url",
        "http://portal.test",
        "--webdriver-url",
        &mock.endpoint,
    ]);

    assert!(!output.success);
    assert!(
        output
            .stdout
            .contains("Navigation to 'http://unreachable.invalid/' failed"),
        "navigation error not reported:\n{}",
        output.stdout
    );
}

#[test]
fn failing_scenario_does_not_stop_the_suite() {
    let ctx = TestContext::new("suite_continues");
    ctx.create_config(FAST_CONFIG);
    let mock = MockDriver::start();

    let output = ctx.run_uitest(&[
        "run",
        &ctx.fixture("missing_element.yaml"),
        &ctx.fixture("portal_banner.yaml"),
        "--base-url",
        "http://portal.test",
        "--webdriver-url",
        &mock.endpoint,
    ]);

    assert!(!output.success);
    assert_eq!(output.code, Some(1));
    // The second scenario still ran to completion
    assert!(
        output.stdout.contains("Portal banner"),
        "second scenario missing:\n{}",
        output.stdout
    );
    assert!(output.stdout.contains("Scenario Passed"));
    assert!(
        output.stdout.contains("1 passed, 1 failed"),
        "unexpected summary:\n{}",
        output.stdout
    );
}

#[test]
fn soft_mode_keeps_running_after_a_failed_assertion() {
    let ctx = TestContext::new("soft_mode");
    ctx.create_config(FAST_CONFIG);
    let mock = MockDriver::start();

    // Hard mode stops at the failed assertion
    let output = ctx.run_uitest(&[
        "run",
        &ctx.fixture("soft_assertions.yaml"),
        "--base-url",
        "http://portal.test",
        "--webdriver-url",
        &mock.endpoint,
    ]);
    assert!(!output.success);
    assert!(output.stdout.contains("Step 2"));
    assert!(
        !output.stdout.contains("Step 3"),
        "hard mode should stop before step 3:\n{}",
        output.stdout
    );

    // Soft mode records the failure and carries on
    let output = ctx.run_uitest(&[
        "run",
        &ctx.fixture("soft_assertions.yaml"),
        "--base-url",
        "http://portal.test",
        "--webdriver-url",
        &mock.endpoint,
        "--soft",
    ]);
    assert!(!output.success, "a soft failure still fails the run");
    assert!(
        output.stdout.contains("Step 3"),
        "soft mode should reach step 3:\n{}",
        output.stdout
    );
    assert!(output.stdout.contains("Scenario Failed (1 failure)"));
}

#[test]
fn each_scenario_gets_a_fresh_session() {
    let ctx = TestContext::new("fresh_sessions");
    let mock = MockDriver::start();

    // Running the login scenario twice only works if the second run starts
    // logged out, i.e. in a brand new browser session.
    let login = shipped_scenario("portal_login.yaml");
    let output = ctx.run_uitest_ok(&[
        "run",
        &login,
        &login,
        "--base-url",
        "http://portal.test",
        "--webdriver-url",
        &mock.endpoint,
    ]);

    assert!(
        output.stdout.contains("2 passed, 0 failed"),
        "unexpected summary:\n{}",
        output.stdout
    );
}

#[test]
fn shadow_hosted_elements_need_the_pierce_flag() {
    let ctx = TestContext::new("pierce_flag");
    ctx.create_config(FAST_CONFIG);
    let mock = MockDriver::start();

    // The login inputs live inside a shadow root: plain CSS lookup
    // cannot see them
    let output = ctx.run_uitest(&[
        "run",
        &ctx.fixture("shadow_plain.yaml"),
        "--base-url",
        "http://portal.test",
        "--webdriver-url",
        &mock.endpoint,
    ]);
    assert!(!output.success);
    assert!(
        output.stdout.contains("No element matched"),
        "plain lookup should miss the shadow input:\n{}",
        output.stdout
    );

    // The same selector resolves once piercing is on
    ctx.run_uitest_ok(&[
        "run",
        &ctx.fixture("shadow_pierced.yaml"),
        "--base-url",
        "http://portal.test",
        "--webdriver-url",
        &mock.endpoint,
    ]);
}

#[test]
fn wait_for_times_out_with_the_condition_in_the_message() {
    let ctx = TestContext::new("wait_timeout");
    let mock = MockDriver::start();

    let output = ctx.run_uitest(&[
        "run",
        &ctx.fixture("wait_timeout.yaml"),
        "--base-url",
        "http://portal.test",
        "--webdriver-url",
        &mock.endpoint,
    ]);

    assert!(!output.success);
    assert!(
        output.stdout.contains("not met within 300 ms"),
        "wait timeout not reported:\n{}",
        output.stdout
    );
}

#[test]
fn typing_into_a_button_reports_not_interactable() {
    let ctx = TestContext::new("not_interactable");
    let mock = MockDriver::start();

    let output = ctx.run_uitest(&[
        "run",
        &ctx.fixture("type_into_button.yaml"),
        "--base-url",
        "http://portal.test",
        "--webdriver-url",
        &mock.endpoint,
    ]);

    assert!(!output.success);
    assert!(
        output.stdout.contains("is not interactable"),
        "interactability error not reported:\n{}",
        output.stdout
    );
}

#[test]
fn force_click_bypasses_an_overlaying_dialog() {
    let ctx = TestContext::new("force_click");
    let mock = MockDriver::start();

    // A plain click on something behind the open dialog is intercepted
    let output = ctx.run_uitest(&[
        "run",
        &ctx.fixture("click_behind_dialog.yaml"),
        "--base-url",
        "http://portal.test",
        "--webdriver-url",
        &mock.endpoint,
    ]);
    assert!(!output.success);
    assert!(
        output.stdout.contains("is not interactable"),
        "intercepted click not reported:\n{}",
        output.stdout
    );

    // The same click goes through when forced
    let output = ctx.run_uitest_ok(&[
        "run",
        &ctx.fixture("forced_click.yaml"),
        "--base-url",
        "http://portal.test",
        "--webdriver-url",
        &mock.endpoint,
    ]);
    assert!(output.stdout.contains("Scenario Passed"));
}

#[test]
fn check_validates_scenarios_without_a_browser() {
    let ctx = TestContext::new("check_command");

    // No mock driver running: check must not need one
    let valid = shipped_scenario("greeting.yaml");
    let output = ctx.run_uitest_ok(&["check", &valid]);
    assert!(
        output.stdout.contains("Greeting service"),
        "valid scenario not listed:\n{}",
        output.stdout
    );

    let output = ctx.run_uitest(&["check", &valid, &ctx.fixture("bad_wait.yaml")]);
    assert!(!output.success);
    assert_eq!(output.code, Some(1));
    assert!(
        output.stdout.contains("wait_for needs"),
        "validation problem not shown:\n{}",
        output.stdout
    );
    assert!(output.stderr.contains("1 of 2 scenarios failed"));
}

#[test]
fn unknown_action_is_rejected_at_parse_time() {
    let ctx = TestContext::new("unknown_action");

    let output = ctx.run_uitest(&["check", &ctx.fixture("unknown_action.yaml")]);
    assert!(!output.success);
    assert!(
        output.stdout.contains("Invalid scenario file"),
        "parse error not shown:\n{}",
        output.stdout
    );
}
