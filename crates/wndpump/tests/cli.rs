use std::process::Command;

fn wndpump(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_wndpump"))
        .args(args)
        .output()
        .expect("failed to execute wndpump")
}

#[test]
fn help_lists_every_subcommand_and_version_matches_the_package() {
    // Act
    let help = wndpump(&["--help"]);
    let version = wndpump(&["--version"]);

    // Assert
    assert!(help.status.success());
    let help = String::from_utf8_lossy(&help.stdout);
    for subcommand in ["init", "run", "demo"] {
        assert!(help.contains(subcommand), "help is missing {subcommand}");
    }
    assert!(version.status.success());
    assert_eq!(
        String::from_utf8_lossy(&version.stdout).trim(),
        format!("wndpump {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn init_stdout_prints_a_template_that_names_both_sections() {
    // Act
    let output = wndpump(&["init", "--stdout"]);

    // Assert
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[window]"));
    assert!(stdout.contains("[logging]"));
    assert!(stdout.contains("registration = \"reuse\""));
}

#[test]
fn demo_dispatches_every_posted_message() {
    // Act
    let output = wndpump(&["demo", "--backend", "loopback", "--count", "3"]);

    // Assert
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("posted 3, dispatched 3"));
    assert!(stdout.contains("0x0402 wparam=2 lparam=0"));
}

#[test]
fn demo_json_reports_messages_in_post_order() {
    // Act
    let output = wndpump(&["demo", "--backend", "loopback", "--count", "4", "--json"]);

    // Assert
    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("demo should print JSON");
    let codes: Vec<u64> = report["dispatched"]
        .as_array()
        .expect("dispatched array")
        .iter()
        .filter_map(|d| d["code"].as_u64())
        .collect();
    assert_eq!(codes, vec![0x400, 0x401, 0x402, 0x403]);
    assert_eq!(report["exit"], "queue_closed");
    assert_eq!(report["cancelled"], true);
    assert_eq!(report["backend"], "loopback");
}

#[test]
fn demo_rejects_excessive_count() {
    // Act
    let output = wndpump(&["demo", "--backend", "loopback", "--count", "5000"]);

    // Assert
    assert!(!output.status.success());
}

#[test]
fn run_stops_when_timeout_elapses() {
    // Act
    let output = wndpump(&["run", "--backend", "loopback", "--timeout-secs", "1"]);

    // Assert
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pumping messages"));
    assert!(stdout.contains("Pump stopped after 0 messages."));
}

#[cfg(windows)]
#[test]
fn demo_runs_against_real_windows() {
    // Act
    let output = wndpump(&["demo", "--backend", "win32", "--count", "2"]);

    // Assert
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("posted 2, dispatched 2"));
}
