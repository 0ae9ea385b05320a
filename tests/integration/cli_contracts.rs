//! Output contracts for CLI commands that run without a live server.

use std::fs;
use std::path::PathBuf;

use driftwatch::error::MonitorError;
use driftwatch::history::{FileRecord, HistoryStore, Snapshot};
use driftwatch::tooling::{CliContext, Commands, HistoryCommands};
use tempfile::TempDir;

use crate::support::with_xdg_env;

fn write_config(temp_dir: &TempDir) -> (PathBuf, PathBuf) {
    let history_file = temp_dir.path().join("history.json");
    let config_path = temp_dir.path().join("driftwatch.toml");
    let contents = format!(
        r#"
[server]
host = "sftp.test.invalid"
username = "monitor"
password = "secret"

[monitor]
target_path = "/web/stages"

[history]
file = "{}"
"#,
        history_file.display()
    );
    fs::write(&config_path, contents).unwrap();
    (config_path, history_file)
}

#[test]
fn status_json_contract_has_required_fields() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_env(&temp_dir, || {
        let (config_path, _history_file) = write_config(&temp_dir);
        let cli = CliContext::new(Some(config_path)).unwrap();

        let output = cli
            .execute(&Commands::Status {
                format: "json".to_string(),
            })
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            parsed.get("server").and_then(|v| v.as_str()),
            Some("monitor@sftp.test.invalid:2222")
        );
        assert_eq!(
            parsed.get("target_path").and_then(|v| v.as_str()),
            Some("/web/stages")
        );
        assert_eq!(
            parsed.get("interval_secs").and_then(|v| v.as_u64()),
            Some(300)
        );
        assert!(parsed
            .get("channels")
            .and_then(|v| v.as_array())
            .is_some_and(|channels| channels.is_empty()));
        assert!(parsed.get("config_path").and_then(|v| v.as_str()).is_some());
        assert_eq!(
            parsed.get("history_exists").and_then(|v| v.as_bool()),
            Some(false)
        );
        assert_eq!(parsed.get("tracked_files").and_then(|v| v.as_u64()), Some(0));
    });
}

#[test]
fn status_text_flags_a_missing_history() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_env(&temp_dir, || {
        let (config_path, _history_file) = write_config(&temp_dir);
        let cli = CliContext::new(Some(config_path)).unwrap();

        let output = cli
            .execute(&Commands::Status {
                format: "text".to_string(),
            })
            .unwrap();

        assert!(output.contains("monitor@sftp.test.invalid:2222"));
        assert!(output.contains("no cycle recorded yet"));
        assert!(output.contains("Channels: none"));
    });
}

#[test]
fn history_show_treats_a_missing_file_as_empty() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_env(&temp_dir, || {
        let (config_path, _history_file) = write_config(&temp_dir);
        let cli = CliContext::new(Some(config_path)).unwrap();

        let output = cli
            .execute(&Commands::History {
                command: HistoryCommands::Show {
                    format: "text".to_string(),
                    limit: 50,
                },
            })
            .unwrap();

        assert!(output.contains("Tracked: 0"));
    });
}

#[test]
fn history_show_json_exposes_tracked_records() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_env(&temp_dir, || {
        let (config_path, history_file) = write_config(&temp_dir);
        let mut snapshot = Snapshot::default();
        snapshot.files.insert(
            "/web/stages/a.txt".to_string(),
            FileRecord {
                digest: "deadbeef".to_string(),
                size: 4,
            },
        );
        HistoryStore::new(history_file).save(&snapshot).unwrap();

        let cli = CliContext::new(Some(config_path)).unwrap();
        let output = cli
            .execute(&Commands::History {
                command: HistoryCommands::Show {
                    format: "json".to_string(),
                    limit: 0,
                },
            })
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let record = parsed
            .get("files")
            .and_then(|files| files.get("/web/stages/a.txt"))
            .expect("tracked file should appear in history output");
        assert_eq!(record.get("digest").and_then(|v| v.as_str()), Some("deadbeef"));
        assert_eq!(record.get("size").and_then(|v| v.as_u64()), Some(4));
    });
}

#[test]
fn history_reset_backs_up_only_when_a_snapshot_exists() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_env(&temp_dir, || {
        let (config_path, history_file) = write_config(&temp_dir);
        let cli = CliContext::new(Some(config_path)).unwrap();
        let reset = Commands::History {
            command: HistoryCommands::Reset,
        };

        let first = cli.execute(&reset).unwrap();
        assert!(first.contains("No previous snapshot"));
        assert!(history_file.exists());

        // The first reset wrote an empty snapshot, so now there is
        // something to back up.
        let second = cli.execute(&reset).unwrap();
        assert!(second.contains("backed up"));

        let backups = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .contains("_backup_")
            })
            .count();
        assert_eq!(backups, 1);
    });
}

#[test]
fn notify_test_without_channels_is_a_config_error() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_env(&temp_dir, || {
        let (config_path, _history_file) = write_config(&temp_dir);
        let cli = CliContext::new(Some(config_path)).unwrap();

        let err = cli
            .execute(&Commands::NotifyTest { channel: None })
            .unwrap_err();

        assert!(matches!(err, MonitorError::ConfigError(_)));
        assert!(err.to_string().contains("No notification channels"));
    });
}

#[test]
fn unknown_output_format_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_env(&temp_dir, || {
        let (config_path, _history_file) = write_config(&temp_dir);
        let cli = CliContext::new(Some(config_path)).unwrap();

        let err = cli
            .execute(&Commands::Status {
                format: "yaml".to_string(),
            })
            .unwrap_err();

        assert!(matches!(err, MonitorError::ConfigError(_)));
    });
}

#[test]
fn missing_explicit_config_file_fails_loading() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_env(&temp_dir, || {
        let missing = temp_dir.path().join("nowhere.toml");

        let err = CliContext::new(Some(missing)).unwrap_err();

        assert!(matches!(err, MonitorError::ConfigError(_)));
    });
}

#[test]
fn init_writes_starter_files_and_refuses_to_clobber() {
    let temp_dir = TempDir::new().unwrap();
    with_xdg_env(&temp_dir, || {
        let previous_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(temp_dir.path()).unwrap();

        let cli = CliContext::new(None).unwrap();
        let output = cli.execute(&Commands::Init { force: false }).unwrap();
        assert!(output.contains("driftwatch.toml"));
        assert!(temp_dir.path().join("driftwatch.toml").exists());
        assert!(temp_dir.path().join(".env.example").exists());

        let err = cli.execute(&Commands::Init { force: false }).unwrap_err();
        assert!(err.to_string().contains("already exists"));

        cli.execute(&Commands::Init { force: true }).unwrap();

        // The starter file is picked up by default config discovery.
        let reloaded = CliContext::new(None).unwrap();
        assert_eq!(reloaded.config().server.host, "sftp.example.jp");

        std::env::set_current_dir(previous_dir).unwrap();
    });
}
