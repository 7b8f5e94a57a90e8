//! CLI integration tests for command orchestration.
//!
//! Tests cover:
//! - Argument parsing for every subcommand
//! - Target resolution (--file, --config, precedence, errors)
//! - Mutating commands against real files on disk
//! - Bulk import from a source CSV with header fallbacks
//! - Cursor-based dump output

mod common;

use clap::Parser;
use common::*;
use recstore::cli::{self, Cli, Command, Target};
use recstore::domain::error::StoreError;
use std::path::PathBuf;
use tempfile::TempDir;

fn file_target(dir: &TempDir) -> Target {
    Target {
        file: Some(store_path(dir)),
        config: None,
    }
}

fn exit_debug(code: std::process::ExitCode) -> String {
    format!("{:?}", code)
}

mod parsing {
    use super::*;

    #[test]
    fn append_collects_fields_including_negative_numbers() {
        let cli = Cli::try_parse_from(["recstore", "append", "--file", "a.csv", "BHP", "-1.5"])
            .unwrap();
        match cli.command {
            Command::Append { target, fields } => {
                assert_eq!(target.file, Some(PathBuf::from("a.csv")));
                assert_eq!(fields, vec!["BHP", "-1.5"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn append_requires_fields() {
        assert!(Cli::try_parse_from(["recstore", "append", "--file", "a.csv"]).is_err());
    }

    #[test]
    fn set_takes_position() {
        let cli =
            Cli::try_parse_from(["recstore", "set", "-f", "a.csv", "-p", "3", "x", "y"]).unwrap();
        assert!(matches!(cli.command, Command::Set { position: 3, .. }));
    }

    #[test]
    fn global_log_level_after_subcommand() {
        let cli = Cli::try_parse_from(["recstore", "count", "-f", "a.csv", "--log-level", "DEBUG"])
            .unwrap();
        assert_eq!(cli.log_level(), "debug");
    }

    #[test]
    fn log_level_from_config_then_default() {
        let ini = write_temp_ini("[store]\npath = a.csv\n\n[log]\nlevel = info\n");
        let config = ini.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["recstore", "dump", "--config", config]).unwrap();
        assert_eq!(cli.log_level(), "info");

        let cli = Cli::try_parse_from(["recstore", "index", "-f", "a.csv"]).unwrap();
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn import_arguments() {
        let cli = Cli::try_parse_from([
            "recstore", "import", "-f", "a.csv", "--source", "b.csv", "--header", "x,y",
        ])
        .unwrap();
        match cli.command {
            Command::Import { source, header, .. } => {
                assert_eq!(source, PathBuf::from("b.csv"));
                assert_eq!(header.as_deref(), Some("x,y"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}

mod target_resolution {
    use super::*;

    #[test]
    fn file_only() {
        let config = cli::resolve_target(&Target {
            file: Some(PathBuf::from("a.csv")),
            config: None,
        })
        .unwrap();
        assert_eq!(config.path, PathBuf::from("a.csv"));
        assert!(config.header.is_none());
    }

    #[test]
    fn config_only() {
        let ini = write_temp_ini("[store]\npath = /data/prices.csv\nheader = date,close\n");
        let config = cli::resolve_target(&Target {
            file: None,
            config: Some(ini.path().to_path_buf()),
        })
        .unwrap();
        assert_eq!(config.path, PathBuf::from("/data/prices.csv"));
        assert_eq!(fields(&config.header.unwrap()), vec!["date", "close"]);
    }

    #[test]
    fn file_overrides_config_path_but_keeps_header() {
        let ini = write_temp_ini("[store]\npath = /data/prices.csv\nheader = date,close\n");
        let config = cli::resolve_target(&Target {
            file: Some(PathBuf::from("other.csv")),
            config: Some(ini.path().to_path_buf()),
        })
        .unwrap();
        assert_eq!(config.path, PathBuf::from("other.csv"));
        assert!(config.header.is_some());
    }

    #[test]
    fn file_with_config_lacking_path() {
        let ini = write_temp_ini("[log]\nlevel = debug\n");
        let config = cli::resolve_target(&Target {
            file: Some(PathBuf::from("a.csv")),
            config: Some(ini.path().to_path_buf()),
        })
        .unwrap();
        assert_eq!(config.path, PathBuf::from("a.csv"));
    }

    #[test]
    fn config_without_path_is_missing() {
        let ini = write_temp_ini("[store]\nheader = a,b\n");
        let err = cli::resolve_target(&Target {
            file: None,
            config: Some(ini.path().to_path_buf()),
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::ConfigMissing { key, .. } if key == "path"));
    }

    #[test]
    fn neither_file_nor_config() {
        let err = cli::resolve_target(&Target::default()).unwrap_err();
        assert!(matches!(err, StoreError::Configuration { .. }));
    }

    #[test]
    fn unreadable_config_is_parse_error() {
        let err = cli::resolve_target(&Target {
            file: None,
            config: Some(PathBuf::from("/nonexistent/recstore.ini")),
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::ConfigParse { .. }));
    }

    #[test]
    fn config_create_dirs_opens_nested_path() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("deep").join("prices.csv");
        let ini = write_temp_ini(&format!(
            "[store]\npath = {}\ncreate_dirs = true\n",
            nested.display()
        ));
        let target = Target {
            file: None,
            config: Some(ini.path().to_path_buf()),
        };
        assert_eq!(cli::set_record(&target, None, &["x".to_string()]).unwrap(), 0);
        assert!(nested.exists());
    }
}

mod commands {
    use super::*;

    #[test]
    fn append_set_delete_round() {
        let dir = TempDir::new().unwrap();
        let target = file_target(&dir);

        let a = cli::set_record(&target, None, &["A".to_string(), "B".to_string()]).unwrap();
        let b = cli::set_record(&target, None, &["C".to_string(), "D".to_string()]).unwrap();
        assert_eq!((a, b), (0, 1));

        cli::set_record(&target, Some(0), &["A".to_string(), "BB".to_string()]).unwrap();
        assert_eq!(read_file(&store_path(&dir)), "A,BB\nC,D\n");

        assert_eq!(cli::delete_record(&target, 0).unwrap(), 1);
        assert_eq!(read_file(&store_path(&dir)), "C,D\n");
    }

    #[test]
    fn delete_missing_position_is_range_error() {
        let dir = TempDir::new().unwrap();
        let target = file_target(&dir);
        let err = cli::delete_record(&target, 0).unwrap_err();
        assert!(matches!(err, StoreError::Range { position: 0, count: 0 }));
    }

    #[test]
    fn dump_walks_all_records() {
        let dir = TempDir::new().unwrap();
        std::fs::write(store_path(&dir), "a,b\n\"c,d\",e\n").unwrap();
        let lines = cli::dump_records(&file_target(&dir)).unwrap();
        assert_eq!(
            lines,
            vec![(0, "a,b".to_string()), (1, "\"c,d\",e".to_string())]
        );
    }

    #[test]
    fn append_to_crlf_file_keeps_crlf() {
        let dir = TempDir::new().unwrap();
        std::fs::write(store_path(&dir), "a,b\r\n").unwrap();
        let target = file_target(&dir);

        assert_eq!(cli::set_record(&target, None, &["c".to_string(), "d".to_string()]).unwrap(), 1);
        assert_eq!(read_file(&store_path(&dir)), "a,b\r\nc,d\r\n");
        assert_eq!(
            cli::dump_records(&target).unwrap(),
            vec![(0, "a,b".to_string()), (1, "c,d".to_string())]
        );
    }

    #[test]
    fn run_reports_failure_exit_code() {
        let dir = TempDir::new().unwrap();
        let args = Cli {
            log_level: None,
            command: Command::Delete {
                target: file_target(&dir),
                position: 5,
            },
        };
        assert_eq!(exit_debug(cli::run(args)), exit_debug(std::process::ExitCode::from(3)));
    }

    #[test]
    fn run_get_absent_is_success() {
        let dir = TempDir::new().unwrap();
        let args = Cli {
            log_level: None,
            command: Command::Get {
                target: file_target(&dir),
                position: 0,
            },
        };
        assert_eq!(exit_debug(cli::run(args)), exit_debug(std::process::ExitCode::SUCCESS));
    }

    #[test]
    fn run_missing_directory_is_config_exit_code() {
        let dir = TempDir::new().unwrap();
        let args = Cli {
            log_level: None,
            command: Command::Count {
                target: Target {
                    file: Some(dir.path().join("nope").join("a.csv")),
                    config: None,
                },
            },
        };
        assert_eq!(exit_debug(cli::run(args)), exit_debug(std::process::ExitCode::from(2)));
    }
}

mod import {
    use super::*;

    #[test]
    fn import_with_explicit_header() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.csv");
        std::fs::write(&source, "BHP,45.10\r\nCBA,120.5\r\n").unwrap();

        let count = cli::import_file(&file_target(&dir), &source, Some("code,close")).unwrap();
        assert_eq!(count, 3);
        assert_eq!(
            read_file(&store_path(&dir)),
            "code,close\nBHP,45.10\nCBA,120.5\n"
        );
    }

    #[test]
    fn import_header_from_config() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.csv");
        std::fs::write(&source, "2024-01-15,105.0\n").unwrap();
        let ini = write_temp_ini(&format!(
            "[store]\npath = {}\nheader = date,close\n",
            store_path(&dir).display()
        ));
        let target = Target {
            file: None,
            config: Some(ini.path().to_path_buf()),
        };

        assert_eq!(cli::import_file(&target, &source, None).unwrap(), 2);
        assert_eq!(read_file(&store_path(&dir)), "date,close\n2024-01-15,105.0\n");
    }

    #[test]
    fn import_replaces_existing_rows() {
        let dir = TempDir::new().unwrap();
        std::fs::write(store_path(&dir), PRICES).unwrap();
        let source = dir.path().join("source.csv");
        std::fs::write(&source, "x\n").unwrap();

        assert_eq!(cli::import_file(&file_target(&dir), &source, None).unwrap(), 1);
        assert_eq!(read_file(&store_path(&dir)), "x\n");
    }

    #[test]
    fn missing_source_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        std::fs::write(store_path(&dir), PRICES).unwrap();

        let err = cli::import_file(&file_target(&dir), &dir.path().join("absent.csv"), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::Resource { .. }));
        assert_eq!(read_file(&store_path(&dir)), PRICES);
    }

    #[test]
    fn blank_header_flag_rejected() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.csv");
        std::fs::write(&source, "x\n").unwrap();

        let err = cli::import_file(&file_target(&dir), &source, Some("  ")).unwrap_err();
        assert!(matches!(err, StoreError::Configuration { .. }));
    }
}
