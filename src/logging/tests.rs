// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;

use super::{LogConfig, LogFormat, LogLevel};
use crate::config::LogSettings;

#[test]
fn test_log_level_conversion() {
    let conversions = [
        LogLevel::from_int(-3),
        LogLevel::from_int(0),
        LogLevel::from_int(3),
        LogLevel::from_int(5),
        LogLevel::from_int(100),
    ]
    .map(|level| level.as_u8());
    assert_eq!(conversions, [0, 0, 3, 5, 6]);
}

#[test]
fn test_log_level_out_of_range() {
    let err = LogLevel::new(7).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"invalid value for 'level' in section '[log]': log level must be 0-6, got 7"
    );
    assert_eq!(LogLevel::from_u8(7), None);
}

#[test]
fn test_log_level_parses_names_and_numbers() {
    assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::DEBUG);
    assert_eq!(" TRACE ".parse::<LogLevel>().unwrap(), LogLevel::TRACE);
    assert_eq!("1".parse::<LogLevel>().unwrap(), LogLevel::ERROR);
    assert_eq!("off".parse::<LogLevel>().unwrap(), LogLevel::SILENT);

    let err = "loud".parse::<LogLevel>().unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"invalid value for 'level' in section '[log]': unknown log level 'loud'"
    );
}

#[test]
fn test_log_level_display_round_trips_through_parse() {
    for level in 0..=6 {
        let level = LogLevel::new(level).unwrap();
        assert_eq!(level.to_string().parse::<LogLevel>().unwrap(), level);
    }
}

#[test]
fn test_log_level_deserializes_from_either_form() {
    let levels: Vec<LogLevel> = serde_json::from_str(r#"[4, "info", "6"]"#).unwrap();
    assert_eq!(levels, [LogLevel::DEBUG, LogLevel::INFO, LogLevel::DUMP]);
    assert!(serde_json::from_str::<LogLevel>("9").is_err());
}

#[test]
fn test_filter_keeps_dependencies_quiet_below_dump() {
    insta::assert_snapshot!(LogLevel::DEBUG.to_filter_string(), @"warn,stack_cache=debug");
    insta::assert_snapshot!(LogLevel::DUMP.to_filter_string(), @"trace");
    assert_eq!(LogLevel::SILENT.to_tracing_level(), None);
}

#[test]
fn test_log_config_from_settings() {
    let settings = LogSettings {
        level: LogLevel::INFO,
        file_level: LogLevel::TRACE,
        file: Some("logs/stack-cache.log".into()),
        format: LogFormat::Json,
    };
    let config = LogConfig::from(&settings);

    assert_eq!(config.console_level(), LogLevel::INFO);
    assert_eq!(config.file_level(), LogLevel::TRACE);
    assert_eq!(config.log_file(), Some(Path::new("logs/stack-cache.log")));
    assert_eq!(config.file_format(), LogFormat::Json);
}

#[test]
fn test_log_config_defaults() {
    let config = LogConfig::default();
    assert_eq!(config.console_level(), LogLevel::WARN);
    assert_eq!(config.file_level(), LogLevel::DEBUG);
    assert_eq!(config.file_format(), LogFormat::Text);
    assert!(config.log_file().is_none());
    assert!(config.show_timestamps());
    assert!(!config.show_target());
}
