//! Tests for status, list, remove, open, info, cookies, and generated docs.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::Path;

#[test]
fn cli_parse_status() {
    match parse(&["mediapull", "status", "7-001"]) {
        CliCommand::Status { id } => assert_eq!(id, "7-001"),
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_list() {
    match parse(&["mediapull", "list"]) {
        CliCommand::List { limit } => assert!(limit.is_none()),
        _ => panic!("expected List"),
    }
    match parse(&["mediapull", "list", "--limit", "5"]) {
        CliCommand::List { limit } => assert_eq!(limit, Some(5)),
        _ => panic!("expected List with limit"),
    }
}

#[test]
fn cli_parse_remove() {
    match parse(&["mediapull", "remove", "99"]) {
        CliCommand::Remove { id, delete_files } => {
            assert_eq!(id, "99");
            assert!(!delete_files);
        }
        _ => panic!("expected Remove"),
    }
    match parse(&["mediapull", "remove", "1", "--delete-files"]) {
        CliCommand::Remove { id, delete_files } => {
            assert_eq!(id, "1");
            assert!(delete_files);
        }
        _ => panic!("expected Remove with --delete-files"),
    }
}

#[test]
fn cli_parse_open_commands() {
    match parse(&["mediapull", "open", "3"]) {
        CliCommand::Open { id } => assert_eq!(id, "3"),
        _ => panic!("expected Open"),
    }
    assert!(matches!(parse(&["mediapull", "open-root"]), CliCommand::OpenRoot));
}

#[test]
fn cli_parse_engine_commands() {
    match parse(&["mediapull", "info", "https://example.com/list"]) {
        CliCommand::Info { url } => assert_eq!(url, "https://example.com/list"),
        _ => panic!("expected Info"),
    }
    assert!(matches!(
        parse(&["mediapull", "update-engine"]),
        CliCommand::UpdateEngine
    ));
}

#[test]
fn cli_parse_cookies() {
    match parse(&["mediapull", "cookies", "/tmp/cookies.txt"]) {
        CliCommand::Cookies { file, clear } => {
            assert_eq!(file.as_deref(), Some(Path::new("/tmp/cookies.txt")));
            assert!(!clear);
        }
        _ => panic!("expected Cookies"),
    }
    match parse(&["mediapull", "cookies", "--clear"]) {
        CliCommand::Cookies { file, clear } => {
            assert!(file.is_none());
            assert!(clear);
        }
        _ => panic!("expected Cookies --clear"),
    }
    assert!(Cli::try_parse_from(["mediapull", "cookies"]).is_err());
    assert!(Cli::try_parse_from(["mediapull", "cookies", "x.txt", "--clear"]).is_err());
}

#[test]
fn cli_parse_generated_docs() {
    match parse(&["mediapull", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, clap_complete::Shell::Bash),
        _ => panic!("expected Completions"),
    }
    assert!(matches!(parse(&["mediapull", "manpage"]), CliCommand::Manpage));
}

#[test]
fn cli_definition_is_consistent() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}
