use std::path::{Path, PathBuf};

use coolipc::config::{CONFIG_ENV, Config, DEFAULT_SOCKET_PATH, SOCKET_ENV};
use coolipc::{Client, Server};
use pretty_assertions::assert_eq;

#[test]
fn test_config_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.server.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
    assert_eq!(cfg.client.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
    assert_eq!(cfg.server.server_header, None);
    assert_eq!(cfg.client.host, coolipc::framework_id());
    assert_eq!(cfg.log.level, "info");
}

#[test]
fn test_config_partial_yaml_keeps_defaults() {
    let cfg = Config::from_yaml_str(
        "server:\n  socket_path: /tmp/cool.sock\n  server_header: coold/1\nlog:\n  level: debug\n",
    )
    .unwrap();

    assert_eq!(cfg.server.socket_path, PathBuf::from("/tmp/cool.sock"));
    assert_eq!(cfg.server.server_header.as_deref(), Some("coold/1"));
    assert_eq!(cfg.client.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
    assert_eq!(cfg.log.level, "debug");
}

#[test]
fn test_config_empty_document() {
    assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
    assert_eq!(Config::from_yaml_str("  \n").unwrap(), Config::default());
}

#[test]
fn test_config_rejects_wrong_types() {
    assert!(Config::from_yaml_str("server: 42").is_err());
}

#[test]
fn test_config_feeds_client_and_server() {
    let cfg = Config::from_yaml_str("client:\n  socket_path: /tmp/a.sock\n  host: ctl\n").unwrap();
    let client = Client::from_config(&cfg.client);
    assert_eq!(client.socket_path(), Path::new("/tmp/a.sock"));
    assert_eq!(client.host(), "ctl");

    let server = Server::from_config(&cfg.server);
    assert_eq!(server.socket_path(), Path::new(DEFAULT_SOCKET_PATH));
}

#[test]
fn test_config_load_from_env() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("coolipc.yaml");
    std::fs::write(&file, "client:\n  host: from-file\n").unwrap();

    // Only this test touches the environment.
    unsafe {
        std::env::set_var(CONFIG_ENV, &file);
        std::env::set_var(SOCKET_ENV, "/tmp/override.sock");
    }
    let loaded = Config::load();
    unsafe {
        std::env::remove_var(CONFIG_ENV);
        std::env::remove_var(SOCKET_ENV);
    }

    let cfg = loaded.unwrap();
    assert_eq!(cfg.client.host, "from-file");
    assert_eq!(cfg.client.socket_path, PathBuf::from("/tmp/override.sock"));
    assert_eq!(cfg.server.socket_path, PathBuf::from("/tmp/override.sock"));
}

#[test]
fn test_config_missing_file_is_an_error() {
    let err = Config::from_file(Path::new("/nonexistent/coolipc.yaml")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/coolipc.yaml"));
}
