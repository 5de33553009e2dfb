//! Resolves the OS-appropriate config directory the way `whtiehack-zeroclaw`
//! locates its own (spec SPEC_FULL §1 ambient config note): `directories`'
//! `ProjectDirs`, with an explicit `--config-dir` CLI override always
//! winning.

use directories::ProjectDirs;
use std::path::PathBuf;

pub fn default_config_dir() -> PathBuf {
    ProjectDirs::from("dev", "estuary", "estuaryd")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".estuaryd"))
}

pub fn default_config_file(config_dir: &std::path::Path) -> PathBuf {
    config_dir.join("estuaryd.toml")
}

pub fn ca_cert_path(config_dir: &std::path::Path) -> PathBuf {
    config_dir.join("ca.pem")
}

pub fn ca_key_path(config_dir: &std::path::Path) -> PathBuf {
    config_dir.join("ca.key")
}

pub fn contexts_snapshot_path(config_dir: &std::path::Path) -> PathBuf {
    config_dir.join("contexts.json")
}

pub fn enrollment_snapshot_path(config_dir: &std::path::Path) -> PathBuf {
    config_dir.join("enrollment.json")
}
