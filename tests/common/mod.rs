use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use atchat::config::EndpointConfig;
use atchat::credentials::StaticStore;
use atchat::orchestrator::RequestOrchestrator;

pub const TEST_KEY: &str = "test-key-123";
pub const TEST_MODEL: &str = "gemini-test";

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Workspace with a handful of files and an excluded directory
#[allow(dead_code)]
pub fn temp_workspace() -> TempDir {
    let dir = TempDir::new().expect("failed to create tempdir");
    let root = dir.path();
    fs::create_dir_all(root.join("src/commands")).unwrap();
    fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    fs::write(root.join("README.md"), "# demo\n").unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::write(root.join("src/lib.rs"), "pub mod commands;\n").unwrap();
    fs::write(root.join("src/commands/mod.rs"), "pub fn run() {}\n").unwrap();
    fs::write(root.join("node_modules/pkg/main.js"), "ignored").unwrap();
    dir
}

#[allow(dead_code)]
pub fn endpoint(api_base: &str, timeout_seconds: u64) -> EndpointConfig {
    EndpointConfig {
        api_base: api_base.to_string(),
        model: TEST_MODEL.to_string(),
        timeout_seconds,
    }
}

/// Orchestrator against `api_base` holding [`TEST_KEY`]
#[allow(dead_code)]
pub fn orchestrator(api_base: &str) -> RequestOrchestrator {
    RequestOrchestrator::new(
        &endpoint(api_base, 5),
        Arc::new(StaticStore::with_secret("geminiApiKey", TEST_KEY)),
        "geminiApiKey",
    )
    .expect("failed to build orchestrator")
}

#[allow(dead_code)]
pub fn generate_path() -> String {
    format!("/v1beta/models/{}:generateContent", TEST_MODEL)
}
