//! Common test utilities and harness
//!
//! Provides reusable utilities for functional testing including:
//! - Test environment setup (temp directory with manifest, shaders, images)
//! - Session helpers
//! - Assertion utilities

#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;
use vader::Session;
use vader_core::Diagnostic;

/// Test environment with an isolated manifest directory
pub struct TestEnvironment {
    /// Temporary directory holding the test files
    pub temp_dir: TempDir,
    /// Path to the manifest directory
    pub dir: PathBuf,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path().to_path_buf();
        Self { temp_dir, dir }
    }

    /// Write `vader.toml` and return its path
    pub fn write_manifest(&self, content: &str) -> PathBuf {
        let path = self.dir.join("vader.toml");
        std::fs::write(&path, content).expect("Failed to write test manifest");
        path
    }

    /// Write a shader file next to the manifest
    pub fn write_shader(&self, name: &str, source: &str) -> PathBuf {
        let path = self.dir.join(name);
        std::fs::write(&path, source).expect("Failed to write test shader");
        path
    }

    /// Write a solid-colour PNG next to the manifest
    pub fn write_png(&self, name: &str, width: u32, height: u32) -> PathBuf {
        let path = self.dir.join(name);
        image::RgbaImage::from_pixel(width, height, image::Rgba([0, 128, 255, 255]))
            .save(&path)
            .expect("Failed to write test image");
        path
    }

    /// Write a manifest and load it into a session
    pub fn session(&self, manifest: &str) -> anyhow::Result<Session> {
        let path = self.write_manifest(manifest);
        Session::load(&path)
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

/// Names of `MissingUniform` diagnostics
pub fn missing_uniforms(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::MissingUniform { .. }))
        .map(Diagnostic::name)
        .collect()
}

/// Assert the processed source contains `expected`
pub fn assert_source_contains(session: &Session, expected: &str) {
    assert!(
        session.processed_source().contains(expected),
        "Processed source doesn't contain '{}'. Actual:\n{}",
        expected,
        session.processed_source()
    );
}
