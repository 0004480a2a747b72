//! Build tool steps and release packaging.
//!
//! Each step is a single call into the build tool (or `tar`) and reports a raw
//! [`CommandResult`]. Paths handed to external tools are relative to the
//! project root, which is the runner's working directory.

use crate::config::{BuildConfig, ReleaseConfig};
use crate::runner::{CommandResult, CommandRunner, CommandSpec};
use std::path::{Path, PathBuf};

/// Deterministic archive file name
pub fn archive_name(project: &str, version: &str) -> String {
    format!("{project}-{version}.tgz")
}

/// Clean, test, build and package steps
#[derive(Debug)]
pub struct BuildPipeline<'a, R> {
    runner: &'a R,
    build: &'a BuildConfig,
    project_root: PathBuf,
    release_dir: PathBuf,
    project_name: String,
}

impl<'a, R: CommandRunner> BuildPipeline<'a, R> {
    /// Pipeline for the project at `project_root`
    pub fn new(runner: &'a R, config: &'a ReleaseConfig, project_root: &Path) -> Self {
        Self {
            runner,
            build: &config.build,
            project_root: project_root.to_path_buf(),
            release_dir: config.release.dir.clone(),
            project_name: config.project_name(project_root),
        }
    }

    /// Release directory, relative to the project root
    pub fn release_dir(&self) -> &Path {
        &self.release_dir
    }

    /// Archive path for `version`, relative to the project root
    pub fn archive_path(&self, version: &str) -> PathBuf {
        self.release_dir
            .join(archive_name(&self.project_name, version))
    }

    async fn tool(&self, args: &[String]) -> CommandResult {
        let command = CommandSpec::new(&self.build.program, args);
        let result = self.runner.run(&command).await;
        if !result.exited_zero {
            log::warn!("[build] {} failed: {}", command, result.failure_reason());
        }
        result
    }

    /// Build tool clean step
    pub async fn clean(&self) -> CommandResult {
        self.tool(&self.build.clean_args).await
    }

    /// Build tool test step; any non-zero exit is a failure
    pub async fn test(&self) -> CommandResult {
        self.tool(&self.build.test_args).await
    }

    /// Build tool release build
    pub async fn build_release(&self) -> CommandResult {
        self.tool(&self.build.build_args).await
    }

    /// Copy files matching the configured schema globs into the release directory
    ///
    /// Returns the copied destinations, relative to the project root. A pattern
    /// matching nothing is not an error.
    pub fn copy_schema_artifacts(&self) -> std::io::Result<Vec<PathBuf>> {
        let target = self.project_root.join(&self.release_dir);
        std::fs::create_dir_all(&target)?;

        let mut copied = Vec::new();
        for pattern in &self.build.schema_globs {
            let full = self.project_root.join(pattern);
            let paths = glob::glob(&full.to_string_lossy()).map_err(|e| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("bad schema pattern '{pattern}': {e}"),
                )
            })?;

            let mut matched = false;
            for path in paths {
                let path = path.map_err(|e| e.into_error())?;
                if !path.is_file() {
                    continue;
                }
                let Some(file_name) = path.file_name() else {
                    continue;
                };
                std::fs::copy(&path, target.join(file_name))?;
                copied.push(self.release_dir.join(file_name));
                matched = true;
            }
            if !matched {
                log::warn!("schema pattern '{}' matched no files", pattern);
            }
        }
        Ok(copied)
    }

    /// `tar` command that archives `source_dir` into `archive_path`
    pub fn archive_command(&self, source_dir: &Path, archive_path: &Path) -> CommandSpec {
        let parent = source_dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let base = source_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string());

        CommandSpec::new(
            "tar",
            [
                "-czf".to_string(),
                archive_path.to_string_lossy().into_owned(),
                "-C".to_string(),
                parent.to_string_lossy().into_owned(),
                base,
            ],
        )
    }

    /// Compress `source_dir` into `archive_path`
    pub async fn package_archive(&self, source_dir: &Path, archive_path: &Path) -> CommandResult {
        if let Some(dir) = archive_path.parent()
            && let Err(e) = std::fs::create_dir_all(self.project_root.join(dir))
        {
            return CommandResult {
                exited_zero: false,
                code: None,
                stdout: String::new(),
                stderr: format!("cannot create {}: {e}", dir.display()),
            };
        }

        let command = self.archive_command(source_dir, archive_path);
        let result = self.runner.run(&command).await;
        if !result.exited_zero {
            log::warn!("[tar] {} failed: {}", command, result.failure_reason());
        }
        result
    }
}
