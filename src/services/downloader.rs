// svtplay-dl invocation

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::models::MediaType;
use crate::settings::{DownloaderSettings, Settings};

/// Hard limit for a single download
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(3600);

/// Keep alphanumerics, spaces, '-' and '_', then drop trailing whitespace
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    kept.trim_end().to_string()
}

/// Arguments for svtplay-dl in a fixed order:
/// quality, subtitle, force-subtitle, output, remux, merge-subtitle, thumbnail, url.
/// Disabled options are left out.
pub fn build_command(url: &str, output_path: &Path, options: &DownloaderSettings) -> Vec<String> {
    let mut args = Vec::new();

    if !options.quality.is_empty() {
        args.push("-q".to_string());
        args.push(options.quality.clone());
    }

    if options.subtitle {
        args.push("--subtitle".to_string());
    }

    if options.force_subtitle {
        args.push("--force-subtitle".to_string());
    }

    args.push("-o".to_string());
    args.push(output_path.to_string_lossy().into_owned());

    if options.remux {
        args.push("--remux".to_string());
    }

    if options.merge_subtitle {
        args.push("--merge-subtitle".to_string());
    }

    if options.thumbnail {
        args.push("--thumbnail".to_string());
    }

    args.push(url.to_string());
    args
}

/// Runs the external downloader
pub struct Downloader {
    program: String,
    timeout: Duration,
}

impl Downloader {
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_timeout(program, DOWNLOAD_TIMEOUT)
    }

    pub fn with_timeout(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Output folder for a title: `<paths[media_type]>/<sanitized title>`
    pub fn output_dir(settings: &Settings, title: &str, media_type: MediaType) -> PathBuf {
        settings
            .paths
            .base_for(media_type)
            .join(sanitize_title(title))
    }

    /// Download `url` into the title's folder, returning that folder on success.
    /// A nonzero exit status or hitting the timeout is an error.
    pub async fn download(
        &self,
        url: &str,
        title: &str,
        media_type: MediaType,
        settings: &Settings,
    ) -> Result<PathBuf> {
        let output_path = Self::output_dir(settings, title, media_type);

        tokio::fs::create_dir_all(&output_path)
            .await
            .with_context(|| format!("Failed to create {}", output_path.display()))?;

        let args = build_command(url, &output_path, &settings.svtplay_dl);
        tracing::info!("Starting download: {} {}", self.program, args.join(" "));

        self.run(&args).await?;

        tracing::info!("Download completed: {}", title);
        Ok(output_path)
    }

    async fn run(&self, args: &[String]) -> Result<()> {
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to run '{}'. Is it installed?", self.program))?;

        // Dropping the child on timeout kills it
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| anyhow::anyhow!("{} timed out after {:?}", self.program, self.timeout))?
            .context("Failed to wait for downloader")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} exited with {}: {}", self.program, output.status, stderr.trim());
        }

        Ok(())
    }
}
