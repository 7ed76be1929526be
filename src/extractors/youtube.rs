use anyhow::Context;
use serde_json::Value;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use tokio::process::Command;

use super::VideoId;

/// Client identity presented to YouTube by yt-dlp
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIdentity {
    /// A specific player client (e.g. `android`), less prone to throttling
    Preferred(String),
    /// Whatever yt-dlp picks by default
    Default,
}

impl ClientIdentity {
    fn extractor_args(&self) -> Option<String> {
        match self {
            ClientIdentity::Preferred(client) => Some(format!("youtube:player_client={}", client)),
            ClientIdentity::Default => None,
        }
    }
}

impl std::fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientIdentity::Preferred(client) => write!(f, "{} client", client),
            ClientIdentity::Default => write!(f, "default client"),
        }
    }
}

/// YouTube front end built on yt-dlp
#[derive(Debug, Clone)]
pub struct YoutubeExtractor {
    yt_dlp_path: PathBuf,
    preferred_client: Option<String>,
}

impl YoutubeExtractor {
    pub fn new(yt_dlp_path: impl Into<PathBuf>, preferred_client: Option<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            preferred_client: preferred_client.filter(|c| !c.trim().is_empty()),
        }
    }

    /// Identities to try, in order
    pub fn identities(&self) -> Vec<ClientIdentity> {
        match &self.preferred_client {
            Some(client) => vec![ClientIdentity::Preferred(client.clone()), ClientIdentity::Default],
            None => vec![ClientIdentity::Default],
        }
    }

    /// Run yt-dlp once with the given identity
    pub async fn run(&self, identity: &ClientIdentity, args: &[OsString]) -> anyhow::Result<Output> {
        let mut command = Command::new(&self.yt_dlp_path);
        if let Some(extractor_args) = identity.extractor_args() {
            command.arg("--extractor-args").arg(extractor_args);
        }
        command.args(args);

        tracing::debug!("Running {} ({}) with {:?}", self.yt_dlp_path.display(), identity, args);

        let output = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to launch {}", self.yt_dlp_path.display()))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp exited with {}: {}", output.status, error.trim());
        }

        Ok(output)
    }

    /// Run yt-dlp with the preferred identity, retrying once with the default one
    pub async fn run_with_fallback(&self, args: &[OsString]) -> anyhow::Result<Output> {
        let mut last_error = None;

        for identity in self.identities() {
            match self.run(&identity, args).await {
                Ok(output) => return Ok(output),
                Err(e) => {
                    tracing::warn!("yt-dlp attempt with {} failed: {:#}", identity, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no yt-dlp attempt was made")))
    }

    /// Get video information (title, duration, caption tracks) without downloading
    pub async fn video_info(&self, video_id: &VideoId) -> anyhow::Result<Value> {
        tracing::debug!("Extracting video info for: {}", video_id);

        let args: Vec<OsString> = ["--dump-json", "--skip-download", "--no-playlist", "--no-warnings"]
            .into_iter()
            .map(OsString::from)
            .chain(std::iter::once(OsString::from(video_id.watch_url())))
            .collect();

        let output = self.run_with_fallback(&args).await?;
        let info: Value = serde_json::from_slice(&output.stdout).context("yt-dlp returned malformed JSON")?;

        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identities_order() {
        let extractor = YoutubeExtractor::new("yt-dlp", Some("android".to_string()));
        assert_eq!(
            extractor.identities(),
            vec![ClientIdentity::Preferred("android".to_string()), ClientIdentity::Default]
        );

        let extractor = YoutubeExtractor::new("yt-dlp", Some("  ".to_string()));
        assert_eq!(extractor.identities(), vec![ClientIdentity::Default]);
    }

    #[test]
    fn test_extractor_args() {
        assert_eq!(
            ClientIdentity::Preferred("android".to_string()).extractor_args().as_deref(),
            Some("youtube:player_client=android")
        );
        assert_eq!(ClientIdentity::Default.extractor_args(), None);
    }

    #[tokio::test]
    async fn test_missing_binary_fails_both_attempts() {
        let extractor = YoutubeExtractor::new("/nonexistent/yt-dlp", Some("android".to_string()));
        let err = extractor.run_with_fallback(&[OsString::from("--version")]).await.unwrap_err();
        assert!(format!("{:#}", err).contains("failed to launch"));
    }
}
