//! One-shot engine commands: metadata probe, self-update, and failure summaries.

use std::ffi::OsString;
use std::path::Path;

use super::launcher::EngineLauncher;
use super::EngineError;

impl EngineLauncher {
    /// Ask the engine for metadata about `url` (flat for playlists) as JSON.
    pub async fn probe(
        &self,
        url: &str,
        proxy: Option<&str>,
        cookies: Option<&Path>,
    ) -> Result<serde_json::Value, EngineError> {
        let mut args: Vec<OsString> = vec![
            url.into(),
            "--dump-single-json".into(),
            "--no-warnings".into(),
            "--flat-playlist".into(),
            "--extractor-args".into(),
            "youtubetab:skip=authcheck".into(),
        ];
        if let Some(proxy) = proxy {
            args.push("--proxy".into());
            args.push(proxy.into());
        }
        if let Some(cookies) = cookies {
            args.push("--cookies".into());
            args.push(cookies.as_os_str().to_owned());
        }

        self.wait_until_ready().await?;
        let output = self.spawn(&args).await?.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Failed {
                binary: self.extractor().display().to_string(),
                code: output.status.code(),
                message: explain_failure(&stderr),
            });
        }
        serde_json::from_slice(&output.stdout).map_err(|e| EngineError::BadOutput(e.to_string()))
    }

    /// Run the engine's self-update and return its combined output.
    pub async fn update_engine(&self) -> Result<String, EngineError> {
        self.wait_until_ready().await?;
        let output = self.spawn(&["-U".into()]).await?.wait_with_output().await?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        if output.status.success() {
            Ok(text)
        } else {
            Err(EngineError::Failed {
                binary: self.extractor().display().to_string(),
                code: output.status.code(),
                message: text.trim().to_string(),
            })
        }
    }
}

const KNOWN_FAILURES: &[(&str, &str)] = &[
    (
        "Video unavailable",
        "This video is unavailable (it may have been deleted or terminated).",
    ),
    (
        "Private video",
        "This is a private video. Valid cookies are required for access.",
    ),
    (
        "Join this channel to get access",
        "This is a members-only video. Cookies with an active membership are required.",
    ),
    (
        "Incomplete YouTube URL",
        "The provided URL is incomplete or invalid.",
    ),
    (
        "Sign in to confirm your age",
        "This content is age-restricted. Cookies are required to verify age.",
    ),
    (
        "Sign in to see more",
        "Authentication required. Cookies are required to access this content.",
    ),
    (
        "Playlists that require authentication",
        "This playlist requires authentication/cookies to be extracted.",
    ),
];

/// Short, human-readable summary of an engine failure from its stderr.
pub fn explain_failure(stderr: &str) -> String {
    if let Some((_, msg)) = KNOWN_FAILURES.iter().find(|(needle, _)| stderr.contains(needle)) {
        return (*msg).to_string();
    }
    if let Some(line) = stderr
        .lines()
        .find_map(|l| l.find("ERROR: ").map(|i| l[i + "ERROR: ".len()..].trim()))
        .filter(|l| !l.is_empty())
    {
        return line.to_string();
    }
    let last = stderr.lines().rev().map(str::trim).find(|l| !l.is_empty());
    last.unwrap_or("engine failed without output").to_string()
}
