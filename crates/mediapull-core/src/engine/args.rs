//! Engine argument list for downloading one item.

use std::ffi::OsString;
use std::path::Path;

/// Containers the engine can embed a thumbnail into.
pub const THUMBNAIL_CONTAINERS: &[&str] = &[
    "mp3", "mkv", "mka", "ogg", "opus", "flac", "m4a", "mp4", "m4v", "mov",
];

/// Format selectors mentioning "audio" (e.g. `bestaudio`) mean audio extraction.
pub fn is_audio_format(format: &str) -> bool {
    format.to_ascii_lowercase().contains("audio")
}

/// Output container when none is requested: mp3 for audio, mp4 otherwise.
pub fn default_container(format: &str) -> &'static str {
    if is_audio_format(format) {
        "mp3"
    } else {
        "mp4"
    }
}

pub fn supports_thumbnail(container: &str) -> bool {
    let c = container.trim_start_matches('.').to_ascii_lowercase();
    THUMBNAIL_CONTAINERS.contains(&c.as_str())
}

/// Everything needed to build the engine command line for one item.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub url: &'a str,
    /// Where the engine writes its output (inside the staging directory).
    pub output: &'a Path,
    pub format: &'a str,
    pub target_container: Option<&'a str>,
    pub parallelism: u32,
    pub proxy: Option<&'a str>,
    pub cookies: Option<&'a Path>,
    pub transcoder: Option<&'a Path>,
    pub embed_metadata: bool,
    pub embed_thumbnail: bool,
}

impl Invocation<'_> {
    /// Container the output is expected to end up in.
    pub fn container(&self) -> String {
        self.target_container
            .map(|c| c.trim_start_matches('.').to_ascii_lowercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| default_container(self.format).to_string())
    }

    pub fn build(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(24);
        let audio = is_audio_format(self.format);
        let container = self.container();

        args.push(self.url.into());
        args.push("-o".into());
        args.push(escape_output_template(self.output));
        args.push("--format".into());
        let selector = if audio { "bestaudio/best" } else { self.format };
        args.push(selector.into());
        args.push("--no-playlist".into());
        args.push("--no-warnings".into());
        // One progress update per line so stdout can be read line by line.
        args.push("--newline".into());
        args.push("--concurrent-fragments".into());
        args.push(self.parallelism.max(1).to_string().into());

        if let Some(proxy) = self.proxy {
            args.push("--proxy".into());
            args.push(proxy.into());
        }
        if let Some(cookies) = self.cookies {
            args.push("--cookies".into());
            args.push(cookies.as_os_str().to_owned());
        }

        if audio {
            args.push("--extract-audio".into());
            args.push("--audio-format".into());
            args.push(container.clone().into());
        } else if self.target_container.is_some() {
            args.push("--recode-video".into());
            args.push(container.clone().into());
        }

        if let Some(ffmpeg) = self.transcoder {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.as_os_str().to_owned());
        }

        if self.embed_metadata {
            args.push("--embed-metadata".into());
        }
        if self.embed_thumbnail {
            if supports_thumbnail(&container) {
                args.push("--embed-thumbnail".into());
            } else {
                tracing::warn!(
                    container = %container,
                    url = %self.url,
                    "container cannot hold a thumbnail; skipping thumbnail embedding"
                );
            }
        }

        args
    }
}

/// The engine treats `%` in the output path as a template marker.
fn escape_output_template(path: &Path) -> OsString {
    match path.to_str() {
        Some(s) => s.replace('%', "%%").into(),
        None => path.as_os_str().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base<'a>(output: &'a Path) -> Invocation<'a> {
        Invocation {
            url: "https://example.com/watch?v=1",
            output,
            format: "best",
            target_container: None,
            parallelism: 4,
            proxy: None,
            cookies: None,
            transcoder: None,
            embed_metadata: false,
            embed_thumbnail: false,
        }
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn video_defaults() {
        let out = Path::new("/dl/.incomplete/clip.mp4");
        let args = strings(base(out).build());
        assert_eq!(args[0], "https://example.com/watch?v=1");
        assert!(has_pair(&args, "-o", "/dl/.incomplete/clip.mp4"));
        assert!(has_pair(&args, "--format", "best"));
        assert!(has_pair(&args, "--concurrent-fragments", "4"));
        assert!(args.contains(&"--newline".to_string()));
        assert!(!args.contains(&"--extract-audio".to_string()));
        assert!(!args.contains(&"--recode-video".to_string()));
        assert!(!args.contains(&"--proxy".to_string()));
    }

    #[test]
    fn audio_selector_extracts_audio() {
        let out = Path::new("/dl/.incomplete/song.mp3");
        let mut inv = base(out);
        inv.format = "bestaudio";
        let args = strings(inv.build());
        assert!(has_pair(&args, "--format", "bestaudio/best"));
        assert!(args.contains(&"--extract-audio".to_string()));
        assert!(has_pair(&args, "--audio-format", "mp3"));

        inv.target_container = Some("opus");
        let args = strings(inv.build());
        assert!(has_pair(&args, "--audio-format", "opus"));
    }

    #[test]
    fn video_container_recodes() {
        let out = Path::new("/dl/.incomplete/clip.mkv");
        let mut inv = base(out);
        inv.target_container = Some("MKV");
        let args = strings(inv.build());
        assert!(has_pair(&args, "--recode-video", "mkv"));
    }

    #[test]
    fn proxy_cookies_and_transcoder_pass_through() {
        let out = Path::new("/dl/.incomplete/clip.mp4");
        let cookies = Path::new("/state/cookies.txt");
        let ffmpeg = Path::new("/opt/bin/ffmpeg");
        let mut inv = base(out);
        inv.proxy = Some("http://proxy:3128");
        inv.cookies = Some(cookies);
        inv.transcoder = Some(ffmpeg);
        let args = strings(inv.build());
        assert!(has_pair(&args, "--proxy", "http://proxy:3128"));
        assert!(has_pair(&args, "--cookies", "/state/cookies.txt"));
        assert!(has_pair(&args, "--ffmpeg-location", "/opt/bin/ffmpeg"));
    }

    #[test]
    fn thumbnail_only_for_supported_containers() {
        let out = Path::new("/dl/.incomplete/clip.webm");
        let mut inv = base(out);
        inv.embed_metadata = true;
        inv.embed_thumbnail = true;
        let args = strings(inv.build());
        assert!(args.contains(&"--embed-metadata".to_string()));
        assert!(args.contains(&"--embed-thumbnail".to_string()));

        inv.target_container = Some("webm");
        let args = strings(inv.build());
        assert!(args.contains(&"--embed-metadata".to_string()));
        assert!(!args.contains(&"--embed-thumbnail".to_string()));
    }

    #[test]
    fn percent_in_output_path_is_escaped() {
        let out = Path::new("/dl/.incomplete/100% real.mp4");
        let args = strings(base(out).build());
        assert!(has_pair(&args, "-o", "/dl/.incomplete/100%% real.mp4"));
    }

    #[test]
    fn container_helpers() {
        assert_eq!(default_container("bestaudio"), "mp3");
        assert_eq!(default_container("137+140"), "mp4");
        assert!(supports_thumbnail(".M4A"));
        assert!(!supports_thumbnail("webm"));
    }
}
