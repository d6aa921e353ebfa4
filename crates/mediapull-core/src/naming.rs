//! Output filename planning for a new job.
//!
//! Titles are sanitized for Windows/Linux/macOS filesystems, optionally given a
//! zero-padded `NN - ` prefix, and made unique against files already on disk,
//! names planned earlier in the same batch, and names recorded by other jobs
//! sharing the destination directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Extensions checked on disk when deciding whether a base name is taken.
pub const SIBLING_EXTENSIONS: &[&str] = &[".mp4", ".mp3", ".mkv", ".webm", ".part", ".ytdl"];

/// Leave room under NAME_MAX (255) for the prefix, a ` (n)` suffix, and engine
/// temp extensions such as `.f137.mp4.part`.
const MAX_TITLE_BYTES: usize = 200;

/// Replaces `< > : " / \ | ? *` and control characters with `_` and trims
/// whitespace. An empty result becomes `video_<position>` (1-based).
pub fn sanitize_title(title: &str, position: usize) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = replaced.trim();
    if trimmed.is_empty() {
        return format!("video_{position}");
    }
    if trimmed.len() > MAX_TITLE_BYTES {
        let mut take = MAX_TITLE_BYTES;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].trim_end().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Subfolder name for a folder hint, sanitized like a title. `None` when the
/// hint is blank or only dots, since `.` and `..` would escape the download root.
pub fn folder_name(hint: &str) -> Option<String> {
    if hint.trim().is_empty() {
        return None;
    }
    let name = sanitize_title(hint, 1);
    (!name.chars().all(|c| c == '.')).then_some(name)
}

/// `"01 - "` style prefix; width is at least 2 and grows with `total`.
pub fn number_prefix(position: usize, total: usize) -> String {
    let width = total.to_string().len().max(2);
    format!("{position:0width$} - ")
}

fn stem_of(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string())
}

/// Hands out base names that collide with nothing known in one directory.
#[derive(Debug)]
pub struct NamePlanner {
    dir: PathBuf,
    taken: HashSet<String>,
}

impl NamePlanner {
    /// `recorded` are full filenames other jobs already own in `dir`.
    pub fn new<I, S>(dir: impl Into<PathBuf>, recorded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            dir: dir.into(),
            taken: recorded.into_iter().map(|n| stem_of(n.as_ref())).collect(),
        }
    }

    fn is_taken(&self, base: &str) -> bool {
        self.taken.contains(base)
            || SIBLING_EXTENSIONS
                .iter()
                .any(|ext| self.dir.join(format!("{base}{ext}")).exists())
    }

    /// Returns `base`, or `base (n)` with the smallest free n, and reserves it.
    pub fn claim(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut counter = 1u32;
        while self.is_taken(&candidate) {
            candidate = format!("{base} ({counter})");
            counter += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

/// Plan one filename per URL. Missing titles fall back to `Video <n>`.
pub fn plan_filenames(
    planner: &mut NamePlanner,
    titles: &[String],
    count: usize,
    number_items: bool,
    extension: &str,
) -> Vec<String> {
    (0..count)
        .map(|idx| {
            let position = idx + 1;
            let raw = titles
                .get(idx)
                .map(String::as_str)
                .filter(|t| !t.trim().is_empty());
            let mut base = match raw {
                Some(t) => sanitize_title(t, position),
                None => format!("Video {position}"),
            };
            if number_items {
                base = format!("{}{base}", number_prefix(position, count));
            }
            let unique = planner.claim(&base);
            format!("{unique}.{extension}")
        })
        .collect()
}
