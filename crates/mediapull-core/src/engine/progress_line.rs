//! Scrape progress out of the engine's human-readable stdout.
//!
//! Contract: a line is progress-shaped when, trimmed, it starts with
//! `[download]`. From such a line we take the first `NN[.N]%` as the percent,
//! the size after `of`, and a rate after `at` (a token ending in `/s`, or the
//! engine's `Unknown B/s`) as the speed. Anything else yields `None`.

use regex::Regex;
use std::sync::OnceLock;

/// Fields recovered from one progress line. At least one is `Some`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressLine {
    pub percent: Option<f64>,
    pub total_size: Option<String>,
    pub speed: Option<String>,
}

const PROGRESS_PREFIX: &str = "[download]";

pub fn parse_progress_line(line: &str) -> Option<ProgressLine> {
    static PERCENT_RE: OnceLock<Regex> = OnceLock::new();
    static SIZE_RE: OnceLock<Regex> = OnceLock::new();
    static SPEED_RE: OnceLock<Regex> = OnceLock::new();

    let line = line.trim();
    if !line.starts_with(PROGRESS_PREFIX) {
        return None;
    }

    let percent_re =
        PERCENT_RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)%").expect("percent regex"));
    let size_re = SIZE_RE.get_or_init(|| {
        Regex::new(r"(?i)\bof\s+(~?\s?\d+(?:\.\d+)?(?:KiB|MiB|GiB|TiB|kB|MB|GB|TB|B))")
            .expect("size regex")
    });
    let speed_re = SPEED_RE.get_or_init(|| {
        Regex::new(r"\bat\s+(Unknown B/s|\S+/s)(?:\s|$)").expect("speed regex")
    });

    let percent = percent_re
        .captures(line)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok());
    let total_size = size_re
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let speed = speed_re
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    if percent.is_none() && total_size.is_none() && speed.is_none() {
        return None;
    }
    Some(ProgressLine {
        percent,
        total_size,
        speed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typical_progress_line() {
        let p = parse_progress_line("[download]  42.3% of 10.50MiB at  1.25MiB/s ETA 00:05").unwrap();
        assert_eq!(p.percent, Some(42.3));
        assert_eq!(p.total_size.as_deref(), Some("10.50MiB"));
        assert_eq!(p.speed.as_deref(), Some("1.25MiB/s"));
    }

    #[test]
    fn estimated_size_and_integer_percent() {
        let p = parse_progress_line("[download]   7% of ~ 250.00MiB at 3.10MiB/s ETA 01:12 (frag 3/40)")
            .unwrap();
        assert_eq!(p.percent, Some(7.0));
        assert_eq!(p.total_size.as_deref(), Some("~ 250.00MiB"));
        assert_eq!(p.speed.as_deref(), Some("3.10MiB/s"));
    }

    #[test]
    fn finished_line_without_speed() {
        let p = parse_progress_line("[download] 100% of 3.20GiB in 00:01:02").unwrap();
        assert_eq!(p.percent, Some(100.0));
        assert_eq!(p.total_size.as_deref(), Some("3.20GiB"));
        assert_eq!(p.speed, None);
    }

    #[test]
    fn unknown_speed_token_is_kept_verbatim() {
        let p = parse_progress_line("[download]   0.0% of 5.00MiB at Unknown B/s ETA Unknown").unwrap();
        assert_eq!(p.percent, Some(0.0));
        assert_eq!(p.speed.as_deref(), Some("Unknown B/s"));
    }

    #[test]
    fn at_without_a_rate_is_not_a_speed() {
        assert_eq!(parse_progress_line("[download] Resuming download at byte 1024"), None);
        let p = parse_progress_line("[download]  3.0% of 9.00MiB at byte 1024").unwrap();
        assert_eq!(p.percent, Some(3.0));
        assert_eq!(p.speed, None);
    }

    #[test]
    fn first_percent_wins() {
        let p = parse_progress_line("[download]  12.5% of 1.00MiB at 2.00KiB/s (50% cap)").unwrap();
        assert_eq!(p.percent, Some(12.5));
    }

    #[test]
    fn non_progress_lines_are_ignored() {
        assert_eq!(parse_progress_line("[youtube] abc: Downloading webpage"), None);
        assert_eq!(parse_progress_line("[Merger] Merging formats into \"x.mkv\""), None);
        assert_eq!(parse_progress_line("WARNING: 50% of something"), None);
        assert_eq!(parse_progress_line(""), None);
    }

    #[test]
    fn download_line_without_fields_is_ignored() {
        assert_eq!(
            parse_progress_line("[download] Destination: /tmp/.incomplete/clip.mp4"),
            None
        );
    }
}
