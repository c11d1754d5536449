use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use tokio::fs;

use crate::{
    error::{ReelcutError, Result},
    types::{Segment, SubtitleCue},
};

static CUE_TIMING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("SRT timing pattern is valid")
});

/// Format timestamp in SRT format
pub fn format_srt_timestamp(seconds: f64) -> String {
    if seconds.is_nan() || seconds.is_infinite() || seconds < 0.0 {
        return "00:00:00,000".to_string();
    }

    let total_millis = (seconds * 1000.0).round() as u64;
    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    let secs = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let minutes = total_minutes % 60;
    let hours = total_minutes / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Render transcript segments as a numbered SRT document.
pub fn segments_to_srt(segments: &[Segment]) -> String {
    segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            format!(
                "{}\n{} --> {}\n{}\n\n",
                i + 1,
                format_srt_timestamp(seg.start),
                format_srt_timestamp(seg.end),
                seg.text.trim()
            )
        })
        .collect()
}

fn capture_seconds(caps: &regex::Captures<'_>, first: usize) -> f64 {
    let field = |i: usize| caps[first + i].parse::<u64>().unwrap_or(0) as f64;
    field(0) * 3600.0 + field(1) * 60.0 + field(2) + field(3) / 1000.0
}

/// Group lines into blocks separated by blank or whitespace-only lines.
fn srt_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Parse SRT text into cues.
///
/// Blocks are separated by blank lines. The index line is optional and blocks
/// without a timing line are skipped.
pub fn parse_srt(text: &str) -> Vec<SubtitleCue> {
    let text = text.trim_start_matches('\u{feff}');
    let mut cues = Vec::new();

    for block in srt_blocks(text) {
        let mut lines = block.into_iter();
        let Some(mut line) = lines.next() else {
            continue;
        };

        let mut index = None;
        if !CUE_TIMING_REGEX.is_match(line.trim()) {
            index = line.trim().parse::<usize>().ok();
            match lines.next() {
                Some(next) => line = next,
                None => continue,
            }
        }

        let Some(caps) = CUE_TIMING_REGEX.captures(line.trim()) else {
            continue;
        };

        let body = lines.collect::<Vec<_>>().join("\n");
        cues.push(SubtitleCue {
            index: index.unwrap_or(cues.len() + 1),
            start: capture_seconds(&caps, 1),
            end: capture_seconds(&caps, 5),
            text: body,
        });
    }

    cues
}

/// Read an SRT file, failing if it holds no usable cues.
pub async fn load_srt(path: &Path) -> Result<Vec<SubtitleCue>> {
    let content = fs::read_to_string(path).await?;
    let cues = parse_srt(&content);
    if cues.is_empty() {
        return Err(ReelcutError::InvalidSubtitles {
            path: path.to_path_buf(),
            reason: "no subtitle cues found".to_string(),
        });
    }
    Ok(cues)
}

/// The `.srt` file expected next to a video: same directory, same stem.
pub fn sibling_subtitle_path(video_path: &Path) -> PathBuf {
    video_path.with_extension("srt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_srt_timestamps() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(3723.25), "01:02:03,250");
        assert_eq!(format_srt_timestamp(-1.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(f64::NAN), "00:00:00,000");
    }

    #[test]
    fn renders_numbered_blocks() {
        let segments = vec![
            Segment {
                start: 0.0,
                end: 2.5,
                text: " Hello there ".into(),
            },
            Segment {
                start: 2.5,
                end: 61.0,
                text: "General Kenobi".into(),
            },
        ];

        assert_eq!(
            segments_to_srt(&segments),
            "1\n00:00:00,000 --> 00:00:02,500\nHello there\n\n\
             2\n00:00:02,500 --> 00:01:01,000\nGeneral Kenobi\n\n"
        );
    }

    #[test]
    fn parses_crlf_multiline_cues() {
        let srt = "\u{feff}1\r\n00:00:01,000 --> 00:00:03,500\r\nfirst line\r\nsecond line\r\n\r\n\
                   2\r\n00:00:04,000 --> 00:00:05,000\r\nnext\r\n";
        let cues = parse_srt(srt);

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].start, 1.0);
        assert_eq!(cues[0].end, 3.5);
        assert_eq!(cues[0].text, "first line\nsecond line");
        assert_eq!(cues[1].text, "next");
    }

    #[test]
    fn whitespace_only_lines_separate_blocks() {
        let srt = "1\n00:00:01,000 --> 00:00:02,000\nfirst\n  \t\n\
                   2\n00:00:03,000 --> 00:00:04,000\nsecond\r\n \r\n\
                   3\n00:00:05,000 --> 00:00:06,000\nthird\n";
        let cues = parse_srt(srt);

        assert_eq!(cues.len(), 3);
        assert_eq!(cues[0].text, "first");
        assert_eq!(cues[1].index, 2);
        assert_eq!(cues[1].start, 3.0);
        assert_eq!(cues[1].text, "second");
        assert_eq!(cues[2].text, "third");
    }

    #[test]
    fn index_line_is_optional_and_junk_is_skipped() {
        let srt = "00:00:01.000 --> 00:00:02.000\nno index\n\nnot a cue\n\n7\nbroken timing\ntext\n\n";
        let cues = parse_srt(srt);

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].text, "no index");
    }

    #[test]
    fn reads_back_rendered_segments() {
        let segments = vec![Segment {
            start: 12.34,
            end: 15.0,
            text: "round trip".into(),
        }];
        let cues = parse_srt(&segments_to_srt(&segments));

        assert_eq!(cues.len(), 1);
        assert!((cues[0].start - 12.34).abs() < 1e-3);
        assert_eq!(cues[0].text, "round trip");
    }

    #[test]
    fn sibling_path_swaps_extension() {
        assert_eq!(
            sibling_subtitle_path(Path::new("/videos/talk.mp4")),
            PathBuf::from("/videos/talk.srt")
        );
    }

    #[tokio::test]
    async fn load_rejects_file_without_cues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.srt");
        std::fs::write(&path, "nothing useful here\n").unwrap();

        let err = load_srt(&path).await.unwrap_err();
        assert!(matches!(err, ReelcutError::InvalidSubtitles { .. }));
    }
}
