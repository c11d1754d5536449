//! ffmpeg invocations: audio extraction, lossless cutting, concatenation and burn-in.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use tokio::{fs, process::Command};
use tracing::{debug, info, warn};

use crate::{
    error::{ReelcutError, Result},
    ranges::TimeRange,
    workspace::get_clip_path,
};

async fn run_ffmpeg(ffmpeg: &Path, step: &'static str, args: &[OsString]) -> Result<()> {
    debug!(step, ?args, "running ffmpeg");
    let output = Command::new(ffmpeg).args(args).output().await?;

    if !output.status.success() {
        return Err(ReelcutError::MediaFailed {
            step,
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(())
}

fn args<I, S>(items: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    items.into_iter().map(Into::into).collect()
}

/// Extract 16 kHz mono PCM audio, the input format whisper expects.
pub async fn extract_audio(ffmpeg: &Path, media_path: &Path, audio_path: &Path) -> Result<()> {
    let output = Command::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(media_path)
        .arg("-vn")
        .arg("-acodec")
        .arg("pcm_s16le")
        .arg("-ar")
        .arg("16000")
        .arg("-ac")
        .arg("1")
        .arg(audio_path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(ReelcutError::AudioExtractionFailed {
            video_path: media_path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(())
}

/// Seek before `-i` and stream-copy, so cuts land on keyframes without re-encoding.
pub fn cut_clip_args(video_path: &Path, range: &TimeRange, output_path: &Path) -> Vec<OsString> {
    let mut cmd = args([
        "-ss".to_string(),
        format!("{:.3}", range.start()),
        "-t".to_string(),
        format!("{:.3}", range.duration()),
        "-i".to_string(),
    ]);
    cmd.push(video_path.into());
    cmd.extend(args([
        "-reset_timestamps",
        "1",
        "-avoid_negative_ts",
        "make_zero",
        "-c:v",
        "copy",
        "-c:a",
        "copy",
    ]));
    cmd.push(output_path.into());
    cmd.push("-y".into());
    cmd
}

pub async fn cut_clip(
    ffmpeg: &Path,
    video_path: &Path,
    range: &TimeRange,
    output_path: &Path,
) -> Result<()> {
    run_ffmpeg(ffmpeg, "cut", &cut_clip_args(video_path, range, output_path)).await
}

/// Outcome of cutting a whole clip list.
#[derive(Debug, Default)]
pub struct ClipBatch {
    /// Every path a cut was attempted for, in clip order.
    pub attempted: Vec<PathBuf>,
    /// The subset that ffmpeg produced successfully.
    pub produced: Vec<PathBuf>,
}

/// Cut every range into `clip_NNN.mp4` under `output_dir`.
///
/// A failed cut is logged and skipped; the batch carries on with the next range.
pub async fn cut_clips(
    ffmpeg: &Path,
    video_path: &Path,
    ranges: &[TimeRange],
    output_dir: &Path,
) -> ClipBatch {
    let mut batch = ClipBatch::default();

    for (i, range) in ranges.iter().enumerate() {
        let clip_path = get_clip_path(output_dir, i);
        batch.attempted.push(clip_path.clone());
        info!(
            clip = %clip_path.display(),
            start = range.start(),
            end = range.end(),
            "cutting clip"
        );

        match cut_clip(ffmpeg, video_path, range, &clip_path).await {
            Ok(()) => batch.produced.push(clip_path),
            Err(e) => warn!(clip = %clip_path.display(), error = %e, "clip cut failed, skipping"),
        }
    }

    batch
}

fn quote_concat_entry(name: &str) -> String {
    format!("'{}'", name.replace('\'', r"'\''"))
}

/// Body of an ffmpeg concat-demuxer list. Entries are file names relative to the list.
pub fn format_concat_list(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|clip| {
            let name = clip
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| clip.to_string_lossy().to_string());
            format!("file {}\n", quote_concat_entry(&name))
        })
        .collect()
}

pub async fn write_concat_list(list_path: &Path, clips: &[PathBuf]) -> Result<()> {
    fs::write(list_path, format_concat_list(clips)).await?;
    Ok(())
}

/// Join the clips named in `list_path` without re-encoding.
pub async fn concat_clips(ffmpeg: &Path, list_path: &Path, output_path: &Path) -> Result<()> {
    let mut cmd = args(["-f", "concat", "-safe", "0", "-i"]);
    cmd.push(list_path.into());
    cmd.extend(args(["-c:v", "copy", "-c:a", "copy"]));
    cmd.push(output_path.into());
    cmd.push("-y".into());
    run_ffmpeg(ffmpeg, "concat", &cmd).await
}

/// `subtitles=` filter argument with the path escaped for the filtergraph parser.
pub fn subtitles_filter(subtitle_path: &Path) -> String {
    let path = subtitle_path
        .to_string_lossy()
        .replace('\\', "/")
        .replace(':', r"\:")
        .replace('\'', r"'\''");
    format!("subtitles='{}'", path)
}

pub fn burn_subtitles_args(
    video_path: &Path,
    subtitle_path: &Path,
    output_path: &Path,
) -> Vec<OsString> {
    let mut cmd = args(["-i"]);
    cmd.push(video_path.into());
    cmd.push("-vf".into());
    cmd.push(subtitles_filter(subtitle_path).into());
    cmd.extend(args([
        "-c:v", "libx264", "-preset", "medium", "-crf", "23", "-c:a", "copy",
    ]));
    cmd.push(output_path.into());
    cmd.push("-y".into());
    cmd
}

/// Re-encode `video_path` with `subtitle_path` rendered into the picture.
pub async fn burn_subtitles(
    ffmpeg: &Path,
    video_path: &Path,
    subtitle_path: &Path,
    output_path: &Path,
) -> Result<()> {
    run_ffmpeg(
        ffmpeg,
        "subtitle burn-in",
        &burn_subtitles_args(video_path, subtitle_path, output_path),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().to_string()).collect()
    }

    #[test]
    fn cut_args_seek_before_input_and_copy_streams() {
        let range = TimeRange::new(2.5, 12.5).unwrap();
        let cmd = strings(&cut_clip_args(
            Path::new("in.mp4"),
            &range,
            Path::new("out/clip_000.mp4"),
        ));

        assert_eq!(
            cmd,
            vec![
                "-ss", "2.500", "-t", "10.000", "-i", "in.mp4", "-reset_timestamps", "1",
                "-avoid_negative_ts", "make_zero", "-c:v", "copy", "-c:a", "copy",
                "out/clip_000.mp4", "-y",
            ]
        );
    }

    #[test]
    fn concat_list_uses_file_names_and_escapes_quotes() {
        let list = format_concat_list(&[
            PathBuf::from("out/clip_000.mp4"),
            PathBuf::from("out/it's.mp4"),
        ]);
        assert_eq!(list, "file 'clip_000.mp4'\nfile 'it'\\''s.mp4'\n");
    }

    #[test]
    fn subtitle_filter_escapes_drive_colon_and_backslashes() {
        assert_eq!(
            subtitles_filter(Path::new(r"C:\out\final_merged.srt")),
            r"subtitles='C\:/out/final_merged.srt'"
        );
        assert_eq!(
            subtitles_filter(Path::new("out/final_merged.srt")),
            "subtitles='out/final_merged.srt'"
        );
    }

    #[test]
    fn burn_args_reencode_video_and_copy_audio() {
        let cmd = strings(&burn_subtitles_args(
            Path::new("out/final_merged.mp4"),
            Path::new("out/final_merged.srt"),
            Path::new("out/final_with_subs.mp4"),
        ));

        assert_eq!(cmd[0..4], ["-i", "out/final_merged.mp4", "-vf", "subtitles='out/final_merged.srt'"]);
        assert!(cmd.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(cmd.windows(2).any(|w| w == ["-c:a", "copy"]));
        assert_eq!(cmd.last().map(String::as_str), Some("-y"));
    }

    #[tokio::test]
    async fn missing_ffmpeg_binary_fails_every_cut_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let ranges = [
            TimeRange::new(0.0, 3.0).unwrap(),
            TimeRange::new(5.0, 9.0).unwrap(),
        ];

        let batch = cut_clips(
            Path::new("/nonexistent/ffmpeg"),
            Path::new("in.mp4"),
            &ranges,
            dir.path(),
        )
        .await;

        assert_eq!(batch.attempted.len(), 2);
        assert!(batch.produced.is_empty());
    }
}
