//! Workflow stages. Each takes the previous stage's typed output plus the run's
//! [`Config`] and returns a typed result.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::{
    config::Config,
    error::{ReelcutError, Result},
    llm::complete,
    media::{burn_subtitles, concat_clips, cut_clips, write_concat_list},
    prompt::{format_cues_for_prompt, render_prompt},
    ranges::{ClipPlan, TimeRange, normalize},
    subtitles::{load_srt, segments_to_srt, sibling_subtitle_path},
    transcribe::{ensure_model, transcribe_media},
    types::SubtitleCue,
    workspace::{
        cleanup_intermediates, get_concat_list_path, get_final_video_path,
        get_merged_subtitle_path, get_merged_video_path, get_root_cache_dir,
    },
};

/// Subtitles of the source video, either found next to it or freshly transcribed.
#[derive(Debug)]
pub struct SourceSubtitles {
    pub path: PathBuf,
    pub cues: Vec<SubtitleCue>,
    pub generated: bool,
}

/// What the language model picked, before and after normalization.
#[derive(Debug)]
pub struct Selection {
    pub reply: String,
    pub plan: ClipPlan,
}

async fn transcribe_to_srt(config: &Config, media_path: &Path, srt_path: &Path) -> Result<()> {
    let model_path = ensure_model(&get_root_cache_dir(), &config.whisper_model).await?;
    let work_dir = srt_path.parent().unwrap_or(Path::new("."));
    let transcript = transcribe_media(
        &config.ffmpeg_path,
        media_path,
        work_dir,
        &model_path,
        &config.language,
    )
    .await?;

    fs::write(srt_path, segments_to_srt(&transcript.segments)).await?;
    Ok(())
}

/// Reuse `<video>.srt` when present (unless `force`), otherwise transcribe the video.
pub async fn ensure_source_subtitles(
    config: &Config,
    video_path: &Path,
    force: bool,
) -> Result<SourceSubtitles> {
    let path = sibling_subtitle_path(video_path);
    let generated = force || !path.exists();
    if generated {
        info!(video = %video_path.display(), "no usable subtitles, transcribing");
        transcribe_to_srt(config, video_path, &path).await?;
    }

    let cues = load_srt(&path).await?;
    Ok(SourceSubtitles {
        path,
        cues,
        generated,
    })
}

/// The prompt sent to the language model for `cues`.
pub fn build_prompt(config: &Config, cues: &[SubtitleCue]) -> Result<String> {
    let content = format_cues_for_prompt(cues);
    Ok(render_prompt(&config.ai_prompt_template, &content)?)
}

/// Ask the language model which ranges to keep and normalize its answer.
pub async fn select_clips(config: &Config, cues: &[SubtitleCue]) -> Result<Selection> {
    let prompt = build_prompt(config, cues)?;
    let endpoint = config.llm_endpoint()?;
    let reply = complete(&endpoint, &prompt).await?;
    let plan = normalize(&reply, &config.range_params());
    info!(clips = plan.ranges().len(), "clip plan ready");
    Ok(Selection { reply, plan })
}

/// Cut every range from `video_path` and concatenate the clips into one video.
///
/// Intermediate clips and the concat list are removed whatever the outcome.
pub async fn assemble_highlight(
    config: &Config,
    video_path: &Path,
    ranges: &[TimeRange],
) -> Result<PathBuf> {
    let output_dir = &config.output_dir;
    fs::create_dir_all(output_dir).await?;
    let list_path = get_concat_list_path(output_dir);

    let batch = cut_clips(&config.ffmpeg_path, video_path, ranges, output_dir).await;
    if batch.produced.is_empty() {
        cleanup_intermediates(&batch.attempted, &list_path);
        return Err(ReelcutError::NoClipsProduced {
            attempted: batch.attempted.len(),
        });
    }

    let merged_path = get_merged_video_path(output_dir);
    let result = match write_concat_list(&list_path, &batch.produced).await {
        Ok(()) => concat_clips(&config.ffmpeg_path, &list_path, &merged_path).await,
        Err(e) => Err(e),
    };
    cleanup_intermediates(&batch.attempted, &list_path);
    result?;

    info!(
        clips = batch.produced.len(),
        skipped = batch.attempted.len() - batch.produced.len(),
        "merged highlight written to {}",
        merged_path.display()
    );
    Ok(merged_path)
}

/// Transcribe the merged video and save the result as its SRT.
pub async fn resubtitle(config: &Config, merged_video: &Path) -> Result<PathBuf> {
    let srt_path = get_merged_subtitle_path(&config.output_dir);
    transcribe_to_srt(config, merged_video, &srt_path).await?;
    Ok(srt_path)
}

/// Burn `subtitle_path` into `merged_video`, returning the final video path.
pub async fn burn_in(config: &Config, merged_video: &Path, subtitle_path: &Path) -> Result<PathBuf> {
    if !merged_video.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("merged video not found: {}", merged_video.display()),
        )
        .into());
    }
    load_srt(subtitle_path).await?;

    let output_path = get_final_video_path(&config.output_dir);
    burn_subtitles(&config.ffmpeg_path, merged_video, subtitle_path, &output_path).await?;
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(start: f64, end: f64, text: &str) -> SubtitleCue {
        SubtitleCue {
            index: 1,
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn prompt_embeds_formatted_cues() {
        let config = Config {
            ai_prompt_template: "Subs:\n{subtitle_content}END".into(),
            ..Config::default()
        };
        let prompt = build_prompt(&config, &[cue(1.0, 2.0, "hi")]).unwrap();
        assert_eq!(prompt, "Subs:\n[00:00:01.000 - 00:00:02.000] hi\nEND");
    }

    #[test]
    fn prompt_without_placeholder_is_a_config_error() {
        let config = Config {
            ai_prompt_template: "nothing".into(),
            ..Config::default()
        };
        assert!(matches!(
            build_prompt(&config, &[]),
            Err(ReelcutError::Config(_))
        ));
    }

    #[tokio::test]
    async fn existing_sibling_subtitles_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("talk.mp4");
        std::fs::write(
            dir.path().join("talk.srt"),
            "1\n00:00:01,000 --> 00:00:04,000\nhello\n\n",
        )
        .unwrap();

        let subs = ensure_source_subtitles(&Config::default(), &video, false)
            .await
            .unwrap();

        assert!(!subs.generated);
        assert_eq!(subs.cues.len(), 1);
        assert_eq!(subs.cues[0].text, "hello");
    }

    #[tokio::test]
    async fn failed_cuts_report_no_clips_and_leave_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            ffmpeg_path: PathBuf::from("/nonexistent/ffmpeg"),
            output_dir: dir.path().join("out"),
            ..Config::default()
        };
        let ranges = [TimeRange::new(0.0, 3.0).unwrap()];

        let err = assemble_highlight(&config, Path::new("in.mp4"), &ranges)
            .await
            .unwrap_err();

        assert!(matches!(err, ReelcutError::NoClipsProduced { attempted: 1 }));
        assert!(!get_concat_list_path(&config.output_dir).exists());
    }

    #[tokio::test]
    async fn burn_in_requires_merged_video() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            output_dir: dir.path().to_path_buf(),
            ..Config::default()
        };

        let err = burn_in(
            &config,
            &dir.path().join("missing.mp4"),
            &dir.path().join("missing.srt"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReelcutError::IoError(_)));
    }
}
