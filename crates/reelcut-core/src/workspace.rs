use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("reelcut")
}

pub fn get_model_dir(cache_dir: &Path) -> PathBuf {
    cache_dir.join("models")
}

/// Get the path for the `index`-th cut clip (`clip_000.mp4`, ...)
pub fn get_clip_path(output_dir: &Path, index: usize) -> PathBuf {
    output_dir.join(format!("clip_{:03}.mp4", index))
}

/// Get the path for the ffmpeg concat list
pub fn get_concat_list_path(output_dir: &Path) -> PathBuf {
    output_dir.join("list.txt")
}

/// Get the path for the concatenated highlight video
pub fn get_merged_video_path(output_dir: &Path) -> PathBuf {
    output_dir.join("final_merged.mp4")
}

/// Get the path for the subtitles of the concatenated video
pub fn get_merged_subtitle_path(output_dir: &Path) -> PathBuf {
    output_dir.join("final_merged.srt")
}

/// Get the path for the video with burned-in subtitles
pub fn get_final_video_path(output_dir: &Path) -> PathBuf {
    output_dir.join("final_with_subs.mp4")
}

/// Get the path for the temporary WAV extracted from `media_path`
pub fn get_audio_path(work_dir: &Path, media_path: &Path) -> PathBuf {
    let stem = media_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());
    work_dir.join(format!("{}.wav", stem))
}

/// Remove cut clips and the concat list. Failures are logged, never raised.
pub fn cleanup_intermediates(clips: &[PathBuf], concat_list: &Path) {
    for path in clips.iter().map(PathBuf::as_path).chain(Some(concat_list)) {
        if !path.exists() {
            continue;
        }
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed intermediate file"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove intermediate file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_layout() {
        let out = Path::new("out");
        assert_eq!(get_clip_path(out, 7), PathBuf::from("out/clip_007.mp4"));
        assert_eq!(get_clip_path(out, 1234), PathBuf::from("out/clip_1234.mp4"));
        assert_eq!(get_concat_list_path(out), PathBuf::from("out/list.txt"));
        assert_eq!(get_merged_video_path(out), PathBuf::from("out/final_merged.mp4"));
        assert_eq!(get_merged_subtitle_path(out), PathBuf::from("out/final_merged.srt"));
        assert_eq!(get_final_video_path(out), PathBuf::from("out/final_with_subs.mp4"));
        assert_eq!(
            get_audio_path(out, Path::new("/videos/talk.mp4")),
            PathBuf::from("out/talk.wav")
        );
    }

    #[test]
    fn cleanup_removes_clips_and_list_and_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        let clips = vec![get_clip_path(dir.path(), 0), get_clip_path(dir.path(), 1)];
        let list = get_concat_list_path(dir.path());
        std::fs::write(&clips[0], b"clip").unwrap();
        std::fs::write(&list, b"file 'clip_000.mp4'\n").unwrap();
        let keep = get_merged_video_path(dir.path());
        std::fs::write(&keep, b"merged").unwrap();

        cleanup_intermediates(&clips, &list);

        assert!(!clips[0].exists());
        assert!(!list.exists());
        assert!(keep.exists());
    }
}
