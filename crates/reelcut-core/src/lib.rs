//! Reelcut Core Library
//!
//! Turns a video and its subtitles into an AI-selected highlight cut: the
//! language model picks time ranges from the subtitle text, [`normalize`]
//! buffers, merges and filters them, and ffmpeg cuts, joins and re-subtitles
//! the result.

pub mod config;
pub mod error;
pub mod llm;
pub mod media;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod ranges;
pub mod subtitles;
pub mod timecode;
pub mod transcribe;
pub mod types;
pub mod workspace;

// Re-export commonly used items at crate root
pub use config::{Config, ConfigError, default_config_path};
pub use error::{ReelcutError, Result};
pub use pipeline::{
    Selection, SourceSubtitles, assemble_highlight, build_prompt, burn_in,
    ensure_source_subtitles, resubtitle, select_clips,
};
pub use provider::{LlmEndpoint, Provider};
pub use ranges::{
    ClipPlan, EmptyReason, MalformedPolicy, RangeParams, TimeRange, buffer_ranges,
    filter_short_ranges, merge_ranges, normalize, sort_ranges,
};
pub use subtitles::{load_srt, parse_srt, segments_to_srt, sibling_subtitle_path};
pub use timecode::{RawMatch, find_range_matches, format_timestamp, timestamp_to_seconds};
pub use types::{Segment, SubtitleCue, Transcript};
pub use workspace::{get_merged_subtitle_path, get_root_cache_dir};
