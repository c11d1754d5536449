use crate::{config::ConfigError, timecode::format_timestamp, types::SubtitleCue};

pub const SUBTITLE_PLACEHOLDER: &str = "{subtitle_content}";

pub const SYSTEM_PROMPT: &str = "You are a video editing assistant.";

pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"You are a professional video editing assistant.
Here are the subtitle lines of the video:
{subtitle_content}
Based on these subtitles, plan a smooth cut that conveys the main theme of the video.
Always keep whole sentences or units of meaning; never cut a passage in half. Only decide which subtitle lines to keep.
Leave a little breathing room before speech starts and after it ends.
Return ONLY a list of time ranges, one range per line, in exactly this format:
00:00:03.000 - 00:00:08.000
00:01:15.500 - 00:01:22.000

Do not add explanations, summaries, comments or any other text. Return only the time ranges."#;

/// One line per cue: `[HH:MM:SS.mmm - HH:MM:SS.mmm] text`.
pub fn format_cues_for_prompt(cues: &[SubtitleCue]) -> String {
    cues.iter()
        .map(|cue| {
            format!(
                "[{} - {}] {}\n",
                format_timestamp(cue.start),
                format_timestamp(cue.end),
                cue.text.trim()
            )
        })
        .collect()
}

/// Insert the formatted subtitles into `template`.
pub fn render_prompt(template: &str, subtitle_content: &str) -> Result<String, ConfigError> {
    if !template.contains(SUBTITLE_PLACEHOLDER) {
        return Err(ConfigError::MissingPlaceholder);
    }
    Ok(template.replace(SUBTITLE_PLACEHOLDER, subtitle_content))
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
    fn formats_cues_with_reply_timestamps() {
        let content = format_cues_for_prompt(&[
            cue(3.0, 8.0, " welcome back "),
            cue(75.5, 3722.0, "multi\nline"),
        ]);

        assert_eq!(
            content,
            "[00:00:03.000 - 00:00:08.000] welcome back\n\
             [00:01:15.500 - 01:02:02.000] multi\nline\n"
        );
    }

    #[test]
    fn renders_template() {
        let prompt = render_prompt("before\n{subtitle_content}\nafter", "LINES").unwrap();
        assert_eq!(prompt, "before\nLINES\nafter");
    }

    #[test]
    fn other_braces_are_left_alone() {
        let prompt = render_prompt("{\"json\": true} {subtitle_content}", "x").unwrap();
        assert_eq!(prompt, "{\"json\": true} x");
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        assert!(matches!(
            render_prompt("no slot here", "x"),
            Err(ConfigError::MissingPlaceholder)
        ));
    }

    #[test]
    fn default_template_has_placeholder_and_example_ranges() {
        assert!(DEFAULT_PROMPT_TEMPLATE.contains(SUBTITLE_PLACEHOLDER));
        assert_eq!(
            crate::timecode::find_range_matches(DEFAULT_PROMPT_TEMPLATE).len(),
            2
        );
    }
}
