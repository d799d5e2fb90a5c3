//! Classification of MPlayer output lines into typed events.
//!
//! MPlayer in slave mode announces everything as free-form text on stdout and
//! stderr. A small set of line prefixes carries all the information the state
//! machine needs; everything else is noise and is dropped without comment.

use crate::player::state::PlaybackState;

/// One field of MPlayer's `-identify` output.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaField {
    VideoFormat(String),
    VideoBitrate(i32),
    VideoWidth(i32),
    VideoHeight(i32),
    VideoFps(f64),
    AudioFormat(String),
    AudioBitrate(i32),
    SampleRate(i32),
    NumChannels(i32),
    Length(f64),
    Seekable(bool),
    /// `ID_CLIP_INFO_NAMEn` — the key half of a tag pair.
    TagName(usize, String),
    /// `ID_CLIP_INFO_VALUEn` — the value half of a tag pair.
    TagValue(usize, String),
}

/// A single parsed output line.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    State(PlaybackState),
    /// `Starting playback...` — playback begins and no further `-identify`
    /// metadata will arrive for this file.
    Started,
    /// `File not found: <rest>` with the offending path as comment.
    FileNotFound(String),
    Field(MediaField),
    Position(f64),
}

/// Classifies one newline-stripped output line.
///
/// Prefixes are checked in a fixed precedence order; a line matching none of
/// them produces no event. That is expected, not an error: the bulk of
/// MPlayer's output is banner and codec chatter nobody needs.
pub fn parse_line(line: &str) -> Option<ProtocolEvent> {
    if line.starts_with("Playing ") {
        Some(ProtocolEvent::State(PlaybackState::Loading))
    } else if line.starts_with("Cache fill:") {
        Some(ProtocolEvent::State(PlaybackState::Buffering))
    } else if line.starts_with("Starting playback...") {
        Some(ProtocolEvent::Started)
    } else if let Some(rest) = line.strip_prefix("File not found: ") {
        Some(ProtocolEvent::FileNotFound(rest.to_string()))
    } else if line.starts_with("ID_") {
        parse_media_field(line)
    } else if line.starts_with("A:") || line.starts_with("V:") {
        parse_position(line)
    } else if line.starts_with("Exiting...") {
        Some(ProtocolEvent::State(PlaybackState::NotStarted))
    } else {
        None
    }
}

/// Parses an `ID_KEY=value` identification line.
///
/// Unknown keys are skipped; numeric fields that fail to parse fall back to
/// zero, matching how the player itself treats bad values.
fn parse_media_field(line: &str) -> Option<ProtocolEvent> {
    let mut parts = line.splitn(2, '=');
    let key = parts.next()?;
    let value = parts.next()?;

    let field = match key {
        "ID_VIDEO_FORMAT" => MediaField::VideoFormat(value.to_string()),
        "ID_VIDEO_BITRATE" => MediaField::VideoBitrate(parse_or_zero(value)),
        "ID_VIDEO_WIDTH" => MediaField::VideoWidth(parse_or_zero(value)),
        "ID_VIDEO_HEIGHT" => MediaField::VideoHeight(parse_or_zero(value)),
        "ID_VIDEO_FPS" => MediaField::VideoFps(value.parse().unwrap_or(0.0)),
        "ID_AUDIO_FORMAT" => MediaField::AudioFormat(value.to_string()),
        "ID_AUDIO_BITRATE" => MediaField::AudioBitrate(parse_or_zero(value)),
        "ID_AUDIO_RATE" => MediaField::SampleRate(parse_or_zero(value)),
        "ID_AUDIO_NCH" => MediaField::NumChannels(parse_or_zero(value)),
        "ID_LENGTH" => MediaField::Length(value.parse().unwrap_or(0.0)),
        "ID_SEEKABLE" => MediaField::Seekable(parse_or_zero(value) != 0),
        _ => {
            if let Some(index) = key.strip_prefix("ID_CLIP_INFO_NAME") {
                MediaField::TagName(index.parse().ok()?, value.to_string())
            } else if let Some(index) = key.strip_prefix("ID_CLIP_INFO_VALUE") {
                MediaField::TagValue(index.parse().ok()?, value.to_string())
            } else {
                return None;
            }
        }
    };
    Some(ProtocolEvent::Field(field))
}

fn parse_or_zero(value: &str) -> i32 {
    value.parse().unwrap_or(0)
}

/// Extracts the stream position from an `A:`/`V:` status line.
///
/// The line is tokenized on spaces and colons and the token following the
/// bare `V` marker is the position in seconds.
fn parse_position(line: &str) -> Option<ProtocolEvent> {
    let mut tokens = line
        .split(|c| c == ' ' || c == ':')
        .filter(|token| !token.is_empty());

    while let Some(token) = tokens.next() {
        if token == "V" {
            let position = tokens.next()?.parse::<f64>().ok()?;
            return Some(ProtocolEvent::Position(position));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playing_line_means_loading() {
        assert_eq!(
            parse_line("Playing /tmp/movie.mkv."),
            Some(ProtocolEvent::State(PlaybackState::Loading))
        );
    }

    #[test]
    fn test_cache_fill_means_buffering() {
        assert_eq!(
            parse_line("Cache fill:  5.32% (180224 bytes)"),
            Some(ProtocolEvent::State(PlaybackState::Buffering))
        );
    }

    #[test]
    fn test_starting_playback() {
        assert_eq!(parse_line("Starting playback..."), Some(ProtocolEvent::Started));
    }

    #[test]
    fn test_file_not_found_carries_the_path() {
        assert_eq!(
            parse_line("File not found: /tmp/missing.avi"),
            Some(ProtocolEvent::FileNotFound("/tmp/missing.avi".to_string()))
        );
    }

    #[test]
    fn test_exiting_means_not_started() {
        assert_eq!(
            parse_line("Exiting... (End of file)"),
            Some(ProtocolEvent::State(PlaybackState::NotStarted))
        );
    }

    #[test]
    fn test_identify_fields() {
        assert_eq!(
            parse_line("ID_VIDEO_WIDTH=1920"),
            Some(ProtocolEvent::Field(MediaField::VideoWidth(1920)))
        );
        assert_eq!(
            parse_line("ID_VIDEO_HEIGHT=1080"),
            Some(ProtocolEvent::Field(MediaField::VideoHeight(1080)))
        );
        assert_eq!(
            parse_line("ID_LENGTH=125.5"),
            Some(ProtocolEvent::Field(MediaField::Length(125.5)))
        );
        assert_eq!(
            parse_line("ID_SEEKABLE=1"),
            Some(ProtocolEvent::Field(MediaField::Seekable(true)))
        );
        assert_eq!(
            parse_line("ID_VIDEO_FPS=23.976"),
            Some(ProtocolEvent::Field(MediaField::VideoFps(23.976)))
        );
        assert_eq!(
            parse_line("ID_AUDIO_FORMAT=mp3"),
            Some(ProtocolEvent::Field(MediaField::AudioFormat("mp3".to_string())))
        );
    }

    #[test]
    fn test_clip_info_tag_pairs() {
        assert_eq!(
            parse_line("ID_CLIP_INFO_NAME0=artist"),
            Some(ProtocolEvent::Field(MediaField::TagName(0, "artist".to_string())))
        );
        assert_eq!(
            parse_line("ID_CLIP_INFO_VALUE0=Some Band"),
            Some(ProtocolEvent::Field(MediaField::TagValue(
                0,
                "Some Band".to_string()
            )))
        );
    }

    #[test]
    fn test_unknown_id_key_is_ignored() {
        assert_eq!(parse_line("ID_DEMUXER=mkv"), None);
    }

    #[test]
    fn test_id_line_without_value_is_ignored() {
        assert_eq!(parse_line("ID_VIDEO_WIDTH"), None);
    }

    #[test]
    fn test_bad_numeric_value_falls_back_to_zero() {
        assert_eq!(
            parse_line("ID_VIDEO_BITRATE=garbage"),
            Some(ProtocolEvent::Field(MediaField::VideoBitrate(0)))
        );
    }

    #[test]
    fn test_position_line() {
        assert_eq!(
            parse_line("A:  12.3 V:  45.6 A-V:  0.000 ct:  0.077"),
            Some(ProtocolEvent::Position(45.6))
        );
    }

    #[test]
    fn test_video_only_position_line() {
        assert_eq!(
            parse_line("V:   3.4   85/ 85  9%  0%  0.0% 0 0"),
            Some(ProtocolEvent::Position(3.4))
        );
    }

    #[test]
    fn test_position_line_without_video_marker() {
        assert_eq!(parse_line("A:  12.3 ct:  0.077"), None);
    }

    #[test]
    fn test_unrelated_line_produces_no_event() {
        assert_eq!(parse_line("MPlayer SVN-r34540 (C) 2000-2012 MPlayer Team"), None);
        assert_eq!(parse_line(""), None);
    }
}
