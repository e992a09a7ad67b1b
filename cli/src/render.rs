//! Plain-text rendering of tracks and failures for the terminal.

use crate::{error::GenerationError, track::Track};

const MISSING: &str = "-";
const MAX_BODY_CHARS: usize = 500;

pub fn describe_track(index: usize, track: &Track) -> Vec<String> {
    let mut lines = vec![
        format!("Track {}: {}", index + 1, track.title),
        format!("  id:      {}", track.id),
        format!("  status:  {}", track.status.as_deref().unwrap_or(MISSING)),
        format!("  model:   {}", track.model_name.as_deref().unwrap_or(MISSING)),
        format!("  created: {}", track.created_at.as_deref().unwrap_or(MISSING)),
    ];

    match track.audio_url.as_deref() {
        Some(url) => lines.push(format!("  audio:   {url}")),
        None => lines.push("  audio:   not available yet".to_string()),
    }
    if let Some(url) = track.image_url.as_deref() {
        lines.push(format!("  cover:   {url}"));
    }
    if let Some(message) = track.error_message.as_deref() {
        lines.push(format!("  error:   {message}"));
    }
    if let Some(lyrics) = track.lyrics.as_deref() {
        lines.push("  lyrics:".to_string());
        lines.extend(lyrics.lines().map(|line| format!("    {line}")));
    }
    lines
}

pub fn describe_tracks(tracks: &[Track]) -> String {
    if tracks.is_empty() {
        return "No tracks returned.".to_string();
    }
    tracks
        .iter()
        .enumerate()
        .map(|(index, track)| describe_track(index, track).join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn describe_error(err: &GenerationError) -> String {
    match err {
        GenerationError::InvalidRequest(reason) => format!("Request rejected: {reason}"),
        GenerationError::MissingCredential => {
            "No API key configured. Set SUNO_API_KEY or api_key in config.toml.".to_string()
        }
        GenerationError::Timeout => "The music API did not answer in time.".to_string(),
        GenerationError::ConnectionFailed { message } => {
            format!("Could not connect to the music API ({message}). Check your network connection.")
        }
        GenerationError::TransportError { message } => format!("Request to the music API failed: {message}"),
        GenerationError::ApiError { status_code, body_text } => {
            format!("The music API responded with status {status_code}: {}", truncate(body_text))
        }
        GenerationError::UnexpectedResponseShape { raw } => {
            format!("Unexpected response from the music API: {}", truncate(raw))
        }
    }
}

fn truncate(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(MAX_BODY_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn finished() -> Track {
        Track {
            id: "t1".into(),
            title: "Sunny Day Song".into(),
            status: Some("complete".into()),
            model_name: Some("chirp-v3-5".into()),
            created_at: None,
            audio_url: Some("https://cdn/t1.mp3".into()),
            image_url: Some("https://cdn/t1.png".into()),
            lyrics: Some("[Verse]\nHello sun".into()),
            error_message: None,
            extras: Map::new(),
        }
    }

    #[test]
    fn finished_track_lists_media_and_lyrics() {
        let lines = describe_track(0, &finished());
        assert_eq!(lines[0], "Track 1: Sunny Day Song");
        assert!(lines.contains(&"  created: -".to_string()));
        assert!(lines.contains(&"  audio:   https://cdn/t1.mp3".to_string()));
        assert!(lines.contains(&"  cover:   https://cdn/t1.png".to_string()));
        assert_eq!(lines[lines.len() - 2..], ["    [Verse]".to_string(), "    Hello sun".to_string()]);
    }

    #[test]
    fn failed_track_shows_its_error() {
        let mut track = finished();
        track.audio_url = None;
        track.error_message = Some("content moderated".into());
        let text = describe_track(1, &track).join("\n");
        assert!(text.starts_with("Track 2:"));
        assert!(text.contains("audio:   not available yet"));
        assert!(text.contains("error:   content moderated"));
    }

    #[test]
    fn api_errors_keep_status_and_body() {
        let text = describe_error(&GenerationError::ApiError {
            status_code: 500,
            body_text: "server error".into(),
        });
        assert_eq!(text, "The music API responded with status 500: server error");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let raw = "x".repeat(MAX_BODY_CHARS + 20);
        let text = describe_error(&GenerationError::UnexpectedResponseShape { raw });
        assert!(text.ends_with('…'));
        assert!(text.len() < MAX_BODY_CHARS + 60);
    }

    #[test]
    fn empty_result_has_a_message() {
        assert_eq!(describe_tracks(&[]), "No tracks returned.");
    }
}
