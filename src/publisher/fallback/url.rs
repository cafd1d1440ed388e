//! Published-URL parsing for the success indicator
//!
//! The share link exposed after publishing comes in several shapes depending
//! on surface version and content type:
//! - Watch form: `https://video.example.com/watch?v={id}`
//! - Short-form path: `https://video.example.com/shorts/{id}`
//! - Short share link: `https://sho.rt/{id}`

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use super::error::AutomationError;

static WATCH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]v=([A-Za-z0-9_-]{6,})").unwrap());

static SHORTS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/shorts/([A-Za-z0-9_-]{6,})").unwrap());

static BARE_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([A-Za-z0-9_-]{6,})$").unwrap());

/// Extract the platform content identifier from a shareable URL
pub fn extract_video_id(raw: &str) -> Result<String, AutomationError> {
    if let Some(caps) = WATCH_PATTERN.captures(raw) {
        return Ok(caps[1].to_string());
    }

    if let Some(caps) = SHORTS_PATTERN.captures(raw) {
        return Ok(caps[1].to_string());
    }

    // Short share links carry the id as the whole path
    if let Ok(parsed) = Url::parse(raw) {
        if let Some(caps) = BARE_ID_PATTERN.captures(parsed.path()) {
            return Ok(caps[1].to_string());
        }
    }

    Err(AutomationError::UrlParse {
        url: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_form() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://studio.youtube.com/watch?feature=share&v=abc123XYZ_-").unwrap(),
            "abc123XYZ_-"
        );
    }

    #[test]
    fn test_shorts_path() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/s0meSh0rtID").unwrap(),
            "s0meSh0rtID"
        );
    }

    #[test]
    fn test_short_share_link() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_unrecognized_url() {
        let err = extract_video_id("https://example.com/nothing/here?x=1").unwrap_err();
        assert!(matches!(err, AutomationError::UrlParse { .. }));

        // Too-short ids are rejected rather than misparsed
        assert!(extract_video_id("https://youtu.be/ab").is_err());
    }
}
