use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single caption cue as produced by the caption service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Cue text
    pub text: String,

    /// Start offset in seconds, when the track carries timing
    pub start: Option<f64>,

    /// Cue duration in seconds, when the track carries timing
    pub duration: Option<f64>,
}

impl TranscriptSegment {
    /// Build an untimed segment (used for translated lines, which lose timing)
    pub fn untimed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start: None,
            duration: None,
        }
    }
}

/// A named caption track available for a video
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    /// BCP-47 style language code, e.g. "en" or "ja"
    pub language_code: String,

    /// Human-readable track name
    pub name: String,

    /// True for auto-generated (ASR) tracks, false for manually authored ones
    pub is_generated: bool,

    /// Timedtext URL the segments can be fetched from
    pub base_url: String,
}

/// The caption tracks listed for a single video
#[derive(Debug, Clone)]
pub struct TranscriptList {
    pub video_id: String,
    tracks: Vec<CaptionTrack>,
}

impl TranscriptList {
    pub fn new(video_id: impl Into<String>, tracks: Vec<CaptionTrack>) -> Self {
        Self {
            video_id: video_id.into(),
            tracks,
        }
    }

    pub fn tracks(&self) -> &[CaptionTrack] {
        &self.tracks
    }

    /// Find a track matching one of the requested languages, any origin.
    ///
    /// Languages are tried in the given order; for each language manually
    /// authored tracks win over generated ones, mirroring the preference
    /// order of the caption service itself.
    pub fn find_transcript(&self, language_codes: &[&str]) -> Option<&CaptionTrack> {
        for code in language_codes {
            let found = self
                .tracks
                .iter()
                .find(|t| !t.is_generated && t.language_code == *code)
                .or_else(|| self.tracks.iter().find(|t| t.language_code == *code));
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Find a generated-only track, trying the candidate languages in order
    pub fn find_generated_transcript(&self, language_codes: &[&str]) -> Option<&CaptionTrack> {
        for code in language_codes {
            if let Some(track) = self
                .tracks
                .iter()
                .find(|t| t.is_generated && t.language_code == *code)
            {
                return Some(track);
            }
        }
        None
    }
}

/// Errors from the caption service
#[derive(thiserror::Error, Debug)]
pub enum CaptionError {
    #[error("Transcripts are disabled for video {video_id}")]
    Disabled { video_id: String },

    #[error("Video {video_id} is unavailable")]
    VideoNotFound { video_id: String },

    #[error("Caption request failed: {0}")]
    Http(String),

    #[error("Failed to parse caption data: {0}")]
    Parse(String),
}

/// External caption-listing and caption-fetching service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionService: Send + Sync {
    /// List every caption track available for a video
    async fn list_transcripts(&self, video_id: &str) -> Result<TranscriptList, CaptionError>;

    /// Fetch the cue sequence for one track
    async fn fetch_segments(
        &self,
        track: &CaptionTrack,
    ) -> Result<Vec<TranscriptSegment>, CaptionError>;
}

/// Caption client backed by the YouTube watch page and timedtext endpoint
pub struct YoutubeCaptionClient {
    client: reqwest::Client,
}

const WATCH_URL: &str = "https://www.youtube.com/watch";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

impl YoutubeCaptionClient {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self { client }
    }

    async fn fetch_watch_page(&self, video_id: &str) -> Result<String, CaptionError> {
        let response = self
            .client
            .get(WATCH_URL)
            .query(&[("v", video_id)])
            .header("User-Agent", USER_AGENT)
            .header("Accept-Language", "en-US,en")
            // Skips the EU consent interstitial, which hides the player response
            .header("Cookie", "CONSENT=YES+")
            .send()
            .await
            .map_err(|e| CaptionError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CaptionError::Http(format!("HTTP {}", response.status())));
        }

        response
            .text()
            .await
            .map_err(|e| CaptionError::Http(e.to_string()))
    }
}

#[async_trait]
impl CaptionService for YoutubeCaptionClient {
    async fn list_transcripts(&self, video_id: &str) -> Result<TranscriptList, CaptionError> {
        tracing::debug!("Listing caption tracks for video: {}", video_id);

        let html = self.fetch_watch_page(video_id).await?;
        parse_transcript_list(video_id, &html)
    }

    async fn fetch_segments(
        &self,
        track: &CaptionTrack,
    ) -> Result<Vec<TranscriptSegment>, CaptionError> {
        tracing::debug!(
            "Fetching {} caption segments ({})",
            track.language_code,
            if track.is_generated { "generated" } else { "manual" }
        );

        let url = format!("{}&fmt=json3", track.base_url);
        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| CaptionError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CaptionError::Http(format!("HTTP {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CaptionError::Http(e.to_string()))?;

        parse_json3_segments(&body)
    }
}

/// Raw caption track entry as embedded in the watch page player response
#[derive(Debug, Deserialize)]
struct RawCaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    #[serde(default)]
    name: Option<serde_json::Value>,
    #[serde(default)]
    kind: Option<String>,
}

/// Extract the caption track list from the watch page HTML
fn parse_transcript_list(video_id: &str, html: &str) -> Result<TranscriptList, CaptionError> {
    if html.contains(r#""playabilityStatus":{"status":"ERROR""#) {
        return Err(CaptionError::VideoNotFound {
            video_id: video_id.to_string(),
        });
    }

    let raw_tracks = match extract_json_array(html, "captionTracks") {
        Some(json) => serde_json::from_str::<Vec<RawCaptionTrack>>(json)
            .map_err(|e| CaptionError::Parse(e.to_string()))?,
        None => {
            return Err(CaptionError::Disabled {
                video_id: video_id.to_string(),
            })
        }
    };

    let tracks = raw_tracks
        .into_iter()
        .map(|raw| CaptionTrack {
            name: track_display_name(raw.name.as_ref(), &raw.language_code),
            is_generated: raw.kind.as_deref() == Some("asr"),
            language_code: raw.language_code,
            base_url: raw.base_url,
        })
        .collect();

    Ok(TranscriptList::new(video_id, tracks))
}

/// The track name appears either as {"simpleText": ...} or {"runs": [{"text": ...}]}
fn track_display_name(name: Option<&serde_json::Value>, language_code: &str) -> String {
    name.and_then(|value| {
        value["simpleText"]
            .as_str()
            .or_else(|| value["runs"][0]["text"].as_str())
            .map(|s| s.to_string())
    })
    .unwrap_or_else(|| language_code.to_string())
}

/// Locate `"<key>":` in `text` and return the JSON array that follows it.
///
/// Bracket matching is string- and escape-aware, since track URLs routinely
/// contain brackets in query parameters.
fn extract_json_array<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let marker = format!("\"{}\":", key);
    let start = text.find(&marker)? + marker.len();
    let rest = &text[start..];
    let open = rest.find('[')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in rest[open..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '[' if !in_string => depth += 1,
            ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&rest[open..open + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

#[derive(Debug, Deserialize)]
struct Json3Response {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs")]
    start_ms: Option<i64>,
    #[serde(rename = "dDurationMs")]
    duration_ms: Option<i64>,
    #[serde(default)]
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    utf8: Option<String>,
}

/// Map a json3 timedtext body to cue segments, skipping non-text events
fn parse_json3_segments(body: &str) -> Result<Vec<TranscriptSegment>, CaptionError> {
    let response: Json3Response =
        serde_json::from_str(body).map_err(|e| CaptionError::Parse(e.to_string()))?;

    let segments = response
        .events
        .into_iter()
        .filter_map(|event| {
            let segs = event.segs?;
            let text = segs
                .into_iter()
                .filter_map(|seg| seg.utf8)
                .collect::<String>();
            let text = text.trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSegment {
                text,
                start: event.start_ms.map(|ms| ms as f64 / 1000.0),
                duration: event.duration_ms.map(|ms| ms as f64 / 1000.0),
            })
        })
        .collect();

    Ok(segments)
}
