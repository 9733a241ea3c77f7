use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

use super::{mismatched_source, DocumentLoader, LoadResult, Source};
use crate::captions::{CaptionService, TranscriptList, TranscriptSegment};
use crate::translate::TranslationAdapter;
use crate::LoaderError;

/// Loader for YouTube video caption tracks.
///
/// Retrieval runs a fallback chain: an English track of any origin wins
/// outright; otherwise the first generated track from a fixed candidate list
/// is fetched and translated into English. Every internal failure along that
/// chain is logged and swallowed; only the outer `load` converts the absence
/// into an error. The other loaders propagate failures directly - this one
/// deliberately does not.
pub struct YoutubeTranscriptLoader {
    captions: Arc<dyn CaptionService>,
    translator: TranslationAdapter,
}

/// Candidate languages for the generated-track fallback, in preference order.
/// Fixed set with no configuration surface.
const GENERATED_FALLBACK_LANGUAGES: [&str; 7] = ["en", "ja", "ko", "es", "fr", "de", "hi"];

const PREFERRED_LANGUAGES: [&str; 1] = ["en"];

const TRANSLATE_INSTRUCTION: &str = "Translate the following transcript into English:";

impl YoutubeTranscriptLoader {
    pub fn new(captions: Arc<dyn CaptionService>, translator: TranslationAdapter) -> Self {
        Self {
            captions,
            translator,
        }
    }

    /// Run the retrieval chain for one video.
    ///
    /// `None` covers every internal failure: listing errors, fetch errors,
    /// missing tracks, translation errors. Callers cannot tell these apart
    /// except from the logs.
    async fn fetch_transcript(&self, video_id: &str) -> Option<Vec<TranscriptSegment>> {
        let list = match self.captions.list_transcripts(video_id).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!("Transcript error: {}", e);
                return None;
            }
        };

        if let Some(track) = list.find_transcript(&PREFERRED_LANGUAGES) {
            return match self.captions.fetch_segments(track).await {
                Ok(segments) => Some(segments),
                Err(e) => {
                    tracing::error!("Transcript error: {}", e);
                    None
                }
            };
        }

        self.fallback_generated(&list).await
    }

    /// Fall back to a generated track in another language and translate it
    async fn fallback_generated(&self, list: &TranscriptList) -> Option<Vec<TranscriptSegment>> {
        let track = match list.find_generated_transcript(&GENERATED_FALLBACK_LANGUAGES) {
            Some(track) => track,
            None => {
                tracing::error!("No usable caption track for video {}", list.video_id);
                return None;
            }
        };

        tracing::info!(
            "Found non-English transcript ({}). Translating...",
            track.language_code
        );

        let segments = match self.captions.fetch_segments(track).await {
            Ok(segments) => segments,
            Err(e) => {
                tracing::error!("Error handling non-English transcript: {}", e);
                return None;
            }
        };

        self.translate_segments(&segments).await
    }

    /// Translate fetched segments into English.
    ///
    /// The translated lines become new untimed segments; the source
    /// start/duration values are discarded on this path.
    async fn translate_segments(
        &self,
        segments: &[TranscriptSegment],
    ) -> Option<Vec<TranscriptSegment>> {
        let full_text = join_segment_text(segments);
        let prompt = format!("{}\n{}", TRANSLATE_INSTRUCTION, full_text);

        let translated = self.translator.translate(&prompt).await?;

        Some(
            translated
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(TranscriptSegment::untimed)
                .collect(),
        )
    }
}

#[async_trait]
impl DocumentLoader for YoutubeTranscriptLoader {
    async fn load(&self, source: &Source) -> Result<LoadResult, LoaderError> {
        let url = match source {
            Source::Video { url } => url,
            other => return Err(mismatched_source(self.name(), other)),
        };

        let video_id = match extract_video_id(url) {
            Some(id) => id,
            None => {
                tracing::error!("Error extracting video ID from URL: {}", url);
                return Err(LoaderError::DocumentLoader("Invalid YouTube URL".to_string()));
            }
        };

        let segments = self
            .fetch_transcript(&video_id)
            .await
            .filter(|segments| !segments.is_empty())
            .ok_or_else(|| LoaderError::Transcription("No transcript available".to_string()))?;

        Ok(LoadResult::Video {
            transcript: join_segment_text(&segments),
        })
    }

    fn supports(&self, source: &Source) -> bool {
        matches!(source, Source::Video { .. })
    }

    fn name(&self) -> &'static str {
        "YoutubeTranscriptLoader"
    }
}

/// Join segment texts with single spaces
fn join_segment_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derive the 11-character video identifier from a YouTube URL
pub fn extract_video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.trim_start_matches("www.");

    let candidate = match host {
        "youtu.be" => parsed.path_segments()?.next().map(str::to_string),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" => {
            let mut segments = parsed.path_segments()?;
            match segments.next()? {
                "watch" => parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                "embed" | "v" | "shorts" | "live" => segments.next().map(str::to_string),
                _ => None,
            }
        }
        _ => None,
    }?;

    is_valid_video_id(&candidate).then_some(candidate)
}

fn is_valid_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::{CaptionError, CaptionTrack, MockCaptionService};
    use crate::gemini::{GeneratedText, MockTextGenerator};
    use anyhow::anyhow;
    use std::path::PathBuf;

    fn track(code: &str, generated: bool) -> CaptionTrack {
        CaptionTrack {
            language_code: code.to_string(),
            name: code.to_string(),
            is_generated: generated,
            base_url: format!("https://example.com/timedtext?lang={}", code),
        }
    }

    fn timed_segments(texts: &[&str]) -> Vec<TranscriptSegment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| TranscriptSegment {
                text: text.to_string(),
                start: Some(i as f64),
                duration: Some(1.0),
            })
            .collect()
    }

    fn loader(
        captions: MockCaptionService,
        generator: MockTextGenerator,
    ) -> YoutubeTranscriptLoader {
        YoutubeTranscriptLoader::new(
            Arc::new(captions),
            TranslationAdapter::new(Arc::new(generator)),
        )
    }

    fn video_source() -> Source {
        Source::Video {
            url: "https://youtu.be/T-D1OfcDW1M".to_string(),
        }
    }

    #[tokio::test]
    async fn english_track_returns_joined_segments_without_translation() {
        let mut captions = MockCaptionService::new();
        captions
            .expect_list_transcripts()
            .times(1)
            .returning(|id| Ok(TranscriptList::new(id, vec![track("fr", false), track("en", false)])));
        captions
            .expect_fetch_segments()
            .times(1)
            .withf(|track| track.language_code == "en")
            .returning(|_| Ok(timed_segments(&["Hello", "world"])));

        // No generate expectation: any translation call fails the test
        let loader = loader(captions, MockTextGenerator::new());
        let result = loader.load(&video_source()).await.unwrap();

        match result {
            LoadResult::Video { transcript } => assert_eq!(transcript, "Hello world"),
            other => panic!("expected video result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn generated_english_track_needs_no_translation() {
        let mut captions = MockCaptionService::new();
        captions
            .expect_list_transcripts()
            .times(1)
            .returning(|id| Ok(TranscriptList::new(id, vec![track("en", true)])));
        captions
            .expect_fetch_segments()
            .times(1)
            .returning(|_| Ok(timed_segments(&["auto", "caption"])));

        let loader = loader(captions, MockTextGenerator::new());
        let result = loader.load(&video_source()).await.unwrap();

        match result {
            LoadResult::Video { transcript } => assert_eq!(transcript, "auto caption"),
            other => panic!("expected video result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn generated_fallback_translates_once_and_drops_timing() {
        let mut captions = MockCaptionService::new();
        captions
            .expect_list_transcripts()
            .times(1)
            .returning(|id| Ok(TranscriptList::new(id, vec![track("ja", true)])));
        captions
            .expect_fetch_segments()
            .times(1)
            .withf(|track| track.language_code == "ja" && track.is_generated)
            .returning(|_| Ok(timed_segments(&["第一", "第二"])));

        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .withf(|prompt| {
                prompt.starts_with("Translate the following transcript into English:\n")
                    && prompt.contains("第一 第二")
            })
            .returning(|_| {
                Ok(GeneratedText {
                    text: "First line\n\n  \nSecond line\n".to_string(),
                })
            });

        let loader = loader(captions, generator);
        let result = loader.load(&video_source()).await.unwrap();

        match result {
            LoadResult::Video { transcript } => {
                assert_eq!(transcript, "First line Second line");
            }
            other => panic!("expected video result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn disabled_captions_become_no_transcript_available() {
        let mut captions = MockCaptionService::new();
        captions.expect_list_transcripts().times(1).returning(|id| {
            Err(CaptionError::Disabled {
                video_id: id.to_string(),
            })
        });

        let loader = loader(captions, MockTextGenerator::new());
        let err = loader.load(&video_source()).await.unwrap_err();

        assert!(matches!(err, LoaderError::Transcription(_)));
        assert_eq!(err.to_string(), "No transcript available");
    }

    #[tokio::test]
    async fn no_matching_tracks_become_no_transcript_available() {
        let mut captions = MockCaptionService::new();
        captions
            .expect_list_transcripts()
            .times(1)
            .returning(|id| Ok(TranscriptList::new(id, vec![track("fr", false)])));

        let loader = loader(captions, MockTextGenerator::new());
        let err = loader.load(&video_source()).await.unwrap_err();
        assert_eq!(err.to_string(), "No transcript available");
    }

    #[tokio::test]
    async fn preferred_track_fetch_error_is_swallowed_to_no_transcript() {
        let mut captions = MockCaptionService::new();
        captions
            .expect_list_transcripts()
            .times(1)
            .returning(|id| Ok(TranscriptList::new(id, vec![track("en", false)])));
        captions
            .expect_fetch_segments()
            .times(1)
            .returning(|_| Err(CaptionError::Http("connection reset".to_string())));

        let loader = loader(captions, MockTextGenerator::new());
        let err = loader.load(&video_source()).await.unwrap_err();
        assert_eq!(err.to_string(), "No transcript available");
    }

    #[tokio::test]
    async fn translation_failure_becomes_no_transcript_available() {
        let mut captions = MockCaptionService::new();
        captions
            .expect_list_transcripts()
            .times(1)
            .returning(|id| Ok(TranscriptList::new(id, vec![track("ko", true)])));
        captions
            .expect_fetch_segments()
            .times(1)
            .returning(|_| Ok(timed_segments(&["안녕"])));

        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Err(anyhow!("model unavailable")));

        let loader = loader(captions, generator);
        let err = loader.load(&video_source()).await.unwrap_err();
        assert_eq!(err.to_string(), "No transcript available");
    }

    #[tokio::test]
    async fn blank_translation_output_becomes_no_transcript_available() {
        let mut captions = MockCaptionService::new();
        captions
            .expect_list_transcripts()
            .times(1)
            .returning(|id| Ok(TranscriptList::new(id, vec![track("es", true)])));
        captions
            .expect_fetch_segments()
            .times(1)
            .returning(|_| Ok(timed_segments(&["hola"])));

        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| {
                Ok(GeneratedText {
                    text: "\n  \n".to_string(),
                })
            });

        let loader = loader(captions, generator);
        let err = loader.load(&video_source()).await.unwrap_err();
        assert_eq!(err.to_string(), "No transcript available");
    }

    #[tokio::test]
    async fn malformed_url_is_rejected_before_any_service_call() {
        // No expectations: a caption or model call would fail the test
        let loader = loader(MockCaptionService::new(), MockTextGenerator::new());

        let source = Source::Video {
            url: "not a youtube url".to_string(),
        };
        let err = loader.load(&source).await.unwrap_err();

        assert!(matches!(err, LoaderError::DocumentLoader(_)));
        assert_eq!(err.to_string(), "Invalid YouTube URL");
    }

    #[tokio::test]
    async fn load_rejects_non_video_sources() {
        let loader = loader(MockCaptionService::new(), MockTextGenerator::new());

        let source = Source::Document {
            path: PathBuf::from("notes.txt"),
        };
        let err = loader.load(&source).await.unwrap_err();
        assert!(err.to_string().contains("cannot handle document source"));
    }

    #[test]
    fn extracts_video_id_from_common_url_forms() {
        let cases = [
            "https://www.youtube.com/watch?v=T-D1OfcDW1M",
            "https://youtube.com/watch?v=T-D1OfcDW1M&t=42s",
            "https://youtu.be/T-D1OfcDW1M?si=WOlSKx3YXpWQgJ1m",
            "https://www.youtube.com/embed/T-D1OfcDW1M",
            "https://www.youtube.com/v/T-D1OfcDW1M",
            "https://www.youtube.com/shorts/T-D1OfcDW1M",
            "https://m.youtube.com/watch?v=T-D1OfcDW1M",
        ];

        for url in cases {
            assert_eq!(
                extract_video_id(url).as_deref(),
                Some("T-D1OfcDW1M"),
                "failed for {}",
                url
            );
        }
    }

    #[test]
    fn rejects_urls_without_a_video_id() {
        let cases = [
            "not a url",
            "https://example.com/watch?v=T-D1OfcDW1M",
            "https://www.youtube.com/watch",
            "https://www.youtube.com/watch?v=tooshort",
            "https://www.youtube.com/playlist?list=PL123",
            "ftp://youtu.be/T-D1OfcDW1M",
        ];

        for url in cases {
            assert!(extract_video_id(url).is_none(), "accepted {}", url);
        }
    }
}
