use std::sync::Arc;

use crate::gemini::TextGenerator;

/// Fail-soft wrapper around a generative-model call.
///
/// The caption pipeline treats translation as optional: any failure here is
/// logged and swallowed, never raised. No retries, no chunking - a transcript
/// too large for one model call fails the step with no partial output.
#[derive(Clone)]
pub struct TranslationAdapter {
    model: Arc<dyn TextGenerator>,
}

impl TranslationAdapter {
    pub fn new(model: Arc<dyn TextGenerator>) -> Self {
        Self { model }
    }

    /// Run one generation call and return the trimmed output text.
    ///
    /// Returns `None` on any model failure or on blank output.
    pub async fn translate(&self, prompt: &str) -> Option<String> {
        match self.model.generate(prompt).await {
            Ok(generated) => {
                let text = generated.text.trim();
                if text.is_empty() {
                    tracing::warn!("Translation returned empty output");
                    None
                } else {
                    Some(text.to_string())
                }
            }
            Err(e) => {
                tracing::error!("Translation error: {}", e);
                None
            }
        }
    }
}
