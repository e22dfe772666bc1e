//! Client for the opaque text-to-speech endpoint: a multipart
//! synthesize POST followed by polling its returned mp3 URL until the
//! audio is ready. Shape and timeout choices mirror the original
//! `_synthesize`/`_poll_mp3`.
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::fs::File;
use tokio_util::codec::{BytesCodec, FramedRead};

use crate::config::TtsConfig;
use crate::error::{BookError, BookResult};

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    mp3_url: Option<String>,
    duration: Option<i32>,
}

/// Result of a completed synthesis: the encoded audio bytes and the
/// duration the engine reported, if any.
#[derive(Debug)]
pub struct SynthesisOutput {
    pub audio: Vec<u8>,
    pub duration: Option<i32>,
}

pub struct TtsClient {
    client: Client,
    config: TtsConfig,
}

impl TtsClient {
    pub fn new(config: TtsConfig) -> BookResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| BookError::Synthesis(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Submit `text` for synthesis and poll until the mp3 is ready.
    pub async fn synthesize(&self, text: &str) -> BookResult<SynthesisOutput> {
        let response = self.request_synthesis(text).await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BookError::Synthesis(format!("TTS request failed ({status}): {body}")));
        }
        let payload: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| BookError::Synthesis(format!("malformed TTS response: {e}")))?;
        let mp3_url = payload
            .mp3_url
            .ok_or_else(|| BookError::Synthesis("TTS response missing mp3_url".to_string()))?;
        let audio = self.poll_mp3(&mp3_url).await?;
        Ok(SynthesisOutput {
            audio,
            duration: payload.duration,
        })
    }

    async fn request_synthesis(&self, text: &str) -> BookResult<reqwest::Response> {
        let file = File::open(&self.config.speaker_audio_path)
            .await
            .map_err(BookError::Io)?;
        let stream = FramedRead::new(file, BytesCodec::new());
        let body = reqwest::Body::wrap_stream(stream);
        let speaker_part = Part::stream(body)
            .file_name("speaker.wav")
            .mime_str("audio/wav")
            .map_err(|e| BookError::Synthesis(e.to_string()))?;

        // Fixed synthesis parameters matching the values the original
        // processor has tuned for this engine; not user-configurable.
        let form = Form::new()
            .text("text", text.to_string())
            .text("emotion_control_method", "0")
            .text("emotion_weight", "0.65")
            .text("emotion_random", "false")
            .text("max_text_tokens_per_segment", "120")
            .text("interval_silence", "200")
            .text("do_sample", "true")
            .text("top_p", "0.8")
            .text("top_k", "30")
            .text("temperature", "0.8")
            .text("length_penalty", "0.0")
            .text("num_beams", "3")
            .text("repetition_penalty", "10.0")
            .text("max_mel_tokens", "1500")
            .part("speaker_audio", speaker_part);

        let mut request = self.client.post(self.config.api_url.as_str()).multipart(form);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }
        request
            .send()
            .await
            .map_err(|e| BookError::Synthesis(format!("TTS request failed: {e}")))
    }

    async fn poll_mp3(&self, mp3_url: &str) -> BookResult<Vec<u8>> {
        let full_url = self.resolve_url(mp3_url);
        for attempt in 0..self.config.mp3_poll_attempts {
            let response = self
                .client
                .get(full_url.as_str())
                .timeout(Duration::from_secs(60))
                .send()
                .await
                .map_err(|e| BookError::Synthesis(format!("mp3 poll failed: {e}")))?;
            match response.status() {
                StatusCode::OK => {
                    return response
                        .bytes()
                        .await
                        .map(|b| b.to_vec())
                        .map_err(|e| BookError::Synthesis(format!("failed reading mp3 body: {e}")));
                }
                StatusCode::ACCEPTED => {
                    let wait = self.config.mp3_poll_interval * (attempt + 1);
                    tokio::time::sleep(wait).await;
                    continue;
                }
                status => {
                    return Err(BookError::Synthesis(format!("mp3 poll returned {status}")));
                }
            }
        }
        Err(BookError::Synthesis("mp3 not ready after polling".to_string()))
    }

    /// Resolve a possibly-relative mp3 URL against the synthesize
    /// endpoint, the same way `urljoin(tts_url, mp3_url)` does.
    fn resolve_url(&self, mp3_url: &str) -> String {
        match reqwest::Url::parse(&self.config.api_url).and_then(|base| base.join(mp3_url)) {
            Ok(joined) => joined.to_string(),
            Err(_) => mp3_url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_url: String, speaker_path: std::path::PathBuf) -> TtsConfig {
        TtsConfig {
            api_url,
            api_key: None,
            speaker_audio_path: speaker_path,
            mp3_poll_attempts: 3,
            mp3_poll_interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn synthesize_returns_audio_once_mp3_is_ready() {
        let server = MockServer::start().await;
        let speaker = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(speaker.path(), b"RIFF....WAVEfmt ").unwrap();

        Mock::given(method("POST"))
            .and(path("/synthesize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "mp3_url": "/mp3/1",
                "duration": 42,
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/mp3/1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"id3-audio".to_vec()))
            .mount(&server)
            .await;

        let config = test_config(format!("{}/synthesize", server.uri()), speaker.path().to_path_buf());
        let client = TtsClient::new(config).unwrap();
        let output = client.synthesize("hello world").await.unwrap();
        assert_eq!(output.audio, b"id3-audio");
        assert_eq!(output.duration, Some(42));
    }

    #[tokio::test]
    async fn synthesize_fails_when_mp3_url_missing() {
        let server = MockServer::start().await;
        let speaker = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(speaker.path(), b"RIFF").unwrap();

        Mock::given(method("POST"))
            .and(path("/synthesize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let config = test_config(format!("{}/synthesize", server.uri()), speaker.path().to_path_buf());
        let client = TtsClient::new(config).unwrap();
        let err = client.synthesize("hello").await.unwrap_err();
        assert!(matches!(err, BookError::Synthesis(_)));
    }

    #[tokio::test]
    async fn poll_gives_up_after_exhausting_attempts() {
        let server = MockServer::start().await;
        let speaker = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(speaker.path(), b"RIFF").unwrap();

        Mock::given(method("POST"))
            .and(path("/synthesize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "mp3_url": "/mp3/slow",
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/mp3/slow"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let config = test_config(format!("{}/synthesize", server.uri()), speaker.path().to_path_buf());
        let client = TtsClient::new(config).unwrap();
        let err = client.synthesize("hello").await.unwrap_err();
        assert!(matches!(err, BookError::Synthesis(_)));
    }
}
