//! Blob storage for finished chapter audio: upload plus a pre-signed
//! GET URL, the same two-step handoff as the original
//! `AudioStorageClient`. A trait keeps the worker decoupled from the
//! AWS SDK — `#[async_trait]` is the same pattern the teacher uses to
//! put async methods on a trait object for its external API clients.
use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::config::StorageConfig;
use crate::error::{BookError, BookResult};

/// Derive the object key for a chapter's audio file.
///
/// The two-character md5 prefix of `book_id` spreads objects across S3
/// partitions instead of clustering every book's chapters under one
/// `audio/<book_id>/` prefix — a common bucket-hotspot mitigation the
/// original importer already applied.
pub fn generate_audio_key(book_id: i64, chapter_index: i32) -> String {
    let digest = md5::compute(book_id.to_string());
    let prefix = format!("{digest:x}");
    format!("audio/{}/{book_id}/{chapter_index}.mp3", &prefix[..2])
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload `content` under `key`, returning the key unchanged on
    /// success (mirrors `upload_file`'s return value, which callers use
    /// to chain into `generate_presigned_url` without re-deriving it).
    async fn upload(&self, key: &str, content: Vec<u8>) -> BookResult<String>;

    /// Produce a time-limited GET URL for `key`.
    async fn presigned_url(&self, key: &str) -> BookResult<String>;
}

pub struct S3Store {
    client: Client,
    bucket: String,
    presign_expiration: std::time::Duration,
}

impl S3Store {
    pub async fn connect(config: &StorageConfig) -> BookResult<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(config.region.clone()))
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                config.access_key.as_str(),
                config.secret_key.as_str(),
                None,
                None,
                "bookcast-storage-config",
            ));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint.as_str());
        }
        let shared = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if config.endpoint.is_some() {
            // Non-AWS endpoints (e.g. MinIO) generally need path-style
            // addressing; virtual-hosted-style requires per-bucket DNS.
            builder = builder.force_path_style(true);
        }
        let client = Client::from_conf(builder.build());
        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            presign_expiration: config.presign_expiration,
        })
    }
}

#[async_trait]
impl BlobStore for S3Store {
    async fn upload(&self, key: &str, content: Vec<u8>) -> BookResult<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(content))
            .content_type("audio/mpeg")
            .send()
            .await
            .map_err(|e| BookError::Upload(e.to_string()))?;
        Ok(key.to_string())
    }

    async fn presigned_url(&self, key: &str) -> BookResult<String> {
        let presign_config = PresigningConfig::expires_in(self.presign_expiration)
            .map_err(|e| BookError::Presign(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| BookError::Presign(e.to_string()))?;
        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_key_uses_two_char_md5_prefix_and_mp3_suffix() {
        let key = generate_audio_key(42, 3);
        assert!(key.starts_with("audio/"));
        assert!(key.ends_with("/42/3.mp3"));
        let prefix = key.strip_prefix("audio/").unwrap().split('/').next().unwrap();
        assert_eq!(prefix.len(), 2);
    }

    #[test]
    fn audio_key_is_deterministic() {
        assert_eq!(generate_audio_key(1, 1), generate_audio_key(1, 1));
        assert_ne!(generate_audio_key(1, 1), generate_audio_key(2, 1));
    }
}
