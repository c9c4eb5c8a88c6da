use std::{
    path::{Component, Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_config::{meta::region::RegionProviderChain, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client as S3Client,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{auth::jwt::JwtService, config::AppConfig};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
        content_disposition: Option<String>,
    ) -> Result<()>;

    async fn presign_get_object(&self, key: &str, expires_in: Duration) -> Result<String>;

    async fn get_object(&self, key: &str) -> Result<Vec<u8>>;

    async fn delete_object(&self, key: &str) -> Result<()>;
}

/// Keeps the extension and a readable stem, drops everything path-like.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned: String = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.chars().take(120).collect()
    }
}

/// `<prefix>/<owner>-<sha256[..12]>-<file>`: re-uploading identical bytes
/// lands on the same key.
pub fn content_key(prefix: &str, owner: Uuid, file_name: &str, bytes: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    format!(
        "{prefix}/{owner}-{}-{}",
        &digest[..12],
        sanitize_file_name(file_name)
    )
}

pub fn inline_content_disposition(filename: &str) -> Option<String> {
    if filename.is_empty() {
        return None;
    }

    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            _ => ch,
        })
        .collect();

    let encoded =
        percent_encoding::utf8_percent_encode(&sanitized, percent_encoding::NON_ALPHANUMERIC);
    Some(format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    ))
}

pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Client for `bucket` using the configured region, endpoint and static
    /// credentials when both keys are present. Path-style addressing keeps
    /// MinIO-style endpoints working.
    pub async fn from_config(config: &AppConfig, bucket: impl Into<String>) -> Self {
        let region_provider =
            RegionProviderChain::first_try(Some(Region::new(config.aws_region.clone())))
                .or_default_provider()
                .or_else("us-east-1");
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);

        if let Some(endpoint) = &config.aws_endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(access_key), Some(secret_key)) =
            (&config.aws_access_key_id, &config.aws_secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "jobboard-config",
            ));
        }

        let shared = loader.load().await;
        let s3_config = S3ConfigBuilder::from(&shared).force_path_style(true).build();
        Self::new(S3Client::from_conf(s3_config), bucket)
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
        content_disposition: Option<String>,
    ) -> Result<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes));

        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }

        if let Some(content_disposition) = content_disposition {
            request = request.content_disposition(content_disposition);
        }

        request
            .send()
            .await
            .context("failed to upload object to S3")?;

        Ok(())
    }

    async fn presign_get_object(&self, key: &str, expires_in: Duration) -> Result<String> {
        let presign_config = PresigningConfig::builder()
            .expires_in(expires_in)
            .build()
            .context("failed to build S3 presigning config")?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .context("failed to generate presigned download URL")?;

        Ok(presigned.uri().to_string())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("failed to download object from S3")?;

        let bytes = response
            .body
            .collect()
            .await
            .context("failed to read object stream")?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("failed to delete object from S3")?;
        Ok(())
    }
}

/// Object storage rooted in a local directory.
///
/// Presigned links point at the API's own file route and carry a short-lived
/// signed token naming the key.
pub struct FsStorage {
    root: PathBuf,
    signer: JwtService,
    download_base: String,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>, signer: JwtService, download_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            signer,
            download_base: download_base.into(),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if key.is_empty() || !safe {
            return Err(anyhow!("invalid object key '{key}'"));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for FsStorage {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: Option<String>,
        _content_disposition: Option<String>,
    ) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    async fn presign_get_object(&self, key: &str, expires_in: Duration) -> Result<String> {
        let path = self.resolve(key)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(anyhow!("object '{key}' does not exist"));
        }
        let token = self.signer.generate_file_token(key, expires_in)?;
        Ok(format!("{}/{token}", self.download_base.trim_end_matches('/')))
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to delete {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn fs_storage(root: &Path) -> FsStorage {
        let jwt = JwtService::from_config(&AppConfig::for_tests("fs-secret")).expect("jwt");
        FsStorage::new(root, jwt, "/api/v1/files/download")
    }

    #[test]
    fn content_key_is_stable_and_sanitized() {
        let owner = Uuid::new_v4();
        let first = content_key("resumes", owner, "../My CV (final).pdf", b"bytes");
        let second = content_key("resumes", owner, "../My CV (final).pdf", b"bytes");
        assert_eq!(first, second);
        assert!(first.starts_with(&format!("resumes/{owner}-")));
        assert!(first.ends_with("-My_CV__final_.pdf"));
        assert_ne!(first, content_key("resumes", owner, "My CV (final).pdf", b"other"));
    }

    #[test]
    fn sanitize_rejects_hidden_and_empty_names() {
        assert_eq!(sanitize_file_name(".."), "file");
        assert_eq!(sanitize_file_name("C:\\docs\\cv.docx"), "cv.docx");
    }

    #[tokio::test]
    async fn fs_storage_round_trips_and_signs_links() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = fs_storage(dir.path());

        storage
            .put_object("reports/a.csv", b"a,b\n".to_vec(), None, None)
            .await
            .expect("put");
        assert_eq!(storage.get_object("reports/a.csv").await.expect("get"), b"a,b\n");

        let link = storage
            .presign_get_object("reports/a.csv", Duration::from_secs(60))
            .await
            .expect("presign");
        assert!(link.starts_with("/api/v1/files/download/"));

        storage.delete_object("reports/a.csv").await.expect("delete");
        assert!(storage.get_object("reports/a.csv").await.is_err());
        storage
            .delete_object("reports/a.csv")
            .await
            .expect("second delete is a no-op");
    }

    #[tokio::test]
    async fn fs_storage_refuses_escaping_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = fs_storage(dir.path());
        assert!(storage
            .put_object("../escape.txt", Vec::new(), None, None)
            .await
            .is_err());
        assert!(storage.get_object("/etc/passwd").await.is_err());
    }
}
