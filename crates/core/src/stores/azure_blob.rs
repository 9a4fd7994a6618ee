use crate::config::{StorageCredential, StorageSettings};
use crate::traits::ImageStore;
use crate::{UploadError, UploadedImage};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

const STORAGE_VERSION: &str = "2021-08-06";

/// Block-blob uploads into one container.
pub struct AzureBlobStore {
    client: Client,
    blob_endpoint: Url,
    container: String,
    credential: StorageCredential,
}

impl AzureBlobStore {
    pub fn new(settings: &StorageSettings) -> Result<Self, UploadError> {
        let client = Client::builder().timeout(settings.timeout).build()?;

        Ok(Self {
            client,
            blob_endpoint: settings.connection.blob_endpoint.clone(),
            container: settings.container.clone(),
            credential: settings.connection.credential.clone(),
        })
    }

    /// Public locator of a blob, without any credentials attached.
    fn blob_url(&self, blob_name: &str) -> Result<Url, UploadError> {
        let mut url = self.blob_endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| UploadError::Signing("blob endpoint cannot be a base".to_string()))?
            .pop_if_empty()
            .extend([self.container.as_str(), blob_name]);
        Ok(url)
    }
}

#[async_trait]
impl ImageStore for AzureBlobStore {
    async fn upload(&self, image: &UploadedImage) -> Result<String, UploadError> {
        let blob_name = unique_blob_name(image.file_name.as_deref().unwrap_or_default());
        let locator = self.blob_url(&blob_name)?;
        let content_type = image
            .content_type
            .clone()
            .unwrap_or_else(|| guess_content_type(&blob_name).to_string());
        let date = http_date(Utc::now());

        let mut request_url = locator.clone();
        if let StorageCredential::Sas(token) = &self.credential {
            request_url.set_query(Some(token));
        }

        let mut request = self
            .client
            .put(request_url)
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-date", &date)
            .header("x-ms-version", STORAGE_VERSION)
            .header("Content-Type", &content_type);

        if let StorageCredential::SharedKey { account, key } = &self.credential {
            let string_to_sign = put_blob_string_to_sign(
                image.bytes.len(),
                &content_type,
                &date,
                account,
                locator.path(),
            );
            let signature = sign(key, &string_to_sign)?;
            request = request.header("Authorization", format!("SharedKey {account}:{signature}"));
        }

        let response = request
            .body(image.bytes.clone())
            .send()
            .await
            .map_err(UploadError::from_transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(blob = %blob_name, status = status.as_u16(), "blob upload rejected");
            return Err(UploadError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        debug!(blob = %blob_name, bytes = image.bytes.len(), "blob uploaded");
        Ok(locator.to_string())
    }
}

/// Sanitized original name behind a v4 uuid, so concurrent uploads never collide.
pub fn unique_blob_name(original: &str) -> String {
    format!("{}-{}", Uuid::new_v4(), sanitize_file_name(original))
}

pub fn sanitize_file_name(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

fn guess_content_type(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn put_blob_string_to_sign(
    content_length: usize,
    content_type: &str,
    date: &str,
    account: &str,
    path: &str,
) -> String {
    let length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };

    // verb, encoding, language, length, md5, type, date, if-modified-since,
    // if-match, if-none-match, if-unmodified-since, range
    format!(
        "PUT\n\n\n{length}\n\n{content_type}\n\n\n\n\n\n\nx-ms-blob-type:BlockBlob\nx-ms-date:{date}\nx-ms-version:{STORAGE_VERSION}\n/{account}{path}"
    )
}

fn sign(key: &[u8], string_to_sign: &str) -> Result<String, UploadError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|error| UploadError::Signing(error.to_string()))?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConnection;
    use chrono::TimeZone;

    #[test]
    fn sanitize_strips_paths_and_unsafe_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\front bumper.JPG"), "front_bumper.JPG");
        assert_eq!(sanitize_file_name("çar (1).png"), "ar_1.png");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "image");
        assert_eq!(sanitize_file_name("###"), "image");
    }

    #[test]
    fn blob_names_are_unique_per_upload() {
        let first = unique_blob_name("door.jpg");
        let second = unique_blob_name("door.jpg");
        assert_ne!(first, second);
        assert!(first.ends_with("-door.jpg"));
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(guess_content_type("a.JPEG"), "image/jpeg");
        assert_eq!(guess_content_type("a.png"), "image/png");
        assert_eq!(guess_content_type("noext"), "application/octet-stream");
    }

    #[test]
    fn http_date_is_rfc1123() {
        let instant = Utc
            .with_ymd_and_hms(2024, 3, 5, 7, 8, 9)
            .single()
            .expect("valid instant");
        assert_eq!(http_date(instant), "Tue, 05 Mar 2024 07:08:09 GMT");
    }

    #[test]
    fn string_to_sign_uses_canonical_layout() {
        let signed = put_blob_string_to_sign(
            3,
            "image/png",
            "Tue, 05 Mar 2024 07:08:09 GMT",
            "photos",
            "/uploads/a.png",
        );
        let lines: Vec<&str> = signed.split('\n').collect();
        assert_eq!(lines[0], "PUT");
        assert_eq!(lines[3], "3");
        assert_eq!(lines[5], "image/png");
        assert_eq!(lines[12], "x-ms-blob-type:BlockBlob");
        assert_eq!(lines[15], "/photos/uploads/a.png");

        let empty = put_blob_string_to_sign(0, "image/png", "d", "photos", "/c/b");
        assert_eq!(empty.split('\n').nth(3), Some(""));
    }

    #[test]
    fn signature_is_deterministic_base64() -> Result<(), UploadError> {
        let first = sign(b"secret", "payload")?;
        let second = sign(b"secret", "payload")?;
        assert_eq!(first, second);
        assert_eq!(STANDARD.decode(&first).map(|bytes| bytes.len()).ok(), Some(32));
        Ok(())
    }

    #[test]
    fn blob_url_has_no_credentials() -> Result<(), Box<dyn std::error::Error>> {
        let store = AzureBlobStore::new(&StorageSettings {
            connection: StorageConnection::parse(
                "BlobEndpoint=https://photos.blob.core.windows.net;SharedAccessSignature=sv=1&sig=x",
            )?,
            container: "uploads".to_string(),
            timeout: std::time::Duration::from_secs(60),
        })?;

        let url = store.blob_url("abc-door.jpg")?;
        assert_eq!(url.as_str(), "https://photos.blob.core.windows.net/uploads/abc-door.jpg");
        assert!(url.query().is_none());
        Ok(())
    }
}
