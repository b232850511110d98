//! Concrete file-host implementations.
//!
//! One type per wire contract observed among the free hosting providers:
//! multipart upload answered with nested JSON, multipart answered with a
//! bare URL string, keyed multipart answered with an image record, and a
//! token-then-signed-PUT object store. Base URLs are injected so the same
//! code runs against production hosts and a local mock server.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::multipart;
use sha1::Sha1;
use uuid::Uuid;

use crate::cdn::{FileHost, HostedFile, UploadPayload};
use crate::client::UpstreamClient;
use crate::error::UpstreamError;

type HmacSha1 = Hmac<Sha1>;

fn file_part(payload: &UploadPayload) -> Result<multipart::Part, UpstreamError> {
    Ok(multipart::Part::bytes(payload.bytes.to_vec())
        .file_name(payload.filename.clone())
        .mime_str(&payload.content_type)?)
}

/// Host accepting a `files[]` multipart field and answering with
/// `{"data": {"url": ...}}`. Download URLs carry a `/dl/` segment that must
/// be rewritten to get the direct link.
pub struct FormJsonHost {
    name: String,
    expiry: String,
    base_url: String,
}

impl FormJsonHost {
    #[must_use]
    pub fn new(name: impl Into<String>, expiry: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self { name: name.into(), expiry: expiry.into(), base_url: base_url.into() }
    }
}

#[async_trait]
impl FileHost for FormJsonHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn expiry(&self) -> &str {
        &self.expiry
    }

    async fn upload(
        &self,
        client: &UpstreamClient,
        payload: &UploadPayload,
    ) -> Result<HostedFile, UpstreamError> {
        let form = multipart::Form::new().part("files[]", file_part(payload)?);
        let value = client
            .send_json(client.raw().post(format!("{}/upload", self.base_url)).multipart(form))
            .await?;

        let url = value
            .pointer("/data/url")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| UpstreamError::Decode(format!("{} response missing data.url", self.name)))?;

        Ok(HostedFile {
            url: url.replace("/dl/", "/"),
            provider: self.name.clone(),
            expires: self.expiry.clone(),
        })
    }
}

/// Host accepting `reqtype`/`time`/`fileToUpload` form fields and answering
/// with the hosted URL as a bare text body.
pub struct FormTextHost {
    name: String,
    expiry: String,
    base_url: String,
    retention: String,
}

impl FormTextHost {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        expiry: impl Into<String>,
        base_url: impl Into<String>,
        retention: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            expiry: expiry.into(),
            base_url: base_url.into(),
            retention: retention.into(),
        }
    }
}

#[async_trait]
impl FileHost for FormTextHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn expiry(&self) -> &str {
        &self.expiry
    }

    async fn upload(
        &self,
        client: &UpstreamClient,
        payload: &UploadPayload,
    ) -> Result<HostedFile, UpstreamError> {
        let form = multipart::Form::new()
            .text("reqtype", "fileupload")
            .text("time", self.retention.clone())
            .part("fileToUpload", file_part(payload)?);
        let body = client
            .send_text(client.raw().post(format!("{}/api.php", self.base_url)).multipart(form))
            .await?;

        let url = body.trim();
        if !url.starts_with("http") {
            return Err(UpstreamError::Decode(format!(
                "{} did not return a URL: {}",
                self.name,
                url.chars().take(80).collect::<String>()
            )));
        }

        Ok(HostedFile {
            url: url.to_owned(),
            provider: self.name.clone(),
            expires: self.expiry.clone(),
        })
    }
}

/// Image host requiring an API key query parameter, accepting a `source`
/// multipart field and answering with `{"image": {"url": ...}}`.
pub struct KeyedFormHost {
    name: String,
    expiry: String,
    base_url: String,
    api_key: String,
}

impl KeyedFormHost {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        expiry: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            expiry: expiry.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl FileHost for KeyedFormHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn expiry(&self) -> &str {
        &self.expiry
    }

    async fn upload(
        &self,
        client: &UpstreamClient,
        payload: &UploadPayload,
    ) -> Result<HostedFile, UpstreamError> {
        let form = multipart::Form::new().part("source", file_part(payload)?);
        let value = client
            .send_json(
                client
                    .raw()
                    .post(format!("{}/upload", self.base_url))
                    .query(&[("key", self.api_key.as_str())])
                    .multipart(form),
            )
            .await?;

        let url = value
            .pointer("/image/url")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| UpstreamError::Decode(format!("{} response missing image.url", self.name)))?;

        Ok(HostedFile {
            url: url.to_owned(),
            provider: self.name.clone(),
            expires: self.expiry.clone(),
        })
    }
}

/// Object store reached through a short-lived STS token and an HMAC-SHA1
/// signed `PUT`.
///
/// The flow: fetch credentials from the token endpoint, build the OSS-style
/// string-to-sign over the date, security-token header, and resource path,
/// then `PUT` the raw bytes to the object URL.
pub struct SignedPutHost {
    name: String,
    token_url: String,
    object_base: String,
    bucket: String,
    key_prefix: String,
}

impl SignedPutHost {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        token_url: impl Into<String>,
        object_base: impl Into<String>,
        bucket: impl Into<String>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            token_url: token_url.into(),
            object_base: object_base.into(),
            bucket: bucket.into(),
            key_prefix: key_prefix.into(),
        }
    }
}

/// Short-lived credentials returned by the token endpoint.
#[derive(Debug, serde::Deserialize)]
struct StsCredentials {
    access_key_id: String,
    access_key_secret: String,
    security_token: String,
}

/// Compute the OSS-style signature for a `PUT` of `content_type` at
/// `resource`, with the given date and security token.
fn sign_put(
    secret: &str,
    content_type: &str,
    date: &str,
    security_token: &str,
    resource: &str,
) -> Result<String, UpstreamError> {
    let canonicalized = {
        let mut headers = vec![
            format!("x-oss-date:{date}"),
            format!("x-oss-security-token:{security_token}"),
        ];
        headers.sort();
        headers.join("\n")
    };
    let string_to_sign = format!("PUT\n\n{content_type}\n{date}\n{canonicalized}\n{resource}");

    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|_| UpstreamError::Decode("signing key rejected by HMAC".to_owned()))?;
    mac.update(string_to_sign.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl FileHost for SignedPutHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn expiry(&self) -> &str {
        "permanent"
    }

    async fn upload(
        &self,
        client: &UpstreamClient,
        payload: &UploadPayload,
    ) -> Result<HostedFile, UpstreamError> {
        let token = client.get_json(&self.token_url, &[]).await?;
        let creds: StsCredentials = serde_json::from_value(
            token
                .get("data")
                .cloned()
                .ok_or_else(|| UpstreamError::Decode("token response missing data".to_owned()))?,
        )
        .map_err(|e| UpstreamError::Decode(format!("token response: {e}")))?;

        let object_key = format!("{}/{}{}", self.key_prefix, Uuid::new_v4(), payload.extension());
        let resource = format!("/{}/{}", self.bucket, object_key);
        let object_url = format!("{}/{}", self.object_base, object_key);
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();

        let signature = sign_put(
            &creds.access_key_secret,
            &payload.content_type,
            &date,
            &creds.security_token,
            &resource,
        )?;

        let request = client
            .raw()
            .put(&object_url)
            .header("Authorization", format!("OSS {}:{signature}", creds.access_key_id))
            .header("Content-Type", &payload.content_type)
            .header("Date", &date)
            .header("x-oss-date", &date)
            .header("x-oss-security-token", &creds.security_token)
            .body(payload.bytes.clone());
        client.send_text(request).await?;

        Ok(HostedFile {
            url: object_url,
            provider: self.name.clone(),
            expires: self.expiry().to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use httpmock::prelude::*;
    use regex::Regex;

    fn test_client() -> UpstreamClient {
        match UpstreamClient::new() {
            Ok(c) => c,
            Err(e) => panic!("client build failed: {e}"),
        }
    }

    fn test_payload() -> UploadPayload {
        UploadPayload::new(
            Some("shot.png".to_owned()),
            "image/png".to_owned(),
            Bytes::from_static(b"\x89PNG bytes"),
        )
    }

    #[tokio::test]
    async fn form_json_host_rewrites_dl_segment() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/upload");
            then.status(200).json_body(serde_json::json!({
                "data": { "url": "https://files.example/dl/123/shot.png" }
            }));
        });

        let host = FormJsonHost::new("files.example", "1 hour", server.base_url());
        let hosted = match host.upload(&test_client(), &test_payload()).await {
            Ok(h) => h,
            Err(e) => panic!("upload failed: {e}"),
        };
        assert_eq!(hosted.url, "https://files.example/123/shot.png");
        assert_eq!(hosted.provider, "files.example");
    }

    #[tokio::test]
    async fn form_json_host_missing_url_is_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/upload");
            then.status(200).json_body(serde_json::json!({"data": {}}));
        });

        let host = FormJsonHost::new("files.example", "1 hour", server.base_url());
        let err = match host.upload(&test_client(), &test_payload()).await {
            Err(e) => e,
            Ok(h) => panic!("expected decode error, got {h:?}"),
        };
        assert!(matches!(err, UpstreamError::Decode(_)), "got {err}");
    }

    #[tokio::test]
    async fn form_text_host_accepts_bare_url_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api.php");
            then.status(200).body("https://litter.example/abc.png\n");
        });

        let host = FormTextHost::new("litter.example", "24 hours", server.base_url(), "24h");
        let hosted = match host.upload(&test_client(), &test_payload()).await {
            Ok(h) => h,
            Err(e) => panic!("upload failed: {e}"),
        };
        assert_eq!(hosted.url, "https://litter.example/abc.png");
        assert_eq!(hosted.expires, "24 hours");
    }

    #[tokio::test]
    async fn form_text_host_rejects_non_url_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api.php");
            then.status(200).body("quota exceeded");
        });

        let host = FormTextHost::new("litter.example", "24 hours", server.base_url(), "24h");
        let err = match host.upload(&test_client(), &test_payload()).await {
            Err(e) => e,
            Ok(h) => panic!("expected decode error, got {h:?}"),
        };
        assert!(matches!(err, UpstreamError::Decode(_)), "got {err}");
    }

    #[tokio::test]
    async fn keyed_form_host_sends_api_key_and_reads_image_url() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/upload").query_param("key", "sekrit");
            then.status(200).json_body(serde_json::json!({
                "image": { "url": "https://img.example/shot.png" }
            }));
        });

        let host = KeyedFormHost::new("img.example", "permanent", server.base_url(), "sekrit");
        let hosted = match host.upload(&test_client(), &test_payload()).await {
            Ok(h) => h,
            Err(e) => panic!("upload failed: {e}"),
        };
        assert_eq!(hosted.url, "https://img.example/shot.png");
    }

    #[tokio::test]
    async fn signed_put_host_fetches_token_and_puts_object() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/sts-token");
            then.status(200).json_body(serde_json::json!({
                "data": {
                    "access_key_id": "AKID",
                    "access_key_secret": "sekrit",
                    "security_token": "STOKEN"
                }
            }));
        });
        let put_mock = server.mock(|when, then| {
            when.method(PUT)
                .path_matches(Regex::new("^/store/.*\\.png$").expect("regex"))
                .header("x-oss-security-token", "STOKEN")
                .header_exists("Authorization");
            then.status(200).body("");
        });

        let host = SignedPutHost::new(
            "store.example",
            format!("{}/sts-token", server.base_url()),
            format!("{}/store", server.base_url()),
            "store-bucket",
            "relay/uploads",
        );
        let hosted = match host.upload(&test_client(), &test_payload()).await {
            Ok(h) => h,
            Err(e) => panic!("upload failed: {e}"),
        };
        put_mock.assert();
        assert!(hosted.url.ends_with(".png"), "object URL must keep the extension");
        assert_eq!(hosted.expires, "permanent");
    }

    #[test]
    fn signature_is_deterministic_for_fixed_inputs() {
        let a = sign_put("secret", "image/png", "Thu, 01 Jan 1970 00:00:00 GMT", "tok", "/b/k");
        let b = sign_put("secret", "image/png", "Thu, 01 Jan 1970 00:00:00 GMT", "tok", "/b/k");
        match (a, b) {
            (Ok(x), Ok(y)) => assert_eq!(x, y, "same inputs must produce the same signature"),
            other => panic!("signing failed: {other:?}"),
        }
    }

    #[test]
    fn signature_depends_on_the_resource_path() {
        let a = sign_put("secret", "image/png", "Thu, 01 Jan 1970 00:00:00 GMT", "tok", "/b/k1");
        let b = sign_put("secret", "image/png", "Thu, 01 Jan 1970 00:00:00 GMT", "tok", "/b/k2");
        match (a, b) {
            (Ok(x), Ok(y)) => assert_ne!(x, y, "different resources must sign differently"),
            other => panic!("signing failed: {other:?}"),
        }
    }
}
