//! HTTP implementation of [`RemoteStore`]
//!
//! Async client over `reqwest`. Non-success statuses are mapped to the
//! error taxonomy here so the engines never see HTTP codes: the service
//! answers 404-class lookups with `{ code: 404 }`, 403-class deletes with
//! `{ code: 403 }`, and rejected chunks with `{ message }`.

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use dferry_core::{FerryError, FerryResult};

use crate::remote::{DeleteReceipt, FinalizeReceipt, RemoteFile, RemoteStore, UploadSession};

/// Client for one drop service instance.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> FerryResult<Self> {
        let http = reqwest::Client::builder().build().map_err(transport)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl RemoteStore for ApiClient {
    type ByteStream = BoxStream<'static, FerryResult<Bytes>>;

    async fn start_upload(
        &self,
        filename: &str,
        header: Option<&str>,
    ) -> FerryResult<UploadSession> {
        let url = format!("{}/api/upload/start", self.base_url);
        let mut query: Vec<(&str, &str)> = vec![("filename", filename)];
        if let Some(h) = header {
            query.push(("header", h));
        }

        let resp = self
            .http
            .post(&url)
            .query(&query)
            .send()
            .await
            .map_err(transport)?;
        let resp = check_status(resp).await?;
        resp.json::<UploadSession>().await.map_err(transport)
    }

    async fn send_chunk(&self, id: &str, chunk: Vec<u8>) -> FerryResult<()> {
        let url = format!("{}/api/upload/{id}", self.base_url);
        let part = Part::bytes(chunk).file_name("blob");
        let form = Form::new().part("file", part);

        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        check_status(resp).await?;
        Ok(())
    }

    async fn finalize(&self, id: &str) -> FerryResult<FinalizeReceipt> {
        let url = format!("{}/api/upload/{id}/finalize", self.base_url);
        let resp = self.http.post(&url).send().await.map_err(transport)?;
        let resp = check_status(resp).await?;
        resp.json::<FinalizeReceipt>().await.map_err(transport)
    }

    async fn find(&self, file_id: &str) -> FerryResult<RemoteFile> {
        let url = format!("{}/api/find/{file_id}", self.base_url);
        let resp = self.http.get(&url).send().await.map_err(transport)?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FerryError::NotFound(format!("file id {file_id}")));
        }
        let resp = check_status(resp).await?;

        let body: FindResponse = resp.json().await.map_err(transport)?;
        if body.code == Some(404) {
            return Err(FerryError::NotFound(format!("file id {file_id}")));
        }
        match (body.file, body.size) {
            (Some(file), Some(size)) => Ok(RemoteFile {
                file,
                size,
                iv: body.iv,
                salt: body.salt,
            }),
            _ => Err(FerryError::Transport("malformed file metadata".into())),
        }
    }

    async fn delete(&self, token: &str) -> FerryResult<DeleteReceipt> {
        let url = format!("{}/api/delete/{token}", self.base_url);
        let resp = self.http.delete(&url).send().await.map_err(transport)?;

        if resp.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(FerryError::Authorization("invalid access token".into()));
        }
        let resp = check_status(resp).await?;

        let body: DeleteResponse = resp.json().await.map_err(transport)?;
        if body.code == Some(403) {
            return Err(FerryError::Authorization("invalid access token".into()));
        }
        match body.id {
            Some(id) => Ok(DeleteReceipt { id }),
            None => Err(FerryError::Transport("malformed delete response".into())),
        }
    }

    async fn fetch(&self, file_id: &str, filename: &str) -> FerryResult<Self::ByteStream> {
        let url = format!("{}/d/{file_id}/{filename}", self.base_url);
        let resp = self.http.get(&url).send().await.map_err(transport)?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FerryError::NotFound(format!("file id {file_id}")));
        }
        let resp = check_status(resp).await?;

        Ok(resp.bytes_stream().map(|r| r.map_err(transport)).boxed())
    }
}

fn transport(err: reqwest::Error) -> FerryError {
    FerryError::Transport(err.to_string())
}

/// Pass a success response through; turn anything else into a transport
/// error carrying the server's `message` when it sent one.
async fn check_status(resp: reqwest::Response) -> FerryResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| format!("HTTP {status}"));
    Err(FerryError::Transport(message))
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Deserialize)]
struct FindResponse {
    code: Option<u32>,
    file: Option<String>,
    size: Option<u64>,
    iv: Option<String>,
    salt: Option<String>,
}

#[derive(Deserialize)]
struct DeleteResponse {
    code: Option<u32>,
    id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = ApiClient::new("https://drop.example.com/").unwrap();
        assert_eq!(client.base_url(), "https://drop.example.com");
    }

    #[test]
    fn test_find_response_parses_encrypted_metadata() {
        let body = r#"{"file":"notes.txt","size":1234,"iv":"1,2,3","salt":"4,5,6"}"#;
        let parsed: FindResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.file.as_deref(), Some("notes.txt"));
        assert_eq!(parsed.size, Some(1234));
        assert!(parsed.iv.is_some());
        assert!(parsed.code.is_none());
    }

    #[test]
    fn test_find_response_parses_not_found() {
        let parsed: FindResponse = serde_json::from_str(r#"{"code":404}"#).unwrap();
        assert_eq!(parsed.code, Some(404));
        assert!(parsed.file.is_none());
    }
}
