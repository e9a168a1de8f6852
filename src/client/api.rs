use std::time::Duration;

use reqwest::blocking::{Client, Response, multipart};

use crate::{
    error::ClientError,
    relay::types::{DeleteResponse, ErrorBody, UploadResponse},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SNAPSHOT_FILENAME: &str = "look.jpg";

/// Blocking client for the relay; call it from worker threads only.
#[derive(Clone, Debug)]
pub struct RelayClient {
    http: Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload a JPEG snapshot; returns its public URL.
    pub fn upload_snapshot(&self, jpeg: Vec<u8>) -> Result<String, ClientError> {
        let part = multipart::Part::bytes(jpeg)
            .file_name(SNAPSHOT_FILENAME)
            .mime_str(crate::pipeline::snapshot::SNAPSHOT_CONTENT_TYPE)?;
        let form = multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()?;
        let body: UploadResponse = read_json(response)?;
        Ok(body.url)
    }

    pub fn list(&self) -> Result<Vec<String>, ClientError> {
        let response = self.http.get(format!("{}/files", self.base_url)).send()?;
        read_json(response)
    }

    /// Delete the object behind a public `url`.
    pub fn delete_url(&self, url: &str) -> Result<(), ClientError> {
        let name = object_name_from_url(url)?;
        let response = self
            .http
            .delete(format!("{}/delete/{name}", self.base_url))
            .send()?;
        let body: DeleteResponse = read_json(response)?;
        if !body.success {
            return Err(ClientError::Relay {
                status: 200,
                message: "relay reported failure".to_string(),
            });
        }
        Ok(())
    }

    /// Raw bytes of a gallery image.
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let response = self.http.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

/// Last path segment of `url`.
pub fn object_name_from_url(url: &str) -> Result<&str, ClientError> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() && path.contains('/') => Ok(name),
        _ => Err(ClientError::BadUrl(url.to_string())),
    }
}

/// Decode a success body, or turn an error body into [`ClientError::Relay`].
fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json()?);
    }
    let text = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or_else(|_| format!("relay returned {status}"));
    Err(ClientError::Relay {
        status: status.as_u16(),
        message,
    })
}
