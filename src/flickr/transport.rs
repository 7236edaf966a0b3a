//! Wire access to the photo service.
//!
//! [`Transport`] is the whole remote contract the client depends on: JSON REST
//! calls, plain downloads and binary replace uploads. [`RestTransport`] speaks
//! it over HTTPS with reqwest.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::{Client, multipart};
use serde_json::Value;
use tracing::debug;

use super::types::as_i64;
use crate::error::RemoteError;

pub const REST_ENDPOINT: &str = "https://api.flickr.com/services/rest/";
pub const REPLACE_ENDPOINT: &str = "https://up.flickr.com/services/replace/";

/// Upload progress in percent. Called from the uploading thread.
pub type Progress = Arc<dyn Fn(u8) + Send + Sync>;

pub trait Transport {
    /// Invokes a REST method and returns the decoded `stat: ok` payload.
    fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value, RemoteError>;

    /// Stores the body served at `url` into `dest`.
    fn download(&self, url: &str, dest: &Path) -> Result<(), RemoteError>;

    /// Replaces the binary of `photo_id` with the contents of `file`.
    fn replace(&self, file: &Path, photo_id: &str, progress: Progress) -> Result<(), RemoteError>;
}

static STAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<rsp[^>]*\bstat="(\w+)""#).expect("Invalid regex for rsp stat"));
static ERR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<err[^>]*\bcode="(\d+)"[^>]*\bmsg="([^"]*)""#).expect("Invalid regex for rsp err")
});

pub struct RestTransport {
    client: Client,
    api_key: String,
    token: Option<String>,
    rest_endpoint: String,
    replace_endpoint: String,
}

impl RestTransport {
    /// `token` is a pre-authorized write token; obtaining it happens elsewhere.
    pub fn new(api_key: impl Into<String>, token: Option<String>) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("flickr-exif-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, api_key, token))
    }

    pub fn with_client(client: Client, api_key: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            token: token.filter(|t| !t.is_empty()),
            rest_endpoint: REST_ENDPOINT.to_string(),
            replace_endpoint: REPLACE_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoints(mut self, rest: impl Into<String>, replace: impl Into<String>) -> Self {
        self.rest_endpoint = rest.into();
        self.replace_endpoint = replace.into();
        self
    }

    fn credentials(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("api_key", self.api_key.clone())];
        if let Some(token) = &self.token {
            params.push(("oauth_token", token.clone()));
        }
        params
    }
}

impl Transport for RestTransport {
    fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value, RemoteError> {
        debug!(method, "REST call");
        let response = self
            .client
            .get(&self.rest_endpoint)
            .query(&[("method", method), ("format", "json"), ("nojsoncallback", "1")])
            .query(&self.credentials())
            .query(params)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::from_status(status.as_u16(), method));
        }
        check_stat(response.json()?)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<(), RemoteError> {
        let mut response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::from_status(status.as_u16(), url));
        }

        let mut file = File::create(dest).map_err(|e| local_io(dest, e))?;
        response.copy_to(&mut file)?;
        Ok(())
    }

    fn replace(&self, file: &Path, photo_id: &str, progress: Progress) -> Result<(), RemoteError> {
        let handle = File::open(file).map_err(|e| local_io(file, e))?;
        let len = handle.metadata().map_err(|e| local_io(file, e))?.len();
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| photo_id.to_string());

        let reader = ProgressReader::new(handle, len, progress);
        let mut form = multipart::Form::new().text("photo_id", photo_id.to_string());
        for (key, value) in self.credentials() {
            form = form.text(key, value);
        }
        form = form.part(
            "photo",
            multipart::Part::reader_with_length(reader, len).file_name(file_name),
        );

        let response = self.client.post(&self.replace_endpoint).multipart(form).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::from_status(status.as_u16(), "replace"));
        }
        check_upload_response(&response.text()?)
    }
}

fn local_io(path: &Path, e: io::Error) -> RemoteError {
    RemoteError::Permanent(format!("{}: {}", path.display(), e))
}

/// Turns a `stat: fail` JSON payload into an error.
pub fn check_stat(body: Value) -> Result<Value, RemoteError> {
    match body.get("stat").and_then(Value::as_str) {
        Some("ok") => Ok(body),
        _ => Err(RemoteError::Api {
            code: body.get("code").and_then(as_i64).unwrap_or(0),
            message: body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        }),
    }
}

/// The upload endpoint answers in XML: `<rsp stat="ok">` or an `<err>` node.
pub fn check_upload_response(body: &str) -> Result<(), RemoteError> {
    let stat = STAT_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());
    if stat == Some("ok") {
        return Ok(());
    }

    match ERR_RE.captures(body) {
        Some(caps) => Err(RemoteError::Api {
            code: caps[1].parse().unwrap_or(0),
            message: caps[2].to_string(),
        }),
        None => Err(RemoteError::Permanent(format!(
            "unexpected upload response: {}",
            body.trim()
        ))),
    }
}

/// Reports how much of the file the uploader has consumed.
struct ProgressReader<R> {
    inner: R,
    read: u64,
    len: u64,
    last: Option<u8>,
    progress: Progress,
}

impl<R: Read> ProgressReader<R> {
    fn new(inner: R, len: u64, progress: Progress) -> Self {
        Self {
            inner,
            read: 0,
            len,
            last: None,
            progress,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read += n as u64;
        if self.len > 0 {
            let percent = (self.read * 100 / self.len).min(99) as u8;
            if self.last != Some(percent) {
                self.last = Some(percent);
                (self.progress)(percent);
            }
        }
        Ok(n)
    }
}
