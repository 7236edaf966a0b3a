#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use flickr_exif_sync::error::{EditorError, RemoteError};
use flickr_exif_sync::flickr::{Progress, Transport};
use flickr_exif_sync::{FlickrClient, MetadataRewriter, RetryPolicy};
use serde_json::{Value, json};

type Scripted<T> = RefCell<HashMap<String, VecDeque<Result<T, RemoteError>>>>;

/// Scripted remote service.
///
/// Responses are queued per `method` or per `method:photo_id`; the last queued
/// response of a key repeats forever. Unscripted calls fail permanently.
#[derive(Default)]
pub struct MockTransport {
    responses: Scripted<Value>,
    downloads: RefCell<HashMap<String, Result<Vec<u8>, RemoteError>>>,
    replacements: Scripted<()>,
    pub calls: RefCell<Vec<(String, HashMap<String, String>)>>,
    pub uploads: RefCell<Vec<(String, Vec<u8>)>>,
}

fn next<T: Clone>(queue: &mut VecDeque<Result<T, RemoteError>>) -> Result<T, RemoteError> {
    if queue.len() > 1 {
        queue.pop_front().expect("queue is not empty")
    } else {
        queue.front().cloned().expect("queue is not empty")
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, key: &str, response: Result<Value, RemoteError>) -> &Self {
        self.responses
            .borrow_mut()
            .entry(key.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn ok(&self, key: &str, body: Value) -> &Self {
        let mut body = body;
        body["stat"] = json!("ok");
        self.respond(key, Ok(body))
    }

    pub fn serve(&self, url: &str, response: Result<Vec<u8>, RemoteError>) -> &Self {
        self.downloads.borrow_mut().insert(url.to_string(), response);
        self
    }

    pub fn replace_result(&self, photo_id: &str, response: Result<(), RemoteError>) -> &Self {
        self.replacements
            .borrow_mut()
            .entry(photo_id.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls_to(&self, method: &str) -> Vec<HashMap<String, String>> {
        self.calls
            .borrow()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

impl Transport for MockTransport {
    fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value, RemoteError> {
        let params: HashMap<String, String> = params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        self.calls.borrow_mut().push((method.to_string(), params.clone()));

        let mut responses = self.responses.borrow_mut();
        let mut keys = Vec::new();
        if let Some(id) = params.get("photo_id") {
            keys.push(format!("{}:{}", method, id));
        }
        if let Some(page) = params.get("page") {
            keys.push(format!("{}:page{}", method, page));
        }
        keys.push(method.to_string());

        for key in keys {
            if let Some(queue) = responses.get_mut(&key) {
                return next(queue);
            }
        }
        Err(RemoteError::Permanent(format!("unscripted call {}", method)))
    }

    fn download(&self, url: &str, dest: &Path) -> Result<(), RemoteError> {
        match self.downloads.borrow().get(url) {
            Some(Ok(bytes)) => {
                fs::write(dest, bytes).map_err(|e| RemoteError::Permanent(e.to_string()))
            }
            Some(Err(e)) => Err(e.clone()),
            None => Err(RemoteError::Permanent(format!("HTTP 404 from {}", url))),
        }
    }

    fn replace(&self, file: &Path, photo_id: &str, progress: Progress) -> Result<(), RemoteError> {
        let result = match self.replacements.borrow_mut().get_mut(photo_id) {
            Some(queue) => next(queue),
            None => Ok(()),
        };
        progress(50);
        if result.is_ok() {
            let bytes = fs::read(file).map_err(|e| RemoteError::Permanent(e.to_string()))?;
            self.uploads.borrow_mut().push((photo_id.to_string(), bytes));
        }
        result
    }
}

pub fn client(transport: MockTransport) -> FlickrClient<MockTransport> {
    FlickrClient::new(transport, RetryPolicy::immediate(3))
}

pub fn exif_with(values: &[&str]) -> Value {
    let tags: Vec<Value> = values
        .iter()
        .map(|v| {
            json!({
                "tagspace": "IFD0",
                "tag": "Artist",
                "label": "Artist",
                "raw": {"_content": v}
            })
        })
        .collect();
    json!({"photo": {"id": "x", "exif": tags}})
}

/// In-memory stand-in for exiftool keyed by file name.
#[derive(Default)]
pub struct FakeEditor {
    pub results: HashMap<String, Result<bool, String>>,
    pub edited: Vec<PathBuf>,
}

impl FakeEditor {
    pub fn with(mut self, file_name: &str, result: Result<bool, String>) -> Self {
        self.results.insert(file_name.to_string(), result);
        self
    }
}

impl MetadataRewriter for FakeEditor {
    fn find_and_replace(&mut self, path: &Path, _old: &str, _new: &str) -> Result<bool, EditorError> {
        self.edited.push(path.to_path_buf());
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        match self.results.get(name) {
            Some(Ok(modified)) => Ok(*modified),
            Some(Err(_)) => Err(EditorError::StreamClosed("{ready}\n")),
            None => Ok(true),
        }
    }
}
