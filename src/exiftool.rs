//! Long-lived exiftool channel.
//!
//! exiftool is started once in `-stay_open` mode and fed argument lists over
//! stdin. Each request ends with `-execute`; the response is everything written
//! to stdout up to the `{ready}` sentinel.

use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::EditorError;

pub const SENTINEL: &str = "{ready}\n";

const SHUTDOWN: &str = "-stay_open\nFalse\n";
const READ_CHUNK: usize = 4096;

/// One metadata group as reported by `exiftool -j -G -n`.
pub type MetadataGroup = Map<String, Value>;

/// Only these containers carry the EXIF blocks we rewrite.
pub fn carries_metadata(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let ext = e.to_lowercase();
            ext == "jpg" || ext == "jpeg" || ext == "tiff"
        })
        .unwrap_or(false)
}

/// Exact-value search and replace over a photo's metadata.
pub trait MetadataRewriter {
    /// Returns whether any field was changed and written back.
    fn find_and_replace(&mut self, path: &Path, old_value: &str, new_value: &str) -> Result<bool, EditorError>;
}

pub struct ExifTool<W: Write, R: Read> {
    input: W,
    output: R,
    pending: Vec<u8>,
    child: Option<Child>,
}

impl ExifTool<ChildStdin, ChildStdout> {
    /// Starts `exiftool -stay_open True -@ -`. The process is told to exit when
    /// the handle is dropped.
    pub fn spawn(executable: &Path) -> Result<Self, EditorError> {
        let mut child = Command::new(executable)
            .args(["-stay_open", "True", "-@", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => EditorError::MissingExecutable(executable.to_path_buf()),
                _ => EditorError::Spawn(e),
            })?;

        let stdin = child.stdin.take().ok_or(EditorError::StreamClosed("stdin"))?;
        let stdout = child.stdout.take().ok_or(EditorError::StreamClosed("stdout"))?;
        debug!(executable = %executable.display(), pid = child.id(), "exiftool started");

        let mut tool = Self::from_streams(stdin, stdout);
        tool.child = Some(child);
        Ok(tool)
    }
}

impl<W: Write, R: Read> ExifTool<W, R> {
    /// Wraps an already running exiftool-compatible duplex.
    pub fn from_streams(input: W, output: R) -> Self {
        Self {
            input,
            output,
            pending: Vec::new(),
            child: None,
        }
    }

    /// Sends one argument list and blocks until the sentinel arrives.
    pub fn execute(&mut self, args: &[&str]) -> Result<String, EditorError> {
        let mut command = args.join("\n");
        command.push_str("\n-execute\n");
        self.input.write_all(command.as_bytes())?;
        self.input.flush()?;
        self.read_response()
    }

    fn read_response(&mut self) -> Result<String, EditorError> {
        let sentinel = SENTINEL.as_bytes();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(pos) = self
                .pending
                .windows(sentinel.len())
                .position(|w| w == sentinel)
            {
                let rest = self.pending.split_off(pos + sentinel.len());
                let mut response = std::mem::replace(&mut self.pending, rest);
                response.truncate(pos);
                return Ok(String::from_utf8(response)?);
            }

            let read = self.output.read(&mut chunk)?;
            if read == 0 {
                return Err(EditorError::StreamClosed(SENTINEL));
            }
            self.pending.extend_from_slice(&chunk[..read]);
        }
    }

    pub fn read_metadata(&mut self, path: &Path) -> Result<Vec<MetadataGroup>, EditorError> {
        let file = path.to_string_lossy();
        let output = self.execute(&["-G", "-j", "-n", &file])?;
        Ok(serde_json::from_str(&output)?)
    }

    /// Applies the JSON document at `document` to `path` in place.
    pub fn write_metadata(&mut self, path: &Path, document: &Path) -> Result<String, EditorError> {
        let file = path.to_string_lossy();
        let json = format!("-json={}", document.to_string_lossy());
        self.execute(&["-n", "-overwrite_original", &json, &file])
    }

    fn shutdown(&mut self) -> std::io::Result<()> {
        self.input.write_all(SHUTDOWN.as_bytes())?;
        self.input.flush()
    }
}

impl<W: Write, R: Read> MetadataRewriter for ExifTool<W, R> {
    fn find_and_replace(&mut self, path: &Path, old_value: &str, new_value: &str) -> Result<bool, EditorError> {
        if !carries_metadata(path) {
            debug!(file = %path.display(), "No EXIF container, skipping");
            return Ok(false);
        }

        let mut document = self.read_metadata(path)?;
        let group = document
            .first_mut()
            .ok_or_else(|| EditorError::Empty(path.to_path_buf()))?;

        let mut modified = false;
        for (key, value) in group.iter_mut() {
            if value.as_str() == Some(old_value) {
                *value = Value::String(new_value.to_string());
                info!(file = %path.display(), tag = %key, "Changed");
                modified = true;
            }
        }

        if modified {
            let sidecar = path.with_extension("json");
            fs::write(&sidecar, serde_json::to_vec(&document)?)?;
            let response = self.write_metadata(path, &sidecar)?;
            debug!(file = %path.display(), response = response.trim(), "Metadata written");
        }
        Ok(modified)
    }
}

impl<W: Write, R: Read> Drop for ExifTool<W, R> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "Failed to stop exiftool");
        }
        if let Some(mut child) = self.child.take() {
            let _ = child.wait();
        }
    }
}
