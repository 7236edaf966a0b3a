use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Where a photo ended up in the bulk edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Modified,
    NotModified,
}

/// The step that decided a photo's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Missing photo or values.
    Rejected,
    /// No remote EXIF tag holds the old value.
    UpToDate,
    DownloadFailed,
    /// The local file had nothing to replace.
    Unchanged,
    EditorFailed,
    UploadFailed,
    Replaced,
    /// Check-only run: the photo would have been rewritten.
    WouldModify,
}

impl Disposition {
    pub fn outcome(self) -> SyncOutcome {
        match self {
            Disposition::Replaced => SyncOutcome::Modified,
            _ => SyncOutcome::NotModified,
        }
    }
}

/// Outcome bookkeeping for one bulk edit.
///
/// Every recorded id lands in exactly one of `modified` / `not_modified`.
/// `upload_failed` is tracked separately and overlaps `not_modified`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub modified: Vec<String>,
    pub not_modified: Vec<String>,
    pub upload_failed: Vec<String>,
    dispositions: Vec<(String, Disposition)>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, photo_id: &str, disposition: Disposition) {
        let id = photo_id.to_string();
        if disposition == Disposition::UploadFailed {
            self.upload_failed.push(id.clone());
        }
        self.dispositions.push((id.clone(), disposition));
        match disposition.outcome() {
            SyncOutcome::Modified => self.modified.push(id),
            SyncOutcome::NotModified => self.not_modified.push(id),
        }
    }

    pub fn processed(&self) -> usize {
        self.modified.len() + self.not_modified.len()
    }

    /// Ids whose run stopped at `disposition`, in processing order.
    pub fn ids_with(&self, disposition: Disposition) -> Vec<&str> {
        self.dispositions
            .iter()
            .filter(|(_, d)| *d == disposition)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Renders the status file: three labeled sections, one id per line.
    pub fn status_text(&self) -> String {
        let mut out = String::new();
        for (header, ids) in [
            ("Modified:", &self.modified),
            ("Not Modified:", &self.not_modified),
            ("Upload failed:", &self.upload_failed),
        ] {
            out.push_str(header);
            out.push('\n');
            for id in ids {
                out.push_str(id);
                out.push('\n');
            }
        }
        out
    }

    pub fn write_status(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.status_text())
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Photos processed: {}", self.processed())?;
        writeln!(f, "Photos modified: {}", self.modified.len())?;
        writeln!(f, "Photos not modified: {}", self.not_modified.len())?;
        write!(f, "Upload failed: {}", self.upload_failed.len())?;
        for (label, disposition) in [
            ("Download failed", Disposition::DownloadFailed),
            ("Photos needing a change", Disposition::WouldModify),
        ] {
            let count = self.ids_with(disposition).len();
            if count > 0 {
                write!(f, "\n{}: {}", label, count)?;
            }
        }
        Ok(())
    }
}
