//! Bulk EXIF search and replace.
//!
//! Each photo walks `candidate -> needs change? -> fetched -> mutated ->
//! republished`. The first step that says no decides the photo's
//! [`Disposition`]; only a successful republish counts as modified.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::exiftool::MetadataRewriter;
use crate::flickr::{FlickrClient, PhotoRecord, Progress, Transport};
use crate::report::{Disposition, SyncReport};

/// Options of one `modify` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub old_value: String,
    pub new_value: String,
    /// Whole account instead of a chosen subset.
    pub scope_all: bool,
    /// Stop after the remote check; never download or upload.
    pub check_only: bool,
}

pub struct SyncPipeline<'a, T: Transport, E: MetadataRewriter> {
    client: &'a FlickrClient<T>,
    editor: &'a mut E,
    options: SyncOptions,
    download_dir: PathBuf,
    upload_progress: Progress,
}

impl<'a, T: Transport, E: MetadataRewriter> SyncPipeline<'a, T, E> {
    pub fn new(
        client: &'a FlickrClient<T>,
        editor: &'a mut E,
        options: SyncOptions,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            editor,
            options,
            download_dir: download_dir.into(),
            upload_progress: Arc::new(|_: u8| {}),
        }
    }

    pub fn with_upload_progress(mut self, progress: Progress) -> Self {
        self.upload_progress = progress;
        self
    }

    /// Runs one photo through every step and reports where it stopped.
    pub fn process_photo(&mut self, photo: &PhotoRecord) -> Disposition {
        let old_value = self.options.old_value.as_str();
        let new_value = self.options.new_value.as_str();
        if photo.id.is_empty() || old_value.is_empty() || new_value.is_empty() {
            warn!(photo_id = %photo.id, "Missing photo or values, skipping");
            return Disposition::Rejected;
        }

        if !self.client.search_exif_for_value(photo, old_value) {
            return Disposition::UpToDate;
        }
        if self.options.check_only {
            info!(photo_id = %photo.id, "Would modify");
            return Disposition::WouldModify;
        }

        let Some(file) = self
            .client
            .download_original(&photo.source_url, &photo.id, &self.download_dir)
        else {
            return Disposition::DownloadFailed;
        };

        match self.editor.find_and_replace(&file, old_value, new_value) {
            Ok(true) => {}
            Ok(false) => {
                info!(photo_id = %photo.id, file = %file.display(), "Nothing to replace locally");
                return Disposition::Unchanged;
            }
            Err(e) => {
                error!(error = %e, photo_id = %photo.id, "Metadata edit failed");
                return Disposition::EditorFailed;
            }
        }

        if self
            .client
            .replace_photo_file(&file, &photo.id, self.upload_progress.clone())
        {
            Disposition::Replaced
        } else {
            Disposition::UploadFailed
        }
    }

    /// Processes `photos` in order. `on_photo` sees each result as it lands.
    pub fn run<F>(&mut self, photos: &[PhotoRecord], mut on_photo: F) -> SyncReport
    where
        F: FnMut(&PhotoRecord, Disposition),
    {
        let mut report = SyncReport::new();
        for photo in photos {
            info!(photo_id = %photo.id, "Processing");
            let disposition = self.process_photo(photo);
            report.record(&photo.id, disposition);
            on_photo(photo, disposition);
        }
        report
    }
}
