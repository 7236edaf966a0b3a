//! Client for the photo collection.
//!
//! Every call goes through [`with_retry`]. Permanent failures are logged and
//! surface as `None` or `false`; deciding what that means is up to the caller.

pub mod transport;
pub mod types;

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::RemoteError;
use crate::retry::{RetryPolicy, with_retry};
pub use transport::{Progress, RestTransport, Transport};
pub use types::{ExifTag, PhotoInfo, PhotoRecord, Photoset, as_i64, parse_date_taken};

/// Page size requested from the listing calls.
pub const PER_PAGE: u32 = 500;

pub struct FlickrClient<T: Transport> {
    transport: T,
    retry: RetryPolicy,
}

impl<T: Transport> FlickrClient<T> {
    pub fn new(transport: T, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value, RemoteError> {
        with_retry(&self.retry, method, || self.transport.call(method, params))
    }

    /// Calls `method` and logs a final failure, returning `None` in that case.
    fn call_logged(&self, method: &str, params: &[(&str, String)]) -> Option<Value> {
        match self.call(method, params) {
            Ok(body) => Some(body),
            Err(e) => {
                error!(error = %e, method, "Remote call failed");
                None
            }
        }
    }

    /// Every photo of the account, or `None` when the listing is not complete.
    pub fn list_all_user_photos(&self, user_id: &str) -> Option<Vec<PhotoRecord>> {
        self.list_paginated("flickr.people.getPhotos", "photos", &[("user_id", user_id.to_string())])
    }

    /// Every photo of one photoset, or `None` when the listing is not complete.
    pub fn list_collection_photos(&self, user_id: &str, set_id: &str) -> Option<Vec<PhotoRecord>> {
        self.list_paginated(
            "flickr.photosets.getPhotos",
            "photoset",
            &[
                ("user_id", user_id.to_string()),
                ("photoset_id", set_id.to_string()),
            ],
        )
    }

    fn list_paginated(&self, method: &str, envelope: &str, base: &[(&str, String)]) -> Option<Vec<PhotoRecord>> {
        let mut photos: Vec<PhotoRecord> = Vec::new();
        let mut page: i64 = 1;
        let mut total;

        loop {
            let mut params = base.to_vec();
            params.push(("extras", "url_o".to_string()));
            params.push(("per_page", PER_PAGE.to_string()));
            params.push(("page", page.to_string()));

            let body = self.call_logged(method, &params)?;
            let listing = &body[envelope];
            if !listing.is_object() {
                error!(method, envelope, "Listing response without envelope");
                return None;
            }
            total = listing.get("total").and_then(as_i64).unwrap_or(0);
            let pages = listing.get("pages").and_then(as_i64).unwrap_or(0);

            let batch: Vec<PhotoRecord> = match listing.get("photo").cloned().map(serde_json::from_value::<Vec<PhotoRecord>>) {
                Some(Ok(batch)) => batch,
                Some(Err(e)) => {
                    error!(error = %e, method, page, "Malformed photo listing");
                    return None;
                }
                None => Vec::new(),
            };
            debug!(method, page, pages, received = batch.len(), "Fetched listing page");
            photos.extend(batch);

            if page >= pages {
                break;
            }
            page += 1;
        }

        if photos.len() as i64 == total {
            Some(photos)
        } else {
            warn!(method, expected = total, received = photos.len(), "Listing count mismatch");
            None
        }
    }

    pub fn get_photo_info(&self, photo_id: &str) -> Option<PhotoInfo> {
        let body = self.call_logged("flickr.photos.getInfo", &[("photo_id", photo_id.to_string())])?;
        let photo = &body["photo"];

        let taken = photo["dates"]["taken"].as_str();
        let info = taken
            .and_then(|t| parse_date_taken(t, &Local))
            .zip(as_i64(&photo["dateuploaded"]))
            .zip(as_i64(&photo["dates"]["posted"]))
            .map(|((date_taken, date_uploaded), date_posted)| PhotoInfo {
                id: photo_id.to_string(),
                date_taken,
                date_uploaded,
                date_posted,
            });

        if info.is_none() {
            warn!(photo_id, taken = ?taken, "Photo info is missing dates");
        }
        info
    }

    pub fn get_photo_exif(&self, photo_id: &str) -> Option<Vec<ExifTag>> {
        let body = self.call_logged("flickr.photos.getExif", &[("photo_id", photo_id.to_string())])?;
        decode(&body["photo"]["exif"], "flickr.photos.getExif")
    }

    /// Whether any EXIF tag of `photo` holds exactly `old_value`.
    pub fn search_exif_for_value(&self, photo: &PhotoRecord, old_value: &str) -> bool {
        info!(photo_id = %photo.id, "Validate");
        let Some(tags) = self.get_photo_exif(&photo.id) else {
            warn!(photo_id = %photo.id, "Could not get EXIF data");
            return false;
        };

        match tags.iter().find(|t| t.raw == old_value) {
            Some(tag) => {
                debug!(photo_id = %photo.id, tagspace = %tag.tagspace, tag = %tag.tag, "Need to modify");
                true
            }
            None => {
                debug!(photo_id = %photo.id, "OK");
                false
            }
        }
    }

    /// Fetches the original into `dir` as `<photo_id><ext>`.
    pub fn download_original(&self, url: &str, photo_id: &str, dir: &Path) -> Option<PathBuf> {
        let dest = dir.join(download_file_name(url, photo_id));
        match with_retry(&self.retry, "download", || self.transport.download(url, &dest)) {
            Ok(()) => {
                debug!(photo_id, file = %dest.display(), "Downloaded original");
                Some(dest)
            }
            Err(e) => {
                warn!(error = %e, photo_id, url, "Download failed");
                None
            }
        }
    }

    /// Uploads `file` in place of the remote binary. Progress goes 0 to 100.
    pub fn replace_photo_file(&self, file: &Path, photo_id: &str, progress: Progress) -> bool {
        progress(0);
        let result = with_retry(&self.retry, "replace", || {
            self.transport.replace(file, photo_id, progress.clone())
        });
        match result {
            Ok(()) => {
                progress(100);
                info!(photo_id, "Replaced photo");
                true
            }
            Err(e) => {
                error!(error = %e, photo_id, "Upload failed");
                false
            }
        }
    }

    pub fn set_date_posted(&self, photo_id: &str, date_posted: i64) -> bool {
        self.call_logged(
            "flickr.photos.setDates",
            &[
                ("photo_id", photo_id.to_string()),
                ("date_posted", date_posted.to_string()),
            ],
        )
        .is_some()
    }

    pub fn get_user_id_by_name(&self, username: &str) -> Option<String> {
        let body = self.call_logged("flickr.people.findByUsername", &[("username", username.to_string())])?;
        let nsid = body["user"]["nsid"].as_str().map(str::to_string);
        debug!(username, nsid = ?nsid, "Resolved user");
        nsid
    }

    pub fn get_join_date(&self, user_id: &str) -> Option<i64> {
        let body = self.call_logged("flickr.profile.getProfile", &[("user_id", user_id.to_string())])?;
        as_i64(&body["profile"]["join_date"])
    }

    pub fn list_photosets(&self, user_id: &str) -> Option<Vec<Photoset>> {
        let body = self.call_logged("flickr.photosets.getList", &[("user_id", user_id.to_string())])?;
        debug!(total = ?body["photosets"]["total"], "Photosets found");
        decode(&body["photosets"]["photoset"], "flickr.photosets.getList")
    }
}

fn decode<D: DeserializeOwned>(value: &Value, method: &str) -> Option<D> {
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            error!(error = %e, method, "Unexpected response shape");
            None
        }
    }
}

/// `<photo_id><ext>` where the extension comes from the URL path.
pub fn download_file_name(url: &str, photo_id: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').next().unwrap_or(path);
    match Path::new(last).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", photo_id, ext),
        None => photo_id.to_string(),
    }
}
