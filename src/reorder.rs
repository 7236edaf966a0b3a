//! Rewrites the "posted" dates of a collection so they follow the taken dates.
//!
//! Photos taken before the account existed are stacked one second apart from
//! the join date upwards; everything newer is posted at its taken date.

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::flickr::{FlickrClient, PhotoInfo, PhotoRecord, Transport};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReorderOptions {
    pub scope_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderStep {
    Fetched,
    /// Dates assigned; this many photos will be pushed.
    Sorted(usize),
    Pushed,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReorderReport {
    /// Final assignments in the order they were pushed.
    pub assigned: Vec<PhotoInfo>,
    /// Photos whose dates could not be read.
    pub skipped: Vec<String>,
    /// Photos the service refused to update.
    pub failed: Vec<String>,
}

/// Sorts by taken date (stable) and assigns posted dates from `join_date`.
///
/// The cursor only moves while photos sit at or below it; a photo posted at
/// its own taken date leaves the cursor where it was.
pub fn assign_posted_dates(photos: &mut [PhotoInfo], join_date: i64) {
    photos.sort_by_key(|p| p.date_taken);

    let mut next = join_date;
    for photo in photos.iter_mut() {
        if photo.date_taken <= next {
            photo.date_posted = next;
            next += 1;
        } else {
            photo.date_posted = photo.date_taken;
        }
    }
}

pub struct ReorderEngine<'a, T: Transport> {
    client: &'a FlickrClient<T>,
}

impl<'a, T: Transport> ReorderEngine<'a, T> {
    pub fn new(client: &'a FlickrClient<T>) -> Self {
        Self { client }
    }

    /// The floor for every posted date. Without it nothing can be reordered.
    pub fn join_date(&self, user_id: &str) -> Result<i64> {
        self.client
            .get_join_date(user_id)
            .ok_or_else(|| Error::JoinDateUnavailable(user_id.to_string()))
    }

    pub fn run<F>(&self, join_date: i64, photos: &[PhotoRecord], mut on_step: F) -> ReorderReport
    where
        F: FnMut(ReorderStep),
    {
        let mut report = ReorderReport::default();

        info!(count = photos.len(), "Fetch photo info");
        let mut infos = Vec::with_capacity(photos.len());
        for photo in photos {
            match self.client.get_photo_info(&photo.id) {
                Some(info) => infos.push(info),
                None => {
                    warn!(photo_id = %photo.id, "Skipping photo without usable dates");
                    report.skipped.push(photo.id.clone());
                }
            }
            on_step(ReorderStep::Fetched);
        }

        assign_posted_dates(&mut infos, join_date);
        info!(join_date, "Sorting photos");
        on_step(ReorderStep::Sorted(infos.len()));

        for photo in &infos {
            debug!(photo_id = %photo.id, date_taken = photo.date_taken, date_posted = photo.date_posted, "Set date posted");
            if !self.client.set_date_posted(&photo.id, photo.date_posted) {
                report.failed.push(photo.id.clone());
            }
            on_step(ReorderStep::Pushed);
        }

        report.assigned = infos;
        report
    }
}
