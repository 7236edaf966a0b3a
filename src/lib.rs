//! Keeps EXIF metadata and posting dates of a Flickr collection in order.
//!
//! Two jobs: bulk search-and-replace of an EXIF value (download, rewrite with
//! exiftool, upload as replacement) and re-sorting the "posted" dates of the
//! whole collection by the date each photo was taken.

pub mod config;
pub mod error;
pub mod exiftool;
pub mod flickr;
pub mod reorder;
pub mod report;
pub mod retry;
pub mod sync;

pub use config::Config;
pub use error::{EditorError, Error, RemoteError, Result};
pub use exiftool::{ExifTool, MetadataRewriter};
pub use flickr::{FlickrClient, PhotoInfo, PhotoRecord, RestTransport, Transport};
pub use reorder::{ReorderEngine, ReorderOptions, assign_posted_dates};
pub use report::{Disposition, SyncOutcome, SyncReport};
pub use retry::RetryPolicy;
pub use sync::{SyncOptions, SyncPipeline};
