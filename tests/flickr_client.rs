mod common;

use std::sync::{Arc, Mutex};

use chrono::{Local, TimeZone};
use common::{MockTransport, client};
use flickr_exif_sync::flickr::types::DATE_TAKEN_FORMAT;
use flickr_exif_sync::flickr::{Progress, Transport};
use flickr_exif_sync::error::RemoteError;
use flickr_exif_sync::{FlickrClient, PhotoRecord, RetryPolicy};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn page(page: u32, pages: u32, total: Value, ids: &[&str]) -> Value {
    let photos: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "url_o": format!("https://live.example/{}_o.jpg", id)}))
        .collect();
    json!({"photos": {"page": page, "pages": pages, "perpage": 3, "total": total, "photo": photos}})
}

#[test]
fn listing_collects_every_page() {
    let transport = MockTransport::new();
    transport
        .ok("flickr.people.getPhotos:page1", page(1, 2, json!("5"), &["1", "2", "3"]))
        .ok("flickr.people.getPhotos:page2", page(2, 2, json!("5"), &["4", "5"]));
    let client = client(transport);

    let photos = client.list_all_user_photos("12345@N00").unwrap();
    let ids: Vec<&str> = photos.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    assert_eq!(photos[0].source_url, "https://live.example/1_o.jpg");

    let calls = client.transport().calls_to("flickr.people.getPhotos");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0]["user_id"], "12345@N00");
    assert_eq!(calls[0]["extras"], "url_o");
}

#[test]
fn short_listing_is_rejected() {
    let transport = MockTransport::new();
    transport
        .ok("flickr.people.getPhotos:page1", page(1, 2, json!(10), &["1", "2", "3", "4"]))
        .ok("flickr.people.getPhotos:page2", page(2, 2, json!(10), &["5", "6", "7", "8"]));
    let client = client(transport);

    assert_eq!(client.list_all_user_photos("me"), None);
}

#[test]
fn failed_page_aborts_listing() {
    let transport = MockTransport::new();
    transport
        .ok("flickr.people.getPhotos:page1", page(1, 2, json!(4), &["1", "2"]))
        .respond("flickr.people.getPhotos:page2", Err(RemoteError::Permanent("HTTP 403".into())));
    let client = client(transport);

    assert_eq!(client.list_all_user_photos("me"), None);
}

#[test]
fn photoset_listing_uses_its_envelope() {
    let transport = MockTransport::new();
    transport.ok(
        "flickr.photosets.getPhotos",
        json!({"photoset": {"id": "721", "page": 1, "pages": 1, "total": "2",
            "photo": [{"id": "1", "url_o": "u1"}, {"id": "2", "url_o": "u2"}]}}),
    );
    let client = client(transport);

    assert_eq!(
        client.list_collection_photos("me", "721"),
        Some(vec![PhotoRecord::new("1", "u1"), PhotoRecord::new("2", "u2")])
    );
    assert_eq!(client.transport().calls_to("flickr.photosets.getPhotos")[0]["photoset_id"], "721");
}

#[test]
fn empty_account_lists_nothing() {
    let transport = MockTransport::new();
    transport.ok("flickr.people.getPhotos", json!({"photos": {"page": 1, "pages": 0, "total": 0, "photo": []}}));
    let client = client(transport);

    assert_eq!(client.list_all_user_photos("me"), Some(Vec::new()));
}

#[test]
fn retries_stop_at_the_bound() {
    let transport = MockTransport::new();
    transport.respond("flickr.profile.getProfile", Err(RemoteError::Transient("HTTP 503".into())));
    let client = FlickrClient::new(transport, RetryPolicy::immediate(4));

    assert_eq!(client.get_join_date("me"), None);
    assert_eq!(client.transport().calls_to("flickr.profile.getProfile").len(), 4);
}

#[test]
fn profile_user_and_photosets() {
    let transport = MockTransport::new();
    transport
        .ok("flickr.profile.getProfile", json!({"profile": {"id": "me", "join_date": "1400000000"}}))
        .ok("flickr.people.findByUsername", json!({"user": {"id": "12345@N00", "nsid": "12345@N00"}}))
        .ok(
            "flickr.photosets.getList",
            json!({"photosets": {"total": 1, "photoset": [{"id": "721", "title": {"_content": "Holidays"}}]}}),
        );
    let client = client(transport);

    assert_eq!(client.get_join_date("me"), Some(1_400_000_000));
    assert_eq!(client.get_user_id_by_name("Jane"), Some("12345@N00".to_string()));
    let sets = client.list_photosets("me").unwrap();
    assert_eq!((sets[0].id.as_str(), sets[0].title.as_str()), ("721", "Holidays"));
}

#[test]
fn photo_info_dates() {
    let taken = 1_400_000_000;
    let taken_text = Local
        .timestamp_opt(taken, 0)
        .unwrap()
        .format(DATE_TAKEN_FORMAT)
        .to_string();
    let transport = MockTransport::new();
    transport.ok(
        "flickr.photos.getInfo",
        json!({"photo": {"id": "1", "dateuploaded": "1400000100",
            "dates": {"posted": "1400000200", "taken": taken_text}}}),
    );
    let client = client(transport);

    let info = client.get_photo_info("1").unwrap();
    assert_eq!(info.date_taken, taken);
    assert_eq!(info.date_uploaded, 1_400_000_100);
    assert_eq!(info.date_posted, 1_400_000_200);
}

#[test]
fn exif_search_is_exact() {
    let transport = MockTransport::new();
    transport.ok("flickr.photos.getExif", common::exif_with(&["Jane Doe"]));
    let client = client(transport);
    let photo = PhotoRecord::new("1", "");

    assert!(client.search_exif_for_value(&photo, "Jane Doe"));
    assert!(!client.search_exif_for_value(&photo, "Jane"));
    assert!(!client.search_exif_for_value(&photo, "JANE DOE"));
}

#[test]
fn download_names_file_after_photo() {
    let transport = MockTransport::new();
    transport.serve("https://live.example/a/b_o.tiff?x=1", Ok(b"tiff".to_vec()));
    let client = client(transport);
    let dir = tempfile::tempdir().unwrap();

    let path = client
        .download_original("https://live.example/a/b_o.tiff?x=1", "77", dir.path())
        .unwrap();
    assert_eq!(path, dir.path().join("77.tiff"));
    assert_eq!(std::fs::read(&path).unwrap(), b"tiff");

    assert_eq!(client.download_original("https://missing/1.jpg", "1", dir.path()), None);
}

#[test]
fn replace_reports_progress_and_failure() {
    let transport = MockTransport::new();
    transport.replace_result("2", Err(RemoteError::Api {
        code: 3,
        message: "General upload failure".into(),
    }));
    let client = client(transport);
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("1.jpg");
    std::fs::write(&file, b"jpeg").unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let progress: Progress = Arc::new(move |p: u8| sink.lock().unwrap().push(p));

    assert!(client.replace_photo_file(&file, "1", progress.clone()));
    assert_eq!(*seen.lock().unwrap(), vec![0, 50, 100]);

    assert!(!client.replace_photo_file(&file, "2", progress));
    assert!(client.transport().uploads.borrow().iter().all(|(id, _)| id == "1"));
}

#[test]
fn unscripted_transport_call_is_permanent() {
    let transport = MockTransport::new();
    let err = transport.call("flickr.test.echo", &[]).unwrap_err();
    assert!(!err.is_transient());
}
