//! DRM-gated playback from manifest to first play.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{FixedClock, HttpClient, HttpRequest, HttpResponse, MediaEngineEvent};
use chrono::{TimeZone, Utc};
use common::*;
use core_drm::{
    DrmError, DrmProcessor, DrmStatus, LicenseStatusChecker, Manifest, RightsValidator,
};
use core_playback::{Audiobook, PlaybackController, PlaybackError};
use core_runtime::events::{CoreEvent, DrmEvent, EventBus};

struct LicenseServer(&'static str);

#[async_trait]
impl HttpClient for LicenseServer {
    async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse::new(200, self.0))
    }
}

fn processor(license_body: &'static str, bus: Option<EventBus>) -> Arc<DrmProcessor> {
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    let processor = DrmProcessor::new(
        RightsValidator::new(Arc::new(clock)),
        LicenseStatusChecker::new(Arc::new(LicenseServer(license_body)), ["ready", "active"]),
    );
    Arc::new(match bus {
        Some(bus) => processor.with_event_bus(bus),
        None => processor,
    })
}

fn licensed_manifest(end: &str) -> Manifest {
    Manifest::from_json(&format!(
        r#"{{
            "metadata": {{
                "http://www.feedbooks.com/audiobooks/rights": {{ "start": "2024-01-01", "end": "{}" }}
            }},
            "links": [
                {{ "rel": "license", "href": "https://license.example.com/status/7" }}
            ]
        }}"#,
        end
    ))
    .unwrap()
}

#[test]
fn test_open_access_book_is_authorized() {
    let (elements, _downloads) = chapters(&[true]);
    let book = Audiobook::open_access("urn:isbn:9780000000009", elements);

    assert_eq!(book.drm_status().get(), DrmStatus::Succeeded);
    assert_eq!(book.spine().len(), 1);
    assert!(book.drm_data().license_check_url.is_none());
}

#[tokio::test]
async fn test_open_access_book_needs_no_license_check() {
    let (elements, _downloads) = chapters(&[true]);
    let book = Audiobook::open_access("urn:isbn:9780000000009", elements);

    assert!(book.start_drm_check(&processor("", None)).is_none());
}

#[tokio::test]
async fn test_licensed_book_plays_once_drm_succeeds() {
    let processor = processor(r#"{"status":"ready"}"#, None);
    let (elements, _downloads) = chapters(&[true, true]);
    let book = Audiobook::with_drm(
        "urn:isbn:9780000000002",
        elements,
        &licensed_manifest("2024-12-31"),
        &processor,
    )
    .unwrap();
    assert_eq!(book.drm_status().get(), DrmStatus::Processing);

    let events = EngineEvents::default();
    let mut engine = engine(&events);
    engine.expect_play().times(1).returning(|| Ok(()));
    let player = PlaybackController::load(&book, book.cursor().unwrap(), Arc::new(engine), None)
        .await
        .unwrap();
    events.deliver([MediaEngineEvent::Ready]).await;

    assert!(matches!(
        player.play().await,
        Err(PlaybackError::PlayBeforeReady(_))
    ));

    book.start_drm_check(&processor).unwrap().await.unwrap();
    assert_eq!(book.drm_status().get(), DrmStatus::Succeeded);

    player.play().await.unwrap();
}

#[tokio::test]
async fn test_revoked_license_blocks_playback() {
    let processor = processor(r#"{"status":"revoked"}"#, None);
    let (elements, _downloads) = chapters(&[true]);
    let book = Audiobook::with_drm(
        "urn:isbn:9780000000003",
        elements,
        &licensed_manifest("2024-12-31"),
        &processor,
    )
    .unwrap();

    let events = EngineEvents::default();
    let mut engine = engine(&events);
    engine.expect_play().times(0);
    let player = PlaybackController::load(&book, book.cursor().unwrap(), Arc::new(engine), None)
        .await
        .unwrap();
    events.deliver([MediaEngineEvent::Ready]).await;

    book.start_drm_check(&processor).unwrap().await.unwrap();
    assert_eq!(book.drm_status().resolved().await, DrmStatus::Failed);

    assert!(matches!(
        player.play().await,
        Err(PlaybackError::PlayBeforeReady(_))
    ));
}

#[tokio::test]
async fn test_expired_rights_are_rejected_and_published() {
    let bus = EventBus::new(8);
    let mut stream = bus.subscribe();
    let processor = processor("", Some(bus));
    let (elements, _downloads) = chapters(&[true]);

    let result = Audiobook::with_drm(
        "urn:isbn:9780000000004",
        elements,
        &licensed_manifest("2024-02-01"),
        &processor,
    );

    assert!(matches!(
        result,
        Err(PlaybackError::Drm(DrmError::RightsExpired { .. }))
    ));
    match stream.recv().await.unwrap() {
        CoreEvent::Drm(DrmEvent::RightsRejected {
            audiobook_id,
            reason,
        }) => {
            assert_eq!(audiobook_id, "urn:isbn:9780000000004");
            assert!(reason.contains("expired"));
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_dropped_book_abandons_license_check() {
    let processor = processor(r#"{"status":"ready"}"#, None);
    let (elements, _downloads) = chapters(&[true]);
    let book = Audiobook::with_drm(
        "urn:isbn:9780000000005",
        elements,
        &licensed_manifest("2024-12-31"),
        &processor,
    )
    .unwrap();
    let watcher = book.drm_status().subscribe();

    let check = book.start_drm_check(&processor).unwrap();
    drop(book);
    check.await.unwrap();

    assert_eq!(*watcher.borrow(), DrmStatus::Processing);
}
