//! Integration tests for the session controller.
//!
//! These drive `SessionController` end-to-end against the in-memory
//! `MockDevice`: load, rearrange through pointer events, write back, and
//! load icon images through the on-disk cache.

use std::sync::Arc;
use std::time::Duration;

use plist::{Dictionary, Value};
use sbm_core::{decode_document, Container, FolderViewState, FormatVersion, PointerEvent, VersionTriple};
use sbm_manager::application::icon_loader::ImageStore;
use sbm_manager::application::session::{SaveOutcome, SessionController, SessionError};
use sbm_manager::application::device::ServiceError;
use sbm_manager::infrastructure::device::mock::MockDevice;
use sbm_manager::infrastructure::storage::cache::ImageCache;

// ── Document builders ─────────────────────────────────────────────────────────

fn app(id: &str) -> Value {
    let mut dict = Dictionary::new();
    dict.insert("displayIdentifier".to_string(), Value::String(id.to_string()));
    Value::Dictionary(dict)
}

fn folder(name: &str, members: &[&str]) -> Value {
    let mut dict = Dictionary::new();
    dict.insert("displayName".to_string(), Value::String(name.to_string()));
    dict.insert(
        "iconLists".to_string(),
        Value::Array(vec![Value::Array(members.iter().map(|m| app(m)).collect())]),
    );
    Value::Dictionary(dict)
}

fn empty() -> Value {
    Value::Integer(0i64.into())
}

/// A format 1 document: four-slot dock, one page with a padded row.
fn v1_document() -> Value {
    Value::Array(vec![
        Value::Array(vec![Value::Array(vec![
            app("com.apple.mobilephone"),
            app("com.apple.mobilemail"),
            app("com.apple.mobilesafari"),
            app("com.apple.mobileipod"),
        ])]),
        Value::Array(vec![Value::Array(vec![
            app("com.example.a"),
            app("com.example.b"),
            app("com.example.c"),
            empty(),
        ])]),
    ])
}

/// A format 1 document whose dock row only has room for two icons.
fn v1_two_slot_dock_document() -> Value {
    Value::Array(vec![
        Value::Array(vec![Value::Array(vec![
            app("com.apple.mobilephone"),
            app("com.apple.mobilemail"),
        ])]),
        Value::Array(vec![Value::Array(vec![
            app("com.example.a"),
            app("com.example.b"),
            app("com.example.c"),
            app("com.example.d"),
        ])]),
    ])
}

/// A format 2 document with a folder on the first page.
fn v2_document() -> Value {
    Value::Array(vec![
        Value::Array(vec![app("com.apple.mobilephone")]),
        Value::Array(vec![
            app("com.example.a"),
            folder("Games", &["com.example.chess", "com.example.go"]),
        ]),
    ])
}

fn drag(controller: &mut SessionController, icon: sbm_core::IconId, from: sbm_core::Point, to: sbm_core::Point) {
    controller.handle_event(PointerEvent::Press { icon, at: from });
    controller.handle_event(PointerEvent::Move {
        at: to,
        time: Duration::from_millis(16),
    });
    controller.handle_event(PointerEvent::Release);
}

async fn wait_for_icons(controller: &SessionController) {
    for _ in 0..200 {
        let (done, total) = controller.icon_progress();
        if done == total {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("icons did not finish loading: {:?}", controller.icon_progress());
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_format_1_device_is_requested_in_format_1() {
    let device = Arc::new(MockDevice::new("old", VersionTriple::new(3, 1, 3), v1_document()));
    let mut controller = SessionController::new(device.clone());

    controller.load("old").await.expect("load");

    assert_eq!(device.requested_formats(), vec![FormatVersion::V1]);
    assert_eq!(controller.layout().dock().len(), 4);
    assert_eq!(controller.layout().page(0).map(<[sbm_core::Icon]>::len), Some(3));
}

#[tokio::test]
async fn test_dock_to_page_drag_is_written_back_once() {
    // Arrange
    let device = Arc::new(MockDevice::new("old", VersionTriple::new(3, 1, 3), v1_document()));
    let mut controller = SessionController::new(device.clone());
    controller.load("old").await.expect("load");
    let geometry = controller.state().expect("session").engine.geometry().clone();
    let dragged = controller.layout().dock()[1].id;

    // Act: drag the mail icon from the dock onto the first page.
    controller.handle_event(PointerEvent::Press {
        icon: dragged,
        at: geometry.dock_grid(4).position(1),
    });
    controller.handle_event(PointerEvent::Move {
        at: geometry.page_grid().position(5),
        time: Duration::from_millis(16),
    });
    controller.handle_event(PointerEvent::Release);
    let first = controller.save().await.expect("save");
    let second = controller.save().await.expect("save");

    // Assert
    assert_eq!(first, SaveOutcome::Written);
    assert_eq!(second, SaveOutcome::Unchanged);
    assert_eq!(device.writes().len(), 1);
    assert_eq!(
        controller.layout().index_of(dragged).map(|s| s.container),
        Some(Container::Page(0))
    );

    let written = decode_document(&device.current_document(), FormatVersion::V1).expect("decodable");
    assert_eq!(written.dock.len(), 3);
    assert_eq!(written.dock_slots, 4, "dock keeps its padded width");
    assert_eq!(written.pages[0].len(), 4);
}

#[tokio::test]
async fn test_format_1_full_dock_refuses_extra_icon_and_page_move_is_written() {
    // Arrange
    let device = Arc::new(MockDevice::new("old", VersionTriple::new(3, 1, 3), v1_two_slot_dock_document()));
    let mut controller = SessionController::new(device.clone());
    controller.load("old").await.expect("load");
    let geometry = controller.state().expect("session").engine.geometry().clone();
    let dragged = controller.layout().page(0).expect("page")[0].id;

    // Act: drop the first page icon onto the dock band.
    drag(
        &mut controller,
        dragged,
        geometry.page_grid().position(0),
        geometry.dock_grid(2).position(1),
    );
    let outcome = controller.save().await.expect("save");

    // Assert
    assert_eq!(controller.layout().dock_capacity(), 2);
    assert_eq!(controller.layout().dock().len(), 2);
    assert_eq!(
        controller.layout().index_of(dragged).map(|s| s.container),
        Some(Container::Page(0))
    );
    assert_eq!(outcome, SaveOutcome::Written);
    assert_eq!(device.writes().len(), 1);

    let written = decode_document(&device.current_document(), FormatVersion::V1).expect("decodable");
    assert_eq!(written.dock_slots, 2, "dock row keeps the device's width");
    assert_eq!(written.pages[0].len(), 4);
}

#[tokio::test]
async fn test_format_1_dock_swap_within_slot_count_is_written() {
    // Arrange
    let device = Arc::new(MockDevice::new("old", VersionTriple::new(3, 1, 3), v1_two_slot_dock_document()));
    let mut controller = SessionController::new(device.clone());
    controller.load("old").await.expect("load");
    let geometry = controller.state().expect("session").engine.geometry().clone();
    let mail = controller.layout().dock()[1].id;
    let a = controller.layout().page(0).expect("page")[0].id;

    // Act: move mail onto the page, then a into the freed dock slot.
    drag(
        &mut controller,
        mail,
        geometry.dock_grid(2).position(1),
        geometry.page_grid().position(5),
    );
    let a_index = controller.layout().index_of(a).expect("a is placed").index;
    drag(
        &mut controller,
        a,
        geometry.page_grid().position(a_index),
        geometry.dock_grid(2).position(1),
    );
    let outcome = controller.save().await.expect("save");

    // Assert
    assert_eq!(outcome, SaveOutcome::Written);
    assert_eq!(
        controller.layout().index_of(a).map(|s| s.container),
        Some(Container::Dock)
    );
    let written = decode_document(&device.current_document(), FormatVersion::V1).expect("decodable");
    let dock: Vec<&str> = written.dock.iter().filter_map(|i| i.display_identifier()).collect();
    assert_eq!(dock, vec!["com.apple.mobilephone", "com.example.a"]);
    assert_eq!(written.dock_slots, 2);
}

#[tokio::test]
async fn test_folder_rename_alone_does_not_trigger_write() {
    // Arrange
    let device = Arc::new(MockDevice::new("new", VersionTriple::new(4, 2, 0), v2_document()));
    let mut controller = SessionController::new(device.clone());
    controller.load("new").await.expect("load");
    let folder_id = controller.layout().page(0).expect("page")[1].id;

    // Act
    let opened = controller.open_folder(folder_id);
    controller.transition_finished();
    let closed = controller.close_folder(Some("Board Games"));
    controller.transition_finished();
    let outcome = controller.save().await.expect("save");

    // Assert
    assert!(!opened.is_empty());
    assert!(!closed.is_empty());
    assert!(matches!(controller.folder_view(), FolderViewState::Closed));
    assert_eq!(
        controller.layout().folder(folder_id).map(|f| f.display_name.as_str()),
        Some("Board Games")
    );
    assert_eq!(outcome, SaveOutcome::Unchanged);
    assert!(device.writes().is_empty());
}

#[tokio::test]
async fn test_icon_images_load_through_cache() {
    // Arrange
    let cache_root = std::env::temp_dir().join(format!("sbm-session-test-{}", uuid::Uuid::new_v4()));
    let cache = Arc::new(ImageCache::new(&cache_root));
    let device = Arc::new(
        MockDevice::new("new", VersionTriple::new(4, 2, 0), v2_document())
            .with_icon("com.example.a", vec![0xA])
            .with_icon("com.example.chess", vec![0xC]),
    );
    let mut controller = SessionController::new(device.clone()).with_image_store(cache.clone());

    // Act
    controller.load("new").await.expect("load");
    wait_for_icons(&controller).await;
    let mut images = controller.drain_icon_updates();
    images.sort_by(|a, b| a.identity.cmp(&b.identity));
    let requests_after_first_load = device.icon_requests();

    controller.load("new").await.expect("reload");
    wait_for_icons(&controller).await;

    // Assert: phone and go have no image and are skipped.
    let identities: Vec<&str> = images.iter().map(|i| i.identity.as_str()).collect();
    assert_eq!(identities, vec!["com.example.a", "com.example.chess"]);
    assert_eq!(controller.icon_progress(), (4, 4));
    assert_eq!(cache.load_icon("com.example.chess").await, Some(vec![0xC]));
    assert_eq!(
        device.icon_requests(),
        requests_after_first_load + 2,
        "cached icons are not fetched again"
    );
    let _ = std::fs::remove_dir_all(&cache_root);
}

#[tokio::test]
async fn test_wallpaper_is_kept_on_the_session() {
    let device = Arc::new(
        MockDevice::new("new", VersionTriple::new(4, 0, 0), v2_document()).with_wallpaper(vec![1, 2, 3]),
    );
    let mut controller = SessionController::new(device);

    controller.load("new").await.expect("load");

    assert_eq!(controller.state().and_then(|s| s.wallpaper.clone()), Some(vec![1, 2, 3]));
}

#[tokio::test]
async fn test_icon_service_failure_leaves_no_session() {
    let device = Arc::new(MockDevice::new("new", VersionTriple::new(4, 0, 0), v2_document()).without_icon_service());
    let mut controller = SessionController::new(device);

    let err = controller.load("new").await.unwrap_err();

    assert!(matches!(err, SessionError::Service(ServiceError::Unavailable(_))));
    assert!(controller.layout().is_empty());
}

#[test]
fn test_unsupported_os_is_rejected_before_fetching_the_document() {
    let device = Arc::new(MockDevice::new("ancient", VersionTriple::new(2, 2, 1), v1_document()));
    let mut controller = SessionController::new(device.clone());

    let result = tokio_test::block_on(controller.load("ancient"));

    assert!(matches!(
        result,
        Err(SessionError::Service(ServiceError::UnsupportedOsVersion(_)))
    ));
    assert!(device.requested_formats().is_empty());
}
