use super::*;
use crate::config::CameraConfig;
use crate::error::{AgentError, CameraError};
use crate::events::{AgentEvent, EventBus};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn create_test_camera_config(facing: CameraFacing) -> CameraConfig {
    CameraConfig {
        facing,
        jpeg_quality: 100,
    }
}

fn standard_resolutions() -> Vec<(u32, u32)> {
    vec![(640, 480), (1920, 1080), (1280, 720)]
}

struct Harness {
    manager: ResourceLifecycleManager,
    hardware: SimulatedCameraHardware,
    prompt: Arc<SimulatedPermissionPrompt>,
    event_bus: Arc<EventBus>,
}

fn harness(hardware: SimulatedCameraHardware, grant_on_request: bool) -> Harness {
    harness_facing(hardware, grant_on_request, CameraFacing::Back)
}

fn harness_facing(
    hardware: SimulatedCameraHardware,
    grant_on_request: bool,
    facing: CameraFacing,
) -> Harness {
    let event_bus = Arc::new(EventBus::new(64));
    let prompt = Arc::new(SimulatedPermissionPrompt::new(
        grant_on_request,
        Duration::from_millis(5),
        hardware.permission_flag(),
    ));

    let manager = ResourceLifecycleManagerBuilder::new()
        .config(create_test_camera_config(facing))
        .hardware(Arc::new(hardware.clone()))
        .permissions(prompt.clone())
        .event_bus(Arc::clone(&event_bus))
        .build()
        .unwrap();

    Harness {
        manager,
        hardware,
        prompt,
        event_bus,
    }
}

async fn wait_for_permission_result(
    receiver: &mut tokio::sync::broadcast::Receiver<AgentEvent>,
) -> bool {
    loop {
        let event = timeout(Duration::from_secs(5), receiver.recv())
            .await
            .expect("timed out waiting for permission result")
            .unwrap();
        if let AgentEvent::PermissionResult { granted, .. } = event {
            return granted;
        }
    }
}

#[test]
fn test_builder_validation() {
    let result = ResourceLifecycleManagerBuilder::new().build();

    match result {
        Err(AgentError::System { message }) => {
            assert!(message.contains("Camera configuration must be specified"));
        }
        _ => panic!("Expected system error for missing configuration"),
    }
}

#[tokio::test]
async fn test_acquire_without_hardware_feature() {
    for permission in [true, false] {
        let hardware = SimulatedCameraHardware::new(standard_resolutions())
            .with_feature(false)
            .with_permission(permission);
        let h = harness(hardware, true);

        assert!(!h.manager.check_hardware_feature());
        assert_eq!(h.manager.acquire(), CameraAvailability::NoHardwareFeature);
        assert_eq!(h.manager.state(), LifecycleState::NoFeature);
        assert_eq!(
            h.manager.availability(),
            Some(CameraAvailability::NoHardwareFeature)
        );

        // Terminal for the cycle
        assert_eq!(h.manager.acquire(), CameraAvailability::NoHardwareFeature);
        assert_eq!(h.hardware.total_opens(), 0);
        assert_eq!(h.prompt.requests(), 0);
    }
}

#[tokio::test]
async fn test_acquire_opens_preferred_camera() {
    let cameras = vec![
        CameraInfo {
            id: 5,
            facing: CameraFacing::Front,
        },
        CameraInfo {
            id: 7,
            facing: CameraFacing::Back,
        },
    ];

    let back = harness_facing(
        SimulatedCameraHardware::new(standard_resolutions()).with_cameras(cameras.clone()),
        true,
        CameraFacing::Back,
    );
    assert_eq!(back.manager.acquire(), CameraAvailability::Available);
    assert_eq!(back.hardware.last_opened_camera(), Some(7));

    let front = harness_facing(
        SimulatedCameraHardware::new(standard_resolutions()).with_cameras(cameras),
        true,
        CameraFacing::Front,
    );
    assert_eq!(front.manager.acquire(), CameraAvailability::Available);
    assert_eq!(front.hardware.last_opened_camera(), Some(5));
}

#[tokio::test]
async fn test_acquire_falls_back_to_first_camera() {
    let hardware = SimulatedCameraHardware::new(standard_resolutions()).with_cameras(vec![
        CameraInfo {
            id: 3,
            facing: CameraFacing::Front,
        },
    ]);
    let h = harness_facing(hardware, true, CameraFacing::Back);

    assert_eq!(h.manager.acquire(), CameraAvailability::Available);
    assert_eq!(h.hardware.last_opened_camera(), Some(3));
}

#[tokio::test]
async fn test_acquire_success_reports_available() {
    let h = harness(SimulatedCameraHardware::new(standard_resolutions()), true);
    let mut receiver = h.event_bus.subscribe();

    assert_eq!(h.manager.availability(), None);
    assert_eq!(h.manager.acquire(), CameraAvailability::Available);
    assert_eq!(h.manager.state(), LifecycleState::Open);
    assert_eq!(h.manager.current_generation(), Some(1));
    assert_eq!(h.manager.availability(), Some(CameraAvailability::Available));

    match receiver.recv().await.unwrap() {
        AgentEvent::CameraAvailabilityChanged { availability, .. } => {
            assert_eq!(availability, CameraAvailability::Available);
        }
        other => panic!("Unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_acquire_twice_does_not_double_open() {
    let h = harness(SimulatedCameraHardware::new(standard_resolutions()), true);

    assert_eq!(h.manager.acquire(), CameraAvailability::Available);
    assert_eq!(h.manager.acquire(), CameraAvailability::Available);

    assert_eq!(h.hardware.total_opens(), 1);
    assert_eq!(h.hardware.open_devices(), 1);
    assert_eq!(h.manager.current_generation(), Some(1));
}

#[tokio::test]
async fn test_permission_denied_requests_permission_once() {
    let hardware = SimulatedCameraHardware::new(standard_resolutions()).with_permission(false);
    let h = harness(hardware, false);
    let mut receiver = h.event_bus.subscribe();

    assert!(h.manager.check_hardware_feature());
    assert_eq!(h.manager.acquire(), CameraAvailability::PermissionDenied);
    assert_eq!(h.manager.state(), LifecycleState::PermissionDenied);
    assert_eq!(
        h.manager.availability(),
        Some(CameraAvailability::PermissionDenied)
    );

    assert!(!wait_for_permission_result(&mut receiver).await);
    assert_eq!(h.prompt.requests(), 1);

    // No retry within the same cycle
    assert_eq!(h.manager.acquire(), CameraAvailability::PermissionDenied);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.prompt.requests(), 1);
    assert_eq!(h.hardware.total_opens(), 0);
}

#[tokio::test]
async fn test_permission_grant_takes_effect_next_cycle() {
    let hardware = SimulatedCameraHardware::new(standard_resolutions()).with_permission(false);
    let h = harness(hardware, true);
    let mut receiver = h.event_bus.subscribe();

    assert_eq!(h.manager.acquire(), CameraAvailability::PermissionDenied);
    assert!(wait_for_permission_result(&mut receiver).await);

    // The grant is not applied to the current cycle
    assert_eq!(h.manager.state(), LifecycleState::PermissionDenied);

    h.manager.release();
    assert_eq!(h.manager.acquire(), CameraAvailability::Available);
    assert_eq!(h.manager.state(), LifecycleState::Open);
}

#[test]
fn test_permission_denied_without_runtime() {
    let hardware = SimulatedCameraHardware::new(standard_resolutions()).with_permission(false);
    let h = harness(hardware, true);

    assert_eq!(h.manager.acquire(), CameraAvailability::PermissionDenied);
    assert_eq!(h.prompt.requests(), 0);
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let h = harness(SimulatedCameraHardware::new(standard_resolutions()), true);

    // Nothing acquired yet
    h.manager.release();
    assert_eq!(h.manager.state(), LifecycleState::Released);
    assert!(!h.manager.is_open());

    assert_eq!(h.manager.acquire(), CameraAvailability::Available);
    assert_eq!(h.hardware.open_devices(), 1);

    h.manager.release();
    h.manager.release();
    assert_eq!(h.manager.state(), LifecycleState::Released);
    assert!(!h.manager.is_open());
    assert_eq!(h.manager.current_generation(), None);
    assert_eq!(h.hardware.open_devices(), 0);

    // A new cycle gets a new generation
    assert_eq!(h.manager.acquire(), CameraAvailability::Available);
    assert_eq!(h.manager.current_generation(), Some(2));
}

#[tokio::test]
async fn test_drop_releases_camera() {
    let h = harness(SimulatedCameraHardware::new(standard_resolutions()), true);
    assert_eq!(h.manager.acquire(), CameraAvailability::Available);

    let hardware = h.hardware.clone();
    drop(h);
    assert_eq!(hardware.open_devices(), 0);
}

#[tokio::test]
async fn test_capture_when_not_open_is_noop() {
    let h = harness(SimulatedCameraHardware::new(standard_resolutions()), true);

    assert!(matches!(h.manager.capture(), Err(CameraError::NotOpen)));

    let no_feature = harness(
        SimulatedCameraHardware::new(standard_resolutions()).with_feature(false),
        true,
    );
    no_feature.manager.acquire();
    assert!(matches!(
        no_feature.manager.capture(),
        Err(CameraError::NotOpen)
    ));
    assert_eq!(no_feature.manager.state(), LifecycleState::NoFeature);

    h.manager.acquire();
    h.manager.release();
    assert!(matches!(h.manager.capture(), Err(CameraError::NotOpen)));
    assert_eq!(h.hardware.pictures_taken(), 0);
}

#[tokio::test]
async fn test_capture_end_to_end_selects_max_resolution() {
    let h = harness(SimulatedCameraHardware::new(standard_resolutions()), true);
    let mut receiver = h.event_bus.subscribe();

    assert_eq!(h.manager.acquire(), CameraAvailability::Available);

    let pending = h.manager.capture().unwrap();
    assert_eq!(pending.generation(), 1);

    let image = timeout(Duration::from_secs(10), pending)
        .await
        .expect("capture timed out")
        .unwrap();

    assert_eq!((image.width, image.height), (1920, 1080));
    assert_eq!(image.generation, 1);
    assert!(image.encoded_len > 0);
    assert_eq!(h.manager.state(), LifecycleState::Open);

    let mut saw_capture = false;
    while let Ok(event) = receiver.try_recv() {
        if let AgentEvent::ImageCaptured { width, height, .. } = event {
            assert_eq!((width, height), (1920, 1080));
            saw_capture = true;
        }
    }
    assert!(saw_capture);
}

#[tokio::test]
async fn test_capture_while_in_flight_is_rejected() {
    let hardware = SimulatedCameraHardware::new(standard_resolutions())
        .with_callback_mode(CallbackMode::Manual);
    let h = harness(hardware, true);

    h.manager.acquire();
    let pending = h.manager.capture().unwrap();
    assert_eq!(h.manager.state(), LifecycleState::CaptureInFlight);

    assert!(matches!(
        h.manager.capture(),
        Err(CameraError::CaptureInFlight)
    ));

    assert_eq!(h.hardware.fire_pending_captures(), 1);
    let image = pending.await.unwrap();
    assert_eq!((image.width, image.height), (1920, 1080));
    assert_eq!(h.manager.state(), LifecycleState::Open);
}

#[tokio::test]
async fn test_capture_callback_after_release_is_ignored() {
    let hardware = SimulatedCameraHardware::new(standard_resolutions())
        .with_callback_mode(CallbackMode::Manual);
    let h = harness(hardware, true);

    h.manager.acquire();
    let pending = h.manager.capture().unwrap();
    assert_eq!(h.hardware.pending_captures(), 1);

    h.manager.release();
    assert_eq!(h.manager.state(), LifecycleState::Released);

    assert_eq!(h.hardware.fire_pending_captures(), 1);
    assert!(matches!(pending.await, Err(CameraError::Released)));
    assert_eq!(h.manager.state(), LifecycleState::Released);
    assert!(!h.manager.is_open());
    assert_eq!(h.hardware.open_devices(), 0);
}

#[tokio::test]
async fn test_stale_callback_does_not_touch_new_generation() {
    let hardware = SimulatedCameraHardware::new(standard_resolutions())
        .with_callback_mode(CallbackMode::Manual);
    let h = harness(hardware, true);

    h.manager.acquire();
    let stale = h.manager.capture().unwrap();
    h.manager.release();

    assert_eq!(h.manager.acquire(), CameraAvailability::Available);
    assert_eq!(h.manager.current_generation(), Some(2));

    // Fires the generation 1 callback while generation 2 is open
    assert_eq!(h.hardware.fire_pending_captures(), 1);
    assert!(matches!(stale.await, Err(CameraError::Released)));
    assert_eq!(h.manager.state(), LifecycleState::Open);
    assert_eq!(h.manager.current_generation(), Some(2));

    let fresh = h.manager.capture().unwrap();
    assert_eq!(fresh.generation(), 2);
    assert_eq!(h.hardware.fire_pending_captures(), 1);
    let image = fresh.await.unwrap();
    assert_eq!(image.generation, 2);
}

#[tokio::test]
async fn test_capture_without_supported_resolutions() {
    let h = harness(SimulatedCameraHardware::new(Vec::new()), true);

    assert_eq!(h.manager.acquire(), CameraAvailability::Available);
    assert!(matches!(
        h.manager.capture(),
        Err(CameraError::NoSupportedResolutions)
    ));
    assert_eq!(h.manager.state(), LifecycleState::Open);
    assert_eq!(h.hardware.pictures_taken(), 0);
}

#[test]
fn test_user_messages_are_distinct() {
    let messages = [
        CameraAvailability::NoHardwareFeature.user_message(),
        CameraAvailability::PermissionDenied.user_message(),
        CameraAvailability::Available.user_message(),
    ];
    assert_ne!(messages[0], messages[1]);
    assert_ne!(messages[1], messages[2]);
    assert!(CameraAvailability::Available.is_available());
    assert!(!CameraAvailability::PermissionDenied.is_available());
}
