use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use gallery_rotator::VISIBLE_SLOTS;
use gallery_rotator::candidates;
use gallery_rotator::config::RotationOptions;
use gallery_rotator::error::{FetchError, RefreshError};
use gallery_rotator::events::{ImageRef, ModeState, UiEvent};
use gallery_rotator::mode::ModeController;
use gallery_rotator::presentation;
use gallery_rotator::slots::VisibleSlots;
use gallery_rotator::tasks::fetcher::{CandidateFetcher, SearchProvider};
use gallery_rotator::tasks::refresh::RefreshCoordinator;
use gallery_rotator::tasks::rotation;
use serde_json::{Value, json};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Replays canned responses, yielding once so the rotation gets to run mid-fetch.
struct Scripted {
    responses: Mutex<VecDeque<Result<Vec<Value>, FetchError>>>,
}

impl SearchProvider for Scripted {
    async fn search(&self, _query: &str) -> Result<Vec<Value>, FetchError> {
        tokio::task::yield_now().await;
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(FetchError::EmptyResult))
    }
}

fn artwork(prefix: &str, count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| json!({ "artworkUrl100": format!("https://{prefix}.example/{i}.jpg") }))
        .collect()
}

fn from_set(image: &ImageRef, prefix: &str) -> bool {
    image.as_str().starts_with(&format!("https://{prefix}.example/"))
}

fn slot_events(events: &[UiEvent]) -> Vec<(usize, ImageRef)> {
    events
        .iter()
        .filter_map(|e| match e {
            UiEvent::Slot { index, image } => Some((*index, image.clone())),
            _ => None,
        })
        .collect()
}

/// Replays every slot event onto an empty gallery, as the foreground would.
fn replay(events: &[UiEvent]) -> Vec<Option<ImageRef>> {
    let mut shown = vec![None; VISIBLE_SLOTS];
    for (index, image) in slot_events(events) {
        shown[index] = Some(image);
    }
    shown
}

#[tokio::test(start_paused = true)]
async fn refresh_and_rotation_agree_on_order_and_generation() {
    let (ui, ui_rx) = presentation::channel();
    let mode = ModeController::new(ModeState::Running, ui.clone());
    let slots = VisibleSlots::new();
    let (tx, rx) = candidates::channel();
    let provider = Scripted {
        responses: Mutex::new(
            vec![
                Ok(artwork("first", 40)),
                Ok(artwork("second", 60)),
                Ok(Vec::new()),
            ]
            .into(),
        ),
    };
    let coordinator = RefreshCoordinator::new(
        CandidateFetcher::new(provider, "artworkUrl100"),
        tx,
        slots.clone(),
        mode.clone(),
        ui.clone(),
    );
    let cancel = CancellationToken::new();
    let scheduler = tokio::spawn(rotation::run(
        rx,
        mode.subscribe(),
        slots.clone(),
        ui.clone(),
        RotationOptions {
            interval: Duration::from_secs(2),
            seed: Some(11),
        },
        cancel.clone(),
    ));
    let mut log: Vec<UiEvent> = Vec::new();

    coordinator.refresh("first").await.unwrap();
    sleep(Duration::from_secs(9)).await;
    log.extend(ui_rx.try_iter());
    assert!(
        slot_events(&log).len() > VISIBLE_SLOTS,
        "first generation should have rotated"
    );

    // Replacement: bulk reset in index order, then the restored mode, then
    // only substitutions from the new set.
    let mark = log.len();
    coordinator.refresh("second").await.unwrap();
    sleep(Duration::from_secs(20)).await;
    log.extend(ui_rx.try_iter());

    let after = &log[mark..];
    let restored = after
        .iter()
        .position(|e| *e == UiEvent::Mode(ModeState::Running))
        .expect("mode restored after refresh");
    let reset = slot_events(&after[..restored]);
    assert_eq!(
        reset.iter().map(|(index, _)| *index).collect::<Vec<_>>(),
        (0..VISIBLE_SLOTS).collect::<Vec<_>>()
    );
    assert!(reset.iter().all(|(_, image)| from_set(image, "second")));

    let rotated = slot_events(&after[restored..]);
    assert!(!rotated.is_empty(), "new generation never rotated");
    assert!(
        rotated.iter().all(|(_, image)| from_set(image, "second")),
        "old generation kept writing after replacement"
    );
    assert_eq!(replay(&log), slots.snapshot());

    // A failed refresh mid-rotation leaves the current generation running.
    let mark = log.len();
    let err = coordinator.refresh("third").await.unwrap_err();
    assert!(matches!(err, RefreshError::Fetch(FetchError::EmptyResult)));
    sleep(Duration::from_secs(10)).await;
    log.extend(ui_rx.try_iter());

    let after = &log[mark..];
    let reenabled = after
        .iter()
        .position(|e| *e == UiEvent::ControlsEnabled(true))
        .expect("controls re-enabled after failure");
    assert!(slot_events(&after[..reenabled]).is_empty());
    assert!(after[..reenabled].iter().any(|e| matches!(e, UiEvent::Notify(_))));
    let continued = slot_events(&after[reenabled..]);
    assert!(!continued.is_empty(), "rotation stalled after a failed refresh");
    assert!(continued.iter().all(|(_, image)| from_set(image, "second")));
    assert_eq!(coordinator.current().generation(), 2);
    assert_eq!(slots.generation(), 2);
    assert_eq!(replay(&log), slots.snapshot());

    cancel.cancel();
    scheduler.await.unwrap().unwrap();
}
