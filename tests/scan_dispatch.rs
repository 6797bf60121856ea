mod common;

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use common::{FakeApi, loc, unavailable};
use kaos_pocket::{
    models::{NoticeLevel, ScanEvent, ScanMode, ScanOutcome, UiEvent},
    services::{FlowEnd, PocketStore, RelocationSession, ScanDispatcher},
};

struct Harness {
    api: Arc<FakeApi>,
    pocket: PocketStore,
    session: RelocationSession,
    dispatcher: ScanDispatcher,
    ui: broadcast::Receiver<UiEvent>,
}

fn harness() -> Harness {
    let api = FakeApi::new();
    let pocket = PocketStore::new();
    let session = RelocationSession::new();
    let (ui_tx, ui) = broadcast::channel(32);
    let dispatcher = ScanDispatcher::new(api.clone(), pocket.clone(), session.clone(), ui_tx);
    Harness { api, pocket, session, dispatcher, ui }
}

fn drain(ui: &mut broadcast::Receiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = ui.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn single_item_session_moves_item_and_clears_session() {
    let mut h = harness();
    h.pocket.add(7);
    h.pocket.add(8);
    h.session.begin(7);

    let flow = h.dispatcher.open(ScanMode::Pocket);
    let outcome = flow.report_decoded("https://host/loc/42").await;

    assert_eq!(outcome, ScanOutcome::Moved { item_id: 7, location: loc(42) });
    assert!(!h.pocket.contains(7));
    assert!(h.pocket.contains(8));
    assert_eq!(h.session.current(), None);
    assert!(flow.is_closed());
    assert_eq!(*h.api.moves.lock(), vec![(vec![7], loc(42))]);

    let events = drain(&mut h.ui);
    assert!(events.contains(&UiEvent::CloseScanner));
}

#[tokio::test]
async fn single_item_failure_leaves_everything_for_a_rescan() {
    let mut h = harness();
    h.pocket.add(7);
    h.session.begin(7);
    h.api.fail_next_move(unavailable());

    let flow = h.dispatcher.open(ScanMode::Navigate);
    let outcome = flow.report_decoded("42").await;

    assert!(matches!(outcome, ScanOutcome::RelocationFailed { .. }));
    assert!(h.pocket.contains(7));
    assert_eq!(h.session.current(), Some(7));
    assert!(!flow.is_closed());
    assert!(matches!(
        drain(&mut h.ui).as_slice(),
        [UiEvent::Notice { level: NoticeLevel::Error, .. }]
    ));

    // Novo scan, outra posição: agora dá certo.
    let outcome = flow.report_decoded("/loc/43").await;
    assert_eq!(outcome, ScanOutcome::Moved { item_id: 7, location: loc(43) });
    assert!(!h.pocket.contains(7));
    assert_eq!(h.session.current(), None);
}

#[tokio::test]
async fn pocket_mode_moves_everything_in_one_request() {
    let h = harness();
    for id in [3, 9, 15] {
        h.pocket.add(id);
    }

    let flow = h.dispatcher.open(ScanMode::Pocket);
    let outcome = flow.report_decoded("10").await;

    assert_eq!(outcome, ScanOutcome::BulkMoved { count: 3, location: loc(10) });
    assert_eq!(h.pocket.count(), 0);
    assert_eq!(*h.api.moves.lock(), vec![(vec![3, 9, 15], loc(10))]);
    assert!(flow.is_closed());
}

#[tokio::test]
async fn pocket_mode_failure_keeps_the_pocket() {
    let h = harness();
    for id in [3, 9, 15] {
        h.pocket.add(id);
    }
    h.api.fail_next_move(unavailable());

    let flow = h.dispatcher.open(ScanMode::Pocket);
    assert!(matches!(flow.report_decoded("10").await, ScanOutcome::RelocationFailed { .. }));
    assert_eq!(h.pocket.item_ids(), vec![3, 9, 15]);
    assert!(!flow.is_closed());

    assert_eq!(flow.report_decoded("10").await, ScanOutcome::BulkMoved { count: 3, location: loc(10) });
    assert_eq!(h.pocket.count(), 0);
}

#[tokio::test]
async fn navigate_mode_never_touches_the_pocket() {
    let mut h = harness();
    h.pocket.add(3);

    let flow = h.dispatcher.open(ScanMode::Navigate);
    assert_eq!(flow.report_decoded("5").await, ScanOutcome::Navigated(loc(5)));

    assert_eq!(h.api.move_count(), 0);
    assert_eq!(h.pocket.item_ids(), vec![3]);
    assert_eq!(drain(&mut h.ui), vec![UiEvent::CloseScanner, UiEvent::Navigate(loc(5))]);
}

#[tokio::test]
async fn invalid_code_shows_notice_and_stays_ready() {
    let mut h = harness();
    h.pocket.add(3);

    let flow = h.dispatcher.open(ScanMode::Pocket);
    assert_eq!(flow.report_decoded("loc482").await, ScanOutcome::InvalidCode);
    assert_eq!(h.api.move_count(), 0);
    assert!(!flow.is_closed());
    assert!(matches!(
        drain(&mut h.ui).as_slice(),
        [UiEvent::Notice { level: NoticeLevel::Error, .. }]
    ));
}

#[tokio::test]
async fn scans_during_an_inflight_move_are_ignored() {
    let h = harness();
    h.pocket.add(3);
    let release = h.api.hold_next_move();

    let flow = Arc::new(h.dispatcher.open(ScanMode::Pocket));
    let first = tokio::spawn({
        let flow = Arc::clone(&flow);
        async move { flow.report_decoded("10").await }
    });
    h.api.move_started.notified().await;

    // Quadros repetidos do mesmo QR chegam enquanto o request está pendente.
    assert_eq!(flow.report_decoded("10").await, ScanOutcome::Ignored);
    assert_eq!(flow.report_decoded("11").await, ScanOutcome::Ignored);

    release.send(()).expect("request ainda pendente");
    let outcome = first.await.expect("task terminou");
    assert_eq!(outcome, ScanOutcome::BulkMoved { count: 1, location: loc(10) });
    assert_eq!(h.api.move_count(), 1);
}

#[tokio::test]
async fn item_picked_during_bulk_move_stays_in_pocket() {
    let h = harness();
    h.pocket.add(3);
    h.pocket.add(9);
    let release = h.api.hold_next_move();

    let flow = Arc::new(h.dispatcher.open(ScanMode::Pocket));
    let pending = tokio::spawn({
        let flow = Arc::clone(&flow);
        async move { flow.report_decoded("10").await }
    });
    h.api.move_started.notified().await;

    h.pocket.add(21);
    release.send(()).expect("request ainda pendente");
    pending.await.expect("task terminou");

    assert_eq!(h.pocket.item_ids(), vec![21]);
}

#[tokio::test]
async fn teardown_during_move_applies_result_without_ui_transition() {
    let mut h = harness();
    h.pocket.add(7);
    h.session.begin(7);
    let release = h.api.hold_next_move();

    let flow = Arc::new(h.dispatcher.open(ScanMode::Navigate));
    let pending = tokio::spawn({
        let flow = Arc::clone(&flow);
        async move { flow.report_decoded("42").await }
    });
    h.api.move_started.notified().await;

    // A tela do scanner foi desmontada no meio do request.
    flow.cancel();
    release.send(()).expect("request ainda pendente");
    let outcome = pending.await.expect("task terminou");

    assert_eq!(outcome, ScanOutcome::Moved { item_id: 7, location: loc(42) });
    assert!(!h.pocket.contains(7));
    let events = drain(&mut h.ui);
    assert!(!events.contains(&UiEvent::CloseScanner));
    assert!(!events.iter().any(|e| matches!(e, UiEvent::Navigate(_))));
}

#[tokio::test]
async fn run_drops_scans_queued_while_dispatching() {
    let h = harness();
    h.pocket.add(3);
    h.api.fail_next_move(unavailable());

    let (tx, mut rx) = mpsc::channel(8);
    for payload in ["10", "10", "10"] {
        tx.send(ScanEvent { payload: payload.into() }).await.expect("canal aberto");
    }

    let flow = h.dispatcher.open(ScanMode::Pocket);
    let api = Arc::clone(&h.api);
    let runner = flow.run(&mut rx);
    let feeder = async move {
        // Só depois da primeira tentativa (falhada) manda um scan novo.
        api.move_started.notified().await;
        tokio::task::yield_now().await;
        tx.send(ScanEvent { payload: "12".into() }).await.expect("canal aberto");
    };

    let (end, ()) = tokio::join!(runner, feeder);
    assert_eq!(end, FlowEnd::Closed);
    let moves = h.api.moves.lock().clone();
    assert_eq!(moves, vec![(vec![3], loc(10)), (vec![3], loc(12))]);
}
