//! Behavioural tests for the sender loop and the HTTP transport.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, bounded};
use rstest::{fixture, rstest};

use crate::queue::DeliveryQueue;
use crate::test_utils::mock_server::{closed_addr, local_listener, spawn_mock_server};
use crate::test_utils::recording::{ScriptedTransport, fail, failing};

use super::{
    BackoffPolicy, DeadLetterHook, RetryPolicy, SenderConfig, Transport, TransportError,
    TransportErrorKind, UreqTransport, spawn_sender,
};

const WAIT: Duration = Duration::from_secs(5);

#[fixture]
fn queue() -> Arc<DeliveryQueue> {
    Arc::new(DeliveryQueue::new())
}

#[fixture]
fn fast_config() -> SenderConfig {
    SenderConfig::default()
        .with_poll_interval(Duration::from_millis(10))
        .with_backoff(BackoffPolicy::Constant {
            delay: Duration::ZERO,
            rate_limited_delay: Duration::from_millis(200),
        })
}

fn submit_all(queue: &DeliveryQueue, uris: &[&str]) {
    for uri in uris {
        queue.submit(*uri, 100).expect("queue has room");
    }
}

fn recv_n(rx: &Receiver<String>, n: usize) -> Vec<String> {
    (0..n)
        .map(|_| rx.recv_timeout(WAIT).expect("attempt recorded"))
        .collect()
}

fn wait_until_empty(queue: &DeliveryQueue) {
    let deadline = Instant::now() + WAIT;
    while queue.waiting() > 0 {
        assert!(Instant::now() < deadline, "queue never drained");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[rstest]
fn delivers_in_submission_order(queue: Arc<DeliveryQueue>, fast_config: SenderConfig) {
    submit_all(&queue, &["a", "b", "c"]);
    let (transport, attempts) = ScriptedTransport::succeeding();
    let _sender = spawn_sender(Arc::clone(&queue), transport, fast_config);

    assert_eq!(recv_n(&attempts, 3), ["a", "b", "c"]);
    wait_until_empty(&queue);
}

#[rstest]
fn picks_up_items_submitted_after_start(queue: Arc<DeliveryQueue>, fast_config: SenderConfig) {
    let (transport, attempts) = ScriptedTransport::succeeding();
    let _sender = spawn_sender(Arc::clone(&queue), transport, fast_config);

    std::thread::sleep(Duration::from_millis(30));
    submit_all(&queue, &["late"]);
    assert_eq!(recv_n(&attempts, 1), ["late"]);
}

#[rstest]
fn retries_same_item_until_success(queue: Arc<DeliveryQueue>, fast_config: SenderConfig) {
    submit_all(&queue, &["first", "second"]);
    let (transport, attempts) = ScriptedTransport::new([
        fail(TransportErrorKind::Connect),
        fail(TransportErrorKind::Io),
    ]);
    let _sender = spawn_sender(Arc::clone(&queue), transport, fast_config);

    assert_eq!(recv_n(&attempts, 4), ["first", "first", "first", "second"]);
}

#[rstest]
fn failing_host_blocks_later_items(queue: Arc<DeliveryQueue>, fast_config: SenderConfig) {
    submit_all(&queue, &["stuck", "behind"]);
    let (transport, attempts) = failing(TransportErrorKind::Connect);
    let mut sender = spawn_sender(Arc::clone(&queue), transport, fast_config);

    let seen = recv_n(&attempts, 50);
    assert!(seen.iter().all(|uri| uri == "stuck"));
    assert_eq!(queue.waiting(), 1);

    sender.shutdown();
    assert!(sender.is_finished());
    assert_eq!(queue.waiting(), 2);
    assert_eq!(queue.try_dequeue().as_deref(), Some("stuck"));
    assert_eq!(queue.try_dequeue().as_deref(), Some("behind"));
}

#[rstest]
fn rate_limited_failures_wait_before_retrying(
    queue: Arc<DeliveryQueue>,
    fast_config: SenderConfig,
) {
    submit_all(&queue, &["slow"]);
    let (transport, attempts) = ScriptedTransport::new([fail(TransportErrorKind::RateLimited)]);
    let _sender = spawn_sender(Arc::clone(&queue), transport, fast_config);

    attempts.recv_timeout(WAIT).expect("first attempt");
    let started = Instant::now();
    attempts.recv_timeout(WAIT).expect("retry");
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[rstest]
fn capped_retries_hand_item_to_dead_letter(
    queue: Arc<DeliveryQueue>,
    fast_config: SenderConfig,
) {
    submit_all(&queue, &["poison", "healthy"]);
    let (dead_tx, dead_rx) = bounded(4);
    let hook = DeadLetterHook::new(move |uri, err| {
        let _ = dead_tx.try_send((uri.to_owned(), err.kind));
    });
    let config = fast_config
        .with_retry(RetryPolicy::capped(3))
        .with_dead_letter(hook);
    let (transport, attempts) = ScriptedTransport::new([
        fail(TransportErrorKind::Dns),
        fail(TransportErrorKind::Dns),
        fail(TransportErrorKind::Dns),
    ]);
    let _sender = spawn_sender(Arc::clone(&queue), transport, config);

    assert_eq!(
        recv_n(&attempts, 4),
        ["poison", "poison", "poison", "healthy"]
    );
    let (uri, kind) = dead_rx.recv_timeout(WAIT).expect("dead letter");
    assert_eq!(uri, "poison");
    assert_eq!(kind, TransportErrorKind::Dns);
    wait_until_empty(&queue);
}

#[rstest]
fn shutdown_interrupts_idle_poll(queue: Arc<DeliveryQueue>) {
    let config = SenderConfig::default().with_poll_interval(Duration::from_secs(60));
    let (transport, _attempts) = ScriptedTransport::succeeding();
    let mut sender = spawn_sender(Arc::clone(&queue), transport, config);

    std::thread::sleep(Duration::from_millis(20));
    let started = Instant::now();
    sender.shutdown();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(sender.is_finished());
}

#[rstest]
fn shutdown_stops_draining_a_backlog(queue: Arc<DeliveryQueue>, fast_config: SenderConfig) {
    for n in 0..600 {
        queue.submit(format!("item-{n}"), 1_000).expect("queue has room");
    }
    let transport = |_: &str| -> Result<(), TransportError> {
        std::thread::sleep(Duration::from_millis(5));
        Ok(())
    };
    let mut sender = spawn_sender(Arc::clone(&queue), transport, fast_config);

    std::thread::sleep(Duration::from_millis(20));
    let started = Instant::now();
    sender.shutdown();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(sender.is_finished());
    assert!(queue.waiting() > 400);
}

#[rstest]
fn shutdown_during_backoff_requeues_item(queue: Arc<DeliveryQueue>) {
    submit_all(&queue, &["pending", "next"]);
    let config = SenderConfig::default().with_backoff(BackoffPolicy::Constant {
        delay: Duration::from_secs(60),
        rate_limited_delay: Duration::from_secs(60),
    });
    let (transport, attempts) = failing(TransportErrorKind::Io);
    let sender = spawn_sender(Arc::clone(&queue), transport, config);

    attempts.recv_timeout(WAIT).expect("first attempt");
    drop(sender);
    assert_eq!(queue.try_dequeue().as_deref(), Some("pending"));
    assert_eq!(queue.try_dequeue().as_deref(), Some("next"));
}

#[rstest]
#[case(200)]
#[case(404)]
#[case(500)]
fn ureq_transport_ignores_status(#[case] status: u16) {
    let (addr, rx) = spawn_mock_server(local_listener(), vec![status]);
    let mut transport = UreqTransport::new(WAIT, WAIT);
    let uri = format!("http://{addr}/measurements/url_create?instrument_id=1&rh=33");

    assert_eq!(transport.get(&uri), Ok(()));
    let captured = rx.recv_timeout(WAIT).expect("request");
    assert_eq!(captured.method, "GET");
    assert_eq!(captured.path, "/measurements/url_create?instrument_id=1&rh=33");
}

#[test]
fn ureq_transport_reports_rate_limiting() {
    let (addr, _rx) = spawn_mock_server(local_listener(), vec![429]);
    let mut transport = UreqTransport::new(WAIT, WAIT);
    let err = transport
        .get(&format!("http://{addr}/measurements/url_create?instrument_id=1"))
        .expect_err("429 is retryable");
    assert!(err.is_rate_limited());
}

#[test]
fn ureq_transport_reports_refused_connection() {
    let mut transport = UreqTransport::new(WAIT, WAIT);
    let err = transport
        .get(&format!("http://{}/measurements/url_create", closed_addr()))
        .expect_err("nothing listening");
    assert_eq!(err.kind, TransportErrorKind::Connect);
}

#[test]
fn ureq_transport_rejects_unparseable_uri() {
    let mut transport = UreqTransport::new(WAIT, WAIT);
    let err = transport.get("not a uri").expect_err("invalid");
    assert_eq!(err.kind, TransportErrorKind::InvalidUrl);
}

#[rstest]
fn sender_retries_over_http_after_rate_limit(
    queue: Arc<DeliveryQueue>,
    fast_config: SenderConfig,
) {
    let (addr, rx) = spawn_mock_server(local_listener(), vec![429, 200]);
    let uri = format!("http://{addr}/measurements/url_create?instrument_id=1&key=k");
    queue.submit(uri, 10).expect("queue has room");
    let transport = UreqTransport::from_config(&fast_config);
    let _sender = spawn_sender(Arc::clone(&queue), transport, fast_config);

    for _ in 0..2 {
        let captured = rx.recv_timeout(WAIT).expect("request");
        assert_eq!(captured.path, "/measurements/url_create?instrument_id=1&key=k");
    }
    wait_until_empty(&queue);
}
