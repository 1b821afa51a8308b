use super::*;
use crate::test_utils::MockConnector;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

fn assert_send<T: Send>(_: &T) {}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn manager(connector: &Arc<MockConnector>) -> Arc<ConnectionManager> {
    ConnectionManager::new(
        "test",
        connector.clone(),
        ReconnectPolicy::new(ms(1000), ms(8000)),
    )
}

/// Timer deadlines are rounded to the millisecond tick.
fn assert_gap(earlier: Instant, later: Instant, expected: Duration) {
    let gap = later.duration_since(earlier);
    assert!(
        gap >= expected && gap <= expected + ms(5),
        "expected a gap of {expected:?}, got {gap:?}"
    );
}

// -- connect ---------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn start_connects_once() {
    let connector = MockConnector::healthy();
    let manager = manager(&connector);
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    assert_eq!(manager.start().await, ConnectionState::Connected);
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn connect_when_connected_is_a_no_op() {
    let connector = MockConnector::healthy();
    let manager = manager(&connector);
    manager.start().await;

    assert_eq!(manager.connect().await, ConnectionState::Connected);
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_connect_is_not_an_error() {
    let connector = MockConnector::down();
    let manager = manager(&connector);
    assert_eq!(manager.start().await, ConnectionState::Disconnected);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn concurrent_connects_share_one_attempt() {
    let connector = MockConnector::healthy();
    connector.set_connect_latency(ms(100));
    let manager = manager(&connector);

    let (a, b, c) = tokio::join!(manager.connect(), manager.connect(), manager.connect());
    assert_eq!(
        [a, b, c],
        [ConnectionState::Connected; 3],
        "every caller sees the shared outcome"
    );
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn subscribers_observe_transitions() {
    let connector = MockConnector::healthy();
    let manager = manager(&connector);
    let mut rx = manager.subscribe();
    assert_eq!(*rx.borrow(), ConnectionState::Disconnected);

    manager.start().await;
    assert!(rx.has_changed().expect("sender alive"));
    assert_eq!(*rx.borrow_and_update(), ConnectionState::Connected);
}

// -- backoff ---------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn reconnect_attempts_back_off_exponentially() {
    let connector = MockConnector::down();
    let manager = manager(&connector);
    manager.start().await;

    sleep(ms(1000 + 2000 + 4000 + 8000 + 8000 + 500)).await;

    let times = connector.attempt_times();
    assert_eq!(times.len(), 6, "initial attempt plus five reconnects");
    for (pair, expected) in times.windows(2).zip([1000, 2000, 4000, 8000, 8000]) {
        assert_gap(pair[0], pair[1], ms(expected));
    }
}

#[tokio::test(start_paused = true)]
async fn successful_connect_resets_backoff() {
    let connector = MockConnector::down();
    let manager = manager(&connector);
    manager.start().await;

    // attempt at 1000 fails, next one is due 2000 later
    sleep(ms(1500)).await;
    connector.set_up(true);
    sleep(ms(2000)).await;
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(connector.attempts(), 3);

    let hung_up = Instant::now();
    connector.last_session().expect("session").hang_up();
    sleep(ms(1500)).await;

    let times = connector.attempt_times();
    assert_eq!(times.len(), 4);
    assert_gap(hung_up, times[3], ms(1000));
    assert_eq!(manager.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn concurrent_failures_double_backoff_once() {
    let connector = MockConnector::down();
    connector.set_connect_latency(ms(100));
    let manager = manager(&connector);

    let (a, b, c) = tokio::join!(manager.connect(), manager.connect(), manager.connect());
    assert_eq!([a, b, c], [ConnectionState::Disconnected; 3]);
    assert_eq!(connector.attempts(), 1);

    sleep(ms(1100 + 2100 + 50)).await;
    let times = connector.attempt_times();
    assert_eq!(times.len(), 3);
    assert_gap(times[0], times[1], ms(1100));
    assert_gap(times[1], times[2], ms(2100));
}

#[tokio::test(start_paused = true)]
async fn timer_does_nothing_when_already_connected() {
    let connector = MockConnector::down();
    let manager = manager(&connector);
    manager.start().await;

    connector.set_up(true);
    assert_eq!(manager.connect().await, ConnectionState::Connected);
    assert_eq!(connector.attempts(), 2);

    sleep(ms(3000)).await;
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_manager_stops_reconnecting() {
    let connector = MockConnector::down();
    let manager = manager(&connector);
    manager.start().await;
    drop(manager);

    sleep(ms(10_000)).await;
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn remote_close_triggers_reconnect() {
    let connector = MockConnector::healthy();
    let manager = manager(&connector);
    manager.start().await;

    connector.last_session().expect("session").hang_up();
    let mut rx = manager.subscribe();
    rx.wait_for(|state| *state == ConnectionState::Disconnected)
        .await
        .expect("sender alive");

    sleep(ms(1100)).await;
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(connector.attempts(), 2);
}

// -- send ------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn send_delivers_over_live_session() {
    let connector = MockConnector::healthy();
    let manager = manager(&connector);
    manager.start().await;

    manager.send("list").await.expect("send");
    assert_eq!(connector.wire.delivered(), vec!["list"]);
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn send_without_session_connects_first() {
    let connector = MockConnector::healthy();
    let manager = manager(&connector);

    manager.send("list").await.expect("send");
    assert_eq!(connector.attempts(), 1);
    assert_eq!(manager.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn send_while_unreachable_is_unavailable() {
    let connector = MockConnector::down();
    let manager = manager(&connector);

    let err = manager.send("list").await.expect_err("server is down");
    assert!(matches!(err, ConnectionError::Unavailable { .. }), "got {err:?}");
    assert_eq!(connector.attempts(), 1);
    assert_eq!(connector.wire.transmissions(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_send_reconnects_and_retries_once() {
    let connector = MockConnector::healthy();
    let manager = manager(&connector);
    manager.start().await;
    connector.wire.fail_next_sends(1);

    manager.send("say hi").await.expect("retry should succeed");
    assert_eq!(connector.wire.transmissions(), 2);
    assert_eq!(connector.attempts(), 2);
    assert_eq!(connector.wire.delivered(), vec!["say hi"]);
}

#[tokio::test(start_paused = true)]
async fn failed_retry_is_send_failed_after_one_reconnect() {
    let connector = MockConnector::healthy();
    let manager = manager(&connector);
    manager.start().await;
    connector.wire.fail_next_sends(2);

    let err = manager.send("say hi").await.expect_err("both sends fail");
    assert!(matches!(err, ConnectionError::SendFailed { .. }), "got {err:?}");
    assert_eq!(connector.wire.transmissions(), 2);
    assert_eq!(connector.attempts(), 2, "exactly one reconnect inside send");
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    // the state machine takes over from here
    sleep(ms(1100)).await;
    assert_eq!(connector.attempts(), 3);
    assert_eq!(manager.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn failed_reconnect_during_send_is_send_failed() {
    let connector = MockConnector::healthy();
    let manager = manager(&connector);
    manager.start().await;
    connector.wire.fail_next_sends(1);
    connector.set_up(false);

    let err = manager.send("say hi").await.expect_err("no session for retry");
    assert!(matches!(err, ConnectionError::SendFailed { .. }), "got {err:?}");
    assert_eq!(connector.wire.transmissions(), 1);
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn rejected_command_keeps_session() {
    let connector = MockConnector::healthy();
    let manager = manager(&connector);
    manager.start().await;
    connector.wire.reject_prefix("tellraw");

    let err = manager
        .send("tellraw @a {}")
        .await
        .expect_err("command rejected");
    assert!(matches!(err, ConnectionError::SendFailed { .. }));
    assert_eq!(connector.attempts(), 1, "no reconnect for a rejected command");
    assert_eq!(manager.state(), ConnectionState::Connected);

    manager.send("say ok").await.expect("session still usable");
}

#[test]
fn connection_error_display_names_server() {
    let err = ConnectionError::Unavailable {
        server: "survival".to_string(),
    };
    assert!(err.to_string().contains("survival"));
}

#[tokio::test(start_paused = true)]
async fn manager_futures_can_be_spawned() {
    let connector = MockConnector::healthy();
    let manager = manager(&connector);

    let connect = manager.connect();
    assert_send(&connect);
    drop(connect);
    let send = manager.send("say hi");
    assert_send(&send);
    drop(send);

    let spawned = Arc::clone(&manager);
    let reply = tokio::spawn(async move { spawned.send("say hi").await })
        .await
        .expect("send task");
    assert!(reply.is_ok());
    assert_eq!(connector.wire.delivered(), vec!["say hi"]);
}
