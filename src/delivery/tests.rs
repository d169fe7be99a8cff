//! Tests for the HTTP supervisor client against a local stand-in.

use std::net::{SocketAddr, TcpListener};
use std::thread;
use std::time::Duration;

use rstest::{fixture, rstest};

use crate::log_entry::LogEntry;
use crate::severity::Severity;
use crate::test_utils::MockSupervisor;

use super::{DeliveryError, HttpSupervisorClient, KILL_PATH, LOG_PATH, SupervisorClient, post_json};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Spawn a supervisor stand-in that accepts a connection and never answers.
fn spawn_silent_supervisor(listener: TcpListener, hold_for: Duration) -> SocketAddr {
    let addr = listener.local_addr().expect("listener has address");
    thread::spawn(move || {
        let Ok((stream, _)) = listener.accept() else {
            return;
        };
        thread::sleep(hold_for);
        drop(stream);
    });
    addr
}

fn client_for(supervisor: &MockSupervisor) -> HttpSupervisorClient {
    HttpSupervisorClient::new("127.0.0.1", supervisor.port())
}

#[fixture]
fn tcp_listener() -> TcpListener {
    TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener")
}

#[rstest]
fn posts_log_batch_as_json() {
    let supervisor = MockSupervisor::start(|_| 200);
    let client = client_for(&supervisor);
    let entries = vec![
        LogEntry::with_timestamp("one", Severity::Info, "t1", "exec"),
        LogEntry::with_timestamp("two", Severity::Error, "t2", ""),
    ];

    post_json(&client, LOG_PATH, &entries, TIMEOUT).expect("delivery succeeds");

    let captured = supervisor.next_request(TIMEOUT).expect("request");
    assert_eq!(captured.method, "POST");
    assert_eq!(captured.path, LOG_PATH);
    assert_eq!(captured.header("content-type"), Some("application/json"));
    let decoded: Vec<LogEntry> = serde_json::from_str(&captured.body).expect("json body");
    assert_eq!(decoded, entries);
}

#[rstest]
fn kill_body_is_null() {
    let supervisor = MockSupervisor::start(|_| 204);
    let client = client_for(&supervisor);

    post_json(&client, KILL_PATH, &(), TIMEOUT).expect("kill succeeds");

    let captured = supervisor.next_request(TIMEOUT).expect("request");
    assert_eq!(captured.path, KILL_PATH);
    assert_eq!(captured.body, "null");
}

#[rstest]
#[case(404)]
#[case(500)]
#[case(302)]
fn non_2xx_is_bad_status(#[case] status: u16) {
    let supervisor = MockSupervisor::start(move |_| status);
    let client = client_for(&supervisor);

    let err = client
        .post(LOG_PATH, b"[]", TIMEOUT)
        .expect_err("non-2xx must fail");
    assert!(matches!(err, DeliveryError::BadStatus(code) if code == status));
    // Redirects are reported, never followed.
    assert_eq!(
        supervisor.next_request(TIMEOUT).map(|r| r.path).as_deref(),
        Some(LOG_PATH)
    );
    assert!(supervisor.next_request(Duration::from_millis(100)).is_none());
}

#[rstest]
fn unanswered_request_times_out(tcp_listener: TcpListener) {
    let addr = spawn_silent_supervisor(tcp_listener, Duration::from_secs(3));
    let client = HttpSupervisorClient::new(&addr.ip().to_string(), addr.port());

    let err = client
        .post(LOG_PATH, b"[]", Duration::from_millis(200))
        .expect_err("silent supervisor must time out");
    assert!(matches!(err, DeliveryError::Timeout), "got {err:?}");
}

#[rstest]
fn refused_connection_is_transport_error(tcp_listener: TcpListener) {
    let addr = tcp_listener.local_addr().expect("listener has address");
    drop(tcp_listener);
    let client = HttpSupervisorClient::new(&addr.ip().to_string(), addr.port());

    let err = client
        .post(LOG_PATH, b"[]", TIMEOUT)
        .expect_err("closed port must fail");
    assert!(matches!(err, DeliveryError::Transport(_)), "got {err:?}");
    assert!(err.to_string().starts_with("error when calling supervisor"));
}
