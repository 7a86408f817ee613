//! Session behaviour against a scripted server.

use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rtminer_transport::testing::{MockServer, Step};
use rtminer_wire::Value;

use super::*;
use crate::dispatcher::RequestDispatcher;
use crate::network::StaticProbe;

fn expect_int(n: i32) -> Step {
    Step::Expect(Value::Integer(n))
}

fn expect_str(s: &str) -> Step {
    Step::Expect(Value::from(s))
}

fn send(value: impl Into<Value>) -> Step {
    Step::Send(value.into())
}

fn session_for(server: &MockServer) -> Arc<Session> {
    let session = Arc::new(Session::new(SessionConfig::default()));
    session.set_probe(Arc::new(StaticProbe(true)));
    session
        .set_endpoint("127.0.0.1", u32::from(server.port()))
        .unwrap();
    session
}

fn connected(server: &MockServer) -> Arc<Session> {
    let session = session_for(server);
    session.connect().unwrap();
    session
}

/// Script prefix that loads a tree so prediction is allowed.
fn load_ok(file: &str) -> Vec<Step> {
    vec![expect_int(4), expect_str(file), send("ok")]
}

#[test]
fn test_list_then_disconnect() {
    let server = MockServer::start(vec![expect_int(1), send(vec!["iris", "votes"])]).unwrap();
    let session = connected(&server);
    assert!(session.is_connected());
    assert_eq!(session.state(), SessionState::Idle);

    assert_eq!(session.list_tables().unwrap(), vec!["iris", "votes"]);
    assert_eq!(session.state(), SessionState::Idle);

    session.disconnect();
    assert!(!session.is_connected());
    assert_eq!(session.state(), SessionState::Disconnected);

    let logs = server.join().unwrap();
    assert_eq!(logs[0].received, vec![Value::Integer(1)]);
    assert!(logs[0].trailing.is_empty());
}

#[test]
fn test_learn_ok_then_print_is_verbatim() {
    let tree = "petal<2: Iris-setosa\npetal>=2\n  width<1.7: Iris-versicolor\n";
    let server = MockServer::start(vec![
        expect_int(3),
        expect_str("iris"),
        send("ok"),
        expect_int(5),
        send(tree),
    ])
    .unwrap();
    let session = connected(&server);

    assert_eq!(session.learn_tree_from_table("iris").unwrap(), LoadStatus::Ok);
    assert!(session.has_tree());
    assert_eq!(session.print_tree().unwrap(), tree);

    session.disconnect();
    assert!(!session.has_tree());
    server.join().unwrap();
}

#[test]
fn test_table_not_found_keeps_session_idle() {
    let server = MockServer::start(vec![
        expect_int(3),
        expect_str("zzz"),
        send("tableNotFound"),
        expect_int(5),
        send(""),
    ])
    .unwrap();
    let session = connected(&server);

    let status = session.learn_tree_from_table("zzz").unwrap();
    assert_eq!(status, LoadStatus::TableNotFound);
    assert_eq!(
        status.ensure_ok(),
        Err(ClientError::ServerReported("tableNotFound".into()))
    );
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.is_connected());

    // Printing is not gated; the server decides what to send.
    assert_eq!(session.print_tree().unwrap(), "");
    // Prediction is.
    assert_eq!(
        session.begin_prediction().unwrap_err(),
        ClientError::NoTreeLoaded
    );

    session.disconnect();
    let logs = server.join().unwrap();
    assert!(logs[0].trailing.is_empty());
}

#[test]
fn test_empty_archive_sentinel_surfaces_as_is() {
    let server = MockServer::start(vec![expect_int(2), send(vec!["NoFilesFound"])]).unwrap();
    let session = connected(&server);

    let files = session.list_files().unwrap();
    assert_eq!(files, vec!["NoFilesFound"]);
    assert!(Catalogue::Files.is_empty_listing(&files));
    assert_eq!(session.state(), SessionState::Idle);

    session.disconnect();
    server.join().unwrap();
}

#[test]
fn test_prediction_happy_path() {
    let mut script = load_ok("iris.dmp");
    script.extend([
        expect_int(6),
        send("QUERY"),
        send("petal length?"),
        send(2),
        expect_int(1),
        send("QUERY"),
        send("width?"),
        send(3),
        expect_int(0),
        send("OK"),
        send("Iris-virginica"),
    ]);
    let server = MockServer::start(script).unwrap();
    let session = connected(&server);
    session.load_tree_from_file("iris.dmp").unwrap();

    let dialog = session.begin_prediction().unwrap();
    assert_eq!(
        dialog.turn(),
        Turn::Query {
            prompt: "petal length?".into(),
            children: 2,
        }
    );
    assert_eq!(session.state(), SessionState::Predicting);

    // The lease keeps other requests off the channel.
    assert_eq!(session.list_tables().unwrap_err(), ClientError::Busy);
    assert_eq!(session.begin_prediction().unwrap_err(), ClientError::Busy);

    // Out-of-range choices never reach the server.
    assert_eq!(
        dialog.choose(2).unwrap_err(),
        ClientError::InvalidChoice {
            index: 2,
            children: 2,
        }
    );
    assert!(!dialog.is_done());

    assert_eq!(
        dialog.choose(1).unwrap(),
        Turn::Query {
            prompt: "width?".into(),
            children: 3,
        }
    );
    assert_eq!(
        dialog.choose(0).unwrap(),
        Turn::Done("Iris-virginica".into())
    );
    assert!(dialog.is_done());
    assert_eq!(dialog.prediction().as_deref(), Some("Iris-virginica"));
    assert_eq!(session.state(), SessionState::Idle);

    drop(dialog);
    assert!(session.is_connected());
    session.disconnect();

    let logs = server.join().unwrap();
    assert_eq!(
        logs[0].received,
        vec![
            Value::Integer(4),
            Value::from("iris.dmp"),
            Value::Integer(6),
            Value::Integer(1),
            Value::Integer(0),
        ]
    );
    assert!(logs[0].trailing.is_empty());
}

#[test]
fn test_prediction_abort_by_disconnect() {
    let mut script = load_ok("t");
    script.extend([
        expect_int(6),
        send("QUERY"),
        send("petal length?"),
        send(2),
        Step::AwaitClose,
    ]);
    let server = MockServer::start(script).unwrap();
    let session = connected(&server);
    session.load_tree_from_file("t").unwrap();
    let dialog = session.begin_prediction().unwrap();

    session.disconnect();
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(!session.is_connected());
    assert_eq!(dialog.choose(0).unwrap_err(), ClientError::Aborted);

    let logs = server.join().unwrap();
    assert!(logs[0].trailing.is_empty());
}

#[test]
fn test_disconnect_aborts_blocked_receive() {
    let server = MockServer::start(vec![expect_int(1), Step::AwaitClose]).unwrap();
    let session = connected(&server);

    let worker = {
        let session = Arc::clone(&session);
        thread::spawn(move || session.list_tables())
    };
    thread::sleep(Duration::from_millis(100));
    assert_eq!(session.state(), SessionState::Busy);

    session.disconnect();
    assert_eq!(worker.join().unwrap(), Err(ClientError::Aborted));
    assert_eq!(session.state(), SessionState::Disconnected);
    server.join().unwrap();
}

#[test]
fn test_dropped_dialog_closes_connection() {
    let mut script = load_ok("t");
    script.extend([
        expect_int(6),
        send("QUERY"),
        send("outlook?"),
        send(3),
        Step::AwaitClose,
    ]);
    let server = MockServer::start(script).unwrap();
    let session = connected(&server);
    session.load_tree_from_file("t").unwrap();

    let dialog = session.begin_prediction().unwrap();
    let clone = dialog.clone();
    drop(dialog);
    assert_eq!(session.state(), SessionState::Predicting);
    drop(clone);
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(!session.is_connected());
    server.join().unwrap();
}

#[test]
fn test_immediate_prediction_holds_no_lease() {
    let mut script = load_ok("stump");
    script.extend([expect_int(6), send("OK"), send("yes"), expect_int(1), send(vec!["a"])]);
    let server = MockServer::start(script).unwrap();
    let session = connected(&server);
    session.load_tree_from_file("stump").unwrap();

    let dialog = session.begin_prediction().unwrap();
    assert_eq!(dialog.prediction().as_deref(), Some("yes"));
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(
        dialog.choose(0).unwrap_err(),
        ClientError::InvalidChoice {
            index: 0,
            children: 0,
        }
    );
    assert_eq!(session.list_tables().unwrap(), vec!["a"]);

    session.disconnect();
    server.join().unwrap();
}

#[test]
fn test_unknown_status_is_fatal() {
    let server =
        MockServer::start(vec![expect_int(3), expect_str("iris"), send("maybe")]).unwrap();
    let session = connected(&server);

    let err = session.learn_tree_from_table("iris").unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Protocol);
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(!session.is_connected());
    server.join().unwrap();
}

#[test]
fn test_file_status_for_table_request_is_fatal() {
    let server = MockServer::start(vec![
        expect_int(3),
        expect_str("iris"),
        send("fileNotFound"),
    ])
    .unwrap();
    let session = connected(&server);
    assert!(session.learn_tree_from_table("iris").unwrap_err().is_fatal());
    server.join().unwrap();
}

#[test]
fn test_unknown_prediction_tag_is_fatal() {
    let mut script = load_ok("t");
    script.extend([expect_int(6), send("MAYBE")]);
    let server = MockServer::start(script).unwrap();
    let session = connected(&server);
    session.load_tree_from_file("t").unwrap();

    let err = session.begin_prediction().unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Protocol);
    assert_eq!(session.state(), SessionState::Disconnected);
    server.join().unwrap();
}

#[test]
fn test_query_without_children_is_fatal() {
    let mut script = load_ok("t");
    script.extend([expect_int(6), send("QUERY"), send("empty?"), send(0)]);
    let server = MockServer::start(script).unwrap();
    let session = connected(&server);
    session.load_tree_from_file("t").unwrap();

    assert!(session.begin_prediction().unwrap_err().is_fatal());
    assert!(!session.is_connected());
    server.join().unwrap();
}

#[test]
fn test_surplus_reply_values_are_fatal() {
    let server = MockServer::start(vec![
        expect_int(5),
        Step::SendAll(vec![Value::from("tree"), Value::from("extra")]),
    ])
    .unwrap();
    let session = connected(&server);

    let err = session.print_tree().unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Protocol);
    assert_eq!(session.state(), SessionState::Disconnected);
    server.join().unwrap();
}

#[test]
fn test_wrong_reply_shape_is_decode_error() {
    let server = MockServer::start(vec![expect_int(1), send(42)]).unwrap();
    let session = connected(&server);

    let err = session.list_tables().unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Decode);
    assert!(!session.is_connected());
    server.join().unwrap();
}

#[test]
fn test_server_hangup_is_io_error() {
    let server = MockServer::start(vec![expect_int(1), Step::Close]).unwrap();
    let session = connected(&server);

    let err = session.list_tables().unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Io);
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.list_tables().unwrap_err(), ClientError::NotConnected);
    server.join().unwrap();
}

#[test]
fn test_empty_name_rejected_before_sending() {
    let server = MockServer::start(vec![]).unwrap();
    let session = connected(&server);

    assert!(matches!(
        session.learn_tree_from_table(""),
        Err(ClientError::InvalidArgument(_))
    ));
    assert!(matches!(
        session.load_tree_from_file(""),
        Err(ClientError::InvalidArgument(_))
    ));
    assert!(session.is_connected());

    session.disconnect();
    let logs = server.join().unwrap();
    assert!(logs[0].trailing.is_empty());
}

#[test]
fn test_disconnect_is_idempotent() {
    let server = MockServer::start(vec![]).unwrap();
    let session = connected(&server);

    session.disconnect();
    let first = (session.state(), session.is_connected());
    session.disconnect();
    assert_eq!((session.state(), session.is_connected()), first);
    assert_eq!(first, (SessionState::Disconnected, false));
    server.join().unwrap();

    let never_connected = Session::new(SessionConfig::default());
    never_connected.disconnect();
    assert_eq!(never_connected.state(), SessionState::Disconnected);
}

#[test]
fn test_connect_preconditions() {
    let session = Session::new(SessionConfig::default());
    session.set_probe(Arc::new(StaticProbe(true)));

    // Unset endpoint
    assert!(matches!(session.connect(), Err(ClientError::Config(_))));

    session.set_endpoint("1.2.3", 50000).unwrap();
    assert_eq!(session.check_endpoint(), EndpointCheck::InvalidHost);
    assert!(matches!(session.connect(), Err(ClientError::Config(_))));

    session.set_endpoint("127.0.0.1", 1023).unwrap();
    assert_eq!(session.check_endpoint(), EndpointCheck::InvalidPort);
    assert!(matches!(session.connect(), Err(ClientError::Config(_))));

    session.set_endpoint("127.0.0.1", 50000).unwrap();
    session.set_probe(Arc::new(StaticProbe(false)));
    assert!(matches!(session.connect(), Err(ClientError::NoNetwork(_))));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.metrics().connections, 0);
}

#[test]
fn test_connect_refused() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let session = Session::new(SessionConfig::default());
    session.set_probe(Arc::new(StaticProbe(true)));
    session.set_endpoint("127.0.0.1", u32::from(port)).unwrap();

    let err = session.connect().unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Connect);
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(!session.is_connected());
    assert_eq!(session.metrics().failed_connections, 1);
}

#[test]
fn test_connect_twice_keeps_one_connection() {
    let server = MockServer::start(vec![expect_int(1), send(vec!["iris"])]).unwrap();
    let session = connected(&server);
    session.connect().unwrap();
    assert_eq!(session.metrics().connections, 1);
    assert_eq!(session.list_tables().unwrap(), vec!["iris"]);
    session.disconnect();
    server.join().unwrap();
}

#[test]
fn test_endpoint_locked_while_connected() {
    let server = MockServer::start(vec![]).unwrap();
    let session = connected(&server);
    let before = session.endpoint();

    assert!(matches!(session.set_port(4444), Err(ClientError::Config(_))));
    assert!(matches!(
        session.set_host("10.0.0.1"),
        Err(ClientError::Config(_))
    ));
    assert_eq!(session.endpoint(), before);

    session.disconnect();
    session.set_port(4444).unwrap();
    assert_eq!(session.port(), 4444);
    server.join().unwrap();
}

#[test]
fn test_reconnect_starts_fresh_conversation() {
    let server = MockServer::start_sessions(vec![
        vec![expect_int(1), send(vec!["a"])],
        vec![expect_int(1), send(vec!["b"])],
    ])
    .unwrap();
    let session = connected(&server);

    assert_eq!(session.list_tables().unwrap(), vec!["a"]);
    session.reconnect().unwrap();
    assert_eq!(session.list_tables().unwrap(), vec!["b"]);
    session.disconnect();

    let logs = server.join().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(session.metrics().connections, 2);
}

#[test]
fn test_metrics_count_exchanges() {
    let server = MockServer::start(vec![expect_int(1), send(vec!["iris"])]).unwrap();
    let session = connected(&server);
    session.list_tables().unwrap();

    let metrics = session.metrics();
    assert_eq!(metrics.connections, 1);
    assert_eq!(metrics.messages_sent, 1);
    assert_eq!(metrics.messages_received, 1);
    assert_eq!(metrics.active_connections, 1);

    session.disconnect();
    assert_eq!(session.metrics().active_connections, 0);
    server.join().unwrap();
}

#[tokio::test]
async fn test_dispatcher_preserves_submission_order() {
    let server = MockServer::start(vec![
        expect_int(1),
        send(vec!["iris"]),
        expect_int(3),
        expect_str("iris"),
        send("ok"),
        expect_int(5),
        send("tree"),
        expect_int(2),
        send(vec!["NoFilesFound"]),
    ])
    .unwrap();
    let dispatcher = RequestDispatcher::new(session_for(&server)).unwrap();
    dispatcher.connect().await.unwrap();

    // Submitted back to back, awaited out of order.
    let tables = dispatcher.list_tables();
    let learned = dispatcher.learn_tree_from_table("iris");
    let printed = dispatcher.print_tree();
    let files = dispatcher.list_files();

    assert_eq!(files.await.unwrap(), vec!["NoFilesFound"]);
    assert_eq!(printed.await.unwrap(), "tree");
    assert_eq!(learned.await.unwrap(), LoadStatus::Ok);
    assert_eq!(tables.await.unwrap(), vec!["iris"]);

    dispatcher.disconnect().await.unwrap();
    server.join().unwrap();
}

#[tokio::test]
async fn test_dispatcher_prediction_and_abort() {
    let mut script = load_ok("iris.dmp");
    script.extend([
        expect_int(6),
        send("QUERY"),
        send("petal length?"),
        send(2),
        expect_int(1),
        Step::AwaitClose,
    ]);
    let server = MockServer::start(script).unwrap();
    let dispatcher = RequestDispatcher::new(session_for(&server)).unwrap();
    dispatcher.connect().await.unwrap();
    dispatcher.load_tree_from_file("iris.dmp").await.unwrap();

    let dialog = dispatcher.begin_prediction().await.unwrap();
    assert!(!dialog.is_done());

    // The server never answers this choice; disconnect must still get through.
    let pending = dispatcher.choose(&dialog, 1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    dispatcher.disconnect().await.unwrap();

    assert_eq!(pending.await, Err(ClientError::Aborted));
    assert_eq!(dispatcher.session().state(), SessionState::Disconnected);
    server.join().unwrap();
}
