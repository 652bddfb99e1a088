use biolink_broadcaster::{BroadcastEvent, DaemonState, EventBroadcaster, EventStreamServer};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::unix::OwnedReadHalf;
use tokio::net::UnixStream;

async fn read_event(reader: &mut BufReader<OwnedReadHalf>) -> Value {
    let mut line = String::new();
    tokio::time::timeout(Duration::from_secs(2), reader.read_line(&mut line))
        .await
        .expect("timed out waiting for event")
        .unwrap();
    serde_json::from_str(line.trim()).unwrap()
}

async fn connect(path: &std::path::Path) -> (BufReader<OwnedReadHalf>, tokio::net::unix::OwnedWriteHalf) {
    let stream = UnixStream::connect(path).await.unwrap();
    let (read, write) = stream.into_split();
    (BufReader::new(read), write)
}

async fn wait_for_subscribers(broadcaster: &EventBroadcaster, count: usize) {
    let wait = async {
        while broadcaster.subscriber_count() != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(2), wait)
        .await
        .expect("subscriber count never settled");
}

#[tokio::test]
async fn test_server_lifecycle() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("events.sock");

    let server = EventStreamServer::new(&socket_path, Arc::new(EventBroadcaster::new()));

    server.start().await.unwrap();
    assert!(socket_path.exists());
    assert!(server.start().await.is_err(), "second start must be rejected");

    server.stop().await.unwrap();
    assert!(!socket_path.exists());
    assert!(server.stop().await.is_err(), "stop when idle must be rejected");
}

#[tokio::test]
async fn test_client_receives_catch_up_state() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("catchup.sock");

    let broadcaster = Arc::new(EventBroadcaster::new());
    broadcaster.broadcast_state_change(DaemonState::Acquiring);

    let server = EventStreamServer::new(&socket_path, Arc::clone(&broadcaster));
    server.start().await.unwrap();

    let (mut reader, _writer) = connect(&socket_path).await;
    let first = read_event(&mut reader).await;
    assert_eq!(first["type"], "state_change");
    assert_eq!(first["state"], "acquiring");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_two_clients_see_same_order() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("multi.sock");

    let broadcaster = Arc::new(EventBroadcaster::new());
    let server = EventStreamServer::new(&socket_path, Arc::clone(&broadcaster));
    server.start().await.unwrap();

    let (mut reader1, _w1) = connect(&socket_path).await;
    let (mut reader2, _w2) = connect(&socket_path).await;
    wait_for_subscribers(&broadcaster, 2).await;

    for label in ["A", "B", "C"] {
        broadcaster.publish(BroadcastEvent::game_event(None, json!({ "label": label })));
    }

    // Skip catch-up state, then expect A, B, C on both connections
    for reader in [&mut reader1, &mut reader2] {
        assert_eq!(read_event(reader).await["type"], "state_change");
        let labels: Vec<Value> = vec![
            read_event(reader).await["data"]["label"].clone(),
            read_event(reader).await["data"]["label"].clone(),
            read_event(reader).await["data"]["label"].clone(),
        ];
        assert_eq!(labels, vec![json!("A"), json!("B"), json!("C")]);
    }

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_disconnect_unsubscribes_without_affecting_others() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("disconnect.sock");

    let broadcaster = Arc::new(EventBroadcaster::new());
    let server = EventStreamServer::new(&socket_path, Arc::clone(&broadcaster));
    server.start().await.unwrap();

    let (mut staying, _w1) = connect(&socket_path).await;
    let (leaving_reader, leaving_writer) = connect(&socket_path).await;
    wait_for_subscribers(&broadcaster, 2).await;

    drop(leaving_reader);
    drop(leaving_writer);
    wait_for_subscribers(&broadcaster, 1).await;

    broadcaster.publish(BroadcastEvent::sample(1.0, json!({ "EDA": 1.2 })));

    assert_eq!(read_event(&mut staying).await["type"], "state_change");
    let sample = read_event(&mut staying).await;
    assert_eq!(sample["type"], "sample");
    assert_eq!(sample["values"]["EDA"], 1.2);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_closes_client_connections() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("shutdown.sock");

    let broadcaster = Arc::new(EventBroadcaster::new());
    let server = EventStreamServer::new(&socket_path, Arc::clone(&broadcaster));
    server.start().await.unwrap();

    let (_reader, _writer) = connect(&socket_path).await;
    wait_for_subscribers(&broadcaster, 1).await;

    server.stop().await.unwrap();
    wait_for_subscribers(&broadcaster, 0).await;
}
