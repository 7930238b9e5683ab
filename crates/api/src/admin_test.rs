//! Admin endpoint tests

use std::time::Duration;

use polymur_pool::Distribution;
use polymur_sinks::GraphiteWriterConfig;
use tokio::io::AsyncReadExt;
use tokio::time::timeout;

use super::*;

async fn start_admin() -> (String, Arc<Pool>, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (pool, retry_rx) = Pool::new(Distribution::HashRoute, 64);
    let pool = Arc::new(pool);
    // Keep the retry channel open without a live handler.
    std::mem::forget(retry_rx);

    let cancel = CancellationToken::new();
    let spawner = GraphiteSpawner::new(
        Arc::clone(&pool),
        GraphiteWriterConfig {
            redial_interval: Duration::from_millis(50),
            ..Default::default()
        },
        cancel.clone(),
    );

    let address = format!("127.0.0.1:{port}");
    let server = AdminServer::new(Arc::clone(&pool), spawner, address.clone());
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        server.run(cancel_clone).await.unwrap();
    });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if TcpStream::connect(&address).await.is_ok() {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "admin never bound");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    (address, pool, cancel)
}

async fn send_command(address: &str, command: &str) -> String {
    let mut stream = TcpStream::connect(address).await.unwrap();
    stream.write_all(command.as_bytes()).await.unwrap();
    stream.write_all(b"\n").await.unwrap();

    let mut response = String::new();
    timeout(Duration::from_secs(5), stream.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();
    response
}

#[tokio::test]
async fn test_getdest_reports_pool_contents() {
    let (address, pool, cancel) = start_admin().await;

    let dest = Destination::parse("127.0.0.1:2101").unwrap();
    pool.register(&dest);

    let response = send_command(&address, "getdest").await;
    let parsed: serde_json::Value = serde_json::from_str(response.trim_end()).unwrap();
    assert_eq!(parsed["registered"][0], "127.0.0.1:2101");
    assert_eq!(parsed["active"], serde_json::json!([]));

    cancel.cancel();
}

#[tokio::test]
async fn test_putdest_starts_writer_and_registers() {
    let (address, pool, cancel) = start_admin().await;

    let response = send_command(&address, "putdest 127.0.0.1:2103").await;
    assert_eq!(response, "Registered destination: 127.0.0.1:2103\n");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !pool.is_registered("127.0.0.1:2103") {
        assert!(
            tokio::time::Instant::now() < deadline,
            "destination never registered"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let listing = send_command(&address, "getdest").await;
    let parsed: serde_json::Value = serde_json::from_str(listing.trim_end()).unwrap();
    assert_eq!(parsed["registered"][0], "127.0.0.1:2103");

    cancel.cancel();
}

#[tokio::test]
async fn test_putdest_rejects_malformed_destination() {
    let (address, pool, cancel) = start_admin().await;

    let response = send_command(&address, "putdest not-a-destination").await;
    assert!(response.contains("not valid"));
    assert!(pool.registered_names().is_empty());

    cancel.cancel();
}

#[tokio::test]
async fn test_putdest_requires_parameter() {
    let (address, _pool, cancel) = start_admin().await;
    let response = send_command(&address, "putdest").await;
    assert_eq!(response, "Must provide destination\n");
    cancel.cancel();
}

#[tokio::test]
async fn test_deldest_unregisters() {
    let (address, pool, cancel) = start_admin().await;

    let dest = Destination::parse("127.0.0.1:2101").unwrap();
    pool.register(&dest);
    pool.add_conn(&dest);

    let response = send_command(&address, "deldest 127.0.0.1:2101").await;
    assert_eq!(response, "Unregistered destination: 127.0.0.1:2101\n");
    assert!(!pool.is_registered("127.0.0.1:2101"));
    assert!(!pool.has_conn("127.0.0.1:2101"));

    cancel.cancel();
}

#[tokio::test]
async fn test_unknown_command() {
    let (address, _pool, cancel) = start_admin().await;
    let response = send_command(&address, "frobdest 127.0.0.1:2101").await;
    assert_eq!(response, "Not a command: frobdest\n");
    cancel.cancel();
}
