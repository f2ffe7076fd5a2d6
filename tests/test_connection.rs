mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{BrokenRenderer, RawResponse, SwitchableSource, cow_page};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
use wisecow::fortune::{ArtRenderer, BuiltinCow, BuiltinFortunes, FortunePage, TextSource};
use wisecow::http::connection::{Connection, ConnectionOutcome, ConnectionSettings};
use wisecow::http::response::StatusCode;

fn settings() -> ConnectionSettings {
    ConnectionSettings {
        max_request_line: 1024,
        read_timeout: Duration::from_secs(5),
        generate_timeout: Duration::from_secs(5),
        write_timeout: Duration::from_secs(5),
        linger: Duration::from_millis(200),
    }
}

fn spawn_connection<T, R>(
    page: FortunePage<T, R>,
    settings: ConnectionSettings,
) -> (DuplexStream, tokio::task::JoinHandle<anyhow::Result<ConnectionOutcome>>)
where
    T: TextSource + 'static,
    R: ArtRenderer + 'static,
{
    let (client, server) = duplex(64 * 1024);
    let conn = Connection::new(server, Arc::new(page), settings);
    (client, tokio::spawn(conn.run()))
}

#[tokio::test]
async fn test_serves_one_response() {
    let (mut client, task) = spawn_connection(cow_page(SwitchableSource::new(true)), settings());

    client.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();
    let mut bytes = Vec::new();
    client.read_to_end(&mut bytes).await.unwrap();
    drop(client);

    let response = RawResponse::parse(&bytes);
    response.assert_well_formed();
    assert!(response.body_str().contains("Fortune number 0"));
    assert!(response.body_str().contains("(oo)"));

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        ConnectionOutcome::Served {
            status: StatusCode::Ok,
            content_length: response.body.len(),
            bytes: bytes.len(),
        }
    );
}

#[tokio::test]
async fn test_any_line_gets_same_treatment() {
    let lines: [&[u8]; 3] = [b"POST /anything HTTP/1.0\r\n", b"hello cow\n", b"\n"];
    for line in lines {
        let (mut client, task) =
            spawn_connection(cow_page(SwitchableSource::new(true)), settings());

        client.write_all(line).await.unwrap();
        let mut bytes = Vec::new();
        client.read_to_end(&mut bytes).await.unwrap();
        drop(client);

        RawResponse::parse(&bytes).assert_well_formed();
        assert!(task.await.unwrap().is_ok());
    }
}

#[tokio::test]
async fn test_no_request_writes_nothing() {
    let source = SwitchableSource::new(true);
    let calls = source.calls.clone();
    let (mut client, task) = spawn_connection(cow_page(source), settings());

    client.shutdown().await.unwrap();
    let mut bytes = Vec::new();
    client.read_to_end(&mut bytes).await.unwrap();

    assert!(bytes.is_empty());
    assert_eq!(task.await.unwrap().unwrap(), ConnectionOutcome::NoRequest);
    // No generation work for a connection without a request
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_source_failure_writes_nothing() {
    let (mut client, task) = spawn_connection(cow_page(SwitchableSource::new(false)), settings());

    client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
    let mut bytes = Vec::new();
    client.read_to_end(&mut bytes).await.unwrap();
    drop(client);

    assert!(bytes.is_empty());
    let err = task.await.unwrap().unwrap_err();
    assert!(format!("{:#}", err).contains("command not found"));
}

#[tokio::test]
async fn test_renderer_failure_writes_nothing() {
    let page = FortunePage::new(BuiltinFortunes::default(), BrokenRenderer);
    let (mut client, task) = spawn_connection(page, settings());

    client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
    let mut bytes = Vec::new();
    client.read_to_end(&mut bytes).await.unwrap();
    drop(client);

    assert!(bytes.is_empty());
    assert!(task.await.unwrap().is_err());
}

#[tokio::test]
async fn test_read_timeout() {
    let mut settings = settings();
    settings.read_timeout = Duration::from_millis(100);
    settings.linger = Duration::ZERO;
    let (mut client, task) = spawn_connection(cow_page(SwitchableSource::new(true)), settings);

    let err = task.await.unwrap().unwrap_err();
    assert!(err.to_string().contains("timed out waiting for request line"));

    let mut bytes = Vec::new();
    client.read_to_end(&mut bytes).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_generate_timeout() {
    struct SlowSource;

    impl TextSource for SlowSource {
        async fn next(&self) -> anyhow::Result<Vec<u8>> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(b"too late".to_vec())
        }
    }

    let mut settings = settings();
    settings.generate_timeout = Duration::from_millis(100);
    let (mut client, task) =
        spawn_connection(FortunePage::new(SlowSource, BuiltinCow::default()), settings);

    client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
    let mut bytes = Vec::new();
    client.read_to_end(&mut bytes).await.unwrap();
    drop(client);

    assert!(bytes.is_empty());
    let err = task.await.unwrap().unwrap_err();
    assert!(err.to_string().contains("timed out generating fortune"));
}

#[tokio::test]
async fn test_request_line_too_long() {
    let mut settings = settings();
    settings.max_request_line = 32;
    let (mut client, task) = spawn_connection(cow_page(SwitchableSource::new(true)), settings);

    client.write_all(&[b'a'; 100]).await.unwrap();
    let mut bytes = Vec::new();
    client.read_to_end(&mut bytes).await.unwrap();
    drop(client);

    assert!(bytes.is_empty());
    assert!(task.await.unwrap().is_err());
}

#[tokio::test]
async fn test_multibyte_content_length() {
    let page = FortunePage::new(
        BuiltinFortunes::new(vec!["Grüße, ☕ und 🐄".to_string()]),
        BuiltinCow::default(),
    );
    let (mut client, task) = spawn_connection(page, settings());

    client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
    let mut bytes = Vec::new();
    client.read_to_end(&mut bytes).await.unwrap();
    drop(client);

    let response = RawResponse::parse(&bytes);
    response.assert_well_formed();
    assert!(response.body_str().contains("🐄"));
    assert!(response.body.len() > response.body_str().chars().count());
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_write_timeout_when_client_stops_reading() {
    let mut settings = settings();
    settings.write_timeout = Duration::from_millis(100);
    settings.linger = Duration::from_millis(50);

    // The pipe holds far less than one response, so the write stalls
    let (mut client, server) = duplex(64);
    let conn = Connection::new(server, Arc::new(cow_page(SwitchableSource::new(true))), settings);
    let task = tokio::spawn(conn.run());

    client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();

    let err = task.await.unwrap().unwrap_err();
    assert!(err.to_string().contains("timed out writing response"));
    drop(client);
}
