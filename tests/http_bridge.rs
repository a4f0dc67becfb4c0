use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use temperature_bridge::{
    externals::{host::HostModule, sensor_http::services::HttpTemperatureService},
    internals::core::{
        cache::ReadingCache,
        poller::Poller,
        ports::{FetchError, NotificationSink, QueryError, TemperatureSource},
        system::spawn_core_system,
    },
    models::TemperatureReading,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::watch,
    time::Instant,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

#[derive(Clone)]
enum Reply {
    Answer { status: u16, body: String },
    Hang,
}

/// Minimal HTTP/1.1 server answering every request with the current reply.
struct SensorServer {
    url: reqwest::Url,
    reply: Arc<Mutex<Reply>>,
    requests_seen: watch::Receiver<usize>,
}

impl SensorServer {
    async fn start(status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let reply = Arc::new(Mutex::new(Reply::Answer {
            status,
            body: body.to_string(),
        }));

        let (tx_requests_seen, requests_seen) = watch::channel(0);
        let tx_requests_seen = Arc::new(tx_requests_seen);

        let shared = reply.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let reply = shared.lock().unwrap().clone();
                tokio::spawn(serve(stream, reply, tx_requests_seen.clone()));
            }
        });

        Self {
            url: format!("http://{}/temperature", addr).parse().unwrap(),
            reply,
            requests_seen,
        }
    }

    /// Wait until at least `count` requests have been read in full.
    async fn wait_for_requests(&self, count: usize) {
        let mut requests_seen = self.requests_seen.clone();
        tokio::time::timeout(
            Duration::from_secs(5),
            requests_seen.wait_for(|seen| *seen >= count),
        )
        .await
        .expect("Server did not see enough requests")
        .unwrap();
    }

    fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    fn service(&self) -> HttpTemperatureService {
        HttpTemperatureService::new(self.url.clone(), Duration::from_secs(2)).unwrap()
    }
}

async fn serve(mut stream: TcpStream, reply: Reply, requests_seen: Arc<watch::Sender<usize>>) {
    let mut request = Vec::new();
    let mut buffer = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buffer[..n]),
        }
    }

    requests_seen.send_modify(|seen| *seen += 1);

    match reply {
        Reply::Answer { status, body } => {
            let response = format!(
                "HTTP/1.1 {} Status\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    values: Mutex<Vec<f64>>,
}

impl NotificationSink for RecordingSink {
    fn on_value_changed(&self, reading: &TemperatureReading) {
        self.values.lock().unwrap().push(reading.value());
    }
}

#[tokio::test]
async fn test_fetch_returns_exact_value() {
    let server = SensorServer::start(200, "22.3").await;
    let reading = server.service().fetch().await.expect("Fetch should succeed");
    assert_eq!(reading.value(), 22.3);

    server.set_reply(Reply::Answer {
        status: 200,
        body: "-7.125\n".to_string(),
    });
    let reading = server.service().fetch().await.expect("Fetch should succeed");
    assert_eq!(reading.value(), -7.125);

    server.set_reply(Reply::Answer {
        status: 200,
        body: "21.5 C".to_string(),
    });
    let reading = server.service().fetch().await.expect("Fetch should succeed");
    assert_eq!(reading.value(), 21.5);
}

#[tokio::test]
async fn test_fetch_rejects_non_numeric_bodies() {
    let server = SensorServer::start(200, "abc").await;
    for body in ["abc", "", "NaN", "{\"temperature\": 21.5}"] {
        server.set_reply(Reply::Answer {
            status: 200,
            body: body.to_string(),
        });
        assert!(
            matches!(server.service().fetch().await, Err(FetchError::Parse(_))),
            "expected {:?} to be rejected",
            body
        );
    }
}

#[tokio::test]
async fn test_fetch_rejects_error_status() {
    let server = SensorServer::start(503, "21.0").await;
    assert_eq!(
        server.service().fetch().await.unwrap_err(),
        FetchError::Status(503)
    );
}

#[tokio::test]
async fn test_fetch_reports_refused_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let service = HttpTemperatureService::new(
        format!("http://{}/temperature", addr).parse().unwrap(),
        Duration::from_secs(2),
    )
    .unwrap();
    assert!(matches!(
        service.fetch().await,
        Err(FetchError::Network(_))
    ));
}

#[tokio::test]
async fn test_fetch_gives_up_on_hung_endpoint() {
    let server = SensorServer::start(200, "21.0").await;
    server.set_reply(Reply::Hang);
    let service =
        HttpTemperatureService::new(server.url.clone(), Duration::from_millis(200)).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), service.fetch())
        .await
        .expect("Request timeout was not applied");
    assert!(matches!(result, Err(FetchError::Network(_))));
}

#[tokio::test]
async fn test_failed_poll_leaves_cache_untouched() {
    let server = SensorServer::start(200, "20.5").await;
    let cache = ReadingCache::new();
    let sink = Arc::new(RecordingSink::default());
    let poller = Poller::new(server.service(), cache.clone(), sink.clone());

    poller.tick().await.unwrap();
    server.set_reply(Reply::Answer {
        status: 200,
        body: "garbage".to_string(),
    });
    assert!(poller.tick().await.is_err());

    assert_eq!(cache.get().await.map(|r| r.value()), Some(20.5));
    assert_eq!(*sink.values.lock().unwrap(), vec![20.5]);
}

#[tokio::test]
async fn test_end_to_end_numeric_reading() {
    let server = SensorServer::start(200, "22.3").await;
    let tracker = TaskTracker::new();
    let token = CancellationToken::new();
    let host = HostModule::initialize("Living Room");
    let mut rx_value_changed = host.host_handle.subscribe();

    let system = spawn_core_system(
        &tracker,
        token.clone(),
        server.service(),
        host.notification_adapter,
        host.read_request_adapter,
        Some(Duration::from_millis(50)),
    );

    let pushed = tokio::time::timeout(Duration::from_secs(5), rx_value_changed.recv())
        .await
        .expect("No value change was pushed")
        .unwrap();
    assert_eq!(pushed.value(), 22.3);
    assert_eq!(system.cache.get().await.map(|r| r.value()), Some(22.3));
    assert_eq!(host.host_handle.on_demand_read().await.unwrap().value(), 22.3);

    token.cancel();
    tracker.close();
    tracker.wait().await;
}

#[tokio::test]
async fn test_end_to_end_malformed_reading() {
    let server = SensorServer::start(200, "not-a-number").await;
    let tracker = TaskTracker::new();
    let token = CancellationToken::new();
    let host = HostModule::initialize("Living Room");
    let mut rx_value_changed = host.host_handle.subscribe();

    let system = spawn_core_system(
        &tracker,
        token.clone(),
        server.service(),
        host.notification_adapter,
        host.read_request_adapter,
        Some(Duration::from_millis(20)),
    );

    assert_eq!(
        host.host_handle.on_demand_read().await.unwrap_err(),
        QueryError::CommunicationFailure
    );
    // The on-demand read plus at least two failing poll ticks.
    server.wait_for_requests(3).await;
    assert!(system.cache.get().await.is_none());
    assert!(rx_value_changed.try_recv().is_err());

    token.cancel();
    tracker.close();
    tracker.wait().await;
}

#[tokio::test]
async fn test_concurrent_reads_of_hung_endpoint_each_time_out_once() {
    let server = SensorServer::start(200, "21.0").await;
    server.set_reply(Reply::Hang);
    let timeout = Duration::from_millis(300);
    let tracker = TaskTracker::new();
    let token = CancellationToken::new();
    let host = HostModule::initialize("Living Room");

    let _system = spawn_core_system(
        &tracker,
        token.clone(),
        HttpTemperatureService::new(server.url.clone(), timeout).unwrap(),
        host.notification_adapter,
        host.read_request_adapter,
        None,
    );

    let started = Instant::now();
    let handle = &host.host_handle;
    let results = tokio::join!(
        handle.on_demand_read(),
        handle.on_demand_read(),
        handle.on_demand_read(),
        handle.on_demand_read(),
    );
    let elapsed = started.elapsed();

    for result in [results.0, results.1, results.2, results.3] {
        assert_eq!(result.unwrap_err(), QueryError::CommunicationFailure);
    }
    // Queued one after another these would need four timeouts.
    assert!(elapsed < timeout * 3, "concurrent reads took {:?}", elapsed);

    token.cancel();
    tracker.close();
    tracker.wait().await;
}
