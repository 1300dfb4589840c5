//! HyperTransport tests against a local raw TCP server.

use stacknet::base::neterror::NetError;
use stacknet::config::TransportConfig;
use stacknet::cookies::CookieJar;
use stacknet::http::multipart::Form;
use stacknet::http::{LogicalRequest, ProtocolVersion};
use stacknet::transport::TransportAdapter;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Serve one canned response per connection, reporting each raw request.
async fn serve(response: &'static str) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                let _ = tx.send(request);
                let _ = socket.write_all(response.as_bytes()).await;
            });
        }
    });

    (base_url, rx)
}

/// Read headers plus a Content-Length body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}

#[tokio::test]
async fn test_get_over_http1() {
    let (base_url, mut requests) = serve(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
    )
    .await;

    let adapter = TransportAdapter::with_hyper(TransportConfig::default().user_agent("stacknet-test"));
    let resp = adapter
        .execute(
            LogicalRequest::get(format!("{}/greet", base_url))
                .unwrap()
                .header("X-Trace", "1")
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.status_message(), "OK");
    assert_eq!(resp.protocol_version(), ProtocolVersion::HTTP_1_1);
    assert_eq!(resp.content_length(), Some(5));
    assert_eq!(resp.text().await.unwrap(), "hello");

    let raw = requests.recv().await.unwrap().to_ascii_lowercase();
    assert!(raw.starts_with("get /greet http/1.1\r\n"));
    assert!(raw.contains("x-trace: 1\r\n"));
    assert!(raw.contains("user-agent: stacknet-test\r\n"));
}

#[tokio::test]
async fn test_multipart_post_over_http1() {
    let (base_url, mut requests) =
        serve("HTTP/1.1 201 Created\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;

    let form = Form::new()
        .text("name", "Alice")
        .unwrap()
        .file("photo.jpg", "image/jpeg", vec![1u8; 17])
        .unwrap()
        .build()
        .unwrap();
    let boundary = form.boundary().to_string();
    let length = form.content_length();

    let adapter = TransportAdapter::with_hyper(TransportConfig::default());
    let resp = adapter
        .execute(
            LogicalRequest::post(format!("{}/upload", base_url))
                .unwrap()
                .multipart(form),
        )
        .await
        .unwrap();
    assert_eq!(resp.status_code(), 201);

    let raw = requests.recv().await.unwrap();
    assert!(raw.contains(&format!("multipart/form-data; boundary={}", boundary)));
    assert!(raw.to_ascii_lowercase().contains(&format!("content-length: {}\r\n", length)));
    assert!(raw.contains("filename=\"photo.jpg\""));
}

#[tokio::test]
async fn test_set_cookie_reaches_jar() {
    let (base_url, _requests) = serve(
        "HTTP/1.1 200 OK\r\nSet-Cookie: a=1; Max-Age=60\r\nSet-Cookie: b=2\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;

    let jar = Arc::new(CookieJar::new());
    let adapter = TransportAdapter::with_hyper(TransportConfig::default()).cookie_jar(jar.clone());
    adapter
        .execute(LogicalRequest::get(format!("{}/", base_url)).unwrap())
        .await
        .unwrap();

    assert_eq!(jar.len(), 2);
    assert_eq!(jar.persistent_cookies().len(), 1);
}

#[tokio::test]
async fn test_connection_refused_is_retryable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let adapter = TransportAdapter::with_hyper(TransportConfig::default());
    let err = adapter
        .execute(LogicalRequest::get(format!("http://{}/", addr)).unwrap())
        .await
        .unwrap_err();
    assert!(err.is_retryable(), "unexpected error: {:?}", err);
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((socket, _)) = listener.accept().await {
            // Accept and never answer.
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        }
    });

    let config = TransportConfig::default()
        .read_timeout(Duration::from_millis(100))
        .write_timeout(Duration::from_millis(100));
    let adapter = TransportAdapter::with_hyper(config);
    let err = adapter
        .execute(LogicalRequest::get(format!("http://{}/", addr)).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, NetError::ConnectionTimedOut));
}

#[tokio::test]
async fn test_https_refused_before_dispatch() {
    let adapter = TransportAdapter::with_hyper(TransportConfig::default());
    let err = adapter
        .execute(LogicalRequest::get("https://example.com/").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, NetError::InvalidUrl));
}
