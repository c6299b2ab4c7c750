//! Lookup client retry policy against a scripted local HTTP responder

use certaudit::{AuditError, CensysClient, CertificateLookup, LookupCredentials, RetryPolicy};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Serves one scripted status per connection and records each request head
struct Responder {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl Responder {
    async fn start(script: Vec<(u16, &'static str)>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);

        tokio::spawn(async move {
            for (status, body) in script {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };

                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                if let Ok(mut log) = log.lock() {
                    log.push(String::from_utf8_lossy(&head).into_owned());
                }

                let response = format!(
                    "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Ok(Self { addr, requests })
    }

    fn endpoint(&self) -> String {
        format!("http://{}/api/v2/certificates", self.addr)
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

fn client(endpoint: String, max_attempts: u32) -> certaudit::Result<CensysClient> {
    CensysClient::new(
        endpoint,
        LookupCredentials::new("id", "secret"),
        RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(10),
        },
    )
}

#[tokio::test]
async fn test_success_sends_auth_and_accept_headers() -> TestResult {
    let responder = Responder::start(vec![(200, r#"{"parsed":{}}"#)]).await?;
    let client = client(responder.endpoint(), 3)?;

    let body = client.certificate_json("abcd").await?;

    assert_eq!(body, r#"{"parsed":{}}"#);
    let requests = responder.requests();
    assert_eq!(requests.len(), 1);
    let head = requests[0].to_ascii_lowercase();
    assert!(head.starts_with("get /api/v2/certificates/abcd "));
    // base64("id:secret")
    assert!(head.contains(&"authorization: basic aWQ6c2VjcmV0".to_ascii_lowercase()));
    assert!(head.contains("accept: application/json"));
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_is_retried_until_success() -> TestResult {
    let responder = Responder::start(vec![(429, ""), (429, ""), (200, "{}")]).await?;
    let client = client(responder.endpoint(), 3)?;

    assert_eq!(client.certificate_json("abcd").await?, "{}");
    assert_eq!(responder.requests().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_gives_up_after_max_attempts() -> TestResult {
    let responder = Responder::start(vec![(429, ""), (429, ""), (429, ""), (200, "{}")]).await?;
    let client = client(responder.endpoint(), 3)?;

    let result = client.certificate_json("abcd").await;

    assert!(matches!(
        result,
        Err(AuditError::LookupStatus {
            status: 429,
            attempts: 3
        })
    ));
    assert_eq!(responder.requests().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_other_failures_are_not_retried() -> TestResult {
    let responder = Responder::start(vec![(422, r#"{"error":"invalid hash"}"#), (200, "{}")]).await?;
    let client = client(responder.endpoint(), 3)?;

    let result = client.certificate_json("not-a-hash").await;

    assert!(matches!(
        result,
        Err(AuditError::LookupStatus {
            status: 422,
            attempts: 1
        })
    ));
    assert_eq!(responder.requests().len(), 1);
    Ok(())
}
