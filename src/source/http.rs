use super::ClusterSource;
use crate::error::{Error, Result};
use crate::types::ClusterResponse;
use async_trait::async_trait;
use log::debug;
use std::time::Duration;
use tokio::task;

const CLUSTER_PATH: &str = "/admin/cluster";

/// Talks to the cluster-management endpoint over HTTP.
///
/// `ureq` is blocking, so every request runs on tokio's blocking pool.
pub struct HttpClusterSource {
    agent: ureq::Agent,
    url: String,
}

impl HttpClusterSource {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        let url = format!("{}{}", endpoint.trim_end_matches('/'), CLUSTER_PATH);
        Self { agent, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, method: &'static str) -> Result<String> {
        let agent = self.agent.clone();
        let url = self.url.clone();
        task::spawn_blocking(move || {
            debug!("{} {}", method, url);
            let result = agent
                .request(method, &url)
                .set("Accept", "application/json")
                .call();
            match result {
                Ok(resp) => resp.into_string().map_err(|e| Error::Transport {
                    url: url.clone(),
                    message: e.to_string(),
                }),
                Err(ureq::Error::Status(status, _)) => Err(Error::Status {
                    method,
                    url: url.clone(),
                    status,
                }),
                Err(ureq::Error::Transport(t)) => Err(Error::Transport {
                    url: url.clone(),
                    message: t.to_string(),
                }),
            }
        })
        .await?
    }
}

#[async_trait]
impl ClusterSource for HttpClusterSource {
    async fn fetch(&self) -> Result<ClusterResponse> {
        let body = self.send("GET").await?;
        ClusterResponse::from_json(&body)
    }

    async fn clear_plan(&self) -> Result<()> {
        self.send("DELETE").await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StagedCluster;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serves one canned response and reports the request line it saw.
    async fn serve_once(status: &'static str, body: &'static str) -> (SocketAddr, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let request = String::from_utf8_lossy(&buf);
            let line = request.lines().next().unwrap_or_default().to_string();
            let _ = tx.send(line);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        });
        (addr, rx)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetches_and_decodes_cluster() {
        let (addr, seen) = serve_once(
            "200 OK",
            r#"{"cluster":{"current":[{"name":"a","status":"valid"}],"staged":"legacy"}}"#,
        )
        .await;
        let source = HttpClusterSource::new(&format!("http://{}/", addr), Duration::from_secs(5));
        assert_eq!(source.url(), format!("http://{}/admin/cluster", addr));

        let snapshot = source.fetch().await.unwrap().into_snapshot().unwrap();

        assert_eq!(snapshot.current.len(), 1);
        assert_eq!(snapshot.staged, StagedCluster::Legacy);
        assert_eq!(seen.await.unwrap(), "GET /admin/cluster HTTP/1.1");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn clear_plan_sends_delete() {
        let (addr, seen) = serve_once("200 OK", "{}").await;
        let source = HttpClusterSource::new(&format!("http://{}", addr), Duration::from_secs(5));

        source.clear_plan().await.unwrap();

        assert_eq!(seen.await.unwrap(), "DELETE /admin/cluster HTTP/1.1");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn error_status_is_reported() {
        let (addr, _seen) = serve_once("503 Service Unavailable", "{}").await;
        let source = HttpClusterSource::new(&format!("http://{}", addr), Duration::from_secs(5));

        match source.fetch().await {
            Err(err @ Error::Status { status: 503, .. }) => assert!(err.is_retryable()),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn refused_connection_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let source = HttpClusterSource::new(&format!("http://{}", addr), Duration::from_secs(5));

        assert!(matches!(source.fetch().await, Err(Error::Transport { .. })));
    }
}
