//! Line-delimited JSON custody host.
//!
//! Lets a custody process drive the dispatcher over a pipe. Each input line
//! is one request:
//!
//! ```text
//! {"type":"key_request","request":{"id":7,"creator":"warden1...","key_type":1}}
//! {"type":"sign_request","request":{"id":8,"key_id":3,"data_for_signing":"AAEC"}}
//! ```
//!
//! Each resolution is written as one output line, in completion order:
//!
//! ```text
//! {"status":"fulfilled","type":"key_request","id":7,"result":"YWJjZA=="}
//! {"status":"rejected","type":"sign_request","id":8,"reason":"policy violation"}
//! ```

use std::sync::Arc;

use anyhow::Context;
use keychain_bridge::encoding::base64_bytes;
use keychain_bridge::{Continuation, KeyRequest, RequestHandler, ResolveError, SignRequest};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// One request read from the custody process.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "request", rename_all = "snake_case")]
pub enum InboundRequest {
    KeyRequest(KeyRequest),
    SignRequest(SignRequest),
}

impl InboundRequest {
    fn label(&self) -> (&'static str, u64) {
        match self {
            InboundRequest::KeyRequest(request) => ("key_request", request.id),
            InboundRequest::SignRequest(request) => ("sign_request", request.id),
        }
    }
}

/// One resolution written back to the custody process.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutboundResolution {
    Fulfilled {
        #[serde(rename = "type")]
        kind: String,
        id: u64,
        #[serde(with = "base64_bytes")]
        result: Vec<u8>,
    },
    Rejected {
        #[serde(rename = "type")]
        kind: String,
        id: u64,
        reason: String,
    },
}

/// Continuation that queues its resolution for the output writer.
struct LineContinuation {
    kind: &'static str,
    id: u64,
    lines: mpsc::UnboundedSender<OutboundResolution>,
}

impl LineContinuation {
    fn deliver(self, resolution: OutboundResolution) -> Result<(), ResolveError> {
        self.lines
            .send(resolution)
            .map_err(|_| ResolveError::Undeliverable("output closed".to_string()))
    }
}

impl Continuation for LineContinuation {
    fn fulfil(self: Box<Self>, payload: Vec<u8>) -> Result<(), ResolveError> {
        let resolution = OutboundResolution::Fulfilled {
            kind: self.kind.to_string(),
            id: self.id,
            result: payload,
        };
        self.deliver(resolution)
    }

    fn reject(self: Box<Self>, reason: String) -> Result<(), ResolveError> {
        let resolution = OutboundResolution::Rejected {
            kind: self.kind.to_string(),
            id: self.id,
            reason,
        };
        self.deliver(resolution)
    }
}

/// Counts for one run of the host.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HostSummary {
    /// Requests handed to the dispatcher
    pub dispatched: usize,
    /// Input lines that were not valid requests
    pub skipped: usize,
}

/// Reads requests, dispatches each on its own task, writes resolutions.
pub struct StdioHost {
    handler: Arc<dyn RequestHandler>,
}

impl StdioHost {
    pub fn new(handler: Arc<dyn RequestHandler>) -> Self {
        Self { handler }
    }

    /// Run until `input` is exhausted and every dispatched request has been
    /// resolved.
    ///
    /// A read error stops intake, but requests already dispatched are still
    /// resolved and written before the error is returned.
    pub async fn run<R, W>(&self, mut input: R, output: W) -> anyhow::Result<HostSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (lines_tx, lines_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_resolutions(lines_rx, output));

        let mut summary = HostSummary::default();
        let mut tasks = JoinSet::new();
        let mut line = Vec::new();

        let intake = loop {
            line.clear();
            match input.read_until(b'\n', &mut line).await {
                Ok(0) => break Ok(()),
                Ok(_) => {}
                Err(e) => break Err(e),
            }

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let inbound: InboundRequest = match serde_json::from_slice(&line) {
                Ok(inbound) => inbound,
                Err(e) => {
                    warn!(error = %e, "skipping malformed request line");
                    summary.skipped += 1;
                    continue;
                }
            };

            let (kind, id) = inbound.label();
            debug!(kind, id, "request received");

            let continuation = Box::new(LineContinuation {
                kind,
                id,
                lines: lines_tx.clone(),
            });
            let handler = Arc::clone(&self.handler);

            tasks.spawn(async move {
                match inbound {
                    InboundRequest::KeyRequest(request) => {
                        handler.handle_key_request(request, continuation).await
                    }
                    InboundRequest::SignRequest(request) => {
                        handler.handle_sign_request(request, continuation).await
                    }
                }
            });
            summary.dispatched += 1;
        };

        if let Err(e) = &intake {
            error!(error = %e, in_flight = tasks.len(), "reading requests");
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "request task failed");
            }
        }

        drop(lines_tx);
        let written = writer.await;

        intake.context("reading requests")?;
        written??;

        Ok(summary)
    }
}

/// Write resolutions as JSON lines until every sender is gone.
async fn write_resolutions<W>(
    mut lines: mpsc::UnboundedReceiver<OutboundResolution>,
    mut output: W,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(resolution) = lines.recv().await {
        let mut line = serde_json::to_vec(&resolution)?;
        line.push(b'\n');

        if let Err(e) = output.write_all(&line).await {
            error!(error = %e, "writing resolution");
            return Err(e.into());
        }
        output.flush().await?;
    }

    output.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context as TaskContext, Poll};
    use std::time::Duration;

    use keychain_bridge::client::MockReply;
    use keychain_bridge::{Dispatcher, MockDecisionClient, INTERNAL_ERROR_REASON};
    use tokio::io::{AsyncRead, AsyncReadExt, BufReader, ReadBuf};

    /// Input that fails once its preceding bytes are consumed.
    struct BrokenInput;

    impl AsyncRead for BrokenInput {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "custody pipe closed")))
        }
    }

    async fn read_resolutions(mut reader: tokio::io::DuplexStream) -> Vec<OutboundResolution> {
        let mut text = String::new();
        reader.read_to_string(&mut text).await.unwrap();
        text.lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn host(client: MockDecisionClient) -> StdioHost {
        StdioHost::new(Arc::new(Dispatcher::new(Arc::new(client))))
    }

    async fn run_host(host: &StdioHost, input: &str) -> (HostSummary, Vec<OutboundResolution>) {
        run_host_bytes(host, input.as_bytes()).await
    }

    async fn run_host_bytes(
        host: &StdioHost,
        input: &[u8],
    ) -> (HostSummary, Vec<OutboundResolution>) {
        let (writer, reader) = tokio::io::duplex(64 * 1024);
        let summary = host.run(BufReader::new(input), writer).await.unwrap();

        (summary, read_resolutions(reader).await)
    }

    #[tokio::test]
    async fn test_resolves_each_request() {
        let host = host(
            MockDecisionClient::new()
                .with_key_reply(MockReply::Approve(b"abcd".to_vec()))
                .with_signature_reply(MockReply::Reject("policy violation".into())),
        );

        let input = concat!(
            r#"{"type":"key_request","request":{"id":1,"creator":"warden1x"}}"#,
            "\n",
            r#"{"type":"sign_request","request":{"id":2,"key_id":1,"data_for_signing":"AAEC"}}"#,
            "\n",
        );

        let (summary, mut resolutions) = run_host(&host, input).await;
        resolutions.sort_by_key(|r| match r {
            OutboundResolution::Fulfilled { id, .. } | OutboundResolution::Rejected { id, .. } => *id,
        });

        assert_eq!(summary, HostSummary { dispatched: 2, skipped: 0 });
        assert_eq!(
            resolutions,
            vec![
                OutboundResolution::Fulfilled {
                    kind: "key_request".to_string(),
                    id: 1,
                    result: b"abcd".to_vec(),
                },
                OutboundResolution::Rejected {
                    kind: "sign_request".to_string(),
                    id: 2,
                    reason: "policy violation".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_skips_malformed_lines() {
        let host = host(MockDecisionClient::new());

        let input = concat!(
            "this is not json\n",
            "\n",
            r#"{"type":"mystery_request","request":{"id":1}}"#,
            "\n",
            r#"{"type":"key_request","request":{"id":3}}"#,
            "\n",
        );

        let (summary, resolutions) = run_host(&host, input).await;

        assert_eq!(summary, HostSummary { dispatched: 1, skipped: 2 });
        assert_eq!(resolutions.len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_writes_generic_reason() {
        let host = host(
            MockDecisionClient::new().with_key_reply(MockReply::Timeout(Duration::from_secs(5))),
        );

        let (_, resolutions) =
            run_host(&host, "{\"type\":\"key_request\",\"request\":{\"id\":9}}\n").await;

        assert_eq!(
            resolutions,
            vec![OutboundResolution::Rejected {
                kind: "key_request".to_string(),
                id: 9,
                reason: INTERNAL_ERROR_REASON.to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_waits_for_slow_requests_before_returning() {
        let host = host(
            MockDecisionClient::new()
                .with_key_responder(|id| MockReply::Approve(vec![id as u8]))
                .with_delay(Duration::from_millis(50)),
        );

        let input: String = (1..=5)
            .map(|id| format!("{{\"type\":\"key_request\",\"request\":{{\"id\":{id}}}}}\n"))
            .collect();

        let (summary, resolutions) = run_host(&host, &input).await;

        assert_eq!(summary.dispatched, 5);
        assert_eq!(resolutions.len(), 5);
    }

    #[tokio::test]
    async fn test_non_utf8_line_is_skipped() {
        let host = host(
            MockDecisionClient::new()
                .with_key_responder(|id| MockReply::Approve(vec![id as u8]))
                .with_delay(Duration::from_millis(100)),
        );

        let mut input = Vec::new();
        input.extend_from_slice(b"{\"type\":\"key_request\",\"request\":{\"id\":1}}\n");
        input.extend_from_slice(b"\xff\xfe garbage\n");
        input.extend_from_slice(b"{\"type\":\"key_request\",\"request\":{\"id\":2}}\n");

        let (summary, mut resolutions) = run_host_bytes(&host, &input).await;
        resolutions.sort_by_key(|r| match r {
            OutboundResolution::Fulfilled { id, .. } | OutboundResolution::Rejected { id, .. } => *id,
        });

        assert_eq!(summary, HostSummary { dispatched: 2, skipped: 1 });
        assert_eq!(
            resolutions,
            vec![
                OutboundResolution::Fulfilled {
                    kind: "key_request".to_string(),
                    id: 1,
                    result: vec![1],
                },
                OutboundResolution::Fulfilled {
                    kind: "key_request".to_string(),
                    id: 2,
                    result: vec![2],
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_read_error_still_resolves_dispatched_requests() {
        let host = host(
            MockDecisionClient::new()
                .with_key_reply(MockReply::Approve(b"abcd".to_vec()))
                .with_delay(Duration::from_millis(100)),
        );

        let input = "{\"type\":\"key_request\",\"request\":{\"id\":4}}\n".as_bytes();
        let (writer, reader) = tokio::io::duplex(64 * 1024);

        let result = host
            .run(BufReader::new(input.chain(BrokenInput)), writer)
            .await;

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("custody pipe closed"));
        assert_eq!(
            read_resolutions(reader).await,
            vec![OutboundResolution::Fulfilled {
                kind: "key_request".to_string(),
                id: 4,
                result: b"abcd".to_vec(),
            }]
        );
    }
}
