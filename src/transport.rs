// 🔌 Transport collaborators - WebSocket push channel + HTTP submission
//
// Neither type interprets ledger data. The push channel hands raw text frames
// to whatever `MessageHandler` is registered, one at a time, in arrival
// order; the submission client reports accept/reject and nothing else.
//
// No reconnect: when the socket closes the session ends and the caller
// decides what to do.

use crate::config::ClientConfig;
use crate::dispatcher::MessageHandler;
use crate::error::{SubmissionError, TransportError};
use crate::expense::Expense;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// HANDLER REGISTRATION
// ============================================================================

/// Keeps the handler registered with a push channel.
///
/// `cancel()` or dropping the registration deregisters the handler: the
/// running session stops before the next frame is delivered.
#[derive(Debug)]
#[must_use = "dropping the registration ends the push session"]
pub struct HandlerRegistration {
    cancel: watch::Sender<bool>,
}

impl HandlerRegistration {
    pub fn cancel(self) {
        // Receiver gone means the session already ended
        let _ = self.cancel.send(true);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Server closed the socket or the stream ended
    ClosedByServer,
    /// Local teardown
    Deregistered,
}

// ============================================================================
// PUSH CHANNEL
// ============================================================================

pub struct PushChannel {
    url: Url,
    stream: WsStream,
    cancelled: watch::Receiver<bool>,
}

impl PushChannel {
    pub async fn connect(url: &Url) -> Result<(PushChannel, HandlerRegistration), TransportError> {
        let (stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", url, e)))?;

        info!(%url, status = %response.status(), "push channel connected");

        let (cancel, cancelled) = watch::channel(false);
        Ok((
            PushChannel {
                url: url.clone(),
                stream,
                cancelled,
            },
            HandlerRegistration { cancel },
        ))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Deliver frames to `handler` until the socket closes or the
    /// registration is cancelled.
    pub async fn run<H: MessageHandler>(mut self, handler: &mut H) -> Result<SessionEnd, TransportError> {
        loop {
            let frame = tokio::select! {
                frame = self.stream.next() => frame,
                _ = self.cancelled.changed() => {
                    info!(url = %self.url, "push handler deregistered");
                    // Best effort - we are leaving either way
                    let _ = self.stream.close(None).await;
                    return Ok(SessionEnd::Deregistered);
                }
            };

            match frame {
                Some(Ok(Message::Text(text))) => handler.on_message(&text),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => handler.on_message(&text),
                    Err(_) => warn!("dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    // tungstenite queues the pong itself
                    debug!("keepalive frame");
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(url = %self.url, ?frame, "push channel closed by server");
                    return Ok(SessionEnd::ClosedByServer);
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => return Err(TransportError::Closed(e.to_string())),
                None => {
                    info!(url = %self.url, "push channel stream ended");
                    return Ok(SessionEnd::ClosedByServer);
                }
            }
        }
    }
}

// ============================================================================
// SUBMISSION CLIENT
// ============================================================================

#[derive(Debug, Clone)]
pub struct SubmissionClient {
    http: reqwest::Client,
    url: Url,
}

impl SubmissionClient {
    pub fn new(url: Url) -> Self {
        SubmissionClient {
            http: reqwest::Client::new(),
            url,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, crate::error::ConfigError> {
        Ok(SubmissionClient::new(config.submit_url()?))
    }

    /// POST the expense; `Ok(())` only on a 2xx answer.
    ///
    /// The response body is ignored - the expense becomes visible locally
    /// when the server pushes it back.
    pub async fn submit(&self, expense: &Expense) -> Result<(), SubmissionError> {
        let response = self
            .http
            .post(self.url.clone())
            .json(expense)
            .send()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, "expense accepted");
            Ok(())
        } else {
            warn!(%status, "expense rejected");
            Err(SubmissionError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use futures_util::SinkExt;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<String>,
    }

    impl MessageHandler for Recorder {
        fn on_message(&mut self, raw: &str) {
            self.frames.push(raw.to_string());
        }
    }

    /// How the loopback server leaves after sending its frames
    enum Ending {
        Close,
        Reset,
        Hold,
    }

    async fn push_server(frames: Vec<Message>, ending: Ending) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            for frame in frames {
                ws.send(frame).await.unwrap();
            }
            match ending {
                Ending::Close => {
                    let _ = ws.close(None).await;
                    while let Some(Ok(_)) = ws.next().await {}
                }
                Ending::Reset => drop(ws),
                Ending::Hold => while let Some(Ok(_)) = ws.next().await {},
            }
        });

        Url::parse(&format!("ws://{}/ws", addr)).unwrap()
    }

    #[tokio::test]
    async fn test_frames_forwarded_in_order_until_close() {
        let url = push_server(
            vec![
                Message::Text("first".to_string()),
                Message::Ping(vec![1, 2, 3]),
                Message::Text("second".to_string()),
                Message::Binary(b"third".to_vec()),
                Message::Binary(vec![0xff, 0xfe, 0xfd]),
                Message::Pong(vec![4]),
                Message::Text("fourth".to_string()),
            ],
            Ending::Close,
        )
        .await;

        let (channel, _registration) = PushChannel::connect(&url).await.unwrap();
        let mut recorder = Recorder::default();
        let end = channel.run(&mut recorder).await.unwrap();

        assert_eq!(end, SessionEnd::ClosedByServer);
        assert_eq!(recorder.frames, vec!["first", "second", "third", "fourth"]);
    }

    #[tokio::test]
    async fn test_reset_without_close_is_an_error() {
        let url = push_server(vec![Message::Text("only".to_string())], Ending::Reset).await;

        let (channel, _registration) = PushChannel::connect(&url).await.unwrap();
        let mut recorder = Recorder::default();
        let end = channel.run(&mut recorder).await;

        assert!(matches!(end, Err(TransportError::Closed(_))));
        assert_eq!(recorder.frames, vec!["only"]);
    }

    #[tokio::test]
    async fn test_cancel_deregisters() {
        let url = push_server(Vec::new(), Ending::Hold).await;

        let (channel, registration) = PushChannel::connect(&url).await.unwrap();
        registration.cancel();

        let mut recorder = Recorder::default();
        assert_eq!(channel.run(&mut recorder).await.unwrap(), SessionEnd::Deregistered);
        assert!(recorder.frames.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_registration_deregisters() {
        let url = push_server(Vec::new(), Ending::Hold).await;

        let (channel, registration) = PushChannel::connect(&url).await.unwrap();
        drop(registration);

        let mut recorder = Recorder::default();
        assert_eq!(channel.run(&mut recorder).await.unwrap(), SessionEnd::Deregistered);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("ws://{}/ws", addr)).unwrap();
        let result = PushChannel::connect(&url).await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
    }

    async fn submission_server() -> Url {
        let router = Router::new()
            .route(
                "/addExpense",
                post(|Json(expense): Json<Expense>| async move {
                    assert_eq!(expense.submitter, "Ana");
                    Json(serde_json::json!({ "status": "success" }))
                }),
            )
            .route("/reject", post(|| async { StatusCode::BAD_REQUEST }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Url::parse(&format!("http://{}/", addr)).unwrap()
    }

    #[tokio::test]
    async fn test_submit_accepted_on_2xx() {
        let base = submission_server().await;
        let client = SubmissionClient::new(base.join("addExpense").unwrap());

        let result = client.submit(&Expense::new("Ana", "Coffee", 3.5, "Food")).await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_submit_rejected_on_error_status() {
        let base = submission_server().await;
        let client = SubmissionClient::new(base.join("reject").unwrap());

        let result = client.submit(&Expense::new("Ana", "Coffee", 3.5, "Food")).await;
        assert_eq!(result, Err(SubmissionError::Rejected { status: 400 }));
    }

    #[tokio::test]
    async fn test_submit_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = SubmissionClient::new(Url::parse(&format!("http://{}/addExpense", addr)).unwrap());
        let result = client.submit(&Expense::new("Ana", "Coffee", 3.5, "Food")).await;
        assert!(matches!(result, Err(SubmissionError::Transport(_))));
    }
}
