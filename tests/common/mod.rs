// In-memory connection capability for driving the session manager in tests.
//
// Each `open` hands the test a `FakeLink`: the test plays the backend by
// injecting events through it and inspecting the frames the manager sent.

#![allow(dead_code)]

use anyhow::{bail, Result};
use funasr_gateway::asr::{
    AsrSettings, CloseReason, Connection, ConnectionEvent, Connector, EventHandler, SessionId,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const END_MESSAGE: &str = r#"{"end":true}"#;

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Settings with fast pacing and a short timeout
pub fn test_settings() -> AsrSettings {
    AsrSettings {
        server_url: "ws://fake-asr:10095".to_string(),
        chunk_interval: Duration::from_millis(1),
        timeout: Duration::from_secs(5),
        ..AsrSettings::default()
    }
}

/// Poll `condition` until it holds, panicking after 5 seconds.
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("Timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

pub struct FakeConnection {
    frames: Mutex<Vec<Frame>>,
    open: AtomicBool,
    close_calls: AtomicUsize,
    /// Fail every binary send after this many succeeded
    fail_binary_after: Option<usize>,
    binary_sent: AtomicUsize,
}

impl FakeConnection {
    fn new(fail_binary_after: Option<usize>) -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
            close_calls: AtomicUsize::new(0),
            fail_binary_after,
            binary_sent: AtomicUsize::new(0),
        }
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn binary_frames(&self) -> Vec<Vec<u8>> {
        self.frames()
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::Binary(data) => Some(data),
                Frame::Text(_) => None,
            })
            .collect()
    }

    pub fn text_frames(&self) -> Vec<String> {
        self.frames()
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::Text(text) => Some(text),
                Frame::Binary(_) => None,
            })
            .collect()
    }

    pub fn has_ended(&self) -> bool {
        self.frames().contains(&Frame::Text(END_MESSAGE.to_string()))
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        !self.open.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Connection for FakeConnection {
    async fn send_text(&self, text: String) -> Result<()> {
        if !self.is_open() {
            bail!("connection is closed");
        }
        self.frames.lock().unwrap().push(Frame::Text(text));
        Ok(())
    }

    async fn send_binary(&self, data: Vec<u8>) -> Result<()> {
        if !self.is_open() {
            bail!("connection is closed");
        }
        if let Some(limit) = self.fail_binary_after {
            if self.binary_sent.load(Ordering::SeqCst) >= limit {
                bail!("broken pipe");
            }
        }
        self.binary_sent.fetch_add(1, Ordering::SeqCst);
        self.frames.lock().unwrap().push(Frame::Binary(data));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.open.swap(false, Ordering::SeqCst) {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// The backend's side of one fake connection
pub struct FakeLink {
    pub session_id: SessionId,
    pub url: String,
    pub handler: Arc<dyn EventHandler>,
    pub connection: Arc<FakeConnection>,
}

impl FakeLink {
    pub async fn open(&self) {
        let connection: Arc<dyn Connection> = self.connection.clone();
        self.handler
            .on_event(self.session_id, ConnectionEvent::Opened(connection))
            .await;
    }

    pub async fn text(&self, payload: &str) {
        self.handler
            .on_event(self.session_id, ConnectionEvent::Text(payload.to_string()))
            .await;
    }

    pub async fn close(&self) {
        self.connection.open.store(false, Ordering::SeqCst);
        self.handler
            .on_event(
                self.session_id,
                ConnectionEvent::Closed(Some(CloseReason {
                    code: 1000,
                    reason: String::new(),
                })),
            )
            .await;
    }

    pub async fn error(&self, cause: &str) {
        self.handler
            .on_event(self.session_id, ConnectionEvent::Error(cause.to_string()))
            .await;
    }

    /// Open the link and wait until the manager has sent `{"end":true}`.
    pub async fn open_and_drain(&self) -> Vec<Frame> {
        self.open().await;
        let connection = Arc::clone(&self.connection);
        eventually("end of stream", move || connection.has_ended()).await;
        self.connection.frames()
    }
}

pub struct FakeConnector {
    links: mpsc::UnboundedSender<FakeLink>,
    refuse: Option<String>,
    fail_binary_after: Option<usize>,
}

impl FakeConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakeLink>) {
        Self::build(None, None)
    }

    /// Every `open` fails with `cause`
    pub fn refusing(cause: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<FakeLink>) {
        Self::build(Some(cause.to_string()), None)
    }

    /// Connections break after `count` binary frames
    pub fn breaking_after(count: usize) -> (Arc<Self>, mpsc::UnboundedReceiver<FakeLink>) {
        Self::build(None, Some(count))
    }

    fn build(
        refuse: Option<String>,
        fail_binary_after: Option<usize>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<FakeLink>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                links: tx,
                refuse,
                fail_binary_after,
            }),
            rx,
        )
    }
}

#[async_trait::async_trait]
impl Connector for FakeConnector {
    async fn open(
        &self,
        url: &str,
        session_id: SessionId,
        handler: Arc<dyn EventHandler>,
    ) -> Result<()> {
        if let Some(cause) = &self.refuse {
            bail!("{}", cause);
        }

        let link = FakeLink {
            session_id,
            url: url.to_string(),
            handler,
            connection: Arc::new(FakeConnection::new(self.fail_binary_after)),
        };
        let _ = self.links.send(link);
        Ok(())
    }
}
