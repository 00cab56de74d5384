//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::event::RawEvent;
use crate::moderation::DeleteCommand;
use crate::session::EventSource;
use crate::slack::{RtmConnection, SelfIdentity, SlackMethods};

/// Records every `chat.delete` and optionally fails them.
#[derive(Default)]
pub struct MockSlack {
    pub deletes: Mutex<Vec<DeleteCommand>>,
    pub delete_error: Option<String>,
    pub rtm_url: String,
}

impl MockSlack {
    pub fn failing(error: &str) -> Self {
        Self {
            delete_error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn deletes(&self) -> Vec<DeleteCommand> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl SlackMethods for MockSlack {
    async fn rtm_connect(&self) -> Result<RtmConnection> {
        Ok(RtmConnection {
            url: self.rtm_url.clone(),
            identity: SelfIdentity {
                id: "B1".to_string(),
                name: "blockbot".to_string(),
            },
        })
    }

    async fn delete_message(&self, command: &DeleteCommand) -> Result<()> {
        self.deletes.lock().unwrap().push(command.clone());
        match &self.delete_error {
            Some(error) => Err(Error::remote_call("chat.delete", error.clone())),
            None => Ok(()),
        }
    }
}

/// Replays a fixed list of frames, then reports a peer close.
pub struct ScriptedSource {
    frames: VecDeque<Result<Option<RawEvent>>>,
    pub closed: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new(events: Vec<Value>) -> Self {
        Self {
            frames: events
                .into_iter()
                .map(|v| Ok(Some(RawEvent::from(v))))
                .collect(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn then_fail(mut self, error: Error) -> Self {
        self.frames.push_back(Err(error));
        self
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn next_frame(&mut self) -> Result<Option<RawEvent>> {
        self.frames.pop_front().unwrap_or(Ok(None))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Collects formatted log lines from the current thread.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Route this thread's tracing output here until the guard drops.
    pub fn set_default(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
