//! Runtime module - one-way message channels between the background, content
//! and popup contexts.
//!
//! Delivery is best-effort: a send either hands the message to a registered
//! listener or fails immediately. There is no acknowledgement and no retry.
//! Listeners are explicit subscription objects; dropping one unsubscribes.

pub mod blob;

use crate::snapshot::{ExportAction, ExportFormat, ExportRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

pub use blob::{Blob, BlobStore, ObjectUrl};

/// Inter-context message schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum RuntimeMessage {
    #[serde(rename = "exportChat")]
    ExportChat {
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        format: Option<ExportFormat>,
    },
    #[serde(rename = "printChat")]
    PrintChat {
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        format: Option<ExportFormat>,
    },
    #[serde(rename = "saveFile")]
    SaveFile { url: String, filename: String },
}

impl RuntimeMessage {
    /// Export request carried by this message, if any.
    pub fn to_request(&self, default_format: ExportFormat) -> Option<ExportRequest> {
        match self {
            RuntimeMessage::ExportChat { format } => {
                Some(ExportRequest::export(format.unwrap_or(default_format)))
            }
            RuntimeMessage::PrintChat { .. } => Some(ExportRequest::print()),
            RuntimeMessage::SaveFile { .. } => None,
        }
    }
}

impl From<ExportRequest> for RuntimeMessage {
    fn from(request: ExportRequest) -> Self {
        match request.action {
            ExportAction::Export => RuntimeMessage::ExportChat {
                format: Some(request.format),
            },
            ExportAction::Print => RuntimeMessage::PrintChat { format: None },
        }
    }
}

/// Why a message could not be delivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("No tab with id {0}")]
    NoSuchTab(TabId),

    #[error("Could not establish connection. Receiving end does not exist.")]
    NoReceiver,
}

/// Subscription to one message stream. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Listener<T> {
    rx: UnboundedReceiver<T>,
}

impl<T> Listener<T> {
    /// Next message, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Next message if one is already queued.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting new messages; queued ones can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Message sent from the content context to the background context.
///
/// A `saveFile` envelope owns the object URL it names, so the URL lives until
/// the background handler drops the envelope, or until a failed send drops it.
#[derive(Debug)]
pub struct Envelope {
    pub message: RuntimeMessage,
    object_url: Option<ObjectUrl>,
}

impl Envelope {
    pub fn new(message: RuntimeMessage) -> Self {
        Self {
            message,
            object_url: None,
        }
    }

    pub fn save_file(object_url: ObjectUrl, filename: impl Into<String>) -> Self {
        Self {
            message: RuntimeMessage::SaveFile {
                url: object_url.as_str().to_string(),
                filename: filename.into(),
            },
            object_url: Some(object_url),
        }
    }

    pub fn object_url(&self) -> Option<&ObjectUrl> {
        self.object_url.as_ref()
    }
}

/// Sender half of the content -> background channel.
#[derive(Debug, Clone)]
pub struct RuntimeSender {
    tx: UnboundedSender<Envelope>,
}

impl RuntimeSender {
    /// Best-effort send. On failure the envelope (and its object URL) is dropped.
    pub fn send(&self, envelope: Envelope) -> Result<(), DeliveryError> {
        self.tx
            .send(envelope)
            .map_err(|_| DeliveryError::NoReceiver)
    }
}

/// Create the content -> background channel.
pub fn runtime_channel() -> (RuntimeSender, Listener<Envelope>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RuntimeSender { tx }, Listener { rx })
}

pub type TabId = u32;

/// Browser tab access used by the dispatcher.
pub trait Tabs: Send + Sync {
    /// Currently focused tab, if any.
    fn active_tab(&self) -> Option<TabId>;

    /// Deliver a message to the tab's content listener.
    fn send(&self, tab: TabId, message: RuntimeMessage) -> Result<(), DeliveryError>;
}

#[derive(Debug)]
struct TabEntry {
    url: String,
    listener: Option<UnboundedSender<RuntimeMessage>>,
}

#[derive(Debug, Default)]
struct TabsInner {
    tabs: BTreeMap<TabId, TabEntry>,
    active: Option<TabId>,
    next_id: TabId,
}

/// In-process tab registry.
#[derive(Debug, Clone, Default)]
pub struct TabRegistry {
    inner: Arc<Mutex<TabsInner>>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TabsInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open a tab and focus it.
    pub fn open_tab(&self, url: impl Into<String>) -> TabId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.tabs.insert(
            id,
            TabEntry {
                url: url.into(),
                listener: None,
            },
        );
        inner.active = Some(id);
        id
    }

    /// Focus an existing tab.
    pub fn activate(&self, id: TabId) -> bool {
        let mut inner = self.lock();
        if inner.tabs.contains_key(&id) {
            inner.active = Some(id);
            true
        } else {
            false
        }
    }

    /// Close a tab. Its listener sees the end of its stream.
    pub fn close_tab(&self, id: TabId) {
        let mut inner = self.lock();
        inner.tabs.remove(&id);
        if inner.active == Some(id) {
            inner.active = None;
        }
    }

    pub fn tab_url(&self, id: TabId) -> Option<String> {
        self.lock().tabs.get(&id).map(|t| t.url.clone())
    }

    /// Register the content listener of a tab, replacing any previous one.
    pub fn listen(&self, id: TabId) -> Option<Listener<RuntimeMessage>> {
        let mut inner = self.lock();
        let entry = inner.tabs.get_mut(&id)?;
        let (tx, rx) = mpsc::unbounded_channel();
        entry.listener = Some(tx);
        Some(Listener { rx })
    }
}

impl Tabs for TabRegistry {
    fn active_tab(&self) -> Option<TabId> {
        self.lock().active
    }

    fn send(&self, tab: TabId, message: RuntimeMessage) -> Result<(), DeliveryError> {
        let inner = self.lock();
        let entry = inner.tabs.get(&tab).ok_or(DeliveryError::NoSuchTab(tab))?;
        let listener = entry.listener.as_ref().ok_or(DeliveryError::NoReceiver)?;

        debug!(tab, message = ?message, "Sending message to tab");
        listener
            .send(message)
            .map_err(|_| DeliveryError::NoReceiver)
    }
}
