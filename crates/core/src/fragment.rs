//! Stream fragments and the queue that carries them from a worker to the
//! foreground drain loop.
//!
//! The queue is FIFO per sender. A bounded queue applies backpressure: a full
//! queue suspends the producing worker until the drain loop catches up, so
//! fragments are never dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// A piece of generated text (or an error notice) produced by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFragment {
    pub user_id: String,
    pub text: String,
    #[serde(default)]
    pub is_error: bool,
}

impl StreamFragment {
    pub fn text(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            is_error: true,
        }
    }
}

/// Producer half of the fragment queue. Cheap to clone.
#[derive(Debug, Clone)]
pub enum FragmentSender {
    Bounded(mpsc::Sender<StreamFragment>),
    Unbounded(mpsc::UnboundedSender<StreamFragment>),
}

impl FragmentSender {
    /// Push a fragment, waiting for room if the queue is bounded and full.
    pub async fn send(&self, fragment: StreamFragment) -> Result<()> {
        let sent = match self {
            FragmentSender::Bounded(tx) => tx.send(fragment).await.is_ok(),
            FragmentSender::Unbounded(tx) => tx.send(fragment).is_ok(),
        };
        if sent {
            Ok(())
        } else {
            Err(Error::Internal("fragment queue receiver dropped".into()))
        }
    }
}

/// Consumer half of the fragment queue.
#[derive(Debug)]
pub enum FragmentReceiver {
    Bounded(mpsc::Receiver<StreamFragment>),
    Unbounded(mpsc::UnboundedReceiver<StreamFragment>),
}

impl FragmentReceiver {
    /// Take the next fragment without waiting.
    pub fn try_recv(&mut self) -> Option<StreamFragment> {
        match self {
            FragmentReceiver::Bounded(rx) => rx.try_recv().ok(),
            FragmentReceiver::Unbounded(rx) => rx.try_recv().ok(),
        }
    }

    /// Number of fragments waiting to be drained.
    pub fn len(&self) -> usize {
        match self {
            FragmentReceiver::Bounded(rx) => rx.len(),
            FragmentReceiver::Unbounded(rx) => rx.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Create a fragment queue. `None` means unbounded.
pub fn fragment_queue(capacity: Option<usize>) -> (FragmentSender, FragmentReceiver) {
    match capacity {
        Some(cap) => {
            let (tx, rx) = mpsc::channel(cap.max(1));
            (FragmentSender::Bounded(tx), FragmentReceiver::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (FragmentSender::Unbounded(tx), FragmentReceiver::Unbounded(rx))
        }
    }
}
