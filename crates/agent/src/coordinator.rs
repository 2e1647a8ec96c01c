//! The streaming coordinator: one per chat session.
//!
//! `submit` validates and records the user's prompt, then hands the request to
//! a background worker. The worker pushes fragments onto the session's queue.
//! `drain` is the foreground half: it polls the queue on a short interval,
//! feeds each fragment to a [`RenderSink`], and returns once the worker has
//! finished and the queue is empty.
//!
//! The processing and waiting flags are cleared by a guard owned by the
//! worker, so every exit path (success, error, panic) resets them.

use agentchat_config::ChatConfig;
use agentchat_core::error::{Error, Result, ValidationError};
use agentchat_core::fragment::{FragmentReceiver, FragmentSender, StreamFragment, fragment_queue};
use agentchat_core::message::{ConversationStore, Message};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::strategy::{InvocationContext, InvocationStrategy};

/// Where drained fragments go. The gateway forwards them over SSE; the CLI
/// prints them.
pub trait RenderSink: Send + Sync {
    /// A text fragment arrived. `pending` is everything received so far for
    /// the current answer, including `fragment`.
    fn render(&self, fragment: &str, pending: &str);

    /// An error notice arrived.
    fn error(&self, message: &str);
}

#[derive(Default)]
struct SharedState {
    processing: AtomicBool,
    waiting: AtomicBool,
    pending: Mutex<String>,
}

impl SharedState {
    // Processing goes first: once a drain sees `waiting` drop, the session
    // already accepts the next prompt.
    fn clear_flags(&self) {
        self.processing.store(false, Ordering::SeqCst);
        self.waiting.store(false, Ordering::SeqCst);
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, String> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Clears both flags when the worker exits, however it exits.
struct ProcessingGuard(Arc<SharedState>);

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.0.clear_flags();
    }
}

/// Point-in-time view of a session, for re-rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSnapshot {
    pub user_id: String,
    pub session_id: String,
    pub messages: Vec<Message>,
    /// Text streamed so far for the in-flight answer.
    pub pending: String,
    pub processing: bool,
    pub waiting: bool,
}

pub struct StreamingCoordinator {
    user_id: String,
    session_id: String,
    store: Arc<ConversationStore>,
    sender: FragmentSender,
    receiver: tokio::sync::Mutex<FragmentReceiver>,
    state: Arc<SharedState>,
    max_prompt_chars: usize,
    poll_interval: Duration,
}

impl StreamingCoordinator {
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        store: Arc<ConversationStore>,
        chat: &ChatConfig,
    ) -> Self {
        let (sender, receiver) = fragment_queue(chat.queue_capacity);
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            store,
            sender,
            receiver: tokio::sync::Mutex::new(receiver),
            state: Arc::new(SharedState::default()),
            max_prompt_chars: chat.max_prompt_chars,
            poll_interval: chat.poll_interval(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_processing(&self) -> bool {
        self.state.processing.load(Ordering::SeqCst)
    }

    pub fn is_waiting(&self) -> bool {
        self.state.waiting.load(Ordering::SeqCst)
    }

    fn validate_prompt<'a>(&self, prompt: &'a str) -> Result<&'a str> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ValidationError::EmptyPrompt.into());
        }
        let len = prompt.chars().count();
        if len > self.max_prompt_chars {
            return Err(ValidationError::PromptTooLong {
                len,
                max: self.max_prompt_chars,
            }
            .into());
        }
        Ok(prompt)
    }

    /// Accept a prompt and start answering it in the background.
    ///
    /// Nothing is stored when validation fails. While a previous submission
    /// is still being processed this returns [`Error::Busy`].
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, prompt: &str, strategy: InvocationStrategy) -> Result<()> {
        let prompt = self.validate_prompt(prompt)?;
        strategy.preflight()?;

        if self
            .state
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::Busy);
        }
        self.state.waiting.store(true, Ordering::SeqCst);
        self.state.pending().clear();

        let request = match self.store.last_assistant(&self.user_id) {
            Some(previous) if strategy.carries_context() => format!("{previous}\n\n{prompt}"),
            _ => prompt.to_string(),
        };
        self.store.append(&self.user_id, Message::user(prompt));

        info!(
            user_id = %self.user_id,
            session_id = %self.session_id,
            kind = ?strategy.kind(),
            chars = prompt.len(),
            "Prompt accepted"
        );

        let guard = ProcessingGuard(self.state.clone());
        let store = self.store.clone();
        let ctx = InvocationContext::new(&self.user_id, &self.session_id, self.sender.clone());

        tokio::spawn(async move {
            let _guard = guard;
            match strategy.invoke(&request, &ctx).await {
                Ok(answer) if !answer.is_empty() => {
                    store.append(&ctx.user_id, Message::assistant(answer));
                }
                Ok(_) => debug!(user_id = %ctx.user_id, "Agent returned an empty answer"),
                Err(e) => {
                    error!(user_id = %ctx.user_id, error = %e, "Agent invocation failed");
                    let notice = StreamFragment::error(&ctx.user_id, format!("Error invoking agent: {e}"));
                    if ctx.fragments.send(notice).await.is_err() {
                        warn!(user_id = %ctx.user_id, "Fragment queue closed before the error could be reported");
                    }
                }
            }
        });

        Ok(())
    }

    /// Run the foreground drain loop until the current response is finished.
    ///
    /// Returns immediately when nothing is in flight and the queue is empty.
    pub async fn drain(&self, sink: &dyn RenderSink) {
        let mut receiver = self.receiver.lock().await;

        loop {
            // Read before draining, so fragments sent before the worker
            // finished are always consumed in this pass.
            let finished = !self.state.waiting.load(Ordering::SeqCst);

            while let Some(fragment) = receiver.try_recv() {
                if fragment.is_error {
                    sink.error(&fragment.text);
                } else {
                    let mut pending = self.state.pending();
                    pending.push_str(&fragment.text);
                    sink.render(&fragment.text, &pending);
                }
            }

            if finished {
                self.state.pending().clear();
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            user_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
            messages: self.store.transcript(&self.user_id),
            pending: self.state.pending().clone(),
            processing: self.is_processing(),
            waiting: self.is_waiting(),
        }
    }
}
