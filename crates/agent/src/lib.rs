//! Request orchestration for AgentChat.
//!
//! A prompt flows through the crate like this:
//!
//! 1. **Submit**: the [`StreamingCoordinator`] validates and stores the prompt
//! 2. **Select**: the [`AgentRegistry`] picks an [`InvocationStrategy`]
//! 3. **Invoke** on a background worker:
//!    - *Direct*: resolve the remote agent and stream its decoded reply
//!    - *Agentic*: run the bounded model/tool loop on the [`TaskPool`]
//! 4. **Drain**: the foreground loop feeds fragments to a [`RenderSink`]
//! 5. **Store**: the full answer is appended as one assistant message

pub mod coordinator;
pub mod decoder;
pub mod direct;
pub mod executor;
pub mod loop_runner;
pub mod strategy;
pub mod stream_event;

#[cfg(test)]
mod test_helpers;

pub use coordinator::{ChatSnapshot, RenderSink, StreamingCoordinator};
pub use decoder::decode_frames;
pub use direct::{DirectInvoker, DirectTarget, ResolvedAgent};
pub use executor::TaskPool;
pub use loop_runner::{
    AgenticLoop, LoopOutcome, LoopState, MAX_ITERATIONS_SENTINEL, TASK_COMPLETED_SENTINEL,
};
pub use strategy::{AgentRegistry, InvocationContext, InvocationStrategy};
pub use stream_event::ChatEvent;
