use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

use manualqa_core::error::{Error, Result};
use manualqa_core::types::Answer;

use crate::assembler::AnswerAssembler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
    ShutDown,
}

enum State {
    Uninitialized,
    Ready(Arc<AnswerAssembler>),
    ShutDown,
}

/// Query-serving context handed to request handlers. Queries are rejected
/// with [`Error::NotReady`] unless the service is ready.
pub struct QaService {
    state: RwLock<State>,
}

impl Default for QaService {
    fn default() -> Self {
        Self::new()
    }
}

impl QaService {
    pub fn new() -> Self {
        Self { state: RwLock::new(State::Uninitialized) }
    }

    pub fn ready(assembler: AnswerAssembler) -> Self {
        let service = Self::new();
        service.set_ready(assembler);
        service
    }

    /// Ignored once the service has been shut down.
    pub fn set_ready(&self, assembler: AnswerAssembler) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, State::ShutDown) {
            warn!("ignoring set_ready on a shut-down service");
            return;
        }
        *state = State::Ready(Arc::new(assembler));
        info!("query service ready");
    }

    pub fn shutdown(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = State::ShutDown;
        info!("query service shut down");
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match *self.state.read().unwrap_or_else(PoisonError::into_inner) {
            State::Uninitialized => Lifecycle::Uninitialized,
            State::Ready(_) => Lifecycle::Ready,
            State::ShutDown => Lifecycle::ShutDown,
        }
    }

    pub async fn ask(&self, query: &str) -> Result<Answer> {
        let assembler = self.assembler()?;
        assembler.answer(query).await
    }

    // The lock is released before any await.
    fn assembler(&self) -> Result<Arc<AnswerAssembler>> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            State::Ready(assembler) => Ok(Arc::clone(assembler)),
            State::Uninitialized | State::ShutDown => Err(Error::NotReady),
        }
    }
}
