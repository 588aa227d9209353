//! Generation-token cancellation
//!
//! Starting a render bumps a shared counter and hands out a ticket holding
//! the new value. Any later start makes older tickets stale; work checks its
//! ticket before each unit and stops with [`ComposeError::Cancelled`].

use crate::types::{ComposeError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared render generation counter
#[derive(Debug, Clone, Default)]
pub struct RenderGeneration {
    current: Arc<AtomicU64>,
}

impl RenderGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new render, superseding every outstanding ticket
    pub fn begin(&self) -> RenderTicket {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        RenderTicket {
            generation,
            current: Some(Arc::clone(&self.current)),
        }
    }

    /// Supersede outstanding tickets without starting anything
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

/// Proof that a render is still the newest one
#[derive(Debug, Clone)]
pub struct RenderTicket {
    generation: u64,
    current: Option<Arc<AtomicU64>>,
}

impl RenderTicket {
    /// A ticket that never goes stale, for one-shot work such as CLI exports
    pub fn detached() -> Self {
        Self {
            generation: 0,
            current: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_stale(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| current.load(Ordering::SeqCst) != self.generation)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_stale() {
            Err(ComposeError::Cancelled)
        } else {
            Ok(())
        }
    }
}
