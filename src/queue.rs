//! Incoming token queue.
//!
//! Decoded tokens are appended to a flat FIFO. The application-level
//! processor (message matching, decoding of individual gateway messages)
//! lives outside this crate and is plugged in as a closure that consumes
//! whatever complete messages it recognises from the front of the queue.
//!
//! # Example
//!
//! ```
//! use tws_wire::queue::{IncomingQueue, TokenQueue};
//!
//! let mut queue = TokenQueue::with_processor(|tokens| {
//!     // consume everything
//!     tokens.clear();
//! });
//! queue.enqueue(vec!["4".into(), "2".into()]);
//! assert_eq!(queue.len(), 2);
//! queue.process();
//! assert!(queue.is_empty());
//! ```

use std::collections::VecDeque;
use std::fmt;

/// Queue of inbound tokens owned by the controller.
pub trait IncomingQueue {
    /// Append tokens in order.
    fn enqueue(&mut self, tokens: Vec<String>);

    /// Pop the front token.
    fn dequeue(&mut self) -> Option<String>;

    /// Number of queued tokens.
    fn len(&self) -> usize;

    /// Check if no tokens are queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain and dispatch any complete application messages.
    fn process(&mut self);
}

/// Processor callback for [`TokenQueue`].
pub type Processor = Box<dyn FnMut(&mut VecDeque<String>) + Send + 'static>;

/// Default [`IncomingQueue`] backed by a `VecDeque`.
#[derive(Default)]
pub struct TokenQueue {
    tokens: VecDeque<String>,
    processor: Option<Processor>,
}

impl TokenQueue {
    /// Create a queue without a processor; tokens accumulate until drained.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that runs `processor` on every `process()` call.
    pub fn with_processor<F>(processor: F) -> Self
    where
        F: FnMut(&mut VecDeque<String>) + Send + 'static,
    {
        Self {
            tokens: VecDeque::new(),
            processor: Some(Box::new(processor)),
        }
    }

    /// Peek at the queued tokens.
    pub fn tokens(&self) -> &VecDeque<String> {
        &self.tokens
    }

    /// Remove and return all queued tokens.
    pub fn drain(&mut self) -> Vec<String> {
        self.tokens.drain(..).collect()
    }
}

impl IncomingQueue for TokenQueue {
    fn enqueue(&mut self, tokens: Vec<String>) {
        self.tokens.extend(tokens);
    }

    fn dequeue(&mut self) -> Option<String> {
        self.tokens.pop_front()
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }

    fn process(&mut self) {
        if let Some(processor) = self.processor.as_mut() {
            processor(&mut self.tokens);
        }
    }
}

impl fmt::Debug for TokenQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenQueue")
            .field("tokens", &self.tokens)
            .field("has_processor", &self.processor.is_some())
            .finish()
    }
}
