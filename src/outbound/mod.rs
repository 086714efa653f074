//! Outbound queue.
//!
//! ```text
//!   builders ──▶ push ──▶ ┌──────────────── FIFO ────────────────┐
//!                         │ head │  …  │  …  │  …  │  …  │ tail  │
//!                         └──┬───────────────────────────────────┘
//!                            │ service(): one head per tick
//!                            ▼
//!             credit ok? ──yes──▶ transmit ──▶ no ack wanted ──▶ pop
//!                 │                    └──────▶ ack wanted ──▶ retry++ (pop after 5 tries)
//!                 no
//!                 ├── no ack wanted ──▶ pop, never sent
//!                 └── ack wanted ─────▶ wait for next window
//! ```
//!
//! Acknowledgements are matched against the head only.

pub mod credit;

use heapless::Deque;
use log::{debug, info, warn};

use crate::app::ports::RadioPort;
use crate::protocol::Frame;

pub use credit::CreditBudget;

/// Upper bound on pending frames.
pub const QUEUE_CAPACITY: usize = 48;

/// How a frame is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Operator commands: long preamble, retried until acknowledged.
    Confirmed,
    /// Immediate answers to a device that is awake: short preamble, no ack.
    Reply,
    /// Unsolicited, unacknowledged frames to sleeping devices.
    Broadcast,
}

impl Delivery {
    const fn wants_ack(self) -> bool {
        matches!(self, Self::Confirmed)
    }

    const fn long_preamble(self) -> bool {
        !matches!(self, Self::Reply)
    }
}

/// One pending frame and its delivery state.
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub frame: Frame,
    pub sent: bool,
    pub retry_count: u8,
    pub wants_ack: bool,
    pub long_preamble: bool,
}

impl QueuedMessage {
    pub fn new(frame: Frame, delivery: Delivery) -> Self {
        Self {
            frame,
            sent: false,
            retry_count: 0,
            wants_ack: delivery.wants_ack(),
            long_preamble: delivery.long_preamble(),
        }
    }
}

/// What one [`OutboundQueue::service`] step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOutcome {
    Idle,
    /// Transmitted; `completed` when the message left the queue.
    Sent { msg_counter: u8, completed: bool },
    /// Transmitted for the last time without an ack.
    Exhausted { msg_counter: u8 },
    /// Not enough credit; discarded without transmission.
    Dropped { msg_counter: u8 },
    /// Not enough credit; stays queued.
    Waiting { msg_counter: u8 },
}

impl ServiceOutcome {
    pub fn transmitted(self) -> bool {
        matches!(self, Self::Sent { .. } | Self::Exhausted { .. })
    }
}

#[derive(Debug)]
pub struct OutboundQueue {
    messages: Deque<QueuedMessage, QUEUE_CAPACITY>,
    max_retries: u8,
}

impl OutboundQueue {
    pub fn new(max_retries: u8) -> Self {
        Self {
            messages: Deque::new(),
            max_retries,
        }
    }

    /// Append a frame.  Returns `false` when the queue is full.
    pub fn push(&mut self, frame: Frame, delivery: Delivery) -> bool {
        debug!("Queue: {} ({:?})", frame, delivery);
        match self.messages.push_back(QueuedMessage::new(frame, delivery)) {
            Ok(()) => true,
            Err(msg) => {
                warn!("Queue full, dropping {}", msg.frame);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn head(&self) -> Option<&QueuedMessage> {
        self.messages.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedMessage> {
        self.messages.iter()
    }

    /// Service the head of the queue once.
    pub fn service(&mut self, credit: &mut CreditBudget, radio: &mut impl RadioPort) -> ServiceOutcome {
        let max_retries = self.max_retries;
        let Some(head) = self.messages.front_mut() else {
            return ServiceOutcome::Idle;
        };
        let msg_counter = head.frame.msg_counter;
        let required = credit.required_ms(head.frame.wire_len(), head.long_preamble);

        if !credit.try_take(required) {
            if head.wants_ack {
                debug!("Queue: #{} waiting for credit ({} < {} ms)", msg_counter, credit.remaining_ms(), required);
                return ServiceOutcome::Waiting { msg_counter };
            }
            info!("Queue: #{} dropped, no credit ({} < {} ms)", msg_counter, credit.remaining_ms(), required);
            self.messages.pop_front();
            return ServiceOutcome::Dropped { msg_counter };
        }

        let bytes = head.frame.encode();
        info!(
            "Sending {}{}",
            head.frame,
            if head.long_preamble { " with long preamble" } else { "" }
        );
        radio.transmit(&bytes, head.long_preamble);
        head.sent = true;
        head.long_preamble = true;

        if !head.wants_ack {
            self.messages.pop_front();
            return ServiceOutcome::Sent {
                msg_counter,
                completed: true,
            };
        }

        head.retry_count += 1;
        if head.retry_count > max_retries {
            warn!("Queue: #{} not acknowledged after {} attempts", msg_counter, head.retry_count);
            self.messages.pop_front();
            return ServiceOutcome::Exhausted { msg_counter };
        }
        ServiceOutcome::Sent {
            msg_counter,
            completed: false,
        }
    }

    /// Resolve an ack addressed to the gateway.  Only the head can match.
    pub fn acknowledge(&mut self, msg_counter: u8) -> bool {
        let matches = self
            .messages
            .front()
            .is_some_and(|m| m.sent && m.wants_ack && m.frame.msg_counter == msg_counter);
        if matches {
            self.messages.pop_front();
            info!("Queue: #{} acknowledged", msg_counter);
        } else {
            debug!("Queue: ack #{} does not match head", msg_counter);
        }
        matches
    }
}
