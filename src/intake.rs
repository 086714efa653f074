//! Radio intake channel.
//!
//! The radio's receive interrupt only copies bytes into a bounded
//! single-producer/single-consumer queue; the control loop pops at most
//! one frame at the top of each tick.  No domain state is reachable from
//! the interrupt side.
//!
//! ```text
//! ┌─────────────┐      ┌───────────────┐      ┌──────────────┐
//! │ RX interrupt│─────▶│ IntakeQueue   │─────▶│ Gateway::tick│
//! │ (producer)  │      │ (lock-free)   │      │ (consumer)   │
//! └─────────────┘      └───────────────┘      └──────────────┘
//! ```
//!
//! The queue is owned by the embedding binary and split once:
//!
//! ```ignore
//! let mut queue = IntakeQueue::new();
//! let (mut producer, mut consumer) = queue.split();
//! ```

use heapless::spsc::{Consumer, Producer, Queue};
use heapless::Vec;
use log::warn;

use crate::app::ports::RadioPort;
use crate::protocol::frame::MAX_RAW;

/// Raw transceiver output including the two trailing quality bytes.
pub type RawFrame = Vec<u8, MAX_RAW>;

/// Slots in the intake ring; one is kept free, so seven frames can wait.
pub const INTAKE_DEPTH: usize = 8;

pub type IntakeQueue = Queue<RawFrame, INTAKE_DEPTH>;
pub type IntakeProducer<'a> = Producer<'a, RawFrame, INTAKE_DEPTH>;
pub type IntakeConsumer<'a> = Consumer<'a, RawFrame, INTAKE_DEPTH>;

/// Copy `bytes` into a raw frame; `None` if longer than any valid frame.
pub fn raw_frame(bytes: &[u8]) -> Option<RawFrame> {
    RawFrame::from_slice(bytes).ok()
}

/// Receive-interrupt body: fetch one frame from the radio and enqueue it.
/// Returns `false` when nothing was received or the ring was full.
pub fn on_radio_interrupt(radio: &mut impl RadioPort, producer: &mut IntakeProducer<'_>) -> bool {
    let Some(frame) = radio.receive() else {
        return false;
    };
    match producer.enqueue(frame) {
        Ok(()) => true,
        Err(_) => {
            warn!("Intake full, frame dropped");
            false
        }
    }
}
