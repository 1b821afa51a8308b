//! Paced delivery of chat responses.
//!
//! Public responses go through the per-server [`DeliveryQueue`], private ones
//! straight to [`DeliveryPacer::deliver_private`].

mod job;
mod pacer;
mod queue;

pub use job::{DeliveryJob, Destination, Pacing};
pub use pacer::{DeliveryError, DeliveryPacer, DeliveryReport, PacingConfig};
pub use queue::{DeliveryQueue, QueueError, QueueState};
