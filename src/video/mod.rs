//! Periodic still-frame sampling of the active video source.

mod sampler;
mod schedule;

pub use sampler::{FrameSampler, SampleOutcome};
pub use schedule::{TickSchedule, TickTrigger, CADENCE, NEXT_PAINT};
