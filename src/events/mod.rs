//! Progress events for procedure conversion.
//!
//! The converter reports each stage (segmentation, match, model response,
//! synthesized call, failure) through a bounded channel. Emission never
//! blocks the conversion; consumers drain the receiver at their own pace.

mod emitter;
mod types;

pub use emitter::{EmitterStats, EventEmitter, EventReceiver, SharedEmitter};
pub use types::{ErrorSnapshot, EventPayload, PipelineEvent};
