pub mod colorize;
pub mod filter;
pub mod service;

pub use filter::{FilterEngine, FilterStatus, MARKER_CLASS};
pub use service::{FilterMessage, FilterReply, FilterRequest};
