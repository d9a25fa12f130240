//! Event broadcasting
//!
//! Distribution of dispatch events to groups of connections.

mod fanout;

pub use fanout::{conversation_audience, deliver, FanoutReport};
