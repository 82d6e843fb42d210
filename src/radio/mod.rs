//! ESP-NOW status reporting: wire codec, transport port, completion
//! notifications and the bounded-retry sender.

pub mod codec;
pub mod completion;
pub mod reliable;
pub mod transport;
