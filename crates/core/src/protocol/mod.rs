//! JSON framing for the control channel

pub mod codec;

pub use codec::MessageCodec;
