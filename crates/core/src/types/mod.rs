//! Wire and domain types for the TV control protocol

mod command;
mod device;
mod event;

pub use command::{KeyAction, KeyParams, RemoteCommand, REMOTE_CONTROL_METHOD};
pub use device::{AppStatus, DeviceDetails, DeviceIdentity, SystemInfo, DEFAULT_DISPLAY_NAME};
pub use event::{ChannelEvent, EventKind};
