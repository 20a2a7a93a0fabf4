mod codec;
mod error;
pub mod frame;

pub use codec::{Command, FrameCodec};
pub use error::{FrameError, ParseResult};

/// Byte the receiver treats as a frame boundary; any stray input before it is
/// discarded by the firmware.
pub const FRAME_DELIMITER: u8 = b'|';
/// Separator between fields of a response line.
pub const FIELD_SEPARATOR: char = ',';
