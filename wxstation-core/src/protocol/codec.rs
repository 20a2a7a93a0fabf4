use core::str::FromStr;

use super::{FIELD_SEPARATOR, FRAME_DELIMITER, FrameError};
use crate::NodeId;

/// Commands understood by the receiver and the barometer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Latest telemetry frame from one node.
    Node(NodeId),
    /// Latest La Crosse weather station frame.
    Lacrosse,
    /// Barometric pressure. Only the barometer answers this one.
    Pressure,
    /// Receiver status dump.
    Current,
    /// Empty frame, used to resynchronise the link.
    Flush,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Node(node) => node.command(),
            Command::Lacrosse => "lacrosse",
            Command::Pressure => "pres",
            Command::Current => "current",
            Command::Flush => "",
        }
    }

    /// Bytes to put on the wire for this command.
    ///
    /// The barometer takes its command bare; everything addressed to the
    /// receiver is delimited.
    pub fn frame(&self) -> Vec<u8> {
        match self {
            Command::Pressure => self.as_str().as_bytes().to_vec(),
            _ => FrameCodec::encode(self.as_str()),
        }
    }
}

impl FromStr for Command {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node1" => Ok(Command::Node(NodeId::Node1)),
            "node2" => Ok(Command::Node(NodeId::Node2)),
            "node3" => Ok(Command::Node(NodeId::Node3)),
            "lacrosse" => Ok(Command::Lacrosse),
            "pres" => Ok(Command::Pressure),
            "current" => Ok(Command::Current),
            "" => Ok(Command::Flush),
            other => Err(FrameError::UnknownCommand(other.to_string())),
        }
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Command::Flush => f.write_str("<flush>"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Framing for the receiver's line protocol.
///
/// Requests are a command token wrapped in [`FRAME_DELIMITER`] bytes, e.g.
/// `|node1|`. Responses are a single comma separated text line terminated by
/// `\n` and/or `\r`.
pub struct FrameCodec;

impl FrameCodec {
    /// Wrap a command token in frame delimiters.
    pub fn encode(command: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(command.len() + 2);
        buf.push(FRAME_DELIMITER);
        buf.extend_from_slice(command.as_bytes());
        buf.push(FRAME_DELIMITER);
        buf
    }

    /// Strip the line terminator and split a response into raw fields.
    ///
    /// Empty fields are preserved. An empty line decodes to a single empty
    /// field.
    pub fn decode(line: &[u8]) -> Vec<String> {
        Self::line_text(line)
            .split(FIELD_SEPARATOR)
            .map(str::to_owned)
            .collect()
    }

    /// The response line as text, without its terminator.
    pub fn line_text(line: &[u8]) -> String {
        let text = String::from_utf8_lossy(line);
        text.trim_end_matches(['\n', '\r']).to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_wraps_command() {
        assert_eq!(FrameCodec::encode("node1"), b"|node1|");
        assert_eq!(FrameCodec::encode(""), b"||");
    }

    #[test]
    fn test_command_frames() {
        assert_eq!(Command::Node(NodeId::Node2).frame(), b"|node2|");
        assert_eq!(Command::Lacrosse.frame(), b"|lacrosse|");
        assert_eq!(Command::Flush.frame(), b"||");
        assert_eq!(Command::Pressure.frame(), b"pres");
    }

    #[test]
    fn test_decode_strips_terminators() {
        let fields = FrameCodec::decode(b"1,10,20.0,500,500,5\r\n");
        assert_eq!(fields, vec!["1", "10", "20.0", "500", "500", "5"]);
    }

    #[test]
    fn test_decode_preserves_empty_fields() {
        let fields = FrameCodec::decode(b"1,,20.0,\n");
        assert_eq!(fields, vec!["1", "", "20.0", ""]);
    }

    #[test]
    fn test_decode_empty_line() {
        assert_eq!(FrameCodec::decode(b""), vec![""]);
        assert_eq!(FrameCodec::decode(b"\r\n"), vec![""]);
        assert_eq!(FrameCodec::decode(b"||\n"), vec!["||"]);
    }

    #[test]
    fn test_command_from_str() {
        assert_eq!("node3".parse::<Command>(), Ok(Command::Node(NodeId::Node3)));
        assert_eq!("current".parse::<Command>(), Ok(Command::Current));
        assert_eq!(
            "reboot".parse::<Command>(),
            Err(FrameError::UnknownCommand("reboot".to_string()))
        );
    }
}
