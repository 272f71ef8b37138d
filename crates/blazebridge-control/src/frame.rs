//! Inbound frame classification
//!
//! The Pixelblaze sends two kinds of WebSocket data frames:
//!
//! - **Text**: a self-contained JSON reply, acknowledgement or notice
//! - **Binary**: a 2-byte header followed by a payload
//!
//! ```text
//! byte 0     type code (0x07 = program list)
//! byte 1     flags     (0x04 = final fragment)
//! byte 2..   payload
//! ```
//!
//! Unsolicited traffic (periodic stats, preview frames) is interleaved with
//! replies, so the reader only ever accepts the one kind it asked for.

use tokio_tungstenite::tungstenite::Message;

/// Binary type code of program list fragments
pub const PROGRAM_LIST: u8 = 0x07;

/// Flags bit marking the last fragment of a multi-frame reply
pub const FINAL_FRAGMENT: u8 = 0x04;

/// Size of the binary frame header
pub const HEADER_LEN: usize = 2;

/// The kind of frame a request expects as its reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Text,
    Binary,
}

/// A matched inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Text(_) => FrameKind::Text,
            Self::Binary(_) => FrameKind::Binary,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(data) => Some(data),
            Self::Text(_) => None,
        }
    }
}

/// Header of a binary frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryHeader {
    pub type_code: u8,
    pub flags: u8,
}

impl BinaryHeader {
    /// Read the header, `None` if the frame is too short to carry one
    pub fn parse(data: &[u8]) -> Option<Self> {
        match data {
            [type_code, flags, ..] => Some(Self {
                type_code: *type_code,
                flags: *flags,
            }),
            _ => None,
        }
    }

    /// Whether this is the last fragment of its reply
    pub fn is_final(&self) -> bool {
        self.flags & FINAL_FRAGMENT != 0
    }
}

/// Payload of a binary frame (everything after the header)
pub fn payload(data: &[u8]) -> &[u8] {
    data.get(HEADER_LEN..).unwrap_or(&[])
}

/// Outcome of classifying one inbound message against the wanted kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Text(String),
    Binary(Vec<u8>),
    Unmatched,
}

impl Classified {
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            Self::Text(text) => Some(Frame::Text(text)),
            Self::Binary(data) => Some(Frame::Binary(data)),
            Self::Unmatched => None,
        }
    }
}

/// Classify a message for a reader waiting on `wanted`.
///
/// Text matches a text wait. Binary matches a binary wait only when it is a
/// complete program list frame. Everything else, control frames included,
/// is `Unmatched`. Close frames are handled by the caller before this.
pub fn classify(message: Message, wanted: FrameKind) -> Classified {
    match (message, wanted) {
        (Message::Text(text), FrameKind::Text) => Classified::Text(text),
        (Message::Binary(data), FrameKind::Binary)
            if BinaryHeader::parse(&data).is_some_and(|h| h.type_code == PROGRAM_LIST) =>
        {
            Classified::Binary(data)
        }
        _ => Classified::Unmatched,
    }
}
