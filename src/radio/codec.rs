//! Status-report codec.
//!
//! Wire format (fixed offsets, variable tail):
//! ```text
//! ┌──────────┬───────────┬─────────────────────────────┐
//! │ Kind (1B)│ Level (1B)│ Text (≤ 99 B) + 0x00        │
//! └──────────┴───────────┴─────────────────────────────┘
//! ```
//!
//! The text field has a fixed 100-byte capacity including the terminator.
//! Only `len + 1` bytes of it go on the air.  Over-long text is cut at the
//! last UTF-8 boundary that fits; it is never rejected.

use heapless::{String, Vec};

use crate::error::DecodeError;

/// Capacity of the text field including the nul terminator.
pub const TEXT_FIELD_LEN: usize = 100;

/// Longest text that fits in the field.
pub const MAX_TEXT_LEN: usize = TEXT_FIELD_LEN - 1;

/// Kind + level header.
pub const HEADER_LEN: usize = 2;

/// Largest encoded frame.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + TEXT_FIELD_LEN;

/// Level byte used when the frame carries no sensor reading.
pub const LEVEL_NOT_APPLICABLE: u8 = 0xFF;

/// Bounded message text.
pub type MessageText = String<MAX_TEXT_LEN>;

// ---------------------------------------------------------------------------
// Message kind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// Plain text; level is informational only.
    Normal = 0,
    /// Level carries the beam reading and must not be ignored.
    SensorReading = 1,
    /// Broadcast after unicast failed.
    ErrorBroadcast = 2,
}

impl MessageKind {
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Normal),
            1 => Some(Self::SensorReading),
            2 => Some(Self::ErrorBroadcast),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL_MESSAGE",
            Self::SensorReading => "SENSOR_READ",
            Self::ErrorBroadcast => "ERROR_BROADCAST",
        }
    }
}

// ---------------------------------------------------------------------------
// Status message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: MessageKind,
    pub beam_level: u8,
    pub text: MessageText,
}

impl StatusMessage {
    /// Build a message, truncating `text` to [`MAX_TEXT_LEN`] bytes.
    pub fn new(kind: MessageKind, beam_level: u8, text: &str) -> Self {
        Self {
            kind,
            beam_level,
            text: truncate_text(text),
        }
    }
}

fn truncate_text(text: &str) -> MessageText {
    let mut end = text.len().min(MAX_TEXT_LEN);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = MessageText::new();
    // Cannot fail: `end` ≤ capacity.
    let _ = out.push_str(&text[..end]);
    out
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Serialise `msg` into a frame of `HEADER_LEN + text.len() + 1` bytes.
pub fn encode(msg: &StatusMessage) -> Vec<u8, MAX_FRAME_LEN> {
    let mut frame = Vec::new();
    // Capacity is sized for the worst case; none of these can overflow.
    let _ = frame.push(msg.kind as u8);
    let _ = frame.push(msg.beam_level);
    let _ = frame.extend_from_slice(msg.text.as_bytes());
    let _ = frame.push(0);
    frame
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Tolerant view of a received frame.  Keeps the raw kind byte so an
/// unknown kind can still be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFields<'a> {
    pub raw_kind: u8,
    pub beam_level: u8,
    pub text: &'a str,
}

impl FrameFields<'_> {
    pub fn kind(&self) -> Result<MessageKind, DecodeError> {
        MessageKind::from_u8(self.raw_kind).ok_or(DecodeError::UnknownKind(self.raw_kind))
    }
}

/// Split a frame into its fields without validating the kind.
pub fn decode_fields(bytes: &[u8]) -> Result<FrameFields<'_>, DecodeError> {
    if bytes.len() < HEADER_LEN {
        return Err(DecodeError::Truncated);
    }

    let field = &bytes[HEADER_LEN..];
    let field = &field[..field.len().min(TEXT_FIELD_LEN)];
    let text_end = field
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(field.len())
        .min(MAX_TEXT_LEN);
    let text = match core::str::from_utf8(&field[..text_end]) {
        Ok(s) => s,
        // Keep the valid prefix; the tail cannot be rendered anyway.
        Err(e) => core::str::from_utf8(&field[..e.valid_up_to()]).unwrap_or_default(),
    };

    Ok(FrameFields {
        raw_kind: bytes[0],
        beam_level: bytes[1],
        text,
    })
}

/// Decode a frame into an owned [`StatusMessage`].
pub fn decode(bytes: &[u8]) -> Result<StatusMessage, DecodeError> {
    let fields = decode_fields(bytes)?;
    let kind = fields.kind()?;
    Ok(StatusMessage::new(kind, fields.beam_level, fields.text))
}
