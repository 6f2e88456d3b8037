//! Inbound frame classification.
//!
//! [`classify`] reads byte 0 as the tag, strips exactly the header that tag
//! defines, and hands the rest to the codec. Extension frames are never
//! decoded; their body is kept raw.
//!
//! # Example
//!
//! ```
//! use ribbon_client::codec::MsgPackCodec;
//! use ribbon_client::protocol::{classify, tag, FrameKind};
//!
//! let mut bytes = vec![tag::STANDARD];
//! bytes.extend(MsgPackCodec::encode(&"hi").unwrap());
//!
//! let frame = classify(&bytes).unwrap();
//! assert_eq!(frame.kind, FrameKind::Standard);
//! assert_eq!(frame.value().and_then(|v| v.as_str()), Some("hi"));
//! ```

use bytes::Bytes;
use rmpv::Value;

use super::tag;
use crate::codec::MsgPackCodec;
use crate::error::{RibbonError, Result};

/// Structural kind of a frame, derived from its tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Standard,
    ExtractedId,
    Batch,
    Extension,
}

impl FrameKind {
    /// Map a tag byte to its kind.
    pub fn from_tag(tag_byte: u8) -> Result<Self> {
        match tag_byte {
            tag::STANDARD => Ok(FrameKind::Standard),
            tag::EXTRACTED_ID => Ok(FrameKind::ExtractedId),
            tag::BATCH => Ok(FrameKind::Batch),
            tag::EXTENSION => Ok(FrameKind::Extension),
            other => Err(RibbonError::UnknownTag(other)),
        }
    }

    /// Number of bytes this kind consumes before its body.
    #[inline]
    pub fn header_len(self) -> usize {
        match self {
            FrameKind::ExtractedId => tag::EXTRACTED_ID_HEADER_SIZE,
            _ => 1,
        }
    }
}

/// Frame payload: decoded for MsgPack kinds, raw for extensions.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Decoded(Value),
    Raw(Bytes),
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Leading tag byte.
    pub tag: u8,
    /// Kind derived from the tag.
    pub kind: FrameKind,
    /// Sequence id, only for extracted-id frames.
    pub sequence_id: Option<u32>,
    /// Bytes after the tag header.
    pub body: Bytes,
    /// Decoded or raw payload.
    pub payload: Payload,
}

impl Frame {
    /// Decoded payload, if this is not an extension frame.
    pub fn value(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Decoded(v) => Some(v),
            Payload::Raw(_) => None,
        }
    }

    /// Take the decoded payload.
    pub fn into_value(self) -> Option<Value> {
        match self.payload {
            Payload::Decoded(v) => Some(v),
            Payload::Raw(_) => None,
        }
    }

    /// Extension frame whose body is exactly the heartbeat-request byte.
    #[inline]
    pub fn is_heartbeat_request(&self) -> bool {
        self.kind == FrameKind::Extension && self.body[..] == [tag::extension::HEARTBEAT_REQUEST]
    }

    /// Width of the length prefixes in a batch body.
    pub fn length_prefix_width(&self) -> Option<usize> {
        (self.kind == FrameKind::Batch).then_some(tag::BATCH_LENGTH_WIDTH)
    }

    /// Re-split a batch body into its sub-payloads.
    ///
    /// Returns `None` for non-batch frames.
    pub fn sub_payloads(&self) -> Option<Result<Vec<Bytes>>> {
        (self.kind == FrameKind::Batch).then(|| split_batch(&self.body))
    }
}

/// Classify one inbound binary message.
///
/// # Errors
///
/// - [`RibbonError::EmptyFrame`] for a zero-length message
/// - [`RibbonError::UnknownTag`] for an unrecognized leading byte
/// - [`RibbonError::Malformed`] if the header is short or the body does not decode
pub fn classify(message: &[u8]) -> Result<Frame> {
    let tag_byte = *message.first().ok_or(RibbonError::EmptyFrame)?;
    let kind = FrameKind::from_tag(tag_byte)?;

    let header_len = kind.header_len();
    if message.len() < header_len {
        return Err(RibbonError::Malformed(format!(
            "frame 0x{:02X} needs {} header bytes, got {}",
            tag_byte,
            header_len,
            message.len()
        )));
    }
    let body = Bytes::copy_from_slice(&message[header_len..]);

    let (sequence_id, payload) = match kind {
        FrameKind::Extension => (None, Payload::Raw(body.clone())),
        FrameKind::ExtractedId => (
            Some(tag::EXTRACTED_ID_SEQUENCE),
            Payload::Decoded(MsgPackCodec::decode_value(&body)?),
        ),
        FrameKind::Standard | FrameKind::Batch => {
            (None, Payload::Decoded(MsgPackCodec::decode_value(&body)?))
        }
    };

    Ok(Frame {
        tag: tag_byte,
        kind,
        sequence_id,
        body,
        payload,
    })
}

/// Split a batch body into sub-payloads.
///
/// The body is a run of `[u32 BE length][length bytes]` records. A trailing
/// partial record is malformed.
pub fn split_batch(body: &[u8]) -> Result<Vec<Bytes>> {
    let mut parts = Vec::new();
    let mut rest = body;

    while !rest.is_empty() {
        if rest.len() < tag::BATCH_LENGTH_WIDTH {
            return Err(RibbonError::Malformed(format!(
                "batch length prefix truncated ({} bytes left)",
                rest.len()
            )));
        }
        let len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        rest = &rest[tag::BATCH_LENGTH_WIDTH..];

        if rest.len() < len {
            return Err(RibbonError::Malformed(format!(
                "batch record claims {} bytes, {} available",
                len,
                rest.len()
            )));
        }
        parts.push(Bytes::copy_from_slice(&rest[..len]));
        rest = &rest[len..];
    }

    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello() -> Value {
        Value::Map(vec![
            (Value::from("command"), Value::from("hello")),
            (Value::from("data"), Value::Map(vec![])),
        ])
    }

    fn tagged(tag_byte: u8, header: &[u8], value: &Value) -> Vec<u8> {
        let mut bytes = vec![tag_byte];
        bytes.extend_from_slice(header);
        bytes.extend(MsgPackCodec::encode_value(value).unwrap());
        bytes
    }

    #[test]
    fn test_standard_frame() {
        let bytes = tagged(tag::STANDARD, &[], &hello());
        let frame = classify(&bytes).unwrap();

        assert_eq!(frame.tag, 0x45);
        assert_eq!(frame.kind, FrameKind::Standard);
        assert_eq!(frame.sequence_id, None);
        assert_eq!(frame.value(), Some(&hello()));
        assert_eq!(&frame.body[..], &bytes[1..]);
    }

    #[test]
    fn test_extracted_id_frame_skips_four_bytes() {
        let bytes = tagged(tag::EXTRACTED_ID, &[0xDE, 0xAD, 0xBE, 0xEF], &hello());
        let frame = classify(&bytes).unwrap();

        assert_eq!(frame.kind, FrameKind::ExtractedId);
        assert_eq!(frame.sequence_id, Some(174));
        assert_eq!(frame.value(), Some(&hello()));
    }

    #[test]
    fn test_extracted_id_sequence_is_fixed() {
        let a = classify(&tagged(tag::EXTRACTED_ID, &[0, 0, 0, 1], &Value::Nil)).unwrap();
        let b = classify(&tagged(tag::EXTRACTED_ID, &[9, 9, 9, 9], &Value::Nil)).unwrap();
        assert_eq!(a.sequence_id, Some(174));
        assert_eq!(b.sequence_id, Some(174));
    }

    #[test]
    fn test_extracted_id_short_header() {
        let err = classify(&[tag::EXTRACTED_ID, 0, 0]).unwrap_err();
        assert!(err.is_codec());
    }

    #[test]
    fn test_batch_frame_is_decoded_whole() {
        let bytes = tagged(tag::BATCH, &[], &hello());
        let frame = classify(&bytes).unwrap();

        assert_eq!(frame.kind, FrameKind::Batch);
        assert_eq!(frame.length_prefix_width(), Some(4));
        assert_eq!(frame.value(), Some(&hello()));
    }

    #[test]
    fn test_heartbeat_request() {
        let frame = classify(&[0xB0, 0x0C]).unwrap();

        assert_eq!(frame.kind, FrameKind::Extension);
        assert!(frame.is_heartbeat_request());
        assert_eq!(frame.value(), None);
        assert_eq!(frame.payload, Payload::Raw(Bytes::from_static(&[0x0C])));
    }

    #[test]
    fn test_other_extension_bodies_are_not_heartbeat_requests() {
        for body in [&[][..], &[0x0B][..], &[0x0C, 0x00][..], &[0x0D][..]] {
            let mut bytes = vec![tag::EXTENSION];
            bytes.extend_from_slice(body);
            let frame = classify(&bytes).unwrap();
            assert!(!frame.is_heartbeat_request(), "body {:?}", body);
        }
    }

    #[test]
    fn test_unknown_tag() {
        let err = classify(&[0x00, 0x80]).unwrap_err();
        assert!(matches!(err, RibbonError::UnknownTag(0x00)));
        assert!(err.is_protocol());
    }

    #[test]
    fn test_empty_message() {
        assert!(matches!(classify(&[]), Err(RibbonError::EmptyFrame)));
    }

    #[test]
    fn test_truncated_body() {
        let bytes = tagged(tag::STANDARD, &[], &hello());
        let err = classify(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(err.is_codec());
    }

    #[test]
    fn test_split_batch() {
        let mut body = Vec::new();
        for part in [&b"abc"[..], &b""[..], &b"defgh"[..]] {
            body.extend_from_slice(&(part.len() as u32).to_be_bytes());
            body.extend_from_slice(part);
        }

        let parts = split_batch(&body).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(&parts[0][..], b"abc");
        assert!(parts[1].is_empty());
        assert_eq!(&parts[2][..], b"defgh");
    }

    #[test]
    fn test_split_batch_truncated_record() {
        let mut body = 10u32.to_be_bytes().to_vec();
        body.extend_from_slice(b"short");
        assert!(split_batch(&body).unwrap_err().is_codec());

        assert!(split_batch(&[0, 0]).unwrap_err().is_codec());
    }

    #[test]
    fn test_sub_payloads_only_for_batch() {
        let standard = classify(&tagged(tag::STANDARD, &[], &Value::Nil)).unwrap();
        assert!(standard.sub_payloads().is_none());
        assert_eq!(standard.length_prefix_width(), None);
    }
}
