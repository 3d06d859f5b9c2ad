//! JSON wire codec.
//!
//! Every logical message is one JSON object. Outbound, several queued
//! messages may share one text frame, separated by `\n`. Inbound, a frame
//! always carries exactly one object, which may span several lines.

use beacon_core::error::AppError;
use beacon_core::result::AppResult;

use super::types::Message;

/// Separator between coalesced messages in one frame.
pub const SEPARATOR: char = '\n';

/// Encode a message as a single JSON object.
pub fn encode(message: &Message) -> AppResult<String> {
    Ok(serde_json::to_string(message)?)
}

/// Decode one JSON object into a message.
pub fn decode(raw: &str) -> AppResult<Message> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::protocol(format!("Malformed message: {e}")))
}

/// Encode a batch of messages into one frame payload.
pub fn coalesce(messages: &[Message]) -> AppResult<String> {
    let mut out = String::new();
    for (i, message) in messages.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.push_str(&encode(message)?);
    }
    Ok(out)
}

/// Decode an inbound frame payload as a single message.
///
/// Raw line breaks are folded into spaces first. JSON strings cannot hold a
/// raw line break, so this only touches insignificant whitespace.
pub fn decode_frame(payload: &str) -> AppResult<Message> {
    let folded = payload.replace(['\r', '\n'], " ");
    decode(folded.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let json = encode(&Message::new(3, "hi")).unwrap();
        assert_eq!(json, r#"{"type":3,"content":"hi"}"#);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(decode("{").is_err());
        assert!(decode(r#"{"type":-1,"content":"x"}"#).is_err());
        assert!(decode(r#"{"content":"x"}"#).is_err());
        let err = decode("not json").unwrap_err();
        assert_eq!(err.kind, beacon_core::error::ErrorKind::Protocol);
    }

    #[test]
    fn test_coalesce_separates_with_newline() {
        let batch = vec![
            Message::new(1, "first\nline"),
            Message::new(2, ""),
            Message::new(1, "third"),
        ];
        let frame = coalesce(&batch).unwrap();
        assert_eq!(frame.matches(SEPARATOR).count(), 2);

        let decoded: Vec<Message> = frame.split(SEPARATOR).map(|l| decode(l).unwrap()).collect();
        assert_eq!(decoded, batch);
    }

    #[test]
    fn test_decode_frame_accepts_multi_line_object() {
        let pretty = "{\r\n  \"type\": 4,\n  \"content\": \"a\\nb\"\n}\n";
        assert_eq!(decode_frame(pretty).unwrap(), Message::new(4, "a\nb"));
    }

    #[test]
    fn test_decode_frame_rejects_two_objects() {
        let err = decode_frame("{\"type\":1,\"content\":\"a\"}\n{\"type\":1,\"content\":\"b\"}")
            .unwrap_err();
        assert_eq!(err.kind, beacon_core::error::ErrorKind::Protocol);
    }
}
