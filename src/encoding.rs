//! Text encoding policy for the file sink and permissive decoding for the
//! live/pattern path.
//!
//! Annotations written to the output file go through an explicit ordered list
//! of encoders; the first that succeeds wins, with raw UTF-8 bytes as the
//! final fallback. Incoming bytes are decoded incrementally and lossily:
//! undecodable sequences are dropped (not replaced) from the decoded view,
//! while the raw bytes still reach the raw sinks untouched.

use std::str;

/// A single text encoding the annotation encoder may try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
}

impl Encoding {
    /// Encode `text` in this encoding, or `None` if it cannot represent it.
    fn encode(self, text: &str) -> Option<Vec<u8>> {
        match self {
            Encoding::Utf8 => Some(text.as_bytes().to_vec()),
            Encoding::Latin1 => {
                let mut out = Vec::with_capacity(text.len());
                for ch in text.chars() {
                    let cp = ch as u32;
                    if cp > 0xFF {
                        return None;
                    }
                    out.push(cp as u8);
                }
                Some(out)
            }
        }
    }
}

/// Default encoder chain for annotation text written to the file sink.
pub const DEFAULT_ENCODERS: &[Encoding] = &[Encoding::Utf8, Encoding::Latin1];

/// Encode `text` with the first encoder in `encoders` that succeeds, falling
/// back to the raw UTF-8 bytes if none can represent it.
pub fn encode_with_fallback(text: &str, encoders: &[Encoding]) -> Vec<u8> {
    for enc in encoders {
        if let Some(bytes) = enc.encode(text) {
            return bytes;
        }
    }
    text.as_bytes().to_vec()
}

/// Incremental UTF-8 decoder that silently drops invalid sequences.
///
/// Bytes are pushed one at a time (the engine reads one byte per iteration);
/// a decoded string fragment comes back as soon as a complete sequence is
/// available. Incomplete trailing sequences stay pending until finished or
/// invalidated.
#[derive(Debug, Default)]
pub struct LossyDecoder {
    pending: Vec<u8>,
}

impl LossyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one byte; returns any text decoded by it.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        self.pending.push(byte);
        let mut out = String::new();
        loop {
            match str::from_utf8(&self.pending) {
                Ok(s) => {
                    out.push_str(s);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if valid > 0 {
                        // Safe: valid_up_to guarantees this prefix is UTF-8.
                        out.push_str(str::from_utf8(&self.pending[..valid]).unwrap_or(""));
                    }
                    match e.error_len() {
                        // Invalid sequence: drop it and keep scanning the rest.
                        Some(bad) => {
                            self.pending.drain(..valid + bad);
                        }
                        // Incomplete sequence: keep it pending.
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_ascii_first_encoder_wins() {
        let bytes = encode_with_fallback("hello", DEFAULT_ENCODERS);
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_encode_latin1_reachable_when_utf8_skipped() {
        // With Latin1 first, é encodes as a single 0xE9 byte.
        let bytes = encode_with_fallback("é", &[Encoding::Latin1]);
        assert_eq!(bytes, vec![0xE9]);
    }

    #[test]
    fn test_encode_latin1_rejects_wide_chars() {
        assert_eq!(Encoding::Latin1.encode("日"), None);
    }

    #[test]
    fn test_encode_raw_fallback_when_all_fail() {
        let bytes = encode_with_fallback("日", &[Encoding::Latin1]);
        assert_eq!(bytes, "日".as_bytes());
    }

    #[test]
    fn test_decoder_ascii_passthrough() {
        let mut dec = LossyDecoder::new();
        assert_eq!(dec.push(b'a'), Some("a".to_string()));
        assert_eq!(dec.push(b'\n'), Some("\n".to_string()));
    }

    #[test]
    fn test_decoder_multibyte_held_until_complete() {
        let mut dec = LossyDecoder::new();
        let bytes = "é".as_bytes();
        assert_eq!(dec.push(bytes[0]), None);
        assert_eq!(dec.push(bytes[1]), Some("é".to_string()));
    }

    #[test]
    fn test_decoder_drops_invalid_byte() {
        let mut dec = LossyDecoder::new();
        assert_eq!(dec.push(0xFF), None);
        assert_eq!(dec.push(b'x'), Some("x".to_string()));
    }

    #[test]
    fn test_decoder_drops_truncated_sequence() {
        let mut dec = LossyDecoder::new();
        // First byte of a 2-byte sequence followed by ASCII: the lead byte
        // is invalidated and dropped, the ASCII byte survives.
        assert_eq!(dec.push(0xC3), None);
        assert_eq!(dec.push(b'z'), Some("z".to_string()));
    }
}
