//! Wire frame encoding and decoding.
//!
//! A frame carries one encrypted envelope. Two header layouts exist on the
//! wire, all fields big-endian:
//!
//! ```text
//! legacy:   ┌──────────┬─────────────────────┐
//!           │ length:4 │ ciphertext:length   │
//!           └──────────┴─────────────────────┘
//! extended: ┌──────────┬────────┬─────────────────────┐
//!           │ length:4 │ flag:4 │ ciphertext:length   │
//!           └──────────┴────────┴─────────────────────┘
//! ```
//!
//! `length` always equals the ciphertext length measured after any
//! compression and before decryption. The extended layout appeared when
//! compression was added; the length field kept its byte offset, so a
//! decoder reads the two-field window first and falls back to the legacy
//! parse whenever the flag field does not decode to a recognized value.
//! That heuristic keeps old peers interoperable without a protocol version
//! bump.

use std::io::{self, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use thiserror::Error;

use crate::crypto::Encryption;

/// Size of the legacy header (length field only).
pub const LEGACY_HEADER_SIZE: usize = 4;

/// Size of the extended header (length + compression flag).
pub const EXTENDED_HEADER_SIZE: usize = 8;

/// Maximum packet length accepted on either side of the codec.
pub const MAX_PACKET_SIZE: usize = 2_097_152;

/// Wire value of the compression flag for an uncompressed extended frame.
pub const FLAG_NONE: u32 = 1;

/// Wire value of the compression flag for a gzip-compressed frame.
///
/// Flag values are non-zero so a legacy ciphertext starting with four zero
/// bytes cannot be mistaken for an extended header.
pub const FLAG_GZIP: u32 = 2;

/// Compression applied to the ciphertext of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

impl Compression {
    /// Decodes a compression-flag field. `None` means the value is not
    /// recognized and the frame must be parsed as legacy.
    pub fn from_flag(flag: u32) -> Option<Self> {
        match flag {
            FLAG_NONE => Some(Compression::None),
            FLAG_GZIP => Some(Compression::Gzip),
            _ => None,
        }
    }

    /// Wire value of this compression mode.
    pub fn flag(self) -> u32 {
        match self {
            Compression::None => FLAG_NONE,
            Compression::Gzip => FLAG_GZIP,
        }
    }
}

/// Frame codec failure.
///
/// `Framing` means the frame itself is malformed (bad length field,
/// truncated body) and is fatal. `Payload` means the frame was well-formed
/// but its content could not be recovered (decrypt, inflate or JSON parse
/// failure); callers report it and return an empty result instead of
/// tearing the connection down.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("framing error: {0}")]
    Framing(String),

    #[error("{0}")]
    Payload(String),
}

/// A decoded frame: the compression that was detected and the envelope it
/// carried.
#[derive(Debug, Clone, PartialEq)]
pub struct Unpacked {
    pub compression: Compression,
    pub envelope: serde_json::Value,
}

/// Encodes `envelope` into a wire frame.
///
/// The envelope is serialized to JSON and encrypted with `crypto`. With
/// [`Compression::Gzip`] the ciphertext is compressed and the extended
/// header emitted; with [`Compression::None`] the frame keeps the legacy
/// single-field layout so peers predating the flag field still parse it.
pub fn pack(
    envelope: &serde_json::Value,
    key: &str,
    algorithm: &str,
    use_public_key: bool,
    compression: Compression,
    crypto: &dyn Encryption,
) -> Result<Vec<u8>, FrameError> {
    let clear = serde_json::to_vec(envelope)
        .map_err(|e| FrameError::Payload(format!("envelope encode failure: {e}")))?;
    let mut ciphertext = crypto
        .encrypt(&clear, key, algorithm, use_public_key)
        .map_err(|e| FrameError::Payload(format!("encrypt failure: {e}")))?;

    match compression {
        Compression::None => {
            let mut frame = Vec::with_capacity(LEGACY_HEADER_SIZE + ciphertext.len());
            frame.extend_from_slice(&(ciphertext.len() as u32).to_be_bytes());
            frame.append(&mut ciphertext);
            Ok(frame)
        }
        Compression::Gzip => {
            let compressed = gzip_deflate(&ciphertext)
                .map_err(|e| FrameError::Payload(format!("gzip failure: {e}")))?;
            let mut frame = Vec::with_capacity(EXTENDED_HEADER_SIZE + compressed.len());
            frame.extend_from_slice(&(compressed.len() as u32).to_be_bytes());
            frame.extend_from_slice(&FLAG_GZIP.to_be_bytes());
            frame.extend_from_slice(&compressed);
            Ok(frame)
        }
    }
}

/// Decodes a wire frame into its envelope.
///
/// Reads the extended two-field header window first; if the flag field
/// does not decode to a recognized value the frame is treated as legacy:
/// the length is re-read from the shared offset and compression forced to
/// none. A zero or oversized length is a [`FrameError::Framing`]; decrypt
/// and JSON parse failures are [`FrameError::Payload`].
pub fn unpack(
    frame: &[u8],
    key: &str,
    algorithm: &str,
    use_public_key: bool,
    crypto: &dyn Encryption,
) -> Result<Unpacked, FrameError> {
    if frame.len() < LEGACY_HEADER_SIZE {
        return Err(FrameError::Framing(format!(
            "unpack packet failure: frame of {} bytes has no length field",
            frame.len()
        )));
    }

    // The length field shares its offset between both layouts.
    let length = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;

    let (compression, body_offset) = if frame.len() >= EXTENDED_HEADER_SIZE {
        let flag = u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]);
        match Compression::from_flag(flag) {
            Some(compression) => (compression, EXTENDED_HEADER_SIZE),
            None => (Compression::None, LEGACY_HEADER_SIZE),
        }
    } else {
        (Compression::None, LEGACY_HEADER_SIZE)
    };

    if length == 0 {
        return Err(FrameError::Framing(
            "unpack packet failure: length field is zero".to_string(),
        ));
    }
    if length > MAX_PACKET_SIZE {
        return Err(FrameError::Framing(format!(
            "unpack packet failure: length {length} exceeds maximum {MAX_PACKET_SIZE}"
        )));
    }
    let end = body_offset + length;
    if frame.len() < end {
        return Err(FrameError::Framing(format!(
            "unpack packet failure: frame truncated, need {end} bytes, have {}",
            frame.len()
        )));
    }

    let ciphertext = &frame[body_offset..end];
    let inflated;
    let ciphertext = match compression {
        Compression::None => ciphertext,
        Compression::Gzip => {
            inflated = gzip_inflate(ciphertext, MAX_PACKET_SIZE)
                .map_err(|e| FrameError::Payload(format!("inflate failure: {e}")))?;
            &inflated[..]
        }
    };

    let clear = crypto
        .decrypt(ciphertext, key, algorithm, use_public_key)
        .map_err(|e| FrameError::Payload(format!("decrypt failure: {e}")))?;
    let envelope = serde_json::from_slice(&clear)
        .map_err(|e| FrameError::Payload(format!("payload parse failure: {e}")))?;

    Ok(Unpacked {
        compression,
        envelope,
    })
}

/// Reads exactly one frame off a byte stream.
///
/// Returns `Ok(None)` when the stream is cleanly closed before the first
/// header byte (peer hangup). The returned bytes include the header, so
/// they feed straight into [`unpack`]. Mirrors the dual-layout heuristic:
/// after the length field, the next four bytes are consumed as a flag and
/// reinterpreted as body start when they do not decode to a known value.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut length_buf = [0u8; 4];
    match reader.read_exact(&mut length_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let length = u32::from_be_bytes(length_buf) as usize;
    if length > MAX_PACKET_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame length {length} exceeds maximum {MAX_PACKET_SIZE}"),
        ));
    }

    let mut frame = Vec::with_capacity(EXTENDED_HEADER_SIZE + length);
    frame.extend_from_slice(&length_buf);
    if length == 0 {
        // Let unpack raise the framing error on the header-only frame.
        return Ok(Some(frame));
    }

    if length >= 4 {
        let mut flag_buf = [0u8; 4];
        reader.read_exact(&mut flag_buf)?;
        frame.extend_from_slice(&flag_buf);

        let remaining = if Compression::from_flag(u32::from_be_bytes(flag_buf)).is_some() {
            // Extended layout: the flag field precedes the body.
            length
        } else {
            // Legacy layout: those four bytes were the body start.
            length - 4
        };
        read_body(reader, &mut frame, remaining)?;
    } else {
        read_body(reader, &mut frame, length)?;
    }

    Ok(Some(frame))
}

fn read_body<R: Read>(reader: &mut R, frame: &mut Vec<u8>, count: usize) -> io::Result<()> {
    let start = frame.len();
    frame.resize(start + count, 0);
    reader.read_exact(&mut frame[start..])
}

fn gzip_deflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn gzip_inflate(data: &[u8], max_size: usize) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data).take(max_size as u64 + 1);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    if out.len() > max_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("inflated payload exceeds maximum {max_size}"),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CryptoError, Plaintext};
    use serde_json::json;
    use std::io::Cursor;

    /// Stand-in cipher: XOR with the key bytes; the "rsa" algorithm also
    /// reverses the buffer so encrypt and decrypt are not the same
    /// function and key-half mismatches show up in tests.
    struct TestCipher;

    fn xor(data: &[u8], key: &str) -> Vec<u8> {
        data.iter()
            .zip(key.as_bytes().iter().cycle())
            .map(|(b, k)| b ^ k)
            .collect()
    }

    impl Encryption for TestCipher {
        fn encrypt(
            &self,
            plaintext: &[u8],
            key: &str,
            algorithm: &str,
            _use_public_key: bool,
        ) -> Result<Vec<u8>, CryptoError> {
            let mut out = xor(plaintext, key);
            if algorithm == "rsa" {
                out.reverse();
            }
            Ok(out)
        }

        fn decrypt(
            &self,
            ciphertext: &[u8],
            key: &str,
            algorithm: &str,
            _use_public_key: bool,
        ) -> Result<Vec<u8>, CryptoError> {
            let mut buf = ciphertext.to_vec();
            if algorithm == "rsa" {
                buf.reverse();
            }
            Ok(xor(&buf, key))
        }
    }

    fn sample_envelope() -> serde_json::Value {
        json!({
            "p": "UserService",
            "m": "balance",
            "a": ["alice", {"currency": "EUR"}]
        })
    }

    #[test]
    fn test_pack_unpack_roundtrip_symmetric() {
        let envelope = sample_envelope();
        let frame = pack(&envelope, "secret", "aes", true, Compression::None, &TestCipher).unwrap();

        let unpacked = unpack(&frame, "secret", "aes", true, &TestCipher).unwrap();
        assert_eq!(unpacked.compression, Compression::None);
        assert_eq!(unpacked.envelope, envelope);
    }

    #[test]
    fn test_pack_unpack_roundtrip_asymmetric() {
        // Encrypt with the public half, decrypt with the private half.
        let envelope = sample_envelope();
        let frame = pack(&envelope, "keypair", "rsa", true, Compression::None, &TestCipher).unwrap();

        let unpacked = unpack(&frame, "keypair", "rsa", false, &TestCipher).unwrap();
        assert_eq!(unpacked.envelope, envelope);
    }

    #[test]
    fn test_uncompressed_frame_uses_legacy_layout() {
        let envelope = sample_envelope();
        let frame = pack(&envelope, "k", "aes", true, Compression::None, &Plaintext).unwrap();

        let length = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(frame.len(), LEGACY_HEADER_SIZE + length);
    }

    #[test]
    fn test_gzip_roundtrip() {
        let envelope = json!({
            "p": "ReportService",
            "m": "rows",
            "a": [vec!["repetitive data, compresses well"; 64]]
        });
        let frame = pack(&envelope, "secret", "aes", true, Compression::Gzip, &TestCipher).unwrap();

        let flag = u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]);
        assert_eq!(flag, FLAG_GZIP);
        let length = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(frame.len(), EXTENDED_HEADER_SIZE + length);

        let unpacked = unpack(&frame, "secret", "aes", true, &TestCipher).unwrap();
        assert_eq!(unpacked.compression, Compression::Gzip);
        assert_eq!(unpacked.envelope, envelope);
    }

    #[test]
    fn test_legacy_frame_decodes_with_compression_none() {
        // Hand-built frame with only the length header, as an old peer
        // would send it.
        let envelope = sample_envelope();
        let ciphertext = TestCipher
            .encrypt(&serde_json::to_vec(&envelope).unwrap(), "k", "aes", true)
            .unwrap();
        let mut frame = (ciphertext.len() as u32).to_be_bytes().to_vec();
        frame.extend_from_slice(&ciphertext);

        let unpacked = unpack(&frame, "k", "aes", true, &TestCipher).unwrap();
        assert_eq!(unpacked.compression, Compression::None);
        assert_eq!(unpacked.envelope, envelope);
    }

    #[test]
    fn test_extended_frame_with_none_flag() {
        // A newer peer may send the extended header with compression off.
        let envelope = sample_envelope();
        let ciphertext = serde_json::to_vec(&envelope).unwrap();
        let mut frame = (ciphertext.len() as u32).to_be_bytes().to_vec();
        frame.extend_from_slice(&FLAG_NONE.to_be_bytes());
        frame.extend_from_slice(&ciphertext);

        let unpacked = unpack(&frame, "k", "aes", true, &Plaintext).unwrap();
        assert_eq!(unpacked.compression, Compression::None);
        assert_eq!(unpacked.envelope, envelope);
    }

    #[test]
    fn test_zero_length_is_framing_error() {
        let frame = 0u32.to_be_bytes().to_vec();
        let err = unpack(&frame, "k", "aes", true, &Plaintext).unwrap_err();
        assert!(matches!(err, FrameError::Framing(_)), "got {err:?}");
    }

    #[test]
    fn test_short_frame_is_framing_error() {
        let err = unpack(&[0x01, 0x02], "k", "aes", true, &Plaintext).unwrap_err();
        assert!(matches!(err, FrameError::Framing(_)));
    }

    #[test]
    fn test_oversized_length_is_framing_error() {
        let mut frame = ((MAX_PACKET_SIZE + 1) as u32).to_be_bytes().to_vec();
        frame.extend_from_slice(b"body");
        let err = unpack(&frame, "k", "aes", true, &Plaintext).unwrap_err();
        assert!(matches!(err, FrameError::Framing(_)));
    }

    #[test]
    fn test_truncated_frame_is_framing_error() {
        let envelope = sample_envelope();
        let frame = pack(&envelope, "k", "aes", true, Compression::None, &Plaintext).unwrap();
        let err = unpack(&frame[..frame.len() - 1], "k", "aes", true, &Plaintext).unwrap_err();
        assert!(matches!(err, FrameError::Framing(_)));
    }

    #[test]
    fn test_garbage_payload_is_payload_error() {
        let body = b"\xff\xfe\xfd\xfc not json";
        let mut frame = (body.len() as u32).to_be_bytes().to_vec();
        frame.extend_from_slice(body);
        let err = unpack(&frame, "k", "aes", true, &Plaintext).unwrap_err();
        assert!(matches!(err, FrameError::Payload(_)), "got {err:?}");
    }

    #[test]
    fn test_read_frame_legacy() {
        let envelope = sample_envelope();
        let frame = pack(&envelope, "k", "aes", true, Compression::None, &TestCipher).unwrap();

        let mut cursor = Cursor::new(frame.clone());
        let read = read_frame(&mut cursor).unwrap().unwrap();
        assert_eq!(read, frame);
        assert_eq!(cursor.position() as usize, frame.len());
    }

    #[test]
    fn test_read_frame_extended() {
        let envelope = sample_envelope();
        let frame = pack(&envelope, "k", "aes", true, Compression::Gzip, &TestCipher).unwrap();

        let mut cursor = Cursor::new(frame.clone());
        let read = read_frame(&mut cursor).unwrap().unwrap();
        assert_eq!(read, frame);
    }

    #[test]
    fn test_read_frame_stops_at_frame_boundary() {
        let first = pack(&json!({"n": 1}), "k", "aes", true, Compression::None, &Plaintext).unwrap();
        let second = pack(&json!({"n": 2}), "k", "aes", true, Compression::None, &Plaintext).unwrap();
        let mut stream = first.clone();
        stream.extend_from_slice(&second);

        let mut cursor = Cursor::new(stream);
        assert_eq!(read_frame(&mut cursor).unwrap().unwrap(), first);
        assert_eq!(read_frame(&mut cursor).unwrap().unwrap(), second);
        assert_eq!(read_frame(&mut cursor).unwrap(), None);
    }

    #[test]
    fn test_read_frame_clean_eof_is_none() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert_eq!(read_frame(&mut cursor).unwrap(), None);
    }

    #[test]
    fn test_read_frame_rejects_oversized_length() {
        let data = ((MAX_PACKET_SIZE + 1) as u32).to_be_bytes().to_vec();
        let mut cursor = Cursor::new(data);
        let err = read_frame(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_read_frame_mid_frame_eof_is_error() {
        let frame = pack(&sample_envelope(), "k", "aes", true, Compression::None, &Plaintext).unwrap();
        let mut cursor = Cursor::new(frame[..frame.len() - 2].to_vec());
        let err = read_frame(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
