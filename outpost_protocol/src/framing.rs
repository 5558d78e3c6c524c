// Length-delimited message framing over TCP.
//
// Wire format for `message.rs` types: a 2-byte big-endian length prefix
// followed by a UTF-8 JSON payload. Both `write_frame` and `read_frame`
// operate on raw `&[u8]` / `Vec<u8>` — the caller handles JSON serialization
// separately, keeping this module format-agnostic.
//
// `MAX_FRAME_SIZE` (4096 bytes) bounds both directions: an encoder error on
// write, a connection-level `InvalidData` error on read. A zero length prefix
// is likewise a connection-level error on read — no legal message is empty,
// so it can only mean a desynchronized or hostile peer.

use std::io::{self, Read, Write};

/// Maximum allowed frame payload size in bytes. World snapshots are the
/// largest expected messages and fit comfortably.
pub const MAX_FRAME_SIZE: u16 = 4096;

/// Write a length-delimited frame: 2-byte big-endian length, then payload.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = payload.len();
    if len > usize::from(MAX_FRAME_SIZE) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame too large: {len} bytes (max {MAX_FRAME_SIZE})"),
        ));
    }
    #[expect(clippy::cast_possible_truncation)]
    let len_bytes = (len as u16).to_be_bytes();
    writer.write_all(&len_bytes)?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read a length-delimited frame: 2-byte big-endian length, then payload.
///
/// Returns `UnexpectedEof` if the stream closes cleanly before or during a
/// frame. Returns `InvalidData` for a zero length or one exceeding
/// `MAX_FRAME_SIZE`. Partial reads are retried internally by `read_exact`;
/// the caller never sees a short frame.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 2];
    reader.read_exact(&mut len_buf)?;
    let len = u16::from_be_bytes(len_buf);
    if len == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "zero-length frame",
        ));
    }
    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes (max {MAX_FRAME_SIZE})"),
        ));
    }
    let mut buf = vec![0u8; usize::from(len)];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_simple_frame() {
        let original = b"{\"action\":\"heartbeat\"}";
        let mut buf = Vec::new();
        write_frame(&mut buf, original).unwrap();

        let mut cursor = Cursor::new(&buf);
        let recovered = read_frame(&mut cursor).unwrap();
        assert_eq!(recovered, original);
    }

    #[test]
    fn rejects_oversized_write() {
        let big = vec![0u8; usize::from(MAX_FRAME_SIZE) + 1];
        let mut buf = Vec::new();
        let err = write_frame(&mut buf, &big).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn accepts_max_sized_write() {
        let max = vec![b'x'; usize::from(MAX_FRAME_SIZE)];
        let mut buf = Vec::new();
        write_frame(&mut buf, &max).unwrap();

        let mut cursor = Cursor::new(&buf);
        let recovered = read_frame(&mut cursor).unwrap();
        assert_eq!(recovered.len(), usize::from(MAX_FRAME_SIZE));
    }

    #[test]
    fn rejects_oversized_read() {
        // Craft a length prefix that exceeds MAX_FRAME_SIZE.
        let fake_len = (MAX_FRAME_SIZE + 1).to_be_bytes();
        let mut cursor = Cursor::new(fake_len.to_vec());
        let err = read_frame(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn rejects_zero_length_read() {
        let mut cursor = Cursor::new(vec![0u8, 0]);
        let err = read_frame(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn read_unexpected_eof() {
        // Only 1 byte when 2 are needed for the length prefix.
        let mut cursor = Cursor::new(vec![0u8]);
        let err = read_frame(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn read_truncated_payload() {
        // Length says 5 bytes but only 2 follow.
        let mut wire = 5u16.to_be_bytes().to_vec();
        wire.extend_from_slice(b"ab");
        let mut cursor = Cursor::new(wire);
        let err = read_frame(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn multiple_frames_in_sequence() {
        let frames: Vec<&[u8]> = vec![b"first", b"second", b"third"];
        let mut buf = Vec::new();
        for frame in &frames {
            write_frame(&mut buf, frame).unwrap();
        }

        let mut cursor = Cursor::new(&buf);
        for expected in &frames {
            let recovered = read_frame(&mut cursor).unwrap();
            assert_eq!(recovered, *expected);
        }
    }
}
