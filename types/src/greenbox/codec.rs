use bytes::{Buf, BufMut};
use commonware_codec::{Error, ReadExt, Write};

/// Writes a rejection reason as length-prefixed UTF-8 bytes.
pub fn write_reason(s: &str, writer: &mut impl BufMut) {
    let bytes = s.as_bytes();
    (bytes.len() as u16).write(writer);
    writer.put_slice(bytes);
}

/// Reads a rejection reason written by [`write_reason`].
pub fn read_reason(reader: &mut impl Buf, max_len: usize) -> Result<String, Error> {
    let len = u16::read(reader)? as usize;
    if len > max_len {
        return Err(Error::Invalid("Reason", "too long"));
    }
    let bytes = read_bytes(reader, len)?;
    String::from_utf8(bytes).map_err(|_| Error::Invalid("Reason", "invalid UTF-8"))
}

pub fn reason_encode_size(s: &str) -> usize {
    2 + s.len()
}

/// Reads exactly `len` raw bytes (no length prefix).
pub fn read_bytes<B: Buf>(reader: &mut B, len: usize) -> Result<Vec<u8>, Error> {
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    let mut bytes = vec![0u8; len];
    reader.copy_to_slice(&mut bytes);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    #[test]
    fn reason_round_trips() {
        let mut buf = BytesMut::new();
        write_reason("Over Limit", &mut buf);
        assert_eq!(buf.len(), reason_encode_size("Over Limit"));

        let mut reader = buf.as_ref();
        assert_eq!(read_reason(&mut reader, 64).unwrap(), "Over Limit");
    }

    #[test]
    fn read_reason_rejects_too_long() {
        let mut buf = BytesMut::new();
        (5u16).write(&mut buf);
        buf.extend_from_slice(b"hello");

        let mut reader = buf.as_ref();
        let err = read_reason(&mut reader, 4).expect_err("should reject too-long reason");
        assert!(matches!(err, Error::Invalid("Reason", "too long")));
    }

    #[test]
    fn read_reason_rejects_truncated_and_invalid() {
        let mut buf = BytesMut::new();
        (3u16).write(&mut buf);
        buf.extend_from_slice(b"ab");
        let mut reader = buf.as_ref();
        assert!(matches!(read_reason(&mut reader, 10), Err(Error::EndOfBuffer)));

        let mut buf = BytesMut::new();
        (2u16).write(&mut buf);
        buf.extend_from_slice(&[0xff, 0xfe]);
        let mut reader = buf.as_ref();
        assert!(matches!(
            read_reason(&mut reader, 10),
            Err(Error::Invalid("Reason", "invalid UTF-8"))
        ));
    }

    #[test]
    fn read_reason_handles_malformed_inputs() {
        let mut rng = StdRng::seed_from_u64(0x6b0c5);
        for _ in 0..500 {
            let len = (rng.next_u32() as usize) % 256;
            let mut buf = vec![0u8; len];
            rng.fill_bytes(&mut buf);
            let mut reader = buf.as_slice();
            if let Ok(s) = read_reason(&mut reader, 64) {
                assert!(s.len() <= 64);
            }
        }
    }
}
