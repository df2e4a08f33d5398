use std::io::{self, Write};

use crate::constants::record::{
    CFLAG_END, CFLAG_MIDDLE, CFLAG_SHIFT, CFLAG_START, CFLAG_WHOLE, FRAME_ALIGN,
    FRAME_HEADER_LEN, LENGTH_MASK, RECORD_MAGIC,
};
use crate::errors::FaceDataError;
use crate::types::{RecordBytes, RecordKey};

fn align_up(len: usize) -> usize {
    len.div_ceil(FRAME_ALIGN) * FRAME_ALIGN
}

/// Pack `cflag` and `len` into one word; parts longer than 29 bits are rejected.
fn encode_length_word(cflag: u32, len: usize) -> io::Result<u32> {
    match u32::try_from(len) {
        Ok(len) if len <= LENGTH_MASK => Ok((cflag << CFLAG_SHIFT) | len),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("record part of {len} bytes exceeds the {LENGTH_MASK} byte frame limit"),
        )),
    }
}

fn read_word(buf: &[u8], at: usize) -> Option<u32> {
    let bytes = buf.get(at..at + 4)?;
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    Some(u32::from_le_bytes(word))
}

fn write_frame<W: Write>(out: &mut W, cflag: u32, body: &[u8]) -> io::Result<()> {
    let word = encode_length_word(cflag, body.len())?;
    out.write_all(&RECORD_MAGIC.to_le_bytes())?;
    out.write_all(&word.to_le_bytes())?;
    out.write_all(body)
}

/// Write one record as one or more frames and return the number of bytes written.
///
/// Occurrences of the magic word at 4-byte aligned offsets split the record
/// into start/middle/end parts; the magic word itself is dropped from the
/// body and restored by `read_record`.
pub fn write_record<W: Write>(out: &mut W, data: &[u8]) -> io::Result<usize> {
    let magic = RECORD_MAGIC.to_le_bytes();
    let lower_align = (data.len() / FRAME_ALIGN) * FRAME_ALIGN;
    let mut written = 0usize;
    let mut part_start = 0usize;
    let mut at = 0usize;
    while at < lower_align {
        if data[at..at + 4] == magic {
            let cflag = if part_start == 0 {
                CFLAG_START
            } else {
                CFLAG_MIDDLE
            };
            write_frame(out, cflag, &data[part_start..at])?;
            written += FRAME_HEADER_LEN + (at - part_start);
            part_start = at + 4;
        }
        at += FRAME_ALIGN;
    }
    let cflag = if part_start != 0 { CFLAG_END } else { CFLAG_WHOLE };
    let tail = &data[part_start..];
    write_frame(out, cflag, tail)?;
    let padding = align_up(tail.len()) - tail.len();
    out.write_all(&[0u8; FRAME_ALIGN][..padding])?;
    written += FRAME_HEADER_LEN + tail.len() + padding;
    Ok(written)
}

/// Reassemble the record whose first frame starts at `offset` in `buf`.
pub fn read_record(
    buf: &[u8],
    offset: usize,
    key: RecordKey,
) -> Result<RecordBytes, FaceDataError> {
    let malformed = |details: String| FaceDataError::MalformedRecord { key, details };
    let mut out = Vec::new();
    let mut pos = offset;
    let mut first = true;
    loop {
        let magic = read_word(buf, pos)
            .ok_or_else(|| malformed(format!("frame header at offset {pos} is past end of file")))?;
        if magic != RECORD_MAGIC {
            return Err(malformed(format!(
                "bad magic {magic:#010x} at offset {pos}"
            )));
        }
        let word = read_word(buf, pos + 4).ok_or_else(|| {
            malformed(format!(
                "length word at offset {} is past end of file",
                pos + 4
            ))
        })?;
        let cflag = word >> CFLAG_SHIFT;
        let len = (word & LENGTH_MASK) as usize;
        let body_start = pos + FRAME_HEADER_LEN;
        let body = buf.get(body_start..body_start + len).ok_or_else(|| {
            malformed(format!(
                "frame at offset {pos} declares {len} bytes past end of file"
            ))
        })?;
        out.extend_from_slice(body);
        pos = body_start + align_up(len);
        match (first, cflag) {
            (true, CFLAG_WHOLE) | (false, CFLAG_END) => return Ok(out),
            (true, CFLAG_START) | (false, CFLAG_MIDDLE) => {
                out.extend_from_slice(&RECORD_MAGIC.to_le_bytes());
            }
            (_, other) => {
                return Err(malformed(format!(
                    "unexpected continuation flag {other} at offset {}",
                    body_start - FRAME_HEADER_LEN
                )));
            }
        }
        first = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_record_is_padded_to_alignment() {
        let mut buf = Vec::new();
        let written = write_record(&mut buf, b"abcde").unwrap();
        assert_eq!(written, buf.len());
        assert_eq!(buf.len(), FRAME_HEADER_LEN + 8);
        assert_eq!(read_record(&buf, 0, 1).unwrap(), b"abcde");
    }

    #[test]
    fn aligned_magic_splits_record_and_reassembles() {
        let magic = RECORD_MAGIC.to_le_bytes();
        let mut data = b"head".to_vec();
        data.extend_from_slice(&magic);
        data.extend_from_slice(b"mid!");
        data.extend_from_slice(&magic);
        data.extend_from_slice(b"tail");
        let mut buf = Vec::new();
        write_record(&mut buf, &data).unwrap();
        // start + middle + end frames
        assert_eq!(buf.len(), 3 * FRAME_HEADER_LEN + 12);
        assert_eq!(read_record(&buf, 0, 1).unwrap(), data);
    }

    #[test]
    fn unaligned_magic_is_left_inline() {
        let magic = RECORD_MAGIC.to_le_bytes();
        let mut data = b"ab".to_vec();
        data.extend_from_slice(&magic);
        data.extend_from_slice(b"cd");
        let mut buf = Vec::new();
        write_record(&mut buf, &data).unwrap();
        assert_eq!(buf.len(), FRAME_HEADER_LEN + 8);
        assert_eq!(read_record(&buf, 0, 1).unwrap(), data);
    }

    #[test]
    fn consecutive_records_are_addressable_by_offset() {
        let mut buf = Vec::new();
        let first = write_record(&mut buf, b"one").unwrap();
        write_record(&mut buf, b"second").unwrap();
        assert_eq!(read_record(&buf, 0, 0).unwrap(), b"one");
        assert_eq!(read_record(&buf, first, 1).unwrap(), b"second");
    }

    #[test]
    fn read_rejects_bad_magic_and_truncation() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"abcdefgh").unwrap();
        assert!(matches!(
            read_record(&buf, 4, 2),
            Err(FaceDataError::MalformedRecord { key: 2, .. })
        ));
        buf.truncate(buf.len() - 2);
        assert!(read_record(&buf, 0, 2).is_err());
    }

    #[test]
    fn read_rejects_orphan_end_frame() {
        let mut buf = Vec::new();
        write_frame(&mut buf, CFLAG_END, b"tail").unwrap();
        assert!(read_record(&buf, 0, 3).is_err());
    }

    #[test]
    fn length_word_rejects_parts_past_the_mask() {
        let word = encode_length_word(CFLAG_WHOLE, LENGTH_MASK as usize).unwrap();
        assert_eq!(word & LENGTH_MASK, LENGTH_MASK);
        assert_eq!(word >> CFLAG_SHIFT, CFLAG_WHOLE);
        let err = encode_length_word(CFLAG_WHOLE, LENGTH_MASK as usize + 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(encode_length_word(CFLAG_END, usize::MAX).is_err());
    }
}
