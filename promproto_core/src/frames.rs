//! Splits a length-delimited protobuf stream into message payloads.
//!
//! Every message is prefixed by its length as an unsigned LEB128 varint.
//! A stream scraped from a live endpoint may end mid-frame, so decoding simply
//! stops at the first prefix or payload that can't be read in full.

use unsigned_varint::encode;

/// Read a varint from the start of `input`.
///
/// Returns the value and the number of bytes it occupied, or `None` if the
/// input ends before the varint does or the value overflows 64 bits.
/// Padded (non-minimal) encodings such as `[0x83, 0x00]` are accepted.
pub fn read_varint(input: &[u8]) -> Option<(u64, usize)> {
    let mut tail = input;
    let value = prost::encoding::decode_varint(&mut tail).ok()?;
    Some((value, input.len() - tail.len()))
}

/// Append `value` to `output` as a varint
pub fn write_varint(value: u64, output: &mut Vec<u8>) {
    let mut buffer = encode::u64_buffer();
    output.extend_from_slice(encode::u64(value, &mut buffer));
}

/// A single message payload and its position in the stream
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Frame<'a> {
    /// Byte offset of the payload (after the length prefix)
    pub offset: usize,
    pub payload: &'a [u8],
}

/// Iterator over the frames of a length-delimited stream.
pub struct Frames<'a> {
    input: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> Frames<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            done: false,
        }
    }

    /// The number of bytes not (yet) consumed by a complete frame.
    ///
    /// Once the iterator is exhausted, a non-zero value means the stream was truncated
    /// or contained a prefix that couldn't be honored.
    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Frame<'a>;

    fn next(&mut self) -> Option<Frame<'a>> {
        if self.done || self.pos >= self.input.len() {
            return None;
        }

        let tail = &self.input[self.pos..];
        let (len, prefix) = match read_varint(tail) {
            Some((len, prefix)) if len > 0 => (len, prefix),
            _ => {
                self.done = true;
                return None;
            }
        };

        let available = (tail.len() - prefix) as u64;
        if len > available {
            self.done = true;
            return None;
        }

        let offset = self.pos + prefix;
        let end = offset + len as usize;
        self.pos = end;
        Some(Frame {
            offset,
            payload: &self.input[offset..end],
        })
    }
}

/// Split `input` into message payloads, stopping at the first incomplete frame.
pub fn split(input: &[u8]) -> Vec<&[u8]> {
    Frames::new(input).map(|frame| frame.payload).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn framed(messages: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for msg in messages {
            write_varint(msg.len() as u64, &mut out);
            out.extend_from_slice(msg);
        }
        out
    }

    #[test]
    fn varint_encoding_matches_leb128() {
        let mut out = Vec::new();
        write_varint(5, &mut out);
        assert_eq!(out, vec![0x05]);
        assert_eq!(read_varint(&out), Some((5, 1)));

        let mut out = Vec::new();
        write_varint(300, &mut out);
        assert_eq!(out, vec![0xAC, 0x02]);
        assert_eq!(read_varint(&out), Some((300, 2)));

        // Trailing bytes aren't consumed
        assert_eq!(read_varint(&[0xAC, 0x02, 0xFF]), Some((300, 2)));
    }

    #[test]
    fn varint_rejects_incomplete_and_overflowing_input() {
        assert_eq!(read_varint(&[]), None);
        assert_eq!(read_varint(&[0x80]), None);
        assert_eq!(read_varint(&[0xFF, 0xFF]), None);
        assert_eq!(read_varint(&[0xFF; 11]), None);
    }

    #[test]
    fn padded_prefix_is_honored() {
        assert_eq!(read_varint(&[0x83, 0x00]), Some((3, 2)));
        assert_eq!(read_varint(&[0x85, 0x80, 0x80, 0x00]), Some((5, 4)));

        let mut input = vec![0x83, 0x00, b'a', b'b', b'c'];
        input.extend(framed(&[b"next"]));
        assert_eq!(split(&input), vec![&b"abc"[..], &b"next"[..]]);
    }

    #[test]
    fn splits_well_formed_stream() {
        let messages: [&[u8]; 3] = [b"first", &[0u8; 200], b"x"];
        let input = framed(&messages);

        let mut frames = Frames::new(&input);
        let collected = frames.by_ref().collect::<Vec<_>>();
        assert_eq!(collected.len(), 3);
        assert_eq!(collected[0].offset, 1);
        assert_eq!(collected[0].payload, b"first");
        assert_eq!(collected[1].offset, 1 + 5 + 2);
        assert_eq!(collected[1].payload.len(), 200);
        assert_eq!(collected[2].payload, b"x");
        assert_eq!(frames.remaining(), 0);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(split(&[]).is_empty());
    }

    #[test]
    fn zero_length_prefix_stops_decoding() {
        let mut input = framed(&[b"abc"]);
        input.push(0x00);
        input.extend(framed(&[b"never"]));

        let mut frames = Frames::new(&input);
        assert_eq!(frames.next().map(|f| f.payload), Some(&b"abc"[..]));
        assert_eq!(frames.next(), None);
        assert_eq!(frames.next(), None);
        assert_eq!(frames.remaining(), 1 + 1 + 5);
    }

    #[test]
    fn oversized_prefix_never_emits_partial_payload() {
        let mut input = framed(&[b"abc"]);
        input.push(10);
        input.extend_from_slice(b"short");

        let mut frames = Frames::new(&input);
        let payloads = frames.by_ref().map(|f| f.payload).collect::<Vec<_>>();
        assert_eq!(payloads, vec![&b"abc"[..]]);
        assert_eq!(frames.remaining(), 6);
    }

    #[test]
    fn truncated_prefix_keeps_earlier_frames() {
        let mut input = framed(&[b"one", b"two"]);
        input.push(0x80);

        assert_eq!(split(&input), vec![&b"one"[..], &b"two"[..]]);
    }

    #[test]
    fn consumed_bytes_never_exceed_input() {
        let input = framed(&[b"abcdef", b"ghi"]);
        for end in 0..=input.len() {
            let slice = &input[..end];
            let mut frames = Frames::new(slice);
            let consumed: usize = frames.by_ref().map(|f| f.payload.len() + 1).sum();
            assert!(consumed <= slice.len());
            assert_eq!(consumed + frames.remaining(), slice.len());
        }
    }
}
