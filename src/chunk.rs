use std::str;

use crate::util::{append_hex, find_crlf};
use crate::Error;

/// Write one chunk of `Transfer-Encoding: chunked` framing.
pub(crate) fn write_chunk(out: &mut Vec<u8>, data: &[u8]) {
    // A zero length chunk would end the body.
    if data.is_empty() {
        return;
    }
    append_hex(out, data.len());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
}

pub(crate) const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

/// Incremental decoder of chunked bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dechunker {
    Size,
    Chunk(usize),
    CrLf,
    Ending,
    Trailer,
    Ended,
}

impl Dechunker {
    pub fn new() -> Self {
        Dechunker::Size
    }

    /// Decode as much of `src` as possible, appending the data to `dst`.
    ///
    /// Returns how many bytes of `src` were used.
    pub fn parse_input(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<usize, Error> {
        let mut index_in = 0;

        loop {
            let more = match self {
                Dechunker::Size => self.read_size(src, &mut index_in)?,
                Dechunker::Chunk(_) => self.read_data(src, dst, &mut index_in),
                Dechunker::CrLf => self.expect_crlf(src, &mut index_in)?,
                Dechunker::Ending => self.trailer_or_ended(src, &mut index_in),
                Dechunker::Trailer => self.trailer(src, &mut index_in),
                Dechunker::Ended => false,
            };

            if !more {
                break;
            }
        }

        Ok(index_in)
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }

    fn read_size(&mut self, src: &[u8], index_in: &mut usize) -> Result<bool, Error> {
        let src = &src[*index_in..];

        const SANITY_CHECK: usize = 20;

        let i = match find_crlf(src) {
            Some(v) => v,
            None => {
                if src.len() > SANITY_CHECK + 100 {
                    return Err(Error::ChunkExpectedCrLf);
                }
                return Ok(false);
            }
        };

        // Chunk extensions after ';' are ignored.
        let len_end = src[..i].iter().position(|c| *c == b';').unwrap_or(i);

        if len_end > SANITY_CHECK {
            return Err(Error::ChunkExpectedCrLf);
        }

        let len_str = str::from_utf8(&src[..len_end]).map_err(|_| Error::ChunkLenNotAscii)?;

        let len = usize::from_str_radix(len_str.trim(), 16).map_err(|_| Error::ChunkLenNotANumber)?;

        *index_in += i + 2;
        *self = if len == 0 {
            Self::Ending
        } else {
            Self::Chunk(len)
        };

        Ok(true)
    }

    fn read_data(&mut self, src: &[u8], dst: &mut Vec<u8>, index_in: &mut usize) -> bool {
        let src = &src[*index_in..];

        let Self::Chunk(left) = self else {
            return false;
        };

        let to_read = src.len().min(*left);

        dst.extend_from_slice(&src[..to_read]);
        *index_in += to_read;
        *left -= to_read;

        if *left == 0 {
            *self = Self::CrLf;
        }

        to_read > 0
    }

    fn expect_crlf(&mut self, src: &[u8], index_in: &mut usize) -> Result<bool, Error> {
        let src = &src[*index_in..];

        if src.len() < 2 {
            return Ok(false);
        }

        if &src[..2] != b"\r\n" {
            return Err(Error::ChunkExpectedCrLf);
        }

        *index_in += 2;
        *self = Self::Size;

        Ok(true)
    }

    fn trailer_or_ended(&mut self, src: &[u8], index_in: &mut usize) -> bool {
        let src = &src[*index_in..];

        let i = match find_crlf(src) {
            Some(v) => v,
            None => return false,
        };

        if i == 0 {
            *index_in += 2;
            *self = Self::Ended;
        } else {
            *self = Self::Trailer;
        }

        true
    }

    fn trailer(&mut self, src: &[u8], index_in: &mut usize) -> bool {
        let src = &src[*index_in..];

        let i = match find_crlf(src) {
            Some(v) => v,
            None => return false,
        };

        // Trailer headers are dropped.
        *index_in += i + 2;
        *self = Self::Ending;

        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    impl Dechunker {
        fn left(&self) -> usize {
            if let Self::Chunk(l) = self {
                *l
            } else {
                0
            }
        }
    }

    #[test]
    fn test_dechunk_size() -> Result<(), Error> {
        let mut d = Dechunker::new();
        let mut b = vec![];
        assert_eq!(d.parse_input(b"", &mut b)?, 0);
        assert_eq!(d.parse_input(b"2", &mut b)?, 0);
        assert_eq!(d.parse_input(b"2\r", &mut b)?, 0);
        assert_eq!(d.left(), 0);
        assert_eq!(d.parse_input(b"2\r\n", &mut b)?, 3);
        assert_eq!(d.left(), 2);
        assert!(b.is_empty());
        Ok(())
    }

    #[test]
    fn test_dechunk_size_meta() -> Result<(), Error> {
        let mut d = Dechunker::new();
        let mut b = vec![];
        assert_eq!(d.parse_input(b"2;meta\r", &mut b)?, 0);
        assert_eq!(d.parse_input(b"2;meta\r\n", &mut b)?, 8);
        assert_eq!(d.left(), 2);
        Ok(())
    }

    #[test]
    fn test_dechunk_data_with_semicolon() -> Result<(), Error> {
        let mut d = Dechunker::new();
        let mut b = vec![];
        assert_eq!(d.parse_input(b"9\r\nnot meta;\r\n", &mut b)?, 14);
        assert_eq!(b, b"not meta;");
        Ok(())
    }

    #[test]
    fn test_dechunk_to_end() -> Result<(), Error> {
        let mut d = Dechunker::new();
        let mut b = vec![];
        assert_eq!(d.parse_input(b"2\r\nOK", &mut b)?, 5);
        assert_eq!(b, b"OK");
        assert_eq!(d.parse_input(b"\r\n", &mut b)?, 2);
        assert!(!d.is_ended());
        assert_eq!(d.parse_input(b"0\r\n", &mut b)?, 3);
        assert!(!d.is_ended());
        assert_eq!(d.parse_input(b"\r\n", &mut b)?, 2);
        assert!(d.is_ended());
        Ok(())
    }

    #[test]
    fn test_dechunk_trailer() -> Result<(), Error> {
        let mut d = Dechunker::new();
        let mut b = vec![];
        let input = b"3\r\nabc\r\n0\r\nX-Trailer: 1\r\n\r\nNEXT";
        let used = d.parse_input(input, &mut b)?;
        assert_eq!(&input[used..], b"NEXT");
        assert!(d.is_ended());
        assert_eq!(b, b"abc");
        Ok(())
    }

    #[test]
    fn test_dechunk_bad_length() {
        let mut d = Dechunker::new();
        let mut b = vec![];
        assert!(matches!(
            d.parse_input(b"xyz\r\n", &mut b),
            Err(Error::ChunkLenNotANumber)
        ));
    }

    #[test]
    fn test_write_chunk() {
        let mut out = vec![];
        write_chunk(&mut out, b"hello world, this!");
        write_chunk(&mut out, b"");
        out.extend_from_slice(LAST_CHUNK);
        assert_eq!(out, b"12\r\nhello world, this!\r\n0\r\n\r\n");
    }
}
