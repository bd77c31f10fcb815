// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::cmp::min;
use std::convert::TryInto;

use thiserror::Error;

/// Largest byte slice (or element count) the decoder will accept.
pub const MAX_SLICE_SIZE: usize = 5_000_000;

/// Largest length representable by the compact length prefix.
pub const MAX_COMPACT_LEN: usize = (1 << 29) - 1;

/// The two binary encoding families.
///
/// Both agree on integers (little-endian, fixed width) and booleans,
/// but differ in how lengths, public keys and currencies are framed.
/// Hashes are always computed over the `Classic` encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Every length is prefixed as an 8-byte unsigned integer.
    Classic,
    /// Lengths are prefixed with 1 to 4 bytes, depending on their size.
    Compact,
}

impl Default for Codec {
    fn default() -> Self {
        Codec::Classic
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },
    #[error("{0} trailing bytes after decoding")]
    TrailingBytes(usize),
    #[error("invalid boolean value {0}")]
    InvalidBool(u8),
    #[error("slice of length {0} exceeds maximum of {}", MAX_SLICE_SIZE)]
    SliceTooLarge(usize),
    #[error("length {0} cannot be represented with a compact prefix")]
    LengthOverflow(usize),
    #[error("non-canonical compact length prefix for length {0}")]
    NonCanonicalLength(usize),
    #[error("wrong length: expected {expected}, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Implemented by every object that has a canonical binary representation.
pub trait Encodable {
    fn encode(&self, e: &mut Encoder);
}

/// Inverse of `Encodable`.
pub trait Decodable: Sized {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError>;
}

/// Accumulates the binary encoding of one or more objects.
pub struct Encoder {
    codec: Codec,
    buf: Vec<u8>,
    err: Option<CodecError>,
}

impl Encoder {
    pub fn new(codec: Codec) -> Self {
        Self {
            codec,
            buf: Vec::new(),
            err: None,
        }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    /// Writes raw bytes without any length prefix.
    pub fn write_fixed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Writes a length (or element count) prefix in the framing of the active codec.
    pub fn write_len(&mut self, len: usize) {
        match self.codec {
            Codec::Classic => self.write_u64(len as u64),
            Codec::Compact => match compact_len(len) {
                Ok(prefix) => self.buf.extend_from_slice(&prefix),
                Err(err) => self.fail(err),
            },
        }
    }

    /// Records an error for values the active codec cannot represent.
    /// Only the first error is kept and reported by `finish`.
    pub fn fail(&mut self, err: CodecError) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    /// Writes a length-prefixed byte slice.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.write_len(data.len());
        self.write_fixed(data);
    }

    pub fn write<T: Encodable + ?Sized>(&mut self, obj: &T) {
        obj.encode(self);
    }

    /// Encodes the output of `f` with the active codec, then writes it as a length-prefixed slice.
    pub fn write_nested(&mut self, f: impl FnOnce(&mut Encoder)) {
        let mut inner = Encoder::new(self.codec);
        f(&mut inner);
        if let Some(err) = inner.err {
            self.fail(err);
        }
        self.write_bytes(&inner.buf);
    }

    /// Returns the encoded bytes, or the first error hit while encoding.
    pub fn finish(self) -> Result<Vec<u8>, CodecError> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(self.buf),
        }
    }
}

/// Reads objects from a byte slice.
#[derive(Clone)]
pub struct Decoder<'a> {
    codec: Codec,
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(codec: Codec, data: &'a [u8]) -> Self {
        Self { codec, data, pos: 0 }
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_fixed(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0; N];
        out.copy_from_slice(self.read_fixed(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_fixed(1)?[0])
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(CodecError::InvalidBool(b)),
        }
    }

    /// Reads a length prefix in the framing of the active codec.
    pub fn read_len(&mut self) -> Result<usize, CodecError> {
        let len = match self.codec {
            Codec::Classic => {
                let len = self.read_u64()?;
                if len > MAX_SLICE_SIZE as u64 {
                    return Err(CodecError::SliceTooLarge(min(len, usize::MAX as u64) as usize));
                }
                len as usize
            }
            Codec::Compact => self.read_compact_len()?,
        };
        if len > MAX_SLICE_SIZE {
            return Err(CodecError::SliceTooLarge(len));
        }
        Ok(len)
    }

    fn read_compact_len(&mut self) -> Result<usize, CodecError> {
        let first = self.data.get(self.pos).copied().ok_or(CodecError::UnexpectedEof {
            needed: 1,
            remaining: 0,
        })?;
        let (width, shift) = if first & 1 == 0 {
            (1, 1)
        } else if first & 2 == 0 {
            (2, 2)
        } else if first & 4 == 0 {
            (3, 3)
        } else {
            (4, 3)
        };
        let mut buf = [0; 4];
        buf[..width].copy_from_slice(self.read_fixed(width)?);
        let len = (u32::from_le_bytes(buf) >> shift) as usize;
        if compact_len_width(len) != width {
            return Err(CodecError::NonCanonicalLength(len));
        }
        Ok(len)
    }

    /// Reads a length-prefixed byte slice.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_len()?;
        Ok(self.read_fixed(len)?.to_vec())
    }

    /// Consumes everything that is left.
    pub fn read_rest(&mut self) -> Vec<u8> {
        let out = self.data[self.pos..].to_vec();
        self.pos = self.data.len();
        out
    }

    pub fn read<T: Decodable>(&mut self) -> Result<T, CodecError> {
        T::decode(self)
    }

    /// Reads a length-prefixed slice and decodes it in full with `f`.
    pub fn read_nested<T>(
        &mut self,
        f: impl FnOnce(&mut Decoder<'a>) -> Result<T, CodecError>,
    ) -> Result<T, CodecError> {
        let len = self.read_len()?;
        let body = self.read_fixed(len)?;
        let mut inner = Decoder::new(self.codec, body);
        let out = f(&mut inner)?;
        inner.finish()?;
        Ok(out)
    }

    /// Fails if any bytes were left unread.
    pub fn finish(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

fn compact_len_width(len: usize) -> usize {
    if len < 1 << 7 {
        1
    } else if len < 1 << 14 {
        2
    } else if len < 1 << 21 {
        3
    } else {
        4
    }
}

fn compact_len(len: usize) -> Result<Vec<u8>, CodecError> {
    if len > MAX_COMPACT_LEN {
        return Err(CodecError::LengthOverflow(len));
    }
    let v = len as u32;
    let prefix = match compact_len_width(len) {
        1 => vec![(v << 1) as u8],
        2 => ((1 | v << 2) as u16).to_le_bytes().to_vec(),
        3 => (3 | v << 3).to_le_bytes()[..3].to_vec(),
        _ => (7 | v << 3).to_le_bytes().to_vec(),
    };
    Ok(prefix)
}

/// Encodes an object with the given codec.
pub fn encode(codec: Codec, x: &(impl Encodable + ?Sized)) -> Result<Vec<u8>, CodecError> {
    let mut e = Encoder::new(codec);
    x.encode(&mut e);
    e.finish()
}

/// Encodes an object with the classic codec, which cannot fail.
pub fn encode_classic(x: &(impl Encodable + ?Sized)) -> Vec<u8> {
    let mut e = Encoder::new(Codec::Classic);
    x.encode(&mut e);
    e.buf
}

/// Decodes an object that must span all of `bytes`.
pub fn decode<T: Decodable>(codec: Codec, bytes: &[u8]) -> Result<T, CodecError> {
    let mut d = Decoder::new(codec, bytes);
    let out = T::decode(&mut d)?;
    d.finish()?;
    Ok(out)
}

impl Encodable for u8 {
    fn encode(&self, e: &mut Encoder) {
        e.write_u8(*self);
    }
}

impl Decodable for u8 {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        d.read_u8()
    }
}

impl Encodable for u64 {
    fn encode(&self, e: &mut Encoder) {
        e.write_u64(*self);
    }
}

impl Decodable for u64 {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        d.read_u64()
    }
}

impl Encodable for bool {
    fn encode(&self, e: &mut Encoder) {
        e.write_bool(*self);
    }
}

impl Decodable for bool {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        d.read_bool()
    }
}

impl<const N: usize> Encodable for [u8; N] {
    fn encode(&self, e: &mut Encoder) {
        e.write_fixed(self);
    }
}

impl<const N: usize> Decodable for [u8; N] {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        d.read_array()
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn encode(&self, e: &mut Encoder) {
        self.as_slice().encode(e);
    }
}

impl<T: Encodable> Encodable for [T] {
    fn encode(&self, e: &mut Encoder) {
        e.write_len(self.len());
        for x in self {
            x.encode(e);
        }
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        let len = d.read_len()?;
        // every element takes at least one byte
        let mut out = Vec::with_capacity(min(len, d.remaining()));
        for _ in 0..len {
            out.push(T::decode(d)?);
        }
        Ok(out)
    }
}

impl<T: Encodable + ?Sized> Encodable for &T {
    fn encode(&self, e: &mut Encoder) {
        (*self).encode(e);
    }
}

impl Encodable for usize {
    fn encode(&self, e: &mut Encoder) {
        e.write_u64(*self as u64);
    }
}

impl Decodable for usize {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        d.read_u64()?
            .try_into()
            .map_err(|_| CodecError::InvalidValue("integer does not fit in usize".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_length_boundaries() {
        let cases: [(usize, usize); 8] = [
            (0, 1),
            (127, 1),
            (128, 2),
            (16383, 2),
            (16384, 3),
            (2_097_151, 3),
            (2_097_152, 4),
            (MAX_COMPACT_LEN, 4),
        ];
        for &(len, width) in &cases {
            let prefix = compact_len(len).unwrap();
            assert_eq!(prefix.len(), width, "length {}", len);
            let mut d = Decoder::new(Codec::Compact, &prefix);
            assert_eq!(d.read_compact_len().unwrap(), len);
            assert_eq!(d.finish(), Ok(()));
        }
        assert_eq!(
            compact_len(MAX_COMPACT_LEN + 1),
            Err(CodecError::LengthOverflow(MAX_COMPACT_LEN + 1))
        );
    }

    #[test]
    fn compact_length_known_bytes() {
        assert_eq!(compact_len(1).unwrap(), vec![2]);
        assert_eq!(compact_len(128).unwrap(), vec![0x01, 0x02]);
    }

    #[test]
    fn non_canonical_compact_length() {
        // length 1 encoded in the two-byte form
        let bytes = ((1u16 << 2) | 1).to_le_bytes();
        let mut d = Decoder::new(Codec::Compact, &bytes);
        assert_eq!(d.read_compact_len(), Err(CodecError::NonCanonicalLength(1)));
    }

    #[test]
    fn classic_bytes() {
        let enc = encode_classic(&vec![1u8, 2, 3]);
        assert_eq!(enc, vec![3, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3]);
        let compact = encode(Codec::Compact, &vec![1u8, 2, 3]).unwrap();
        assert_eq!(compact, vec![6, 1, 2, 3]);
    }

    #[test]
    fn trailing_and_truncated() {
        let enc = encode_classic(&42u64);
        assert_eq!(decode::<u64>(Codec::Classic, &enc), Ok(42));

        let mut long = enc.clone();
        long.push(0);
        assert_eq!(
            decode::<u64>(Codec::Classic, &long),
            Err(CodecError::TrailingBytes(1))
        );
        assert_eq!(
            decode::<u64>(Codec::Classic, &enc[..5]),
            Err(CodecError::UnexpectedEof {
                needed: 8,
                remaining: 5
            })
        );
    }

    #[test]
    fn invalid_bool() {
        assert_eq!(decode::<bool>(Codec::Compact, &[2]), Err(CodecError::InvalidBool(2)));
    }

    #[test]
    fn slice_too_large() {
        let enc = encode_classic(&((MAX_SLICE_SIZE as u64) + 1));
        assert!(matches!(
            decode::<Vec<u8>>(Codec::Classic, &enc),
            Err(CodecError::SliceTooLarge(_))
        ));
    }

    #[test]
    fn nested() {
        let mut e = Encoder::new(Codec::Compact);
        e.write_nested(|e| {
            e.write_u64(7);
            e.write_u8(1);
        });
        let bytes = e.finish().unwrap();
        assert_eq!(bytes.len(), 1 + 9);

        let mut d = Decoder::new(Codec::Compact, &bytes);
        let (a, b) = d
            .read_nested(|d| Ok((d.read_u64()?, d.read_u8()?)))
            .unwrap();
        assert_eq!((a, b), (7, 1));
        assert_eq!(d.finish(), Ok(()));
    }
}
