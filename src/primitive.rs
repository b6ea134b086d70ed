//! Simple building-block data that can be read in one go.
//! All reads go through a `ByteCursor`, which advances over an immutable buffer.

use crate::prelude::*;

/// A bounds-checked, forward-only reader over a borrowed byte buffer.
///
/// Any read that requests more bytes than remain fails with `ErrorKind::EndOfStream`, leaving
/// the cursor untouched.
#[derive(Copy, Clone, Debug)]
pub struct ByteCursor<'a> {
    /// Starts at the current position, ends at the end of the buffer.
    raw: &'a [u8],
    consumed: usize,
}
impl<'a> ByteCursor<'a> {
    #[inline]
    pub fn new(raw: &'a [u8]) -> ByteCursor<'a> {
        ByteCursor { raw, consumed: 0 }
    }

    /// Take the next `n` bytes, advancing the cursor past them.
    #[inline]
    pub fn take(&mut self, n: usize) -> StdResult<&'a [u8], ErrorKind> {
        if n > self.raw.len() {
            bail!(ErrorKind::EndOfStream);
        }
        let (taken, rest) = self.raw.split_at(n);
        self.raw = rest;
        self.consumed += n;
        Ok(taken)
    }

    /// Look at the next byte without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.raw.first().copied()
    }

    /// How many bytes are left to read.
    #[inline]
    pub fn remain(&self) -> usize {
        self.raw.len()
    }

    /// How many bytes have been read so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.consumed
    }

    /// The remaining unread bytes.
    #[inline]
    pub fn unread(&self) -> &'a [u8] {
        self.raw
    }

    #[inline]
    pub fn read_u8(&mut self) -> StdResult<u8, ErrorKind> {
        Ok(self.take(1)?[0])
    }

    /// Reads a big-endian `u16`.
    #[inline]
    pub fn read_u16(&mut self) -> StdResult<u16, ErrorKind> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a big-endian `u32`.
    #[inline]
    pub fn read_u32(&mut self) -> StdResult<u32, ErrorKind> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a big-endian `u24`, stored in the bottom bits of a `u32`.
    #[inline]
    pub fn read_u24(&mut self) -> StdResult<u32, ErrorKind> {
        let bytes = self.take(3)?;
        Ok(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }

    /// Reads a MIDI variable-length quantity into an integer of type `T`.
    #[inline]
    pub fn read_varlen<T: VarInt>(&mut self) -> StdResult<T, ErrorKind> {
        T::read_varlen(self)
    }
}

/// Integers that can be decoded from MIDI variable-length quantities.
///
/// A variable-length quantity stores 7 bits per byte, most significant group first, with the top
/// bit of every byte except the last one set.
///
/// At most `size_of::<Self>()` bytes are read.
/// If the last of those bytes still has its top bit set, the value accumulated so far is returned
/// as-is and the rest of the quantity is left unread, unless the `strict` feature is enabled, in
/// which case an `ErrorKind::Malformed` error is raised.
pub trait VarInt: Sized + Copy {
    fn read_varlen(raw: &mut ByteCursor) -> StdResult<Self, ErrorKind>;
}

macro_rules! impl_varint {
    {$( $int:ty ),*} => {
        $(
            impl VarInt for $int {
                #[inline]
                fn read_varlen(raw: &mut ByteCursor) -> StdResult<$int, ErrorKind> {
                    let mut int: $int = 0;
                    for _ in 0..mem::size_of::<$int>() {
                        let byte = raw.read_u8()?;
                        int = (int << 7) | (byte & 0x7F) as $int;
                        if byte & 0x80 == 0 {
                            return Ok(int);
                        }
                    }
                    if cfg!(feature = "strict") {
                        Err(err_malformed!("varlen integer too long"))
                    } else {
                        //Use the bytes read as-is
                        Ok(int)
                    }
                }
            }
        )*
    }
}
impl_varint! {u32, u64}
