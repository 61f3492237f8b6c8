use crate::boxes::FourCC;
use crate::error::{ParseError, Result};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// Forward-only big-endian reader over an in-memory buffer.
///
/// A read that would run past the end fails with [`ParseError::Truncated`]
/// and leaves the position untouched.
pub struct ByteCursor<'a> {
    inner: Cursor<&'a [u8]>,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            inner: Cursor::new(data),
        }
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    pub fn len(&self) -> u64 {
        self.inner.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.position())
    }

    fn truncated(&self, needed: u64) -> ParseError {
        ParseError::Truncated {
            offset: self.position(),
            needed,
            available: self.remaining(),
        }
    }

    fn ensure(&self, needed: u64) -> Result<()> {
        if needed > self.remaining() {
            return Err(self.truncated(needed));
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        self.inner.read_u8().map_err(|_| self.truncated(1))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        self.inner
            .read_u16::<BigEndian>()
            .map_err(|_| self.truncated(2))
    }

    pub fn read_u24(&mut self) -> Result<u32> {
        self.ensure(3)?;
        self.inner
            .read_u24::<BigEndian>()
            .map_err(|_| self.truncated(3))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        self.inner
            .read_u32::<BigEndian>()
            .map_err(|_| self.truncated(4))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        self.inner
            .read_u64::<BigEndian>()
            .map_err(|_| self.truncated(8))
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure(N as u64)?;
        let mut buf = [0u8; N];
        self.inner
            .read_exact(&mut buf)
            .map_err(|_| self.truncated(N as u64))?;
        Ok(buf)
    }

    pub fn read_fourcc(&mut self) -> Result<FourCC> {
        Ok(FourCC(self.read_array::<4>()?))
    }

    pub fn read_bytes(&mut self, n: u64) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let start = self.position() as usize;
        let data: &'a [u8] = *self.inner.get_ref();
        let out = &data[start..start + n as usize];
        self.inner.set_position(self.position() + n);
        Ok(out)
    }

    /// Reads `n` bytes as Latin-1 text, one char per byte.
    pub fn read_fixed_string(&mut self, n: u64) -> Result<String> {
        Ok(self.read_bytes(n)?.iter().map(|&b| b as char).collect())
    }

    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.ensure(n)?;
        self.inner.set_position(self.position() + n);
        Ok(())
    }
}
