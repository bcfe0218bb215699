// SPDX-License-Identifier: Apache-2.0

//! Little-endian primitives of the binary index.

use std::io::Write;

use crate::error::{Result, TechlibError};

pub(crate) struct BinWriter<W: Write> {
    sink: W,
}

impl<W: Write> BinWriter<W> {
    pub(crate) fn new(sink: W) -> Self {
        BinWriter { sink }
    }

    pub(crate) fn u8(&mut self, v: u8) -> Result<()> {
        self.sink.write_all(&[v])?;
        Ok(())
    }

    pub(crate) fn bool(&mut self, v: bool) -> Result<()> {
        self.u8(v as u8)
    }

    pub(crate) fn u32(&mut self, v: u32) -> Result<()> {
        self.sink.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    /// Writes a table length or index.
    pub(crate) fn count(&mut self, v: usize) -> Result<()> {
        let v = u32::try_from(v).map_err(|_| {
            TechlibError::internal(format!("{} does not fit the 32-bit index format", v))
        })?;
        self.u32(v)
    }

    pub(crate) fn f64(&mut self, v: f64) -> Result<()> {
        self.sink.write_all(&v.to_bits().to_le_bytes())?;
        Ok(())
    }

    pub(crate) fn f64s(&mut self, vs: &[f64]) -> Result<()> {
        for &v in vs {
            self.f64(v)?;
        }
        Ok(())
    }

    pub(crate) fn str(&mut self, s: &str) -> Result<()> {
        self.count(s.len())?;
        self.sink.write_all(s.as_bytes())?;
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}

/// Cursor over an in-memory index. Every error carries the offset of the
/// field that failed.
pub(crate) struct BinReader<'a> {
    src: &'a [u8],
    offset: usize,
}

impl<'a> BinReader<'a> {
    pub(crate) fn new(src: &'a [u8]) -> Self {
        BinReader { src, offset: 0 }
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.offset == self.src.len()
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(n)
            .filter(|&end| end <= self.src.len())
            .ok_or_else(|| {
                TechlibError::corrupt(self.offset, format!("unexpected end of stream in {}", what))
            })?;
        let bytes = &self.src[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    pub(crate) fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    pub(crate) fn bool(&mut self, what: &str) -> Result<bool> {
        let at = self.offset;
        match self.u8(what)? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(TechlibError::corrupt(
                at,
                format!("invalid boolean {} in {}", b, what),
            )),
        }
    }

    pub(crate) fn u32(&mut self, what: &str) -> Result<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// A flag stored as a full word.
    pub(crate) fn bool32(&mut self, what: &str) -> Result<bool> {
        let at = self.offset;
        match self.u32(what)? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(TechlibError::corrupt(
                at,
                format!("invalid flag {} in {}", v, what),
            )),
        }
    }

    /// Reads an index and checks it against `bound`.
    pub(crate) fn index(&mut self, bound: usize, what: &str) -> Result<usize> {
        let at = self.offset;
        let v = self.u32(what)? as usize;
        if v >= bound {
            return Err(TechlibError::corrupt(
                at,
                format!("{} {} out of range (< {})", what, v, bound),
            ));
        }
        Ok(v)
    }

    /// Reads a table length. A length can never exceed the remaining bytes
    /// divided by the smallest encoding of one element.
    pub(crate) fn count(&mut self, min_element_size: usize, what: &str) -> Result<usize> {
        let at = self.offset;
        let v = self.u32(what)? as usize;
        let remaining = self.src.len() - self.offset;
        if v.saturating_mul(min_element_size.max(1)) > remaining {
            return Err(TechlibError::corrupt(
                at,
                format!("{} count {} exceeds the remaining {} bytes", what, v, remaining),
            ));
        }
        Ok(v)
    }

    pub(crate) fn f64(&mut self, what: &str) -> Result<f64> {
        let b = self.take(8, what)?;
        let mut word = [0u8; 8];
        word.copy_from_slice(b);
        Ok(f64::from_bits(u64::from_le_bytes(word)))
    }

    pub(crate) fn f64_array<const N: usize>(&mut self, what: &str) -> Result<[f64; N]> {
        let mut out = [0.0; N];
        for v in out.iter_mut() {
            *v = self.f64(what)?;
        }
        Ok(out)
    }

    pub(crate) fn str(&mut self, what: &str) -> Result<String> {
        let len = self.count(1, what)?;
        let at = self.offset;
        let bytes = self.take(len, what)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| TechlibError::corrupt(at, format!("invalid UTF-8 in {}: {}", what, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives_roundtrip() {
        let mut buf = Vec::new();
        {
            let mut w = BinWriter::new(&mut buf);
            w.u8(7).unwrap();
            w.u32(0x0102_0304).unwrap();
            w.f64(-1.5).unwrap();
            w.str("NAND2").unwrap();
            w.bool(true).unwrap();
        }
        assert_eq!(&buf[1..5], &[4, 3, 2, 1]);
        let mut r = BinReader::new(&buf);
        assert_eq!(r.u8("a").unwrap(), 7);
        assert_eq!(r.u32("b").unwrap(), 0x0102_0304);
        assert_eq!(r.f64("c").unwrap(), -1.5);
        assert_eq!(r.str("d").unwrap(), "NAND2");
        assert!(r.bool("e").unwrap());
        assert!(r.is_at_end());
    }

    #[test]
    fn test_truncation_reports_offset() {
        let buf = [1u8, 0, 0];
        let mut r = BinReader::new(&buf);
        r.u8("tag").unwrap();
        match r.u32("count") {
            Err(TechlibError::CorruptIndex { offset, .. }) => assert_eq!(offset, 1),
            other => panic!("expected corrupt index, got {:?}", other),
        }
    }

    #[test]
    fn test_index_bound() {
        let buf = 5u32.to_le_bytes();
        assert!(BinReader::new(&buf).index(6, "cell").is_ok());
        assert!(matches!(
            BinReader::new(&buf).index(5, "cell"),
            Err(TechlibError::CorruptIndex { offset: 0, .. })
        ));
    }

    #[test]
    fn test_oversized_count() {
        let buf = 1000u32.to_le_bytes();
        assert!(BinReader::new(&buf).count(4, "cells").is_err());
    }
}
