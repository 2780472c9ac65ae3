use core::convert::TryFrom;

use crate::parser::{FromData, NumFrom, Stream, U24};

/// A CFF INDEX: a sequence of variably-sized byte blobs packed in one buffer
/// with a shared offset table.
#[derive(Clone, Copy, Debug)]
pub struct Index<'a> {
    pub data: &'a [u8],
    pub offsets: VarOffsets<'a>,
}

impl<'a> Default for Index<'a> {
    #[inline]
    fn default() -> Self {
        Index {
            data: b"",
            offsets: VarOffsets { data: b"", offset_size: OffsetSize::Size1 },
        }
    }
}

impl<'a> Index<'a> {
    #[inline]
    pub fn len(&self) -> u32 {
        // Last offset points to the byte after the `Object data`.
        // We should skip it.
        self.offsets.len().saturating_sub(1)
    }

    pub fn get(&self, index: u32) -> Option<&'a [u8]> {
        // Check for overflow first.
        if index == core::u32::MAX {
            None
        } else if index + 1 < self.offsets.len() {
            let start = usize::try_from(self.offsets.get(index)?).ok()?;
            let end = usize::try_from(self.offsets.get(index + 1)?).ok()?;
            self.data.get(start..end)
        } else {
            None
        }
    }
}

impl<'a> IntoIterator for Index<'a> {
    type Item = &'a [u8];
    type IntoIter = IndexIter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        IndexIter {
            data: self,
            offset_index: 0,
        }
    }
}

pub struct IndexIter<'a> {
    data: Index<'a>,
    offset_index: u32,
}

impl<'a> Iterator for IndexIter<'a> {
    type Item = &'a [u8];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.offset_index == self.data.len() {
            return None;
        }

        let index = self.offset_index;
        self.offset_index += 1;
        self.data.get(index)
    }
}

pub fn parse_index<'a>(s: &mut Stream<'a>) -> Option<Index<'a>> {
    let count: u16 = s.read()?;
    if count != 0 {
        parse_index_impl(u32::from(count), s)
    } else {
        Some(Index::default())
    }
}

fn parse_index_impl<'a>(count: u32, s: &mut Stream<'a>) -> Option<Index<'a>> {
    let offset_size: OffsetSize = parse_offset_size(s)?;
    let offsets_len = (count + 1).checked_mul(offset_size.to_u32())?;
    let offsets = VarOffsets {
        data: s.read_bytes(usize::num_from(offsets_len))?,
        offset_size,
    };

    // Last offset indicates the total size of the object data.
    match offsets.last() {
        Some(last_offset) => {
            let data = s.read_bytes(usize::num_from(last_offset))?;
            Some(Index { data, offsets })
        }
        None => Some(Index::default()),
    }
}


#[derive(Clone, Copy, Debug)]
pub struct VarOffsets<'a> {
    pub data: &'a [u8],
    pub offset_size: OffsetSize,
}

impl<'a> VarOffsets<'a> {
    pub fn get(&self, index: u32) -> Option<u32> {
        if index >= self.len() {
            return None;
        }

        let start = usize::num_from(index) * self.offset_size.to_usize();
        let end = start + self.offset_size.to_usize();
        let data = self.data.get(start..end)?;
        let n: u32 = match self.offset_size {
            OffsetSize::Size1 => u32::from(u8::parse(data)?),
            OffsetSize::Size2 => u32::from(u16::parse(data)?),
            OffsetSize::Size3 => U24::parse(data)?.0,
            OffsetSize::Size4 => u32::parse(data)?,
        };

        // Offset must be positive.
        if n == 0 {
            return None;
        }

        // Offsets are 1-based in the font, so we have to shift them back.
        Some(n - 1)
    }

    #[inline]
    pub fn last(&self) -> Option<u32> {
        if !self.is_empty() {
            self.get(self.len() - 1)
        } else {
            None
        }
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.data.len() as u32 / self.offset_size.to_u32()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}


#[derive(Clone, Copy, PartialEq, Debug)]
pub enum OffsetSize {
    Size1 = 1,
    Size2 = 2,
    Size3 = 3,
    Size4 = 4,
}

impl OffsetSize {
    #[inline] pub fn to_u32(self) -> u32 { self as u32 }
    #[inline] pub fn to_usize(self) -> usize { self as usize }
}

#[inline]
fn parse_offset_size(s: &mut Stream) -> Option<OffsetSize> {
    match s.read::<u8>()? {
        1 => Some(OffsetSize::Size1),
        2 => Some(OffsetSize::Size2),
        3 => Some(OffsetSize::Size3),
        4 => Some(OffsetSize::Size4),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer;
    use writer::TtfType::*;

    #[test]
    fn empty_index() {
        let data = writer::convert(&[
            UInt16(0), // count
        ]);
        let index = parse_index(&mut Stream::new(&data)).unwrap();
        assert_eq!(index.len(), 0);
        assert!(index.get(0).is_none());
    }

    #[test]
    fn access_by_element() {
        let data = writer::convert(&[
            UInt16(3), // count
            UInt8(1), // offset size
            UInt8(1), // offset[0]
            UInt8(3), // offset[1]
            UInt8(3), // offset[2], zero-length blob
            UInt8(6), // offset[3]
            Raw(&[10, 11, 20, 21, 22]),
        ]);
        let index = parse_index(&mut Stream::new(&data)).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.get(0).unwrap(), &[10, 11]);
        assert_eq!(index.get(1).unwrap(), &[]);
        assert_eq!(index.get(2).unwrap(), &[20, 21, 22]);
        assert!(index.get(3).is_none());
    }

    #[test]
    fn non_monotonic_offsets() {
        let data = writer::convert(&[
            UInt16(2), // count
            UInt8(1), // offset size
            UInt8(1), // offset[0]
            UInt8(5), // offset[1]
            UInt8(3), // offset[2], goes backwards
            Raw(&[0, 0, 0, 0]),
        ]);
        let index = parse_index(&mut Stream::new(&data)).unwrap();
        assert!(index.get(1).is_none());
    }

    #[test]
    fn zero_offset() {
        // Offsets are 1-based, so zero is malformed.
        let data = writer::convert(&[
            UInt16(1), // count
            UInt8(1), // offset size
            UInt8(0), // offset[0]
            UInt8(2), // offset[1]
            Raw(&[10]),
        ]);
        let index = parse_index(&mut Stream::new(&data)).unwrap();
        assert!(index.get(0).is_none());
    }

    #[test]
    fn four_byte_offsets() {
        let data = writer::convert(&[
            UInt16(1), // count
            UInt8(4), // offset size
            UInt32(1), // offset[0]
            UInt32(4), // offset[1]
            Raw(&[7, 8, 9]),
        ]);
        let index = parse_index(&mut Stream::new(&data)).unwrap();
        assert_eq!(index.get(0).unwrap(), &[7, 8, 9]);
    }

    #[test]
    fn truncated_data() {
        let data = writer::convert(&[
            UInt16(1), // count
            UInt8(1), // offset size
            UInt8(1), // offset[0]
            UInt8(10), // offset[1]
            Raw(&[1, 2]), // not enough data
        ]);
        assert!(parse_index(&mut Stream::new(&data)).is_none());
    }

    #[test]
    fn parse_then_continue() {
        let data = writer::convert(&[
            UInt16(1), // count
            UInt8(1), // offset size
            UInt8(1), // offset[0]
            UInt8(3), // offset[1]
            Raw(&[1, 2]),
            UInt16(777), // data after the index
        ]);
        let mut s = Stream::new(&data);
        parse_index(&mut s).unwrap();
        assert_eq!(s.read::<u16>().unwrap(), 777);
    }
}
