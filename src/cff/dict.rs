use core::convert::TryFrom;
use core::ops::Range;

use crate::parser::Stream;

const TWO_BYTE_OPERATOR_MARK: u8 = 12;
const END_OF_FLOAT_FLAG: u8 = 0xf;
const FLOAT_STACK_LEN: usize = 64;

#[derive(Clone, Copy, Debug)]
pub struct Operator(pub u16);

impl Operator {
    #[inline]
    pub fn get(self) -> u16 { self.0 }
}


pub struct DictionaryParser<'a> {
    data: &'a [u8],
    // The current offset.
    offset: usize,
    // Offset to the last operands start.
    operands_offset: usize,
    // Actual operands.
    operands: &'a mut [i32],
    // An amount of operands in the `operands` array.
    operands_len: u16,
}

impl<'a> DictionaryParser<'a> {
    #[inline]
    pub fn new(data: &'a [u8], operands_buffer: &'a mut [i32]) -> Self {
        DictionaryParser {
            data,
            offset: 0,
            operands_offset: 0,
            operands: operands_buffer,
            operands_len: 0,
        }
    }

    #[inline(never)]
    pub fn parse_next(&mut self) -> Option<Operator> {
        let mut s = Stream::new_at(self.data, self.offset)?;
        self.operands_offset = self.offset;
        while !s.at_end() {
            let b = s.read::<u8>()?;
            // 0..=21 bytes are operators.
            if is_dict_one_byte_op(b) {
                let mut operator = u16::from(b);

                // Check that operator is two byte long.
                if b == TWO_BYTE_OPERATOR_MARK {
                    // Use a 1200 'prefix' to make two byte operators more readable.
                    // 12 3 => 1203
                    operator = 1200 + u16::from(s.read::<u8>()?);
                }

                self.offset = s.offset();
                return Some(Operator(operator));
            } else {
                skip_number(b, &mut s)?;
            }
        }

        None
    }

    /// Parses operands of the current operator.
    ///
    /// In the DICT structure, operands are defined before an operator.
    /// So we are trying to find an operator first and then we can actually parse the operands.
    ///
    /// Since this method is pretty expensive and we do not care about most of the operators,
    /// we can speed up parsing by parsing operands only for required operators.
    ///
    /// We still have to "skip" operands during operators search (see `skip_number()`),
    /// but it's still faster than a naive method.
    pub fn parse_operands(&mut self) -> Option<()> {
        let mut s = Stream::new_at(self.data, self.operands_offset)?;
        self.operands_len = 0;
        while !s.at_end() {
            let b = s.read::<u8>()?;
            // 0..=21 bytes are operators.
            if is_dict_one_byte_op(b) {
                break;
            } else {
                let op = parse_number(b, &mut s)?;
                self.operands[usize::from(self.operands_len)] = op;
                self.operands_len += 1;

                if usize::from(self.operands_len) >= self.operands.len() {
                    break;
                }
            }
        }

        Some(())
    }

    #[inline]
    pub fn operands(&self) -> &[i32] {
        &self.operands[..usize::from(self.operands_len)]
    }

    #[inline]
    pub fn parse_offset(&mut self) -> Option<usize> {
        self.parse_operands()?;
        let operands = self.operands();
        if operands.len() == 1 {
            usize::try_from(operands[0]).ok()
        } else {
            None
        }
    }

    #[inline]
    pub fn parse_range(&mut self) -> Option<Range<usize>> {
        self.parse_operands()?;
        let operands = self.operands();
        if operands.len() == 2 {
            let len = usize::try_from(operands[0]).ok()?;
            let start = usize::try_from(operands[1]).ok()?;
            let end = start.checked_add(len)?;
            Some(start..end)
        } else {
            None
        }
    }

    /// Parses the current operands as an integer.
    ///
    /// 'An operator may be preceded by up to a maximum of 48 operands',
    /// but only the operands immediately preceding the operator matter,
    /// so the last one wins.
    #[inline]
    pub fn parse_i32(&mut self) -> Option<i32> {
        self.parse_operands()?;
        self.operands().last().copied()
    }

    #[inline]
    pub fn parse_bool(&mut self) -> Option<bool> {
        self.parse_i32().map(|n| n != 0)
    }

    /// Parses the current operands as floats, including packed-BCD reals.
    ///
    /// Returns the amount of parsed operands. Excess operands are truncated.
    pub fn parse_floats(&mut self, out: &mut [f32]) -> Option<usize> {
        let mut s = Stream::new_at(self.data, self.operands_offset)?;
        let mut len = 0;
        while !s.at_end() && len < out.len() {
            let b = s.read::<u8>()?;
            if is_dict_one_byte_op(b) {
                break;
            } else {
                out[len] = parse_float(b, &mut s)?;
                len += 1;
            }
        }

        Some(len)
    }

    #[inline]
    pub fn parse_float(&mut self) -> Option<f32> {
        let mut buf = [0.0];
        if self.parse_floats(&mut buf)? == 1 {
            Some(buf[0])
        } else {
            None
        }
    }

    /// Parses the current operands as a CFF delta array.
    ///
    /// Each value is relative to the previous one, so they are accumulated
    /// into absolute values. Excess operands are silently truncated.
    pub fn parse_delta(&mut self, out: &mut [f32]) -> Option<usize> {
        let len = self.parse_floats(out)?;
        let mut prev = 0.0;
        for v in &mut out[..len] {
            *v += prev;
            prev = *v;
        }

        Some(len)
    }
}

// One-byte CFF DICT Operators according to the
// Adobe Technical Note #5176, Appendix H CFF DICT Encoding.
pub fn is_dict_one_byte_op(b: u8) -> bool {
    match b {
        0..=27 => true,
        28..=30 => false, // numbers
        31 => true, // Reserved
        32..=254 => false, // numbers
        255 => true, // Reserved
    }
}

// Adobe Technical Note #5177, Table 3 Operand Encoding
pub fn parse_number(b0: u8, s: &mut Stream) -> Option<i32> {
    match b0 {
        28 => {
            let n = i32::from(s.read::<i16>()?);
            Some(n)
        }
        29 => {
            let n = s.read::<i32>()?;
            Some(n)
        }
        30 => {
            // Structural fields are always integers,
            // so the real value itself is not needed here.
            skip_real(s);
            Some(0)
        }
        32..=246 => {
            let n = i32::from(b0) - 139;
            Some(n)
        }
        247..=250 => {
            let b1 = i32::from(s.read::<u8>()?);
            let n = (i32::from(b0) - 247) * 256 + b1 + 108;
            Some(n)
        }
        251..=254 => {
            let b1 = i32::from(s.read::<u8>()?);
            let n = -(i32::from(b0) - 251) * 256 - b1 - 108;
            Some(n)
        }
        _ => None,
    }
}

pub fn parse_float(b0: u8, s: &mut Stream) -> Option<f32> {
    if b0 == 30 {
        Some(parse_real(s))
    } else {
        parse_number(b0, s).map(|n| n as f32)
    }
}

// A packed-BCD real number, as defined in the
// Adobe Technical Note #5176, Table 5 Nibble Definitions.
//
// A malformed or truncated real degrades to 0 instead of reading out of bounds.
fn parse_real(s: &mut Stream) -> f32 {
    let mut buf = [0u8; FLOAT_STACK_LEN];
    let mut len = 0;

    let mut push = |c: u8| -> bool {
        if len < FLOAT_STACK_LEN {
            buf[len] = c;
            len += 1;
            true
        } else {
            false
        }
    };

    'outer: while !s.at_end() {
        let b1 = match s.read::<u8>() {
            Some(b1) => b1,
            None => return 0.0,
        };

        for &nibble in &[b1 >> 4, b1 & 15] {
            let ok = match nibble {
                0..=9 => push(b'0' + nibble),
                0xa => push(b'.'),
                0xb => push(b'E'),
                0xc => push(b'E') && push(b'-'),
                0xe => push(b'-'),
                END_OF_FLOAT_FLAG => break 'outer,
                _ => return 0.0, // reserved
            };

            if !ok {
                skip_real(s);
                return 0.0;
            }
        }

        // A terminator nibble must be present before end of data.
        if s.at_end() {
            return 0.0;
        }
    }

    core::str::from_utf8(&buf[..len]).ok()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0.0)
}

fn skip_real(s: &mut Stream) {
    while !s.at_end() {
        let b1 = match s.read::<u8>() {
            Some(b1) => b1,
            None => return,
        };

        let nibble1 = b1 >> 4;
        let nibble2 = b1 & 15;
        if nibble1 == END_OF_FLOAT_FLAG || nibble2 == END_OF_FLOAT_FLAG {
            break;
        }
    }
}

// Just like `parse_number`, but doesn't actually parse the data.
pub fn skip_number(b0: u8, s: &mut Stream) -> Option<()> {
    match b0 {
        28 => s.skip::<u16>(),
        29 => s.skip::<u32>(),
        30 => skip_real(s),
        32..=246 => {}
        247..=250 => s.skip::<u8>(),
        251..=254 => s.skip::<u8>(),
        _ => return None,
    }

    Some(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dict_number() {
        assert_eq!(parse_number(0xFA, &mut Stream::new(&[0x7C])).unwrap(), 1000);
        assert_eq!(parse_number(0xFE, &mut Stream::new(&[0x7C])).unwrap(), -1000);
        assert_eq!(parse_number(0x1C, &mut Stream::new(&[0x27, 0x10])).unwrap(), 10000);
        assert_eq!(parse_number(0x1C, &mut Stream::new(&[0xD8, 0xF0])).unwrap(), -10000);
        assert_eq!(parse_number(0x1D, &mut Stream::new(&[0x00, 0x01, 0x86, 0xA0])).unwrap(), 100000);
        assert_eq!(parse_number(0x1D, &mut Stream::new(&[0xFF, 0xFE, 0x79, 0x60])).unwrap(), -100000);
        assert_eq!(parse_number(139, &mut Stream::new(&[])).unwrap(), 0);
        assert_eq!(parse_number(247, &mut Stream::new(&[0x00])).unwrap(), 108);
        assert_eq!(parse_number(251, &mut Stream::new(&[0x00])).unwrap(), -108);
    }

    #[test]
    fn parse_dict_real() {
        // 1.5 is encoded as nibbles [1, '.', 5, end].
        assert_eq!(parse_float(30, &mut Stream::new(&[0x1a, 0x5f])).unwrap(), 1.5);
        // -2.25
        assert_eq!(parse_float(30, &mut Stream::new(&[0xe2, 0xa2, 0x5f])).unwrap(), -2.25);
        // 0.140541E-3, the example from the Adobe Technical Note #5176.
        let n = parse_float(30, &mut Stream::new(&[0x0a, 0x14, 0x05, 0x41, 0xc3, 0xff])).unwrap();
        assert!((n - 0.000140541).abs() < 1e-9);
        // 0.039625, the default blue scale.
        let n = parse_float(30, &mut Stream::new(&[0x0a, 0x03, 0x96, 0x25, 0xff])).unwrap();
        assert!((n - 0.039625).abs() < 1e-9);
    }

    #[test]
    fn truncated_real_is_zero() {
        // The buffer ends before the terminator nibble.
        assert_eq!(parse_float(30, &mut Stream::new(&[0x1a, 0x55])).unwrap(), 0.0);
        assert_eq!(parse_float(30, &mut Stream::new(&[])).unwrap(), 0.0);
    }

    #[test]
    fn delta_accumulation() {
        let mut operands_buffer = [0; 48];
        // 10 -3 5 with a trailing operator byte (6, BlueValues).
        let data = [
            139 + 10, 139 - 3, 139 + 5,
            6,
        ];
        let mut parser = DictionaryParser::new(&data, &mut operands_buffer);
        let op = parser.parse_next().unwrap();
        assert_eq!(op.get(), 6);

        let mut out = [0.0; 3];
        assert_eq!(parser.parse_delta(&mut out).unwrap(), 3);
        assert_eq!(out, [10.0, 7.0, 12.0]);
    }

    #[test]
    fn delta_excess_is_truncated() {
        let mut operands_buffer = [0; 48];
        let data = [
            139 + 1, 139 + 1, 139 + 1, 139 + 1,
            6,
        ];
        let mut parser = DictionaryParser::new(&data, &mut operands_buffer);
        parser.parse_next().unwrap();

        let mut out = [0.0; 2];
        assert_eq!(parser.parse_delta(&mut out).unwrap(), 2);
        assert_eq!(out, [1.0, 2.0]);
    }

    #[test]
    fn last_operand_wins() {
        let mut operands_buffer = [0; 48];
        let data = [
            139 + 1, 139 + 2, 139 + 3,
            17,
        ];
        let mut parser = DictionaryParser::new(&data, &mut operands_buffer);
        parser.parse_next().unwrap();
        assert_eq!(parser.parse_i32().unwrap(), 3);
    }
}
