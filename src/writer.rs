// A simple binary data builder used by tests.

use std::vec::Vec;

#[derive(Clone, Copy, Debug)]
pub enum TtfType {
    Raw(&'static [u8]),
    UInt8(u8),
    Int8(i8),
    UInt16(u16),
    Int16(i16),
    UInt32(u32),
    Int32(i32),
    // A number in the CFF DICT/charstring variable-length encoding.
    CFFInt(i32),
}

pub fn convert(values: &[TtfType]) -> Vec<u8> {
    let mut data = Vec::with_capacity(256);
    for v in values {
        convert_type(*v, &mut data);
    }

    data
}

pub fn convert_type(value: TtfType, data: &mut Vec<u8>) {
    match value {
        TtfType::Raw(bytes) => {
            data.extend_from_slice(bytes);
        }
        TtfType::UInt8(n) => {
            data.extend_from_slice(&[n]);
        }
        TtfType::Int8(n) => {
            data.extend_from_slice(&[n as u8]);
        }
        TtfType::UInt16(n) => {
            data.extend_from_slice(&n.to_be_bytes());
        }
        TtfType::Int16(n) => {
            data.extend_from_slice(&n.to_be_bytes());
        }
        TtfType::UInt32(n) => {
            data.extend_from_slice(&n.to_be_bytes());
        }
        TtfType::Int32(n) => {
            data.extend_from_slice(&n.to_be_bytes());
        }
        TtfType::CFFInt(n) => {
            match n {
                -107..=107 => {
                    data.push((n + 139) as u8);
                }
                108..=1131 => {
                    let n = n - 108;
                    data.push((n >> 8) as u8 + 247);
                    data.push((n & 255) as u8);
                }
                -1131..=-108 => {
                    let n = -n - 108;
                    data.push((n >> 8) as u8 + 251);
                    data.push((n & 255) as u8);
                }
                -32768..=32767 => {
                    data.push(28);
                    data.extend_from_slice(&(n as i16).to_be_bytes());
                }
                _ => {
                    data.push(29);
                    data.extend_from_slice(&n.to_be_bytes());
                }
            }
        }
    }
}

pub struct Writer {
    pub data: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Writer { data: Vec::with_capacity(256) }
    }

    pub fn offset(&self) -> usize {
        self.data.len()
    }

    pub fn write(&mut self, value: TtfType) {
        convert_type(value, &mut self.data);
    }
}


#[cfg(test)]
mod tests {
    use super::convert;
    use super::TtfType::CFFInt;

    #[test]
    fn cff_int_encoding() {
        assert_eq!(convert(&[CFFInt(0)]), &[139]);
        assert_eq!(convert(&[CFFInt(107)]), &[246]);
        assert_eq!(convert(&[CFFInt(-107)]), &[32]);
        assert_eq!(convert(&[CFFInt(108)]), &[247, 0]);
        assert_eq!(convert(&[CFFInt(400)]), &[248, 36]);
        assert_eq!(convert(&[CFFInt(-108)]), &[251, 0]);
        assert_eq!(convert(&[CFFInt(-1131)]), &[254, 255]);
        assert_eq!(convert(&[CFFInt(2000)]), &[28, 0x07, 0xD0]);
        assert_eq!(convert(&[CFFInt(100000)]), &[29, 0x00, 0x01, 0x86, 0xA0]);
    }
}
