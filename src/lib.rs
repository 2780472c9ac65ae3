/*!
A safe, zero-allocation CFF font table parser and Type 2 charstring interpreter.

## Features

- Parses a bare CFF blob or locates the `CFF ` table inside an
  OpenType (`OTTO`) font or font collection.
- Executes Type 2 charstrings into a caller-provided [`OutlineBuilder`].
- Zero heap allocations in the core. The optional [`Outline`] sink
  (feature `std`) is the only allocating type.
- Zero unsafe.
- `no_std` compatible.
- Stateless. No mutable methods, so a parsed [`Face`] can be shared
  between threads freely.

## Safety

- The library must not panic. Any panic is considered a critical bug
  and should be reported.
- The library forbids unsafe code.
- All recursive methods have a depth limit, so a malicious font cannot
  trigger unbounded subroutine recursion.

## Error handling

Unlike most of this crate's siblings, the charstring interpreter reports
a detailed [`Error`], because a glyph that fails to load is something
the embedding application usually wants to diagnose. Structural parsing
helpers still use `Option` internally and convert at module boundaries.

Some methods may print warnings, when the `logging` feature is enabled.
*/

#![doc(html_root_url = "https://docs.rs/cff-parser/0.1.0")]

#![no_std]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_copy_implementations)]
#![warn(missing_debug_implementations)]

#[cfg(feature = "std")]
#[macro_use]
extern crate std;

#[cfg(all(not(feature = "std"), not(feature = "no-std-float")))]
compile_error!("You have to activate either the `std` or the `no-std-float` feature.");

use core::fmt;

#[cfg(feature = "logging")]
macro_rules! warn {
    ($($arg:tt)+) => (
        log::log!(log::Level::Warn, $($arg)+);
    )
}

#[cfg(not(feature = "logging"))]
macro_rules! warn {
    ($($arg:tt)+) => () // do nothing
}

mod cff;
mod parser;

#[cfg(test)]
mod writer;

use parser::{FromData, Stream};

pub use cff::{GlyphOutline, Matrix, PrivateDict};

#[cfg(feature = "std")]
pub use cff::outline::Outline;


/// A list of errors that can occur during a CFF table parsing
/// or a charstring interpretation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Error {
    /// The data is not a CFF font at all: a bad header, a missing
    /// `CFF ` table in an OpenType font, a missing CharStrings INDEX.
    UnknownFileFormat,

    /// The data is recognizably CFF, but one of its structures is malformed:
    /// a charset that doesn't cover all glyphs, an unknown charset/encoding
    /// format, a broken INDEX.
    InvalidFileFormat,

    /// An out-of-range index or an invalid operand count.
    InvalidArgument,

    /// The operand stack grew beyond its fixed capacity.
    StackOverflow,

    /// An operator required more operands than were on the stack.
    StackUnderflow,

    /// Malformed charstring bytecode: a truncated operand, an out-of-range
    /// or empty subroutine, an unbalanced `return`, nesting too deep.
    SyntaxError,

    /// A recognized-but-unimplemented operator (`store`/`load`/`blend`)
    /// or a genuinely unknown opcode.
    UnimplementedFeature,

    /// The charstring ended without an `endchar` operator.
    MissingEndChar,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::UnknownFileFormat => {
                write!(f, "not a CFF font")
            }
            Error::InvalidFileFormat => {
                write!(f, "a CFF table has a malformed structure")
            }
            Error::InvalidArgument => {
                write!(f, "an invalid index or operand count")
            }
            Error::StackOverflow => {
                write!(f, "the operand stack overflowed")
            }
            Error::StackUnderflow => {
                write!(f, "an operator was missing its operands")
            }
            Error::SyntaxError => {
                write!(f, "a charstring has malformed bytecode")
            }
            Error::UnimplementedFeature => {
                write!(f, "a charstring uses an unsupported operator")
            }
            Error::MissingEndChar => {
                write!(f, "a charstring ended without 'endchar'")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}


/// A type-safe wrapper for glyph ID.
#[repr(C)]
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Default, Debug)]
pub struct GlyphId(pub u16);

impl FromData for GlyphId {
    const SIZE: usize = 2;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        u16::parse(data).map(GlyphId)
    }
}


/// A rectangle.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Debug)]
#[allow(missing_docs)]
pub struct Rect {
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
}


#[derive(Clone, Copy, Debug)]
pub(crate) struct BBox {
    x_min: f32,
    y_min: f32,
    x_max: f32,
    y_max: f32,
}

impl BBox {
    #[inline]
    fn new() -> Self {
        BBox {
            x_min: core::f32::MAX,
            y_min: core::f32::MAX,
            x_max: core::f32::MIN,
            y_max: core::f32::MIN,
        }
    }

    #[inline]
    fn is_default(&self) -> bool {
        self.x_min == core::f32::MAX &&
        self.y_min == core::f32::MAX &&
        self.x_max == core::f32::MIN &&
        self.y_max == core::f32::MIN
    }

    #[inline]
    fn extend_by(&mut self, x: f32, y: f32) {
        self.x_min = self.x_min.min(x);
        self.y_min = self.y_min.min(y);
        self.x_max = self.x_max.max(x);
        self.y_max = self.y_max.max(y);
    }

    #[inline]
    fn to_rect(&self) -> Option<Rect> {
        if self.is_default() {
            return None;
        }

        Some(Rect {
            x_min: parser::TryNumFrom::try_num_from(self.x_min)?,
            y_min: parser::TryNumFrom::try_num_from(self.y_min)?,
            x_max: parser::TryNumFrom::try_num_from(self.x_max)?,
            y_max: parser::TryNumFrom::try_num_from(self.y_max)?,
        })
    }
}


/// A trait for glyph outline construction.
///
/// CFF outlines use cubic curves only, so there is no quad segment.
pub trait OutlineBuilder {
    /// Appends a MoveTo segment.
    ///
    /// Start of a contour.
    fn move_to(&mut self, x: f32, y: f32);

    /// Appends a LineTo segment.
    fn line_to(&mut self, x: f32, y: f32);

    /// Appends a CurveTo segment.
    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32);

    /// Appends a ClosePath segment.
    ///
    /// End of a contour.
    fn close(&mut self);
}


/// A hint-recording collaborator.
///
/// The interpreter forwards hint operators to an implementation of this
/// trait; the hinting math itself lives outside this crate. All methods
/// are called in charstring order: one [`open`](Hinter::open), then any
/// number of stems/masks, then one [`close`](Hinter::close) at `endchar`.
pub trait Hinter {
    /// Starts a hint-recording session for one glyph.
    fn open(&mut self);

    /// Records stem hints.
    ///
    /// `coords` holds (start, delta) pairs in charstring order.
    fn stems(&mut self, horizontal: bool, coords: &[f32]);

    /// Records a `hintmask` with the outline's current point count.
    fn hint_mask(&mut self, point_count: u32, hint_count: u32, mask: &[u8]);

    /// Records a `cntrmask`.
    fn counter_mask(&mut self, hint_count: u32, mask: &[u8]);

    /// Finishes the session, given the final point count.
    fn close(&mut self, point_count: u32);
}


/// A parsed CFF font face.
///
/// All methods are immutable; independent glyph loads may run
/// concurrently over one `Face` without synchronization.
#[derive(Clone, Debug)]
pub struct Face<'a> {
    table: cff::Table<'a>,
}

impl<'a> Face<'a> {
    /// Creates a `Face` from a raw data.
    ///
    /// `data` can be a bare CFF blob, an OpenType (`OTTO`) font or
    /// a font collection. `index` selects a face inside a collection
    /// or a multi-font bare CFF; for simple fonts set it to 0.
    pub fn parse(data: &'a [u8], index: u32) -> Result<Self, Error> {
        let table_data = extract_cff(data, index)?;
        let face_index = if data.get(0..4) == Some(b"ttcf") { 0 } else { index };
        let table = cff::Table::parse(table_data, face_index)?;
        Ok(Face { table })
    }

    /// Returns the face's PostScript name from the Name INDEX.
    pub fn name(&self) -> Option<&'a str> {
        self.table.name
    }

    /// Returns the number of glyphs.
    ///
    /// For CID-keyed fonts with an explicit `CIDCount` that count is
    /// authoritative, even when the CharStrings INDEX is shorter.
    pub fn number_of_glyphs(&self) -> u16 {
        self.table.number_of_glyphs()
    }

    /// Checks that the face is a CID-keyed font.
    pub fn is_cid(&self) -> bool {
        self.table.is_cid()
    }

    /// Returns the font matrix.
    pub fn matrix(&self) -> Matrix {
        self.table.matrix
    }

    /// Returns the italic angle in counter-clockwise degrees.
    #[inline]
    pub fn italic_angle(&self) -> f32 {
        self.table.italic_angle
    }

    /// Returns the underline position in font units.
    #[inline]
    pub fn underline_position(&self) -> f32 {
        self.table.underline_position
    }

    /// Returns the underline thickness in font units.
    #[inline]
    pub fn underline_thickness(&self) -> f32 {
        self.table.underline_thickness
    }

    /// Returns the font bounding box as `[x_min, y_min, x_max, y_max]`,
    /// in font units.
    #[inline]
    pub fn font_bbox(&self) -> [f32; 4] {
        self.table.font_bbox
    }

    /// Resolves the `Weight` string, like `Regular` or `Bold`.
    #[cfg(feature = "glyph-names")]
    #[inline]
    pub fn weight(&self) -> Option<&'a str> {
        self.table.weight()
    }

    /// Returns the Private DICT.
    ///
    /// CID-keyed fonts keep private data per sub-font, so this
    /// returns the Private DICT of the sub-font that owns `glyph_id`.
    pub fn private_dict(&self, glyph_id: GlyphId) -> Option<PrivateDict> {
        self.table.private_dict(glyph_id)
    }

    /// Outlines a glyph into `builder` and returns its metrics.
    ///
    /// A failure leaves `builder` in an unspecified, partially-filled
    /// state; the caller should discard its content.
    pub fn outline_glyph(
        &self,
        glyph_id: GlyphId,
        builder: &mut dyn OutlineBuilder,
    ) -> Result<GlyphOutline, Error> {
        self.table.outline(glyph_id, None, builder)
    }

    /// Outlines a glyph, forwarding hint operators to `hinter`.
    pub fn outline_glyph_hinted<'b>(
        &'b self,
        glyph_id: GlyphId,
        hinter: &'b mut dyn Hinter,
        builder: &mut dyn OutlineBuilder,
    ) -> Result<GlyphOutline, Error> {
        self.table.outline(glyph_id, Some(hinter), builder)
    }

    /// Returns a glyph's name.
    ///
    /// CID-keyed fonts have no glyph names.
    #[cfg(feature = "glyph-names")]
    pub fn glyph_name(&self, glyph_id: GlyphId) -> Option<&'a str> {
        self.table.glyph_name(glyph_id)
    }

    /// Returns a glyph ID by its name.
    #[cfg(feature = "glyph-names")]
    pub fn glyph_index_by_name(&self, name: &str) -> Option<GlyphId> {
        self.table.glyph_index_by_name(name)
    }

    /// Returns a glyph ID by an 8-bit character code, using the
    /// font's built-in encoding.
    pub fn glyph_index_by_code(&self, code: u8) -> Option<GlyphId> {
        self.table.glyph_index_by_code(code)
    }
}

/// Returns the number of fonts stored in a font collection.
///
/// Returns `None` when `data` is not a collection.
pub fn fonts_in_collection(data: &[u8]) -> Option<u32> {
    let mut s = Stream::new(data);
    if s.read_bytes(4)? != b"ttcf" {
        return None;
    }

    s.skip::<u32>(); // version
    s.read::<u32>() // number of fonts
}

/// Locates the CFF table: a bare CFF blob is returned as-is,
/// an sfnt wrapper is unpacked via its table directory.
fn extract_cff(data: &[u8], index: u32) -> Result<&[u8], Error> {
    // A bare CFF starts with a one-byte major version of 1.
    // Both sfnt flavors start with a tag whose first byte is out of
    // that range, so the check is unambiguous.
    if data.first() == Some(&1) {
        return Ok(data);
    }

    let table_data = if let Some(n) = fonts_in_collection(data) {
        if index >= n {
            return Err(Error::InvalidArgument);
        }

        // The TTC header is followed by an array of font offsets.
        const TTC_HEADER_SIZE: usize = 12;
        const OFFSET_32_SIZE: usize = 4;
        let offset = TTC_HEADER_SIZE + OFFSET_32_SIZE * index as usize;
        let font_offset: u32 = Stream::read_at(data, offset).ok_or(Error::UnknownFileFormat)?;
        data.get(font_offset as usize..data.len()).ok_or(Error::UnknownFileFormat)?
    } else {
        data
    };

    const SFNT_VERSION_TRUE_TYPE: u32 = 0x00010000;
    const SFNT_VERSION_OPEN_TYPE: u32 = 0x4F54544F; // OTTO

    let mut s = Stream::new(table_data);
    let sfnt_version: u32 = s.read().ok_or(Error::UnknownFileFormat)?;
    if sfnt_version != SFNT_VERSION_TRUE_TYPE && sfnt_version != SFNT_VERSION_OPEN_TYPE {
        return Err(Error::UnknownFileFormat);
    }

    let num_tables: u16 = s.read().ok_or(Error::UnknownFileFormat)?;
    s.advance(6); // searchRange (u16) + entrySelector (u16) + rangeShift (u16)

    for _ in 0..num_tables {
        let tag = s.read_bytes(4).ok_or(Error::UnknownFileFormat)?;
        s.skip::<u32>(); // checksum
        let offset: u32 = s.read().ok_or(Error::UnknownFileFormat)?;
        let length: u32 = s.read().ok_or(Error::UnknownFileFormat)?;
        if tag == b"CFF " {
            let start = offset as usize;
            let end = start.checked_add(length as usize).ok_or(Error::UnknownFileFormat)?;
            return table_data.get(start..end).ok_or(Error::UnknownFileFormat);
        }
    }

    Err(Error::UnknownFileFormat)
}
