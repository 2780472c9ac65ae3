// Useful links:
// http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/font/pdfs/5176.CFF.pdf
// http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/font/pdfs/5177.Type2.pdf

use core::convert::TryFrom;
use core::ops::Range;

use crate::{Error, GlyphId, Hinter, OutlineBuilder, Rect};
use crate::parser::{FromData, LazyArray16, Stream};

pub(crate) mod argstack;
mod charset;
mod charstring;
mod dict;
mod encoding;
mod index;
#[cfg(feature = "std")]
pub(crate) mod outline;
#[cfg(feature = "glyph-names")]
mod std_names;

use charset::{Charset, parse_charset, parse_predefined_charset};
use dict::DictionaryParser;
use encoding::{Encoding, STANDARD_ENCODING, parse_encoding};
use index::{Index, parse_index};

// Limits according to the Adobe Technical Note #5176, chapter 4 DICT Data.
const MAX_OPERANDS_LEN: usize = 48;

// A CID font with more sub-fonts than this is certainly broken.
const MAX_CID_FONTS: u32 = 16;

/// Enumerates some operators defined in the Adobe Technical Note #5176,
/// Table 9 Top DICT Operator Entries
mod top_dict_operator {
    #[cfg(feature = "glyph-names")]
    pub const WEIGHT: u16                       = 4;
    pub const FONT_BBOX: u16                    = 5;
    pub const ITALIC_ANGLE: u16                 = 1202;
    pub const UNDERLINE_POSITION: u16           = 1203;
    pub const UNDERLINE_THICKNESS: u16          = 1204;
    pub const CHAR_STRING_TYPE: u16             = 1206;
    pub const FONT_MATRIX: u16                  = 1207;
    pub const CHARSET_OFFSET: u16               = 15;
    pub const ENCODING_OFFSET: u16              = 16;
    pub const CHAR_STRINGS_OFFSET: u16          = 17;
    pub const PRIVATE_DICT_SIZE_AND_OFFSET: u16 = 18;
    pub const ROS: u16                          = 1230;
    pub const CID_COUNT: u16                    = 1234;
    pub const FD_ARRAY: u16                     = 1236;
    pub const FD_SELECT: u16                    = 1237;
}

/// Enumerates some operators defined in the Adobe Technical Note #5176,
/// Table 23 Private DICT Operators
mod private_dict_operator {
    pub const BLUE_VALUES: u16              = 6;
    pub const OTHER_BLUES: u16              = 7;
    pub const FAMILY_BLUES: u16             = 8;
    pub const FAMILY_OTHER_BLUES: u16       = 9;
    pub const BLUE_SCALE: u16               = 1209;
    pub const BLUE_SHIFT: u16               = 1210;
    pub const BLUE_FUZZ: u16                = 1211;
    pub const STD_HW: u16                   = 10;
    pub const STD_VW: u16                   = 11;
    pub const STEM_SNAP_H: u16              = 1212;
    pub const STEM_SNAP_V: u16              = 1213;
    pub const FORCE_BOLD: u16               = 1214;
    pub const LANGUAGE_GROUP: u16           = 1217;
    pub const EXPANSION_FACTOR: u16         = 1218;
    pub const INITIAL_RANDOM_SEED: u16      = 1219;
    pub const LOCAL_SUBROUTINES_OFFSET: u16 = 19;
    pub const DEFAULT_WIDTH: u16            = 20;
    pub const NOMINAL_WIDTH: u16            = 21;
}

/// Enumerates Charset IDs defined in the Adobe Technical Note #5176, Table 22
mod charset_id {
    pub const ISO_ADOBE: usize = 0;
    pub const EXPERT: usize = 1;
    pub const EXPERT_SUBSET: usize = 2;
}

/// Enumerates Encoding IDs defined in the Adobe Technical Note #5176, Table 16
mod encoding_id {
    pub const STANDARD: usize = 0;
    pub const EXPERT: usize = 1;
}


/// A type-safe wrapper for string ID.
#[derive(Clone, Copy, PartialEq, PartialOrd, Debug)]
pub(crate) struct StringId(pub u16);

impl FromData for StringId {
    const SIZE: usize = 2;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        u16::parse(data).map(StringId)
    }
}

#[cfg(feature = "glyph-names")]
const STANDARD_NAMES_LEN: u16 = 391;


/// A font transformation matrix.
#[derive(Clone, Copy, PartialEq, Debug)]
#[allow(missing_docs)]
pub struct Matrix {
    pub sx: f32,
    pub kx: f32,
    pub ky: f32,
    pub sy: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for Matrix {
    #[inline]
    fn default() -> Self {
        // The CFF default is 0.001/units-per-em scaling.
        Matrix { sx: 0.001, kx: 0.0, ky: 0.0, sy: 0.001, tx: 0.0, ty: 0.0 }
    }
}


/// Metrics of one outlined glyph.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GlyphOutline {
    /// The advance width, in font units.
    ///
    /// Either the Private DICT's `defaultWidthX` or `nominalWidthX`
    /// plus the charstring's leading width operand.
    pub advance: f32,

    /// The outline's bounding box.
    ///
    /// `None` for an empty glyph.
    pub bounding_box: Option<Rect>,
}


/// A Private DICT.
///
/// Hint-related values are exposed read-only for an external hinting engine;
/// the interpreter itself only consumes the widths and the random seed.
#[derive(Clone, Copy, Debug)]
pub struct PrivateDict {
    blue_values: [f32; 14],
    blue_values_len: u8,
    other_blues: [f32; 10],
    other_blues_len: u8,
    family_blues: [f32; 14],
    family_blues_len: u8,
    family_other_blues: [f32; 10],
    family_other_blues_len: u8,
    stem_snap_h: [f32; 12],
    stem_snap_h_len: u8,
    stem_snap_v: [f32; 12],
    stem_snap_v_len: u8,

    /// The point size below which overshoot suppression stops.
    pub blue_scale: f32,
    /// The overshoot suppression shift.
    pub blue_shift: f32,
    /// The blue-zone fuzz value.
    pub blue_fuzz: f32,
    /// The dominant horizontal stem width.
    pub std_hw: Option<f32>,
    /// The dominant vertical stem width.
    pub std_vw: Option<f32>,
    /// Whether bolding should be forced at small sizes.
    pub force_bold: bool,
    /// The language group. Group 1 uses counter hinting.
    pub language_group: i32,
    /// The counter expansion factor.
    pub expansion_factor: f32,
    /// The seed for the charstring `random` operator.
    pub initial_random_seed: i32,
    /// The advance width of glyphs without a width operand.
    pub default_width: f32,
    /// The base value for charstring width operands.
    pub nominal_width: f32,
    /// The charstring decryption length. A Type 1 leftover,
    /// never set by CFF data and unused by Type 2 charstrings.
    pub len_iv: i32,

    subrs_offset: Option<usize>,
}

impl Default for PrivateDict {
    fn default() -> Self {
        PrivateDict {
            blue_values: [0.0; 14],
            blue_values_len: 0,
            other_blues: [0.0; 10],
            other_blues_len: 0,
            family_blues: [0.0; 14],
            family_blues_len: 0,
            family_other_blues: [0.0; 10],
            family_other_blues_len: 0,
            stem_snap_h: [0.0; 12],
            stem_snap_h_len: 0,
            stem_snap_v: [0.0; 12],
            stem_snap_v_len: 0,
            blue_scale: 0.039625,
            blue_shift: 7.0,
            blue_fuzz: 1.0,
            std_hw: None,
            std_vw: None,
            force_bold: false,
            language_group: 0,
            expansion_factor: 0.06,
            initial_random_seed: 0,
            default_width: 0.0,
            nominal_width: 0.0,
            len_iv: -1,
            subrs_offset: None,
        }
    }
}

impl PrivateDict {
    /// Returns the `BlueValues` zones as absolute values.
    pub fn blue_values(&self) -> &[f32] {
        &self.blue_values[..usize::from(self.blue_values_len)]
    }

    /// Returns the `OtherBlues` zones as absolute values.
    pub fn other_blues(&self) -> &[f32] {
        &self.other_blues[..usize::from(self.other_blues_len)]
    }

    /// Returns the `FamilyBlues` zones as absolute values.
    pub fn family_blues(&self) -> &[f32] {
        &self.family_blues[..usize::from(self.family_blues_len)]
    }

    /// Returns the `FamilyOtherBlues` zones as absolute values.
    pub fn family_other_blues(&self) -> &[f32] {
        &self.family_other_blues[..usize::from(self.family_other_blues_len)]
    }

    /// Returns the `StemSnapH` widths.
    pub fn stem_snap_h(&self) -> &[f32] {
        &self.stem_snap_h[..usize::from(self.stem_snap_h_len)]
    }

    /// Returns the `StemSnapV` widths.
    pub fn stem_snap_v(&self) -> &[f32] {
        &self.stem_snap_v[..usize::from(self.stem_snap_v_len)]
    }
}


#[derive(Clone, Copy, Debug)]
pub(crate) struct Table<'a> {
    // The whole CFF table.
    // Used to resolve a local subroutine in a CID font.
    table_data: &'a [u8],

    pub name: Option<&'a str>,
    strings: Index<'a>,
    pub(crate) global_subrs: Index<'a>,
    pub(crate) charset: Charset<'a>,
    encoding: Encoding<'a>,
    pub(crate) char_strings: Index<'a>,
    pub matrix: Matrix,
    pub italic_angle: f32,
    pub underline_position: f32,
    pub underline_thickness: f32,
    pub font_bbox: [f32; 4],
    #[cfg(feature = "glyph-names")]
    weight_sid: Option<StringId>,
    pub(crate) kind: FontKind<'a>,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum FontKind<'a> {
    SID(SIDMetadata<'a>),
    CID(CIDMetadata<'a>),
}

#[derive(Clone, Copy, Default, Debug)]
pub(crate) struct SIDMetadata<'a> {
    pub(crate) local_subrs: Index<'a>,
    pub(crate) private_dict: PrivateDict,
}

#[derive(Clone, Copy, Default, Debug)]
pub(crate) struct CIDMetadata<'a> {
    fd_array: Index<'a>,
    fd_select: FDSelect<'a>,
    cid_count: u16,
}

impl<'a> Table<'a> {
    pub fn parse(data: &'a [u8], face_index: u32) -> Result<Self, Error> {
        let mut s = Stream::new(data);

        // Parse Header.
        let major: u8 = s.read().ok_or(Error::UnknownFileFormat)?;
        s.skip::<u8>(); // minor
        let header_size: u8 = s.read().ok_or(Error::UnknownFileFormat)?;
        let abs_offset_size: u8 = s.read().ok_or(Error::UnknownFileFormat)?;

        if major != 1 || header_size < 4 || abs_offset_size > 4 {
            return Err(Error::UnknownFileFormat);
        }

        // Jump to Name INDEX. It's not necessarily right after the header.
        s.advance(usize::from(header_size) - 4);

        let names = parse_index(&mut s).ok_or(Error::UnknownFileFormat)?;

        // A face index past the Name INDEX means the caller asked
        // for a font this file doesn't have.
        if names.len() != 0 && face_index >= names.len() {
            return Err(Error::InvalidArgument);
        }

        let top_dicts = parse_index(&mut s).ok_or(Error::UnknownFileFormat)?;
        let strings = parse_index(&mut s).ok_or(Error::UnknownFileFormat)?;
        let global_subrs = parse_index(&mut s).ok_or(Error::UnknownFileFormat)?;

        let top_dict_data = top_dicts.get(face_index).ok_or(Error::UnknownFileFormat)?;
        let top_dict = parse_top_dict(top_dict_data)?;

        // Type 2 is the only charstring format this interpreter understands.
        if top_dict.charstring_type != 2 {
            return Err(Error::UnimplementedFeature);
        }

        // Must be set, otherwise there is nothing to parse.
        let char_strings_offset = top_dict.char_strings_offset
            .ok_or(Error::UnknownFileFormat)?;

        let char_strings = {
            let mut s = Stream::new_at(data, char_strings_offset)
                .ok_or(Error::InvalidFileFormat)?;
            parse_index(&mut s).ok_or(Error::InvalidFileFormat)?
        };

        if char_strings.len() == 0 {
            return Err(Error::UnknownFileFormat);
        }

        // 'The number of glyphs is the value of the count field in the CharStrings INDEX.'
        let number_of_glyphs = u16::try_from(char_strings.len())
            .map_err(|_| Error::InvalidFileFormat)?;

        let charset = match top_dict.charset_offset {
            Some(offset @ charset_id::ISO_ADOBE..=charset_id::EXPERT_SUBSET) => {
                // Each predefined charset covers a fixed number of glyphs
                // and the font must have exactly that many.
                parse_predefined_charset(offset, number_of_glyphs)
                    .ok_or(Error::InvalidFileFormat)?
            }
            Some(offset) => {
                let mut s = Stream::new_at(data, offset).ok_or(Error::InvalidFileFormat)?;
                parse_charset(number_of_glyphs, &mut s).ok_or(Error::InvalidFileFormat)?
            }
            // A missing charset operator implies ISOAdobe ordering,
            // without the glyph-count restriction of the explicit form.
            None => Charset::ISOAdobe,
        };

        let kind = if top_dict.has_ros {
            parse_cid_metadata(data, &top_dict, number_of_glyphs)?
        } else {
            parse_sid_metadata(data, &top_dict)?
        };

        let encoding = match kind {
            FontKind::SID(_) => {
                match top_dict.encoding_offset {
                    Some(encoding_id::STANDARD) | None => Encoding::Standard,
                    Some(encoding_id::EXPERT) => Encoding::Expert,
                    Some(offset) => {
                        let mut s = Stream::new_at(data, offset)
                            .ok_or(Error::InvalidFileFormat)?;
                        parse_encoding(&mut s).ok_or(Error::InvalidFileFormat)?
                    }
                }
            }
            // 'There are no predefined encodings for CID fonts.'
            FontKind::CID(_) => Encoding::Standard,
        };

        let name = if names.len() != 0 {
            names.get(face_index).and_then(|name| core::str::from_utf8(name).ok())
        } else {
            None
        };

        Ok(Table {
            table_data: data,
            name,
            strings,
            global_subrs,
            charset,
            encoding,
            char_strings,
            matrix: top_dict.matrix,
            italic_angle: top_dict.italic_angle,
            underline_position: top_dict.underline_position,
            underline_thickness: top_dict.underline_thickness,
            font_bbox: top_dict.font_bbox,
            #[cfg(feature = "glyph-names")]
            weight_sid: top_dict.weight_sid.map(StringId),
            kind,
        })
    }

    pub fn number_of_glyphs(&self) -> u16 {
        match self.kind {
            // An explicit CIDCount is authoritative for the reported
            // glyph count; the CharStrings INDEX still bounds-checks
            // individual accesses.
            FontKind::CID(ref cid) => cid.cid_count,
            FontKind::SID(_) => self.char_strings.len() as u16,
        }
    }

    pub fn is_cid(&self) -> bool {
        matches!(self.kind, FontKind::CID(_))
    }

    pub fn outline<'b>(
        &'b self,
        glyph_id: GlyphId,
        hinter: Option<&'b mut dyn Hinter>,
        builder: &mut dyn OutlineBuilder,
    ) -> Result<GlyphOutline, Error> {
        let data = self.char_strings.get(u32::from(glyph_id.0))
            .ok_or(Error::InvalidArgument)?;
        charstring::parse_char_string(data, self, glyph_id, hinter, builder)
    }

    pub fn private_dict(&self, glyph_id: GlyphId) -> Option<PrivateDict> {
        match self.kind {
            FontKind::SID(ref sid) => Some(sid.private_dict),
            FontKind::CID(ref cid) => {
                self.cid_font_dict(glyph_id, cid).map(|(dict, _)| dict)
            }
        }
    }

    /// In CID fonts, private data lives per sub-font:
    ///   1. Find the Font DICT index via FDSelect by GID.
    ///   2. Get the Font DICT data from FDArray using this index.
    ///   3. Get the Private DICT range from the Font DICT.
    ///   4. Parse the Private DICT, including its local subroutine offset.
    pub(crate) fn cid_font_dict(
        &self,
        glyph_id: GlyphId,
        cid: &CIDMetadata,
    ) -> Option<(PrivateDict, Index<'a>)> {
        let font_dict_index = cid.fd_select.font_dict_index(glyph_id)?;
        let font_dict_data = cid.fd_array.get(u32::from(font_dict_index))?;
        let private_dict_range = parse_font_dict(font_dict_data)?;
        let private_dict_data = self.table_data.get(private_dict_range.clone())?;
        let private_dict = parse_private_dict(private_dict_data);

        let local_subrs = match private_dict.subrs_offset {
            Some(offset) => {
                parse_local_subrs(self.table_data, private_dict_range.start, offset)
                    .unwrap_or_default()
            }
            None => Index::default(),
        };

        Some((private_dict, local_subrs))
    }

    /// Resolves the `Weight` string, like `Regular` or `Bold`.
    #[cfg(feature = "glyph-names")]
    pub fn weight(&self) -> Option<&'a str> {
        self.string_by_sid(self.weight_sid?)
    }

    #[cfg(feature = "glyph-names")]
    pub fn glyph_name(&self, glyph_id: GlyphId) -> Option<&'a str> {
        match self.kind {
            FontKind::SID(_) => {
                let sid = self.charset.gid_to_sid(glyph_id)?;
                self.string_by_sid(sid)
            }
            FontKind::CID(_) => None,
        }
    }

    #[cfg(feature = "glyph-names")]
    pub fn glyph_index_by_name(&self, name: &str) -> Option<GlyphId> {
        if self.is_cid() {
            return None;
        }

        let sid = match std_names::STANDARD_NAMES.iter().position(|n| *n == name) {
            Some(idx) => StringId(idx as u16),
            None => {
                let idx = self.strings.into_iter()
                    .position(|s| s == name.as_bytes())?;
                StringId(STANDARD_NAMES_LEN + idx as u16)
            }
        };

        self.charset.sid_to_gid(sid)
    }

    #[cfg(feature = "glyph-names")]
    fn string_by_sid(&self, sid: StringId) -> Option<&'a str> {
        match std_names::STANDARD_NAMES.get(usize::from(sid.0)) {
            Some(name) => Some(name),
            None => {
                let idx = u32::from(sid.0 - STANDARD_NAMES_LEN);
                let name = self.strings.get(idx)?;
                core::str::from_utf8(name).ok()
            }
        }
    }

    pub fn glyph_index_by_code(&self, code: u8) -> Option<GlyphId> {
        if self.is_cid() {
            return None;
        }

        self.encoding.code_to_gid(&self.charset, code)
    }

    /// Resolves a *standard encoding* character code into a glyph ID,
    /// as required by `endchar`-based accent composition.
    pub(crate) fn seac_code_to_glyph_id(&self, code: u8) -> Option<GlyphId> {
        let sid = StringId(u16::from(STANDARD_ENCODING[usize::from(code)]));

        match self.charset {
            Charset::ISOAdobe => {
                // ISO Adobe charset only defines string ids up to 228.
                if sid.0 <= 228 { Some(GlyphId(sid.0)) } else { None }
            }
            Charset::Expert | Charset::ExpertSubset => None,
            _ => self.charset.sid_to_gid(sid),
        }
    }
}

fn parse_sid_metadata<'a>(data: &'a [u8], top_dict: &TopDict) -> Result<FontKind<'a>, Error> {
    let mut metadata = SIDMetadata::default();

    let range = match top_dict.private_dict_range.clone() {
        Some(range) => range,
        None => return Ok(FontKind::SID(metadata)),
    };

    let private_dict_data = data.get(range.clone()).ok_or(Error::InvalidFileFormat)?;
    metadata.private_dict = parse_private_dict(private_dict_data);

    if let Some(offset) = metadata.private_dict.subrs_offset {
        metadata.local_subrs = parse_local_subrs(data, range.start, offset)
            .ok_or(Error::InvalidFileFormat)?;
    }

    Ok(FontKind::SID(metadata))
}

fn parse_cid_metadata<'a>(
    data: &'a [u8],
    top_dict: &TopDict,
    number_of_glyphs: u16,
) -> Result<FontKind<'a>, Error> {
    let (fd_array_offset, fd_select_offset) =
        match (top_dict.fd_array_offset, top_dict.fd_select_offset) {
            (Some(a), Some(b)) => (a, b),
            // FDArray and FDSelect must be set.
            _ => return Err(Error::InvalidFileFormat),
        };

    // 'There are no predefined charsets for CID fonts.'
    // Adobe Technical Note #5176, chapter 18 CID-keyed Fonts
    match top_dict.charset_offset {
        Some(offset) if offset > charset_id::EXPERT_SUBSET => {}
        _ => return Err(Error::InvalidFileFormat),
    }

    let mut metadata = CIDMetadata::default();
    metadata.cid_count = top_dict.cid_count;

    metadata.fd_array = {
        let mut s = Stream::new_at(data, fd_array_offset).ok_or(Error::InvalidFileFormat)?;
        parse_index(&mut s).ok_or(Error::InvalidFileFormat)?
    };

    if metadata.fd_array.len() > MAX_CID_FONTS {
        return Err(Error::InvalidFileFormat);
    }

    metadata.fd_select = {
        let mut s = Stream::new_at(data, fd_select_offset).ok_or(Error::InvalidFileFormat)?;
        parse_fd_select(number_of_glyphs, &mut s).ok_or(Error::InvalidFileFormat)?
    };

    Ok(FontKind::CID(metadata))
}

// 'The local subroutines offset is relative to the beginning
// of the Private DICT data.'
fn parse_local_subrs(data: &[u8], private_dict_start: usize, offset: usize) -> Option<Index> {
    let start = private_dict_start.checked_add(offset)?;
    let subrs_data = data.get(start..)?;
    let mut s = Stream::new(subrs_data);
    parse_index(&mut s)
}


#[derive(Default)]
struct TopDict {
    matrix: Matrix,
    charset_offset: Option<usize>,
    encoding_offset: Option<usize>,
    char_strings_offset: Option<usize>,
    private_dict_range: Option<Range<usize>>,
    charstring_type: i32,
    has_ros: bool,
    cid_count: u16,
    fd_array_offset: Option<usize>,
    fd_select_offset: Option<usize>,
    #[cfg(feature = "glyph-names")]
    weight_sid: Option<u16>,
    italic_angle: f32,
    underline_position: f32,
    underline_thickness: f32,
    font_bbox: [f32; 4],
}

fn parse_top_dict(data: &[u8]) -> Result<TopDict, Error> {
    let mut top_dict = TopDict::default();
    top_dict.charstring_type = 2;
    top_dict.cid_count = 8720;
    top_dict.underline_position = -100.0;
    top_dict.underline_thickness = 50.0;

    let mut operands_buffer = [0; MAX_OPERANDS_LEN];
    let mut dict_parser = DictionaryParser::new(data, &mut operands_buffer);
    while let Some(operator) = dict_parser.parse_next() {
        match operator.get() {
            #[cfg(feature = "glyph-names")]
            top_dict_operator::WEIGHT => {
                top_dict.weight_sid = dict_parser.parse_i32()
                    .and_then(|n| u16::try_from(n).ok());
            }
            top_dict_operator::FONT_BBOX => {
                let mut bbox = [0.0; 4];
                let len = dict_parser.parse_floats(&mut bbox)
                    .ok_or(Error::InvalidFileFormat)?;
                if len != 4 {
                    return Err(Error::StackUnderflow);
                }
                top_dict.font_bbox = bbox;
            }
            top_dict_operator::ITALIC_ANGLE => {
                top_dict.italic_angle = dict_parser.parse_float().unwrap_or(0.0);
            }
            top_dict_operator::UNDERLINE_POSITION => {
                if let Some(n) = dict_parser.parse_float() {
                    top_dict.underline_position = n;
                }
            }
            top_dict_operator::UNDERLINE_THICKNESS => {
                if let Some(n) = dict_parser.parse_float() {
                    top_dict.underline_thickness = n;
                }
            }
            top_dict_operator::CHAR_STRING_TYPE => {
                top_dict.charstring_type = dict_parser.parse_i32()
                    .ok_or(Error::InvalidFileFormat)?;
            }
            top_dict_operator::FONT_MATRIX => {
                let mut matrix = [0.0; 6];
                let len = dict_parser.parse_floats(&mut matrix)
                    .ok_or(Error::InvalidFileFormat)?;
                if len != 6 {
                    return Err(Error::StackUnderflow);
                }
                top_dict.matrix = Matrix {
                    sx: matrix[0], kx: matrix[1],
                    ky: matrix[2], sy: matrix[3],
                    tx: matrix[4], ty: matrix[5],
                };
            }
            top_dict_operator::CHARSET_OFFSET => {
                top_dict.charset_offset = dict_parser.parse_offset();
            }
            top_dict_operator::ENCODING_OFFSET => {
                top_dict.encoding_offset = dict_parser.parse_offset();
            }
            top_dict_operator::CHAR_STRINGS_OFFSET => {
                top_dict.char_strings_offset = dict_parser.parse_offset();
            }
            top_dict_operator::PRIVATE_DICT_SIZE_AND_OFFSET => {
                let range = dict_parser.parse_range();
                if range.is_none() {
                    return Err(Error::StackUnderflow);
                }
                top_dict.private_dict_range = range;
            }
            top_dict_operator::ROS => {
                // registry SID, ordering SID, supplement number
                dict_parser.parse_operands().ok_or(Error::InvalidFileFormat)?;
                if dict_parser.operands().len() < 3 {
                    return Err(Error::StackUnderflow);
                }
                top_dict.has_ros = true;
            }
            top_dict_operator::CID_COUNT => {
                if let Some(n) = dict_parser.parse_i32() {
                    top_dict.cid_count = u16::try_from(n)
                        .map_err(|_| Error::InvalidFileFormat)?;
                }
            }
            top_dict_operator::FD_ARRAY => {
                top_dict.fd_array_offset = dict_parser.parse_offset();
            }
            top_dict_operator::FD_SELECT => {
                top_dict.fd_select_offset = dict_parser.parse_offset();
            }
            // Unknown operators are not an error. The stack is cleared
            // by the parser when it looks for the next operator.
            _ => {}
        }
    }

    Ok(top_dict)
}

fn parse_private_dict(data: &[u8]) -> PrivateDict {
    let mut dict = PrivateDict::default();

    let mut operands_buffer = [0; MAX_OPERANDS_LEN];
    let mut dict_parser = DictionaryParser::new(data, &mut operands_buffer);
    while let Some(operator) = dict_parser.parse_next() {
        match operator.get() {
            private_dict_operator::BLUE_VALUES => {
                let mut buf = dict.blue_values;
                if let Some(len) = dict_parser.parse_delta(&mut buf) {
                    dict.blue_values = buf;
                    dict.blue_values_len = len as u8;
                }
            }
            private_dict_operator::OTHER_BLUES => {
                let mut buf = dict.other_blues;
                if let Some(len) = dict_parser.parse_delta(&mut buf) {
                    dict.other_blues = buf;
                    dict.other_blues_len = len as u8;
                }
            }
            private_dict_operator::FAMILY_BLUES => {
                let mut buf = dict.family_blues;
                if let Some(len) = dict_parser.parse_delta(&mut buf) {
                    dict.family_blues = buf;
                    dict.family_blues_len = len as u8;
                }
            }
            private_dict_operator::FAMILY_OTHER_BLUES => {
                let mut buf = dict.family_other_blues;
                if let Some(len) = dict_parser.parse_delta(&mut buf) {
                    dict.family_other_blues = buf;
                    dict.family_other_blues_len = len as u8;
                }
            }
            private_dict_operator::BLUE_SCALE => {
                if let Some(n) = dict_parser.parse_float() {
                    dict.blue_scale = n;
                }
            }
            private_dict_operator::BLUE_SHIFT => {
                if let Some(n) = dict_parser.parse_float() {
                    dict.blue_shift = n;
                }
            }
            private_dict_operator::BLUE_FUZZ => {
                if let Some(n) = dict_parser.parse_float() {
                    dict.blue_fuzz = n;
                }
            }
            private_dict_operator::STD_HW => {
                dict.std_hw = dict_parser.parse_float();
            }
            private_dict_operator::STD_VW => {
                dict.std_vw = dict_parser.parse_float();
            }
            private_dict_operator::STEM_SNAP_H => {
                let mut buf = dict.stem_snap_h;
                if let Some(len) = dict_parser.parse_delta(&mut buf) {
                    dict.stem_snap_h = buf;
                    dict.stem_snap_h_len = len as u8;
                }
            }
            private_dict_operator::STEM_SNAP_V => {
                let mut buf = dict.stem_snap_v;
                if let Some(len) = dict_parser.parse_delta(&mut buf) {
                    dict.stem_snap_v = buf;
                    dict.stem_snap_v_len = len as u8;
                }
            }
            private_dict_operator::FORCE_BOLD => {
                dict.force_bold = dict_parser.parse_bool().unwrap_or(false);
            }
            private_dict_operator::LANGUAGE_GROUP => {
                dict.language_group = dict_parser.parse_i32().unwrap_or(0);
            }
            private_dict_operator::EXPANSION_FACTOR => {
                if let Some(n) = dict_parser.parse_float() {
                    dict.expansion_factor = n;
                }
            }
            private_dict_operator::INITIAL_RANDOM_SEED => {
                dict.initial_random_seed = dict_parser.parse_i32().unwrap_or(0);
            }
            private_dict_operator::LOCAL_SUBROUTINES_OFFSET => {
                dict.subrs_offset = dict_parser.parse_offset();
            }
            private_dict_operator::DEFAULT_WIDTH => {
                if let Some(n) = dict_parser.parse_float() {
                    dict.default_width = n;
                }
            }
            private_dict_operator::NOMINAL_WIDTH => {
                if let Some(n) = dict_parser.parse_float() {
                    dict.nominal_width = n;
                }
            }
            _ => {}
        }
    }

    dict
}

fn parse_font_dict(data: &[u8]) -> Option<Range<usize>> {
    let mut operands_buffer = [0; MAX_OPERANDS_LEN];
    let mut dict_parser = DictionaryParser::new(data, &mut operands_buffer);
    while let Some(operator) = dict_parser.parse_next() {
        if operator.get() == top_dict_operator::PRIVATE_DICT_SIZE_AND_OFFSET {
            return dict_parser.parse_range();
        }
    }

    None
}


#[derive(Clone, Copy, Debug)]
enum FDSelect<'a> {
    Format0(LazyArray16<'a, u8>),
    Format3(&'a [u8]), // It's easier to parse it in-place.
}

impl Default for FDSelect<'_> {
    fn default() -> Self {
        FDSelect::Format0(LazyArray16::default())
    }
}

impl FDSelect<'_> {
    fn font_dict_index(&self, glyph_id: GlyphId) -> Option<u8> {
        match self {
            FDSelect::Format0(ref array) => array.get(glyph_id.0),
            FDSelect::Format3(ref data) => {
                let mut s = Stream::new(data);
                let number_of_ranges: u16 = s.read()?;
                if number_of_ranges == 0 {
                    return None;
                }

                // 'A sentinel GID follows the last range element and serves
                // to delimit the last range in the array.'
                // So we can simply increase the number of ranges by one.
                let number_of_ranges = number_of_ranges.checked_add(1)?;

                // Range is: GlyphId + u8
                let mut prev_first_glyph: GlyphId = s.read()?;
                let mut prev_index: u8 = s.read()?;
                for _ in 1..number_of_ranges {
                    let curr_first_glyph: GlyphId = s.read()?;

                    // Ranges must be strictly increasing in first glyph.
                    if curr_first_glyph <= prev_first_glyph {
                        return None;
                    }

                    if (prev_first_glyph..curr_first_glyph).contains(&glyph_id) {
                        return Some(prev_index);
                    } else {
                        prev_index = s.read::<u8>()?;
                    }

                    prev_first_glyph = curr_first_glyph;
                }

                None
            }
        }
    }
}

fn parse_fd_select<'a>(number_of_glyphs: u16, s: &mut Stream<'a>) -> Option<FDSelect<'a>> {
    let format: u8 = s.read()?;
    match format {
        0 => Some(FDSelect::Format0(s.read_array16::<u8>(number_of_glyphs)?)),
        3 => Some(FDSelect::Format3(s.tail()?)),
        _ => None,
    }
}
