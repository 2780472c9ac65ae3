// Type 2 Charstring interpreter.
//
// Useful links:
// http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/font/pdfs/5177.Type2.pdf

use core::convert::TryFrom;

use crate::{BBox, Error, GlyphId, Hinter, OutlineBuilder};
use crate::parser::{Fixed, Stream, TryNumFrom};
use super::argstack::ArgumentsStack;
use super::index::Index;
use super::{FontKind, GlyphOutline, Table};

#[cfg(all(not(feature = "std"), feature = "no-std-float"))]
#[allow(unused_imports)]
use core_maths::*;

// Limits according to the Adobe Technical Note #5177 Appendix B.
const STACK_LIMIT: u8 = 10;
const MAX_ARGUMENTS_STACK_LEN: usize = 48;

// The size of the `put`/`get` scratch storage.
const SCRATCH_LEN: usize = 32;

const TWO_BYTE_OPERATOR_MARK: u8 = 12;

/// Enumerates some operators defined in the Adobe Technical Note #5177.
mod operator {
    pub const HORIZONTAL_STEM: u8           = 1;
    pub const VERTICAL_STEM: u8             = 3;
    pub const VERTICAL_MOVE_TO: u8          = 4;
    pub const LINE_TO: u8                   = 5;
    pub const HORIZONTAL_LINE_TO: u8        = 6;
    pub const VERTICAL_LINE_TO: u8          = 7;
    pub const CURVE_TO: u8                  = 8;
    pub const CALL_LOCAL_SUBROUTINE: u8     = 10;
    pub const RETURN: u8                    = 11;
    pub const ENDCHAR: u8                   = 14;
    pub const HORIZONTAL_STEM_HINT_MASK: u8 = 18;
    pub const HINT_MASK: u8                 = 19;
    pub const COUNTER_MASK: u8              = 20;
    pub const MOVE_TO: u8                   = 21;
    pub const HORIZONTAL_MOVE_TO: u8        = 22;
    pub const VERTICAL_STEM_HINT_MASK: u8   = 23;
    pub const CURVE_LINE: u8                = 24;
    pub const LINE_CURVE: u8                = 25;
    pub const VV_CURVE_TO: u8               = 26;
    pub const HH_CURVE_TO: u8               = 27;
    pub const SHORT_INT: u8                 = 28;
    pub const CALL_GLOBAL_SUBROUTINE: u8    = 29;
    pub const VH_CURVE_TO: u8               = 30;
    pub const HV_CURVE_TO: u8               = 31;
    pub const FIXED_16_16: u8               = 255;

    // Two-byte operators, after the 12 prefix.
    pub const AND: u8                       = 3;
    pub const OR: u8                        = 4;
    pub const NOT: u8                       = 5;
    pub const STORE: u8                     = 8;
    pub const ABS: u8                       = 9;
    pub const ADD: u8                       = 10;
    pub const SUBTRACT: u8                  = 11;
    pub const DIVIDE: u8                    = 12;
    pub const LOAD: u8                      = 13;
    pub const NEGATE: u8                    = 14;
    pub const EQUAL: u8                     = 15;
    pub const DROP: u8                      = 18;
    pub const PUT: u8                       = 20;
    pub const GET: u8                       = 21;
    pub const IF_ELSE: u8                   = 22;
    pub const RANDOM: u8                    = 23;
    pub const MULTIPLY: u8                  = 24;
    pub const SQUARE_ROOT: u8               = 26;
    pub const DUPLICATE: u8                 = 27;
    pub const EXCHANGE: u8                  = 28;
    pub const INDEX: u8                     = 29;
    pub const ROLL: u8                      = 30;
    pub const HFLEX: u8                     = 34;
    pub const FLEX: u8                      = 35;
    pub const HFLEX1: u8                    = 36;
    pub const FLEX1: u8                     = 37;
}


struct CharStringParserContext<'a, 'f> {
    metadata: &'f Table<'a>,
    width: f32,
    nominal_width: f32,
    width_parsed: bool,
    stems_len: u32,
    has_endchar: bool,
    in_seac: bool,
    local_subrs: Index<'a>,
    scratch: [f32; SCRATCH_LEN],
    random_seed: u32,
    hinter: Option<&'f mut dyn Hinter>,
}

pub(crate) fn parse_char_string<'a, 'f>(
    data: &[u8],
    metadata: &'f Table<'a>,
    glyph_id: GlyphId,
    hinter: Option<&'f mut dyn Hinter>,
    builder: &mut dyn OutlineBuilder,
) -> Result<GlyphOutline, Error> {
    let (private_dict, local_subrs) = match metadata.kind {
        FontKind::SID(ref sid) => (sid.private_dict, sid.local_subrs),
        FontKind::CID(ref cid) => {
            metadata.cid_font_dict(glyph_id, cid).ok_or(Error::InvalidFileFormat)?
        }
    };

    // xorshift cannot leave a zero state.
    let mut random_seed = private_dict.initial_random_seed as u32;
    if random_seed == 0 {
        random_seed = 1;
    }

    let mut ctx = CharStringParserContext {
        metadata,
        width: private_dict.default_width,
        nominal_width: private_dict.nominal_width,
        width_parsed: false,
        stems_len: 0,
        has_endchar: false,
        in_seac: false,
        local_subrs,
        scratch: [0.0; SCRATCH_LEN],
        random_seed,
        hinter,
    };

    if let Some(ref mut hinter) = ctx.hinter {
        hinter.open();
    }

    let mut inner_builder = Builder {
        builder,
        bbox: BBox::new(),
        n_points: 0,
        open: false,
    };

    let mut stack = ArgumentsStack {
        data: &mut [0.0; MAX_ARGUMENTS_STACK_LEN], // 192B
        len: 0,
        max_len: MAX_ARGUMENTS_STACK_LEN,
    };
    let _ = _parse_char_string(&mut ctx, data, 0.0, 0.0, &mut stack, 0, &mut inner_builder)?;

    if !ctx.has_endchar {
        return Err(Error::MissingEndChar);
    }

    Ok(GlyphOutline {
        advance: ctx.width,
        bounding_box: inner_builder.bbox.to_rect(),
    })
}


pub(crate) struct Builder<'a> {
    builder: &'a mut dyn OutlineBuilder,
    bbox: BBox,
    n_points: u32,
    open: bool,
}

impl<'a> Builder<'a> {
    // A drawing operator before any `moveto` implicitly starts
    // a contour at the current pen position.
    #[inline]
    fn start_point(&mut self, x: f32, y: f32) {
        if !self.open {
            self.move_to(x, y);
        }
    }

    #[inline]
    fn move_to(&mut self, x: f32, y: f32) {
        self.open = true;
        self.n_points += 1;
        self.bbox.extend_by(x, y);
        self.builder.move_to(x, y);
    }

    #[inline]
    fn line_to(&mut self, x: f32, y: f32) {
        self.n_points += 1;
        self.bbox.extend_by(x, y);
        self.builder.line_to(x, y);
    }

    #[inline]
    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.n_points += 3;
        self.bbox.extend_by(x1, y1);
        self.bbox.extend_by(x2, y2);
        self.bbox.extend_by(x, y);
        self.builder.curve_to(x1, y1, x2, y2, x, y);
    }

    #[inline]
    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.builder.close();
        }
    }
}

fn _parse_char_string(
    ctx: &mut CharStringParserContext,
    char_string: &[u8],
    mut x: f32,
    mut y: f32,
    stack: &mut ArgumentsStack,
    depth: u8,
    builder: &mut Builder,
) -> Result<(f32, f32), Error> {
    let mut s = Stream::new(char_string);
    while !s.at_end() {
        let op: u8 = s.read().ok_or(Error::SyntaxError)?;
        match op {
            0 | 2 | 9 | 13 | 15 | 16 | 17 => {
                // Reserved.
                return Err(Error::UnimplementedFeature);
            }
            operator::HORIZONTAL_STEM |
            operator::VERTICAL_STEM |
            operator::HORIZONTAL_STEM_HINT_MASK |
            operator::VERTICAL_STEM_HINT_MASK => {
                // y dy {dya dyb}* hstem
                // x dx {dxa dxb}* vstem
                // y dy {dya dyb}* hstemhm
                // x dx {dxa dxb}* vstemhm

                // If the stack length is uneven, then the first value is a `width`.
                let mut i = 0;
                if stack.len().is_odd() && !ctx.width_parsed {
                    ctx.width = ctx.nominal_width + stack.at(0);
                    i = 1;
                }

                // A width can only precede the very first operator.
                ctx.width_parsed = true;

                ctx.stems_len += (stack.len() - i) as u32 >> 1;

                let horizontal = op == operator::HORIZONTAL_STEM
                    || op == operator::HORIZONTAL_STEM_HINT_MASK;
                if let Some(ref mut hinter) = ctx.hinter {
                    hinter.stems(horizontal, &stack.slice_mut()[i..]);
                }

                stack.clear();
            }
            operator::VERTICAL_MOVE_TO => {
                // dy1

                let mut i = 0;
                if stack.len() == 2 && !ctx.width_parsed {
                    ctx.width = ctx.nominal_width + stack.at(0);
                    i += 1;
                } else if stack.len() != 1 {
                    return Err(Error::InvalidArgument);
                }

                ctx.width_parsed = true;

                builder.close();

                y += stack.at(i);
                builder.move_to(x, y);

                stack.clear();
            }
            operator::LINE_TO => {
                // {dxa dya}+

                if stack.len().is_odd() || stack.is_empty() {
                    return Err(Error::InvalidArgument);
                }

                builder.start_point(x, y);

                let mut i = 0;
                while i < stack.len() {
                    x += stack.at(i + 0);
                    y += stack.at(i + 1);
                    builder.line_to(x, y);
                    i += 2;
                }

                stack.clear();
            }
            operator::HORIZONTAL_LINE_TO => {
                // dx1 {dya dxb}*
                //     {dxa dyb}+

                if stack.is_empty() {
                    return Err(Error::InvalidArgument);
                }

                builder.start_point(x, y);

                let mut i = 0;
                while i < stack.len() {
                    x += stack.at(i);
                    i += 1;
                    builder.line_to(x, y);

                    if i == stack.len() {
                        break;
                    }

                    y += stack.at(i);
                    i += 1;
                    builder.line_to(x, y);
                }

                stack.clear();
            }
            operator::VERTICAL_LINE_TO => {
                // dy1 {dxa dyb}*
                //     {dya dxb}+

                if stack.is_empty() {
                    return Err(Error::InvalidArgument);
                }

                builder.start_point(x, y);

                let mut i = 0;
                while i < stack.len() {
                    y += stack.at(i);
                    i += 1;
                    builder.line_to(x, y);

                    if i == stack.len() {
                        break;
                    }

                    x += stack.at(i);
                    i += 1;
                    builder.line_to(x, y);
                }

                stack.clear();
            }
            operator::CURVE_TO => {
                // {dxa dya dxb dyb dxc dyc}+

                if stack.len() % 6 != 0 || stack.is_empty() {
                    return Err(Error::InvalidArgument);
                }

                builder.start_point(x, y);

                let mut i = 0;
                while i < stack.len() {
                    let x1 = x + stack.at(i + 0);
                    let y1 = y + stack.at(i + 1);
                    let x2 = x1 + stack.at(i + 2);
                    let y2 = y1 + stack.at(i + 3);
                    x = x2 + stack.at(i + 4);
                    y = y2 + stack.at(i + 5);

                    builder.curve_to(x1, y1, x2, y2, x, y);
                    i += 6;
                }

                stack.clear();
            }
            operator::CALL_LOCAL_SUBROUTINE => {
                if stack.is_empty() {
                    return Err(Error::StackUnderflow);
                }

                if depth == STACK_LIMIT {
                    return Err(Error::SyntaxError);
                }

                let subroutine_bias = calc_subroutine_bias(ctx.local_subrs.len());
                let index = conv_subroutine_index(stack.pop(), subroutine_bias)?;
                let char_string = ctx.local_subrs.get(index).ok_or(Error::SyntaxError)?;
                if char_string.is_empty() {
                    return Err(Error::SyntaxError);
                }
                let pos = _parse_char_string(ctx, char_string, x, y, stack, depth + 1, builder)?;
                x = pos.0;
                y = pos.1;

                if ctx.has_endchar {
                    break;
                }
            }
            operator::RETURN => {
                if depth == 0 {
                    // A `return` outside of a subroutine.
                    return Err(Error::SyntaxError);
                }

                break;
            }
            TWO_BYTE_OPERATOR_MARK => {
                let op2: u8 = s.read().ok_or(Error::SyntaxError)?;
                match op2 {
                    operator::AND => {
                        if stack.len() < 2 {
                            return Err(Error::StackUnderflow);
                        }

                        let b = stack.pop();
                        let a = stack.pop();
                        stack.push(if a != 0.0 && b != 0.0 { 1.0 } else { 0.0 })?;
                    }
                    operator::OR => {
                        if stack.len() < 2 {
                            return Err(Error::StackUnderflow);
                        }

                        let b = stack.pop();
                        let a = stack.pop();
                        stack.push(if a != 0.0 || b != 0.0 { 1.0 } else { 0.0 })?;
                    }
                    operator::NOT => {
                        if stack.is_empty() {
                            return Err(Error::StackUnderflow);
                        }

                        let a = stack.pop();
                        stack.push(if a == 0.0 { 1.0 } else { 0.0 })?;
                    }
                    operator::ABS => {
                        if stack.is_empty() {
                            return Err(Error::StackUnderflow);
                        }

                        let a = stack.pop();
                        stack.push(f32_abs(a))?;
                    }
                    operator::ADD => {
                        if stack.len() < 2 {
                            return Err(Error::StackUnderflow);
                        }

                        let b = stack.pop();
                        let a = stack.pop();
                        stack.push(a + b)?;
                    }
                    operator::SUBTRACT => {
                        if stack.len() < 2 {
                            return Err(Error::StackUnderflow);
                        }

                        let b = stack.pop();
                        let a = stack.pop();
                        stack.push(a - b)?;
                    }
                    operator::DIVIDE => {
                        if stack.len() < 2 {
                            return Err(Error::StackUnderflow);
                        }

                        let b = stack.pop();
                        let a = stack.pop();
                        // A zero divisor would produce an infinity
                        // and poison every later coordinate.
                        stack.push(if b == 0.0 { 0.0 } else { a / b })?;
                    }
                    operator::NEGATE => {
                        if stack.is_empty() {
                            return Err(Error::StackUnderflow);
                        }

                        let a = stack.pop();
                        stack.push(-a)?;
                    }
                    operator::EQUAL => {
                        if stack.len() < 2 {
                            return Err(Error::StackUnderflow);
                        }

                        let b = stack.pop();
                        let a = stack.pop();
                        stack.push(if a == b { 1.0 } else { 0.0 })?;
                    }
                    operator::DROP => {
                        if stack.is_empty() {
                            return Err(Error::StackUnderflow);
                        }

                        stack.pop();
                    }
                    operator::PUT => {
                        if stack.len() < 2 {
                            return Err(Error::StackUnderflow);
                        }

                        let index = stack.pop();
                        let value = stack.pop();
                        // An out of bounds index is ignored.
                        if let Some(index) = scratch_index(index) {
                            ctx.scratch[index] = value;
                        } else {
                            warn!("A `put` index is out of bounds.");
                        }
                    }
                    operator::GET => {
                        if stack.is_empty() {
                            return Err(Error::StackUnderflow);
                        }

                        let index = stack.pop();
                        let value = match scratch_index(index) {
                            Some(index) => ctx.scratch[index],
                            None => 0.0,
                        };
                        stack.push(value)?;
                    }
                    operator::IF_ELSE => {
                        if stack.len() < 4 {
                            return Err(Error::StackUnderflow);
                        }

                        let s2 = stack.pop();
                        let s1 = stack.pop();
                        let v2 = stack.pop();
                        let v1 = stack.pop();
                        stack.push(if s1 <= s2 { v1 } else { v2 })?;
                    }
                    operator::RANDOM => {
                        // xorshift32
                        let mut n = ctx.random_seed;
                        n ^= n << 13;
                        n ^= n >> 17;
                        n ^= n << 5;
                        ctx.random_seed = n;

                        // Map into (0, 1]; the exact bit pattern is not
                        // part of the contract, only the range is.
                        let value = f32::from((n % 65535 + 1) as u16) / 65536.0;
                        stack.push(value)?;
                    }
                    operator::MULTIPLY => {
                        if stack.len() < 2 {
                            return Err(Error::StackUnderflow);
                        }

                        let b = stack.pop();
                        let a = stack.pop();
                        stack.push(a * b)?;
                    }
                    operator::SQUARE_ROOT => {
                        if stack.is_empty() {
                            return Err(Error::StackUnderflow);
                        }

                        let a = stack.pop();
                        stack.push(if a > 0.0 { a.sqrt() } else { 0.0 })?;
                    }
                    operator::DUPLICATE => {
                        if stack.is_empty() {
                            return Err(Error::StackUnderflow);
                        }

                        let a = stack.at(stack.len() - 1);
                        stack.push(a)?;
                    }
                    operator::EXCHANGE => {
                        if stack.len() < 2 {
                            return Err(Error::StackUnderflow);
                        }

                        let b = stack.pop();
                        let a = stack.pop();
                        stack.push(b)?;
                        stack.push(a)?;
                    }
                    operator::INDEX => {
                        if stack.len() < 2 {
                            return Err(Error::StackUnderflow);
                        }

                        let index = stack.pop();
                        let len = stack.len();
                        // A negative or out of bounds index duplicates
                        // the top element.
                        let index = match i32::try_num_from(index) {
                            Some(n) if n > 0 => (n as usize).min(len - 1),
                            _ => 0,
                        };
                        let a = stack.at(len - 1 - index);
                        stack.push(a)?;
                    }
                    operator::ROLL => {
                        if stack.len() < 2 {
                            return Err(Error::StackUnderflow);
                        }

                        let shift = stack.pop();
                        let count = stack.pop();

                        let count = match i32::try_num_from(count) {
                            Some(n) if n > 0 => n as usize,
                            _ => 1,
                        };
                        if count > stack.len() {
                            return Err(Error::StackUnderflow);
                        }

                        let shift = i32::try_num_from(shift).unwrap_or(0);
                        let len = stack.len();
                        let slice = &mut stack.slice_mut()[len - count..];
                        if shift > 0 {
                            slice.rotate_right(shift as usize % count);
                        } else if shift < 0 {
                            slice.rotate_left(-shift as usize % count);
                        }
                    }
                    operator::STORE | operator::LOAD => {
                        // Type 1 transient array transfers. No known
                        // CFF font uses them.
                        return Err(Error::UnimplementedFeature);
                    }
                    operator::HFLEX => {
                        // dx1 dx2 dy2 dx3 dx4 dx5 dx6

                        if stack.len() != 7 {
                            return Err(Error::InvalidArgument);
                        }

                        builder.start_point(x, y);

                        let dx1 = x + stack.at(0);
                        let dy1 = y;
                        let dx2 = dx1 + stack.at(1);
                        let dy2 = dy1 + stack.at(2);
                        let dx3 = dx2 + stack.at(3);
                        let dy3 = dy2;
                        let dx4 = dx3 + stack.at(4);
                        let dy4 = dy2;
                        let dx5 = dx4 + stack.at(5);
                        let dy5 = y;
                        x = dx5 + stack.at(6);
                        builder.curve_to(dx1, dy1, dx2, dy2, dx3, dy3);
                        builder.curve_to(dx4, dy4, dx5, dy5, x, y);

                        stack.clear();
                    }
                    operator::FLEX => {
                        // dx1 dy1 dx2 dy2 dx3 dy3 dx4 dy4 dx5 dy5 dx6 dy6 fd

                        if stack.len() != 13 {
                            return Err(Error::InvalidArgument);
                        }

                        builder.start_point(x, y);

                        let dx1 = x + stack.at(0);
                        let dy1 = y + stack.at(1);
                        let dx2 = dx1 + stack.at(2);
                        let dy2 = dy1 + stack.at(3);
                        let dx3 = dx2 + stack.at(4);
                        let dy3 = dy2 + stack.at(5);
                        let dx4 = dx3 + stack.at(6);
                        let dy4 = dy3 + stack.at(7);
                        let dx5 = dx4 + stack.at(8);
                        let dy5 = dy4 + stack.at(9);
                        x = dx5 + stack.at(10);
                        y = dy5 + stack.at(11);
                        builder.curve_to(dx1, dy1, dx2, dy2, dx3, dy3);
                        builder.curve_to(dx4, dy4, dx5, dy5, x, y);

                        stack.clear();
                    }
                    operator::HFLEX1 => {
                        // dx1 dy1 dx2 dy2 dx3 dx4 dx5 dy5 dx6

                        if stack.len() != 9 {
                            return Err(Error::InvalidArgument);
                        }

                        builder.start_point(x, y);

                        let dx1 = x + stack.at(0);
                        let dy1 = y + stack.at(1);
                        let dx2 = dx1 + stack.at(2);
                        let dy2 = dy1 + stack.at(3);
                        let dx3 = dx2 + stack.at(4);
                        let dy3 = dy2;
                        let dx4 = dx3 + stack.at(5);
                        let dy4 = dy2;
                        let dx5 = dx4 + stack.at(6);
                        let dy5 = dy4 + stack.at(7);
                        x = dx5 + stack.at(8);
                        builder.curve_to(dx1, dy1, dx2, dy2, dx3, dy3);
                        builder.curve_to(dx4, dy4, dx5, dy5, x, y);

                        stack.clear();
                    }
                    operator::FLEX1 => {
                        // dx1 dy1 dx2 dy2 dx3 dy3 dx4 dy4 dx5 dy5 d6

                        if stack.len() != 11 {
                            return Err(Error::InvalidArgument);
                        }

                        builder.start_point(x, y);

                        let dx1 = x + stack.at(0);
                        let dy1 = y + stack.at(1);
                        let dx2 = dx1 + stack.at(2);
                        let dy2 = dy1 + stack.at(3);
                        let dx3 = dx2 + stack.at(4);
                        let dy3 = dy2 + stack.at(5);
                        let dx4 = dx3 + stack.at(6);
                        let dy4 = dy3 + stack.at(7);
                        let dx5 = dx4 + stack.at(8);
                        let dy5 = dy4 + stack.at(9);

                        if f32_abs(dx5 - x) > f32_abs(dy5 - y) {
                            x = dx5 + stack.at(10);
                        } else {
                            y = dy5 + stack.at(10);
                        }

                        builder.curve_to(dx1, dy1, dx2, dy2, dx3, dy3);
                        builder.curve_to(dx4, dy4, dx5, dy5, x, y);

                        stack.clear();
                    }
                    _ => {
                        return Err(Error::UnimplementedFeature);
                    }
                }
            }
            operator::ENDCHAR => {
                let has_width = !ctx.width_parsed && stack.len() == 5;
                if stack.len() == 4 || has_width {
                    // Process 'seac'.
                    if has_width {
                        ctx.width = ctx.nominal_width + stack.at(0);
                    }

                    let accent_char = ctx.metadata.seac_code_to_glyph_id(
                        u8::try_num_from(stack.pop()).ok_or(Error::InvalidArgument)?
                    ).ok_or(Error::InvalidArgument)?;
                    let base_char = ctx.metadata.seac_code_to_glyph_id(
                        u8::try_num_from(stack.pop()).ok_or(Error::InvalidArgument)?
                    ).ok_or(Error::InvalidArgument)?;
                    let dy = stack.pop();
                    let dx = stack.pop();

                    if has_width {
                        stack.pop();
                    }
                    ctx.width_parsed = true;

                    if depth == STACK_LIMIT {
                        return Err(Error::SyntaxError);
                    }

                    ctx.in_seac = true;

                    let base_char_string = ctx.metadata.char_strings
                        .get(u32::from(base_char.0)).ok_or(Error::InvalidArgument)?;
                    _parse_char_string(ctx, base_char_string, x, y, stack, depth + 1, builder)?;
                    x = dx;
                    y = dy;

                    let accent_char_string = ctx.metadata.char_strings
                        .get(u32::from(accent_char.0)).ok_or(Error::InvalidArgument)?;
                    _parse_char_string(ctx, accent_char_string, x, y, stack, depth + 1, builder)?;

                    ctx.in_seac = false;
                } else if stack.len() == 1 && !ctx.width_parsed {
                    ctx.width = ctx.nominal_width + stack.pop();
                    ctx.width_parsed = true;
                }

                builder.close();

                // The accent and the base charstring of an accented glyph
                // end with their own `endchar`; the hinting session closes
                // only at the composite's one.
                if !ctx.in_seac {
                    if let Some(ref mut hinter) = ctx.hinter {
                        hinter.close(builder.n_points);
                    }
                }

                ctx.has_endchar = true;

                // Anything past `endchar` is ignored.
                if !s.at_end() {
                    warn!("Data after `endchar` was ignored.");
                }
                break;
            }
            operator::HINT_MASK | operator::COUNTER_MASK => {
                // Leftover stack values are an implicit `vstem`.
                let mut i = 0;
                if stack.len().is_odd() && !ctx.width_parsed {
                    ctx.width = ctx.nominal_width + stack.at(0);
                    i = 1;
                }

                ctx.width_parsed = true;

                ctx.stems_len += (stack.len() - i) as u32 >> 1;

                if let Some(ref mut hinter) = ctx.hinter {
                    if stack.len() > i {
                        hinter.stems(false, &stack.slice_mut()[i..]);
                    }
                }

                stack.clear();

                let mask = s.read_bytes(((ctx.stems_len as usize) + 7) >> 3)
                    .ok_or(Error::SyntaxError)?;

                if let Some(ref mut hinter) = ctx.hinter {
                    if op == operator::HINT_MASK {
                        hinter.hint_mask(builder.n_points, ctx.stems_len, mask);
                    } else {
                        hinter.counter_mask(ctx.stems_len, mask);
                    }
                }
            }
            operator::MOVE_TO => {
                // dx1 dy1

                let mut i = 0;
                if stack.len() == 3 && !ctx.width_parsed {
                    ctx.width = ctx.nominal_width + stack.at(0);
                    i += 1;
                } else if stack.len() != 2 {
                    return Err(Error::InvalidArgument);
                }

                ctx.width_parsed = true;

                builder.close();

                x += stack.at(i + 0);
                y += stack.at(i + 1);
                builder.move_to(x, y);

                stack.clear();
            }
            operator::HORIZONTAL_MOVE_TO => {
                // dx1

                let mut i = 0;
                if stack.len() == 2 && !ctx.width_parsed {
                    ctx.width = ctx.nominal_width + stack.at(0);
                    i += 1;
                } else if stack.len() != 1 {
                    return Err(Error::InvalidArgument);
                }

                ctx.width_parsed = true;

                builder.close();

                x += stack.at(i);
                builder.move_to(x, y);

                stack.clear();
            }
            operator::CURVE_LINE => {
                // {dxa dya dxb dyb dxc dyc}+ dxd dyd

                if stack.len() < 8 {
                    return Err(Error::InvalidArgument);
                }

                if (stack.len() - 2) % 6 != 0 {
                    return Err(Error::InvalidArgument);
                }

                builder.start_point(x, y);

                let mut i = 0;
                while i < stack.len() - 2 {
                    let x1 = x + stack.at(i + 0);
                    let y1 = y + stack.at(i + 1);
                    let x2 = x1 + stack.at(i + 2);
                    let y2 = y1 + stack.at(i + 3);
                    x = x2 + stack.at(i + 4);
                    y = y2 + stack.at(i + 5);

                    builder.curve_to(x1, y1, x2, y2, x, y);
                    i += 6;
                }

                x += stack.at(i + 0);
                y += stack.at(i + 1);
                builder.line_to(x, y);

                stack.clear();
            }
            operator::LINE_CURVE => {
                // {dxa dya}+ dxb dyb dxc dyc dxd dyd

                if stack.len() < 8 {
                    return Err(Error::InvalidArgument);
                }

                if (stack.len() - 6).is_odd() {
                    return Err(Error::InvalidArgument);
                }

                builder.start_point(x, y);

                let mut i = 0;
                while i < stack.len() - 6 {
                    x += stack.at(i + 0);
                    y += stack.at(i + 1);

                    builder.line_to(x, y);
                    i += 2;
                }

                let x1 = x + stack.at(i + 0);
                let y1 = y + stack.at(i + 1);
                let x2 = x1 + stack.at(i + 2);
                let y2 = y1 + stack.at(i + 3);
                x = x2 + stack.at(i + 4);
                y = y2 + stack.at(i + 5);
                builder.curve_to(x1, y1, x2, y2, x, y);

                stack.clear();
            }
            operator::VV_CURVE_TO => {
                // dx1? {dya dxb dyb dyc}+

                let mut i = 0;

                // The odd argument count indicates an X position.
                if stack.len().is_odd() {
                    i += 1;
                }

                if (stack.len() - i) % 4 != 0 || stack.len() == i {
                    return Err(Error::InvalidArgument);
                }

                builder.start_point(x, y);

                if i == 1 {
                    x += stack.at(0);
                }

                while i < stack.len() {
                    let x1 = x;
                    let y1 = y + stack.at(i + 0);
                    let x2 = x1 + stack.at(i + 1);
                    let y2 = y1 + stack.at(i + 2);
                    x = x2;
                    y = y2 + stack.at(i + 3);

                    builder.curve_to(x1, y1, x2, y2, x, y);
                    i += 4;
                }

                stack.clear();
            }
            operator::HH_CURVE_TO => {
                // dy1? {dxa dxb dyb dxc}+

                let mut i = 0;

                // The odd argument count indicates an Y position.
                if stack.len().is_odd() {
                    i += 1;
                }

                if (stack.len() - i) % 4 != 0 || stack.len() == i {
                    return Err(Error::InvalidArgument);
                }

                builder.start_point(x, y);

                if i == 1 {
                    y += stack.at(0);
                }

                while i < stack.len() {
                    let x1 = x + stack.at(i + 0);
                    let y1 = y;
                    let x2 = x1 + stack.at(i + 1);
                    let y2 = y1 + stack.at(i + 2);
                    x = x2 + stack.at(i + 3);
                    y = y2;

                    builder.curve_to(x1, y1, x2, y2, x, y);
                    i += 4;
                }

                stack.clear();
            }
            operator::SHORT_INT => {
                let n = s.read::<i16>().ok_or(Error::SyntaxError)?;
                stack.push(f32::from(n))?;
            }
            operator::CALL_GLOBAL_SUBROUTINE => {
                if stack.is_empty() {
                    return Err(Error::StackUnderflow);
                }

                if depth == STACK_LIMIT {
                    return Err(Error::SyntaxError);
                }

                let subroutine_bias = calc_subroutine_bias(ctx.metadata.global_subrs.len());
                let index = conv_subroutine_index(stack.pop(), subroutine_bias)?;
                let char_string = ctx.metadata.global_subrs.get(index)
                    .ok_or(Error::SyntaxError)?;
                if char_string.is_empty() {
                    return Err(Error::SyntaxError);
                }
                let pos = _parse_char_string(ctx, char_string, x, y, stack, depth + 1, builder)?;
                x = pos.0;
                y = pos.1;

                if ctx.has_endchar {
                    break;
                }
            }
            operator::VH_CURVE_TO => {
                // dy1 dx2 dy2 dx3 {dxa dxb dyb dyc dyd dxe dye dxf}* dyf?
                //                 {dya dxb dyb dxc dxd dxe dye dyf}+ dxf?

                if stack.len() < 4 {
                    return Err(Error::InvalidArgument);
                }

                builder.start_point(x, y);

                stack.reverse();
                while !stack.is_empty() {
                    if stack.len() < 4 {
                        return Err(Error::InvalidArgument);
                    }

                    let x1 = x;
                    let y1 = y + stack.pop();
                    let x2 = x1 + stack.pop();
                    let y2 = y1 + stack.pop();
                    x = x2 + stack.pop();
                    y = y2 + if stack.len() == 1 { stack.pop() } else { 0.0 };
                    builder.curve_to(x1, y1, x2, y2, x, y);
                    if stack.is_empty() {
                        break;
                    }

                    if stack.len() < 4 {
                        return Err(Error::InvalidArgument);
                    }

                    let x1 = x + stack.pop();
                    let y1 = y;
                    let x2 = x1 + stack.pop();
                    let y2 = y1 + stack.pop();
                    y = y2 + stack.pop();
                    x = x2 + if stack.len() == 1 { stack.pop() } else { 0.0 };
                    builder.curve_to(x1, y1, x2, y2, x, y);
                }

                debug_assert!(stack.is_empty());
            }
            operator::HV_CURVE_TO => {
                // dx1 dx2 dy2 dy3 {dya dxb dyb dxc dxd dxe dye dyf}* dxf?
                //                 {dxa dxb dyb dyc dyd dxe dye dxf}+ dyf?

                if stack.len() < 4 {
                    return Err(Error::InvalidArgument);
                }

                builder.start_point(x, y);

                stack.reverse();
                while !stack.is_empty() {
                    if stack.len() < 4 {
                        return Err(Error::InvalidArgument);
                    }

                    let x1 = x + stack.pop();
                    let y1 = y;
                    let x2 = x1 + stack.pop();
                    let y2 = y1 + stack.pop();
                    y = y2 + stack.pop();
                    x = x2 + if stack.len() == 1 { stack.pop() } else { 0.0 };
                    builder.curve_to(x1, y1, x2, y2, x, y);
                    if stack.is_empty() {
                        break;
                    }

                    if stack.len() < 4 {
                        return Err(Error::InvalidArgument);
                    }

                    let x1 = x;
                    let y1 = y + stack.pop();
                    let x2 = x1 + stack.pop();
                    let y2 = y1 + stack.pop();
                    x = x2 + stack.pop();
                    y = y2 + if stack.len() == 1 { stack.pop() } else { 0.0 };
                    builder.curve_to(x1, y1, x2, y2, x, y);
                }

                debug_assert!(stack.is_empty());
            }
            32..=246 => {
                let n = i16::from(op) - 139;
                stack.push(f32::from(n))?;
            }
            247..=250 => {
                let b1: u8 = s.read().ok_or(Error::SyntaxError)?;
                let n = (i16::from(op) - 247) * 256 + i16::from(b1) + 108;
                debug_assert!((108..=1131).contains(&n));
                stack.push(f32::from(n))?;
            }
            251..=254 => {
                let b1: u8 = s.read().ok_or(Error::SyntaxError)?;
                let n = -(i16::from(op) - 251) * 256 - i16::from(b1) - 108;
                debug_assert!((-1131..=-108).contains(&n));
                stack.push(f32::from(n))?;
            }
            operator::FIXED_16_16 => {
                let n = s.read::<Fixed>().ok_or(Error::SyntaxError)?;
                stack.push(n.0)?;
            }
        }
    }

    Ok((x, y))
}

#[inline]
fn conv_subroutine_index(index: f32, bias: u16) -> Result<u32, Error> {
    conv_subroutine_index_impl(index, bias).ok_or(Error::SyntaxError)
}

#[inline]
fn conv_subroutine_index_impl(index: f32, bias: u16) -> Option<u32> {
    let index = i32::try_num_from(index)?;
    let bias = i32::from(bias);

    let index = index.checked_add(bias)?;
    u32::try_from(index).ok()
}

// Adobe Technical Note #5176, Chapter 16 "Local / Global Subrs INDEXes"
#[inline]
pub(crate) fn calc_subroutine_bias(len: u32) -> u16 {
    if len < 1240 {
        107
    } else if len < 33900 {
        1131
    } else {
        32768
    }
}

#[inline]
fn scratch_index(n: f32) -> Option<usize> {
    match i32::try_num_from(n) {
        Some(n) if n >= 0 && (n as usize) < SCRATCH_LEN => Some(n as usize),
        _ => None,
    }
}

// `abs` is not available in `core`.
#[inline]
fn f32_abs(n: f32) -> f32 {
    if n.is_sign_negative() { -n } else { n }
}

trait IsOdd {
    fn is_odd(&self) -> bool;
}

impl IsOdd for usize {
    #[inline]
    fn is_odd(&self) -> bool {
        self & 1 == 1
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::string::String;
    use std::fmt::Write as _;
    use crate::Rect;
    use crate::cff::tests::FontBuilder;
    use crate::writer;
    use writer::TtfType::*;

    struct Builder(String);
    impl OutlineBuilder for Builder {
        fn move_to(&mut self, x: f32, y: f32) {
            write!(&mut self.0, "M {} {} ", x, y).unwrap();
        }

        fn line_to(&mut self, x: f32, y: f32) {
            write!(&mut self.0, "L {} {} ", x, y).unwrap();
        }

        fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
            write!(&mut self.0, "C {} {} {} {} {} {} ", x1, y1, x2, y2, x, y).unwrap();
        }

        fn close(&mut self) {
            write!(&mut self.0, "Z ").unwrap();
        }
    }

    fn rect(x_min: i16, y_min: i16, x_max: i16, y_max: i16) -> Rect {
        Rect { x_min, y_min, x_max, y_max }
    }

    fn outline_first_glyph(font: &FontBuilder) -> (Result<GlyphOutline, Error>, String) {
        let data = font.build();
        let table = Table::parse(&data, 0).unwrap();
        let mut builder = Builder(String::new());
        let res = table.outline(GlyphId(0), None, &mut builder);
        (res, builder.0)
    }

    macro_rules! test_cs_with_subrs {
        ($name:ident, $glob:expr, $loc:expr, $values:expr, $path:expr, $rect_res:expr) => {
            #[test]
            fn $name() {
                let global_subrs: &[&[writer::TtfType]] = $glob;
                let local_subrs: &[&[writer::TtfType]] = $loc;
                let mut font = FontBuilder::glyphs(&[$values]);
                font.global_subrs = global_subrs.iter().map(|s| writer::convert(s)).collect();
                font.local_subrs = local_subrs.iter().map(|s| writer::convert(s)).collect();
                let (res, path) = outline_first_glyph(&font);
                let outline = res.unwrap();

                assert_eq!(path, $path);
                assert_eq!(outline.bounding_box, Some($rect_res));
            }
        };
    }

    macro_rules! test_cs {
        ($name:ident, $values:expr, $path:expr, $rect_res:expr) => {
            test_cs_with_subrs!($name, &[], &[], $values, $path, $rect_res);
        };
    }

    macro_rules! test_cs_err {
        ($name:ident, $values:expr, $err:expr) => {
            #[test]
            fn $name() {
                let font = FontBuilder::glyphs(&[$values]);
                let (res, _) = outline_first_glyph(&font);
                assert_eq!(res.unwrap_err(), $err);
            }
        };
    }

    test_cs!(move_to, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 Z ",
        rect(10, 20, 10, 20)
    );

    test_cs!(move_to_with_width, &[
        CFFInt(5), CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 Z ",
        rect(10, 20, 10, 20)
    );

    test_cs!(hmove_to, &[
        CFFInt(10), UInt8(operator::HORIZONTAL_MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 0 Z ",
        rect(10, 0, 10, 0)
    );

    test_cs!(hmove_to_with_width, &[
        CFFInt(10), CFFInt(20), UInt8(operator::HORIZONTAL_MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 20 0 Z ",
        rect(20, 0, 20, 0)
    );

    test_cs!(vmove_to, &[
        CFFInt(10), UInt8(operator::VERTICAL_MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 0 10 Z ",
        rect(0, 10, 0, 10)
    );

    test_cs!(vmove_to_with_width, &[
        CFFInt(10), CFFInt(20), UInt8(operator::VERTICAL_MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 0 20 Z ",
        rect(0, 20, 0, 20)
    );

    test_cs!(line_to, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), UInt8(operator::LINE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 L 40 60 Z ",
        rect(10, 20, 40, 60)
    );

    test_cs!(line_to_with_multiple_pairs, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), CFFInt(60), UInt8(operator::LINE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 L 40 60 L 90 120 Z ",
        rect(10, 20, 90, 120)
    );

    test_cs!(hline_to, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), UInt8(operator::HORIZONTAL_LINE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 L 40 20 Z ",
        rect(10, 20, 40, 20)
    );

    test_cs!(hline_to_with_two_coords, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), UInt8(operator::HORIZONTAL_LINE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 L 40 20 L 40 60 Z ",
        rect(10, 20, 40, 60)
    );

    test_cs!(hline_to_with_three_coords, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), UInt8(operator::HORIZONTAL_LINE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 L 40 20 L 40 60 L 90 60 Z ",
        rect(10, 20, 90, 60)
    );

    test_cs!(vline_to, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), UInt8(operator::VERTICAL_LINE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 L 10 50 Z ",
        rect(10, 20, 10, 50)
    );

    test_cs!(vline_to_with_two_coords, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), UInt8(operator::VERTICAL_LINE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 L 10 50 L 50 50 Z ",
        rect(10, 20, 50, 50)
    );

    test_cs!(vline_to_with_three_coords, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), UInt8(operator::VERTICAL_LINE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 L 10 50 L 50 50 L 50 100 Z ",
        rect(10, 20, 50, 100)
    );

    test_cs!(curve_to, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), CFFInt(60), CFFInt(70), CFFInt(80),
        UInt8(operator::CURVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 C 40 60 90 120 160 200 Z ",
        rect(10, 20, 160, 200)
    );

    test_cs!(curve_to_with_two_sets_of_coords, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), CFFInt(60), CFFInt(70), CFFInt(80),
        CFFInt(90), CFFInt(100), CFFInt(110), CFFInt(120), CFFInt(130), CFFInt(140),
        UInt8(operator::CURVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 C 40 60 90 120 160 200 C 250 300 360 420 490 560 Z ",
        rect(10, 20, 490, 560)
    );

    test_cs!(hh_curve_to, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), CFFInt(60), UInt8(operator::HH_CURVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 C 40 20 80 70 140 70 Z ",
        rect(10, 20, 140, 70)
    );

    test_cs!(hh_curve_to_with_y, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), CFFInt(60), CFFInt(70), UInt8(operator::HH_CURVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 C 50 50 100 110 170 110 Z ",
        rect(10, 20, 170, 110)
    );

    test_cs!(vv_curve_to, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), CFFInt(60), UInt8(operator::VV_CURVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 C 10 50 50 100 50 160 Z ",
        rect(10, 20, 50, 160)
    );

    test_cs!(vv_curve_to_with_x, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), CFFInt(60), CFFInt(70), UInt8(operator::VV_CURVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 C 40 60 90 120 90 190 Z ",
        rect(10, 20, 90, 190)
    );

    // A drawing operator before any `moveto` starts a contour at the pen.
    test_cs!(line_to_before_move_to, &[
        CFFInt(10), CFFInt(20), UInt8(operator::LINE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 0 0 L 10 20 Z ",
        rect(0, 0, 10, 20)
    );

    test_cs!(unit_square, &[
        CFFInt(0), CFFInt(0), UInt8(operator::MOVE_TO),
        CFFInt(100), CFFInt(0), UInt8(operator::LINE_TO),
        CFFInt(0), CFFInt(100), UInt8(operator::LINE_TO),
        CFFInt(-100), CFFInt(0), UInt8(operator::LINE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 0 0 L 100 0 L 100 100 L 0 100 Z ",
        rect(0, 0, 100, 100)
    );

    #[test]
    fn only_endchar() {
        // An empty glyph is not an error.
        let font = FontBuilder::glyphs(&[&[UInt8(operator::ENDCHAR)]]);
        let (res, path) = outline_first_glyph(&font);
        let outline = res.unwrap();
        assert_eq!(path, "");
        assert_eq!(outline.bounding_box, None);
        assert_eq!(outline.advance, 0.0);
    }

    test_cs_with_subrs!(local_subr,
        &[] as &[&[writer::TtfType]],
        &[&[
            CFFInt(30),
            CFFInt(40),
            UInt8(operator::LINE_TO),
            UInt8(operator::RETURN),
        ]],
        &[
            CFFInt(10),
            UInt8(operator::HORIZONTAL_MOVE_TO),
            CFFInt(0 - 107), // subr index - subr bias
            UInt8(operator::CALL_LOCAL_SUBROUTINE),
            UInt8(operator::ENDCHAR),
        ],
        "M 10 0 L 40 40 Z ",
        rect(10, 0, 40, 40)
    );

    test_cs_with_subrs!(endchar_in_subr,
        &[] as &[&[writer::TtfType]],
        &[&[
            CFFInt(30),
            CFFInt(40),
            UInt8(operator::LINE_TO),
            UInt8(operator::ENDCHAR),
        ]],
        &[
            CFFInt(10),
            UInt8(operator::HORIZONTAL_MOVE_TO),
            CFFInt(0 - 107), // subr index - subr bias
            UInt8(operator::CALL_LOCAL_SUBROUTINE),
        ],
        "M 10 0 L 40 40 Z ",
        rect(10, 0, 40, 40)
    );

    test_cs_with_subrs!(global_subr,
        &[&[
            CFFInt(30),
            CFFInt(40),
            UInt8(operator::LINE_TO),
            UInt8(operator::RETURN),
        ]],
        &[],
        &[
            CFFInt(10),
            UInt8(operator::HORIZONTAL_MOVE_TO),
            CFFInt(0 - 107), // subr index - subr bias
            UInt8(operator::CALL_GLOBAL_SUBROUTINE),
            UInt8(operator::ENDCHAR),
        ],
        "M 10 0 L 40 40 Z ",
        rect(10, 0, 40, 40)
    );

    #[test]
    fn data_after_endchar_is_ignored() {
        let font = FontBuilder::glyphs(&[&[
            CFFInt(10), UInt8(operator::HORIZONTAL_MOVE_TO),
            UInt8(operator::ENDCHAR),
            CFFInt(30), CFFInt(40), UInt8(operator::LINE_TO),
        ]]);
        let (res, path) = outline_first_glyph(&font);
        assert!(res.is_ok());
        assert_eq!(path, "M 10 0 Z ");
    }

    #[test]
    fn endchar_in_subr_with_data_after_call() {
        let mut font = FontBuilder::glyphs(&[&[
            CFFInt(10),
            UInt8(operator::HORIZONTAL_MOVE_TO),
            CFFInt(0 - 107), // subr index - subr bias
            UInt8(operator::CALL_LOCAL_SUBROUTINE),
            CFFInt(30),
            CFFInt(40),
            UInt8(operator::LINE_TO),
        ]]);
        font.local_subrs = vec![writer::convert(&[
            CFFInt(30),
            CFFInt(40),
            UInt8(operator::LINE_TO),
            UInt8(operator::ENDCHAR),
        ])];
        let (res, path) = outline_first_glyph(&font);
        assert!(res.is_ok());
        assert_eq!(path, "M 10 0 L 40 40 Z ");
    }

    test_cs_err!(reserved_operator, &[
        CFFInt(10), UInt8(2),
        UInt8(operator::ENDCHAR),
    ], Error::UnimplementedFeature);

    test_cs_err!(unknown_two_byte_operator, &[
        CFFInt(10), UInt8(12), UInt8(2),
        UInt8(operator::ENDCHAR),
    ], Error::UnimplementedFeature);

    test_cs_err!(store_operator, &[
        UInt8(12), UInt8(operator::STORE),
        UInt8(operator::ENDCHAR),
    ], Error::UnimplementedFeature);

    test_cs_err!(load_operator, &[
        UInt8(12), UInt8(operator::LOAD),
        UInt8(operator::ENDCHAR),
    ], Error::UnimplementedFeature);

    test_cs_err!(return_outside_subroutine, &[
        UInt8(operator::RETURN),
        UInt8(operator::ENDCHAR),
    ], Error::SyntaxError);

    // Width must be set only once.
    test_cs_err!(two_vmove_to_with_width, &[
        CFFInt(10), CFFInt(20), UInt8(operator::VERTICAL_MOVE_TO),
        CFFInt(10), CFFInt(20), UInt8(operator::VERTICAL_MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(move_to_with_too_many_coords, &[
        CFFInt(10), CFFInt(10), CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(move_to_with_not_enough_coords, &[
        CFFInt(10), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(hmove_to_with_too_many_coords, &[
        CFFInt(10), CFFInt(10), CFFInt(10), UInt8(operator::HORIZONTAL_MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(hmove_to_with_not_enough_coords, &[
        UInt8(operator::HORIZONTAL_MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(vmove_to_with_too_many_coords, &[
        CFFInt(10), CFFInt(10), CFFInt(10), UInt8(operator::VERTICAL_MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(vmove_to_with_not_enough_coords, &[
        UInt8(operator::VERTICAL_MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(line_to_with_single_coord, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), UInt8(operator::LINE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(line_to_with_odd_number_of_coord, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), UInt8(operator::LINE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(hline_to_without_coords, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        UInt8(operator::HORIZONTAL_LINE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(vline_to_without_coords, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        UInt8(operator::VERTICAL_LINE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(curve_to_with_invalid_num_of_coords_1, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), CFFInt(60), UInt8(operator::CURVE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(curve_to_with_invalid_num_of_coords_2, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), CFFInt(60), CFFInt(70), CFFInt(80), CFFInt(90),
        UInt8(operator::CURVE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(hh_curve_to_with_not_enough_coords, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), UInt8(operator::HH_CURVE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(hh_curve_to_with_too_many_coords, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), CFFInt(30), CFFInt(40), CFFInt(50),
        UInt8(operator::HH_CURVE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(vv_curve_to_with_not_enough_coords, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), UInt8(operator::VV_CURVE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(vv_curve_to_with_too_many_coords, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        CFFInt(30), CFFInt(40), CFFInt(50), CFFInt(30), CFFInt(40), CFFInt(50),
        UInt8(operator::VV_CURVE_TO),
        UInt8(operator::ENDCHAR),
    ], Error::InvalidArgument);

    test_cs_err!(missing_endchar, &[
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
    ], Error::MissingEndChar);

    test_cs_err!(truncated_operand, &[
        UInt8(operator::SHORT_INT),
    ], Error::SyntaxError);

    test_cs_err!(operands_overflow, &[
        CFFInt(0), CFFInt(1), CFFInt(2), CFFInt(3), CFFInt(4), CFFInt(5), CFFInt(6), CFFInt(7), CFFInt(8), CFFInt(9),
        CFFInt(0), CFFInt(1), CFFInt(2), CFFInt(3), CFFInt(4), CFFInt(5), CFFInt(6), CFFInt(7), CFFInt(8), CFFInt(9),
        CFFInt(0), CFFInt(1), CFFInt(2), CFFInt(3), CFFInt(4), CFFInt(5), CFFInt(6), CFFInt(7), CFFInt(8), CFFInt(9),
        CFFInt(0), CFFInt(1), CFFInt(2), CFFInt(3), CFFInt(4), CFFInt(5), CFFInt(6), CFFInt(7), CFFInt(8), CFFInt(9),
        CFFInt(0), CFFInt(1), CFFInt(2), CFFInt(3), CFFInt(4), CFFInt(5), CFFInt(6), CFFInt(7), CFFInt(8), CFFInt(9),
    ], Error::StackOverflow);

    #[test]
    fn bbox_overflow_is_not_fatal() {
        // Coordinates past the i16 range cannot be represented
        // in the bounding box, but the outline itself is fine.
        let font = FontBuilder::glyphs(&[&[
            CFFInt(32767), UInt8(operator::HORIZONTAL_MOVE_TO),
            CFFInt(32767), UInt8(operator::HORIZONTAL_LINE_TO),
            UInt8(operator::ENDCHAR),
        ]]);
        let (res, path) = outline_first_glyph(&font);
        let outline = res.unwrap();
        assert_eq!(path, "M 32767 0 L 65534 0 Z ");
        assert_eq!(outline.bounding_box, None);
    }

    #[test]
    fn callsubr_without_local_subroutines() {
        let font = FontBuilder::glyphs(&[&[
            CFFInt(0 - 107),
            UInt8(operator::CALL_LOCAL_SUBROUTINE),
            UInt8(operator::ENDCHAR),
        ]]);
        let (res, _) = outline_first_glyph(&font);
        assert_eq!(res.unwrap_err(), Error::SyntaxError);
    }

    test_cs_err!(callsubr_with_empty_stack, &[
        UInt8(operator::CALL_LOCAL_SUBROUTINE),
        UInt8(operator::ENDCHAR),
    ], Error::StackUnderflow);

    #[test]
    fn out_of_range_subroutine_index() {
        let mut font = FontBuilder::glyphs(&[&[
            CFFInt(1), // bias 107 makes this index 108
            UInt8(operator::CALL_LOCAL_SUBROUTINE),
            UInt8(operator::ENDCHAR),
        ]]);
        font.local_subrs = vec![writer::convert(&[UInt8(operator::RETURN)])];
        let (res, _) = outline_first_glyph(&font);
        assert_eq!(res.unwrap_err(), Error::SyntaxError);
    }

    #[test]
    fn recursion_limit() {
        // A subroutine calling itself forever.
        let mut font = FontBuilder::glyphs(&[&[
            CFFInt(0 - 107),
            UInt8(operator::CALL_LOCAL_SUBROUTINE),
            UInt8(operator::ENDCHAR),
        ]]);
        font.local_subrs = vec![writer::convert(&[
            CFFInt(0 - 107),
            UInt8(operator::CALL_LOCAL_SUBROUTINE),
            UInt8(operator::RETURN),
        ])];
        let (res, _) = outline_first_glyph(&font);
        assert_eq!(res.unwrap_err(), Error::SyntaxError);
    }

    #[test]
    fn explicit_widths() {
        let mut font = FontBuilder::glyphs(&[&[
            CFFInt(10), CFFInt(20), UInt8(operator::HORIZONTAL_MOVE_TO),
            UInt8(operator::ENDCHAR),
        ]]);
        font.default_width = Some(7);
        font.nominal_width = Some(50);
        let (res, path) = outline_first_glyph(&font);
        // The leading operand is a width delta against nominalWidthX.
        assert_eq!(res.unwrap().advance, 60.0);
        assert_eq!(path, "M 20 0 Z ");
    }

    #[test]
    fn default_width() {
        let mut font = FontBuilder::glyphs(&[&[
            CFFInt(10), UInt8(operator::HORIZONTAL_MOVE_TO),
            UInt8(operator::ENDCHAR),
        ]]);
        font.default_width = Some(7);
        font.nominal_width = Some(50);
        let (res, _) = outline_first_glyph(&font);
        assert_eq!(res.unwrap().advance, 7.0);
    }

    #[test]
    fn width_from_endchar() {
        let mut font = FontBuilder::glyphs(&[&[
            CFFInt(5), UInt8(operator::ENDCHAR),
        ]]);
        font.default_width = Some(7);
        font.nominal_width = Some(50);
        let (res, _) = outline_first_glyph(&font);
        assert_eq!(res.unwrap().advance, 55.0);
    }

    #[test]
    fn width_from_hstem() {
        let mut font = FontBuilder::glyphs(&[&[
            CFFInt(3), CFFInt(0), CFFInt(10), UInt8(operator::HORIZONTAL_STEM),
            CFFInt(10), UInt8(operator::HORIZONTAL_MOVE_TO),
            UInt8(operator::ENDCHAR),
        ]]);
        font.nominal_width = Some(50);
        let (res, _) = outline_first_glyph(&font);
        assert_eq!(res.unwrap().advance, 53.0);
    }

    #[test]
    fn width_window_closes_at_first_operator() {
        // A widthless first operator still ends the width window,
        // so the operand before `endchar` is not a width.
        let mut font = FontBuilder::glyphs(&[&[
            CFFInt(0), CFFInt(0), UInt8(operator::MOVE_TO),
            CFFInt(5), UInt8(operator::ENDCHAR),
        ]]);
        font.default_width = Some(7);
        font.nominal_width = Some(50);
        let (res, _) = outline_first_glyph(&font);
        assert_eq!(res.unwrap().advance, 7.0);
    }

    #[test]
    fn width_window_closes_at_first_stem() {
        // An even `hstem` takes no width; a later odd `vstem` operand
        // is a stem coordinate, not a width.
        let mut font = FontBuilder::glyphs(&[&[
            CFFInt(0), CFFInt(10), UInt8(operator::HORIZONTAL_STEM),
            CFFInt(5), CFFInt(0), CFFInt(10), UInt8(operator::VERTICAL_STEM),
            CFFInt(10), UInt8(operator::HORIZONTAL_MOVE_TO),
            UInt8(operator::ENDCHAR),
        ]]);
        font.default_width = Some(7);
        font.nominal_width = Some(50);
        let (res, _) = outline_first_glyph(&font);
        assert_eq!(res.unwrap().advance, 7.0);
    }

    test_cs!(hint_mask, &[
        CFFInt(0), CFFInt(10), UInt8(operator::HORIZONTAL_STEM),
        UInt8(operator::HINT_MASK), UInt8(0x80), // one mask byte for one hint
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 Z ",
        rect(10, 20, 10, 20)
    );

    test_cs!(hint_mask_with_implicit_vstem, &[
        CFFInt(0), CFFInt(10), UInt8(operator::HORIZONTAL_STEM),
        // Leftover operands are an implicit vstem: two hints, one mask byte.
        CFFInt(0), CFFInt(10),
        UInt8(operator::HINT_MASK), UInt8(0xC0),
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 Z ",
        rect(10, 20, 10, 20)
    );

    #[test]
    fn hint_mask_with_truncated_mask() {
        // 9 hints require two mask bytes.
        let mut chars = std::vec::Vec::new();
        for _ in 0..9 {
            chars.push(CFFInt(0));
            chars.push(CFFInt(10));
        }
        chars.push(UInt8(operator::HORIZONTAL_STEM));
        chars.push(UInt8(operator::HINT_MASK));
        chars.push(UInt8(0xFF)); // only one
        let font = FontBuilder::glyphs(&[&chars]);
        let (res, _) = outline_first_glyph(&font);
        assert_eq!(res.unwrap_err(), Error::SyntaxError);
    }

    struct RecordingHinter(String);
    impl Hinter for RecordingHinter {
        fn open(&mut self) {
            self.0.push_str("open ");
        }

        fn stems(&mut self, horizontal: bool, coords: &[f32]) {
            let dir = if horizontal { 'h' } else { 'v' };
            write!(&mut self.0, "{}stems {:?} ", dir, coords).unwrap();
        }

        fn hint_mask(&mut self, point_count: u32, hint_count: u32, mask: &[u8]) {
            write!(&mut self.0, "mask {} {} {:?} ", point_count, hint_count, mask).unwrap();
        }

        fn counter_mask(&mut self, hint_count: u32, mask: &[u8]) {
            write!(&mut self.0, "cntr {} {:?} ", hint_count, mask).unwrap();
        }

        fn close(&mut self, point_count: u32) {
            write!(&mut self.0, "close {} ", point_count).unwrap();
        }
    }

    #[test]
    fn hinter_callback_sequence() {
        let mut font = FontBuilder::glyphs(&[&[
            // The odd operand is a width, not a stem coordinate.
            CFFInt(60), CFFInt(0), CFFInt(10), UInt8(operator::HORIZONTAL_STEM),
            CFFInt(0), CFFInt(10), UInt8(operator::VERTICAL_STEM_HINT_MASK),
            UInt8(operator::HINT_MASK), UInt8(0xC0),
            UInt8(operator::COUNTER_MASK), UInt8(0x80),
            CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
            CFFInt(30), CFFInt(0), UInt8(operator::LINE_TO),
            UInt8(operator::ENDCHAR),
        ]]);
        font.nominal_width = Some(50);

        let data = font.build();
        let table = Table::parse(&data, 0).unwrap();
        let mut builder = Builder(String::new());
        let mut hinter = RecordingHinter(String::new());
        let outline = table.outline(GlyphId(0), Some(&mut hinter), &mut builder).unwrap();

        assert_eq!(
            hinter.0,
            "open hstems [0.0, 10.0] vstems [0.0, 10.0] \
             mask 0 2 [192] cntr 2 [128] close 2 "
        );
        assert_eq!(outline.advance, 110.0);
        assert_eq!(builder.0, "M 10 20 L 40 20 Z ");
    }

    #[test]
    fn hinter_implicit_vstem_excludes_width() {
        let mut font = FontBuilder::glyphs(&[&[
            CFFInt(60), CFFInt(0), CFFInt(10),
            UInt8(operator::HINT_MASK), UInt8(0x80),
            CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
            UInt8(operator::ENDCHAR),
        ]]);
        font.nominal_width = Some(50);

        let data = font.build();
        let table = Table::parse(&data, 0).unwrap();
        let mut builder = Builder(String::new());
        let mut hinter = RecordingHinter(String::new());
        let outline = table.outline(GlyphId(0), Some(&mut hinter), &mut builder).unwrap();

        assert_eq!(hinter.0, "open vstems [0.0, 10.0] mask 0 1 [128] close 1 ");
        assert_eq!(outline.advance, 110.0);
    }

    // Arithmetic and stack manipulation.

    test_cs!(add, &[
        CFFInt(3), CFFInt(4), UInt8(12), UInt8(operator::ADD),
        CFFInt(10), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 7 10 Z ", rect(7, 10, 7, 10));

    test_cs!(subtract, &[
        CFFInt(50), CFFInt(20), UInt8(12), UInt8(operator::SUBTRACT),
        CFFInt(10), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 30 10 Z ", rect(30, 10, 30, 10));

    test_cs!(multiply, &[
        CFFInt(6), CFFInt(7), UInt8(12), UInt8(operator::MULTIPLY),
        CFFInt(10), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 42 10 Z ", rect(42, 10, 42, 10));

    test_cs!(divide, &[
        CFFInt(20), CFFInt(4), UInt8(12), UInt8(operator::DIVIDE),
        CFFInt(10), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 5 10 Z ", rect(5, 10, 5, 10));

    test_cs!(divide_by_zero, &[
        CFFInt(20), CFFInt(0), UInt8(12), UInt8(operator::DIVIDE),
        CFFInt(10), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 0 10 Z ", rect(0, 10, 0, 10));

    test_cs!(negate, &[
        CFFInt(10), UInt8(12), UInt8(operator::NEGATE),
        CFFInt(10), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M -10 10 Z ", rect(-10, 10, -10, 10));

    test_cs!(absolute, &[
        CFFInt(-10), UInt8(12), UInt8(operator::ABS),
        CFFInt(10), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 10 Z ", rect(10, 10, 10, 10));

    test_cs!(square_root, &[
        CFFInt(16), UInt8(12), UInt8(operator::SQUARE_ROOT),
        CFFInt(10), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 4 10 Z ", rect(4, 10, 4, 10));

    test_cs!(duplicate, &[
        CFFInt(10), UInt8(12), UInt8(operator::DUPLICATE),
        UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 10 Z ", rect(10, 10, 10, 10));

    test_cs!(exchange, &[
        CFFInt(10), CFFInt(20), UInt8(12), UInt8(operator::EXCHANGE),
        UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 20 10 Z ", rect(20, 10, 20, 10));

    test_cs!(drop_one, &[
        CFFInt(10), CFFInt(20), CFFInt(30), UInt8(12), UInt8(operator::DROP),
        UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 Z ", rect(10, 20, 10, 20));

    test_cs!(equal, &[
        CFFInt(10), CFFInt(10), UInt8(12), UInt8(operator::EQUAL),
        CFFInt(7), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 1 7 Z ", rect(1, 7, 1, 7));

    test_cs!(not_zero, &[
        CFFInt(0), UInt8(12), UInt8(operator::NOT),
        CFFInt(30), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 1 30 Z ", rect(1, 30, 1, 30));

    test_cs!(and_both_non_zero, &[
        CFFInt(1), CFFInt(2), UInt8(12), UInt8(operator::AND),
        CFFInt(30), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 1 30 Z ", rect(1, 30, 1, 30));

    test_cs!(or_one_non_zero, &[
        CFFInt(0), CFFInt(5), UInt8(12), UInt8(operator::OR),
        CFFInt(30), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 1 30 Z ", rect(1, 30, 1, 30));

    test_cs!(if_else, &[
        CFFInt(10), CFFInt(20), CFFInt(1), CFFInt(2), UInt8(12), UInt8(operator::IF_ELSE),
        CFFInt(30), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 30 Z ", rect(10, 30, 10, 30));

    test_cs!(index_copies_element, &[
        CFFInt(10), CFFInt(20), CFFInt(1), UInt8(12), UInt8(operator::INDEX),
        UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 20 10 Z ", rect(20, 10, 20, 10));

    // A negative index duplicates the top element.
    test_cs!(index_negative, &[
        CFFInt(10), CFFInt(20), CFFInt(-1), UInt8(12), UInt8(operator::INDEX),
        UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 20 20 Z ", rect(20, 20, 20, 20));

    test_cs!(roll_top_two, &[
        CFFInt(10), CFFInt(20), CFFInt(2), CFFInt(1), UInt8(12), UInt8(operator::ROLL),
        UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 20 10 Z ", rect(20, 10, 20, 10));

    test_cs!(put_and_get, &[
        CFFInt(42), CFFInt(5), UInt8(12), UInt8(operator::PUT),
        CFFInt(5), UInt8(12), UInt8(operator::GET),
        CFFInt(13), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 42 13 Z ", rect(42, 13, 42, 13));

    test_cs!(get_out_of_bounds, &[
        CFFInt(100), UInt8(12), UInt8(operator::GET),
        CFFInt(10), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 0 10 Z ", rect(0, 10, 0, 10));

    test_cs!(put_out_of_bounds_is_ignored, &[
        CFFInt(42), CFFInt(100), UInt8(12), UInt8(operator::PUT),
        CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 Z ", rect(10, 20, 10, 20));

    test_cs!(random_is_non_zero, &[
        UInt8(12), UInt8(operator::RANDOM),
        UInt8(12), UInt8(operator::NOT),
        CFFInt(10), UInt8(12), UInt8(operator::ADD),
        CFFInt(20), UInt8(operator::MOVE_TO),
        UInt8(operator::ENDCHAR),
    ], "M 10 20 Z ", rect(10, 20, 10, 20));

    test_cs_err!(add_with_single_operand, &[
        CFFInt(1), UInt8(12), UInt8(operator::ADD),
        UInt8(operator::ENDCHAR),
    ], Error::StackUnderflow);

    test_cs_err!(if_else_with_three_operands, &[
        CFFInt(1), CFFInt(2), CFFInt(3), UInt8(12), UInt8(operator::IF_ELSE),
        UInt8(operator::ENDCHAR),
    ], Error::StackUnderflow);

    test_cs_err!(roll_with_too_large_count, &[
        CFFInt(10), CFFInt(20), CFFInt(5), CFFInt(1), UInt8(12), UInt8(operator::ROLL),
        UInt8(operator::ENDCHAR),
    ], Error::StackUnderflow);

    #[test]
    fn seac() {
        let mut font = FontBuilder::glyphs(&[
            &[UInt8(operator::ENDCHAR)], // .notdef
            &[
                // base
                CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
                CFFInt(30), CFFInt(40), UInt8(operator::LINE_TO),
                UInt8(operator::ENDCHAR),
            ],
            &[
                // accent
                CFFInt(5), CFFInt(5), UInt8(operator::MOVE_TO),
                CFFInt(1), CFFInt(2), UInt8(operator::LINE_TO),
                UInt8(operator::ENDCHAR),
            ],
            &[
                // adx ady bchar achar
                CFFInt(100), CFFInt(200), CFFInt(97), CFFInt(98),
                UInt8(operator::ENDCHAR),
            ],
        ]);
        // 'a' (code 97) is SID 66 and 'b' (code 98) is SID 67
        // in the Standard Encoding.
        font.charset = Some(vec![66, 67, 100]);
        let data = font.build();
        let table = Table::parse(&data, 0).unwrap();

        let mut builder = Builder(String::new());
        let outline = table.outline(GlyphId(3), None, &mut builder).unwrap();

        // The base contour as-is, the accent translated by (adx, ady).
        assert_eq!(builder.0, "M 10 20 L 40 60 Z M 105 205 L 106 207 Z ");
        assert_eq!(outline.bounding_box, Some(rect(10, 20, 106, 207)));
    }

    #[test]
    fn seac_closes_hinting_once() {
        let mut font = FontBuilder::glyphs(&[
            &[UInt8(operator::ENDCHAR)], // .notdef
            &[
                CFFInt(10), CFFInt(20), UInt8(operator::MOVE_TO),
                CFFInt(30), CFFInt(40), UInt8(operator::LINE_TO),
                UInt8(operator::ENDCHAR),
            ],
            &[
                CFFInt(5), CFFInt(5), UInt8(operator::MOVE_TO),
                CFFInt(1), CFFInt(2), UInt8(operator::LINE_TO),
                UInt8(operator::ENDCHAR),
            ],
            &[
                CFFInt(100), CFFInt(200), CFFInt(97), CFFInt(98),
                UInt8(operator::ENDCHAR),
            ],
        ]);
        font.charset = Some(vec![66, 67, 100]);
        let data = font.build();
        let table = Table::parse(&data, 0).unwrap();

        let mut builder = Builder(String::new());
        let mut hinter = RecordingHinter(String::new());
        table.outline(GlyphId(3), Some(&mut hinter), &mut builder).unwrap();

        // The base and accent `endchar`s must not close the session;
        // only the composite's own one does, with the combined point count.
        assert_eq!(hinter.0, "open close 4 ");
    }

    #[test]
    fn seac_with_invalid_code() {
        let mut font = FontBuilder::glyphs(&[
            &[UInt8(operator::ENDCHAR)],
            &[UInt8(operator::ENDCHAR)],
            &[
                // The accent code maps to no glyph in this font.
                CFFInt(100), CFFInt(200), CFFInt(97), CFFInt(110),
                UInt8(operator::ENDCHAR),
            ],
        ]);
        font.charset = Some(vec![66, 100]);
        let data = font.build();
        let table = Table::parse(&data, 0).unwrap();

        let mut builder = Builder(String::new());
        let res = table.outline(GlyphId(2), None, &mut builder);
        assert_eq!(res.unwrap_err(), Error::InvalidArgument);
    }

    #[test]
    fn subroutine_bias() {
        assert_eq!(calc_subroutine_bias(0), 107);
        assert_eq!(calc_subroutine_bias(1239), 107);
        assert_eq!(calc_subroutine_bias(1240), 1131);
        assert_eq!(calc_subroutine_bias(33899), 1131);
        assert_eq!(calc_subroutine_bias(33900), 32768);
    }
}
