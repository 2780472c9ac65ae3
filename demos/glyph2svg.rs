use std::fmt::Write as _;
use std::path::PathBuf;

use cff_parser::{Face, GlyphId};

const HELP: &str = "\
Renders every glyph of a CFF font into an SVG grid.

USAGE:
    glyph2svg [OPTIONS] font.otf out.svg

OPTIONS:
    --face-index INDEX    A face index in a font collection [default: 0]
";

const COLUMNS: u16 = 16;

struct Args {
    face_index: u32,
    font_path: PathBuf,
    svg_path: PathBuf,
}

fn parse_args() -> Result<Args, pico_args::Error> {
    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print!("{}", HELP);
        std::process::exit(0);
    }

    Ok(Args {
        face_index: args.opt_value_from_str("--face-index")?.unwrap_or(0),
        font_path: args.free_from_str()?,
        svg_path: args.free_from_str()?,
    })
}

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}.", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = process(args) {
        eprintln!("Error: {}.", e);
        std::process::exit(1);
    }
}

fn process(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let font_data = std::fs::read(&args.font_path)?;
    let face = Face::parse(&font_data, args.face_index)
        .map_err(|e| format!("failed to parse the font: {:?}", e))?;

    let [x_min, y_min, x_max, y_max] = face.font_bbox();
    let cell_size = f64::from((x_max - x_min).max(y_max - y_min).max(1.0));

    let n_glyphs = face.number_of_glyphs();
    let rows = (f64::from(n_glyphs) / f64::from(COLUMNS)).ceil() as u16;

    let mut svg = xmlwriter::XmlWriter::with_capacity(
        usize::from(n_glyphs) * 512,
        xmlwriter::Options::default(),
    );
    svg.start_element("svg");
    svg.write_attribute("xmlns", "http://www.w3.org/2000/svg");
    svg.write_attribute_fmt(
        "viewBox",
        format_args!("0 0 {} {}",
            cell_size * f64::from(COLUMNS),
            cell_size * f64::from(rows)),
    );

    draw_grid(n_glyphs, cell_size, &mut svg);

    let mut path_buf = String::with_capacity(256);
    let mut row = 0u16;
    let mut column = 0u16;
    for id in 0..n_glyphs {
        glyph_to_path(
            f64::from(column) * cell_size,
            f64::from(row) * cell_size,
            &face,
            GlyphId(id),
            cell_size,
            f64::from(y_max),
            &mut svg,
            &mut path_buf,
        );

        column += 1;
        if column == COLUMNS {
            column = 0;
            row += 1;
        }
    }

    std::fs::write(&args.svg_path, svg.end_document())?;
    Ok(())
}

fn draw_grid(n_glyphs: u16, cell_size: f64, svg: &mut xmlwriter::XmlWriter) {
    let rows = (f64::from(n_glyphs) / f64::from(COLUMNS)).ceil() as u16;
    let width = f64::from(COLUMNS) * cell_size;
    let height = f64::from(rows) * cell_size;

    let mut path = String::with_capacity(256);
    let mut x = 0.0;
    for _ in 0..=COLUMNS {
        write!(&mut path, "M {} 0 L {} {} ", x, x, height).unwrap();
        x += cell_size;
    }

    let mut y = 0.0;
    for _ in 0..=rows {
        write!(&mut path, "M 0 {} L {} {} ", y, width, y).unwrap();
        y += cell_size;
    }

    path.pop();

    svg.start_element("path");
    svg.write_attribute("fill", "none");
    svg.write_attribute("stroke", "black");
    svg.write_attribute("stroke-width", "5");
    svg.write_attribute("d", &path);
    svg.end_element();
}

fn glyph_to_path(
    x: f64,
    y: f64,
    face: &Face,
    glyph_id: GlyphId,
    cell_size: f64,
    ascent: f64,
    svg: &mut xmlwriter::XmlWriter,
    path_buf: &mut String,
) {
    path_buf.clear();
    let mut builder = Builder(path_buf);
    let glyph = match face.outline_glyph(glyph_id, &mut builder) {
        Ok(glyph) => glyph,
        Err(e) => {
            eprintln!("Warning: glyph {} failed: {:?}.", glyph_id.0, e);
            return;
        }
    };

    if path_buf.is_empty() {
        return;
    }

    path_buf.pop(); // trailing space

    let dx = (cell_size - f64::from(glyph.advance)) / 2.0;

    svg.start_element("path");
    svg.write_attribute("d", path_buf);
    // Flip the Y axis: SVG grows downwards, font outlines upwards.
    svg.write_attribute_fmt(
        "transform",
        format_args!("matrix(1 0 0 -1 {} {})", x + dx, y + ascent),
    );
    svg.end_element();
}

struct Builder<'a>(&'a mut String);

impl cff_parser::OutlineBuilder for Builder<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        write!(self.0, "M {} {} ", x, y).unwrap();
    }

    fn line_to(&mut self, x: f32, y: f32) {
        write!(self.0, "L {} {} ", x, y).unwrap();
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        write!(self.0, "C {} {} {} {} {} {} ", x1, y1, x2, y2, x, y).unwrap();
    }

    fn close(&mut self) {
        write!(self.0, "Z ").unwrap();
    }
}
