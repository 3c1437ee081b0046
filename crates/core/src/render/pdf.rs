use super::layout::wrap_text;
use super::{BillDocument, Block, DocumentBackend, DocumentFormat, RenderError, RenderResult};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rgb,
};
use std::io::BufWriter;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;

/// A4 PDF using the builtin Helvetica fonts.
///
/// Builtin fonts only cover Latin-1, so any other character fails the render with
/// [`RenderError::Encoding`].
#[derive(Debug, Clone, Default)]
pub struct PdfBackend;

impl DocumentBackend for PdfBackend {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn render(&self, document: &BillDocument) -> RenderResult<Vec<u8>> {
        let (doc, _) = compose(document)?;
        let mut buf = BufWriter::new(Vec::new());
        doc.save(&mut buf)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        buf.into_inner()
            .map_err(|e| RenderError::Io(e.into_error()))
    }
}

/// Lays the document out page by page, returning it with the number of pages used.
fn compose(document: &BillDocument) -> RenderResult<(PdfDocumentReference, usize)> {
    for s in document.strings() {
        check_encodable(s)?;
    }

    let (doc, page, layer) = PdfDocument::new(
        document.title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;

    let mut pen = Pen {
        layer: doc.get_page(page).get_layer(layer),
        doc: &doc,
        y: PAGE_HEIGHT_MM - MARGIN_MM,
        pages: 1,
        regular,
        bold,
    };

    for section in &document.sections {
        pen.gap(4.0);
        if let Some(heading) = &section.heading {
            pen.line(heading, 12.0, MARGIN_MM, true);
            pen.gap(1.5);
        }
        for block in &section.blocks {
            match block {
                Block::Title(s) => {
                    pen.layer.set_fill_color(accent());
                    pen.centred(s, 20.0, true);
                    pen.layer.set_fill_color(black());
                    pen.gap(2.0);
                }
                Block::Text(s) => pen.wrapped(s, 10.0, MARGIN_MM, false),
                Block::Entry(s) => pen.wrapped(s, 10.0, MARGIN_MM + 5.0, false),
                Block::Note(s) => pen.wrapped(s, 9.0, MARGIN_MM + 10.0, false),
                Block::Total(s) => {
                    pen.layer.set_fill_color(accent());
                    pen.right_aligned(s, 14.0);
                    pen.layer.set_fill_color(black());
                }
                Block::Footer(s) => pen.centred(s, 8.0, false),
            }
        }
    }

    let pages = pen.pages;
    drop(pen);
    Ok((doc, pages))
}

/// Rejects characters the builtin fonts cannot show. Tabs and newlines never reach this
/// point because the layout collapses whitespace.
fn check_encodable(s: &str) -> RenderResult<()> {
    match s
        .chars()
        .find(|c| !matches!(*c as u32, 0x20..=0x7E | 0xA0..=0xFF))
    {
        Some(c) => Err(RenderError::Encoding(c)),
        None => Ok(()),
    }
}

fn accent() -> Color {
    Color::Rgb(Rgb::new(0.78, 0.16, 0.16, None))
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.4
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVG_GLYPH_EM * PT_TO_MM
}

/// Writing position on the current page; starts a new page when the bottom margin is hit.
struct Pen<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Pen<'_> {
    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn advance(&mut self, height: f32) {
        if self.y - height < MARGIN_MM {
            let (page, layer) =
                self.doc
                    .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT_MM - MARGIN_MM;
            self.pages += 1;
        }
        self.y -= height;
    }

    fn line(&mut self, text: &str, size: f32, x: f32, bold: bool) {
        self.advance(line_height(size));
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn wrapped(&mut self, text: &str, size: f32, x: f32, bold: bool) {
        let available = PAGE_WIDTH_MM - MARGIN_MM - x;
        let chars = (available / (size * AVG_GLYPH_EM * PT_TO_MM)) as usize;
        for line in wrap_text(text, chars) {
            self.line(&line, size, x, bold);
        }
    }

    fn centred(&mut self, text: &str, size: f32, bold: bool) {
        let usable = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
        let chars = (usable / (size * AVG_GLYPH_EM * PT_TO_MM)) as usize;
        for line in wrap_text(text, chars) {
            let x = ((PAGE_WIDTH_MM - text_width(&line, size)) / 2.0).max(MARGIN_MM);
            self.line(&line, size, x, bold);
        }
    }

    fn right_aligned(&mut self, text: &str, size: f32) {
        let x = (PAGE_WIDTH_MM - MARGIN_MM - text_width(text, size)).max(MARGIN_MM);
        self.line(text, size, x, true);
    }
}
