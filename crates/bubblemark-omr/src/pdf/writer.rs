// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — lays a rendered answer sheet onto a printable page using
// `printpdf` 0.8, with a student header, column letters and question numbers.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use std::path::Path;

use bubblemark_core::{Alternative, MAX_ALTERNATIVES, PaperSize};
use bubblemark_core::error::{BubblemarkError, Result};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use tracing::{debug, info, instrument};

use crate::template::RenderedSheet;

/// Nominal resolution of the embedded sheet raster.
const SHEET_DPI: f32 = 150.0;
const MARGIN_MM: f32 = 18.0;
/// Space reserved above the bubbles for the student header.
const HEADER_MM: f32 = 32.0;
const HEADER_FONT_PT: f32 = 12.0;
const LABEL_FONT_PT: f32 = 11.0;

/// Creates printable PDF answer sheets.
pub struct PdfWriter {
    /// Paper size for page creation.
    paper_size: PaperSize,
    /// Title metadata embedded in the PDF /Info dictionary.
    title: Option<String>,
}

impl PdfWriter {
    /// Create a new writer targeting the given paper size.
    pub fn new(paper_size: PaperSize) -> Self {
        Self {
            paper_size,
            title: None,
        }
    }

    /// Create a new writer defaulting to A4.
    pub fn a4() -> Self {
        Self::new(PaperSize::A4)
    }

    /// Set a title for the PDF metadata.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Paper dimensions in printpdf's Mm units.
    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    /// Create a single-page PDF holding `sheet`.
    ///
    /// The sheet raster is scaled to fit below the header (never upscaled) and
    /// centred horizontally. Letters are written above each bubble column and
    /// question numbers to the left of each row, in built-in Helvetica.
    #[instrument(skip(self, sheet), fields(questions = sheet.question_count()))]
    pub fn create_sheet(&self, sheet: &RenderedSheet) -> Result<Vec<u8>> {
        let (page_w, page_h) = self.page_dimensions();
        let title = self.title.as_deref().unwrap_or("Answer Sheet");

        info!(paper = ?self.paper_size, title, "Creating answer sheet PDF");

        let page_w_pt = page_w.into_pt().0;
        let page_h_pt = page_h.into_pt().0;
        let margin_pt = Mm(MARGIN_MM).into_pt().0;
        let header_pt = Mm(HEADER_MM).into_pt().0;
        let usable_w_pt = page_w_pt - 2.0 * margin_pt;
        let usable_h_pt = page_h_pt - 2.0 * margin_pt - header_pt;
        if usable_w_pt <= 0.0 || usable_h_pt <= 0.0 {
            return Err(BubblemarkError::Pdf(format!(
                "paper {:?} is too small for the sheet margins",
                self.paper_size
            )));
        }

        let layout = &sheet.layout;
        let img_w_pt = layout.width as f32 / SHEET_DPI * 72.0;
        let img_h_pt = layout.height as f32 / SHEET_DPI * 72.0;
        let scale = (usable_w_pt / img_w_pt).min(usable_h_pt / img_h_pt).min(1.0);
        let rendered_w_pt = img_w_pt * scale;
        let rendered_h_pt = img_h_pt * scale;

        // Top-aligned under the header, centred horizontally.
        let x_offset = margin_pt + (usable_w_pt - rendered_w_pt) / 2.0;
        let top_pt = page_h_pt - margin_pt - header_pt;
        let y_offset = top_pt - rendered_h_pt;

        // Raster pixel -> page point (PDF origin is bottom-left).
        let px_to_pt = scale * 72.0 / SHEET_DPI;
        let page_x = |px: u32| x_offset + px as f32 * px_to_pt;
        let page_y = |py: u32| top_pt - py as f32 * px_to_pt;

        let rgb_image = ::image::DynamicImage::ImageLuma8(sheet.image.clone()).to_rgb8();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb_image.into_raw()),
            width: layout.width as usize,
            height: layout.height as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new(title);
        let xobject_id = doc.add_image(&raw);

        let mut ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(x_offset)),
                translate_y: Some(Pt(y_offset)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(SHEET_DPI),
                rotate: None,
            },
        }];

        // Student header.
        let header_top = page_h_pt - margin_pt - HEADER_FONT_PT;
        ops.extend(text_ops(margin_pt, header_top, HEADER_FONT_PT, "Name: ______________________________"));
        ops.extend(text_ops(
            margin_pt,
            header_top - 2.0 * HEADER_FONT_PT,
            HEADER_FONT_PT,
            "Subject: ___________________________",
        ));

        // Column letters just above the first row.
        let half_glyph = 0.3 * LABEL_FONT_PT;
        let letters_y = page_y(0) + 0.5 * LABEL_FONT_PT;
        for (index, &cx) in layout.column_centres.iter().enumerate() {
            let alternative = Alternative::from_index(index).ok_or_else(|| {
                BubblemarkError::Pdf(format!("sheet has more than {MAX_ALTERNATIVES} columns"))
            })?;
            let letter = alternative.letter().to_string();
            ops.extend(text_ops(page_x(cx) - half_glyph, letters_y, LABEL_FONT_PT, &letter));
        }

        // Question numbers left of each row.
        let first_column = layout.column_centres.first().copied().unwrap_or(0);
        let numbers_x = page_x(first_column.saturating_sub(layout.bubble_radius)) - 3.0 * LABEL_FONT_PT;
        for (row, &cy) in layout.row_centres.iter().enumerate() {
            let label = format!("{})", row + 1);
            ops.extend(text_ops(numbers_x, page_y(cy) - half_glyph, LABEL_FONT_PT, &label));
        }

        let page = PdfPage::new(page_w, page_h, ops);
        doc.with_pages(vec![page]);

        debug!(rendered_w_pt, rendered_h_pt, scale, "Sheet placed on page");

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);

        Ok(output)
    }

    /// Create a sheet PDF and write it directly to a file.
    pub fn write_sheet_to_file(&self, sheet: &RenderedSheet, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.create_sheet(sheet)?;
        std::fs::write(path.as_ref(), &bytes)?;
        info!("Wrote answer sheet PDF to {}", path.as_ref().display());
        Ok(())
    }
}

/// One line of Helvetica text with its baseline starting at `(x, y)` points.
fn text_ops(x: f32, y: f32, size: f32, text: &str) -> [Op; 5] {
    [
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point { x: Pt(x), y: Pt(y) },
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(size),
            font: BuiltinFont::Helvetica,
        },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text.to_string())],
            font: BuiltinFont::Helvetica,
        },
        Op::EndTextSection,
    ]
}
