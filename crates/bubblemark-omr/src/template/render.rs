// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet template rendering — draws a single column of question rows, each
// with one ring bubble per alternative, optionally filling the bubbles of a
// given answer map.

use bubblemark_core::error::{BubblemarkError, Result};
use bubblemark_core::{AnswerMap, TemplateConfig};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use imageproc::drawing::draw_filled_circle_mut;
use tracing::{debug, info, instrument};

const PAPER: Luma<u8> = Luma([255]);
const INK: Luma<u8> = Luma([0]);

/// Pixel geometry of a rendered sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    pub width: u32,
    pub height: u32,
    pub bubble_radius: u32,
    /// Horizontal centre of each alternative column, A first.
    pub column_centres: Vec<u32>,
    /// Vertical centre of each question row, question 1 first.
    pub row_centres: Vec<u32>,
}

/// A rendered answer sheet and where its bubbles are.
#[derive(Debug, Clone)]
pub struct RenderedSheet {
    pub image: GrayImage,
    pub layout: SheetLayout,
}

impl RenderedSheet {
    pub fn question_count(&self) -> usize {
        self.layout.row_centres.len()
    }

    /// The sheet as a `DynamicImage`, ready for detection.
    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageLuma8(self.image.clone())
    }

    /// Encode the sheet as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| BubblemarkError::Render(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Write the sheet to an image file; the format follows the extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.image.save(path.as_ref()).map_err(|err| {
            BubblemarkError::Render(format!(
                "failed to save sheet to {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }
}

/// Renders blank or pre-marked answer sheets.
#[derive(Debug, Clone, Default)]
pub struct SheetTemplate {
    config: TemplateConfig,
}

impl SheetTemplate {
    /// Create a template, rejecting layouts whose bubbles would touch.
    pub fn new(config: TemplateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Compute the layout for `question_count` rows.
    pub fn layout(&self, question_count: u32) -> Result<SheetLayout> {
        let max = self.config.max_questions;
        if question_count == 0 || question_count > max {
            return Err(BubblemarkError::invalid_input(format!(
                "question count must be between 1 and {max}, got {question_count}"
            )));
        }

        let c = &self.config;
        let diameter = 2 * c.bubble_radius + 1;
        let columns = c.alternatives_per_question as u32;
        let first = c.margin + c.bubble_radius;

        let column_centres = (0..columns).map(|i| first + i * c.column_pitch).collect();
        let row_centres = (0..question_count)
            .map(|i| first + i * c.row_pitch)
            .collect();

        Ok(SheetLayout {
            width: 2 * c.margin + (columns - 1) * c.column_pitch + diameter,
            height: 2 * c.margin + (question_count - 1) * c.row_pitch + diameter,
            bubble_radius: c.bubble_radius,
            column_centres,
            row_centres,
        })
    }

    /// Render `question_count` rows. Bubbles named in `answers` are filled;
    /// answers for questions past the last row are ignored.
    #[instrument(skip(self, answers), fields(marked = answers.map(|a| a.answered_count())))]
    pub fn render(&self, question_count: u32, answers: Option<&AnswerMap>) -> Result<RenderedSheet> {
        let layout = self.layout(question_count)?;
        info!(
            width = layout.width,
            height = layout.height,
            question_count,
            "Rendering answer sheet"
        );

        if let Some(answers) = answers {
            let columns = layout.column_centres.len();
            let out_of_range = answers
                .iter()
                .find_map(|(q, answer)| answer.filter(|alt| alt.index() >= columns).map(|alt| (q, alt)));
            if let Some((question, alt)) = out_of_range {
                return Err(BubblemarkError::invalid_input(format!(
                    "question {question}: alternative {alt} is not on a {columns}-choice sheet"
                )));
            }
        }

        let mut image = GrayImage::from_pixel(layout.width, layout.height, PAPER);
        let radius = self.config.bubble_radius as i32;
        let hole = radius - self.config.stroke_width as i32;

        for (row, &cy) in layout.row_centres.iter().enumerate() {
            let question = row as u32 + 1;
            let marked = answers.and_then(|a| a.answer(question));
            for (column, &cx) in layout.column_centres.iter().enumerate() {
                let centre = (cx as i32, cy as i32);
                draw_filled_circle_mut(&mut image, centre, radius, INK);
                if marked.map(|alt| alt.index()) != Some(column) {
                    draw_filled_circle_mut(&mut image, centre, hole, PAPER);
                }
            }
        }

        debug!("Answer sheet rendered");
        Ok(RenderedSheet { image, layout })
    }
}
