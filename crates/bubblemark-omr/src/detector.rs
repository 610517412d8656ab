// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet detector — runs binarization, bubble extraction, grouping and fill
// classification over one sheet image and assembles the answer map.

use bubblemark_core::error::{BubblemarkError, Result};
use bubblemark_core::{AnswerKey, AnswerMap, MAX_EXPECTED_QUESTIONS, OmrConfig, ScoreResult};
use image::DynamicImage;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::image::{decode_base64, decode_image};
use crate::scan::{QuestionReading, binarize, classify_question, extract_blobs, group_questions};
use crate::score::score;

/// Full outcome of one detection run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetReport {
    /// Detected answers, padded to the expected question count if one was given.
    pub answers: AnswerMap,
    /// Otsu level used to binarize the sheet.
    pub threshold: u8,
    /// Bubble-shaped regions found on the sheet.
    pub candidates: usize,
    /// Trailing candidates that did not complete a question row.
    pub leftover: usize,
    /// Per-question fill measurements, in question order.
    pub questions: Vec<QuestionReading>,
}

/// Reads answer sheets with a fixed configuration.
///
/// Every call is independent: nothing is cached between sheets, so one
/// detector can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct SheetDetector {
    config: OmrConfig,
}

impl SheetDetector {
    /// Create a detector, rejecting invalid configurations.
    pub fn new(config: OmrConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Detect the marked alternative of every question on `image`.
    ///
    /// With `expected_questions = Some(n)`, questions `1..=n` are always
    /// present (unanswered when not found). Without it, the map holds what
    /// the sheet yields, and at least question 1.
    pub fn detect(&self, image: &DynamicImage, expected_questions: Option<u32>) -> Result<AnswerMap> {
        self.detect_report(image, expected_questions)
            .map(|report| report.answers)
    }

    /// Like [`detect`](Self::detect), also returning the intermediate readings.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn detect_report(
        &self,
        image: &DynamicImage,
        expected_questions: Option<u32>,
    ) -> Result<SheetReport> {
        let out_of_range = expected_questions.filter(|&n| n == 0 || n > MAX_EXPECTED_QUESTIONS);
        if let Some(count) = out_of_range {
            return Err(BubblemarkError::invalid_input(format!(
                "expected question count must be between 1 and {MAX_EXPECTED_QUESTIONS}, got {count}"
            )));
        }

        let mask = binarize(image, &self.config)?;
        let blobs = extract_blobs(&mask, &self.config);
        let candidates = blobs.len();
        if candidates == 0 {
            warn!("No bubbles found on sheet; every question is unanswered");
        }

        let grouped = group_questions(blobs, self.config.alternatives_per_question);
        let readings: Vec<QuestionReading> = grouped
            .questions
            .iter()
            .map(|question| classify_question(&mask, question, &self.config))
            .collect();

        let mut answers: AnswerMap = readings.iter().map(|r| (r.number, r.selected)).collect();
        match expected_questions {
            Some(count) => {
                if readings.len() > count as usize {
                    debug!(
                        found = readings.len(),
                        expected = count,
                        "Sheet has more question rows than expected"
                    );
                }
                answers.pad_to(count);
            }
            None if answers.is_empty() => answers = AnswerMap::unanswered(1),
            None => {}
        }

        info!(
            questions = answers.len(),
            answered = answers.answered_count(),
            candidates,
            "Sheet detection complete"
        );

        Ok(SheetReport {
            answers,
            threshold: mask.threshold(),
            candidates,
            leftover: grouped.leftover,
            questions: readings,
        })
    }

    /// Decode `data` and detect answers.
    pub fn detect_bytes(&self, data: &[u8], expected_questions: Option<u32>) -> Result<AnswerMap> {
        let image = decode_image(data)?;
        self.detect(&image, expected_questions)
    }

    /// Decode a base64 / data-URL payload and detect answers.
    pub fn detect_base64(&self, payload: &str, expected_questions: Option<u32>) -> Result<AnswerMap> {
        let image = decode_base64(payload)?;
        self.detect(&image, expected_questions)
    }

    /// Detect answers on many encoded sheets in parallel.
    ///
    /// Results come back in input order; one bad sheet does not affect the
    /// others.
    #[instrument(skip_all, fields(sheets = sheets.len()))]
    pub fn detect_batch<B>(&self, sheets: &[B], expected_questions: Option<u32>) -> Vec<Result<AnswerMap>>
    where
        B: AsRef<[u8]> + Sync,
    {
        sheets
            .par_iter()
            .map(|data| self.detect_bytes(data.as_ref(), expected_questions))
            .collect()
    }

    /// Detect answers and grade them against `key`.
    ///
    /// Key questions the sheet does not show are added as unanswered, so
    /// every graded question appears in the result.
    pub fn grade(&self, image: &DynamicImage, key: &AnswerKey) -> Result<ScoreResult> {
        if key.is_empty() {
            return Err(BubblemarkError::invalid_input("answer key is empty"));
        }
        let mut answers = self.detect(image, None)?;
        answers.pad_questions(key.iter().map(|(question, _)| question));
        score(&answers, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::SheetTemplate;
    use bubblemark_core::Alternative;
    use image::{GrayImage, Luma, imageops};

    fn answers(letters: &[Option<char>]) -> AnswerMap {
        letters
            .iter()
            .enumerate()
            .map(|(i, l)| (i as u32 + 1, l.and_then(Alternative::from_letter)))
            .collect()
    }

    fn render(map: &AnswerMap, count: u32) -> DynamicImage {
        SheetTemplate::default()
            .render(count, Some(map))
            .unwrap()
            .to_dynamic()
    }

    #[test]
    fn recovers_every_rendered_answer() {
        let expected = answers(&[
            Some('A'),
            Some('E'),
            Some('C'),
            Some('B'),
            Some('D'),
            Some('C'),
            Some('A'),
            Some('E'),
        ]);
        let sheet = render(&expected, 8);
        let detected = SheetDetector::default().detect(&sheet, None).unwrap();
        assert_eq!(detected, expected);
    }

    #[test]
    fn round_trip_with_expected_count() {
        let expected = answers(&[Some('A'), Some('C')]);
        let sheet = render(&expected, 2);
        let detected = SheetDetector::default().detect(&sheet, Some(2)).unwrap();
        assert_eq!(detected, expected);
        assert_eq!(
            serde_json::to_string(&detected).unwrap(),
            r#"{"1":"A","2":"C"}"#
        );
    }

    #[test]
    fn unmarked_rows_stay_unanswered() {
        let expected = answers(&[Some('B'), None, Some('D')]);
        let sheet = render(&expected, 3);
        let report = SheetDetector::default().detect_report(&sheet, None).unwrap();
        assert_eq!(report.answers, expected);
        assert_eq!(report.candidates, 15);
        assert_eq!(report.leftover, 0);
        assert_eq!(report.questions.len(), 3);
    }

    #[test]
    fn translation_does_not_change_answers() {
        let expected = answers(&[Some('D'), Some('A'), Some('B'), Some('E')]);
        let sheet = render(&expected, 4).to_luma8();

        let mut canvas = GrayImage::from_pixel(sheet.width() + 90, sheet.height() + 55, Luma([255u8]));
        imageops::overlay(&mut canvas, &sheet, 73, 41);

        let detector = SheetDetector::default();
        let original = detector.detect(&DynamicImage::ImageLuma8(sheet), Some(4)).unwrap();
        let shifted = detector
            .detect(&DynamicImage::ImageLuma8(canvas), Some(4))
            .unwrap();
        assert_eq!(original, shifted);
        assert_eq!(shifted, expected);
    }

    #[test]
    fn blank_image_is_all_unanswered_and_scores_zero() {
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(300, 400, Luma([255u8])));
        let detector = SheetDetector::default();

        let report = detector.detect_report(&blank, Some(5)).unwrap();
        assert_eq!(report.candidates, 0);
        assert_eq!(report.answers, AnswerMap::unanswered(5));

        let key = AnswerKey::from_pairs([("1", "a"), ("3", "c")]).unwrap();
        let result = detector.grade(&blank, &key).unwrap();
        assert_eq!(result.correct, 0);
        let expected: AnswerMap = [(1, None), (3, None)].into_iter().collect();
        assert_eq!(result.answers, expected);
    }

    #[test]
    fn sparse_key_with_large_question_number_stays_small() {
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 50, Luma([255u8])));
        let key = AnswerKey::from_pairs([("1", "A"), ("4000000000", "B")]).unwrap();
        let result = SheetDetector::default().grade(&blank, &key).unwrap();
        assert_eq!((result.correct, result.total), (0, 2));
        assert_eq!(result.answers.len(), 2);
        assert!(result.answers.contains(4_000_000_000));
    }

    #[test]
    fn graded_sheet_keeps_detected_rows_and_key_gaps() {
        let sheet = render(&answers(&[Some('A'), Some('B')]), 2);
        let key = AnswerKey::from_pairs([("2", "B"), ("9", "C")]).unwrap();
        let result = SheetDetector::default().grade(&sheet, &key).unwrap();
        assert_eq!((result.correct, result.total), (1, 2));
        assert_eq!(result.answers.answer(1), Some(Alternative::A));
        assert!(result.answers.contains(9));
        assert_eq!(result.answers.len(), 3);
    }

    #[test]
    fn oversized_expected_count_is_invalid_input() {
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 50, Luma([255u8])));
        let detector = SheetDetector::default();
        let err = detector
            .detect(&blank, Some(MAX_EXPECTED_QUESTIONS + 1))
            .unwrap_err();
        assert!(matches!(err, BubblemarkError::InvalidInput(_)));
        let at_limit = detector.detect(&blank, Some(MAX_EXPECTED_QUESTIONS)).unwrap();
        assert_eq!(at_limit.len(), MAX_EXPECTED_QUESTIONS as usize);
    }

    #[test]
    fn no_expected_count_still_reports_one_question() {
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 50, Luma([255u8])));
        let detected = SheetDetector::default().detect(&blank, None).unwrap();
        assert_eq!(detected, AnswerMap::unanswered(1));
    }

    #[test]
    fn zero_expected_count_is_invalid_input() {
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 50, Luma([255u8])));
        let err = SheetDetector::default().detect(&blank, Some(0)).unwrap_err();
        assert!(matches!(err, BubblemarkError::InvalidInput(_)));
    }

    #[test]
    fn grading_is_case_insensitive() {
        let sheet = render(&answers(&[Some('B'), Some('C'), Some('A')]), 3);
        let key = AnswerKey::from_pairs([("1", "b"), ("2", "c"), ("3", "E")]).unwrap();
        let result = SheetDetector::default().grade(&sheet, &key).unwrap();
        assert_eq!((result.correct, result.total), (2, 3));
    }

    #[test]
    fn detect_bytes_and_base64_agree() {
        use base64::prelude::*;

        let expected = answers(&[Some('E'), Some('B')]);
        let png = SheetTemplate::default()
            .render(2, Some(&expected))
            .unwrap()
            .to_png_bytes()
            .unwrap();
        let detector = SheetDetector::default();
        let from_bytes = detector.detect_bytes(&png, Some(2)).unwrap();
        let url = format!("data:image/png;base64,{}", BASE64_STANDARD.encode(&png));
        let from_base64 = detector.detect_base64(&url, Some(2)).unwrap();
        assert_eq!(from_bytes, expected);
        assert_eq!(from_base64, expected);
    }

    #[test]
    fn batch_keeps_order_and_isolates_failures() {
        let first = answers(&[Some('A')]);
        let second = answers(&[Some('C'), Some('D')]);
        let template = SheetTemplate::default();
        let sheets = vec![
            template.render(1, Some(&first)).unwrap().to_png_bytes().unwrap(),
            b"not an image".to_vec(),
            template.render(2, Some(&second)).unwrap().to_png_bytes().unwrap(),
        ];
        let results = SheetDetector::default().detect_batch(&sheets, None);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap(), &first);
        assert!(matches!(results[1], Err(BubblemarkError::InvalidImage(_))));
        assert_eq!(results[2].as_ref().unwrap(), &second);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = OmrConfig {
            alternatives_per_question: 1,
            ..Default::default()
        };
        assert!(SheetDetector::new(config).is_err());
    }
}
