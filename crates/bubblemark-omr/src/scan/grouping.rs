// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Question grouping — reading-order sort of bubble candidates and partition
// into fixed-size question rows.
//
// Assumes a single-column, axis-aligned sheet where every question's bubbles
// share one horizontal band. Rotated or multi-column sheets break this.

use bubblemark_core::QuestionNumber;
use tracing::{debug, instrument, warn};

use super::blobs::BlobCandidate;

/// One question row: its number and bubbles ordered left to right (A, B, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub number: QuestionNumber,
    pub alternatives: Vec<BlobCandidate>,
}

/// Result of grouping: complete questions plus the count of trailing
/// candidates that did not fill a whole row.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedQuestions {
    pub questions: Vec<Question>,
    pub leftover: usize,
}

/// Sort candidates into reading order and chunk them into questions.
///
/// Candidates are ordered by top edge, then left edge. Consecutive runs of
/// `per_question` candidates become questions 1, 2, ...; inside each run the
/// bubbles are re-ordered by left edge so position decides the letter. A
/// trailing run shorter than `per_question` is dropped.
#[instrument(skip(blobs), fields(candidates = blobs.len()))]
pub fn group_questions(mut blobs: Vec<BlobCandidate>, per_question: usize) -> GroupedQuestions {
    if per_question == 0 {
        return GroupedQuestions {
            questions: Vec::new(),
            leftover: blobs.len(),
        };
    }

    blobs.sort_by_key(|b| (b.y, b.x));

    let leftover = blobs.len() % per_question;
    if leftover > 0 {
        warn!(
            leftover,
            per_question, "Trailing bubbles do not form a complete question; ignoring them"
        );
    }

    let mut questions = Vec::with_capacity(blobs.len() / per_question);
    let mut remaining = blobs.into_iter();
    for number in 1.. {
        let mut row: Vec<BlobCandidate> = remaining.by_ref().take(per_question).collect();
        if row.len() < per_question {
            break;
        }
        row.sort_by_key(|b| (b.x, b.y));
        questions.push(Question {
            number,
            alternatives: row,
        });
    }

    debug!(questions = questions.len(), leftover, "Bubbles grouped into questions");
    GroupedQuestions {
        questions,
        leftover,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bubble(x: u32, y: u32) -> BlobCandidate {
        BlobCandidate::from_rect(x, y, 20, 20)
    }

    fn xs(question: &Question) -> Vec<u32> {
        question.alternatives.iter().map(|b| b.x).collect()
    }

    #[test]
    fn rows_become_numbered_questions() {
        let mut blobs = Vec::new();
        for row in 0..3u32 {
            for col in (0..5u32).rev() {
                blobs.push(bubble(100 + col * 40, 50 + row * 40));
            }
        }
        let grouped = group_questions(blobs, 5);

        assert_eq!(grouped.leftover, 0);
        assert_eq!(grouped.questions.len(), 3);
        for (i, q) in grouped.questions.iter().enumerate() {
            assert_eq!(q.number, i as u32 + 1);
            assert_eq!(xs(q), vec![100, 140, 180, 220, 260]);
            assert!(q.alternatives.iter().all(|b| b.y == 50 + i as u32 * 40));
        }
    }

    #[test]
    fn jittered_row_still_orders_by_x() {
        // A slightly tilted photo: the right-most bubble sits a pixel higher.
        let blobs = vec![
            bubble(100, 51),
            bubble(140, 51),
            bubble(180, 50),
            bubble(220, 50),
            bubble(260, 49),
        ];
        let grouped = group_questions(blobs, 5);
        assert_eq!(xs(&grouped.questions[0]), vec![100, 140, 180, 220, 260]);
    }

    #[test]
    fn trailing_partial_row_is_dropped() {
        let mut blobs: Vec<_> = (0..5).map(|c| bubble(c * 40, 10)).collect();
        blobs.extend((0..3).map(|c| bubble(c * 40, 60)));
        let grouped = group_questions(blobs, 5);
        assert_eq!(grouped.questions.len(), 1);
        assert_eq!(grouped.leftover, 3);
    }

    #[test]
    fn fewer_than_one_row_gives_no_questions() {
        let grouped = group_questions(vec![bubble(0, 0), bubble(40, 0)], 5);
        assert!(grouped.questions.is_empty());
        assert_eq!(grouped.leftover, 2);
    }

    #[test]
    fn custom_row_width() {
        let blobs: Vec<_> = (0..8).map(|i| bubble((i % 4) * 40, (i / 4) * 40)).collect();
        let grouped = group_questions(blobs, 4);
        assert_eq!(grouped.questions.len(), 2);
        assert_eq!(grouped.questions[1].alternatives.len(), 4);
    }
}
