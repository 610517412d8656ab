// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grading of detected answers against an answer key.

use bubblemark_core::error::{BubblemarkError, Result};
use bubblemark_core::{AnswerKey, AnswerMap, ScoreResult};
use tracing::{info, instrument};

/// Count how many key entries the detected answers match.
///
/// Letters compare case-insensitively (both sides are normalised on parse).
/// Unanswered or missing questions count as wrong. An empty key is rejected.
#[instrument(skip_all, fields(key_len = key.len(), detected = detected.len()))]
pub fn score(detected: &AnswerMap, key: &AnswerKey) -> Result<ScoreResult> {
    if key.is_empty() {
        return Err(BubblemarkError::invalid_input("answer key is empty"));
    }

    let correct = key
        .iter()
        .filter(|(question, expected)| detected.answer(*question) == Some(*expected))
        .count();

    info!(correct, total = key.len(), "Sheet graded");
    Ok(ScoreResult {
        correct,
        total: key.len(),
        answers: detected.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bubblemark_core::Alternative;

    fn detected(pairs: &[(u32, Option<Alternative>)]) -> AnswerMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn counts_matches_case_insensitively() {
        let key = AnswerKey::from_pairs([("1", "b"), ("2", "C")]).unwrap();
        let answers = detected(&[(1, Some(Alternative::B)), (2, Some(Alternative::D))]);
        let result = score(&answers, &key).unwrap();
        assert_eq!(result.correct, 1);
        assert_eq!(result.total, 2);
        assert_eq!(result.answers, answers);
    }

    #[test]
    fn unanswered_and_missing_are_wrong() {
        let key = AnswerKey::from_pairs([("1", "A"), ("2", "A"), ("7", "A")]).unwrap();
        let answers = detected(&[(1, None), (2, Some(Alternative::A))]);
        assert_eq!(score(&answers, &key).unwrap().correct, 1);
    }

    #[test]
    fn empty_key_is_invalid_input() {
        let err = score(&AnswerMap::unanswered(3), &AnswerKey::default()).unwrap_err();
        assert!(matches!(err, BubblemarkError::InvalidInput(_)));
    }

    #[test]
    fn extra_detected_questions_are_ignored() {
        let key = AnswerKey::from_pairs([("1", "E")]).unwrap();
        let answers = detected(&[(1, Some(Alternative::E)), (2, Some(Alternative::A))]);
        let result = score(&answers, &key).unwrap();
        assert_eq!((result.correct, result.total), (1, 1));
    }

    #[test]
    fn fixing_an_answer_never_lowers_the_score() {
        let key = AnswerKey::from_pairs([("1", "A"), ("2", "B"), ("3", "C"), ("4", "D")]).unwrap();
        let mut answers = AnswerMap::unanswered(4);
        let mut previous = score(&answers, &key).unwrap().correct;
        assert_eq!(previous, 0);
        for (question, expected) in key.iter() {
            answers.insert(question, Some(expected));
            let now = score(&answers, &key).unwrap().correct;
            assert!(now >= previous);
            previous = now;
        }
        assert_eq!(previous, 4);
    }
}
