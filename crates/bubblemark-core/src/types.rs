// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for answer-sheet reading and grading.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BubblemarkError, Result};

/// 1-based question number as printed on the sheet.
pub type QuestionNumber = u32;

/// Largest number of alternatives a question can carry (`A` through `Z`).
pub const MAX_ALTERNATIVES: usize = 26;

/// Largest expected question count a detection run accepts.
pub const MAX_EXPECTED_QUESTIONS: u32 = 1_000;

/// One answer choice of a question, identified by its left-to-right position.
///
/// Index 0 is `A`, index 1 is `B`, and so on. Parsing is case-insensitive;
/// display and serialisation always use the upper-case letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Alternative(u8);

impl Alternative {
    pub const A: Self = Self(0);
    pub const B: Self = Self(1);
    pub const C: Self = Self(2);
    pub const D: Self = Self(3);
    pub const E: Self = Self(4);

    /// Alternative at a zero-based position, `None` past `Z`.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < MAX_ALTERNATIVES).then(|| Self(index as u8))
    }

    /// Parse a single letter, ignoring case.
    pub fn from_letter(letter: char) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        upper
            .is_ascii_uppercase()
            .then(|| Self(upper as u8 - b'A'))
    }

    /// Zero-based position within the question.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Upper-case letter for this alternative.
    pub fn letter(self) -> char {
        (b'A' + self.0) as char
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for Alternative {
    type Err = BubblemarkError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_letter(c).ok_or_else(|| {
                BubblemarkError::invalid_input(format!("'{trimmed}' is not an answer letter"))
            }),
            _ => Err(BubblemarkError::invalid_input(format!(
                "expected a single answer letter, got '{trimmed}'"
            ))),
        }
    }
}

impl TryFrom<String> for Alternative {
    type Error = BubblemarkError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Alternative> for String {
    fn from(value: Alternative) -> Self {
        value.letter().to_string()
    }
}

/// Parse a question number such as `"7"` or `" 12 "`. Zero is rejected.
pub fn parse_question_number(raw: &str) -> Result<QuestionNumber> {
    let trimmed = raw.trim();
    match trimmed.parse::<QuestionNumber>() {
        Ok(0) => Err(BubblemarkError::invalid_input(
            "question numbers start at 1",
        )),
        Ok(number) => Ok(number),
        Err(_) => Err(BubblemarkError::invalid_input(format!(
            "'{trimmed}' is not a question number"
        ))),
    }
}

/// Detected answers keyed by question number.
///
/// `None` means the question was read but no alternative was accepted.
/// Serialises as a JSON object with string keys and `null` for unanswered
/// questions, e.g. `{"1": "A", "2": null}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<QuestionNumber, Option<Alternative>>);

impl AnswerMap {
    /// A map with questions `1..=count` all unanswered.
    pub fn unanswered(count: u32) -> Self {
        Self((1..=count).map(|q| (q, None)).collect())
    }

    /// Record the reading for one question, replacing any previous value.
    pub fn insert(&mut self, question: QuestionNumber, answer: Option<Alternative>) {
        self.0.insert(question, answer);
    }

    /// Answer for `question`; `None` when absent or unanswered.
    pub fn answer(&self, question: QuestionNumber) -> Option<Alternative> {
        self.0.get(&question).copied().flatten()
    }

    /// Whether the question has an entry at all (answered or not).
    pub fn contains(&self, question: QuestionNumber) -> bool {
        self.0.contains_key(&question)
    }

    /// Add unanswered entries for every missing question in `1..=count`.
    pub fn pad_to(&mut self, count: u32) {
        for question in 1..=count {
            self.0.entry(question).or_insert(None);
        }
    }

    /// Add an unanswered entry for each listed question not yet present.
    pub fn pad_questions(&mut self, questions: impl IntoIterator<Item = QuestionNumber>) {
        for question in questions {
            self.0.entry(question).or_insert(None);
        }
    }

    /// Number of questions present in the map.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of questions with an accepted alternative.
    pub fn answered_count(&self) -> usize {
        self.0.values().filter(|a| a.is_some()).count()
    }

    /// Entries in ascending question order.
    pub fn iter(&self) -> impl Iterator<Item = (QuestionNumber, Option<Alternative>)> + '_ {
        self.0.iter().map(|(q, a)| (*q, *a))
    }
}

impl FromIterator<(QuestionNumber, Option<Alternative>)> for AnswerMap {
    fn from_iter<T: IntoIterator<Item = (QuestionNumber, Option<Alternative>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The correct alternative for each graded question.
///
/// Built from caller-supplied strings; letters are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>")]
pub struct AnswerKey(BTreeMap<QuestionNumber, Alternative>);

impl AnswerKey {
    /// Build a key from `(question, letter)` string pairs such as a parsed
    /// JSON object `{"1": "b", "2": "D"}`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut entries = BTreeMap::new();
        for (question, letter) in pairs {
            let number = parse_question_number(question.as_ref())?;
            let alternative = letter.as_ref().parse::<Alternative>().map_err(|err| {
                BubblemarkError::invalid_input(format!("question {number}: {err}"))
            })?;
            entries.insert(number, alternative);
        }
        Ok(Self(entries))
    }

    /// Parse a key from a JSON object.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)?;
        Self::from_pairs(raw)
    }

    pub fn get(&self, question: QuestionNumber) -> Option<Alternative> {
        self.0.get(&question).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionNumber, Alternative)> + '_ {
        self.0.iter().map(|(q, a)| (*q, *a))
    }
}

impl TryFrom<BTreeMap<String, String>> for AnswerKey {
    type Error = BubblemarkError;

    fn try_from(value: BTreeMap<String, String>) -> Result<Self> {
        Self::from_pairs(value)
    }
}

impl FromIterator<(QuestionNumber, Alternative)> for AnswerKey {
    fn from_iter<T: IntoIterator<Item = (QuestionNumber, Alternative)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Outcome of grading one sheet against an answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Number of key entries matched by the detected answers.
    pub correct: usize,
    /// Number of questions in the key.
    pub total: usize,
    /// The detected answers the score was computed from.
    pub answers: AnswerMap,
}

/// Standard paper sizes for printable sheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}

impl FromStr for PaperSize {
    type Err = BubblemarkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(Self::A4),
            "a5" => Ok(Self::A5),
            "letter" => Ok(Self::Letter),
            "legal" => Ok(Self::Legal),
            other => Err(BubblemarkError::invalid_input(format!(
                "unknown paper size '{other}'"
            ))),
        }
    }
}
