//! Answer codec.
//!
//! Converts a row's sparse correct-answer set between its normalized form
//! ([`CorrectAnswers`]) and two flat encodings:
//!
//! - the persisted blob, a JSON object mapping column id to marker
//!   (`{"12":"1","14":"1"}`), which is a de facto on-disk format;
//! - the authoring-form layout, a 1-based radio value in single mode or one
//!   checkbox flag per correct column ordinal in multiple mode.
//!
//! Decoding the persisted blob tolerates references to columns that no
//! longer exist; they are dropped, never reported.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use crate::error::CodecError;
use crate::form::{AuthoredRow, ColumnOrdinal};
use crate::model::{ColumnId, CorrectAnswers, InputMode, SELECTED_MARKER};
use crate::registry::ColumnRegistry;

// ---------------------------------------------------------------------------
// Persisted encoding
// ---------------------------------------------------------------------------

/// Encode a correct-answer set as the persisted blob.
pub fn encode_persisted(answers: &CorrectAnswers) -> String {
    encode_markers(answers.iter().map(|(id, marker)| (id.to_string(), marker)))
}

/// Encode arbitrary key → marker pairs in the persisted blob format.
pub fn encode_markers<K, M>(pairs: impl IntoIterator<Item = (K, M)>) -> String
where
    K: Into<String>,
    M: AsRef<str>,
{
    let object: Map<String, Value> = pairs
        .into_iter()
        .map(|(key, marker)| (key.into(), Value::String(marker.as_ref().to_string())))
        .collect();
    Value::Object(object).to_string()
}

/// Parse a persisted blob into raw key → marker pairs.
///
/// Accepts the empty string, `null`, `[]` and `{}` as "nothing correct".
/// A JSON list is read as a mapping from list index to marker.
pub fn decode_markers(blob: &str) -> Result<BTreeMap<String, String>, CodecError> {
    let trimmed = blob.trim();
    if trimmed.is_empty() {
        return Ok(BTreeMap::new());
    }

    let value: Value = serde_json::from_str(trimmed).map_err(|e| CodecError::MalformedBlob {
        reason: e.to_string(),
    })?;

    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, v)| marker_text(&key, &v).map(|m| (key, m)))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let key = i.to_string();
                marker_text(&key, v).map(|m| (key, m))
            })
            .collect(),
        other => Err(CodecError::MalformedBlob {
            reason: format!("expected an object, found {other}"),
        }),
    }
}

fn marker_text(key: &str, value: &Value) -> Result<String, CodecError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(true) => Ok(SELECTED_MARKER.to_string()),
        Value::Bool(false) => Ok("0".to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(CodecError::MalformedBlob {
            reason: format!("marker for key '{key}' is not a scalar"),
        }),
    }
}

/// Decode a persisted blob against the question's current columns.
///
/// Keys that do not name a current column are skipped.
pub fn decode_persisted(blob: &str, columns: &ColumnRegistry) -> Result<CorrectAnswers, CodecError> {
    let markers = decode_markers(blob)?;
    let by_id: BTreeMap<ColumnId, &String> = markers
        .iter()
        .filter_map(|(key, marker)| key.trim().parse::<u64>().ok().map(|n| (ColumnId(n), marker)))
        .collect();

    let answers: CorrectAnswers = columns
        .iter()
        .filter_map(|column| {
            let id = column.id?;
            by_id.get(&id).map(|marker| (id, (*marker).clone()))
        })
        .collect();

    if answers.len() < markers.len() {
        tracing::debug!(
            "ignoring {} correct-answer reference(s) to columns that no longer exist",
            markers.len() - answers.len()
        );
    }
    Ok(answers)
}

// ---------------------------------------------------------------------------
// Authoring-form encoding
// ---------------------------------------------------------------------------

/// A row's correct answers as the authoring form lays them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAnswer {
    /// 1-based ordinal of the chosen column, if any.
    Single(Option<usize>),
    /// Flag value per 0-based column ordinal. Absent means not correct.
    Multiple(BTreeMap<ColumnOrdinal, String>),
}

impl FormAnswer {
    /// Write this answer into the mode-appropriate field of `row`.
    pub fn apply_to(self, row: &mut AuthoredRow) {
        match self {
            FormAnswer::Single(choice) => row.choice = choice.map(|n| n.to_string()),
            FormAnswer::Multiple(flags) => row.flags = flags,
        }
    }
}

/// Encode a normalized correct-answer set for the authoring form.
///
/// In single mode the first correct column (in column order) wins.
pub fn encode_form(answers: &CorrectAnswers, columns: &ColumnRegistry, mode: InputMode) -> FormAnswer {
    let mut correct = columns
        .iter()
        .filter(|c| c.id.is_some_and(|id| answers.contains(id)));

    match mode {
        InputMode::Single => FormAnswer::Single(correct.next().map(|c| c.number + 1)),
        InputMode::Multiple => FormAnswer::Multiple(
            correct
                .filter_map(|c| {
                    let id = c.id?;
                    answers.marker(id).map(|m| (c.number, m.to_string()))
                })
                .collect(),
        ),
    }
}

/// Recover a 1-based column ordinal from a submitted radio value.
///
/// Non-digit characters are stripped, so both `"2"` and `"a2"` read as 2.
/// A blank value means no choice was made.
pub fn parse_choice(slot: usize, raw: &str) -> Result<Option<usize>, CodecError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(CodecError::InvalidChoice {
            row: slot,
            value: raw.to_string(),
        });
    }
    // Only overflow can fail here; report it as an ordinal that cannot exist.
    digits
        .parse::<usize>()
        .map(Some)
        .map_err(|_| CodecError::ColumnOrdinalOutOfRange {
            row: slot,
            ordinal: usize::MAX,
            columns: 0,
        })
}

/// Decode an authored row's answer fields against the created column ids.
///
/// `column_ids[k]` is the id of the column created for ordinal `k`.
pub fn decode_form(
    slot: usize,
    row: &AuthoredRow,
    mode: InputMode,
    column_ids: &[ColumnId],
) -> Result<CorrectAnswers, CodecError> {
    let mut answers = CorrectAnswers::new();
    match mode {
        InputMode::Single => {
            let Some(raw) = row.choice.as_deref() else {
                return Ok(answers);
            };
            let Some(ordinal) = parse_choice(slot, raw)? else {
                return Ok(answers);
            };
            let id = ordinal
                .checked_sub(1)
                .and_then(|k| column_ids.get(k))
                .ok_or(CodecError::ColumnOrdinalOutOfRange {
                    row: slot,
                    ordinal,
                    columns: column_ids.len(),
                })?;
            answers.insert(*id, SELECTED_MARKER);
        }
        InputMode::Multiple => {
            for (k, id) in column_ids.iter().enumerate() {
                if let Some(flag) = row.flags.get(&k) {
                    let marker = if flag.trim().is_empty() {
                        SELECTED_MARKER
                    } else {
                        flag.as_str()
                    };
                    answers.insert(*id, marker);
                }
            }
        }
    }
    Ok(answers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, QuestionId};
    use proptest::prelude::*;

    fn columns(n: usize) -> ColumnRegistry {
        ColumnRegistry::from_columns(
            (0..n).map(|i| Column::new(QuestionId(1), i, format!("C{i}")).with_id(ColumnId(100 + i as u64))),
        )
        .unwrap()
    }

    #[test]
    fn persisted_blob_is_json_object() {
        let mut answers = CorrectAnswers::new();
        answers.insert(ColumnId(12), "1");
        answers.insert(ColumnId(14), "1");
        assert_eq!(encode_persisted(&answers), r#"{"12":"1","14":"1"}"#);
        assert_eq!(encode_persisted(&CorrectAnswers::new()), "{}");
    }

    #[test]
    fn decode_skips_deleted_columns() {
        let cols = columns(2);
        let answers = decode_persisted(r#"{"100":"1","999":"1"}"#, &cols).unwrap();
        assert_eq!(answers.len(), 1);
        assert!(answers.contains(ColumnId(100)));
        assert!(!answers.contains(ColumnId(999)));
    }

    #[test]
    fn decode_accepts_legacy_empty_encodings() {
        let cols = columns(2);
        for blob in ["", "[]", "{}", "null", "  "] {
            assert!(decode_persisted(blob, &cols).unwrap().is_empty(), "blob {blob:?}");
        }
    }

    #[test]
    fn decode_accepts_numeric_markers() {
        let markers = decode_markers(r#"{"5":1,"6":true}"#).unwrap();
        assert_eq!(markers.get("5").map(String::as_str), Some("1"));
        assert_eq!(markers.get("6").map(String::as_str), Some("1"));
    }

    #[test]
    fn decode_rejects_malformed_blob() {
        assert!(matches!(
            decode_markers("{not json"),
            Err(CodecError::MalformedBlob { .. })
        ));
        assert!(matches!(
            decode_markers("42"),
            Err(CodecError::MalformedBlob { .. })
        ));
        assert!(matches!(
            decode_markers(r#"{"1":{"nested":true}}"#),
            Err(CodecError::MalformedBlob { .. })
        ));
    }

    #[test]
    fn decode_list_uses_indexes_as_keys() {
        let markers = decode_markers(r#"["1","1"]"#).unwrap();
        assert_eq!(markers.keys().collect::<Vec<_>>(), vec!["0", "1"]);
    }

    #[test]
    fn single_mode_form_uses_one_based_ordinal() {
        let cols = columns(3);
        let mut answers = CorrectAnswers::new();
        answers.insert(ColumnId(101), SELECTED_MARKER);

        let encoded = encode_form(&answers, &cols, InputMode::Single);
        assert_eq!(encoded, FormAnswer::Single(Some(2)));

        let mut row = AuthoredRow::new("r");
        encoded.apply_to(&mut row);
        assert_eq!(row.choice.as_deref(), Some("2"));

        let decoded = decode_form(0, &row, InputMode::Single, &cols.ids()).unwrap();
        assert_eq!(decoded.column_ids().collect::<Vec<_>>(), vec![ColumnId(101)]);
    }

    #[test]
    fn single_mode_strips_widget_prefix() {
        let cols = columns(3);
        let row = AuthoredRow::new("r").with_choice_value("a3");
        let decoded = decode_form(0, &row, InputMode::Single, &cols.ids()).unwrap();
        assert!(decoded.contains(ColumnId(102)));
    }

    #[test]
    fn single_mode_unknown_ordinal_fails_loudly() {
        let cols = columns(2);
        let row = AuthoredRow::new("r").choose(3);
        let err = decode_form(4, &row, InputMode::Single, &cols.ids()).unwrap_err();
        assert_eq!(
            err,
            CodecError::ColumnOrdinalOutOfRange {
                row: 4,
                ordinal: 3,
                columns: 2
            }
        );

        let zero = AuthoredRow::new("r").with_choice_value("a0");
        assert!(decode_form(0, &zero, InputMode::Single, &cols.ids()).is_err());
    }

    #[test]
    fn single_mode_without_choice_is_empty() {
        let cols = columns(2);
        let row = AuthoredRow::new("r");
        assert!(decode_form(0, &row, InputMode::Single, &cols.ids())
            .unwrap()
            .is_empty());
        let junk = AuthoredRow::new("r").with_choice_value("none");
        assert!(matches!(
            decode_form(0, &junk, InputMode::Single, &cols.ids()),
            Err(CodecError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn multiple_mode_emits_only_correct_flags() {
        let cols = columns(3);
        let mut answers = CorrectAnswers::new();
        answers.insert(ColumnId(100), "1");
        answers.insert(ColumnId(102), "1");

        let FormAnswer::Multiple(flags) = encode_form(&answers, &cols, InputMode::Multiple) else {
            panic!("expected multiple-mode flags");
        };
        assert_eq!(flags.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert!(!flags.contains_key(&1));
    }

    #[test]
    fn multiple_mode_blank_flag_defaults_marker() {
        let cols = columns(2);
        let mut row = AuthoredRow::new("r");
        row.flags.insert(1, String::new());
        row.flags.insert(7, "1".into());
        let decoded = decode_form(0, &row, InputMode::Multiple, &cols.ids()).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded.marker(ColumnId(101)), Some("1"));
    }

    fn answer_set() -> impl Strategy<Value = (usize, Vec<(usize, String)>)> {
        (1usize..8).prop_flat_map(|n| {
            let entries = prop::collection::vec((0..n, "[0-9a-z]{1,3}"), 0..n);
            (Just(n), entries)
        })
    }

    proptest! {
        /// Persisted encoding round-trips every set over current columns.
        #[test]
        fn persisted_roundtrip((n, entries) in answer_set()) {
            let cols = columns(n);
            let answers: CorrectAnswers = entries
                .into_iter()
                .map(|(k, marker)| (ColumnId(100 + k as u64), marker))
                .collect();
            let decoded = decode_persisted(&encode_persisted(&answers), &cols).unwrap();
            prop_assert_eq!(decoded, answers);
        }

        /// Form encoding round-trips in multiple mode.
        #[test]
        fn multiple_form_roundtrip((n, entries) in answer_set()) {
            let cols = columns(n);
            let answers: CorrectAnswers = entries
                .into_iter()
                .map(|(k, marker)| (ColumnId(100 + k as u64), marker))
                .collect();
            let mut row = AuthoredRow::new("r");
            encode_form(&answers, &cols, InputMode::Multiple).apply_to(&mut row);
            let decoded = decode_form(0, &row, InputMode::Multiple, &cols.ids()).unwrap();
            prop_assert_eq!(decoded, answers);
        }

        /// Form encoding round-trips in single mode.
        #[test]
        fn single_form_roundtrip(n in 1usize..8, pick in 0usize..8) {
            let cols = columns(n);
            let mut answers = CorrectAnswers::new();
            answers.insert(ColumnId(100 + (pick % n) as u64), SELECTED_MARKER);
            let mut row = AuthoredRow::new("r");
            encode_form(&answers, &cols, InputMode::Single).apply_to(&mut row);
            let decoded = decode_form(0, &row, InputMode::Single, &cols.ids()).unwrap();
            prop_assert_eq!(decoded, answers);
        }
    }
}
