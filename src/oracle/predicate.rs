//! Reproducer-predicate language.
//!
//! A small boolean expression tree evaluated against an [`OracleRecord`]. Parsing a
//! predicate from a textual CLI flag is a thin external-collaborator concern;
//! this module only needs the typed tree and its evaluator so a library caller can
//! build one programmatically.

use serde::{Deserialize, Serialize};

use crate::oracle::types::OracleRecord;

/// Which string field of the record a leaf predicate inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    /// The subject's stdout.
    Stdout,
    /// The subject's stderr.
    Stderr,
}

/// A boolean expression over `{stdout, stderr, exit_code}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Predicate {
    /// `field == value`, exact match.
    Equals {
        /// Field to inspect.
        field: Field,
        /// Value to compare against.
        value: String,
    },
    /// `field` contains `value` as a substring.
    Contains {
        /// Field to inspect.
        field: Field,
        /// Substring to search for.
        value: String,
    },
    /// `field` contains `value` as a substring, case-insensitively.
    ContainsIgnoreCase {
        /// Field to inspect.
        field: Field,
        /// Substring to search for.
        value: String,
    },
    /// `exit_code == value`. The only supported comparison for the exit code field.
    ExitCodeEquals(Option<i32>),
    /// All sub-predicates must hold.
    And(Vec<Predicate>),
    /// At least one sub-predicate must hold.
    Or(Vec<Predicate>),
    /// The sub-predicate must not hold.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Evaluate this predicate against an oracle record.
    pub fn evaluate(&self, record: &OracleRecord) -> bool {
        match self {
            Predicate::Equals { field, value } => field_value(record, *field) == value,
            Predicate::Contains { field, value } => field_value(record, *field).contains(value.as_str()),
            Predicate::ContainsIgnoreCase { field, value } => field_value(record, *field)
                .to_lowercase()
                .contains(&value.to_lowercase()),
            Predicate::ExitCodeEquals(expected) => record.exit_code == *expected,
            Predicate::And(preds) => preds.iter().all(|p| p.evaluate(record)),
            Predicate::Or(preds) => preds.iter().any(|p| p.evaluate(record)),
            Predicate::Not(inner) => !inner.evaluate(record),
        }
    }
}

fn field_value(record: &OracleRecord, field: Field) -> &str {
    match field {
        Field::Stdout => &record.stdout,
        Field::Stderr => &record.stderr,
    }
}
