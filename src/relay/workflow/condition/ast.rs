// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree for routing predicates

use std::fmt;

/// A routing predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Field (or dotted path) is absent or null
    Unset(String),
    /// Transcript holds fewer than N entries
    TranscriptBelow(usize),
    /// Logical AND
    And(Box<Predicate>, Box<Predicate>),
    /// Logical OR
    Or(Box<Predicate>, Box<Predicate>),
    /// Catch-all
    Always,
}

impl Predicate {
    pub fn unset(field: impl Into<String>) -> Self {
        Self::Unset(field.into())
    }

    pub fn transcript_below(n: usize) -> Self {
        Self::TranscriptBelow(n)
    }

    pub fn and(self, other: Predicate) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Unset(field) => write!(f, "{} is unset", field),
            Predicate::TranscriptBelow(n) => write!(f, "transcript < {}", n),
            Predicate::And(a, b) => write!(f, "({} and {})", a, b),
            Predicate::Or(a, b) => write!(f, "({} or {})", a, b),
            Predicate::Always => write!(f, "always"),
        }
    }
}
