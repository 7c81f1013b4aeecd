// SPDX-License-Identifier: MIT

//! Routing predicates for supervisor route tables
//!
//! Predicates are simple expressions over workflow state:
//! - `credit_tier is unset`
//! - `transcript < 2`
//! - `always`
//! - `risk_score is unset and transcript < 4`

mod ast;
mod evaluator;
mod parser;

pub use ast::Predicate;
pub use evaluator::evaluate;
pub use parser::parse;
