//! Filter rules over heterogeneous records.
//!
//! A rule is a small boolean expression such as `type == 'pet' and age < 5`. Rules are parsed
//! into a [`Predicate`] tree and evaluated by structural recursion; nothing outside the
//! comparison grammar is ever executed.

pub mod compare;
pub mod dataset;
pub mod error;
pub mod evaluate;
pub mod predicate;

mod parser;

pub use compare::{compare_predicates, compare_rules, RuleComparison};
pub use dataset::{Dataset, Record};
pub use error::RuleError;
pub use evaluate::{evaluate, Partition};
pub use predicate::{CompareOp, Literal, Predicate};
