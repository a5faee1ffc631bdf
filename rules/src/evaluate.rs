use serde_json::Value;
use tracing::{trace, warn};

use super::{
    dataset::{Dataset, Record},
    error::RuleError,
    predicate::Predicate,
};

/// Parses `predicate` and splits `dataset` by it.
///
/// Fields the predicate names but no record carries are treated as absent everywhere, so such a
/// predicate matches nothing (unless negated); this is logged but not an error.
pub fn evaluate<'d>(dataset: &'d Dataset, predicate: &str) -> Result<Partition<'d>, RuleError> {
    let predicate = Predicate::parse(predicate)?;
    Ok(dataset.partition(&predicate))
}

/// The outcome of filtering a dataset: which records matched, in their original order.
#[derive(Clone, Debug, PartialEq)]
pub struct Partition<'d> {
    records: &'d [Record],
    matched: Vec<bool>,
}

impl<'d> Partition<'d> {
    pub(crate) fn new(dataset: &'d Dataset, predicate: &Predicate) -> Self {
        let schema = dataset.schema();
        for field in predicate.fields() {
            if !schema.contains(&field) {
                warn!(field, "predicate references a field no record has");
            }
        }

        let records = dataset.records();
        let matched = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let matched = predicate.matches(record);
                trace!(index, matched, "evaluated record");
                matched
            })
            .collect();

        Self { records, matched }
    }

    pub fn matches(&self) -> impl Iterator<Item = &'d Record> + '_ {
        self.select(true)
    }

    pub fn non_matches(&self) -> impl Iterator<Item = &'d Record> + '_ {
        self.select(false)
    }

    pub fn match_indices(&self) -> Vec<usize> {
        self.indices(true)
    }

    pub fn non_match_indices(&self) -> Vec<usize> {
        self.indices(false)
    }

    pub fn is_match(&self, index: usize) -> bool {
        self.matched.get(index).copied().unwrap_or(false)
    }

    pub fn match_count(&self) -> usize {
        self.matched.iter().filter(|&&m| m).count()
    }

    /// The matched records restricted to `columns`, one row per match; a column a record lacks
    /// is null.
    pub fn project(&self, columns: &[&str]) -> Vec<Vec<Value>> {
        self.matches()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| record.get(*column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect()
    }

    /// Copies the records out as `(matches, non_matches)`.
    pub fn into_owned(self) -> (Vec<Record>, Vec<Record>) {
        (
            self.matches().cloned().collect(),
            self.non_matches().cloned().collect(),
        )
    }

    fn select(&self, wanted: bool) -> impl Iterator<Item = &'d Record> + '_ {
        let records: &'d [Record] = self.records;
        records
            .iter()
            .zip(&self.matched)
            .filter(move |(_, &matched)| matched == wanted)
            .map(|(record, _)| record)
    }

    fn indices(&self, wanted: bool) -> Vec<usize> {
        self.matched
            .iter()
            .enumerate()
            .filter(|(_, &matched)| matched == wanted)
            .map(|(index, _)| index)
            .collect()
    }
}
