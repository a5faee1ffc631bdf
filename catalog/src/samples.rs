use lazy_static::lazy_static;
use mm_rules::{compare_rules, Dataset, Partition, RuleComparison};
use serde_json::json;

use super::error::CatalogError;

/// What a learner is expected to find for one record of a sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleEntry {
    /// The concept the record should be classified as. This is not necessarily a concept of the
    /// taxonomy: the pet sample expects `dog`, which only exists as a species value.
    pub concept: &'static str,
    /// A rule selecting the records of that concept.
    pub rule: &'static str,
}

/// A small dataset to practise classification and rule building on.
#[derive(Clone, Debug)]
pub struct Sample {
    pub id: u32,
    pub description: &'static str,
    pub dataset: Dataset,
    /// One entry per record, in record order.
    pub entries: Vec<SampleEntry>,
}

impl Sample {
    /// `index` counts from zero.
    pub fn entry(&self, index: usize) -> Result<&SampleEntry, CatalogError> {
        self.entries.get(index).ok_or(CatalogError::UnknownEntry {
            sample: self.id,
            entry: index,
        })
    }

    /// Whether `concept` is the expected classification of entry `index`.
    pub fn is_expected_concept(&self, index: usize, concept: &str) -> Result<bool, CatalogError> {
        Ok(self.entry(index)?.concept == concept)
    }

    /// Compares `candidate` with the reference rule of entry `index` on this sample's records.
    pub fn check_rule(&self, index: usize, candidate: &str) -> Result<RuleComparison, CatalogError> {
        let reference = self.entry(index)?.rule;
        Ok(compare_rules(&self.dataset, candidate, reference)?)
    }

    /// Filters this sample's records.
    pub fn filter(&self, predicate: &str) -> Result<Partition<'_>, CatalogError> {
        Ok(mm_rules::evaluate(&self.dataset, predicate)?)
    }
}

fn dataset(rows: serde_json::Value) -> Dataset {
    Dataset::try_from(rows).expect("Built-in sample rows are JSON objects")
}

lazy_static! {
    static ref SAMPLES: Vec<Sample> = vec![
        Sample {
            id: 1,
            description: "Sample data with information about pupils and teachers.",
            dataset: dataset(json!([
                {"name": "John Doe", "type": "person", "age": 25, "role": ""},
                {"name": "Jane Doe", "type": "person", "age": 30, "role": "teacher"},
            ])),
            entries: vec![
                SampleEntry { concept: "person", rule: "type == 'person'" },
                SampleEntry { concept: "teacher", rule: "role == 'teacher'" },
            ],
        },
        Sample {
            id: 2,
            description: "Sample data with information about pets.",
            dataset: dataset(json!([
                {"name": "Max", "type": "pet", "species": "dog", "age": 5},
                {"name": "Bella", "type": "pet", "species": "cat", "age": 3},
            ])),
            entries: vec![
                SampleEntry { concept: "pet", rule: "type == 'pet'" },
                SampleEntry { concept: "dog", rule: "species == 'dog'" },
            ],
        },
    ];
}

pub fn samples() -> &'static [Sample] {
    &SAMPLES
}

pub fn sample(id: u32) -> Result<&'static Sample, CatalogError> {
    samples()
        .iter()
        .find(|sample| sample.id == id)
        .ok_or(CatalogError::UnknownSample(id))
}
