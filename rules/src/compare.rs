use super::{dataset::Dataset, error::RuleError, predicate::Predicate};

/// How a candidate rule's selection differs from a reference rule's on one dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleComparison {
    /// Records the reference selects but the candidate doesn't.
    pub missing: Vec<usize>,
    /// Records the candidate selects but the reference doesn't.
    pub extra: Vec<usize>,
}

impl RuleComparison {
    /// Whether both rules select exactly the same records. Rules that are written differently
    /// still agree if the dataset doesn't tell them apart.
    pub fn is_equivalent(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Evaluates both rules on `dataset` and compares their selections record by record.
pub fn compare_rules(
    dataset: &Dataset,
    candidate: &str,
    reference: &str,
) -> Result<RuleComparison, RuleError> {
    let candidate = Predicate::parse(candidate)?;
    let reference = Predicate::parse(reference)?;
    Ok(compare_predicates(dataset, &candidate, &reference))
}

pub fn compare_predicates(
    dataset: &Dataset,
    candidate: &Predicate,
    reference: &Predicate,
) -> RuleComparison {
    let mut comparison = RuleComparison::default();
    for (index, record) in dataset.records().iter().enumerate() {
        match (candidate.matches(record), reference.matches(record)) {
            (false, true) => comparison.missing.push(index),
            (true, false) => comparison.extra.push(index),
            _ => {}
        }
    }
    comparison
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn people() -> Dataset {
        Dataset::try_from(json!([
            {"name": "John Doe", "type": "person", "age": 25, "role": ""},
            {"name": "Jane Doe", "type": "person", "age": 30, "role": "teacher"},
            {"name": "Max", "type": "pet", "species": "dog", "age": 5},
        ]))
        .unwrap()
    }

    #[test]
    fn differently_written_rules_can_agree() {
        let comparison =
            compare_rules(&people(), "age >= 30 and type == 'person'", "role == 'teacher'")
                .unwrap();
        assert!(comparison.is_equivalent());
    }

    #[test]
    fn reports_missing_and_extra_records() {
        let comparison = compare_rules(&people(), "age > 20", "type == 'person'").unwrap();
        assert_eq!(
            comparison,
            RuleComparison {
                missing: vec![],
                extra: vec![],
            }
        );

        let comparison =
            compare_rules(&people(), "age > 26 or type == 'pet'", "type == 'person'").unwrap();
        assert_eq!(comparison.missing, [0]);
        assert_eq!(comparison.extra, [2]);
        assert!(!comparison.is_equivalent());
    }

    #[test]
    fn candidate_errors_are_reported() {
        assert!(matches!(
            compare_rules(&people(), "print(1) == 1", "type == 'person'"),
            Err(RuleError::UnsafePredicate { .. })
        ));
    }
}
