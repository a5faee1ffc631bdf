use serde_json::{Map, Value};

use super::{
    error::RuleError,
    evaluate::Partition,
    predicate::Predicate,
};

/// One row of a dataset: an ordered mapping from field name to value. Rows of the same dataset
/// don't need to share their fields.
pub type Record = Map<String, Value>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Reads a dataset from a JSON array of objects.
    pub fn from_json(source: &str) -> Result<Self, RuleError> {
        let value: Value =
            serde_json::from_str(source).map_err(|e| RuleError::InvalidDataset(e.to_string()))?;
        Self::try_from(value)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The union of the records' field names, in order of first appearance.
    pub fn schema(&self) -> Vec<&str> {
        let mut schema: Vec<&str> = Vec::new();
        for key in self.records.iter().flat_map(Map::keys) {
            if !schema.contains(&key.as_str()) {
                schema.push(key);
            }
        }
        schema
    }

    /// Splits the records by `predicate`, keeping their relative order.
    pub fn partition(&self, predicate: &Predicate) -> Partition<'_> {
        Partition::new(self, predicate)
    }
}

impl From<Vec<Record>> for Dataset {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

impl TryFrom<Value> for Dataset {
    type Error = RuleError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Array(rows) = value else {
            return Err(RuleError::InvalidDataset(
                "expected an array of objects".to_owned(),
            ));
        };
        rows.into_iter()
            .enumerate()
            .map(|(index, row)| match row {
                Value::Object(record) => Ok(record),
                other => Err(RuleError::InvalidDataset(format!(
                    "row {index} is not an object: {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_union_in_first_appearance_order() {
        let dataset = Dataset::from_json(
            r#"[{"name": "Max", "type": "pet", "species": "dog"},
                {"name": "John", "type": "person", "age": 25, "species": null}]"#,
        )
        .unwrap();
        assert_eq!(dataset.schema(), ["name", "type", "species", "age"]);
    }

    #[test]
    fn rejects_non_tabular_json() {
        assert!(matches!(
            Dataset::from_json(r#"{"name": "Max"}"#),
            Err(RuleError::InvalidDataset(_))
        ));
        assert!(matches!(
            Dataset::from_json(r#"[{"name": "Max"}, 3]"#),
            Err(RuleError::InvalidDataset(ref message)) if message.starts_with("row 1")
        ));
        assert!(matches!(
            Dataset::from_json("[{"),
            Err(RuleError::InvalidDataset(_))
        ));
    }

    #[test]
    fn empty_array_is_an_empty_dataset() {
        let dataset = Dataset::from_json("[]").unwrap();
        assert!(dataset.is_empty());
        assert!(dataset.schema().is_empty());
    }
}
