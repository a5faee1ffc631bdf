use mm_rules::RuleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("there is no sample {0}")]
    UnknownSample(u32),
    #[error("sample {sample} has no entry {entry}")]
    UnknownEntry { sample: u32, entry: usize },
    #[error(transparent)]
    Rule(#[from] RuleError),
}
