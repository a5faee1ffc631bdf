//! The built-in material of the mapping exercises: a small concept taxonomy and two sample
//! datasets, each with the concepts and rules a learner is expected to come up with.

pub mod concepts;
pub mod error;
pub mod samples;

pub use concepts::{concepts, CONCEPTS};
pub use error::CatalogError;
pub use samples::{sample, samples, Sample, SampleEntry};
