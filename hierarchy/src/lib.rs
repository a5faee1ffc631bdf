// TODO (low prio) CAEX SystemUnitClassLib and InterfaceClassLib share the RoleClass shape

pub mod caex;
pub mod concept;
pub mod error;
pub mod graph;
pub mod hierarchy;

pub use caex::{RoleClass, RoleClassLib};
pub use concept::{ConceptRecord, EntityDecl};
pub use error::HierarchyError;
pub use graph::{Element, ElementData, Graph, GraphElement};
pub use hierarchy::{Ancestors, Hierarchy};

/// Parses `source` as XML and reads every CAEX RoleClass library in it.
///
/// This is the usual entry point for `.aml` files; use [`caex::read_roleclass_libs`] directly
/// when the document has already been parsed.
pub fn read_roleclass_libs(
    source: &str,
    allow_dtd: bool,
) -> Result<Vec<RoleClassLib>, HierarchyError> {
    let document = caex::parse_document(source, allow_dtd)?;
    caex::read_roleclass_libs(&document)
}
