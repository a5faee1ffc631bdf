use serde::Serialize;

use super::error::HierarchyError;

/// One flat input entity: a name, an optional parent reference and its attribute names.
///
/// `name` is optional so that sources without an identity can be represented; such entities are
/// rejected by [`Hierarchy::build`](crate::Hierarchy::build).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityDecl {
    pub name: Option<String>,
    pub parent: Option<String>,
    pub attributes: Vec<String>,
    pub description: Option<String>,
}

impl EntityDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Turns the declaration into a record with no children, failing if it has no usable name.
    pub(crate) fn into_record(self, position: usize) -> Result<ConceptRecord, HierarchyError> {
        let name = match self.name {
            Some(name) if !name.is_empty() => name,
            Some(_) => {
                return Err(HierarchyError::malformed(
                    format!("entity #{position}"),
                    "name is empty",
                ))
            }
            None => {
                return Err(HierarchyError::malformed(
                    format!("entity #{position}"),
                    "name is missing",
                ))
            }
        };

        Ok(ConceptRecord {
            name,
            attributes: self.attributes,
            // An empty reference carries no information; treat it like an absent one.
            parent: self.parent.filter(|p| !p.is_empty()),
            children: Vec::new(),
            description: self.description,
        })
    }
}

/// A concept (or role class) as stored in a [`Hierarchy`](crate::Hierarchy).
///
/// Records are immutable once built. `children` is derived from the `parent` references of the
/// whole hierarchy and can't be set directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConceptRecord {
    #[serde(skip)]
    name: String,
    description: Option<String>,
    attributes: Vec<String>,
    parent: Option<String>,
    children: Vec<String>,
}

impl ConceptRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// The parent reference as declared. It may name a record that isn't part of the hierarchy.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn set_children(&mut self, children: Vec<String>) {
        self.children = children;
    }
}
