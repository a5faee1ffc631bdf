use std::collections::{HashMap, HashSet};

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use super::{
    concept::{ConceptRecord, EntityDecl},
    error::HierarchyError,
    graph::{Element, Graph},
};

/// A mapping from concept name to [`ConceptRecord`], with the parent/child links resolved.
///
/// Iteration follows the order in which names first appeared in the input. A hierarchy is built
/// in one go by [`Hierarchy::build`] and never modified afterwards.
#[derive(Clone, Debug, Default)]
pub struct Hierarchy {
    records: Vec<ConceptRecord>,
    index: HashMap<String, usize>,
}

impl Hierarchy {
    /// Builds the hierarchy from flat entity declarations.
    ///
    /// Fails with [`HierarchyError::MalformedInput`] if any entity lacks a name; this is checked
    /// for all entities before any record is created. A later entity with an already used name
    /// replaces the earlier record. Parent references that don't resolve are kept as declared
    /// but contribute no child link.
    pub fn build<I>(entities: I) -> Result<Self, HierarchyError>
    where
        I: IntoIterator<Item = EntityDecl>,
    {
        let records = entities
            .into_iter()
            .enumerate()
            .map(|(position, entity)| entity.into_record(position))
            .collect::<Result<Vec<_>, _>>()?;

        let mut hierarchy = Self {
            records: Vec::with_capacity(records.len()),
            index: HashMap::with_capacity(records.len()),
        };
        for record in records {
            match hierarchy.index.get(record.name()) {
                Some(&slot) => {
                    debug!(name = record.name(), "duplicate concept name, keeping the later one");
                    hierarchy.records[slot] = record;
                }
                None => {
                    hierarchy
                        .index
                        .insert(record.name().to_owned(), hierarchy.records.len());
                    hierarchy.records.push(record);
                }
            }
        }

        let children = derive_children(&hierarchy.records, &hierarchy.index);
        for (record, children) in hierarchy.records.iter_mut().zip(children) {
            record.set_children(children);
        }

        Ok(hierarchy)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ConceptRecord> {
        self.index.get(name).map(|&slot| &self.records[slot])
    }

    pub fn records(&self) -> impl Iterator<Item = &ConceptRecord> + '_ {
        self.records.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(ConceptRecord::name)
    }

    /// The attribute names of `name` in source order; empty if the name is unknown.
    pub fn attributes_of(&self, name: &str) -> &[String] {
        self.get(name).map(ConceptRecord::attributes).unwrap_or(&[])
    }

    /// The children of `name` in input order; empty if there are none or the name is unknown.
    pub fn children_of(&self, name: &str) -> &[String] {
        self.get(name).map(ConceptRecord::children).unwrap_or(&[])
    }

    /// The parent of `name`, but only if it resolves to a record of this hierarchy.
    pub fn parent_of(&self, name: &str) -> Option<&ConceptRecord> {
        self.get(name)
            .and_then(ConceptRecord::parent)
            .and_then(|parent| self.get(parent))
    }

    /// Walks the resolvable parents of `name`, nearest first.
    ///
    /// The walk stops at the first parent that is unknown or was already visited, so it
    /// terminates on cyclic parent chains.
    pub fn ancestors<'h>(&'h self, name: &str) -> Ancestors<'h> {
        let mut visited = HashSet::new();
        let current = self.get(name).map(|record| {
            visited.insert(record.name());
            record
        });
        Ancestors {
            hierarchy: self,
            current,
            visited,
        }
    }

    /// The number of resolvable ancestors of `name`; zero for roots and unknown names.
    pub fn depth(&self, name: &str) -> usize {
        self.ancestors(name).count()
    }

    /// Records without a resolvable parent, in hierarchy order.
    pub fn roots(&self) -> impl Iterator<Item = &ConceptRecord> + '_ {
        self.records
            .iter()
            .filter(|record| record.parent().map_or(true, |p| !self.contains(p)))
    }

    /// `(child, parent)` pairs whose parent reference doesn't resolve within this hierarchy.
    pub fn dangling_parents(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.records.iter().filter_map(|record| match record.parent() {
            Some(parent) if !self.contains(parent) => Some((record.name(), parent)),
            _ => None,
        })
    }

    /// The attributes of `name` followed by those of each ancestor, nearest ancestor first.
    pub fn inherited_attributes(&self, name: &str) -> Vec<&str> {
        let own = self.attributes_of(name).iter();
        let inherited = self
            .ancestors(name)
            .flat_map(|ancestor| ancestor.attributes().iter());
        own.chain(inherited).map(String::as_str).collect()
    }

    /// Nodes and parent→child edges of the hierarchy. Each call starts a fresh traversal.
    pub fn to_graph(&self) -> Graph<'_> {
        Graph::new(&self.records)
    }

    /// The graph in the node/edge "elements" shape understood by browser graph widgets.
    pub fn to_elements(&self) -> Vec<Element<'_>> {
        self.to_graph().map(Element::from).collect()
    }

    /// The graph as Graphviz source.
    pub fn to_dot(&self) -> String {
        self.to_graph().to_dot()
    }
}

/// Children lists for `records`, recomputed from the parent references alone.
fn derive_children(records: &[ConceptRecord], index: &HashMap<String, usize>) -> Vec<Vec<String>> {
    let mut children = vec![Vec::new(); records.len()];
    for record in records {
        if let Some(&slot) = record.parent().and_then(|parent| index.get(parent)) {
            children[slot].push(record.name().to_owned());
        }
    }
    children
}

/// Iterator returned by [`Hierarchy::ancestors`].
pub struct Ancestors<'h> {
    hierarchy: &'h Hierarchy,
    current: Option<&'h ConceptRecord>,
    visited: HashSet<&'h str>,
}

impl<'h> Iterator for Ancestors<'h> {
    type Item = &'h ConceptRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let parent = self
            .current?
            .parent()
            .and_then(|parent| self.hierarchy.get(parent))
            .filter(|parent| self.visited.insert(parent.name()));
        self.current = parent;
        parent
    }
}

/// Serializes as a map from name to record, the shape the viewer shows for a library.
impl Serialize for Hierarchy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for record in &self.records {
            map.serialize_entry(record.name(), record)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(entities: &[(&str, Option<&str>)]) -> Hierarchy {
        Hierarchy::build(entities.iter().map(|&(name, parent)| {
            let entity = EntityDecl::new(name);
            match parent {
                Some(parent) => entity.with_parent(parent),
                None => entity,
            }
        }))
        .unwrap()
    }

    #[test]
    fn links_children_and_tolerates_dangling_parents() {
        let hierarchy = build(&[("A", None), ("B", Some("A")), ("C", Some("Z"))]);

        assert_eq!(hierarchy.children_of("A"), ["B"]);
        assert!(!hierarchy.contains("Z"));
        assert!(hierarchy.children_of("Z").is_empty());
        assert!(hierarchy.children_of("C").is_empty());
        assert_eq!(hierarchy.get("C").unwrap().parent(), Some("Z"));
        assert!(hierarchy.parent_of("C").is_none());
        assert_eq!(hierarchy.dangling_parents().collect::<Vec<_>>(), [("C", "Z")]);
    }

    #[test]
    fn children_follow_input_order() {
        let hierarchy = build(&[
            ("c2", Some("root")),
            ("root", None),
            ("c1", Some("root")),
            ("c3", Some("root")),
        ]);
        assert_eq!(hierarchy.children_of("root"), ["c2", "c1", "c3"]);
    }

    #[test]
    fn later_duplicate_wins() {
        let hierarchy = Hierarchy::build([
            EntityDecl::new("A").with_attributes(["old"]),
            EntityDecl::new("B").with_parent("A"),
            EntityDecl::new("A").with_attributes(["new"]).with_parent("B"),
        ])
        .unwrap();

        assert_eq!(hierarchy.len(), 2);
        assert_eq!(hierarchy.names().collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(hierarchy.attributes_of("A"), ["new"]);
        assert_eq!(hierarchy.children_of("A"), ["B"]);
        assert_eq!(hierarchy.children_of("B"), ["A"]);
    }

    #[test]
    fn malformed_entity_aborts_the_build() {
        let result = Hierarchy::build([EntityDecl::new("A"), EntityDecl::default()]);
        assert!(matches!(
            result,
            Err(HierarchyError::MalformedInput { ref location, .. }) if location == "entity #1"
        ));
    }

    #[test]
    fn unknown_names_have_no_attributes_or_children() {
        let hierarchy = build(&[("A", None)]);
        assert!(hierarchy.attributes_of("nope").is_empty());
        assert!(hierarchy.children_of("nope").is_empty());
        assert_eq!(hierarchy.depth("nope"), 0);
        assert!(hierarchy.inherited_attributes("nope").is_empty());
    }

    #[test]
    fn ancestors_terminate_on_cycles() {
        let hierarchy = build(&[("A", Some("C")), ("B", Some("A")), ("C", Some("B"))]);

        let chain: Vec<_> = hierarchy.ancestors("A").map(ConceptRecord::name).collect();
        assert_eq!(chain, ["C", "B"]);
        assert_eq!(hierarchy.depth("B"), 2);
        assert_eq!(hierarchy.roots().count(), 0);
    }

    #[test]
    fn self_parent_is_its_own_child_but_not_its_own_ancestor() {
        let hierarchy = build(&[("A", Some("A"))]);
        assert_eq!(hierarchy.children_of("A"), ["A"]);
        assert_eq!(hierarchy.ancestors("A").count(), 0);
    }

    #[test]
    fn inherited_attributes_walk_up_the_chain() {
        let hierarchy = Hierarchy::build([
            EntityDecl::new("entity").with_attributes(["id"]),
            EntityDecl::new("person")
                .with_parent("entity")
                .with_attributes(["name", "age"]),
            EntityDecl::new("teacher")
                .with_parent("person")
                .with_attributes(["subject"]),
        ])
        .unwrap();

        assert_eq!(
            hierarchy.inherited_attributes("teacher"),
            ["subject", "name", "age", "id"]
        );
        assert_eq!(hierarchy.depth("teacher"), 2);
        assert_eq!(
            hierarchy.roots().map(ConceptRecord::name).collect::<Vec<_>>(),
            ["entity"]
        );
    }

    #[test]
    fn serializes_as_name_keyed_map() {
        let hierarchy = Hierarchy::build([
            EntityDecl::new("A").with_description("root"),
            EntityDecl::new("B").with_parent("A").with_attributes(["x"]),
        ])
        .unwrap();

        let value = serde_json::to_value(&hierarchy).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "A": {"description": "root", "attributes": [], "parent": null, "children": ["B"]},
                "B": {"description": null, "attributes": ["x"], "parent": "A", "children": []},
            })
        );
    }
}
