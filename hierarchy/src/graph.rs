use std::fmt::Write;

use serde::Serialize;

use super::concept::ConceptRecord;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GraphElement<'h> {
    Node { id: &'h str },
    Edge { source: &'h str, target: &'h str },
}

/// Lazy traversal yielding every node of a hierarchy, each followed by the edges to its
/// children.
///
/// A clone continues from the same position; call
/// [`Hierarchy::to_graph`](crate::Hierarchy::to_graph) again for a fresh traversal.
#[derive(Clone, Debug)]
pub struct Graph<'h> {
    records: std::slice::Iter<'h, ConceptRecord>,
    pending: Option<(&'h str, std::slice::Iter<'h, String>)>,
}

impl<'h> Graph<'h> {
    pub(crate) fn new(records: &'h [ConceptRecord]) -> Self {
        Self {
            records: records.iter(),
            pending: None,
        }
    }

    /// Consumes the remaining traversal into Graphviz source.
    pub fn to_dot(self) -> String {
        let mut dot = String::from("digraph concepts {\n");
        for element in self {
            // Writing into a `String` can't fail.
            let _ = match element {
                GraphElement::Node { id } => writeln!(dot, "  \"{}\";", escape(id)),
                GraphElement::Edge { source, target } => {
                    writeln!(dot, "  \"{}\" -> \"{}\";", escape(source), escape(target))
                }
            };
        }
        dot.push_str("}\n");
        dot
    }
}

impl<'h> Iterator for Graph<'h> {
    type Item = GraphElement<'h>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((source, children)) = self.pending.as_mut() {
            if let Some(target) = children.next() {
                return Some(GraphElement::Edge {
                    source: *source,
                    target: target.as_str(),
                });
            }
            self.pending = None;
        }

        let record = self.records.next()?;
        self.pending = Some((record.name(), record.children().iter()));
        Some(GraphElement::Node { id: record.name() })
    }
}

fn escape(id: &str) -> String {
    id.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A graph element as serialized for browser graph widgets: `{"data": {...}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Element<'h> {
    pub data: ElementData<'h>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ElementData<'h> {
    Node { id: &'h str, label: &'h str },
    Edge { source: &'h str, target: &'h str },
}

impl<'h> From<GraphElement<'h>> for Element<'h> {
    fn from(element: GraphElement<'h>) -> Self {
        let data = match element {
            GraphElement::Node { id } => ElementData::Node { id, label: id },
            GraphElement::Edge { source, target } => ElementData::Edge { source, target },
        };
        Self { data }
    }
}
