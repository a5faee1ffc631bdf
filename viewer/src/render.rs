use std::{collections::HashSet, fmt::Write};

use anyhow::{anyhow, Result};
use mm_hierarchy::Hierarchy;

use crate::cli::Format;

pub fn render(hierarchy: &Hierarchy, format: Format) -> Result<String> {
    Ok(match format {
        Format::Tree => tree(hierarchy),
        Format::Dot => hierarchy.to_dot(),
        Format::Elements => serde_json::to_string_pretty(&hierarchy.to_elements())? + "\n",
        Format::Json => serde_json::to_string_pretty(hierarchy)? + "\n",
    })
}

/// One line per concept, indented below its parent, with its own attributes in brackets.
///
/// Concepts on a parent cycle have no root to hang from; they are listed afterwards, starting at
/// the first one of each cycle in hierarchy order.
pub fn tree(hierarchy: &Hierarchy) -> String {
    let mut out = String::new();
    let mut visited = HashSet::new();
    for root in hierarchy.roots() {
        write_subtree(hierarchy, root.name(), 0, &mut visited, &mut out);
    }
    for name in hierarchy.names() {
        if !visited.contains(name) {
            write_subtree(hierarchy, name, 0, &mut visited, &mut out);
        }
    }
    out
}

fn write_subtree<'h>(
    hierarchy: &'h Hierarchy,
    name: &'h str,
    depth: usize,
    visited: &mut HashSet<&'h str>,
    out: &mut String,
) {
    if !visited.insert(name) {
        return;
    }
    let indent = "  ".repeat(depth);
    let attributes = hierarchy.attributes_of(name);
    // Writing into a `String` can't fail.
    let _ = if attributes.is_empty() {
        writeln!(out, "{indent}{name}")
    } else {
        writeln!(out, "{indent}{name} [{}]", attributes.join(", "))
    };
    for child in hierarchy.children_of(name) {
        write_subtree(hierarchy, child, depth + 1, visited, out);
    }
}

/// Everything an inspector shows for one concept.
pub fn details(hierarchy: &Hierarchy, name: &str) -> Result<String> {
    let record = hierarchy
        .get(name)
        .ok_or_else(|| anyhow!("there is no role class named {name:?}"))?;
    let ancestors: Vec<_> = hierarchy.ancestors(name).map(|a| a.name()).collect();

    let mut out = String::new();
    let _ = writeln!(out, "{}", record.name());
    if let Some(description) = record.description() {
        let _ = writeln!(out, "  description: {description}");
    }
    if let Some(parent) = record.parent() {
        let suffix = if hierarchy.contains(parent) { "" } else { " (unresolved)" };
        let _ = writeln!(out, "  parent: {parent}{suffix}");
    }
    let _ = writeln!(out, "  attributes: {}", record.attributes().join(", "));
    let _ = writeln!(
        out,
        "  inherited attributes: {}",
        hierarchy.inherited_attributes(name).join(", ")
    );
    let _ = writeln!(out, "  children: {}", record.children().join(", "));
    let _ = writeln!(out, "  ancestors: {}", ancestors.join(", "));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use mm_hierarchy::EntityDecl;

    use super::*;

    fn machines() -> Hierarchy {
        Hierarchy::build([
            EntityDecl::new("Resource").with_attributes(["ID"]),
            EntityDecl::new("Robot")
                .with_parent("Resource")
                .with_attributes(["Payload", "Reach"]),
            EntityDecl::new("Conveyor").with_parent("Resource"),
            EntityDecl::new("Gripper").with_parent("Tool"),
        ])
        .unwrap()
    }

    #[test]
    fn tree_indents_children() {
        assert_eq!(
            tree(&machines()),
            "Resource [ID]\n  Robot [Payload, Reach]\n  Conveyor\nGripper\n"
        );
    }

    #[test]
    fn tree_lists_concepts_on_cycles() {
        let hierarchy = Hierarchy::build([
            EntityDecl::new("A").with_parent("B"),
            EntityDecl::new("B").with_parent("A"),
        ])
        .unwrap();
        assert_eq!(tree(&hierarchy), "A\n  B\n");
    }

    #[test]
    fn details_include_inherited_attributes() {
        let details = details(&machines(), "Robot").unwrap();
        assert!(details.contains("  attributes: Payload, Reach\n"));
        assert!(details.contains("  inherited attributes: Payload, Reach, ID\n"));
        assert!(details.contains("  ancestors: Resource\n"));

        let details = super::details(&machines(), "Gripper").unwrap();
        assert!(details.contains("  parent: Tool (unresolved)\n"));
    }

    #[test]
    fn unknown_node_is_an_error() {
        assert!(details(&machines(), "Drone").is_err());
    }

    #[test]
    fn json_is_keyed_by_name() {
        let json = render(&machines(), Format::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["Robot"]["parent"], "Resource");
        assert_eq!(value["Resource"]["children"][1], "Conveyor");
    }
}
