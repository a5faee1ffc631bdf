//! Reader for the RoleClass libraries of CAEX (AutomationML) documents.
//!
//! Only the parts needed for a concept hierarchy are read: library and class names, the
//! `RefBaseClassPath` inheritance reference, attribute names and descriptions.

use roxmltree::{Document, Node};
use tracing::debug;

use super::{concept::EntityDecl, error::HierarchyError, hierarchy::Hierarchy};

pub const CAEX_NAMESPACE: &str = "http://www.dke.de/CAEX";

/// Separator of the path segments in `RefBaseClassPath`, e.g. `Lib/Base/Derived`.
const PATH_SEPARATOR: char = '/';

pub fn parse_document(source: &str, allow_dtd: bool) -> Result<Document<'_>, HierarchyError> {
    let options = roxmltree::ParsingOptions {
        allow_dtd,
        ..Default::default()
    };
    Ok(Document::parse_with_options(source, options)?)
}

fn is_caex_element(node: Node, tag_name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == tag_name
        && node.tag_name().namespace() == Some(CAEX_NAMESPACE)
}

fn location(node: Node) -> String {
    let pos = node.document().text_pos_at(node.range().start);
    format!("line {}, column {}", pos.row, pos.col)
}

/// A `RoleClass` element; it becomes one entity of its library's hierarchy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleClass {
    pub name: String,
    /// The full `RefBaseClassPath` value, if present.
    pub base_class_path: Option<String>,
    pub attributes: Vec<String>,
    pub description: Option<String>,
}

impl RoleClass {
    pub const TAG_NAME: &'static str = "RoleClass";

    pub(crate) fn map_from_xml(role_class: Node) -> Result<Self, HierarchyError> {
        assert_eq!(role_class.tag_name().name(), Self::TAG_NAME);

        let name = role_class
            .attribute("Name")
            .ok_or_else(|| {
                HierarchyError::malformed(location(role_class), "RoleClass without a Name")
            })?
            .to_owned();

        let base_class_path = role_class
            .attribute("RefBaseClassPath")
            .filter(|path| !path.is_empty())
            .map(str::to_owned);

        let mut attributes = Vec::new();
        collect_attribute_names(role_class, &mut attributes);

        let description = role_class
            .children()
            .find(|child| is_caex_element(*child, "Description"))
            .and_then(|child| child.text())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_owned);

        Ok(Self {
            name,
            base_class_path,
            attributes,
            description,
        })
    }

    /// The name of the base class: the last segment of `RefBaseClassPath`.
    pub fn parent(&self) -> Option<&str> {
        self.base_class_path
            .as_deref()
            .and_then(|path| path.rsplit(PATH_SEPARATOR).next())
            .filter(|segment| !segment.is_empty())
    }

    pub fn to_entity(&self) -> EntityDecl {
        EntityDecl {
            name: Some(self.name.clone()),
            parent: self.parent().map(str::to_owned),
            attributes: self.attributes.clone(),
            description: self.description.clone(),
        }
    }
}

/// Collects the names of all `Attribute` elements below `node`, including nested attributes, in
/// document order.
///
/// Unlike a plain descendant search (`.//Attribute`), the walk doesn't enter nested `RoleClass`
/// elements: a class isn't credited with the attributes of the classes declared inside it. Those
/// report their own attributes, and the inheritance link is kept through `RefBaseClassPath`.
fn collect_attribute_names(node: Node, names: &mut Vec<String>) {
    for child in node.children().filter(Node::is_element) {
        if is_caex_element(child, RoleClass::TAG_NAME) {
            continue;
        }
        if is_caex_element(child, "Attribute") {
            if let Some(name) = child.attribute("Name") {
                names.push(name.to_owned());
            }
        }
        collect_attribute_names(child, names);
    }
}

/// A `RoleClassLib` element with its role classes and the hierarchy built from them.
#[derive(Clone, Debug)]
pub struct RoleClassLib {
    pub name: String,
    pub version: Option<String>,
    pub role_classes: Vec<RoleClass>,
    pub hierarchy: Hierarchy,
}

impl RoleClassLib {
    pub const TAG_NAME: &'static str = "RoleClassLib";

    pub(crate) fn map_from_xml(library: Node) -> Result<Self, HierarchyError> {
        assert_eq!(library.tag_name().name(), Self::TAG_NAME);

        let name = library
            .attribute("Name")
            .ok_or_else(|| {
                HierarchyError::malformed(location(library), "RoleClassLib without a Name")
            })?
            .to_owned();

        let version = library
            .children()
            .find(|child| is_caex_element(*child, "Version"))
            .and_then(|child| child.text())
            .map(|text| text.trim().to_owned());

        let role_classes = library
            .descendants()
            .filter(|node| is_caex_element(*node, RoleClass::TAG_NAME))
            .map(RoleClass::map_from_xml)
            .collect::<Result<Vec<_>, _>>()?;

        let hierarchy = Hierarchy::build(role_classes.iter().map(RoleClass::to_entity))?;

        debug!(
            library = name.as_str(),
            role_classes = role_classes.len(),
            "read RoleClass library"
        );

        Ok(Self {
            name,
            version,
            role_classes,
            hierarchy,
        })
    }

    pub fn role_class(&self, name: &str) -> Option<&RoleClass> {
        // Later declarations win, as in the hierarchy.
        self.role_classes.iter().rev().find(|rc| rc.name == name)
    }
}

/// Reads every `RoleClassLib` of the document, in document order.
///
/// Libraries may appear anywhere in the document. A library whose name was already used
/// replaces the earlier one at the earlier position.
pub fn read_roleclass_libs(document: &Document) -> Result<Vec<RoleClassLib>, HierarchyError> {
    let mut libraries: Vec<RoleClassLib> = Vec::new();
    for node in document
        .descendants()
        .filter(|node| is_caex_element(*node, RoleClassLib::TAG_NAME))
    {
        let library = RoleClassLib::map_from_xml(node)?;
        match libraries.iter_mut().find(|l| l.name == library.name) {
            Some(existing) => {
                debug!(library = library.name.as_str(), "duplicate library name");
                *existing = library;
            }
            None => libraries.push(library),
        }
    }
    Ok(libraries)
}
