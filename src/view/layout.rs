//! Layout-tree parser for the view architecture XML dialect
//!
//! Turns `<form>`/`<tree>` layout documents into an ordered tree of
//! [`SectionNode`]s. Only `group`, `notebook`, `page`, `separator` and
//! `field` carry meaning; every other element is transparent and its
//! children are read as if they belonged to the parent.

use super::architecture::FieldDefinition;
use log::{debug, warn};
use roxmltree::{Document, Node};

/// Nesting deeper than this is not rendered
pub const MAX_SECTION_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Group,
    Notebook,
    Page,
    Separator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionNode {
    pub kind: SectionKind,
    pub title: Option<String>,
    /// Direct field references, in document order
    pub fields: Vec<String>,
    pub children: Vec<SectionNode>,
}

impl SectionNode {
    pub fn new(kind: SectionKind, title: Option<String>) -> Self {
        Self {
            kind,
            title,
            fields: Vec::new(),
            children: Vec::new(),
        }
    }

    /// All field names in this subtree, depth first
    pub fn collect_field_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.extend(self.fields.iter().map(String::as_str));
        for child in &self.children {
            child.collect_field_names(out);
        }
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(SectionNode::depth).max().unwrap_or(0)
    }
}

/// Result of parsing one layout document
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Ordered sections; root fields appear first as an untitled group
    pub sections: Vec<SectionNode>,
    /// Fields referenced outside any section, in document order
    pub root_fields: Vec<String>,
    /// True when the document had no group/page and every defined field
    /// was placed in one synthetic group
    pub fallback: bool,
}

impl Layout {
    pub fn field_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for section in &self.sections {
            section.collect_field_names(&mut names);
        }
        names
    }

    /// Columns for a list rendering: the fields the document names directly,
    /// or every defined field when it names none
    pub fn columns<'a>(&'a self, fields: &'a [FieldDefinition]) -> Vec<&'a str> {
        if self.root_fields.is_empty() {
            fields.iter().map(|f| f.name.as_str()).collect()
        } else {
            self.root_fields.iter().map(String::as_str).collect()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Group,
    Notebook,
    Page,
    Separator,
    Field,
    Other,
}

fn classify(node: &Node) -> Tag {
    match node.tag_name().name() {
        "group" => Tag::Group,
        "notebook" => Tag::Notebook,
        "page" => Tag::Page,
        "separator" => Tag::Separator,
        "field" => Tag::Field,
        _ => Tag::Other,
    }
}

fn title_of(node: &Node) -> Option<String> {
    node.attribute("string")
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

struct Walker<'a> {
    fields: &'a [FieldDefinition],
    found_container: bool,
    dropped: Vec<String>,
}

impl<'a> Walker<'a> {
    fn is_defined(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    fn push_field(&mut self, node: &Node, target: &mut Vec<String>) {
        let Some(name) = node.attribute("name") else {
            debug!("Skipping <field> without a name attribute");
            return;
        };
        if !self.is_defined(name) {
            self.dropped.push(name.to_string());
            return;
        }
        if !target.iter().any(|existing| existing == name) {
            target.push(name.to_string());
        }
    }

    fn walk(
        &mut self,
        node: Node,
        depth: usize,
        fields: &mut Vec<String>,
        sections: &mut Vec<SectionNode>,
    ) {
        for child in node.children().filter(Node::is_element) {
            match classify(&child) {
                Tag::Field => self.push_field(&child, fields),
                Tag::Group | Tag::Page => {
                    self.found_container = true;
                    if let Some(section) = self.section(child, depth) {
                        sections.push(section);
                    }
                }
                Tag::Notebook => {
                    if depth >= MAX_SECTION_DEPTH {
                        warn!("Layout nesting exceeds {} levels, skipping notebook", MAX_SECTION_DEPTH);
                        continue;
                    }
                    let mut notebook = SectionNode::new(SectionKind::Notebook, title_of(&child));
                    for page in child.children().filter(Node::is_element) {
                        if classify(&page) != Tag::Page {
                            debug!("Ignoring <{}> directly inside a notebook", page.tag_name().name());
                            continue;
                        }
                        self.found_container = true;
                        if let Some(section) = self.section(page, depth + 1) {
                            notebook.children.push(section);
                        }
                    }
                    sections.push(notebook);
                }
                Tag::Separator => {
                    sections.push(SectionNode::new(SectionKind::Separator, title_of(&child)));
                }
                Tag::Other => self.walk(child, depth, fields, sections),
            }
        }
    }

    fn section(&mut self, node: Node, depth: usize) -> Option<SectionNode> {
        if depth >= MAX_SECTION_DEPTH {
            warn!("Layout nesting exceeds {} levels, skipping section", MAX_SECTION_DEPTH);
            return None;
        }
        let kind = match classify(&node) {
            Tag::Page => SectionKind::Page,
            _ => SectionKind::Group,
        };
        let mut section = SectionNode::new(kind, title_of(&node));
        let mut fields = Vec::new();
        let mut children = Vec::new();
        self.walk(node, depth + 1, &mut fields, &mut children);
        section.fields = fields;
        section.children = children;
        Some(section)
    }
}

fn synthetic_group(fields: &[FieldDefinition]) -> SectionNode {
    let mut group = SectionNode::new(SectionKind::Group, None);
    group.fields = fields.iter().map(|f| f.name.clone()).collect();
    group
}

/// Parse a layout document against the field definitions of the same view.
///
/// Never fails: references to undefined fields are dropped, unknown tags are
/// skipped, and a document that cannot be parsed or has no group/page falls
/// back to a single group holding every defined field.
pub fn parse_layout(xml: &str, fields: &[FieldDefinition]) -> Layout {
    let doc = match Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Failed to parse layout XML, using field list instead: {}", e);
            return Layout {
                sections: vec![synthetic_group(fields)],
                root_fields: Vec::new(),
                fallback: true,
            };
        }
    };

    let mut walker = Walker {
        fields,
        found_container: false,
        dropped: Vec::new(),
    };
    let mut root_fields = Vec::new();
    let mut sections = Vec::new();
    walker.walk(doc.root(), 0, &mut root_fields, &mut sections);

    if !walker.dropped.is_empty() {
        warn!(
            "Layout references undefined field(s), dropped: {}",
            walker.dropped.join(", ")
        );
    }

    if !walker.found_container {
        debug!("Layout has no group or page, synthesizing a single group");
        return Layout {
            sections: vec![synthetic_group(fields)],
            root_fields,
            fallback: true,
        };
    }

    if !root_fields.is_empty() {
        let mut implicit = SectionNode::new(SectionKind::Group, None);
        implicit.fields = root_fields.clone();
        sections.insert(0, implicit);
    }

    Layout {
        sections,
        root_fields,
        fallback: false,
    }
}
