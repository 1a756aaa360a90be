// src/dom/document.rs
//! Arena-backed document tree
//!
//! Nodes live in a flat vector and are addressed by [`NodeId`]. Removing a
//! node only detaches it, so a child-list mutation can still describe the
//! nodes it removed.

use crate::dom::{DomTree, FormState, NodeId, NodeType, Viewport};
use crate::utils::errors::{RecorderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, Default)]
struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
    checked: bool,
    selected: Vec<usize>,
    scroll: (f64, f64),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// In-memory document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    viewport: Viewport,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document (root node only)
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            viewport: Viewport::default(),
        }
    }

    /// Build a document from a serialized snapshot
    pub fn from_snapshot(snapshot: &DomSnapshot) -> Result<Self> {
        let mut document = Self::new();
        document.viewport = snapshot.viewport;

        let root = document.root();
        document.load_nodes(root, &snapshot.nodes)?;

        Ok(document)
    }

    fn load_nodes(&mut self, parent: NodeId, nodes: &[SnapshotNode]) -> Result<()> {
        let mut pending: Vec<(NodeId, &SnapshotNode)> =
            nodes.iter().rev().map(|node| (parent, node)).collect();

        while let Some((parent, snapshot)) = pending.pop() {
            let id = match snapshot {
                SnapshotNode::Element {
                    tag,
                    attributes,
                    children,
                    checked,
                    selected,
                } => {
                    let id = self.create_element(tag);
                    for (name, value) in attributes {
                        self.set_attribute(id, name, value)?;
                    }
                    self.set_checked(id, *checked)?;
                    self.set_selected(id, selected.clone())?;

                    pending.extend(children.iter().rev().map(|child| (id, child)));
                    id
                }
                SnapshotNode::Text { data } => self.create_text(data),
                SnapshotNode::Comment { data } => self.create_comment(data),
            };

            self.append_child(parent, id)?;
        }

        Ok(())
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| RecorderError::InvalidState(format!("unknown node {}", id.0)))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(data) => Ok(data),
            _ => Err(RecorderError::InvalidState(format!(
                "node {} is not an element",
                id.0
            ))),
        }
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, data: &str) -> NodeId {
        self.push(NodeKind::Text(data.to_string()))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, data: &str) -> NodeId {
        self.push(NodeKind::Comment(data.to_string()))
    }

    /// Create an element with attributes and append it to `parent`
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> Result<NodeId> {
        let id = self.create_element(tag);
        for (name, value) in attributes {
            self.set_attribute(id, name, value)?;
        }
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or last when `None`)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        if self.node(parent).is_none() || self.node(child).is_none() {
            return Err(RecorderError::InvalidState("unknown node".to_string()));
        }
        if self.contains(child, parent) {
            return Err(RecorderError::InvalidState(
                "cannot insert a node into its own subtree".to_string(),
            ));
        }
        if matches!(self.node(child).map(|n| &n.kind), Some(NodeKind::Document)) {
            return Err(RecorderError::InvalidState(
                "document node cannot be a child".to_string(),
            ));
        }

        self.detach(child)?;

        let position = match reference {
            Some(reference) => self
                .node(parent)
                .and_then(|p| p.children.iter().position(|c| *c == reference))
                .ok_or_else(|| {
                    RecorderError::InvalidState("reference is not a child of parent".to_string())
                })?,
            None => self.node(parent).map(|p| p.children.len()).unwrap_or(0),
        };

        self.node_mut(parent)?.children.insert(position, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Detach `child` from `parent`; the node stays addressable
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.parent(child) != Some(parent) {
            return Err(RecorderError::InvalidState(format!(
                "node {} is not a child of {}",
                child.0, parent.0
            )));
        }
        self.detach(child)
    }

    fn detach(&mut self, child: NodeId) -> Result<()> {
        if let Some(parent) = self.parent(child) {
            self.node_mut(parent)?.children.retain(|c| *c != child);
            self.node_mut(child)?.parent = None;
        }
        Ok(())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        let element = self.element_mut(id)?;
        let name = name.to_ascii_lowercase();
        match element.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => element.attributes.push((name, value.to_string())),
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>> {
        let element = self.element_mut(id)?;
        let name = name.to_ascii_lowercase();
        let position = element.attributes.iter().position(|(n, _)| *n == name);
        Ok(position.map(|i| element.attributes.remove(i).1))
    }

    /// Replace the data of a text or comment node
    pub fn set_text(&mut self, id: NodeId, data: &str) -> Result<()> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Text(text) | NodeKind::Comment(text) => {
                *text = data.to_string();
                Ok(())
            }
            _ => Err(RecorderError::InvalidState(format!(
                "node {} has no character data",
                id.0
            ))),
        }
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> Result<()> {
        self.element_mut(id)?.checked = checked;
        Ok(())
    }

    pub fn set_selected(&mut self, id: NodeId, selected: Vec<usize>) -> Result<()> {
        self.element_mut(id)?.selected = selected;
        Ok(())
    }

    /// Set an element's scroll position
    pub fn set_scroll(&mut self, id: NodeId, left: f64, top: f64) -> Result<()> {
        self.element_mut(id)?.scroll = (left, top);
        Ok(())
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let mut steps = vec![HtmlStep::Open(id)];

        while let Some(step) = steps.pop() {
            let id = match step {
                HtmlStep::Open(id) => id,
                HtmlStep::Close(id) => {
                    if let Some(element) = self.element(id) {
                        out.push_str("</");
                        out.push_str(&element.tag);
                        out.push('>');
                    }
                    continue;
                }
            };
            let Some(node) = self.node(id) else {
                continue;
            };

            match &node.kind {
                NodeKind::Document => {
                    steps.extend(node.children.iter().rev().map(|c| HtmlStep::Open(*c)));
                }
                NodeKind::Element(element) => {
                    out.push('<');
                    out.push_str(&element.tag);
                    for (name, value) in &element.attributes {
                        out.push(' ');
                        out.push_str(name);
                        out.push_str("=\"");
                        out.push_str(&escape(value, true));
                        out.push('"');
                    }
                    out.push('>');

                    if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                        continue;
                    }

                    steps.push(HtmlStep::Close(id));
                    steps.extend(node.children.iter().rev().map(|c| HtmlStep::Open(*c)));
                }
                NodeKind::Text(data) => out.push_str(&escape(data, false)),
                NodeKind::Comment(data) => {
                    out.push_str("<!--");
                    out.push_str(data);
                    out.push_str("-->");
                }
            }
        }
    }

    /// First node in document order under `id` (inclusive) matching `matches`
    fn find_preorder(&self, id: NodeId, mut matches: impl FnMut(NodeId) -> bool) -> Option<NodeId> {
        let mut stack = vec![id];

        while let Some(id) = stack.pop() {
            if matches(id) {
                return Some(id);
            }
            stack.extend(self.children(id).iter().rev());
        }

        None
    }
}

enum HtmlStep {
    Open(NodeId),
    Close(NodeId),
}

fn escape(value: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' if !attribute => escaped.push_str("&lt;"),
            '>' if !attribute => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl DomTree for Document {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.node(id).map(|node| match node.kind {
            NodeKind::Document => NodeType::Document,
            NodeKind::Element(_) => NodeType::Element,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::Comment(_) => NodeType::Comment,
        })
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let position = siblings.iter().position(|c| *c == id)?;
        position.checked_sub(1).map(|i| siblings[i])
    }

    fn node_name(&self, id: NodeId) -> Option<String> {
        Some(match &self.node(id)?.kind {
            NodeKind::Document => "#document".to_string(),
            NodeKind::Element(element) => element.tag.clone(),
            NodeKind::Text(_) => "#text".to_string(),
            NodeKind::Comment(_) => "#comment".to_string(),
        })
    }

    fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => Some(data),
            _ => None,
        }
    }

    fn outer_html(&self, id: NodeId) -> Option<String> {
        match &self.node(id)?.kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => Some(data.clone()),
            NodeKind::Element(_) => {
                let mut html = String::new();
                self.write_html(id, &mut html);
                Some(html)
            }
            NodeKind::Document => None,
        }
    }

    fn form_state(&self, id: NodeId) -> FormState {
        match self.element(id) {
            Some(element) => FormState {
                checked: element.checked,
                multiple: self.attribute(id, "multiple").is_some(),
                selected: element.selected.clone(),
            },
            None => FormState::default(),
        }
    }

    fn scroll_offset(&self, id: NodeId) -> (f64, f64) {
        self.element(id).map(|e| e.scroll).unwrap_or_default()
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }

        self.find_preorder(self.root(), |id| match selector.strip_prefix('#') {
            Some(wanted) => self.identifier(id) == Some(wanted),
            None => self
                .element(id)
                .map(|e| e.tag.eq_ignore_ascii_case(selector))
                .unwrap_or(false),
        })
    }
}

/// Serialized document used to seed a [`Document`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomSnapshot {
    #[serde(default)]
    pub viewport: Viewport,

    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,
}

/// One node of a [`DomSnapshot`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SnapshotNode {
    Element {
        tag: String,
        #[serde(default)]
        attributes: BTreeMap<String, String>,
        #[serde(default)]
        children: Vec<SnapshotNode>,
        #[serde(default)]
        checked: bool,
        #[serde(default)]
        selected: Vec<usize>,
    },
    Text {
        data: String,
    },
    Comment {
        data: String,
    },
}
