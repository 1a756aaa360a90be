// src/dom/mod.rs
//! Document tree access
//!
//! The recorder never holds on to nodes. It reads the current tree through
//! [`DomTree`] at the moment an occurrence is classified and keeps only the
//! derived strings and numbers.
//!
//! - **DomTree**: read-only view the classifier and resolver work against
//! - **Document**: arena-backed tree used by hosts and tests
//! - **Selector**: stable path strings addressing a node without an id

pub mod document;
pub mod selector;

use serde::{Deserialize, Serialize};

pub use document::{Document, DomSnapshot};
pub use selector::resolve;

/// Handle to a node inside a [`DomTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// DOM node types the recorder distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Document,
    Element,
    Text,
    Comment,
}

/// Window-level dimensions and scroll position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub inner_width: i32,
    pub inner_height: i32,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

/// Live form control state (properties, not attributes)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    /// `checked` property of checkbox-like inputs
    pub checked: bool,

    /// `multiple` flag of select elements
    pub multiple: bool,

    /// Indices of selected `<option>`s in document order
    pub selected: Vec<usize>,
}

impl FormState {
    /// `selectedIndex` semantics: first selected option or -1
    pub fn selected_index(&self) -> i64 {
        self.selected.first().map(|i| *i as i64).unwrap_or(-1)
    }
}

/// Read-only view of a live document
///
/// Every accessor returns `None`/defaults for unknown ids instead of
/// failing, so callers can treat missing payload as absent.
pub trait DomTree {
    /// The document node
    fn root(&self) -> NodeId;

    fn node_type(&self, id: NodeId) -> Option<NodeType>;

    fn parent(&self, id: NodeId) -> Option<NodeId>;

    fn previous_sibling(&self, id: NodeId) -> Option<NodeId>;

    /// Lowercase tag name for elements, `#text`, `#comment` or `#document`
    fn node_name(&self, id: NodeId) -> Option<String>;

    fn attribute(&self, id: NodeId, name: &str) -> Option<&str>;

    /// Character data of text and comment nodes
    fn text(&self, id: NodeId) -> Option<&str>;

    /// Serialized markup of an element, or the raw data of a character node
    fn outer_html(&self, id: NodeId) -> Option<String>;

    fn form_state(&self, id: NodeId) -> FormState;

    /// Element scroll position as (left, top)
    fn scroll_offset(&self, id: NodeId) -> (f64, f64);

    fn viewport(&self) -> Viewport;

    /// Resolve `#id` or a bare tag name to the first match in document order
    fn query_selector(&self, selector: &str) -> Option<NodeId>;

    /// Non-empty `id` attribute of an element
    fn identifier(&self, id: NodeId) -> Option<&str> {
        self.attribute(id, "id").filter(|value| !value.is_empty())
    }

    fn is_element(&self, id: NodeId) -> bool {
        self.node_type(id) == Some(NodeType::Element)
    }

    /// Whether `id` is `ancestor` or lies beneath it
    fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }
}
