// src/recording/occurrence.rs
//! Raw occurrences delivered by the input source
//!
//! Events and DOM mutations arrive as one closed tagged union. The JSON
//! form uses the DOM event/mutation type names as the `kind` tag.

use crate::dom::NodeId;
use crate::utils::errors::{RecorderError, Result};
use serde::{Deserialize, Serialize};

/// Keyboard modifiers held during an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub alt: bool,
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        alt: false,
        shift: false,
        ctrl: false,
        meta: false,
    };

    /// Compact flag string, one character per active modifier in `ascm` order
    pub fn flags(&self) -> String {
        let mut flags = String::with_capacity(4);
        if self.alt {
            flags.push('a');
        }
        if self.shift {
            flags.push('s');
        }
        if self.ctrl {
            flags.push('c');
        }
        if self.meta {
            flags.push('m');
        }
        flags
    }
}

/// A raw input or structural change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Occurrence {
    #[serde(rename = "mousemove")]
    PointerMove {
        #[serde(default)]
        target: Option<NodeId>,
        page_x: i32,
        page_y: i32,
        #[serde(default)]
        modifiers: Modifiers,
    },

    #[serde(rename = "click")]
    Click {
        target: NodeId,
        page_x: i32,
        page_y: i32,
        #[serde(default)]
        button: u16,
        #[serde(default)]
        modifiers: Modifiers,
    },

    #[serde(rename = "dblclick")]
    DoubleClick {
        target: NodeId,
        page_x: i32,
        page_y: i32,
        #[serde(default)]
        button: u16,
        #[serde(default)]
        modifiers: Modifiers,
    },

    #[serde(rename = "change")]
    Change { target: NodeId },

    #[serde(rename = "keypress")]
    Keypress {
        target: NodeId,
        /// Printable character, when the source reports one
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        char_code: u32,
        #[serde(default)]
        modifiers: Modifiers,
    },

    #[serde(rename = "focus")]
    Focus { target: NodeId },

    #[serde(rename = "submit")]
    Submit { target: NodeId },

    #[serde(rename = "reset")]
    Reset { target: NodeId },

    /// Element scroll, or document scroll when the target is the root
    #[serde(rename = "scroll")]
    Scroll { target: NodeId },

    #[serde(rename = "resize")]
    Resize,

    #[serde(rename = "attributes")]
    AttributeMutation {
        target: NodeId,
        attribute_name: String,
    },

    /// Character data of a text node changed
    #[serde(rename = "characterData")]
    TextMutation { target: NodeId },

    #[serde(rename = "childList")]
    ChildListMutation {
        target: NodeId,
        #[serde(default)]
        previous_sibling: Option<NodeId>,
        #[serde(default)]
        added: Vec<NodeId>,
        #[serde(default)]
        removed: Vec<NodeId>,
    },

    /// Anything outside the recorded taxonomy
    #[serde(skip)]
    Unsupported { kind: String },
}

impl Occurrence {
    /// Parse one JSON occurrence, mapping unknown kinds to `Unsupported`
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let kind = value
            .get("kind")
            .and_then(|k| k.as_str())
            .map(str::to_string)
            .ok_or_else(|| RecorderError::DecodeFailed("occurrence without kind".to_string()))?;

        if OccurrenceKind::from_name(&kind).is_none() {
            return Ok(Occurrence::Unsupported { kind });
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Taxonomy kind, `None` for unsupported occurrences
    pub fn kind(&self) -> Option<OccurrenceKind> {
        Some(match self {
            Occurrence::PointerMove { .. } => OccurrenceKind::PointerMove,
            Occurrence::Click { .. } => OccurrenceKind::Click,
            Occurrence::DoubleClick { .. } => OccurrenceKind::DoubleClick,
            Occurrence::Change { .. } => OccurrenceKind::Change,
            Occurrence::Keypress { .. } => OccurrenceKind::Keypress,
            Occurrence::Focus { .. } => OccurrenceKind::Focus,
            Occurrence::Submit { .. } => OccurrenceKind::Submit,
            Occurrence::Reset { .. } => OccurrenceKind::Reset,
            Occurrence::Scroll { .. } => OccurrenceKind::Scroll,
            Occurrence::Resize => OccurrenceKind::Resize,
            Occurrence::AttributeMutation { .. } => OccurrenceKind::AttributeMutation,
            Occurrence::TextMutation { .. } => OccurrenceKind::TextMutation,
            Occurrence::ChildListMutation { .. } => OccurrenceKind::ChildListMutation,
            Occurrence::Unsupported { .. } => return None,
        })
    }

    /// Node the occurrence is attached to, if any
    pub fn target(&self) -> Option<NodeId> {
        match self {
            Occurrence::PointerMove { target, .. } => *target,
            Occurrence::Click { target, .. }
            | Occurrence::DoubleClick { target, .. }
            | Occurrence::Change { target }
            | Occurrence::Keypress { target, .. }
            | Occurrence::Focus { target }
            | Occurrence::Submit { target }
            | Occurrence::Reset { target }
            | Occurrence::Scroll { target }
            | Occurrence::AttributeMutation { target, .. }
            | Occurrence::TextMutation { target }
            | Occurrence::ChildListMutation { target, .. } => Some(*target),
            Occurrence::Resize | Occurrence::Unsupported { .. } => None,
        }
    }
}

/// Field-less mirror of the supported [`Occurrence`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OccurrenceKind {
    PointerMove,
    Click,
    DoubleClick,
    Change,
    Keypress,
    Focus,
    Submit,
    Reset,
    Scroll,
    Resize,
    AttributeMutation,
    TextMutation,
    ChildListMutation,
}

impl OccurrenceKind {
    pub const ALL: [OccurrenceKind; 13] = [
        OccurrenceKind::PointerMove,
        OccurrenceKind::Click,
        OccurrenceKind::DoubleClick,
        OccurrenceKind::Change,
        OccurrenceKind::Keypress,
        OccurrenceKind::Focus,
        OccurrenceKind::Submit,
        OccurrenceKind::Reset,
        OccurrenceKind::Scroll,
        OccurrenceKind::Resize,
        OccurrenceKind::AttributeMutation,
        OccurrenceKind::TextMutation,
        OccurrenceKind::ChildListMutation,
    ];

    /// DOM event or mutation type name
    pub fn name(&self) -> &'static str {
        match self {
            OccurrenceKind::PointerMove => "mousemove",
            OccurrenceKind::Click => "click",
            OccurrenceKind::DoubleClick => "dblclick",
            OccurrenceKind::Change => "change",
            OccurrenceKind::Keypress => "keypress",
            OccurrenceKind::Focus => "focus",
            OccurrenceKind::Submit => "submit",
            OccurrenceKind::Reset => "reset",
            OccurrenceKind::Scroll => "scroll",
            OccurrenceKind::Resize => "resize",
            OccurrenceKind::AttributeMutation => "attributes",
            OccurrenceKind::TextMutation => "characterData",
            OccurrenceKind::ChildListMutation => "childList",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            OccurrenceKind::AttributeMutation
                | OccurrenceKind::TextMutation
                | OccurrenceKind::ChildListMutation
        )
    }

    /// Output bucket for records of this kind
    ///
    /// Events use the first two characters of their name, so `reset` and
    /// `resize` share the `re` bucket.
    pub fn category_key(&self) -> CategoryKey {
        match self {
            OccurrenceKind::AttributeMutation => CategoryKey("mua"),
            OccurrenceKind::TextMutation => CategoryKey("mud"),
            OccurrenceKind::ChildListMutation => CategoryKey("mul"),
            event => CategoryKey(&event.name()[..2]),
        }
    }
}

/// Short stable key grouping records in the payload object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CategoryKey(&'static str);

impl CategoryKey {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}
