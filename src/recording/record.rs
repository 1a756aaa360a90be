// src/recording/record.rs
//! Classified records and their wire tuples
//!
//! Each record serializes to a fixed-order array. Only the trailing
//! modifier field of pointer records is optional; it is left out rather
//! than padded when no modifier is held.

use crate::recording::occurrence::OccurrenceKind;
use serde_json::{json, Value};

/// Character reported by a keypress
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    Char(String),
    Code(u32),
}

impl KeyValue {
    fn to_value(&self) -> Value {
        match self {
            KeyValue::Char(c) => json!(c),
            KeyValue::Code(code) => json!(code),
        }
    }
}

/// A classified occurrence
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    PointerMove {
        elapsed_ms: u64,
        page_x: i32,
        page_y: i32,
        modifiers: String,
    },

    /// `click` or `dblclick`
    Click {
        double: bool,
        elapsed_ms: u64,
        selector: String,
        page_x: i32,
        page_y: i32,
        button: u16,
        modifiers: String,
    },

    CheckboxChange {
        elapsed_ms: u64,
        selector: String,
        checked: bool,
    },

    SelectChange {
        elapsed_ms: u64,
        selector: String,
        selected: Vec<i64>,
    },

    Keypress {
        elapsed_ms: u64,
        selector: String,
        key: KeyValue,
        modifiers: String,
    },

    /// `focus`, `submit` or `reset`: just the target
    Target {
        kind: OccurrenceKind,
        elapsed_ms: u64,
        selector: String,
    },

    Scroll {
        elapsed_ms: u64,
        selector: String,
        x: f64,
        y: f64,
    },

    Resize {
        elapsed_ms: u64,
        width: i32,
        height: i32,
        top: f64,
        left: f64,
    },

    Attribute {
        elapsed_ms: u64,
        selector: String,
        name: String,
        /// `None` once the attribute has been removed
        value: Option<String>,
    },

    CharacterData {
        elapsed_ms: u64,
        selector: String,
        data: String,
    },

    ChildList {
        elapsed_ms: u64,
        selector: String,
        sibling_selector: String,
        added: Vec<String>,
        removed: Vec<String>,
    },
}

impl Record {
    /// Kind of occurrence this record was classified from
    pub fn kind(&self) -> OccurrenceKind {
        match self {
            Record::PointerMove { .. } => OccurrenceKind::PointerMove,
            Record::Click { double: false, .. } => OccurrenceKind::Click,
            Record::Click { double: true, .. } => OccurrenceKind::DoubleClick,
            Record::CheckboxChange { .. } | Record::SelectChange { .. } => OccurrenceKind::Change,
            Record::Keypress { .. } => OccurrenceKind::Keypress,
            Record::Target { kind, .. } => *kind,
            Record::Scroll { .. } => OccurrenceKind::Scroll,
            Record::Resize { .. } => OccurrenceKind::Resize,
            Record::Attribute { .. } => OccurrenceKind::AttributeMutation,
            Record::CharacterData { .. } => OccurrenceKind::TextMutation,
            Record::ChildList { .. } => OccurrenceKind::ChildListMutation,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        match self {
            Record::PointerMove { elapsed_ms, .. }
            | Record::Click { elapsed_ms, .. }
            | Record::CheckboxChange { elapsed_ms, .. }
            | Record::SelectChange { elapsed_ms, .. }
            | Record::Keypress { elapsed_ms, .. }
            | Record::Target { elapsed_ms, .. }
            | Record::Scroll { elapsed_ms, .. }
            | Record::Resize { elapsed_ms, .. }
            | Record::Attribute { elapsed_ms, .. }
            | Record::CharacterData { elapsed_ms, .. }
            | Record::ChildList { elapsed_ms, .. } => *elapsed_ms,
        }
    }

    /// Selector of the addressed node; viewport-level records have none
    pub fn selector(&self) -> Option<&str> {
        match self {
            Record::PointerMove { .. } | Record::Resize { .. } => None,
            Record::Click { selector, .. }
            | Record::CheckboxChange { selector, .. }
            | Record::SelectChange { selector, .. }
            | Record::Keypress { selector, .. }
            | Record::Target { selector, .. }
            | Record::Scroll { selector, .. }
            | Record::Attribute { selector, .. }
            | Record::CharacterData { selector, .. }
            | Record::ChildList { selector, .. } => Some(selector),
        }
    }

    /// Fixed-order wire tuple
    pub fn to_tuple(&self) -> Vec<Value> {
        match self {
            Record::PointerMove {
                elapsed_ms,
                page_x,
                page_y,
                modifiers,
            } => with_modifiers(vec![json!(elapsed_ms), json!(page_x), json!(page_y)], modifiers),
            Record::Click {
                elapsed_ms,
                selector,
                page_x,
                page_y,
                button,
                modifiers,
                ..
            } => with_modifiers(
                vec![
                    json!(elapsed_ms),
                    json!(selector),
                    json!(page_x),
                    json!(page_y),
                    json!(button),
                ],
                modifiers,
            ),
            Record::CheckboxChange {
                elapsed_ms,
                selector,
                checked,
            } => vec![
                json!(elapsed_ms),
                json!(selector),
                json!(checkbox_flag(*checked)),
            ],
            Record::SelectChange {
                elapsed_ms,
                selector,
                selected,
            } => vec![json!(elapsed_ms), json!(selector), json!(selected)],
            Record::Keypress {
                elapsed_ms,
                selector,
                key,
                modifiers,
            } => vec![
                json!(elapsed_ms),
                json!(selector),
                key.to_value(),
                json!(modifiers),
            ],
            Record::Target {
                elapsed_ms,
                selector,
                ..
            } => vec![json!(elapsed_ms), json!(selector)],
            Record::Scroll {
                elapsed_ms,
                selector,
                x,
                y,
            } => vec![json!(elapsed_ms), json!(selector), position(*x), position(*y)],
            Record::Resize {
                elapsed_ms,
                width,
                height,
                top,
                left,
            } => vec![
                json!(elapsed_ms),
                json!(""),
                json!(width),
                json!(height),
                position(*top),
                position(*left),
            ],
            Record::Attribute {
                elapsed_ms,
                selector,
                name,
                value,
            } => vec![json!(elapsed_ms), json!(selector), json!(name), json!(value)],
            Record::CharacterData {
                elapsed_ms,
                selector,
                data,
            } => vec![json!(elapsed_ms), json!(selector), json!(data)],
            Record::ChildList {
                elapsed_ms,
                selector,
                sibling_selector,
                added,
                removed,
            } => vec![
                json!(elapsed_ms),
                json!(selector),
                json!(sibling_selector),
                json!(added),
                json!(removed),
            ],
        }
    }
}

fn checkbox_flag(checked: bool) -> &'static str {
    if checked {
        "1"
    } else {
        "0"
    }
}

/// Whole offsets serialize as integers, fractional ones as floats
fn position(value: f64) -> Value {
    const EXACT: f64 = 9_007_199_254_740_992.0;

    if value.fract() == 0.0 && value.abs() < EXACT {
        json!(value as i64)
    } else {
        json!(value)
    }
}

fn with_modifiers(mut tuple: Vec<Value>, modifiers: &str) -> Vec<Value> {
    if !modifiers.is_empty() {
        tuple.push(json!(modifiers));
    }
    tuple
}
