// src/recording/classifier.rs
//! Occurrence classification
//!
//! Maps each supported occurrence to its record, reading whatever element
//! state the record needs from the live tree at call time. Anything the
//! taxonomy does not cover yields `None`; nothing here fails.

use crate::dom::{resolve, DomTree, NodeId, NodeType};
use crate::recording::occurrence::{Occurrence, OccurrenceKind};
use crate::recording::record::{KeyValue, Record};
use crate::utils::config::ChangeInputPolicy;

/// Input types left out under [`ChangeInputPolicy::ExcludeText`]
const TEXT_INPUT_TYPES: &[&str] = &["text", "password"];

/// Stateless occurrence classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    change_policy: ChangeInputPolicy,
}

impl Classifier {
    pub fn new(change_policy: ChangeInputPolicy) -> Self {
        Self { change_policy }
    }

    pub fn change_policy(&self) -> ChangeInputPolicy {
        self.change_policy
    }

    /// Classify one occurrence observed `elapsed_ms` after session start
    pub fn classify<D: DomTree + ?Sized>(
        &self,
        dom: &D,
        occurrence: &Occurrence,
        elapsed_ms: u64,
    ) -> Option<Record> {
        let record = match occurrence {
            Occurrence::PointerMove {
                page_x,
                page_y,
                modifiers,
                ..
            } => Record::PointerMove {
                elapsed_ms,
                page_x: *page_x,
                page_y: *page_y,
                modifiers: modifiers.flags(),
            },

            Occurrence::Click {
                target,
                page_x,
                page_y,
                button,
                modifiers,
            }
            | Occurrence::DoubleClick {
                target,
                page_x,
                page_y,
                button,
                modifiers,
            } => Record::Click {
                double: matches!(occurrence, Occurrence::DoubleClick { .. }),
                elapsed_ms,
                selector: resolve(dom, *target),
                page_x: *page_x,
                page_y: *page_y,
                button: *button,
                modifiers: modifiers.flags(),
            },

            Occurrence::Change { target } => {
                return self.classify_change(dom, *target, elapsed_ms);
            }

            Occurrence::Keypress {
                target,
                key,
                char_code,
                modifiers,
            } => Record::Keypress {
                elapsed_ms,
                selector: resolve(dom, *target),
                key: match key.as_deref() {
                    Some(key) if !key.is_empty() => KeyValue::Char(key.to_string()),
                    _ => KeyValue::Code(*char_code),
                },
                modifiers: modifiers.flags(),
            },

            Occurrence::Focus { target } => {
                target_record(dom, OccurrenceKind::Focus, *target, elapsed_ms)
            }
            Occurrence::Submit { target } => {
                target_record(dom, OccurrenceKind::Submit, *target, elapsed_ms)
            }
            Occurrence::Reset { target } => {
                target_record(dom, OccurrenceKind::Reset, *target, elapsed_ms)
            }

            Occurrence::Scroll { target } => {
                if dom.node_type(*target) == Some(NodeType::Document) {
                    let viewport = dom.viewport();
                    Record::Scroll {
                        elapsed_ms,
                        selector: String::new(),
                        x: viewport.scroll_x,
                        y: viewport.scroll_y,
                    }
                } else {
                    let (left, top) = dom.scroll_offset(*target);
                    Record::Scroll {
                        elapsed_ms,
                        selector: resolve(dom, *target),
                        x: left,
                        y: top,
                    }
                }
            }

            Occurrence::Resize => {
                let viewport = dom.viewport();
                Record::Resize {
                    elapsed_ms,
                    width: viewport.inner_width,
                    height: viewport.inner_height,
                    top: viewport.scroll_y,
                    left: viewport.scroll_x,
                }
            }

            Occurrence::AttributeMutation {
                target,
                attribute_name,
            } => {
                let value = if attribute_name.eq_ignore_ascii_case("style") {
                    Some(dom.attribute(*target, "style").unwrap_or_default().to_string())
                } else {
                    dom.attribute(*target, attribute_name).map(str::to_string)
                };

                Record::Attribute {
                    elapsed_ms,
                    selector: resolve(dom, *target),
                    name: attribute_name.clone(),
                    value,
                }
            }

            Occurrence::TextMutation { target } => Record::CharacterData {
                elapsed_ms,
                selector: dom
                    .parent(*target)
                    .map(|parent| resolve(dom, parent))
                    .unwrap_or_default(),
                data: dom.text(*target).unwrap_or_default().to_string(),
            },

            Occurrence::ChildListMutation {
                target,
                previous_sibling,
                added,
                removed,
            } => Record::ChildList {
                elapsed_ms,
                selector: resolve(dom, *target),
                sibling_selector: previous_sibling
                    .map(|sibling| resolve(dom, sibling))
                    .unwrap_or_default(),
                added: added.iter().filter_map(|node| dom.outer_html(*node)).collect(),
                removed: removed.iter().filter_map(|node| dom.node_name(*node)).collect(),
            },

            Occurrence::Unsupported { .. } => return None,
        };

        Some(record)
    }

    fn classify_change<D: DomTree + ?Sized>(
        &self,
        dom: &D,
        target: NodeId,
        elapsed_ms: u64,
    ) -> Option<Record> {
        match dom.node_name(target)?.as_str() {
            "input" => {
                if self.change_policy == ChangeInputPolicy::ExcludeText {
                    let input_type = dom
                        .attribute(target, "type")
                        .unwrap_or("text")
                        .to_ascii_lowercase();
                    if TEXT_INPUT_TYPES.contains(&input_type.as_str()) {
                        return None;
                    }
                }

                Some(Record::CheckboxChange {
                    elapsed_ms,
                    selector: resolve(dom, target),
                    checked: dom.form_state(target).checked,
                })
            }
            "select" => {
                let state = dom.form_state(target);
                let selected = if state.multiple {
                    state.selected.iter().map(|i| *i as i64).collect()
                } else {
                    vec![state.selected_index()]
                };

                Some(Record::SelectChange {
                    elapsed_ms,
                    selector: resolve(dom, target),
                    selected,
                })
            }
            _ => None,
        }
    }
}

fn target_record<D: DomTree + ?Sized>(
    dom: &D,
    kind: OccurrenceKind,
    target: NodeId,
    elapsed_ms: u64,
) -> Record {
    Record::Target {
        kind,
        elapsed_ms,
        selector: resolve(dom, target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, Viewport};
    use crate::recording::occurrence::Modifiers;
    use serde_json::json;

    struct Fixture {
        doc: Document,
        body: NodeId,
        button: NodeId,
    }

    fn fixture() -> Fixture {
        let mut doc = Document::new();
        let root = doc.root();
        let html = doc.append_element(root, "html", &[]).unwrap();
        let body = doc.append_element(html, "body", &[]).unwrap();
        let button = doc.append_element(body, "button", &[("id", "foo")]).unwrap();
        doc.set_viewport(Viewport {
            inner_width: 1024,
            inner_height: 768,
            scroll_x: 5.0,
            scroll_y: 50.0,
        });
        Fixture { doc, body, button }
    }

    fn tuple(classifier: &Classifier, doc: &Document, occurrence: Occurrence) -> Vec<serde_json::Value> {
        classifier
            .classify(doc, &occurrence, 42)
            .expect("occurrence should classify")
            .to_tuple()
    }

    #[test]
    fn test_unsupported_is_dropped() {
        let f = fixture();
        let occurrence = Occurrence::Unsupported {
            kind: "mouseover".to_string(),
        };
        assert!(Classifier::default().classify(&f.doc, &occurrence, 1).is_none());
    }

    #[test]
    fn test_click_with_and_without_modifiers() {
        let f = fixture();
        let classifier = Classifier::default();

        let plain = Occurrence::Click {
            target: f.button,
            page_x: 3,
            page_y: 9,
            button: 1,
            modifiers: Modifiers::NONE,
        };
        assert_eq!(
            tuple(&classifier, &f.doc, plain),
            vec![json!(42), json!("#foo"), json!(3), json!(9), json!(1)]
        );

        let shifted = Occurrence::DoubleClick {
            target: f.button,
            page_x: 3,
            page_y: 9,
            button: 1,
            modifiers: Modifiers {
                shift: true,
                ..Default::default()
            },
        };
        let record = classifier.classify(&f.doc, &shifted, 42).unwrap();
        assert_eq!(record.kind(), OccurrenceKind::DoubleClick);
        let tuple = record.to_tuple();
        assert_eq!(tuple.len(), 6);
        assert_eq!(tuple[5], json!("s"));
    }

    #[test]
    fn test_pointer_move() {
        let f = fixture();
        let occurrence = Occurrence::PointerMove {
            target: None,
            page_x: 100,
            page_y: 200,
            modifiers: Modifiers {
                alt: true,
                ctrl: true,
                ..Default::default()
            },
        };
        assert_eq!(
            tuple(&Classifier::default(), &f.doc, occurrence),
            vec![json!(42), json!(100), json!(200), json!("ac")]
        );
    }

    #[test]
    fn test_change_on_text_input_depends_on_policy() {
        let mut f = fixture();
        let text = f.doc.append_element(f.body, "input", &[("type", "text"), ("id", "name")]).unwrap();
        let occurrence = Occurrence::Change { target: text };

        // Every input counts as checkbox-like unless configured otherwise
        let legacy = Classifier::new(ChangeInputPolicy::AnyInput);
        assert_eq!(
            tuple(&legacy, &f.doc, occurrence.clone()),
            vec![json!(42), json!("#name"), json!("0")]
        );

        let strict = Classifier::new(ChangeInputPolicy::ExcludeText);
        assert!(strict.classify(&f.doc, &occurrence, 42).is_none());

        let untyped = f.doc.append_element(f.body, "input", &[]).unwrap();
        assert!(strict
            .classify(&f.doc, &Occurrence::Change { target: untyped }, 42)
            .is_none());
    }

    #[test]
    fn test_change_on_checkbox() {
        let mut f = fixture();
        let checkbox = f
            .doc
            .append_element(f.body, "input", &[("type", "checkbox"), ("id", "agree")])
            .unwrap();
        f.doc.set_checked(checkbox, true).unwrap();

        for policy in [ChangeInputPolicy::AnyInput, ChangeInputPolicy::ExcludeText] {
            assert_eq!(
                tuple(&Classifier::new(policy), &f.doc, Occurrence::Change { target: checkbox }),
                vec![json!(42), json!("#agree"), json!("1")]
            );
        }
    }

    #[test]
    fn test_change_on_selects() {
        let mut f = fixture();
        let single = f.doc.append_element(f.body, "select", &[("id", "one")]).unwrap();
        f.doc.set_selected(single, vec![2]).unwrap();
        let multi = f
            .doc
            .append_element(f.body, "select", &[("id", "many"), ("multiple", "")])
            .unwrap();
        f.doc.set_selected(multi, vec![0, 3]).unwrap();
        let empty = f.doc.append_element(f.body, "select", &[("id", "none")]).unwrap();

        let classifier = Classifier::default();
        assert_eq!(
            tuple(&classifier, &f.doc, Occurrence::Change { target: single }),
            vec![json!(42), json!("#one"), json!([2])]
        );
        assert_eq!(
            tuple(&classifier, &f.doc, Occurrence::Change { target: multi }),
            vec![json!(42), json!("#many"), json!([0, 3])]
        );
        assert_eq!(
            tuple(&classifier, &f.doc, Occurrence::Change { target: empty }),
            vec![json!(42), json!("#none"), json!([-1])]
        );
    }

    #[test]
    fn test_change_on_other_elements_is_dropped() {
        let mut f = fixture();
        let area = f.doc.append_element(f.body, "textarea", &[]).unwrap();
        let classifier = Classifier::default();

        assert!(classifier.classify(&f.doc, &Occurrence::Change { target: area }, 1).is_none());
        assert!(classifier
            .classify(&f.doc, &Occurrence::Change { target: NodeId(999) }, 1)
            .is_none());
    }

    #[test]
    fn test_keypress() {
        let f = fixture();
        let classifier = Classifier::default();

        let with_key = Occurrence::Keypress {
            target: f.button,
            key: Some("x".to_string()),
            char_code: 120,
            modifiers: Modifiers::NONE,
        };
        assert_eq!(
            tuple(&classifier, &f.doc, with_key),
            vec![json!(42), json!("#foo"), json!("x"), json!("")]
        );

        let code_only = Occurrence::Keypress {
            target: f.button,
            key: None,
            char_code: 13,
            modifiers: Modifiers {
                ctrl: true,
                ..Default::default()
            },
        };
        assert_eq!(
            tuple(&classifier, &f.doc, code_only),
            vec![json!(42), json!("#foo"), json!(13), json!("c")]
        );
    }

    #[test]
    fn test_target_only_records() {
        let f = fixture();
        let classifier = Classifier::default();

        for occurrence in [
            Occurrence::Focus { target: f.button },
            Occurrence::Submit { target: f.button },
            Occurrence::Reset { target: f.button },
        ] {
            let record = classifier.classify(&f.doc, &occurrence, 42).unwrap();
            assert_eq!(Some(record.kind()), occurrence.kind());
            assert_eq!(record.to_tuple(), vec![json!(42), json!("#foo")]);
        }
    }

    #[test]
    fn test_scroll_document_and_element() {
        let mut f = fixture();
        let pane = f.doc.append_element(f.body, "div", &[("id", "pane")]).unwrap();
        f.doc.set_scroll(pane, 10.0, 120.0).unwrap();
        let classifier = Classifier::default();

        let root = f.doc.root();
        assert_eq!(
            tuple(&classifier, &f.doc, Occurrence::Scroll { target: root }),
            vec![json!(42), json!(""), json!(5), json!(50)]
        );
        assert_eq!(
            tuple(&classifier, &f.doc, Occurrence::Scroll { target: pane }),
            vec![json!(42), json!("#pane"), json!(10), json!(120)]
        );
    }

    #[test]
    fn test_resize() {
        let f = fixture();
        assert_eq!(
            tuple(&Classifier::default(), &f.doc, Occurrence::Resize),
            vec![json!(42), json!(""), json!(1024), json!(768), json!(50), json!(5)]
        );
    }

    #[test]
    fn test_attribute_mutation() {
        let mut f = fixture();
        f.doc.set_attribute(f.button, "style", "color: red; margin: 0").unwrap();
        f.doc.set_attribute(f.button, "title", "Go").unwrap();
        let classifier = Classifier::default();

        let style = Occurrence::AttributeMutation {
            target: f.button,
            attribute_name: "STYLE".to_string(),
        };
        assert_eq!(
            tuple(&classifier, &f.doc, style),
            vec![json!(42), json!("#foo"), json!("STYLE"), json!("color: red; margin: 0")]
        );

        let title = Occurrence::AttributeMutation {
            target: f.button,
            attribute_name: "title".to_string(),
        };
        assert_eq!(tuple(&classifier, &f.doc, title)[3], json!("Go"));

        let removed = Occurrence::AttributeMutation {
            target: f.button,
            attribute_name: "disabled".to_string(),
        };
        assert_eq!(tuple(&classifier, &f.doc, removed)[3], serde_json::Value::Null);
    }

    #[test]
    fn test_text_mutation_uses_parent_selector() {
        let mut f = fixture();
        let label = f.doc.append_element(f.body, "label", &[("id", "status")]).unwrap();
        let text = f.doc.create_text("saved");
        f.doc.append_child(label, text).unwrap();

        assert_eq!(
            tuple(&Classifier::default(), &f.doc, Occurrence::TextMutation { target: text }),
            vec![json!(42), json!("#status"), json!("saved")]
        );

        let detached = f.doc.create_text("orphan");
        assert_eq!(
            tuple(&Classifier::default(), &f.doc, Occurrence::TextMutation { target: detached }),
            vec![json!(42), json!(""), json!("orphan")]
        );
    }

    #[test]
    fn test_child_list_mutation() {
        let mut f = fixture();
        let root_el = f.doc.append_element(f.body, "section", &[("id", "root")]).unwrap();
        let old = f.doc.append_element(root_el, "div", &[]).unwrap();
        let added = f.doc.create_element("span");
        f.doc.append_child(root_el, added).unwrap();
        f.doc.remove_child(root_el, old).unwrap();

        let occurrence = Occurrence::ChildListMutation {
            target: root_el,
            previous_sibling: None,
            added: vec![added],
            removed: vec![old],
        };
        assert_eq!(
            tuple(&Classifier::default(), &f.doc, occurrence),
            vec![json!(42), json!("#root"), json!(""), json!(["<span></span>"]), json!(["div"])]
        );
    }

    #[test]
    fn test_child_list_with_sibling_and_text() {
        let mut f = fixture();
        let list = f.doc.append_element(f.body, "ul", &[("id", "items")]).unwrap();
        let first = f.doc.append_element(list, "li", &[("id", "first")]).unwrap();
        let text = f.doc.create_text("hello");
        f.doc.append_child(list, text).unwrap();
        let gone = f.doc.create_text("bye");

        let occurrence = Occurrence::ChildListMutation {
            target: list,
            previous_sibling: Some(first),
            added: vec![text],
            removed: vec![gone],
        };
        assert_eq!(
            tuple(&Classifier::default(), &f.doc, occurrence),
            vec![json!(42), json!("#items"), json!("#first"), json!(["hello"]), json!(["#text"])]
        );
    }
}
