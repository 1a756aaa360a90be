// src/dom/selector.rs
//! Selector resolution
//!
//! Derives a readable path for a node from the current tree shape:
//!
//! ```text
//! <div id="a"></div><span></span>         span  → "#a+span"
//! <main id="root"><p><b></b></p></main>   b     → "#root>p>b"
//! <html><body><i></i><u></u></body>       u     → "html>body>i+u"
//! ```
//!
//! The result is recomputed on every call. Nothing is cached because the
//! tree may change between two occurrences.

use crate::dom::{DomTree, NodeId, NodeType};

/// Resolve a path string for `node`
///
/// Unknown nodes and the document node resolve to an empty string.
pub fn resolve<D: DomTree + ?Sized>(dom: &D, node: NodeId) -> String {
    if let Some(identifier) = dom.identifier(node) {
        return format!("#{}", identifier);
    }

    // Collected inner-to-outer, reversed on join
    let mut siblings = Vec::new();
    if dom.is_element(node) {
        siblings.extend(dom.node_name(node));
    }

    let mut sibling = dom.previous_sibling(node);
    while let Some(current) = sibling {
        if let Some(identifier) = dom.identifier(current) {
            return format!("#{}+{}", identifier, join_siblings(siblings));
        }
        if dom.is_element(current) {
            siblings.extend(dom.node_name(current));
        }
        sibling = dom.previous_sibling(current);
    }

    let mut parents = Vec::new();
    let mut parent = dom.parent(node);
    while let Some(current) = parent {
        if let Some(identifier) = dom.identifier(current) {
            return format!(
                "#{}>{}{}",
                identifier,
                join_parents(parents),
                join_siblings(siblings)
            );
        }
        if dom.node_type(current) == Some(NodeType::Document) {
            break;
        }
        if dom.is_element(current) {
            parents.extend(dom.node_name(current));
        }
        parent = dom.parent(current);
    }

    format!("{}{}", join_parents(parents), join_siblings(siblings))
}

fn join_siblings(mut siblings: Vec<String>) -> String {
    siblings.reverse();
    siblings.join("+")
}

fn join_parents(mut parents: Vec<String>) -> String {
    if parents.is_empty() {
        return String::new();
    }
    parents.reverse();
    format!("{}>", parents.join(">"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use proptest::prelude::*;

    #[test]
    fn test_node_with_identifier() {
        let mut doc = Document::new();
        let root = doc.root();
        let node = doc.append_element(root, "div", &[("id", "foo")]).unwrap();

        assert_eq!(resolve(&doc, node), "#foo");
    }

    #[test]
    fn test_empty_identifier_is_ignored() {
        let mut doc = Document::new();
        let root = doc.root();
        let node = doc.append_element(root, "div", &[("id", "")]).unwrap();

        assert_eq!(resolve(&doc, node), "div");
    }

    #[test]
    fn test_identified_previous_sibling() {
        let mut doc = Document::new();
        let root = doc.root();
        let body = doc.append_element(root, "body", &[]).unwrap();
        doc.append_element(body, "div", &[("id", "nav")]).unwrap();
        doc.append_element(body, "p", &[]).unwrap();
        let text = doc.create_text("\n");
        doc.append_child(body, text).unwrap();
        let target = doc.append_element(body, "span", &[]).unwrap();

        assert_eq!(resolve(&doc, target), "#nav+p+span");
    }

    #[test]
    fn test_identified_ancestor() {
        let mut doc = Document::new();
        let root = doc.root();
        let main = doc.append_element(root, "main", &[("id", "root")]).unwrap();
        let section = doc.append_element(main, "section", &[]).unwrap();
        let para = doc.append_element(section, "p", &[]).unwrap();
        doc.append_element(para, "i", &[]).unwrap();
        let bold = doc.append_element(para, "b", &[]).unwrap();

        assert_eq!(resolve(&doc, bold), "#root>section>p>i+b");
    }

    #[test]
    fn test_direct_child_of_identified_ancestor() {
        let mut doc = Document::new();
        let root = doc.root();
        let main = doc.append_element(root, "main", &[("id", "root")]).unwrap();
        let span = doc.append_element(main, "span", &[]).unwrap();

        assert_eq!(resolve(&doc, span), "#root>span");
    }

    #[test]
    fn test_no_identifiers_anywhere() {
        let mut doc = Document::new();
        let root = doc.root();
        let html = doc.append_element(root, "html", &[]).unwrap();
        let body = doc.append_element(html, "body", &[]).unwrap();
        doc.append_element(body, "div", &[]).unwrap();
        let span = doc.append_element(body, "span", &[]).unwrap();

        assert_eq!(resolve(&doc, span), "html>body>div+span");
        assert_eq!(resolve(&doc, html), "html");
    }

    #[test]
    fn test_document_and_unknown_nodes() {
        let doc = Document::new();
        assert_eq!(resolve(&doc, doc.root()), "");
        assert_eq!(resolve(&doc, NodeId(42)), "");
    }

    #[test]
    fn test_resolution_follows_structure_changes() {
        let mut doc = Document::new();
        let root = doc.root();
        let body = doc.append_element(root, "body", &[]).unwrap();
        let target = doc.append_element(body, "span", &[]).unwrap();
        assert_eq!(resolve(&doc, target), "body>span");

        let anchor = doc.create_element("div");
        doc.set_attribute(anchor, "id", "anchor").unwrap();
        doc.insert_before(body, anchor, Some(target)).unwrap();
        assert_eq!(resolve(&doc, target), "#anchor+span");
    }

    fn build_tree(shape: &[(usize, usize, bool)]) -> (Document, Vec<NodeId>) {
        const TAGS: &[&str] = &["div", "span", "p", "ul", "li"];

        let mut doc = Document::new();
        let mut nodes = vec![doc.root()];
        for (i, (parent, tag, with_id)) in shape.iter().enumerate() {
            let parent = nodes[parent % nodes.len()];
            let id = format!("n{}", i);
            let attributes: Vec<(&str, &str)> = if *with_id {
                vec![("id", id.as_str())]
            } else {
                vec![]
            };
            let node = doc
                .append_element(parent, TAGS[tag % TAGS.len()], &attributes)
                .unwrap();
            nodes.push(node);
        }
        (doc, nodes)
    }

    proptest! {
        #[test]
        fn test_resolve_is_idempotent(
            shape in prop::collection::vec((0usize..64, 0usize..5, prop::bool::weighted(0.2)), 1..40)
        ) {
            let (doc, nodes) = build_tree(&shape);
            for node in nodes {
                prop_assert_eq!(resolve(&doc, node), resolve(&doc, node));
            }
        }

        #[test]
        fn test_identified_nodes_resolve_to_identifier(
            shape in prop::collection::vec((0usize..64, 0usize..5, any::<bool>()), 1..40)
        ) {
            let (doc, nodes) = build_tree(&shape);
            for node in nodes {
                if let Some(identifier) = doc.identifier(node) {
                    prop_assert_eq!(resolve(&doc, node), format!("#{}", identifier));
                }
            }
        }
    }
}
