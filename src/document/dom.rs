//! In-memory HTML document with mutation notification.
//!
//! Wraps an `RcDom` tree and funnels every structural edit through methods
//! that fire [`MutationRecord`]s, so a filter can keep itself consistent
//! when the document changes underneath it. Handles are `Rc`-based and
//! therefore thread-bound; everything here runs on one thread.

use crate::document::mutation::{MutationKind, MutationObserver, MutationRecord};
use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{Attribute, LocalName, ParseOpts, QualName, namespace_url, ns};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("serializing document failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialized document is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub struct Document {
    dom: RcDom,
    observers: RefCell<Vec<Rc<dyn MutationObserver>>>,
}

impl Document {
    /// Parse a full HTML document. The HTML5 tree builder always produces
    /// the `<html><head><body>` scaffolding, even for bare fragments.
    pub fn parse(input: &str) -> Self {
        let dom = html5ever::parse_document(RcDom::default(), ParseOpts::default()).one(input);
        Self {
            dom,
            observers: RefCell::new(Vec::new()),
        }
    }

    /// The `<body>` element, if the parse produced one.
    pub fn body(&self) -> Option<Handle> {
        let html = find_child_element(&self.dom.document, "html")?;
        find_child_element(&html, "body")
    }

    pub fn to_html(&self) -> Result<String, DocumentError> {
        let mut bytes = Vec::new();
        let handle: SerializableHandle = self.dom.document.clone().into();
        // The document node itself cannot be serialized; emit its children.
        let opts = SerializeOpts {
            traversal_scope: TraversalScope::ChildrenOnly(None),
            ..SerializeOpts::default()
        };
        serialize(&mut bytes, &handle, opts)?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Concatenation of every text node, in tree order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.dom.document, &mut out);
        out
    }

    /// Every element whose `class` attribute contains `class_name` as a
    /// whitespace-separated token, in tree order.
    pub fn elements_with_class(&self, class_name: &str) -> Vec<Handle> {
        let mut found = Vec::new();
        collect_with_class(&self.dom.document, class_name, &mut found);
        found
    }

    pub fn observe(&self, observer: Rc<dyn MutationObserver>) {
        self.observers.borrow_mut().push(observer);
    }

    /// Swap `old` for `new` under `parent`. Returns false (and fires
    /// nothing) when `old` is not currently a child of `parent`.
    pub fn replace_child(&self, parent: &Handle, old: &Handle, new: &Handle) -> bool {
        let replaced = {
            let mut children = parent.children.borrow_mut();
            match children.iter().position(|c| Rc::ptr_eq(c, old)) {
                Some(index) => {
                    old.parent.set(None);
                    new.parent.set(Some(Rc::downgrade(parent)));
                    children[index] = new.clone();
                    true
                }
                None => false,
            }
        };
        if replaced {
            self.notify(MutationRecord {
                kind: MutationKind::ChildList,
                target: parent.clone(),
            });
        }
        replaced
    }

    pub fn append_child(&self, parent: &Handle, child: &Handle) {
        {
            let mut children = parent.children.borrow_mut();
            child.parent.set(Some(Rc::downgrade(parent)));
            children.push(child.clone());
        }
        self.notify(MutationRecord {
            kind: MutationKind::ChildList,
            target: parent.clone(),
        });
    }

    pub fn remove_child(&self, parent: &Handle, child: &Handle) -> bool {
        let removed = {
            let mut children = parent.children.borrow_mut();
            match children.iter().position(|c| Rc::ptr_eq(c, child)) {
                Some(index) => {
                    child.parent.set(None);
                    children.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.notify(MutationRecord {
                kind: MutationKind::ChildList,
                target: parent.clone(),
            });
        }
        removed
    }

    /// Rewrite a text node in place. Returns false for non-text nodes.
    pub fn set_text(&self, node: &Handle, text: &str) -> bool {
        let changed = match &node.data {
            NodeData::Text { contents } => {
                *contents.borrow_mut() = StrTendril::from(text);
                true
            }
            _ => false,
        };
        if changed {
            self.notify(MutationRecord {
                kind: MutationKind::CharacterData,
                target: node.clone(),
            });
        }
        changed
    }

    /// Observers run synchronously on the mutating call stack, against a
    /// snapshot of the observer list, so an observer may itself mutate the
    /// document or register further observers.
    fn notify(&self, record: MutationRecord) {
        let observers: Vec<Rc<dyn MutationObserver>> = self.observers.borrow().clone();
        for observer in observers {
            observer.on_mutation(self, &record);
        }
    }
}

/// Build a detached HTML element with the given attributes.
pub fn new_element(name: &str, attributes: &[(&str, &str)]) -> Handle {
    let attrs = attributes
        .iter()
        .map(|(attr_name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*attr_name)),
            value: StrTendril::from(*value),
        })
        .collect();
    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(name)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

pub fn new_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from(text)),
    })
}

/// The parent node, if the node is attached to one.
pub fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    node.parent.set(weak.clone());
    weak.and_then(|w| w.upgrade())
}

/// Local tag name for element nodes.
pub fn element_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

pub fn text_of(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

pub fn get_attribute(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// Insert or overwrite an attribute. Attribute edits are not part of the
/// observed mutation set, so nothing is fired here.
pub fn set_attribute(node: &Handle, attr_name: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|attr| &*attr.name.local == attr_name) {
            Some(attr) => attr.value = StrTendril::from(value),
            None => attrs.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                value: StrTendril::from(value),
            }),
        }
    }
}

pub fn remove_attribute(node: &Handle, attr_name: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        attrs.borrow_mut().retain(|attr| &*attr.name.local != attr_name);
    }
}

pub fn has_class(node: &Handle, class_name: &str) -> bool {
    get_attribute(node, "class")
        .map(|classes| classes.split_whitespace().any(|c| c == class_name))
        .unwrap_or(false)
}

fn find_child_element(node: &Handle, name: &str) -> Option<Handle> {
    node.children
        .borrow()
        .iter()
        .find(|child| matches!(&child.data, NodeData::Element { name: n, .. } if &n.local == name))
        .cloned()
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

fn collect_with_class(node: &Handle, class_name: &str, found: &mut Vec<Handle>) {
    if matches!(&node.data, NodeData::Element { .. }) && has_class(node, class_name) {
        found.push(node.clone());
    }
    for child in node.children.borrow().iter() {
        collect_with_class(child, class_name, found);
    }
}
