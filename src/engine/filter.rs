//! Applies and reverses the recoloring transformation on a document.
//!
//! Qualifying text nodes are replaced by marker elements that hold the
//! colored spans plus the original text, so the transformation can be
//! undone without reparsing. When watching is on, any outside change to the
//! document triggers a full restore plus re-apply with the active settings;
//! a guard flag keeps the engine's own mutations out of that path.

use crate::document::dom::{self, Document, new_element, new_text};
use crate::document::{MutationObserver, MutationRecord};
use crate::engine::colorize::{Piece, colorize};
use crate::settings::{Color, Settings};
use markup5ever_rcdom::{Handle, NodeData};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Class naming marker elements; part of the reversal contract.
pub const MARKER_CLASS: &str = "stereo-reader-wrapper";
/// Attribute on marker elements holding the exact original text.
pub const ORIGINAL_TEXT_ATTR: &str = "data-original-text";

/// Engine state as reported back to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterStatus {
    Enabled,
    Disabled,
}

struct EngineState {
    enabled: bool,
    /// Settings in effect while enabled; what a resync re-applies with.
    active: Settings,
    /// Body `background-color` before apply. Outer None: nothing to restore.
    saved_background: Option<Option<String>>,
    watching: bool,
    /// Raised while the engine itself mutates the document.
    guard: bool,
}

pub struct FilterEngine {
    document: Rc<Document>,
    state: Rc<RefCell<EngineState>>,
    watch: bool,
}

impl FilterEngine {
    /// Creates the engine and registers its resync observer on the document.
    /// `watch` controls whether apply() starts reacting to outside mutations.
    pub fn new(document: Rc<Document>, watch: bool) -> Self {
        let state = Rc::new(RefCell::new(EngineState {
            enabled: false,
            active: Settings::default(),
            saved_background: None,
            watching: false,
            guard: false,
        }));
        document.observe(Rc::new(Resync {
            state: state.clone(),
        }));
        Self {
            document,
            state,
            watch,
        }
    }

    pub fn status(&self) -> FilterStatus {
        if self.state.borrow().enabled {
            FilterStatus::Enabled
        } else {
            FilterStatus::Disabled
        }
    }

    /// Colorize the document. Applying while already enabled is a no-op.
    pub fn apply(&self, settings: &Settings) -> FilterStatus {
        if self.state.borrow().enabled {
            return FilterStatus::Enabled;
        }
        apply_inner(&self.document, &self.state, settings);
        {
            let mut state = self.state.borrow_mut();
            state.enabled = true;
            state.active = settings.clone();
            state.watching = self.watch;
        }
        tracing::debug!(algorithm = %settings.algorithm, "filter applied");
        FilterStatus::Enabled
    }

    /// Restore the original content. Removing while disabled is a no-op.
    pub fn remove(&self) -> FilterStatus {
        if !self.state.borrow().enabled {
            return FilterStatus::Disabled;
        }
        self.state.borrow_mut().watching = false;
        remove_inner(&self.document, &self.state);
        self.state.borrow_mut().enabled = false;
        tracing::debug!("filter removed");
        FilterStatus::Disabled
    }

    /// Reconcile toward the desired state carried in `settings.enabled`.
    /// Re-sending while enabled re-applies with the new parameters.
    pub fn handle_toggle(&self, settings: &Settings) -> FilterStatus {
        if settings.enabled {
            if self.state.borrow().enabled {
                self.remove();
            }
            self.apply(settings)
        } else {
            self.remove()
        }
    }
}

/// Re-applies the transformation when the document changes out from under an
/// enabled engine. The guard flag filters out the engine's own mutations.
struct Resync {
    state: Rc<RefCell<EngineState>>,
}

impl MutationObserver for Resync {
    fn on_mutation(&self, document: &Document, record: &MutationRecord) {
        let settings = {
            let state = self.state.borrow();
            if !state.enabled || !state.watching || state.guard {
                return;
            }
            state.active.clone()
        };
        tracing::debug!(
            kind = ?record.kind,
            node = ?dom::element_name(&record.target),
            "document changed, recoloring"
        );
        remove_inner(document, &self.state);
        apply_inner(document, &self.state, &settings);
    }
}

/// Run `f` with the guard flag raised, restoring the previous value after.
/// Nesting happens when a resync runs inside an observer notification.
fn with_guard(state: &Rc<RefCell<EngineState>>, f: impl FnOnce()) {
    let previous = {
        let mut s = state.borrow_mut();
        std::mem::replace(&mut s.guard, true)
    };
    f();
    state.borrow_mut().guard = previous;
}

fn apply_inner(document: &Document, state: &Rc<RefCell<EngineState>>, settings: &Settings) {
    with_guard(state, || {
        let Some(body) = document.body() else {
            return;
        };
        if !settings.background.is_no_background() {
            let previous = set_background(&body, settings.background.as_str());
            state.borrow_mut().saved_background = Some(previous);
        }
        wrap_qualifying(document, &body, settings);
    });
}

fn remove_inner(document: &Document, state: &Rc<RefCell<EngineState>>) {
    with_guard(state, || {
        let saved = state.borrow_mut().saved_background.take();
        if let Some(previous) = saved {
            if let Some(body) = document.body() {
                restore_background(&body, previous);
            }
        }
        for marker in document.elements_with_class(MARKER_CLASS) {
            // A marker orphaned by an outside edit is skipped, not fatal.
            let Some(parent) = dom::parent_of(&marker) else {
                continue;
            };
            // One stripped of its original text is left in place; replacing
            // it would erase its content.
            let Some(original) = dom::get_attribute(&marker, ORIGINAL_TEXT_ATTR) else {
                continue;
            };
            document.replace_child(&parent, &marker, &new_text(&original));
        }
    });
}

/// Subtrees that never get recolored.
fn is_skipped_element(node: &Handle) -> bool {
    match dom::element_name(node).as_deref() {
        Some("script") | Some("style") | Some("noscript") => true,
        _ => dom::has_class(node, MARKER_CLASS),
    }
}

fn wrap_qualifying(document: &Document, node: &Handle, settings: &Settings) {
    match &node.data {
        NodeData::Element { .. } if is_skipped_element(node) => {}
        NodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            if text.trim().is_empty() {
                return;
            }
            // A text node detached by an earlier replacement has no parent;
            // skip it.
            let Some(parent) = dom::parent_of(node) else {
                return;
            };
            let marker = build_marker(&text, settings);
            document.replace_child(&parent, node, &marker);
        }
        _ => {
            // Children move while we recolor them; walk a snapshot.
            let children: Vec<Handle> = node.children.borrow().clone();
            for child in children {
                wrap_qualifying(document, &child, settings);
            }
        }
    }
}

/// `<span class="stereo-reader-wrapper" data-original-text="...">` holding
/// one colored span per unit, with word gaps as plain text nodes.
fn build_marker(text: &str, settings: &Settings) -> Handle {
    let marker = new_element("span", &[("class", MARKER_CLASS), (ORIGINAL_TEXT_ATTR, text)]);
    for piece in colorize(text, settings) {
        let child = match piece {
            Piece::Colored { text, color } => {
                let span = new_element("span", &[("style", &span_style(&color, settings))]);
                attach(&span, new_text(&text));
                span
            }
            Piece::Plain { text } => new_text(&text),
        };
        attach(&marker, child);
    }
    marker
}

fn span_style(color: &Color, settings: &Settings) -> String {
    if settings.text_scale != 100 {
        format!("color: {}; font-size: {}%;", color, settings.text_scale)
    } else {
        format!("color: {};", color)
    }
}

/// Wire a child into a detached node without firing mutation records;
/// construction of a marker subtree is not an observable document change.
fn attach(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

const BACKGROUND_PROP: &str = "background-color";

/// Paint the background, returning the previous `background-color`
/// declaration value (if any) for restoration.
fn set_background(body: &Handle, color: &str) -> Option<String> {
    let style = dom::get_attribute(body, "style").unwrap_or_default();
    let previous = style_get(&style, BACKGROUND_PROP);
    let updated = style_set(&style, BACKGROUND_PROP, color);
    dom::set_attribute(body, "style", &updated);
    previous
}

fn restore_background(body: &Handle, previous: Option<String>) {
    let style = dom::get_attribute(body, "style").unwrap_or_default();
    let updated = match previous {
        Some(value) => style_set(&style, BACKGROUND_PROP, &value),
        None => style_remove(&style, BACKGROUND_PROP),
    };
    if updated.is_empty() {
        dom::remove_attribute(body, "style");
    } else {
        dom::set_attribute(body, "style", &updated);
    }
}

/// Minimal inline-style handling: declarations split on `;`, names compared
/// case-insensitively, other declarations preserved.
fn style_get(style: &str, property: &str) -> Option<String> {
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        if name.trim().eq_ignore_ascii_case(property) {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

fn style_set(style: &str, property: &str, value: &str) -> String {
    let mut declarations: Vec<String> = style
        .split(';')
        .filter(|decl| !decl.trim().is_empty() && !declares(decl, property))
        .map(|decl| decl.trim().to_string())
        .collect();
    declarations.push(format!("{}: {}", property, value));
    declarations.join("; ")
}

fn style_remove(style: &str, property: &str) -> String {
    style
        .split(';')
        .filter(|decl| !decl.trim().is_empty() && !declares(decl, property))
        .map(|decl| decl.trim().to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn declares(decl: &str, property: &str) -> bool {
    decl.split_once(':')
        .map(|(name, _)| name.trim().eq_ignore_ascii_case(property))
        .unwrap_or(false)
}
