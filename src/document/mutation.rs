//! Mutation observation types for in-memory documents.
//!
//! Mutators on [`Document`](crate::document::Document) fire one record per
//! structural or text change and deliver it synchronously, on the mutating
//! call stack. Attribute edits are outside the observed set.

use markup5ever_rcdom::Handle;

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// A child was added, removed, or replaced under the target.
    ChildList,
    /// The contents of the target text node changed in place.
    CharacterData,
}

/// One observed change. `target` is the parent for child-list changes and
/// the text node itself for character-data changes.
#[derive(Clone)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: Handle,
}

/// Synchronous observer callback. Implementations must tolerate being called
/// re-entrantly for mutations they cause themselves.
pub trait MutationObserver {
    fn on_mutation(&self, document: &crate::document::Document, record: &MutationRecord);
}
