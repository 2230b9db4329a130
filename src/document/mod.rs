pub mod dom;
pub mod mutation;

pub use dom::Document;
pub use mutation::{MutationObserver, MutationRecord};
