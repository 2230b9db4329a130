pub mod panel;
pub mod pipe;
pub mod preview;
