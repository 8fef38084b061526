pub mod document;
pub mod xml;

pub use document::{outline_is_empty, PageDocument, UpdateStamp};
pub use xml::{Element, Node};
