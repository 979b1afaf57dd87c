pub mod graph;
pub mod index_data;
pub mod persistence;

pub use graph::{GraphStore, ReferenceGraph};
pub use index_data::IndexData;
pub use persistence::IndexPersistence;
