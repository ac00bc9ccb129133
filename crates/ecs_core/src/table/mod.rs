pub mod dense;
pub mod sparse_relation;

pub use dense::DenseTable;
pub use sparse_relation::{InsertOutcome, SparseRelationTable};
