pub mod filter;
pub mod term;

pub use filter::{AccessSet, QueryState};
pub use term::{Target, Term};
