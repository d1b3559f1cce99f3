pub mod builder;
pub mod compile;
pub mod sort;

pub use builder::{CompiledPredicates, PredicateBuilder, SqlValue};
pub use sort::{OrderBy, Page, QueryLimits};
