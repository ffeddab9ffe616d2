mod filter;
mod limit;
mod project;
mod sort;

pub use filter::Filter;
pub use limit::Limit;
pub use project::{Exclude, Rename, Select};
pub use sort::{Sort, SortKey};
