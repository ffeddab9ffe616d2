pub mod row;
pub mod value;

pub use row::Row;
pub use value::Value;

pub use indexmap::IndexMap;
