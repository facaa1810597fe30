pub mod paths;
pub mod query;
pub mod strings;
