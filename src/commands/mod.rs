pub mod fetch;
pub mod plan;
pub mod schema;
