pub mod order;
pub mod types;
