pub mod error;
pub mod models;
pub mod payload;
pub mod results;
pub mod settings;
