pub mod analysis;
pub mod events;
pub mod history;
pub mod input;
pub mod models;
pub mod preferences;
pub mod schema;
