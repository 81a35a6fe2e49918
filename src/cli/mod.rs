pub mod details;
pub mod saved;
pub mod search;
pub mod setup;
pub mod ui;
pub mod user;
