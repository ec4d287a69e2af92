pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod migration;
pub mod state;
