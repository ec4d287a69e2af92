pub mod contact;
pub mod error;
pub mod filter;
pub mod model;
pub mod services;
pub mod traits;
