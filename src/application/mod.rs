pub mod contact;
pub mod lead_details;
pub mod listing;
