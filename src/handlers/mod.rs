pub mod auth;
pub mod labels;
pub mod notes;
