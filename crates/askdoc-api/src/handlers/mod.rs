//! API request handlers

pub mod ask;
pub mod documents;
pub mod health;
pub mod sessions;
pub mod sql;
