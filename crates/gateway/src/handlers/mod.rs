//! API handlers module

pub mod ai_search;
pub mod health;
