//! PostgreSQL persistence for the garden planner: users, submitted garden
//! requests, and saved schedule documents.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
