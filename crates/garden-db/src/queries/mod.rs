//! Query functions, one module per table.

pub mod requests;
pub mod schedules;
pub mod users;
