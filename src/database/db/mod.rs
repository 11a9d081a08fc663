//! Plain data access. Nothing in here makes an authorization decision; the
//! services pass the caller's id down and these functions only bind it.

pub mod budgets;
pub mod categories;
pub mod connection;
pub mod migrate;
pub mod permissions;
pub mod users;
