//! HTTP endpoint handlers.
//!
//! Auth flow handlers answer with redirects; the records API and profile
//! completion answer JSON.

pub mod callback;
pub mod dashboard;
pub mod error_page;
pub mod health;
pub mod login;
pub mod profile;
pub mod records;
pub mod signout;
