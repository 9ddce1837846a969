//! HTTP route handlers for docshelf.
//!
//! Routes are organized by area:
//! - `documents`: file list, viewing, editing, creating, deleting
//! - `account`: sign-in and sign-out
//! - `users`: user administration (admin only)
//! - `health`: liveness probe

pub mod account;
pub mod documents;
pub mod health;
pub mod users;
