//! Core library for docshelf.
//!
//! Contains the bcrypt password hasher, the JSON credential store, session
//! state with the role checks built on it, and the document repository with
//! its markdown renderer. This crate depends on `docshelf-storage` for the
//! storage backend trait and knows nothing about HTTP.

pub mod authz;
pub mod credentials;
pub mod documents;
pub mod error;
pub mod password;
pub mod render;
