pub mod binding;
pub mod changelog;
pub mod commands;
pub mod config;
pub mod error;
pub mod ffi;
pub mod git;
pub mod github;
pub mod http;
pub mod npm;
pub mod platform;
pub mod routes;
pub mod runtime;

pub use error::{LoaderError, Result};
