//! HTTP handlers (§4.10) — thin wrappers around the component modules.
//! No business logic lives here; each handler parses/validates the wire
//! shape, calls into `crate::{upload,listing,render,stream,trash,admin,
//! auth}`, and maps `AppError` to a response via the shared `IntoResponse`
//! impl.

pub mod admin;
pub mod auth;
pub mod common;
pub mod files;
pub mod folders;
pub mod img;
pub mod stream;
pub mod trash;
pub mod upload;
