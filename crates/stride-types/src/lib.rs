//! Stride Types - Shared domain types
//!
//! This crate contains domain types used across Stride services:
//! - User identity newtypes
//! - User lifecycle status and deletion-audit reasons
//! - The authenticated-identity projection produced by the auth gateway

pub mod auth;
pub mod user;

pub use auth::*;
pub use user::*;
