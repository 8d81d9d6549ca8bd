//! HTTP handlers

pub mod health;
pub mod nhs_login;
