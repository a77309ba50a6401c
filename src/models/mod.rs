// src/models/mod.rs

pub mod auth;
pub mod question;
pub mod result;
pub mod session;
