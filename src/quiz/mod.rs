// src/quiz/mod.rs

pub mod catalog;
pub mod intent;
pub mod ledger;
pub mod session;
pub mod tabular;
