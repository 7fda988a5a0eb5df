// src/services/mod.rs

pub mod links;
pub mod records;
pub mod scoring;
