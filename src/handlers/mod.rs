// src/handlers/mod.rs

pub mod health;
pub mod test_track;
