// src/models/mod.rs

pub mod test_track;
