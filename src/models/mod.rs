// src/models/mod.rs

pub mod playlist;
pub mod token;
pub mod user;
