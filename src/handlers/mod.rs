// src/handlers/mod.rs

pub mod playlists;
pub mod users;
