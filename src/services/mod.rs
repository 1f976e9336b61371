// src/services/mod.rs

pub mod favourites;
pub mod identity;
pub mod visibility;

pub use favourites::{FavouriteIntent, FavouriteOutcome, FavouritesSynchronizer};
pub use identity::{AccountChange, IdentityService, UsernameChange};
pub use visibility::{FavouritesView, PlaylistsView, VisibilityResolver};
