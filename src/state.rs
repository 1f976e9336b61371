use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    services::{FavouritesSynchronizer, IdentityService, VisibilityResolver},
    store::Store,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub identity: IdentityService,
    pub visibility: VisibilityResolver,
    pub favourites: FavouritesSynchronizer,
}

impl AppState {
    /// Wires every service to the same store.
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            identity: IdentityService::new(store.clone()),
            visibility: VisibilityResolver::new(store.clone()),
            favourites: FavouritesSynchronizer::new(store.clone()),
            store,
            config,
        }
    }
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for IdentityService {
    fn from_ref(state: &AppState) -> Self {
        state.identity.clone()
    }
}

impl FromRef<AppState> for VisibilityResolver {
    fn from_ref(state: &AppState) -> Self {
        state.visibility.clone()
    }
}

impl FromRef<AppState> for FavouritesSynchronizer {
    fn from_ref(state: &AppState) -> Self {
        state.favourites.clone()
    }
}
