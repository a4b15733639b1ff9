use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::db::CollectionStore;
use crate::services::providers::CatalogProvider;
use crate::services::{CollectionService, SharingService, WishlistService};

/// Shared application state: one handle per collaborator, one per service
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CollectionStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub catalog: Arc<dyn CatalogProvider>,
    pub collection: CollectionService,
    pub sharing: SharingService,
    pub wishlist: WishlistService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CollectionStore>,
        identity: Arc<dyn IdentityProvider>,
        catalog: Arc<dyn CatalogProvider>,
    ) -> Self {
        let collection = CollectionService::new(Arc::clone(&store), Arc::clone(&identity));
        let sharing = SharingService::new(
            Arc::clone(&store),
            Arc::clone(&identity),
            collection.clone(),
        );
        let wishlist = WishlistService::new(
            Arc::clone(&store),
            Arc::clone(&identity),
            collection.clone(),
        );

        Self {
            store,
            identity,
            catalog,
            collection,
            sharing,
            wishlist,
        }
    }
}
