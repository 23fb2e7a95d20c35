use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::auth::AuthService;
use crate::checkout::CheckoutService;
use crate::clients::{CategoryClient, OrderClient, ProductClient, UserClient};
use crate::config::StoreConfig;
use crate::storage::LocalObjectStore;
use crate::store::{StoreActor, StoreClient};

/// The application root: starts the document store and wires every service to it.
///
/// Cart state is deliberately not owned here; each session keeps its own
/// [`Cart`](crate::cart::Cart) and hands it to checkout.
pub struct StoreSystem {
    pub store: StoreClient,
    pub product_client: ProductClient,
    pub category_client: CategoryClient,
    pub order_client: OrderClient,
    pub user_client: UserClient,
    pub auth: AuthService,
    pub checkout: CheckoutService,
    pub objects: LocalObjectStore,
    handle: JoinHandle<()>,
}

impl StoreSystem {
    pub fn new(config: &StoreConfig) -> Self {
        // 1. Document store
        let (store_actor, store) = StoreActor::new(config.store_buffer);
        let handle = tokio::spawn(store_actor.run());

        // 2. Collection clients
        let product_client = ProductClient::new(store.clone());
        let category_client = CategoryClient::new(store.clone());
        let order_client = OrderClient::new(store.clone());
        let user_client = UserClient::new(store.clone());

        // 3. Services
        let auth = AuthService::new(user_client.clone());
        let checkout = CheckoutService::new(
            store.clone(),
            order_client.clone(),
            config.transaction_attempts,
        );
        let objects = LocalObjectStore::new(config.media_root.clone(), config.media_base_url.clone());

        info!("Store system started");
        Self {
            store,
            product_client,
            category_client,
            order_client,
            user_client,
            auth,
            checkout,
            objects,
            handle,
        }
    }

    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");

        self.store.shutdown().await.map_err(|e| e.to_string())?;

        if let Err(e) = self.handle.await {
            error!("Store task failed: {:?}", e);
            return Err(format!("Store task failed: {:?}", e));
        }

        info!("System shutdown complete.");
        Ok(())
    }
}

#[cfg(test)]
impl StoreSystem {
    /// Same wiring with a cheap password hasher, for tests that create accounts.
    pub(crate) fn for_tests(config: &StoreConfig) -> Self {
        let mut system = Self::new(config);
        system.auth = AuthService::with_hasher(system.user_client.clone(), crate::auth::fast_hasher());
        system
    }
}
