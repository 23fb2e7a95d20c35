//! Admin back office.
//!
//! An [`AdminConsole`] can only be obtained through [`AdminConsole::open`],
//! which performs the admin role check. Holding one is the capability to
//! manage products, categories, orders and user roles.

use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::app_system::StoreSystem;
use crate::auth::{check_access, AccessError, Requirement};
use crate::clients::{CategoryClient, OrderClient, ProductClient, UserClient};
use crate::domain::{self, Category, Order, OrderStatus, Product, ProductDraft, Role, Session, UserData};
use crate::error::{CategoryError, OrderError, ProductError, UserError};
use crate::storage::{LocalObjectStore, StorageError, StoredObject};
use crate::store::Subscription;

/// Products at or below this stock (but not sold out) count as low stock.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdminError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("You cannot change your own role.")]
    SelfRoleChange,
    #[error(transparent)]
    Product(#[from] ProductError),
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Dashboard summary of the catalog's stock levels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockOverview {
    pub total_products: usize,
    pub low_stock: Vec<Product>,
    pub out_of_stock: Vec<Product>,
}

impl StockOverview {
    pub fn from_products(products: &[Product]) -> Self {
        let matching = |keep: fn(u32) -> bool| -> Vec<Product> {
            products
                .iter()
                .filter(|product| keep(product.stock))
                .cloned()
                .collect()
        };

        Self {
            total_products: products.len(),
            low_stock: matching(|stock| stock > 0 && stock <= LOW_STOCK_THRESHOLD),
            out_of_stock: matching(|stock| stock == 0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdminConsole {
    session: Session,
    products: ProductClient,
    categories: CategoryClient,
    orders: OrderClient,
    users: UserClient,
    objects: LocalObjectStore,
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl AdminConsole {
    pub fn open(session: Option<&Session>, system: &StoreSystem) -> Result<Self, AccessError> {
        check_access(session, Requirement::Role(Role::Admin)).into_result()?;
        let session = session.cloned().ok_or(AccessError::Unauthenticated)?;

        Ok(Self {
            session,
            products: system.product_client.clone(),
            categories: system.category_client.clone(),
            orders: system.order_client.clone(),
            users: system.user_client.clone(),
            objects: system.objects.clone(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // ===== PRODUCTS =====

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product, AdminError> {
        draft
            .validate()
            .map_err(|e| AdminError::Validation(e.to_string()))?;

        let product = draft.into_product(new_id(), domain::now());
        self.products.create_product(&product).await?;
        Ok(product)
    }

    #[instrument(skip(self, draft))]
    pub async fn update_product(&self, id: &str, draft: ProductDraft) -> Result<Product, AdminError> {
        draft
            .validate()
            .map_err(|e| AdminError::Validation(e.to_string()))?;

        let existing = self
            .products
            .get_product(id)
            .await?
            .ok_or_else(|| ProductError::NotFound(id.to_string()))?;

        let mut product = draft.into_product(id.to_string(), domain::now());
        product.created_at = existing.created_at;
        self.products.update_product(&product).await?;
        Ok(product)
    }

    /// Delete the product document, then its images best-effort.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: &str) -> Result<(), AdminError> {
        let product = self
            .products
            .get_product(id)
            .await?
            .ok_or_else(|| ProductError::NotFound(id.to_string()))?;

        self.products.delete_product(id).await?;
        let urls: Vec<String> = product.image_urls().map(str::to_string).collect();
        self.remove_images(&urls).await;

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    pub async fn upload_product_image(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, AdminError> {
        Ok(self.objects.upload_product_image(file_name, bytes).await?)
    }

    pub async fn upload_additional_image(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, AdminError> {
        Ok(self.objects.upload_additional_image(file_name, bytes).await?)
    }

    /// Failures are logged and skipped.
    pub async fn remove_images(&self, urls: &[String]) {
        for url in urls {
            if let Err(e) = self.objects.delete_best_effort(url).await {
                warn!(url = %url, error = %e, "Failed to delete image");
            }
        }
    }

    pub async fn stock_overview(&self) -> Result<StockOverview, AdminError> {
        let products = self.products.list_products().await?;
        Ok(StockOverview::from_products(&products))
    }

    /// Recompute the stock overview after every product change.
    pub async fn watch_stock<F>(&self, mut callback: F) -> Result<Subscription, AdminError>
    where
        F: FnMut(StockOverview) + Send + 'static,
    {
        Ok(self
            .products
            .subscribe_products(move |products| callback(StockOverview::from_products(&products)))
            .await?)
    }

    // ===== CATEGORIES =====

    #[instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<Category, AdminError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryError::EmptyName.into());
        }

        let category = Category::new(new_id(), name, domain::now());
        self.categories.create_category(&category).await?;
        Ok(category)
    }

    #[instrument(skip(self))]
    pub async fn update_category(&self, id: &str, name: &str) -> Result<(), AdminError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryError::EmptyName.into());
        }
        Ok(self.categories.rename_category(id, name, domain::now()).await?)
    }

    pub async fn delete_category(&self, id: &str) -> Result<(), AdminError> {
        Ok(self.categories.delete_category(id).await?)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, AdminError> {
        Ok(self.categories.list_categories().await?)
    }

    // ===== ORDERS =====

    pub async fn list_orders(&self) -> Result<Vec<Order>, AdminError> {
        Ok(self.orders.list_orders().await?)
    }

    /// Live order detail; `None` while the order does not exist.
    pub async fn watch_order<F>(&self, id: &str, callback: F) -> Result<Subscription, AdminError>
    where
        F: FnMut(Option<Order>) + Send + 'static,
    {
        Ok(self.orders.subscribe_order(id, callback).await?)
    }

    /// Returns `false` when the order already had `status` and nothing was written.
    #[instrument(skip(self), fields(status = %status))]
    pub async fn update_order_status(&self, id: &str, status: OrderStatus) -> Result<bool, AdminError> {
        let order = self
            .orders
            .get_order(id)
            .await?
            .ok_or_else(|| OrderError::NotFound(id.to_string()))?;

        if order.status == status {
            return Ok(false);
        }
        self.orders.set_status(id, status, domain::now()).await?;
        Ok(true)
    }

    // ===== USERS =====

    pub async fn list_users(&self) -> Result<Vec<UserData>, AdminError> {
        Ok(self.users.list_users().await?)
    }

    #[instrument(skip(self), fields(role = %role))]
    pub async fn change_role(&self, target_uid: &str, role: Role) -> Result<(), AdminError> {
        if target_uid == self.session.uid {
            warn!("Refusing self role change");
            return Err(AdminError::SelfRoleChange);
        }
        Ok(self.users.set_role(target_uid, role).await?)
    }
}
