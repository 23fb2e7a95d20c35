use serde_json::{json, Map};
use tracing::{debug, info, instrument};

use crate::domain::{Role, UserData};
use crate::error::UserError;
use crate::store::{Direction, Document, Query, StoreClient, StoreError};

/// Client for the `users` profile collection.
#[derive(Debug, Clone)]
pub struct UserClient {
    store: StoreClient,
}

impl_basic_client!(UserClient, UserData, UserError, user);

impl UserClient {
    /// Return the profile for `uid`, creating a customer profile first if none exists.
    #[instrument(skip(self))]
    pub async fn ensure_profile(&self, uid: &str, email: &str) -> Result<UserData, UserError> {
        if let Some(existing) = self.get_user(uid).await? {
            return Ok(existing);
        }

        let profile = UserData::customer(uid, email);
        match self.store.create(&profile).await {
            Ok(()) => {
                info!("Customer profile created");
                Ok(profile)
            }
            // Created concurrently by another sign-in; use the stored one.
            Err(StoreError::AlreadyExists(_)) => self
                .get_user(uid)
                .await?
                .ok_or_else(|| UserError::NotFound(uid.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserData>, UserError> {
        debug!("Sending request");
        let query = Query::collection(UserData::COLLECTION).order_by("email", Direction::Ascending);
        Ok(self.store.query_as(query).await?)
    }

    #[instrument(skip(self), fields(role = %role))]
    pub async fn set_role(&self, uid: &str, role: Role) -> Result<(), UserError> {
        debug!("Sending request");
        let mut fields = Map::new();
        fields.insert("role".to_string(), json!(role));

        match self.store.update(UserData::path_for(uid), fields).await {
            Ok(()) => {
                info!("User role updated");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(UserError::NotFound(uid.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
