/// Generates `new` for a client that wraps a [`StoreClient`](crate::store::StoreClient).
#[macro_export]
macro_rules! impl_client_new {
    ($client_name:ident) => {
        impl $client_name {
            pub fn new(store: $crate::store::StoreClient) -> Self {
                Self { store }
            }
        }
    };
}

/// Generates `get_<entity>` (typed single-document read).
#[macro_export]
macro_rules! impl_client_methods {
    ($client_name:ident, $entity:ty, $error:ty, $entity_name_snake:ident) => {
        paste::paste! {
            impl $client_name {
                #[tracing::instrument(skip(self))]
                pub async fn [<get_ $entity_name_snake>](&self, id: &str) -> Result<Option<$entity>, $error> {
                    tracing::debug!("Sending request");
                    Ok(self.store.get_as::<$entity>(id).await?)
                }
            }
        }
    };
}

/// Generates `delete_<entity>`. A missing document is not an error.
#[macro_export]
macro_rules! impl_client_delete {
    ($client_name:ident, $entity:ty, $error:ty, $entity_name_snake:ident) => {
        paste::paste! {
            impl $client_name {
                #[tracing::instrument(skip(self))]
                pub async fn [<delete_ $entity_name_snake>](&self, id: &str) -> Result<(), $error> {
                    tracing::debug!("Sending request");
                    let path = <$entity as $crate::store::Document>::path_for(id);
                    Ok(self.store.delete(path).await?)
                }
            }
        }
    };
}

#[macro_export]
macro_rules! impl_basic_client {
    ($client_name:ident, $entity:ty, $error:ty, $entity_name_snake:ident) => {
        impl_client_new!($client_name);
        impl_client_methods!($client_name, $entity, $error, $entity_name_snake);
    };
}
