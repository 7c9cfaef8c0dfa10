//! etcd-backed store implementation.
//!
//! This module provides [`EtcdStore`], which implements
//! [`StoreClient`](etcd_provider_store::StoreClient) on top of the etcd v3
//! gRPC API via `etcd-client`.

use async_trait::async_trait;
use bytes::Bytes;
use etcd_client::{
    Client, Compare as EtcdCompare, CompareOp, Txn as EtcdTxn, TxnOp as EtcdTxnOp,
};
use etcd_provider_store::{
    Compare, Credential, KeyValue, StoreClient, StoreError, StoreResult, Txn, TxnOp, TxnResponse,
};

use crate::{
    config::EtcdStoreConfig,
    error::{EtcdStoreError, Result},
};

/// etcd-backed implementation of [`StoreClient`].
///
/// # Presence Compares
///
/// Presence is tested on the key's create revision, exactly like etcd's own
/// `clientv3util` helpers:
///
/// | Compare | etcd compare |
/// |---------|--------------|
/// | [`Compare::KeyMissing`] | `create_revision(key) == 0` |
/// | [`Compare::KeyExists`] | `create_revision(key) > 0` |
///
/// # Thread Safety
///
/// `EtcdStore` is `Send + Sync` and cheap to clone. Each call takes its own
/// clone of the per-service client, which share one underlying channel.
///
/// # Example
///
/// ```no_run
/// use etcd_provider_store::StoreClient;
/// use etcd_provider_store_etcd::{EtcdStore, EtcdStoreConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = EtcdStoreConfig::builder().endpoints(["http://127.0.0.1:2379"]).build()?;
///     let store = EtcdStore::connect(&config).await?;
///
///     store.health_check().await?;
///     let kvs = store.get(b"service/port").await?;
///     println!("{} entries", kvs.len());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct EtcdStore {
    client: Client,
    endpoints: Vec<String>,
}

impl std::fmt::Debug for EtcdStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtcdStore").field("endpoints", &self.endpoints).finish_non_exhaustive()
    }
}

impl EtcdStore {
    /// Connects to the cluster described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or no endpoint can
    /// be dialled (or authentication against it fails).
    #[tracing::instrument(skip(config), fields(endpoints = ?config.endpoints()))]
    pub async fn connect(config: &EtcdStoreConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::connect(config.endpoints(), Some(config.connect_options()))
            .await
            .map_err(EtcdStoreError::from)?;

        tracing::debug!("connected to etcd cluster");
        Ok(Self { client, endpoints: config.endpoints().to_vec() })
    }

    /// Creates a store from an already connected client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client, endpoints: Vec::new() }
    }

    /// Returns the endpoints this store was connected with.
    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }
}

fn to_etcd_compare(compare: &Compare) -> EtcdCompare {
    match compare {
        Compare::KeyMissing(key) => EtcdCompare::create_revision(key.to_vec(), CompareOp::Equal, 0),
        Compare::KeyExists(key) => {
            EtcdCompare::create_revision(key.to_vec(), CompareOp::Greater, 0)
        },
    }
}

fn to_etcd_op(op: &TxnOp) -> EtcdTxnOp {
    match op {
        TxnOp::Put { key, value } => EtcdTxnOp::put(key.to_vec(), value.to_vec(), None),
        TxnOp::Delete { key } => EtcdTxnOp::delete(key.to_vec(), None),
    }
}

fn to_etcd_txn(txn: &Txn) -> EtcdTxn {
    let compares: Vec<EtcdCompare> = txn.compares().iter().map(to_etcd_compare).collect();
    let ops: Vec<EtcdTxnOp> = txn.success().iter().map(to_etcd_op).collect();
    EtcdTxn::new().when(compares).and_then(ops)
}

fn map_err(err: etcd_client::Error) -> StoreError {
    StoreError::from(EtcdStoreError::from(err))
}

#[async_trait]
impl StoreClient for EtcdStore {
    #[tracing::instrument(skip(self, key), fields(key_len = key.len()))]
    async fn get(&self, key: &[u8]) -> StoreResult<Vec<KeyValue>> {
        let mut kv = self.client.kv_client();
        let response = kv.get(key.to_vec(), None).await.map_err(map_err)?;

        Ok(response
            .kvs()
            .iter()
            .map(|kv| KeyValue {
                key: Bytes::copy_from_slice(kv.key()),
                value: Bytes::copy_from_slice(kv.value()),
                create_revision: kv.create_revision(),
                mod_revision: kv.mod_revision(),
                version: kv.version(),
            })
            .collect())
    }

    #[tracing::instrument(
        skip(self, txn),
        fields(compares = txn.compares().len(), ops = txn.success().len())
    )]
    async fn transact(&self, txn: Txn) -> StoreResult<TxnResponse> {
        let mut kv = self.client.kv_client();
        let response = kv.txn(to_etcd_txn(&txn)).await.map_err(map_err)?;

        let revision = response.header().map_or(0, |header| header.revision());
        Ok(TxnResponse { succeeded: response.succeeded(), revision })
    }

    #[tracing::instrument(skip(self, credential), fields(username = credential.username()))]
    async fn create_user(&self, credential: &Credential) -> StoreResult<()> {
        let mut auth = self.client.auth_client();
        auth.user_add(credential.username(), credential.password(), None)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_user(&self, username: &str) -> StoreResult<()> {
        let mut auth = self.client.auth_client();
        auth.user_delete(username).await.map_err(map_err)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn health_check(&self) -> StoreResult<()> {
        let mut maintenance = self.client.maintenance_client();
        let status = maintenance.status().await.map_err(map_err)?;
        tracing::trace!(version = status.version(), "etcd status");
        Ok(())
    }
}
