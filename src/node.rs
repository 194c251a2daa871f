use std::sync::Arc;

use anyhow::Context;
use egp_core::{NodeConfig, StoreBackend};
use egp_engine::{
    InMemoryStore, IpfsStore, LifecycleConfig, LifecycleEngine, NullIndex, ObjectIndex,
    ObjectStore,
};
use egp_rules::RevocationEngine;
use tracing::{info, warn};

/// The store a node writes to and the index its advisors read from.
pub struct NodeStore {
    pub store: Arc<dyn ObjectStore>,
    pub index: Arc<dyn ObjectIndex>,
    pub backend: &'static str,
}

/// Opens the configured backend.
///
/// For IPFS the local API is probed first. When it does not answer and Infura
/// credentials are configured, the hosted API is used instead. Otherwise the
/// node starts against the local API and writes fail until it comes up.
pub async fn open_store(config: &NodeConfig) -> anyhow::Result<NodeStore> {
    match config.store {
        StoreBackend::Memory => {
            let store = Arc::new(InMemoryStore::new());
            info!("using in-memory object store");
            Ok(NodeStore {
                store: store.clone(),
                index: store,
                backend: "memory",
            })
        }
        StoreBackend::Ipfs => {
            let local = IpfsStore::new(config.ipfs_api_url.clone());
            let store = match local.version().await {
                Ok(version) => {
                    info!(%version, url = %config.ipfs_api_url, "connected to ipfs node");
                    local
                }
                Err(err) => match &config.infura {
                    Some(credentials) => {
                        warn!(error = %err, "local ipfs node unreachable, falling back to infura");
                        IpfsStore::infura(credentials).context("failed to configure infura")?
                    }
                    None => {
                        warn!(error = %err, url = %config.ipfs_api_url, "ipfs node unreachable");
                        local
                    }
                },
            };
            Ok(NodeStore {
                store: Arc::new(store),
                index: Arc::new(NullIndex),
                backend: "ipfs",
            })
        }
    }
}

/// Builds the lifecycle engine for a node over an opened store.
pub fn build_engine(config: &NodeConfig, store: NodeStore) -> anyhow::Result<LifecycleEngine> {
    let revocation = match &config.revocation_rules {
        Some(path) => RevocationEngine::from_path(path)
            .with_context(|| format!("failed to load revocation rules from {}", path.display()))?,
        None => RevocationEngine::default(),
    };
    info!(
        node_id = %config.node_id,
        backend = store.backend,
        rules = revocation.rules().len(),
        "governance engine ready"
    );

    Ok(LifecycleEngine::builder(store.store)
        .index(store.index)
        .revocation_rules(revocation)
        .config(LifecycleConfig::from(config))
        .build())
}
