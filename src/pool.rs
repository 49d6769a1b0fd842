use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::ChainError;
use crate::evm::{AlloyEvmClient, EvmRpc};
use crate::model::{ChainMetadata, ChainRegistry};
use crate::sealevel::{SealevelRpc, SolanaRpcClient};

/// RPC clients by chain, created on first use.
///
/// EVM clients are keyed by chain id, or by chain name when the chain has
/// none; Sealevel clients by chain name. The pool is owned by the caller and
/// passed to the engine; clients can be injected up front to use a custom
/// transport.
pub struct ConnectionPool {
    registry: ChainRegistry,
    evm: Mutex<HashMap<EvmClientKey, Arc<dyn EvmRpc>>>,
    sealevel: Mutex<HashMap<String, Arc<dyn SealevelRpc>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EvmClientKey {
    ChainId(u64),
    Name(String),
}

impl From<&ChainMetadata> for EvmClientKey {
    fn from(chain: &ChainMetadata) -> Self {
        match chain.chain_id {
            Some(id) => EvmClientKey::ChainId(id),
            None => EvmClientKey::Name(chain.name.clone()),
        }
    }
}

impl ConnectionPool {
    pub fn new(registry: ChainRegistry) -> Self {
        ConnectionPool {
            registry,
            evm: Mutex::new(HashMap::new()),
            sealevel: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn chain(&self, name: &str) -> Result<&ChainMetadata, ChainError> {
        self.registry.get(name).ok_or_else(|| ChainError::UnknownChain {
            chain: name.to_string(),
        })
    }

    /// Use `client` for every EVM call on `chain_id`.
    pub fn insert_evm(&self, chain_id: u64, client: Arc<dyn EvmRpc>) {
        lock(&self.evm).insert(EvmClientKey::ChainId(chain_id), client);
    }

    /// Use `client` for an EVM chain registered without a chain id.
    pub fn insert_evm_by_name(&self, chain: impl Into<String>, client: Arc<dyn EvmRpc>) {
        lock(&self.evm).insert(EvmClientKey::Name(chain.into()), client);
    }

    /// Use `client` for every Sealevel call on `chain`.
    pub fn insert_sealevel(&self, chain: impl Into<String>, client: Arc<dyn SealevelRpc>) {
        lock(&self.sealevel).insert(chain.into(), client);
    }

    pub fn evm(&self, chain: &ChainMetadata) -> Result<Arc<dyn EvmRpc>, ChainError> {
        let key = EvmClientKey::from(chain);
        let mut clients = lock(&self.evm);
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }
        let client: Arc<dyn EvmRpc> = Arc::new(AlloyEvmClient::connect(chain)?);
        clients.insert(key, client.clone());
        Ok(client)
    }

    pub fn sealevel(&self, chain: &ChainMetadata) -> Result<Arc<dyn SealevelRpc>, ChainError> {
        let mut clients = lock(&self.sealevel);
        if let Some(client) = clients.get(&chain.name) {
            return Ok(client.clone());
        }
        let url = chain.rpc_url().ok_or_else(|| ChainError::NoRpcUrl {
            chain: chain.name.clone(),
        })?;
        let client: Arc<dyn SealevelRpc> = Arc::new(SolanaRpcClient::new(&chain.name, url));
        clients.insert(chain.name.clone(), client.clone());
        Ok(client)
    }
}

// Client maps stay consistent even if a holder of the lock panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
