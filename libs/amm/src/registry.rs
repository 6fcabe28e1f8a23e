//! Pair registry and protocol fee settings
//!
//! The factory is the single place pools are created. It derives a
//! deterministic pool address from the canonically ordered asset pair and
//! keeps both a lookup index and the creation order.

use crate::error::{PoolError, PoolResult};
use crate::events::Event;
use crate::host::{Clock, Ledger};
use crate::pool::{sort_assets, Pool};
use crate::types::Address;
use amm_config::PoolParams;
use dashmap::DashMap;
use parking_lot::RwLock;
use sha3::{Digest, Keccak256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Domain tag mixed into pool address derivation
const POOL_ADDRESS_DOMAIN: &[u8] = b"torq-amm/pair/v2";

/// Read-only view of who receives protocol and creator fees
pub trait FeeSettings: Send + Sync {
    /// Protocol fee recipient; `None` disables protocol fees
    fn fee_to(&self) -> Option<Address>;

    /// Creator of `asset`, entitled to the creator share of input fees
    fn originator_of(&self, asset: Address) -> Option<Address>;
}

/// Lookup of live pools by address or by asset pair
pub trait PairRegistry: Send + Sync {
    fn pool(&self, address: Address) -> Option<Arc<Pool>>;

    /// Pool for the pair regardless of argument order
    fn pair_for(&self, asset_a: Address, asset_b: Address) -> Option<Arc<Pool>>;
}

/// Mutable fee settings shared by every pool of a factory
#[derive(Debug, Default)]
pub struct ProtocolSettings {
    fee_to: RwLock<Option<Address>>,
    originators: RwLock<HashMap<Address, Address>>,
}

impl ProtocolSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fee_to(&self, fee_to: Option<Address>) {
        *self.fee_to.write() = fee_to;
        info!(fee_to = ?fee_to, "protocol fee recipient updated");
    }

    /// Record (or clear with `None`) the originator of `asset`
    pub fn set_originator(&self, asset: Address, originator: Option<Address>) {
        let mut originators = self.originators.write();
        match originator {
            Some(originator) => {
                originators.insert(asset, originator);
            }
            None => {
                originators.remove(&asset);
            }
        }
    }
}

impl FeeSettings for ProtocolSettings {
    fn fee_to(&self) -> Option<Address> {
        *self.fee_to.read()
    }

    fn originator_of(&self, asset: Address) -> Option<Address> {
        self.originators.read().get(&asset).copied()
    }
}

/// Deterministic address of the pool for an ordered pair
pub fn pool_address(asset0: Address, asset1: Address) -> Address {
    let mut hasher = Keccak256::new();
    hasher.update(POOL_ADDRESS_DOMAIN);
    hasher.update(asset0.as_bytes());
    hasher.update(asset1.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[12..]);
    Address(bytes)
}

/// Creates and indexes pools sharing one ledger, clock and fee configuration
pub struct PairFactory {
    ledger: Arc<dyn Ledger>,
    clock: Arc<dyn Clock>,
    settings: Arc<ProtocolSettings>,
    params: PoolParams,
    by_pair: DashMap<(Address, Address), Arc<Pool>>,
    by_address: DashMap<Address, Arc<Pool>>,
    order: RwLock<Vec<Address>>,
}

impl PairFactory {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
        settings: Arc<ProtocolSettings>,
        params: PoolParams,
    ) -> Self {
        Self {
            ledger,
            clock,
            settings,
            params,
            by_pair: DashMap::new(),
            by_address: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    pub fn settings(&self) -> &Arc<ProtocolSettings> {
        &self.settings
    }

    pub fn params(&self) -> &PoolParams {
        &self.params
    }

    /// Create the pool for a pair; each unordered pair gets at most one
    pub fn create_pair(&self, asset_a: Address, asset_b: Address) -> PoolResult<Arc<Pool>> {
        let (asset0, asset1) = sort_assets(asset_a, asset_b)?;

        // Hold the order lock across check-and-insert so two creators of the
        // same pair cannot both succeed
        let mut order = self.order.write();
        if let Some(existing) = self.by_pair.get(&(asset0, asset1)) {
            return Err(PoolError::PairExists {
                pool: existing.address(),
            });
        }

        let address = pool_address(asset0, asset1);
        let settings: Arc<dyn FeeSettings> = self.settings.clone();
        let pool = Arc::new(Pool::new(
            address,
            asset0,
            asset1,
            self.params,
            Arc::clone(&self.ledger),
            Arc::clone(&self.clock),
            settings,
        )?);

        self.by_pair.insert((asset0, asset1), Arc::clone(&pool));
        self.by_address.insert(address, Arc::clone(&pool));
        order.push(address);
        drop(order);

        self.ledger.emit(Event::PairCreated {
            pool: address,
            asset0,
            asset1,
        });
        info!(pool = %address, %asset0, %asset1, "pair created");
        Ok(pool)
    }

    /// Pool addresses in creation order
    pub fn all_pairs(&self) -> Vec<Address> {
        self.order.read().clone()
    }

    pub fn all_pairs_length(&self) -> usize {
        self.order.read().len()
    }
}

impl PairRegistry for PairFactory {
    fn pool(&self, address: Address) -> Option<Arc<Pool>> {
        self.by_address.get(&address).map(|entry| Arc::clone(entry.value()))
    }

    fn pair_for(&self, asset_a: Address, asset_b: Address) -> Option<Arc<Pool>> {
        let (asset0, asset1) = sort_assets(asset_a, asset_b).ok()?;
        self.by_pair
            .get(&(asset0, asset1))
            .map(|entry| Arc::clone(entry.value()))
    }
}
