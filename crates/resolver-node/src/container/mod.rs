//! # Resolver Container
//!
//! Builds the orchestrator with its dependencies: one metered adapter per
//! configured chain, the signing capability, the order store and the clock.

pub mod config;

pub use config::{ConfigError, NodeConfig, SimulationConfig};

use std::sync::Arc;
use std::time::Duration;

use primitive_types::{H160, U256};
use rand::RngCore;
use resolver_core::adapters::{
    EvmAdapter, InMemoryOrderStore, JsonFileOrderStore, LocalSigner, RemoteSigner,
    SimulatedLedger, UtxoAdapter,
};
use resolver_core::domain::{ChainKind, ResolverError};
use resolver_core::ports::{OrderStore, ResolverApi, SystemTimeSource, TimeSource, TransactionSigner};
use resolver_core::{OrchestratorConfig, ResolverService};
use tracing::info;

use crate::adapters::MeteredAdapter;

/// Wired resolver.
pub struct ResolverContainer {
    service: Arc<ResolverService>,
    simulated: Option<SimulatedLedgers>,
}

/// Handles on the in-memory ledgers of a simulated container.
#[derive(Clone)]
pub struct SimulatedLedgers {
    pub evm: Arc<SimulatedLedger>,
    pub utxo: Arc<SimulatedLedger>,
}

impl ResolverContainer {
    /// Connect to the configured ledgers.
    pub async fn build(config: &NodeConfig) -> Result<Self, ResolverError> {
        let signer = build_signer(config)?;
        let store = build_store(config).await?;
        let clock: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);

        let mut service = ResolverService::new(store, clock, config.orchestrator.clone());
        for chain in &config.evm {
            let adapter = EvmAdapter::connect(chain.clone(), signer.clone()).await?;
            info!("[resolver] connected evm chain {} at {}", chain.chain_id, chain.rpc_url);
            service = service.with_adapter(MeteredAdapter::wrap(Arc::new(adapter)));
        }
        for chain in &config.utxo {
            let adapter = UtxoAdapter::connect(chain.clone(), signer.clone()).await?;
            info!(
                "[resolver] connected utxo chain {} ({}) at {}",
                chain.chain_id, chain.network, chain.esplora_url
            );
            service = service.with_adapter(MeteredAdapter::wrap(Arc::new(adapter)));
        }

        Ok(Self {
            service: Arc::new(service),
            simulated: None,
        })
    }

    /// In-memory ledgers with freshly generated resolver keys.
    pub async fn simulated(
        simulation: &SimulationConfig,
        orchestrator: OrchestratorConfig,
        store: Arc<dyn OrderStore>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, ResolverError> {
        let mut evm_key = [0u8; 32];
        let mut btc_key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut evm_key);
        rand::thread_rng().fill_bytes(&mut btc_key);
        let signer = LocalSigner::new(Some(evm_key), Some(btc_key))?;

        let mut evm = SimulatedLedger::evm(
            simulation.evm_chain_id,
            signer.public_key(ChainKind::Evm).await?,
            H160::from_low_u64_be(0x5e50),
            H160::from_low_u64_be(0xfac7),
            clock.clone(),
        )
        .with_resolver_balance(simulation.resolver_balance_wei);
        for account in &simulation.funded_accounts {
            evm = evm.with_account(*account, U256::from(simulation.account_balance_wei));
        }
        let utxo = SimulatedLedger::utxo(
            simulation.utxo_chain_id,
            signer.public_key(ChainKind::Utxo).await?,
            clock.clone(),
        )
        .with_resolver_balance(simulation.resolver_balance_sat);

        let ledgers = SimulatedLedgers {
            evm: Arc::new(evm),
            utxo: Arc::new(utxo),
        };
        let service = ResolverService::new(store, clock, orchestrator)
            .with_adapter(MeteredAdapter::wrap(ledgers.evm.clone()))
            .with_adapter(MeteredAdapter::wrap(ledgers.utxo.clone()));
        info!(
            "[resolver] simulating evm chain {} and utxo chain {}",
            simulation.evm_chain_id, simulation.utxo_chain_id
        );

        Ok(Self {
            service: Arc::new(service),
            simulated: Some(ledgers),
        })
    }

    /// The orchestrator behind the HTTP surface.
    pub fn api(&self) -> Arc<dyn ResolverApi> {
        self.service.clone()
    }

    pub fn service(&self) -> Arc<ResolverService> {
        Arc::clone(&self.service)
    }

    /// Present only for simulated containers.
    pub fn simulated_ledgers(&self) -> Option<&SimulatedLedgers> {
        self.simulated.as_ref()
    }
}

fn build_signer(config: &NodeConfig) -> Result<Arc<dyn TransactionSigner>, ResolverError> {
    let signer = &config.signer;
    match &signer.remote_url {
        Some(url) => {
            info!("[resolver] using remote signer at {}", url);
            Ok(Arc::new(RemoteSigner::new(
                url.clone(),
                Duration::from_secs(signer.timeout_secs),
            )?))
        }
        None => Ok(Arc::new(LocalSigner::from_hex(
            signer.evm_key.as_deref(),
            signer.btc_key.as_deref(),
        )?)),
    }
}

/// Order store selected by configuration.
pub async fn build_store(config: &NodeConfig) -> Result<Arc<dyn OrderStore>, ResolverError> {
    if config.store.in_memory {
        info!("[resolver] orders kept in memory only");
        return Ok(Arc::new(InMemoryOrderStore::new()));
    }
    let store = JsonFileOrderStore::open(&config.store.data_dir).await?;
    info!("[resolver] orders stored under {}", config.store.data_dir.display());
    Ok(Arc::new(store))
}
