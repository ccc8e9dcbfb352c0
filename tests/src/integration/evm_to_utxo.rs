//! Account-chain source, UTXO destination.
//!
//! ```text
//! t0        deploySrc (maker -> src escrow), fund dst HTLC (resolver -> P2SH)
//! t0+10     user claims dst HTLC with the secret; resolver withdraws src escrow
//! t0+101    dst refund opens (never reached)
//! t0+121    src cancellation (never reached)
//! ```

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bitcoin::hashes::Hash as _;
    use primitive_types::{H160, U256};
    use resolver_core::adapters::simulated::SIMULATED_UTXO_FEE;
    use resolver_core::adapters::JsonFileOrderStore;
    use resolver_core::algorithms::{deadline, parse_claimable_script, Stage};
    use resolver_core::domain::{OrderStatus, ResolverError, SecretRevealed, SecureSecret};
    use resolver_core::ports::{ChainAdapter, OrderStore, ResolverApi};

    use crate::fixtures::*;

    #[tokio::test]
    async fn test_full_swap() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x5e; 32]);
        let order = evm_to_utxo_order(&secret);
        h.submit(&order).await;

        let created = h.service.create_escrows(&order.hash).await.unwrap();
        assert_eq!(created.status, OrderStatus::EscrowCreated);

        // Source escrow holds the maker's funds; deployedAt is the fill time.
        let src_immutables = created.src_immutables.unwrap();
        assert_eq!(
            deadline(src_immutables.timelocks, Stage::SrcCancellation),
            START_TIME + 121
        );
        assert_eq!(h.evm.account_balance(maker_evm()), U256::from(MAKER_WEI - MAKING));

        // Destination HTLC pays TAKING to the user's key under the sha-256 lock.
        let funding = created.dst_deploy_tx_ref.clone().unwrap();
        let htlc = h.utxo.htlc(&funding).unwrap();
        assert_eq!(htlc.amount, TAKING);
        let params = parse_claimable_script(bitcoin_script(&htlc.script.0)).unwrap();
        assert_eq!(params.hash_lock, secret.hash_lock().sha256);
        assert_eq!(u64::from(params.claim_lock_time), START_TIME + 10);
        assert_eq!(u64::from(params.refund_lock_time), START_TIME + 101);
        assert_eq!(params.claimer, maker_key());
        assert_eq!(params.refunder, resolver_key());
        // The recorded escrow is the P2SH of exactly these script bytes.
        let script_hash = bitcoin::ScriptHash::hash(&htlc.script.0);
        let p2sh = bitcoin::Address::p2sh_from_hash(script_hash, bitcoin::Network::Regtest);
        assert_eq!(created.dst_escrow_address, Some(p2sh.to_string()));
        assert_eq!(
            h.utxo.resolver_balance(),
            U256::from(RESOLVER_SAT - TAKING - SIMULATED_UTXO_FEE)
        );

        // The user claims first, revealing the secret.
        h.clock.advance(10);
        assert_eq!(h.utxo.user_balance(&maker_key()), 0);
        h.utxo.redeem_as_user(&funding, &secret).unwrap();
        assert_eq!(h.utxo.user_balance(&maker_key()), TAKING - SIMULATED_UTXO_FEE);

        let done = h.service.withdraw(&order.hash, &secret).await.unwrap();
        assert_eq!(done.status, OrderStatus::WithdrawCompleted);
        assert!(done.src_withdraw_tx_ref.is_some());
        // The UTXO destination is the user's to claim.
        assert!(done.dst_withdraw_tx_ref.is_none());
        assert_eq!(h.evm.calls("withdraw"), 1);
        assert_eq!(h.utxo.calls("redeem_htlc"), 0);

        // Resolver recovers its deposit plus the maker's amount.
        assert_eq!(h.evm.resolver_balance(), U256::from(RESOLVER_WEI + MAKING));
        let escrow = h.evm.escrow(parse(&done.src_escrow_address.unwrap())).unwrap();
        assert!(escrow.withdrawn);
    }

    #[tokio::test]
    async fn test_src_withdraw_waits_for_window() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x5e; 32]);
        let order = evm_to_utxo_order(&secret);
        h.submit(&order).await;
        h.service.create_escrows(&order.hash).await.unwrap();

        let err = h.service.withdraw(&order.hash, &secret).await.unwrap_err();
        assert!(matches!(err, ResolverError::RevertedExecution(_)));
        let stored = h.service.get_order(&order.hash).await.unwrap();
        assert_eq!(stored.status, OrderStatus::EscrowCreated);
        assert!(stored.src_withdraw_tx_ref.is_none());

        h.clock.advance(10);
        let done = h.service.withdraw(&order.hash, &secret).await.unwrap();
        assert_eq!(done.status, OrderStatus::WithdrawCompleted);
    }

    #[tokio::test]
    async fn test_relay_payload_drives_withdraw() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x5e; 32]);
        let order = evm_to_utxo_order(&secret);
        h.submit(&order).await;
        let created = h.service.create_escrows(&order.hash).await.unwrap();
        h.clock.advance(15);

        let payload = SecretRevealed {
            order_hash: created.hash,
            hash_lock: created.hash_lock,
            src_chain_id: created.src_chain_id,
            dst_chain_id: created.dst_chain_id,
            src_escrow_address: created.src_escrow_address.clone().unwrap().to_uppercase(),
            dst_escrow_address: created.dst_escrow_address.clone().unwrap(),
            src_immutables: created.src_immutables.unwrap(),
            dst_immutables: created.dst_immutables.unwrap(),
            secret: SecureSecret::new([0x5e; 32]),
            htlc_script: created.htlc_script.clone(),
        };
        // Survives the wire format the relay uses.
        let json = serde_json::to_string(&payload).unwrap();
        let payload: SecretRevealed = serde_json::from_str(&json).unwrap();

        let done = h.service.withdraw_from_relay(&payload).await.unwrap();
        assert_eq!(done.status, OrderStatus::WithdrawCompleted);
    }

    #[tokio::test]
    async fn test_swap_state_survives_store_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn OrderStore> =
            Arc::new(JsonFileOrderStore::open(dir.path()).await.unwrap());
        let h = Harness::with_store(store);
        let secret = SecureSecret::new([0x5e; 32]);
        let order = evm_to_utxo_order(&secret);
        h.submit(&order).await;

        let created = h.service.create_escrows(&order.hash).await.unwrap();
        let reopened = JsonFileOrderStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.get(&order.hash).await.unwrap(), created);
    }

    #[test]
    fn test_resolver_identity_is_contract() {
        let h = Harness::new();
        assert_eq!(h.evm.resolver_identity(), resolver_contract());
        assert_ne!(h.utxo.resolver_identity(), H160::zero());
    }

    fn bitcoin_script(bytes: &[u8]) -> &bitcoin::Script {
        bitcoin::Script::from_bytes(bytes)
    }

    fn parse(address: &str) -> H160 {
        resolver_core::algorithms::addressing::parse_evm_address(address).unwrap()
    }
}
