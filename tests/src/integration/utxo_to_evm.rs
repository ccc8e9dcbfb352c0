//! UTXO source, account-chain destination.
//!
//! ```text
//! t0        maker funds src HTLC; resolver deploys dst escrow
//! t0+10     resolver withdraws dst escrow to the maker, then redeems src HTLC
//! ```

#[cfg(test)]
mod tests {
    use primitive_types::U256;
    use resolver_core::adapters::simulated::SIMULATED_UTXO_FEE;
    use resolver_core::algorithms::{deadline, Stage};
    use resolver_core::domain::{Hash, HexBytes, OrderStatus, ResolverError, SecureSecret};
    use resolver_core::ports::ResolverApi;

    use crate::fixtures::*;

    #[tokio::test]
    async fn test_full_swap() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x7c; 32]);
        let order = utxo_to_evm_order(&h, &secret);
        h.submit(&order).await;

        let created = h.service.create_escrows(&order.hash).await.unwrap();
        assert_eq!(created.status, OrderStatus::EscrowCreated);
        // Source deadlines are anchored at the maker's funding block.
        assert_eq!(h.utxo.calls("wait_for_confirmation"), 1);
        let src = created.src_immutables.unwrap();
        assert_eq!(deadline(src.timelocks, Stage::SrcWithdrawal), START_TIME + 10);
        assert_eq!(src.hash_lock, secret.hash_lock().sha256);

        let dst = created.dst_immutables.unwrap();
        assert_eq!(dst.hash_lock, secret.hash_lock().keccak256);
        assert_eq!(dst.maker, maker_evm());
        assert_eq!(dst.amount, U256::from(TAKING));
        assert!(
            deadline(dst.timelocks, Stage::DstCancellation)
                < deadline(src.timelocks, Stage::SrcCancellation)
        );
        assert_eq!(
            h.evm.resolver_balance(),
            U256::from(RESOLVER_WEI - TAKING - SAFETY_DEPOSIT)
        );

        h.clock.advance(10);
        let done = h.service.withdraw(&order.hash, &secret).await.unwrap();
        assert_eq!(done.status, OrderStatus::WithdrawCompleted);
        assert!(done.dst_withdraw_tx_ref.is_some());
        assert!(done.src_withdraw_tx_ref.is_some());

        // Maker paid on the account chain, resolver on the UTXO chain.
        assert_eq!(h.evm.account_balance(maker_evm()), U256::from(MAKER_WEI + TAKING));
        assert_eq!(h.evm.resolver_balance(), U256::from(RESOLVER_WEI - TAKING));
        assert_eq!(
            h.utxo.resolver_balance(),
            U256::from(RESOLVER_SAT + MAKING - SIMULATED_UTXO_FEE)
        );
        let funding = order.src_deploy_tx_ref.clone().unwrap();
        assert_eq!(
            h.utxo.htlc(&funding).unwrap().spent_by,
            done.src_withdraw_tx_ref
        );
    }

    #[tokio::test]
    async fn test_script_not_claimable_by_resolver_is_rejected() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x7c; 32]);
        let mut order = utxo_to_evm_order(&h, &secret);
        // Swap claimer and refunder.
        let script = resolver_core::algorithms::build_claimable_script(
            &resolver_core::algorithms::HtlcParams {
                order_hash: order.hash,
                hash_lock: secret.hash_lock().sha256,
                claim_lock_time: (START_TIME + 10) as u32,
                refund_lock_time: (START_TIME + 121) as u32,
                claimer: maker_key(),
                refunder: resolver_key(),
            },
        )
        .unwrap();
        order.htlc_script = Some(HexBytes(script.to_bytes()));
        h.submit(&order).await;

        let err = h.service.create_escrows(&order.hash).await.unwrap_err();
        assert!(matches!(err, ResolverError::InvalidScriptParameters(_)));
        assert_eq!(h.evm.calls("deploy_dst_escrow"), 0);
        let stored = h.service.get_order(&order.hash).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Created);
    }

    #[tokio::test]
    async fn test_script_for_other_secret_is_rejected() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x7c; 32]);
        let mut order = utxo_to_evm_order(&h, &secret);
        order.htlc_script = Some(HexBytes(maker_htlc(
            order.hash,
            &SecureSecret::new([0x7d; 32]),
            START_TIME,
        )));
        h.submit(&order).await;

        let err = h.service.create_escrows(&order.hash).await.unwrap_err();
        assert!(matches!(err, ResolverError::InvalidScriptParameters(_)));
    }

    #[tokio::test]
    async fn test_dst_deploy_without_funds_is_insufficient_funds() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x7c; 32]);
        let mut order = utxo_to_evm_order(&h, &secret);
        order.taking_amount = U256::from(RESOLVER_WEI);
        h.submit(&order).await;

        let err = h.service.create_escrows(&order.hash).await.unwrap_err();
        assert!(matches!(err, ResolverError::InsufficientFunds { .. }));
        let stored = h.service.get_order(&order.hash).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Created);
        assert!(stored.dst_deploy_tx_ref.is_none());
    }

    /// Create escrows for `order` and expect the maker's HTLC to be refused
    /// before any resolver funds move.
    async fn assert_src_htlc_rejected(h: &Harness, order: &resolver_core::domain::Order) {
        h.submit(order).await;
        let err = h.service.create_escrows(&order.hash).await.unwrap_err();
        assert!(
            matches!(err, ResolverError::InvalidScriptParameters(_)),
            "unexpected {:?}",
            err
        );
        assert_eq!(h.evm.calls("deploy_dst_escrow"), 0);
        assert_eq!(h.evm.resolver_balance(), U256::from(RESOLVER_WEI));
        let stored = h.service.get_order(&order.hash).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Created);
        assert!(stored.src_immutables.is_none());
    }

    #[tokio::test]
    async fn test_underfunded_src_htlc_is_rejected() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x7c; 32]);
        let script = maker_htlc(utxo_order_hash(), &secret, h.now());
        let order = utxo_to_evm_order_funding(&h, &secret, script, 1);
        assert_src_htlc_rejected(&h, &order).await;
    }

    #[tokio::test]
    async fn test_overfunded_src_htlc_records_output_value() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x7c; 32]);
        let script = maker_htlc(utxo_order_hash(), &secret, h.now());
        let order = utxo_to_evm_order_funding(&h, &secret, script, MAKING + 5);
        h.submit(&order).await;

        let created = h.service.create_escrows(&order.hash).await.unwrap();
        assert_eq!(created.status, OrderStatus::EscrowCreated);
        // The source escrow records what the output actually holds.
        assert_eq!(created.src_immutables.unwrap().amount, U256::from(MAKING + 5));
    }

    #[tokio::test]
    async fn test_funding_paying_another_script_is_rejected() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x7c; 32]);
        // The maker pays a script for some other order and secret...
        let unrelated = maker_htlc(
            Hash::repeat_byte(0x01),
            &SecureSecret::new([0x02; 32]),
            h.now(),
        );
        let mut order = utxo_to_evm_order_funding(&h, &secret, unrelated, MAKING);
        // ...but presents a well-formed script for this one.
        order.htlc_script = Some(HexBytes(maker_htlc(order.hash, &secret, h.now())));
        assert_src_htlc_rejected(&h, &order).await;
    }

    #[tokio::test]
    async fn test_src_refund_before_dst_cancellation_is_rejected() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x7c; 32]);
        let now = h.now();
        // Refund would open at +11 while the dst escrow stays locked to +101.
        let script = maker_htlc_with_lock_times(utxo_order_hash(), &secret, now + 10, now + 11);
        let order = utxo_to_evm_order_funding(&h, &secret, script, MAKING);
        assert_src_htlc_rejected(&h, &order).await;
    }

    #[tokio::test]
    async fn test_src_claim_after_withdrawal_window_is_rejected() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x7c; 32]);
        let now = h.now();
        let script = maker_htlc_with_lock_times(utxo_order_hash(), &secret, now + 60, now + 121);
        let order = utxo_to_evm_order_funding(&h, &secret, script, MAKING);
        assert_src_htlc_rejected(&h, &order).await;
    }
}
