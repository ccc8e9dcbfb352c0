//! Re-entry after partial failure, idempotency and concurrent callers.

#[cfg(test)]
mod tests {
    use primitive_types::U256;
    use resolver_core::domain::{OrderStatus, ResolverError, SecureSecret};
    use resolver_core::ports::ResolverApi;

    use crate::fixtures::*;

    #[tokio::test]
    async fn test_dst_deploy_failure_resumes_without_redoing_src() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x31; 32]);
        let order = utxo_to_evm_order(&h, &secret);
        h.submit(&order).await;

        h.evm
            .fail_next("deploy_dst_escrow", ResolverError::Rpc("connection reset".into()));
        let err = h.service.create_escrows(&order.hash).await.unwrap_err();
        assert!(matches!(err, ResolverError::Rpc(_)));

        let partial = h.service.get_order(&order.hash).await.unwrap();
        assert_eq!(partial.status, OrderStatus::Created);
        assert!(partial.src_immutables.is_some());
        assert!(partial.dst_immutables.is_none());

        let created = h.service.create_escrows(&order.hash).await.unwrap();
        assert_eq!(created.status, OrderStatus::EscrowCreated);
        assert_eq!(created.src_immutables, partial.src_immutables);
        assert_eq!(h.utxo.calls("wait_for_confirmation"), 1);
        assert_eq!(h.evm.calls("deploy_dst_escrow"), 2);
    }

    #[tokio::test]
    async fn test_dst_funding_failure_keeps_src_escrow() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x32; 32]);
        let order = evm_to_utxo_order(&secret);
        h.submit(&order).await;

        h.utxo.fail_next(
            "fund_htlc",
            ResolverError::InsufficientFunds {
                required: "10499".into(),
                available: "0".into(),
            },
        );
        let err = h.service.create_escrows(&order.hash).await.unwrap_err();
        assert_eq!(err.kind(), "insufficient_funds");

        let partial = h.service.get_order(&order.hash).await.unwrap();
        assert_eq!(partial.status, OrderStatus::Created);
        assert!(partial.src_deploy_tx_ref.is_some());
        assert!(partial.dst_deploy_tx_ref.is_none());

        let created = h.service.create_escrows(&order.hash).await.unwrap();
        assert_eq!(created.status, OrderStatus::EscrowCreated);
        assert_eq!(created.src_deploy_tx_ref, partial.src_deploy_tx_ref);
        assert_eq!(h.evm.calls("deploy_src_escrow"), 1);
        assert_eq!(h.utxo.calls("fund_htlc"), 2);
    }

    #[tokio::test]
    async fn test_src_redeem_failure_does_not_repeat_dst_withdraw() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x33; 32]);
        let order = utxo_to_evm_order(&h, &secret);
        h.submit(&order).await;
        h.service.create_escrows(&order.hash).await.unwrap();
        h.clock.advance(10);

        h.utxo
            .fail_next("redeem_htlc", ResolverError::Rpc("503 from esplora".into()));
        h.service.withdraw(&order.hash, &secret).await.unwrap_err();

        let partial = h.service.get_order(&order.hash).await.unwrap();
        assert_eq!(partial.status, OrderStatus::EscrowCreated);
        assert!(partial.dst_withdraw_tx_ref.is_some());
        assert!(partial.src_withdraw_tx_ref.is_none());

        let done = h.service.withdraw(&order.hash, &secret).await.unwrap();
        assert_eq!(done.status, OrderStatus::WithdrawCompleted);
        assert_eq!(done.dst_withdraw_tx_ref, partial.dst_withdraw_tx_ref);
        assert_eq!(h.evm.calls("withdraw"), 1);
        assert_eq!(h.utxo.calls("redeem_htlc"), 2);
    }

    #[tokio::test]
    async fn test_create_escrows_is_idempotent() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x34; 32]);
        let order = evm_to_utxo_order(&secret);
        h.submit(&order).await;

        let first = h.service.create_escrows(&order.hash).await.unwrap();
        let calls = h.ledger_calls();
        let second = h.service.create_escrows(&order.hash).await.unwrap();

        assert_eq!(h.ledger_calls(), calls);
        assert_eq!(first.src_deploy_tx_ref, second.src_deploy_tx_ref);
        assert_eq!(first.dst_deploy_tx_ref, second.dst_deploy_tx_ref);
    }

    #[tokio::test]
    async fn test_withdraw_after_completion_is_noop() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x35; 32]);
        let order = utxo_to_evm_order(&h, &secret);
        h.submit(&order).await;
        h.service.create_escrows(&order.hash).await.unwrap();
        h.clock.advance(10);
        let done = h.service.withdraw(&order.hash, &secret).await.unwrap();

        let calls = h.ledger_calls();
        let again = h.service.withdraw(&order.hash, &secret).await.unwrap();
        assert_eq!(h.ledger_calls(), calls);
        assert_eq!(again.src_withdraw_tx_ref, done.src_withdraw_tx_ref);
    }

    #[tokio::test]
    async fn test_wrong_secret_leaves_order_untouched() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x36; 32]);
        let order = utxo_to_evm_order(&h, &secret);
        h.submit(&order).await;
        h.service.create_escrows(&order.hash).await.unwrap();
        h.clock.advance(10);

        let before = h.service.get_order(&order.hash).await.unwrap();
        let calls = h.ledger_calls();
        let err = h
            .service
            .withdraw(&order.hash, &SecureSecret::new([0x37; 32]))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::SecretMismatch));
        assert_eq!(h.ledger_calls(), calls);
        assert_eq!(h.service.get_order(&order.hash).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_withdraw_before_escrows_is_invalid_transition() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x38; 32]);
        let order = evm_to_utxo_order(&secret);
        h.submit(&order).await;

        let err = h.service.withdraw(&order.hash, &secret).await.unwrap_err();
        assert!(matches!(err, ResolverError::InvalidTransition { .. }));
        assert_eq!(h.ledger_calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_create_escrows_deploys_once() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x39; 32]);
        let order = evm_to_utxo_order(&secret);
        h.submit(&order).await;

        let (a, b) = tokio::join!(
            h.service.create_escrows(&order.hash),
            h.service.create_escrows(&order.hash)
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.src_deploy_tx_ref, b.src_deploy_tx_ref);
        assert_eq!(h.evm.calls("deploy_src_escrow"), 1);
        assert_eq!(h.utxo.calls("fund_htlc"), 1);
    }

    fn timeout(tx_ref: &str) -> ResolverError {
        ResolverError::ConfirmationTimeout {
            tx_ref: tx_ref.to_string(),
            waited_secs: 300,
        }
    }

    #[tokio::test]
    async fn test_dst_deploy_timeout_waits_on_recorded_tx() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x41; 32]);
        let order = utxo_to_evm_order(&h, &secret);
        h.submit(&order).await;

        // Broadcast succeeds, the receipt does not show up in time.
        h.evm.fail_next("wait_for_confirmation", timeout("dst deploy"));
        let err = h.service.create_escrows(&order.hash).await.unwrap_err();
        assert!(matches!(err, ResolverError::ConfirmationTimeout { .. }));

        let partial = h.service.get_order(&order.hash).await.unwrap();
        assert_eq!(partial.status, OrderStatus::Created);
        assert!(partial.dst_deploy_tx_ref.is_some());
        assert!(partial.dst_immutables.is_none());

        let created = h.service.create_escrows(&order.hash).await.unwrap();
        assert_eq!(created.status, OrderStatus::EscrowCreated);
        assert_eq!(created.dst_deploy_tx_ref, partial.dst_deploy_tx_ref);
        assert_eq!(h.evm.calls("deploy_dst_escrow"), 1);
        assert_eq!(
            h.evm.resolver_balance(),
            U256::from(RESOLVER_WEI - TAKING - SAFETY_DEPOSIT)
        );
    }

    #[tokio::test]
    async fn test_src_deploy_timeout_reads_event_from_recorded_tx() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x42; 32]);
        let order = evm_to_utxo_order(&secret);
        h.submit(&order).await;

        h.evm.fail_next("src_deployment", timeout("src deploy"));
        h.service.create_escrows(&order.hash).await.unwrap_err();
        let partial = h.service.get_order(&order.hash).await.unwrap();
        assert!(partial.src_deploy_tx_ref.is_some());
        assert!(partial.src_immutables.is_none());

        let created = h.service.create_escrows(&order.hash).await.unwrap();
        assert_eq!(created.src_deploy_tx_ref, partial.src_deploy_tx_ref);
        assert!(created.src_immutables.is_some());
        assert_eq!(h.evm.calls("deploy_src_escrow"), 1);
        assert_eq!(h.evm.calls("src_deployment"), 2);
        assert_eq!(h.evm.account_balance(maker_evm()), U256::from(MAKER_WEI - MAKING));
    }

    #[tokio::test]
    async fn test_withdraw_timeout_waits_on_recorded_tx() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x43; 32]);
        let order = utxo_to_evm_order(&h, &secret);
        h.submit(&order).await;
        h.service.create_escrows(&order.hash).await.unwrap();
        h.clock.advance(10);

        h.evm.fail_next("wait_for_confirmation", timeout("dst withdraw"));
        h.service.withdraw(&order.hash, &secret).await.unwrap_err();
        let partial = h.service.get_order(&order.hash).await.unwrap();
        assert!(partial.dst_withdraw_tx_ref.is_some());
        assert!(partial.src_withdraw_tx_ref.is_none());

        let done = h.service.withdraw(&order.hash, &secret).await.unwrap();
        assert_eq!(done.status, OrderStatus::WithdrawCompleted);
        assert_eq!(done.dst_withdraw_tx_ref, partial.dst_withdraw_tx_ref);
        assert_eq!(h.evm.calls("withdraw"), 1);
        assert_eq!(h.evm.account_balance(maker_evm()), U256::from(MAKER_WEI + TAKING));
    }

    #[tokio::test]
    async fn test_reverted_dst_deploy_is_submitted_again() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x44; 32]);
        let order = utxo_to_evm_order(&h, &secret);
        h.submit(&order).await;

        h.evm.fail_next(
            "wait_for_confirmation",
            ResolverError::RevertedExecution("out of gas".into()),
        );
        let err = h.service.create_escrows(&order.hash).await.unwrap_err();
        assert!(matches!(err, ResolverError::RevertedExecution(_)));
        let partial = h.service.get_order(&order.hash).await.unwrap();
        assert!(partial.dst_deploy_tx_ref.is_none());

        let created = h.service.create_escrows(&order.hash).await.unwrap();
        assert_eq!(created.status, OrderStatus::EscrowCreated);
        assert_eq!(h.evm.calls("deploy_dst_escrow"), 2);
    }

    #[tokio::test]
    async fn test_unknown_htlc_funding_is_never_rebuilt() {
        let h = Harness::new();
        let secret = SecureSecret::new([0x45; 32]);
        let order = evm_to_utxo_order(&secret);
        h.submit(&order).await;

        let txid = "ab".repeat(32);
        h.utxo.fail_next("fund_htlc", timeout(&txid));
        let err = h.service.create_escrows(&order.hash).await.unwrap_err();
        assert!(matches!(err, ResolverError::ConfirmationTimeout { .. }));

        let partial = h.service.get_order(&order.hash).await.unwrap();
        assert_eq!(partial.dst_deploy_tx_ref.as_deref(), Some(txid.as_str()));
        assert!(partial.htlc_script.is_some());

        // The node never saw it: the order stays put rather than funding again.
        let err = h.service.create_escrows(&order.hash).await.unwrap_err();
        assert!(matches!(err, ResolverError::ConfirmationTimeout { .. }));
        assert_eq!(h.utxo.calls("fund_htlc"), 1);
        assert_eq!(h.utxo.resolver_balance(), U256::from(RESOLVER_SAT));
        let stored = h.service.get_order(&order.hash).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Created);
    }
}
