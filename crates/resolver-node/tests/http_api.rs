//! HTTP surface against a simulated container.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use primitive_types::{H160, U256};
use resolver_core::adapters::{simulated_fill, InMemoryOrderStore};
use resolver_core::algorithms::addressing::format_evm_address;
use resolver_core::domain::{
    DstImmutablesComplement, Hash, Order, OrderBuilder, SecretRevealed, SecureSecret,
    TimeLockSchedule,
};
use resolver_core::ports::ManualTimeSource;
use resolver_core::OrchestratorConfig;
use resolver_node::api;
use resolver_node::container::{ResolverContainer, SimulatedLedgers, SimulationConfig};
use serde_json::Value;
use tower::ServiceExt;

/// Secp256k1 generator point, compressed.
const USER_KEY: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

fn maker() -> H160 {
    H160::repeat_byte(0xaa)
}

fn order(secret: &SecureSecret, simulation: &SimulationConfig) -> Order {
    let complement = DstImmutablesComplement {
        maker: H160::zero(),
        amount: U256::from(9_999u64),
        token: H160::zero(),
        safety_deposit: U256::zero(),
        chain_id: U256::from(simulation.utxo_chain_id),
    };
    OrderBuilder::new(
        Hash::repeat_byte(0x42),
        secret.hash_lock(),
        simulation.evm_chain_id,
        simulation.utxo_chain_id,
    )
    .maker(format_evm_address(maker()), "bcrt1quser")
    .amounts(U256::from(10_000u64), U256::from(9_999u64))
    .schedule(TimeLockSchedule {
        src_withdrawal: 10,
        src_public_withdrawal: 120,
        src_cancellation: 121,
        src_public_cancellation: 122,
        dst_withdrawal: 10,
        dst_public_withdrawal: 100,
        dst_cancellation: 101,
    })
    .btc_user_key(hex::decode(USER_KEY).unwrap())
    .src_fill(simulated_fill(&complement))
    .build()
}

async fn setup(secret: &SecureSecret) -> (Router, Order, SimulatedLedgers) {
    resolver_telemetry::register_metrics().unwrap();
    let simulation = SimulationConfig {
        funded_accounts: vec![maker()],
        ..Default::default()
    };
    let order = order(secret, &simulation);
    let store = Arc::new(InMemoryOrderStore::with_orders([order.clone()]));
    let container = ResolverContainer::simulated(
        &simulation,
        OrchestratorConfig::default(),
        store,
        Arc::new(ManualTimeSource::new(1_700_000_000)),
    )
    .await
    .unwrap();
    let ledgers = container.simulated_ledgers().cloned().unwrap();
    (api::router(container.api()), order, ledgers)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (router, _, _) = setup(&SecureSecret::new([1u8; 32])).await;
    let (status, body) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_order_lookup_errors() {
    let (router, _, _) = setup(&SecureSecret::new([1u8; 32])).await;

    let (status, body) = send(&router, get("/orders/0x1234")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let unknown = format!("/orders/0x{}", "99".repeat(32));
    let (status, body) = send(&router, get(&unknown)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "order_not_found");
}

#[tokio::test]
async fn test_create_escrows_then_reject_wrong_secret() {
    let secret = SecureSecret::new([1u8; 32]);
    let (router, order, ledgers) = setup(&secret).await;
    let path = format!("/orders/{:#x}", order.hash);

    let (status, body) = send(&router, post_json(&format!("{}/escrows", path), vec![])).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "escrow_created");
    let created: Order = serde_json::from_value(body).unwrap();
    let funding = created.dst_deploy_tx_ref.clone().unwrap();
    assert_eq!(ledgers.utxo.htlc(&funding).map(|h| h.amount), Some(9_999));

    let payload = SecretRevealed {
        order_hash: created.hash,
        hash_lock: created.hash_lock,
        src_chain_id: created.src_chain_id,
        dst_chain_id: created.dst_chain_id,
        src_escrow_address: created.src_escrow_address.clone().unwrap(),
        dst_escrow_address: created.dst_escrow_address.clone().unwrap(),
        src_immutables: created.src_immutables.unwrap(),
        dst_immutables: created.dst_immutables.unwrap(),
        secret: SecureSecret::new([2u8; 32]),
        htlc_script: created.htlc_script.clone(),
    };
    let (status, body) = send(
        &router,
        post_json("/relay/secret", serde_json::to_vec(&payload).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "secret_mismatch");

    let (_, body) = send(&router, get(&path)).await;
    assert_eq!(body["status"], "escrow_created");
}

#[tokio::test]
async fn test_list_and_metrics() {
    let (router, _, _) = setup(&SecureSecret::new([1u8; 32])).await;
    let (status, body) = send(&router, get("/orders")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let response = router.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
