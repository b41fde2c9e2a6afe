//! End-to-end correlation tests over a channel-backed mock transport.
//!
//! The mock records every write and lets the test inject native transport
//! events, which is enough to exercise the full dispatch path: payload build,
//! listener registration, write, pump routing, settlement, cleanup.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::sleep;

use conduit_provider::prelude::*;
use conduit_provider::{TransportEvent, TransportEventReceiver};

/// Test handle for driving the mock from outside the provider
struct MockHandle {
    writes: Arc<parking_lot::Mutex<Vec<Value>>>,
    fail_writes: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl MockHandle {
    fn respond(&self, id: u64, result: Value) {
        self.inject_message(json!({"jsonrpc": "2.0", "id": id, "result": result}));
    }

    fn inject_message(&self, body: Value) {
        self.events
            .send(TransportEvent::Message {
                meta: json!("framing-junk"),
                body,
            })
            .unwrap();
    }

    async fn wait_for_writes(&self, n: usize) -> Vec<Value> {
        for _ in 0..200 {
            if self.writes.lock().len() >= n {
                return self.writes.lock().clone();
            }
            sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {} writes, saw {:?}", n, self.writes.lock());
    }

    /// Correlation id the provider assigned to the write for `method`
    fn id_of(&self, method: &str) -> u64 {
        self.writes
            .lock()
            .iter()
            .find(|w| w["method"] == method)
            .and_then(|w| w["id"].as_u64())
            .unwrap_or_else(|| panic!("no write for method {}", method))
    }
}

struct MockTransport {
    writes: Arc<parking_lot::Mutex<Vec<Value>>>,
    fail_writes: Arc<AtomicBool>,
    stream: Option<TransportEventReceiver>,
    connected: bool,
}

impl MockTransport {
    fn create() -> (BoxedTransport, MockHandle) {
        let writes = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let fail_writes = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::unbounded_channel();

        let transport = MockTransport {
            writes: Arc::clone(&writes),
            fail_writes: Arc::clone(&fail_writes),
            stream: Some(rx),
            connected: true,
        };
        let handle = MockHandle {
            writes,
            fail_writes,
            events: tx,
        };
        (Box::new(transport), handle)
    }
}

#[async_trait]
impl SocketTransport for MockTransport {
    async fn send(&mut self, body: Value) -> Result<(), TransportError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::Write("injected write failure".into()));
        }
        self.writes.lock().push(body);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn start_event_listener(&mut self) -> Result<TransportEventReceiver, TransportError> {
        self.stream.take().ok_or(TransportError::Closed)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn started_provider() -> (Arc<SocketProvider>, MockHandle) {
    init_tracing();
    let (transport, handle) = MockTransport::create();
    let provider = Arc::new(SocketProvider::new(transport));
    provider.start().await.unwrap();
    (provider, handle)
}

#[tokio::test]
async fn out_of_order_responses_settle_their_own_calls() {
    let (provider, handle) = started_provider().await;

    let a = tokio::spawn({
        let p = Arc::clone(&provider);
        async move { p.call("method_a", vec![]).await }
    });
    let b = tokio::spawn({
        let p = Arc::clone(&provider);
        async move { p.call("method_b", vec![]).await }
    });
    let c = tokio::spawn({
        let p = Arc::clone(&provider);
        async move { p.call("method_c", vec![]).await }
    });

    handle.wait_for_writes(3).await;
    assert_eq!(provider.pending_requests(), 3);

    // Deliver in the order c, a, b; each call must still get its own.
    handle.respond(handle.id_of("method_c"), json!("rc"));
    handle.respond(handle.id_of("method_a"), json!("ra"));
    handle.respond(handle.id_of("method_b"), json!("rb"));

    assert_eq!(a.await.unwrap().unwrap(), json!("ra"));
    assert_eq!(b.await.unwrap().unwrap(), json!("rb"));
    assert_eq!(c.await.unwrap().unwrap(), json!("rc"));
    assert_eq!(provider.pending_requests(), 0);
}

#[tokio::test]
async fn listener_is_gone_after_settlement() {
    let (provider, handle) = started_provider().await;

    let forwarded = Arc::new(AtomicUsize::new(0));
    let forwarded_clone = Arc::clone(&forwarded);
    provider.events().on_message(move |_| {
        forwarded_clone.fetch_add(1, Ordering::SeqCst);
    });

    let call = tokio::spawn({
        let p = Arc::clone(&provider);
        async move { p.call("eth_blockNumber", vec![]).await }
    });

    handle.wait_for_writes(1).await;
    let id = handle.id_of("eth_blockNumber");
    handle.respond(id, json!("0x10"));
    assert_eq!(call.await.unwrap().unwrap(), json!("0x10"));
    assert_eq!(provider.pending_requests(), 0);

    // A second response under the same id matches nothing and is forwarded
    // outward as a plain message.
    handle.respond(id, json!("0x11"));
    for _ in 0..200 {
        if forwarded.load(Ordering::SeqCst) == 1 {
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(forwarded.load(Ordering::SeqCst), 1);
    assert_eq!(provider.pending_requests(), 0);
}

#[tokio::test]
async fn framing_argument_is_never_observed() {
    let (provider, handle) = started_provider().await;

    let messages = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let messages_clone = Arc::clone(&messages);
    provider.events().on_message(move |payload| {
        messages_clone.lock().push(payload);
    });

    let call = tokio::spawn({
        let p = Arc::clone(&provider);
        async move { p.call("net_version", vec![]).await }
    });

    handle.wait_for_writes(1).await;
    handle.respond(handle.id_of("net_version"), json!("ok"));

    assert_eq!(call.await.unwrap().unwrap(), json!("ok"));
    // The matched response resolved the call; the framing meta went nowhere.
    assert!(messages.lock().is_empty());
}

#[tokio::test]
async fn write_failure_rejects_and_cleans_up() {
    let (provider, handle) = started_provider().await;
    handle.fail_writes.store(true, Ordering::SeqCst);

    let err = provider.call("eth_accounts", vec![]).await.unwrap_err();
    assert!(err.is_transport_error());
    assert_eq!(provider.pending_requests(), 0);
}

#[tokio::test]
async fn error_event_settles_no_pending_call() {
    let (provider, handle) = started_provider().await;

    let errors = Arc::new(AtomicUsize::new(0));
    let errors_clone = Arc::clone(&errors);
    provider.events().on_error(move |_| {
        errors_clone.fetch_add(1, Ordering::SeqCst);
    });

    let call = tokio::spawn({
        let p = Arc::clone(&provider);
        async move { p.call("eth_syncing", vec![]).await }
    });

    handle.wait_for_writes(1).await;
    handle
        .events
        .send(TransportEvent::Error("socket hiccup".into()))
        .unwrap();

    for _ in 0..200 {
        if errors.load(Ordering::SeqCst) == 1 {
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    // The call is still pending; only a matching response settles it.
    assert_eq!(provider.pending_requests(), 1);

    handle.respond(handle.id_of("eth_syncing"), json!(false));
    assert_eq!(call.await.unwrap().unwrap(), json!(false));
}

#[tokio::test]
async fn rpc_error_rejects_with_structured_error() {
    let (provider, handle) = started_provider().await;

    let call = tokio::spawn({
        let p = Arc::clone(&provider);
        async move { p.call("eth_sendRawTransaction", vec![json!("0x00")]).await }
    });

    handle.wait_for_writes(1).await;
    handle.inject_message(json!({
        "jsonrpc": "2.0",
        "id": handle.id_of("eth_sendRawTransaction"),
        "error": {"code": -32000, "message": "nonce too low", "data": {"nonce": 4}}
    }));

    let err = call.await.unwrap().unwrap_err();
    assert_eq!(err.rpc_code(), Some(-32000));
    assert!(err.to_string().contains("nonce too low"));
    assert_eq!(provider.pending_requests(), 0);
}

#[tokio::test]
async fn malformed_response_rejects_instead_of_resolving_null() {
    let (provider, handle) = started_provider().await;

    let call = tokio::spawn({
        let p = Arc::clone(&provider);
        async move { p.call("eth_chainId", vec![]).await }
    });

    handle.wait_for_writes(1).await;
    handle.inject_message(json!({"jsonrpc": "2.0", "id": handle.id_of("eth_chainId")}));

    let err = call.await.unwrap().unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(_)));
    assert_eq!(provider.pending_requests(), 0);
}

#[tokio::test]
async fn batch_is_one_ordered_write_with_hooks_run_once() {
    let (provider, handle) = started_provider().await;

    let hook_runs = Arc::new(AtomicUsize::new(0));
    let first = BatchCall::new("method_a", vec![]).with_hook({
        let runs = Arc::clone(&hook_runs);
        move |call| {
            runs.fetch_add(1, Ordering::SeqCst);
            call.params.push(json!("latest"));
        }
    });
    let second = BatchCall::new("method_b", vec![json!(1)]).with_hook({
        let runs = Arc::clone(&hook_runs);
        move |_| {
            runs.fetch_add(1, Ordering::SeqCst);
        }
    });

    let batch = tokio::spawn({
        let p = Arc::clone(&provider);
        async move { p.send_batch(vec![first, second]).await }
    });

    let writes = handle.wait_for_writes(1).await;
    assert_eq!(writes.len(), 1, "batch must be a single transport write");

    let body = writes[0].as_array().expect("batch body is an array");
    assert_eq!(body.len(), 2);
    assert_eq!(body[0]["method"], "method_a");
    assert_eq!(body[0]["params"], json!(["latest"]));
    assert_eq!(body[1]["method"], "method_b");
    assert_eq!(hook_runs.load(Ordering::SeqCst), 2);

    let first_id = body[0]["id"].as_u64().unwrap();
    let second_id = body[1]["id"].as_u64().unwrap();
    let aggregate = json!([
        {"jsonrpc": "2.0", "id": first_id, "result": "a"},
        {"jsonrpc": "2.0", "id": second_id, "result": "b"}
    ]);
    handle.inject_message(aggregate.clone());

    // Raw aggregate, no per-item unwrapping.
    assert_eq!(batch.await.unwrap().unwrap(), aggregate);
    assert_eq!(provider.pending_requests(), 0);
}

#[tokio::test]
async fn batch_settles_when_the_server_reorders_sub_responses() {
    let (provider, handle) = started_provider().await;

    let batch = tokio::spawn({
        let p = Arc::clone(&provider);
        async move {
            p.send_batch(vec![
                BatchCall::new("method_a", vec![]),
                BatchCall::new("method_b", vec![]),
            ])
            .await
        }
    });

    let writes = handle.wait_for_writes(1).await;
    let body = writes[0].as_array().expect("batch body is an array");
    let first_id = body[0]["id"].as_u64().unwrap();
    let second_id = body[1]["id"].as_u64().unwrap();

    // Reply with the sub-responses swapped relative to the request order.
    let aggregate = json!([
        {"jsonrpc": "2.0", "id": second_id, "result": "b"},
        {"jsonrpc": "2.0", "id": first_id, "result": "a"}
    ]);
    handle.inject_message(aggregate.clone());

    assert_eq!(batch.await.unwrap().unwrap(), aggregate);
    assert_eq!(provider.pending_requests(), 0);
}

#[tokio::test]
async fn removing_a_call_listener_cancels_it() {
    let (provider, handle) = started_provider().await;

    let call = tokio::spawn({
        let p = Arc::clone(&provider);
        async move { p.call("eth_getLogs", vec![]).await }
    });

    handle.wait_for_writes(1).await;
    let id = handle.id_of("eth_getLogs");
    provider.remove_listener(CorrelationId::Number(id));

    let err = call.await.unwrap().unwrap_err();
    assert!(matches!(err, ProviderError::ListenerRemoved(_)));
    assert_eq!(provider.pending_requests(), 0);
}

#[tokio::test]
async fn ready_fires_once_for_the_first_network_identity() {
    let (provider, handle) = started_provider().await;

    let ready = Arc::new(AtomicUsize::new(0));
    let network = Arc::new(AtomicUsize::new(0));
    let ready_clone = Arc::clone(&ready);
    provider.events().on_ready(move |_| {
        ready_clone.fetch_add(1, Ordering::SeqCst);
    });
    let network_clone = Arc::clone(&network);
    provider.events().on_network_changed(move |_| {
        network_clone.fetch_add(1, Ordering::SeqCst);
    });

    handle
        .events
        .send(TransportEvent::NetworkChanged(json!("1")))
        .unwrap();
    handle
        .events
        .send(TransportEvent::NetworkChanged(json!("5")))
        .unwrap();

    for _ in 0..200 {
        if network.load(Ordering::SeqCst) == 2 {
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(network.load(Ordering::SeqCst), 2);
    assert_eq!(ready.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn disconnect_detaches_listeners_but_touches_no_transport() {
    let (provider, handle) = started_provider().await;

    let messages = Arc::new(AtomicUsize::new(0));
    let messages_clone = Arc::clone(&messages);
    provider.events().on_message(move |_| {
        messages_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert!(provider.disconnect());
    assert!(provider.disconnect(), "disconnect is always successful");

    // Listeners are gone; a push notification goes nowhere.
    handle.inject_message(json!({"method": "eth_subscription", "params": {}}));
    sleep(Duration::from_millis(50)).await;
    assert_eq!(messages.load(Ordering::SeqCst), 0);

    // The transport itself was never torn down.
    assert!(provider.connected().await);
}

#[tokio::test]
async fn accounts_changed_passes_the_address_list_through() {
    let (provider, handle) = started_provider().await;

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    provider.events().on_accounts_changed(move |accounts| {
        seen_clone.lock().push(accounts);
    });

    handle
        .events
        .send(TransportEvent::AccountsChanged(vec![
            "0xabc".into(),
            "0xdef".into(),
        ]))
        .unwrap();

    for _ in 0..200 {
        if !seen.lock().is_empty() {
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(
        *seen.lock(),
        vec![vec!["0xabc".to_string(), "0xdef".to_string()]]
    );
}
