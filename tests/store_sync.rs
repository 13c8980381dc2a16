use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio_test::{assert_pending, assert_ready};

use harvest_sync::entities::{Client, ClientDraft, Worker, WorkerDraft};
use harvest_sync::gateway::invoke_typed;
use harvest_sync::{
    DeletePolicy, EntityStore, EventBus, GatewayCall, GatewayError, InMemoryBackend, RemoteGateway,
};

type Answer = Result<Value, GatewayError>;

enum Scripted {
    Ready(Answer),
    Gated(oneshot::Receiver<Answer>),
}

/// Gateway answering from per-command queues of canned or gated responses
struct ScriptedGateway {
    responses: Arc<Mutex<HashMap<String, VecDeque<Scripted>>>>,
    calls: Arc<Mutex<Vec<GatewayCall>>>,
}

impl ScriptedGateway {
    fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn answer(&self, command: &str, answer: Answer) {
        self.responses
            .lock()
            .await
            .entry(command.to_string())
            .or_default()
            .push_back(Scripted::Ready(answer));
    }

    /// Queue a response that settles only when the returned sender fires
    async fn gate(&self, command: &str) -> oneshot::Sender<Answer> {
        let (tx, rx) = oneshot::channel();
        self.responses
            .lock()
            .await
            .entry(command.to_string())
            .or_default()
            .push_back(Scripted::Gated(rx));
        tx
    }

    async fn count(&self, command: &str) -> usize {
        self.calls.lock().await.iter().filter(|c| c.command == command).count()
    }
}

#[async_trait]
impl RemoteGateway for ScriptedGateway {
    async fn invoke(&self, call: GatewayCall) -> Result<Value, GatewayError> {
        let command = call.command.clone();
        self.calls.lock().await.push(call);
        let next = self
            .responses
            .lock()
            .await
            .get_mut(&command)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Scripted::Ready(answer)) => answer,
            Some(Scripted::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(GatewayError::Transport("gate dropped".into()))),
            None => Err(GatewayError::UnknownCommand(command)),
        }
    }
}

fn client(id: i32) -> Value {
    json!({ "id": id, "codigo": id * 10, "nombre": format!("cliente {}", id) })
}

fn clients(ids: &[i32]) -> Value {
    Value::Array(ids.iter().map(|id| client(*id)).collect())
}

fn ids(store: &EntityStore<Client>) -> Vec<i32> {
    store.items().iter().map(|c| c.id).collect()
}

async fn loaded(gateway: &Arc<ScriptedGateway>, policy: DeletePolicy, rows: &[i32]) -> EntityStore<Client> {
    gateway.answer("get_cliente", Ok(clients(rows))).await;
    let store = EntityStore::with_policy(gateway.clone(), EventBus::default(), policy);
    store.fetch_all().await.unwrap();
    store
}

#[tokio::test]
async fn test_cache_matches_backend_after_every_mutation() {
    let backend = Arc::new(InMemoryBackend::new());
    let store: EntityStore<Worker> = EntityStore::new(backend.clone(), EventBus::default());
    let hired = chrono::NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();

    let drafts = vec![
        WorkerDraft::new("Ana", 24, hired),
        WorkerDraft::new("Luis", 51, hired).in_crew(2),
        WorkerDraft::new("Marta", 38, hired),
    ];

    for draft in drafts {
        store.add(draft).await.unwrap();
        let truth: Vec<Worker> = invoke_typed(backend.as_ref(), GatewayCall::bare("get_jornaleros"))
            .await
            .unwrap();
        assert_eq!(store.items(), truth);
    }

    let first = store.items()[0].id;
    store.update(first, WorkerDraft::new("Ana María", 25, hired)).await.unwrap();
    let truth: Vec<Worker> = invoke_typed(backend.as_ref(), GatewayCall::bare("get_jornaleros"))
        .await
        .unwrap();
    assert_eq!(store.items(), truth);
    assert_eq!(store.find(first).unwrap().name, "Ana María");
}

#[tokio::test]
async fn test_delete_removes_row_before_backend_answers() {
    let gateway = Arc::new(ScriptedGateway::new());
    let store = loaded(&gateway, DeletePolicy::Optimistic, &[1, 2]).await;

    let confirm = gateway.gate("delete_cliente").await;
    gateway.answer("get_cliente", Ok(clients(&[1]))).await;

    let mut delete = tokio_test::task::spawn(store.delete(2));
    assert_eq!(ids(&store), vec![1, 2]);

    assert_pending!(delete.poll());
    assert_eq!(ids(&store), vec![1]);
    assert!(store.loading());
    assert_eq!(gateway.count("delete_cliente").await, 1);

    confirm.send(Ok(json!("Cliente eliminado"))).unwrap();
    let receipt = assert_ready!(delete.poll()).unwrap();
    assert_eq!(receipt.message(), Some("Cliente eliminado"));
    assert!(!store.loading());
    assert_eq!(store.error(), None);
}

#[tokio::test]
async fn test_dropped_delete_never_diverges_from_backend() {
    let gateway = Arc::new(ScriptedGateway::new());
    let store = loaded(&gateway, DeletePolicy::Optimistic, &[1]).await;

    drop(store.delete(1));

    assert_eq!(ids(&store), vec![1]);
    assert_eq!(gateway.count("delete_cliente").await, 0);
    assert_eq!(store.error(), None);
    assert!(!store.loading());
}

#[tokio::test]
async fn test_conservative_delete_keeps_row_while_pending() {
    let gateway = Arc::new(ScriptedGateway::new());
    let store = loaded(&gateway, DeletePolicy::Conservative, &[1, 2]).await;

    let confirm = gateway.gate("delete_cliente").await;
    gateway.answer("get_cliente", Ok(clients(&[1]))).await;

    let mut delete = tokio_test::task::spawn(store.delete(2));
    assert_pending!(delete.poll());
    assert_eq!(ids(&store), vec![1, 2]);

    confirm.send(Ok(json!("ok"))).unwrap();
    assert_ready!(delete.poll()).unwrap();
    assert_eq!(ids(&store), vec![1]);
}

#[tokio::test]
async fn test_failed_delete_converges_to_backend_state() {
    let gateway = Arc::new(ScriptedGateway::new());
    let store = loaded(&gateway, DeletePolicy::Optimistic, &[1, 2]).await;

    // The backend rejected the delete but another operator added a client.
    gateway
        .answer("delete_cliente", Err(GatewayError::Rejected("Cliente con producción".into())))
        .await;
    gateway.answer("get_cliente", Ok(clients(&[1, 2, 3]))).await;

    let err = store.delete(2).await.unwrap_err();
    assert_eq!(err.to_string(), "Cliente con producción");
    assert_eq!(ids(&store), vec![1, 2, 3]);
    assert_eq!(store.error().as_deref(), Some("Cliente con producción"));
    assert_eq!(gateway.count("get_cliente").await, 2);
}

#[tokio::test]
async fn test_failed_delete_does_not_reinsert_row() {
    let gateway = Arc::new(ScriptedGateway::new());
    let store = loaded(&gateway, DeletePolicy::Optimistic, &[1, 2]).await;

    // The answer was lost in transit after the backend applied the delete.
    gateway
        .answer("delete_cliente", Err(GatewayError::Transport("connection reset".into())))
        .await;
    gateway.answer("get_cliente", Ok(clients(&[1]))).await;

    assert!(store.delete(2).await.is_err());
    assert_eq!(ids(&store), vec![1]);
    assert_eq!(store.error().as_deref(), Some("connection reset"));
}

#[tokio::test]
async fn test_get_by_id_leaves_store_untouched() {
    let gateway = Arc::new(ScriptedGateway::new());
    let store = loaded(&gateway, DeletePolicy::Optimistic, &[1]).await;

    gateway.answer("get_cliente", Err(GatewayError::Transport("offline".into()))).await;
    assert!(store.fetch_all().await.is_err());
    let before = store.snapshot();

    gateway.answer("get_cliente_by_id", Ok(client(7))).await;
    gateway.answer("get_cliente_by_id", Ok(Value::Null)).await;
    gateway
        .answer("get_cliente_by_id", Err(GatewayError::Rejected("boom".into())))
        .await;

    assert_eq!(store.get_by_id(7).await.unwrap().map(|c| c.id), Some(7));
    assert!(store.get_by_id(8).await.unwrap().is_none());
    assert!(store.get_by_id(9).await.is_err());

    let after = store.snapshot();
    assert_eq!(after.error, before.error);
    assert_eq!(after.items, before.items);
    assert!(!after.loading());
    assert!(store.find(7).is_none());
}

#[tokio::test]
async fn test_rejected_add_then_successful_fetch() {
    let gateway = Arc::new(ScriptedGateway::new());
    let store = loaded(&gateway, DeletePolicy::Optimistic, &[1]).await;

    gateway
        .answer("post_cliente", Err(GatewayError::Rejected("Código duplicado".into())))
        .await;
    let err = store.add(ClientDraft::new(10, "cliente 1")).await.unwrap_err();

    assert!(err.is_remote());
    assert_eq!(ids(&store), vec![1]);
    assert_eq!(store.error().as_deref(), Some("Código duplicado"));
    assert_eq!(gateway.count("get_cliente").await, 1);

    gateway.answer("get_cliente", Ok(clients(&[1, 4]))).await;
    store.fetch_all().await.unwrap();
    assert_eq!(store.error(), None);
    assert_eq!(ids(&store), vec![1, 4]);
}

#[tokio::test]
async fn test_resync_failure_keeps_receipt_and_sets_error() {
    let gateway = Arc::new(ScriptedGateway::new());
    let store = loaded(&gateway, DeletePolicy::Optimistic, &[1]).await;

    gateway.answer("post_cliente", Ok(json!("Cliente insertado con ID: 2"))).await;
    gateway.answer("get_cliente", Err(GatewayError::Transport("timeout".into()))).await;

    let receipt = store.add(ClientDraft::new(20, "cliente 2")).await.unwrap();
    assert_eq!(receipt.message(), Some("Cliente insertado con ID: 2"));
    assert_eq!(ids(&store), vec![1]);
    assert_eq!(store.error().as_deref(), Some("timeout"));
}

#[tokio::test]
async fn test_overlapping_adds_keep_loading_until_both_settle() {
    let gateway = Arc::new(ScriptedGateway::new());
    let store = loaded(&gateway, DeletePolicy::Optimistic, &[]).await;

    let first = gateway.gate("post_cliente").await;
    let second = gateway.gate("post_cliente").await;
    gateway.answer("get_cliente", Ok(clients(&[1, 2]))).await;
    gateway.answer("get_cliente", Ok(clients(&[1]))).await;

    let mut add_a = tokio_test::task::spawn(store.add(ClientDraft::new(10, "a")));
    let mut add_b = tokio_test::task::spawn(store.add(ClientDraft::new(20, "b")));
    assert_pending!(add_a.poll());
    assert_pending!(add_b.poll());

    second.send(Ok(json!("b"))).unwrap();
    assert_ready!(add_b.poll()).unwrap();
    assert!(store.loading());

    first.send(Ok(json!("a"))).unwrap();
    assert_ready!(add_a.poll()).unwrap();
    assert!(!store.loading());

    // Whichever resync settled last wins, even if its snapshot is older.
    assert_eq!(ids(&store), vec![1]);
}
