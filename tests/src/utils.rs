use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use grantforge_pipeline::drafts::LocalStore;
use grantforge_pipeline::{
    CallValue, ChainInfo, ContractAddresses, ContractHandle, ContractRegistry, ContractRole,
    DecodedEvent, Error, ExplorerUrls, PendingTransaction, PipelineConfig, PollPolicy, Session,
    SocialLink, TxReceipt, WalletProvider,
};
use grantforge_types::{
    AccessLevel, Address, ChainId, FeedbackItem, FieldKind, FieldMap, GrantField, GrantPayload,
    Member, ReviewSet, Reward, TxHash, Workspace, WorkspaceId,
};

pub const TEST_CHAIN: ChainId = ChainId(137);

/// Opt-in log output: `RUST_LOG=grantforge_pipeline=debug cargo test -- --nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn test_address(byte: u8) -> Address {
    Address::parse(&format!("0x{}", format!("{byte:02x}").repeat(20))).unwrap()
}

/// The account every connected [`MockWallet`] reports.
pub fn test_account() -> Address {
    test_address(0x42)
}

/// The hash every [`MockContract`] broadcast reports.
pub fn test_tx_hash() -> TxHash {
    TxHash::parse(&format!("0x{}", "ab".repeat(32))).unwrap()
}

pub fn receipt_with(events: Vec<(&str, Value)>) -> TxReceipt {
    TxReceipt {
        transaction_hash: test_tx_hash(),
        block_number: 1,
        events: events
            .into_iter()
            .map(|(name, args)| DecodedEvent {
                name: name.to_string(),
                args,
            })
            .collect(),
    }
}

pub fn member(address: Address, level: AccessLevel, key: Option<&str>) -> Member {
    Member {
        actor_id: address,
        access_level: level,
        public_key: key.map(str::to_string),
    }
}

/// Workspace id 7 on the test chain.
pub fn test_workspace(members: Vec<Member>) -> Workspace {
    Workspace {
        id: WorkspaceId::from(7),
        title: "Forge DAO".to_string(),
        chain: TEST_CHAIN,
        members,
        tokens: vec![],
    }
}

/// Fresh secp256k1 keypair; the hex form is what a member publishes.
pub fn sealed_keypair() -> (k256::SecretKey, String) {
    use k256::elliptic_curve::sec1::ToEncodedPoint;
    let secret = k256::SecretKey::random(&mut rand::rngs::OsRng);
    let published = hex::encode(secret.public_key().to_encoded_point(false).as_bytes());
    (secret, published)
}

pub fn workspace_input() -> grantforge_pipeline::actions::CreateWorkspace {
    grantforge_pipeline::actions::CreateWorkspace {
        chain: TEST_CHAIN,
        title: "Forge DAO".to_string(),
        about: "Grants for protocol tooling".to_string(),
        logo: b"\x89PNG fake logo bytes".to_vec(),
        socials: vec![SocialLink {
            name: "twitter".to_string(),
            value: "@forgedao".to_string(),
        }],
    }
}

pub fn grant_payload() -> GrantPayload {
    let mut fields = FieldMap::new();
    insert(&mut fields, "projectName", "Project Name", FieldKind::ShortForm);
    insert(&mut fields, "projectDetails", "Project Details", FieldKind::LongForm);
    insert(&mut fields, "fundingAsk", "Funding Ask", FieldKind::Numeric);
    GrantPayload {
        title: "Open Tooling Round".to_string(),
        summary: "Funding for developer tooling".to_string(),
        details: r#"{"blocks":[]}"#.to_string(),
        deadline: "2024-12-31T00:00:00.000Z".to_string(),
        reward: Reward {
            committed: "2500000".to_string(),
            asset: test_address(0x05),
        },
        fields,
        grant_managers: vec![],
        rubric: None,
    }
}

fn insert(fields: &mut FieldMap, id: &str, title: &str, kind: FieldKind) {
    grantforge_types::insert_field(
        fields,
        id,
        GrantField {
            title: title.to_string(),
            input_type: kind,
            pii: false,
        },
    );
}

pub fn review_set() -> ReviewSet {
    ReviewSet {
        items: vec![
            FeedbackItem {
                rubric_item: "0".to_string(),
                rating: 4,
                comment: "Thorough plan".to_string(),
            },
            FeedbackItem {
                rubric_item: "1".to_string(),
                rating: 3,
                comment: String::new(),
            },
        ],
    }
}

pub fn payout_input() -> grantforge_pipeline::actions::PayoutReviewers {
    grantforge_pipeline::actions::PayoutReviewers {
        chain: None,
        reviewer: test_address(0xbb),
        review_ids: vec!["review-1".to_string(), "review-2".to_string()],
        asset: test_address(0x05),
        amount: 2_500_000,
        mode: grantforge_pipeline::actions::PayoutMode::FromWallet,
    }
}

pub struct MockWallet {
    account: Option<Address>,
    chain: Mutex<Option<ChainId>>,
    switch_requests: Mutex<Vec<ChainId>>,
}

impl MockWallet {
    pub fn connected(chain: ChainId) -> Arc<Self> {
        Arc::new(Self {
            account: Some(test_account()),
            chain: Mutex::new(Some(chain)),
            switch_requests: Mutex::new(Vec::new()),
        })
    }

    pub fn disconnected() -> Arc<Self> {
        Arc::new(Self {
            account: None,
            chain: Mutex::new(None),
            switch_requests: Mutex::new(Vec::new()),
        })
    }

    /// Chains the pipeline asked the wallet to switch to, in order.
    pub fn switch_requests(&self) -> Vec<ChainId> {
        self.switch_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn account(&self) -> Option<Address> {
        self.account.clone()
    }

    async fn chain_id(&self) -> Option<ChainId> {
        *self.chain.lock().unwrap()
    }

    async fn switch_network(&self, chain: ChainId) -> Result<(), Error> {
        self.switch_requests.lock().unwrap().push(chain);
        Ok(())
    }
}

/// What the next broadcast through a [`MockContract`] does.
pub enum CallOutcome {
    Mined(TxReceipt),
    /// Wallet declined to sign; fails at call time.
    Rejected(String),
    /// Mined but execution reverted; fails at confirmation.
    Reverted(String),
    /// Confirmation never resolves. For cancellation tests.
    Stall,
}

pub struct MockContract {
    address: Address,
    bound: bool,
    outcomes: Mutex<VecDeque<CallOutcome>>,
    calls: Mutex<Vec<(String, Vec<CallValue>)>>,
}

impl MockContract {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            address: test_address(0x0c),
            bound: true,
            outcomes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Read-only handle, as before a signer is attached.
    pub fn unbound() -> Arc<Self> {
        Arc::new(Self {
            address: test_address(0x0c),
            bound: false,
            outcomes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Queue the outcome for the next call. Unscripted calls mine an empty
    /// receipt.
    pub fn push_outcome(&self, outcome: CallOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    /// Every `(method, args)` broadcast through this handle, in order.
    pub fn calls(&self) -> Vec<(String, Vec<CallValue>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContractHandle for MockContract {
    fn address(&self) -> Address {
        self.address.clone()
    }

    fn is_bound(&self) -> bool {
        self.bound
    }

    async fn call(
        &self,
        method: &str,
        args: Vec<CallValue>,
    ) -> Result<Box<dyn PendingTransaction>, Error> {
        self.calls.lock().unwrap().push((method.to_string(), args));
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| CallOutcome::Mined(receipt_with(vec![])));
        match outcome {
            CallOutcome::Rejected(reason) => Err(Error::TransactionRejected(reason)),
            other => Ok(Box::new(MockPending { outcome: other })),
        }
    }
}

struct MockPending {
    outcome: CallOutcome,
}

#[async_trait]
impl PendingTransaction for MockPending {
    fn tx_hash(&self) -> TxHash {
        test_tx_hash()
    }

    async fn confirmed(self: Box<Self>) -> Result<TxReceipt, Error> {
        match self.outcome {
            CallOutcome::Mined(receipt) => Ok(receipt),
            CallOutcome::Reverted(reason) => Err(Error::TransactionReverted {
                tx_hash: None,
                reason,
            }),
            CallOutcome::Stall => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            CallOutcome::Rejected(_) => unreachable!("rejections surface at call time"),
        }
    }
}

pub struct MockRegistry {
    contracts: HashMap<(ChainId, ContractRole), Arc<MockContract>>,
}

impl MockRegistry {
    pub fn with(chain: ChainId, role: ContractRole, contract: Arc<MockContract>) -> Arc<Self> {
        let mut contracts = HashMap::new();
        contracts.insert((chain, role), contract);
        Arc::new(Self { contracts })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            contracts: HashMap::new(),
        })
    }
}

impl ContractRegistry for MockRegistry {
    fn contract(&self, chain: ChainId, role: ContractRole) -> Option<Arc<dyn ContractHandle>> {
        self.contracts
            .get(&(chain, role))
            .cloned()
            .map(|contract| contract as Arc<dyn ContractHandle>)
    }
}

/// Scripted reply for all validator endpoints.
enum ValidatorReply {
    Issue(String),
    Reject { status: StatusCode, message: String },
}

#[derive(Clone, Default)]
pub struct ServiceState {
    inner: Arc<ServiceInner>,
}

#[derive(Default)]
struct ServiceInner {
    validator_reply: Mutex<Option<ValidatorReply>>,
    validator_bodies: Mutex<Vec<Value>>,
    upload_bodies: Mutex<Vec<Vec<u8>>>,
    /// 0 disables; otherwise uploads with serial >= this fail with HTTP 500.
    upload_fail_from: Mutex<usize>,
    graphql_replies: Mutex<VecDeque<Value>>,
    graphql_bodies: Mutex<Vec<Value>>,
}

impl ServiceState {
    /// Every validator endpoint returns this hash.
    pub fn issue_hash(&self, hash: &str) {
        *self.inner.validator_reply.lock().unwrap() =
            Some(ValidatorReply::Issue(hash.to_string()));
    }

    /// Every validator endpoint rejects with this status and message.
    pub fn reject_documents(&self, status: u16, message: &str) {
        *self.inner.validator_reply.lock().unwrap() = Some(ValidatorReply::Reject {
            status: StatusCode::from_u16(status).unwrap(),
            message: message.to_string(),
        });
    }

    pub fn validator_hits(&self) -> usize {
        self.inner.validator_bodies.lock().unwrap().len()
    }

    /// JSON documents the validator received, in order.
    pub fn validator_bodies(&self) -> Vec<Value> {
        self.inner.validator_bodies.lock().unwrap().clone()
    }

    pub fn upload_hits(&self) -> usize {
        self.inner.upload_bodies.lock().unwrap().len()
    }

    /// Raw bodies the content store received. Upload `QmUpload{n}` is
    /// `upload_bodies()[n - 1]`.
    pub fn upload_bodies(&self) -> Vec<Vec<u8>> {
        self.inner.upload_bodies.lock().unwrap().clone()
    }

    pub fn fail_uploads_from(&self, serial: usize) {
        *self.inner.upload_fail_from.lock().unwrap() = serial;
    }

    /// Queue a `data` document for the subgraph endpoint. Replies pop in
    /// order; the final one repeats for every later query.
    pub fn push_graphql(&self, data: Value) {
        self.inner.graphql_replies.lock().unwrap().push_back(data);
    }

    pub fn graphql_hits(&self) -> usize {
        self.inner.graphql_bodies.lock().unwrap().len()
    }

    pub fn graphql_bodies(&self) -> Vec<Value> {
        self.inner.graphql_bodies.lock().unwrap().clone()
    }
}

async fn validate(
    State(state): State<ServiceState>,
    Path(_endpoint): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.inner.validator_bodies.lock().unwrap().push(body);
    match &*state.inner.validator_reply.lock().unwrap() {
        Some(ValidatorReply::Reject { status, message }) => {
            (*status, Json(json!({ "error": message })))
        }
        Some(ValidatorReply::Issue(hash)) => {
            (StatusCode::OK, Json(json!({ "data": { "ipfsHash": hash } })))
        }
        None => (
            StatusCode::OK,
            Json(json!({ "data": { "ipfsHash": "QmDoc1" } })),
        ),
    }
}

async fn upload(State(state): State<ServiceState>, body: Bytes) -> (StatusCode, Json<Value>) {
    let serial = {
        let mut bodies = state.inner.upload_bodies.lock().unwrap();
        bodies.push(body.to_vec());
        bodies.len()
    };
    let fail_from = *state.inner.upload_fail_from.lock().unwrap();
    if fail_from != 0 && serial >= fail_from {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "store unavailable" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({ "hash": format!("QmUpload{serial}") })),
    )
}

async fn graphql(State(state): State<ServiceState>, Json(body): Json<Value>) -> Json<Value> {
    state.inner.graphql_bodies.lock().unwrap().push(body);
    let data = {
        let mut replies = state.inner.graphql_replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap_or_else(|| json!({}))
        }
    };
    Json(json!({ "data": data }))
}

pub struct MockServices {
    pub state: ServiceState,
    pub base_url: String,
}

/// Serve the validator, content store, and subgraph endpoints from one
/// in-process listener.
pub async fn spawn_services() -> MockServices {
    let state = ServiceState::default();
    let app = Router::new()
        .route("/validate/{endpoint}", post(validate))
        .route("/upload", post(upload))
        .route("/graphql", post(graphql))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock services");
    let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock services");
    });
    MockServices { state, base_url }
}

/// Short poll intervals so convergence tests finish quickly; the budget still
/// allows dozens of probes.
pub fn test_config(base_url: &str) -> PipelineConfig {
    PipelineConfig {
        validator_base_url: base_url.to_string(),
        upload_url: format!("{base_url}/upload"),
        gateway_url: format!("{base_url}/ipfs"),
        dex_subgraph_url: format!("{base_url}/graphql"),
        poll: PollPolicy {
            initial_interval_ms: 10,
            multiplier: 2.0,
            max_interval_ms: 40,
            timeout_ms: 2_000,
        },
        chains: vec![ChainInfo {
            id: TEST_CHAIN,
            name: "polygon-test".to_string(),
            rpc_urls: vec![],
            explorer: ExplorerUrls {
                address: "https://scan.test/address/{address}".to_string(),
                transaction: "https://scan.test/tx/{hash}".to_string(),
            },
            subgraph_url: format!("{base_url}/graphql"),
            contracts: ContractAddresses {
                workspace_registry: test_address(0x01),
                grant_factory: test_address(0x02),
                application_registry: test_address(0x03),
                review_registry: test_address(0x04),
            },
            currencies: vec![],
            is_test_network: true,
        }],
    }
}

/// One session wired to mock services, a mock wallet, and one mock contract
/// registered under the given role.
pub struct Harness {
    pub services: MockServices,
    pub wallet: Arc<MockWallet>,
    pub contract: Arc<MockContract>,
    pub registry: Arc<MockRegistry>,
    pub session: Arc<Session>,
    pub store_root: PathBuf,
}

impl Harness {
    pub async fn new(role: ContractRole) -> Self {
        Self::build(MockWallet::connected(TEST_CHAIN), MockContract::new(), role).await
    }

    pub async fn disconnected(role: ContractRole) -> Self {
        Self::build(MockWallet::disconnected(), MockContract::new(), role).await
    }

    pub async fn on_network(chain: ChainId, role: ContractRole) -> Self {
        Self::build(MockWallet::connected(chain), MockContract::new(), role).await
    }

    pub async fn with_contract(contract: Arc<MockContract>, role: ContractRole) -> Self {
        Self::build(MockWallet::connected(TEST_CHAIN), contract, role).await
    }

    async fn build(
        wallet: Arc<MockWallet>,
        contract: Arc<MockContract>,
        role: ContractRole,
    ) -> Self {
        init_tracing();
        let services = spawn_services().await;
        let registry = MockRegistry::with(TEST_CHAIN, role, contract.clone());
        let store_root =
            std::env::temp_dir().join(format!("grantforge-it-{}", rand::random::<u64>()));
        let session = Session::new(
            test_config(&services.base_url),
            wallet.clone(),
            registry.clone(),
            LocalStore::new(store_root.clone()),
        )
        .expect("session construction");
        Self {
            services,
            wallet,
            contract,
            registry,
            session: Arc::new(session),
            store_root,
        }
    }

    /// Second session over the same local store, as after a page reload.
    pub fn reopen(&self) -> Session {
        Session::new(
            test_config(&self.services.base_url),
            self.wallet.clone(),
            self.registry.clone(),
            LocalStore::new(self.store_root.clone()),
        )
        .expect("session reopen")
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.store_root);
    }
}
