//! Axum REST API handlers.
//!
//! Everything here is read-only with respect to the ledger: task routes read
//! boxes through the repository, and transaction routes return **unsigned**
//! operations for the caller's wallet to sign and submit.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use bounty_board::display::{format_deadline, micro_to_units, unix_now};
use bounty_board::lifecycle;
use bounty_board::{
    ActionRequest, ActionSet, Address, BoardError, ContractInfo, LedgerReader, ListingFailure,
    Operation, OperationKind, ParamsSource, Task, TaskDraft, TaskListing, TaskRepository,
    TaskStatus, TransactionBuilder,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub struct ApiState {
    pub repository: TaskRepository<Arc<dyn LedgerReader>>,
    pub builder: TransactionBuilder,
    pub params: Arc<dyn ParamsSource>,
    /// Unix seconds; swapped out in tests.
    pub clock: fn() -> u64,
}

impl ApiState {
    pub fn new(
        contract: ContractInfo,
        reader: Arc<dyn LedgerReader>,
        params: Arc<dyn ParamsSource>,
        listing_concurrency: usize,
    ) -> Self {
        ApiState {
            repository: TaskRepository::new(contract.clone(), reader)
                .with_concurrency(listing_concurrency),
            builder: TransactionBuilder::new(contract),
            params,
            clock: unix_now,
        }
    }
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/contract", get(get_contract))
        .route("/tasks", get(list_tasks))
        .route("/tasks/:id", get(get_task))
        .route("/tasks/:id/actions", get(get_task_actions))
        .route("/tasks/:id/transactions", post(build_task_transaction))
        .route("/clients/:address/tasks", get(get_client_tasks))
        .route("/freelancers/:address/tasks", get(get_freelancer_tasks))
        .route("/transactions/create", post(build_create_transaction))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    Board(BoardError),
    InvalidQuery(String),
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        ApiError::Board(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidQuery(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Board(err) => match err {
                BoardError::TaskNotFound(_) => StatusCode::NOT_FOUND,
                BoardError::PreconditionViolation { .. } => StatusCode::CONFLICT,
                BoardError::MalformedAddress(_)
                | BoardError::FieldTooLarge { .. }
                | BoardError::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
                // A stored record that fails to decode is the node's data, not the caller's.
                BoardError::TruncatedRecord { .. }
                | BoardError::InvalidStatus(_)
                | BoardError::InvalidEncoding { .. }
                | BoardError::Ledger(_) => StatusCode::BAD_GATEWAY,
                BoardError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            ApiError::Board(e) => e.to_string(),
            ApiError::InvalidQuery(msg) => msg,
        };
        if status.is_server_error() {
            warn!("API request failed: {error}");
        }
        (status, Json(ErrorResponse { error })).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A task plus display fields for the UI.
#[derive(Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub status_label: &'static str,
    pub amount_display: String,
    pub deadline_display: String,
    pub expired: bool,
}

impl TaskView {
    fn new(task: Task, now: u64) -> Self {
        TaskView {
            status_label: task.status.label(),
            amount_display: micro_to_units(task.amount),
            deadline_display: format_deadline(task.deadline),
            expired: task.is_expired(now),
            task,
        }
    }
}

#[derive(Serialize)]
pub struct TaskListResponse {
    pub count: usize,
    pub tasks: Vec<TaskView>,
    /// Ids that could not be read or decoded.
    pub skipped: Vec<ListingFailure>,
}

impl TaskListResponse {
    fn new(listing: TaskListing, now: u64) -> Self {
        TaskListResponse {
            count: listing.tasks.len(),
            tasks: listing
                .tasks
                .into_iter()
                .map(|t| TaskView::new(t, now))
                .collect(),
            skipped: listing.failures,
        }
    }
}

#[derive(Serialize)]
pub struct ActionsResponse {
    pub task_id: u64,
    pub status: TaskStatus,
    pub actions: ActionSet,
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct CallerQuery {
    pub caller: String,
}

#[derive(Deserialize)]
pub struct CreateBody {
    pub sender: Address,
    #[serde(flatten)]
    pub draft: TaskDraft,
}

#[derive(Deserialize)]
pub struct ActionBody {
    pub sender: Address,
    #[serde(flatten)]
    pub request: ActionRequest,
}

#[derive(Serialize)]
pub struct BoxView {
    pub app_id: u64,
    /// Base64
    pub name: String,
}

/// An unsigned operation. Byte fields are base64.
#[derive(Serialize)]
pub struct OperationView {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sender: Address,
    pub fee: u64,
    pub min_fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub boxes: Vec<BoxView>,
    /// Hex group id when part of an atomic group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl From<&Operation> for OperationView {
    fn from(op: &Operation) -> Self {
        let p = &op.params;
        let mut view = OperationView {
            kind: "pay",
            sender: op.sender,
            fee: p.fee,
            min_fee: p.min_fee,
            first_valid: p.first_valid,
            last_valid: p.last_valid,
            genesis_id: p.genesis_id.clone(),
            genesis_hash: p.genesis_hash.clone(),
            receiver: None,
            amount: None,
            app_id: None,
            method: None,
            args: Vec::new(),
            boxes: Vec::new(),
            group: op.group.map(|g| g.to_string()),
        };
        match &op.kind {
            OperationKind::Payment { receiver, amount } => {
                view.receiver = Some(*receiver);
                view.amount = Some(*amount);
            }
            OperationKind::AppCall {
                app_id,
                action,
                args,
                boxes,
            } => {
                view.kind = "appl";
                view.app_id = Some(*app_id);
                view.method = Some(action.method_tag());
                view.args = args.iter().map(|a| B64.encode(a)).collect();
                view.boxes = boxes
                    .iter()
                    .map(|b| BoxView {
                        app_id: b.app_id,
                        name: B64.encode(&b.name),
                    })
                    .collect();
            }
        }
        view
    }
}

#[derive(Serialize)]
pub struct TransactionsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub operations: Vec<OperationView>,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /contract`
pub async fn get_contract(State(state): State<Arc<ApiState>>) -> Json<ContractInfo> {
    Json(state.repository.contract().clone())
}

/// `GET /tasks[?status=open]`
pub async fn list_tasks(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<TaskListResponse> {
    let listing = match query.status.as_deref() {
        None => state.repository.get_all_tasks().await?,
        Some(s) => {
            let status = TaskStatus::parse(s)
                .ok_or_else(|| ApiError::InvalidQuery(format!("unknown status: {s}")))?;
            state.repository.get_tasks_by_status(status).await?
        }
    };
    Ok(Json(TaskListResponse::new(listing, (state.clock)())))
}

/// `GET /tasks/:id`
pub async fn get_task(
    State(state): State<Arc<ApiState>>,
    Path(task_id): Path<u64>,
) -> ApiResult<TaskView> {
    let task = load_task(&state, task_id).await?;
    Ok(Json(TaskView::new(task, (state.clock)())))
}

/// `GET /tasks/:id/actions?caller=ADDR`
///
/// What `caller` may do to the task right now.
pub async fn get_task_actions(
    State(state): State<Arc<ApiState>>,
    Path(task_id): Path<u64>,
    Query(query): Query<CallerQuery>,
) -> ApiResult<ActionsResponse> {
    let caller: Address = query.caller.parse()?;
    let task = load_task(&state, task_id).await?;
    Ok(Json(ActionsResponse {
        task_id,
        status: task.status,
        actions: lifecycle::legal_actions(&task, &caller, (state.clock)()),
    }))
}

/// `GET /clients/:address/tasks`
pub async fn get_client_tasks(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> ApiResult<TaskListResponse> {
    let client: Address = address.parse()?;
    let listing = state.repository.get_tasks_by_client(&client).await?;
    Ok(Json(TaskListResponse::new(listing, (state.clock)())))
}

/// `GET /freelancers/:address/tasks`
pub async fn get_freelancer_tasks(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> ApiResult<TaskListResponse> {
    let freelancer: Address = address.parse()?;
    let listing = state.repository.get_tasks_by_freelancer(&freelancer).await?;
    Ok(Json(TaskListResponse::new(listing, (state.clock)())))
}

/// `POST /transactions/create`
///
/// Returns the escrow payment and `create_task` call as one group.
pub async fn build_create_transaction(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<CreateBody>,
) -> ApiResult<TransactionsResponse> {
    let params = state.params.suggested_params().await?;
    let group = state
        .builder
        .build_create(&body.sender, &body.draft, (state.clock)(), &params)?;
    debug!("Built create group {}", group.group_id());

    Ok(Json(TransactionsResponse {
        group_id: Some(group.group_id().to_string()),
        operations: group.operations().iter().map(OperationView::from).collect(),
    }))
}

/// `POST /tasks/:id/transactions`
///
/// Checks the action against the task as it is on the ledger now before
/// building anything.
pub async fn build_task_transaction(
    State(state): State<Arc<ApiState>>,
    Path(task_id): Path<u64>,
    Json(body): Json<ActionBody>,
) -> ApiResult<TransactionsResponse> {
    let task = load_task(&state, task_id).await?;
    lifecycle::check(&task, &body.sender, (state.clock)(), body.request.action())?;

    let params = state.params.suggested_params().await?;
    let operation = state
        .builder
        .build(&body.sender, task_id, &body.request, &params)?;

    Ok(Json(TransactionsResponse {
        group_id: None,
        operations: vec![OperationView::from(&operation)],
    }))
}

async fn load_task(state: &ApiState, task_id: u64) -> Result<Task, ApiError> {
    state
        .repository
        .get_task(task_id)
        .await?
        .ok_or(ApiError::Board(BoardError::TaskNotFound(task_id)))
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
