use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
    service::TowerToHyperService,
};
use rmcp::RoleServer;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use rmcp::{
    ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
    transport::stdio,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::SharedLedger;
use crate::error::{ServiceError, ServiceResult};
use crate::ledger::{HabitId, StreakUpdate};
use crate::metadata::PKG_VERSION;
use crate::settings::{Settings, SettingsError};
use crate::tools::summary::{SummaryParams, ledger_summary};
use crate::validation::{floor_target, validate_days, validate_habit_name};

const SNAPSHOT_URI: &str = "habits://snapshot";

// Tool argument types

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct AddHabitArgs {
    /// Habit name, 1 to 28 characters.
    pub name: String,
    /// Goal streak length in days. Defaults to 7.
    #[serde(rename = "targetDays", default)]
    pub target_days: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct HabitIdArgs {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateStreakArgs {
    pub id: String,
    pub delta: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct DaysArgs {
    /// Number of days ending today, 1 to 3660. Defaults to the configured
    /// history window; larger values are rejected.
    #[serde(default)]
    pub days: Option<usize>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct ResetArgs {
    /// Must be true; guards against accidental wipes.
    pub confirm: bool,
}

/// State shared by every session of one server process.
pub struct ServerState {
    pub ledger: SharedLedger,
    pub history_days: usize,
    pub version: &'static str,
    pub transports: Vec<&'static str>,
    started: Instant,
}

impl ServerState {
    pub fn new(ledger: SharedLedger, settings: &Settings) -> Self {
        let mut transports = Vec::new();
        if settings.enable_stdio {
            transports.push("stdio");
        }
        if settings.enable_http {
            transports.push("http");
        }
        Self {
            ledger,
            history_days: settings.history_days,
            version: PKG_VERSION,
            transports,
            started: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

fn json_result<T: Serialize>(value: T) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![Content::json(value)?]))
}

fn not_found(id: &str) -> ErrorData {
    ErrorData::invalid_params("habit not found", Some(json!({ "id": id })))
}

fn streak_result(update: StreakUpdate) -> Result<CallToolResult, ErrorData> {
    let progress = update.habit.progress();
    let complete = update.habit.is_complete();
    json_result(json!({
        "habit": update.habit,
        "progress": progress,
        "complete": complete,
        "unlocked": update.unlocked,
    }))
}

#[derive(Clone)]
pub struct HabitServer {
    state: Arc<ServerState>,
    pub tool_router: ToolRouter<HabitServer>,
}

#[tool_router]
impl HabitServer {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    fn days_or_default(&self, days: Option<usize>) -> Result<usize, ErrorData> {
        validate_days(days.unwrap_or(self.state.history_days))
            .map_err(|e| ErrorData::invalid_params(e.to_string(), None))
    }

    fn update(&self, id: &str, delta: i64) -> Result<CallToolResult, ErrorData> {
        let update = self
            .state
            .ledger
            .lock()
            .update_habit_streak(&HabitId::from(id), delta);
        match update {
            Some(update) => streak_result(update),
            None => Err(not_found(id)),
        }
    }

    #[tool(description = "Create a habit with a target streak length in days (default 7)")]
    async fn add_habit(
        &self,
        Parameters(args): Parameters<AddHabitArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let name = validate_habit_name(&args.name)
            .map_err(|e| ErrorData::invalid_params(e.to_string(), None))?;
        let target = args.target_days.map(floor_target);
        let habit = self.state.ledger.lock().add_habit(name, target);
        json_result(habit)
    }

    #[tool(description = "Delete a habit and its history. Earned badges are kept")]
    async fn remove_habit(
        &self,
        Parameters(args): Parameters<HabitIdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let removed = self
            .state
            .ledger
            .lock()
            .remove_habit(&HabitId::from(args.id.as_str()));
        json_result(json!({ "id": args.id, "removed": removed }))
    }

    #[tool(description = "Add one day to a habit's streak")]
    async fn increment_habit(
        &self,
        Parameters(args): Parameters<HabitIdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        self.update(&args.id, 1)
    }

    #[tool(description = "Remove one day from a habit's streak (never below zero)")]
    async fn decrement_habit(
        &self,
        Parameters(args): Parameters<HabitIdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        self.update(&args.id, -1)
    }

    #[tool(description = "Change a habit's streak by an arbitrary delta (clamped at zero)")]
    async fn update_habit_streak(
        &self,
        Parameters(args): Parameters<UpdateStreakArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        self.update(&args.id, args.delta)
    }

    #[tool(description = "List habits in creation order")]
    async fn list_habits(&self) -> Result<CallToolResult, ErrorData> {
        let habits = self.state.ledger.lock().list_habits().to_vec();
        json_result(json!({ "habits": habits }))
    }

    #[tool(description = "List unlocked badges, oldest first")]
    async fn list_badges(&self) -> Result<CallToolResult, ErrorData> {
        let badges = self.state.ledger.lock().list_badges().to_vec();
        json_result(json!({ "badges": badges }))
    }

    #[tool(description = "Recorded streak per habit for each of the last N days, oldest first")]
    async fn history_matrix(
        &self,
        Parameters(args): Parameters<DaysArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let days = self.days_or_default(args.days)?;
        let matrix = self.state.ledger.lock().history_matrix(days);
        json_result(matrix)
    }

    #[tool(description = "The last N calendar dates ending today, oldest first")]
    async fn recent_dates(
        &self,
        Parameters(args): Parameters<DaysArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let days = self.days_or_default(args.days)?;
        let dates = self.state.ledger.lock().recent_dates(days);
        json_result(json!({ "dates": dates }))
    }

    #[tool(description = "Export the history as ';'-separated CSV")]
    async fn export_csv(
        &self,
        Parameters(args): Parameters<DaysArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let days = self.days_or_default(args.days)?;
        let (csv, file_name) = {
            let ledger = self.state.ledger.lock();
            (ledger.export_csv(days), ledger.export_file_name())
        };
        let csv = csv.map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![
            Content::text(file_name),
            Content::text(csv),
        ]))
    }

    #[tool(description = "Delete all habits, history and badges")]
    async fn reset_all(
        &self,
        Parameters(args): Parameters<ResetArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        if !args.confirm {
            return Err(ErrorData::invalid_params(
                "reset_all requires confirm: true",
                None,
            ));
        }
        self.state.ledger.lock().reset_all();
        json_result(json!({ "reset": true }))
    }

    #[tool(description = "Server and ledger status")]
    async fn summary(
        &self,
        Parameters(args): Parameters<SummaryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text(ledger_summary(
            &self.state,
            args.verbose,
        ))]))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for HabitServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Habit ledger - add habits, bump streaks, read badges and history".to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: rmcp::service::RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult {
            resources: vec![RawResource::new(SNAPSHOT_URI, "Ledger snapshot").no_annotation()],
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri, .. }: ReadResourceRequestParam,
        _ctx: rmcp::service::RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        match uri.as_str() {
            SNAPSHOT_URI => {
                let snapshot = self.state.ledger.lock().snapshot();
                let text = serde_json::to_string_pretty(&snapshot)
                    .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(text, uri)],
                })
            }
            _ => Err(ErrorData::resource_not_found(
                "Unknown resource URI",
                Some(json!({ "uri": uri })),
            )),
        }
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: rmcp::service::RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, ErrorData> {
        Ok(ListResourceTemplatesResult {
            next_cursor: None,
            resource_templates: Vec::new(),
            meta: None,
        })
    }
}

/// Re-run the daily reconciliation every `every` until cancelled.
pub fn spawn_reconciler(
    ledger: SharedLedger,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; startup has already reconciled.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let filled = ledger.lock().ensure_history_tracked();
                    debug!(filled, "periodic history reconciliation");
                }
            }
        }
    })
}

async fn spawn_http(
    addr: SocketAddr,
    state: Arc<ServerState>,
    cancel: CancellationToken,
) -> ServiceResult<JoinHandle<()>> {
    let http_service = TowerToHyperService::new(StreamableHttpService::new(
        move || Ok(HabitServer::new(state.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    ));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("streamable HTTP transport on http://{}", listener.local_addr()?);

    Ok(tokio::spawn(async move {
        loop {
            let stream = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => stream,
                    Err(e) => {
                        warn!("accept failed: {e}");
                        continue;
                    }
                },
            };
            let io = TokioIo::new(stream);
            let service = http_service.clone();
            tokio::spawn(async move {
                let _ = Builder::new(TokioExecutor::default())
                    .serve_connection(io, service)
                    .await;
            });
        }
    }))
}

/// Serve the ledger over the enabled transports until Ctrl-C, or until the
/// stdio client disconnects when stdio is the only transport.
pub async fn run(settings: &Settings, ledger: SharedLedger) -> ServiceResult<()> {
    settings.validate()?;
    let cancel = CancellationToken::new();
    let state = Arc::new(ServerState::new(ledger.clone(), settings));
    let mut tasks = vec![spawn_reconciler(
        ledger,
        Duration::from_secs(settings.reconcile_interval_secs),
        cancel.clone(),
    )];

    if settings.enable_http {
        let addr: SocketAddr = settings.http_addr.parse().map_err(|e| {
            SettingsError::Invalid(format!("invalid http_addr '{}': {e}", settings.http_addr))
        })?;
        tasks.push(spawn_http(addr, state.clone(), cancel.clone()).await?);
    }

    if settings.enable_stdio {
        let service = HabitServer::new(state.clone())
            .serve(stdio())
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        info!("stdio transport ready");
        let stdio_only = !settings.enable_http;
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                res = service.waiting() => {
                    if let Err(e) = res {
                        warn!("stdio session ended with error: {e}");
                    }
                    if stdio_only {
                        cancel.cancel();
                    }
                }
            }
        }));
    }

    tokio::select! {
        _ = cancel.cancelled() => {}
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => {
                info!("shutting down");
                cancel.cancel();
            }
            Err(e) => {
                warn!("failed to listen for Ctrl-C: {e}");
                cancel.cancelled().await;
            }
        },
    }

    for task in tasks {
        let _ = task.await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{open_with, share};
    use crate::ledger::FixedClock;
    use crate::storage::MemoryStore;
    use crate::validation::MAX_HISTORY_DAYS;

    fn server() -> HabitServer {
        let clock = FixedClock::ymd(2024, 1, 1).unwrap();
        let ledger = open_with(Box::new(MemoryStore::new()), Box::new(clock));
        HabitServer::new(Arc::new(ServerState::new(
            share(ledger),
            &Settings::default(),
        )))
    }

    fn add_args(name: &str) -> Parameters<AddHabitArgs> {
        Parameters(AddHabitArgs {
            name: name.into(),
            target_days: None,
        })
    }

    fn days(days: Option<usize>) -> Parameters<DaysArgs> {
        Parameters(DaysArgs { days })
    }

    #[tokio::test]
    async fn add_habit_trims_and_validates_names() {
        let server = server();
        server.add_habit(add_args("  Read  ")).await.unwrap();
        {
            let ledger = server.state.ledger.lock();
            assert_eq!(ledger.list_habits().len(), 1);
            assert_eq!(ledger.list_habits()[0].name, "Read");
            assert_eq!(ledger.list_habits()[0].target, 7);
        }

        let err = server.add_habit(add_args("   ")).await.unwrap_err();
        assert!(err.message.contains("empty"), "{}", err.message);
        let err = server.add_habit(add_args(&"a".repeat(29))).await.unwrap_err();
        assert!(err.message.contains("29"), "{}", err.message);
        assert_eq!(server.state.ledger.lock().list_habits().len(), 1);
    }

    #[tokio::test]
    async fn fractional_target_is_floored() {
        let server = server();
        server
            .add_habit(Parameters(AddHabitArgs {
                name: "Run".into(),
                target_days: Some(3.7),
            }))
            .await
            .unwrap();
        assert_eq!(server.state.ledger.lock().list_habits()[0].target, 3);
    }

    #[tokio::test]
    async fn reset_requires_confirmation() {
        let server = server();
        server.add_habit(add_args("Read")).await.unwrap();

        let err = server
            .reset_all(Parameters(ResetArgs { confirm: false }))
            .await
            .unwrap_err();
        assert!(err.message.contains("confirm"), "{}", err.message);
        assert_eq!(server.state.ledger.lock().list_habits().len(), 1);

        server
            .reset_all(Parameters(ResetArgs { confirm: true }))
            .await
            .unwrap();
        assert!(server.state.ledger.lock().snapshot().is_empty());
    }

    #[tokio::test]
    async fn unknown_habit_is_an_error() {
        let server = server();
        let err = server
            .increment_habit(Parameters(HabitIdArgs { id: "nope".into() }))
            .await
            .unwrap_err();
        assert_eq!(err.message, "habit not found");
        assert_eq!(err.data, Some(json!({ "id": "nope" })));
    }

    #[tokio::test]
    async fn increment_moves_the_streak() {
        let server = server();
        server.add_habit(add_args("Read")).await.unwrap();
        let id = server.state.ledger.lock().list_habits()[0].id.to_string();
        server
            .increment_habit(Parameters(HabitIdArgs { id: id.clone() }))
            .await
            .unwrap();
        server
            .update_habit_streak(Parameters(UpdateStreakArgs { id: id.clone(), delta: -5 }))
            .await
            .unwrap();
        assert_eq!(server.state.ledger.lock().list_habits()[0].streak, 0);
    }

    #[test]
    fn days_default_to_the_configured_window() {
        let server = server();
        assert_eq!(server.days_or_default(None).unwrap(), 30);
        assert_eq!(server.days_or_default(Some(5)).unwrap(), 5);
        assert!(server.days_or_default(Some(0)).is_err());
    }

    #[tokio::test]
    async fn oversized_day_counts_are_rejected() {
        let server = server();
        for tool_days in [MAX_HISTORY_DAYS + 1, usize::MAX] {
            let err = server.recent_dates(days(Some(tool_days))).await.unwrap_err();
            assert!(err.message.contains("3660"), "{}", err.message);
            assert!(server.history_matrix(days(Some(tool_days))).await.is_err());
            assert!(server.export_csv(days(Some(tool_days))).await.is_err());
        }
        assert!(server.recent_dates(days(Some(MAX_HISTORY_DAYS))).await.is_ok());
        assert!(server.export_csv(days(None)).await.is_ok());
    }
}
