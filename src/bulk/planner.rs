use std::sync::Arc;

use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::{BulkOutcome, Destination, NewTask, Targets, no_targets};
use crate::todoist::{
    ApiError, ApiResult, BatchApi, BatchResult, Command, CommandKind, Idempotency, RateLimiter,
    Reservation, RestApi, decode, decode_list, with_query,
};
use crate::validation::ValidId;

/// Operations on more than this many tasks go out as one Sync batch.
pub const BATCH_THRESHOLD: usize = 5;

/// Routes bulk operations to the REST or Sync dispatcher.
///
/// Both dispatchers must share `limiter`. A sequential run reserves one slot
/// per target up front and fails fast when the window cannot cover it.
#[derive(Clone)]
pub struct BulkPlanner {
    rest: Arc<dyn RestApi>,
    batch: Arc<dyn BatchApi>,
    limiter: Arc<RateLimiter>,
    threshold: usize,
}

impl BulkPlanner {
    pub fn new(rest: Arc<dyn RestApi>, batch: Arc<dyn BatchApi>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            rest,
            batch,
            limiter,
            threshold: BATCH_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn should_batch(&self, count: usize) -> bool {
        count > self.threshold
    }

    /// Flatten targets to validated task IDs.
    ///
    /// A filter costs one `GET /tasks` before any mutation. Every ID is
    /// validated up front so a bad one never leaves a half-applied run.
    pub async fn resolve_targets(
        &self,
        ct: &CancellationToken,
        targets: Targets,
    ) -> ApiResult<Vec<ValidId>> {
        let raw = match targets {
            Targets::Ids(ids) => ids,
            Targets::Filter(filter) => {
                let path = with_query("/tasks", &[("filter", filter.as_str())]);
                let body = self.rest.get(ct, &path).await?;
                decode_list(&body)?.iter().filter_map(id_of).collect()
            }
        };

        if raw.is_empty() {
            return Err(no_targets());
        }

        raw.into_iter()
            .map(|id| ValidId::parse(id, "task_id"))
            .collect()
    }

    #[instrument(skip(self, ct))]
    pub async fn complete(&self, ct: &CancellationToken, targets: Targets) -> ApiResult<BulkOutcome> {
        let ids = self.resolve_targets(ct, targets).await?;

        if self.should_batch(ids.len()) {
            let commands = ids
                .iter()
                .map(|id| Command::new(CommandKind::ItemClose, id_args(id)))
                .collect();
            return self.run_batch(ct, &ids, commands).await;
        }

        let mut reservation = self.reserve(ids.len())?;
        Ok(self
            .fan_out(ct, &mut reservation, &ids, |id| format!("/tasks/{id}/close"))
            .await)
    }

    /// REST has no move endpoint, so every move is one `item_move` batch
    /// whatever the target count.
    #[instrument(skip(self, ct))]
    pub async fn move_tasks(
        &self,
        ct: &CancellationToken,
        targets: Targets,
        destination: Destination,
    ) -> ApiResult<BulkOutcome> {
        let ids = self.resolve_targets(ct, targets).await?;

        let commands = ids
            .iter()
            .map(|id| {
                let mut args = destination.to_args();
                args.insert("id".into(), json!(id.as_str()));
                Command::new(CommandKind::ItemMove, args)
            })
            .collect();
        self.run_batch(ct, &ids, commands).await
    }

    /// Create tasks in request order. `parent_index` nests an item under an
    /// earlier one from the same request.
    #[instrument(skip(self, ct, tasks), fields(tasks = tasks.len()))]
    pub async fn create(&self, ct: &CancellationToken, tasks: Vec<NewTask>) -> ApiResult<BulkOutcome> {
        if tasks.is_empty() {
            return Err(ApiError::invalid("tasks must contain at least one task"));
        }
        for (index, task) in tasks.iter().enumerate() {
            task.validate(index)?;
        }

        if self.should_batch(tasks.len()) {
            return self.create_batch(ct, &tasks).await;
        }

        let mut reservation = self.reserve(tasks.len())?;
        Ok(self.create_sequential(ct, &mut reservation, &tasks).await)
    }

    /// Hold one slot per target so retries cannot starve later targets.
    fn reserve(&self, needed: usize) -> ApiResult<Reservation<'_>> {
        self.limiter.try_reserve(needed).map_err(|free| {
            ApiError::invalid(format!(
                "insufficient rate limit capacity: need {needed} requests, have {free} remaining in {}min window",
                self.limiter.window().as_secs() / 60
            ))
        })
    }

    /// One idempotent POST per ID. A failed target is recorded, never fatal.
    async fn fan_out(
        &self,
        ct: &CancellationToken,
        reservation: &mut Reservation<'_>,
        ids: &[ValidId],
        path: impl Fn(&ValidId) -> String,
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::new(ids.len(), false);

        for id in ids {
            reservation.release_one();
            match self
                .rest
                .post(ct, &path(id), None, Idempotency::Idempotent)
                .await
            {
                Ok(_) => outcome.record_success(),
                Err(e) => {
                    warn!(task_id = %id, error = %e, "bulk target failed");
                    outcome.record_failure(id.as_str());
                }
            }
        }

        info!(
            total = outcome.total,
            failed = outcome.failed,
            "bulk operation finished over REST"
        );
        outcome
    }

    /// Submit `commands` as one batch. `commands[i]` acts on `ids[i]`.
    async fn run_batch(
        &self,
        ct: &CancellationToken,
        ids: &[ValidId],
        commands: Vec<Command>,
    ) -> ApiResult<BulkOutcome> {
        let result = self.batch.submit(ct, commands.clone()).await?;

        let mut outcome = BulkOutcome::new(ids.len(), true);
        for (id, command) in ids.iter().zip(&commands) {
            if result.succeeded(command) {
                outcome.record_success();
            } else {
                warn!(task_id = %id, status = ?result.status(command), "batch command failed");
                outcome.record_failure(id.as_str());
            }
        }

        info!(
            total = outcome.total,
            failed = outcome.failed,
            "bulk operation finished as batch"
        );
        Ok(outcome)
    }

    async fn create_sequential(
        &self,
        ct: &CancellationToken,
        reservation: &mut Reservation<'_>,
        tasks: &[NewTask],
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::new(tasks.len(), false);
        // Real ID per input position; None when the create failed or the
        // response carried no ID.
        let mut created: Vec<Option<String>> = Vec::with_capacity(tasks.len());

        for task in tasks {
            reservation.release_one();
            let parent_id = match task.parent_index {
                Some(parent) => match created.get(parent).cloned().flatten() {
                    Some(id) => Some(id),
                    None => {
                        warn!(content = %task.content, parent, "parent task was not created");
                        outcome.record_failure(task.content.as_str());
                        created.push(None);
                        continue;
                    }
                },
                None => None,
            };

            let body = task.rest_body(parent_id.as_deref());
            match self
                .rest
                .post(ct, "/tasks", Some(body), Idempotency::NonIdempotent)
                .await
            {
                Ok(body) => {
                    let id = decode::<Value>(&body).ok().as_ref().and_then(id_of);
                    outcome.record_success();
                    if let Some(id) = &id {
                        outcome.created_ids.push(id.clone());
                    }
                    created.push(id);
                }
                Err(e) => {
                    warn!(content = %task.content, error = %e, "bulk create failed");
                    outcome.record_failure(task.content.as_str());
                    created.push(None);
                }
            }
        }

        outcome
    }

    async fn create_batch(&self, ct: &CancellationToken, tasks: &[NewTask]) -> ApiResult<BulkOutcome> {
        let mut commands: Vec<Command> = Vec::with_capacity(tasks.len());
        for task in tasks {
            // validate() guarantees the parent precedes this item.
            let parent_temp_id = task
                .parent_index
                .and_then(|parent| commands.get(parent))
                .and_then(|parent| parent.temp_id.clone());
            commands.push(Command::new(
                CommandKind::ItemAdd,
                task.command_args(parent_temp_id.as_deref()),
            ));
        }

        let result: BatchResult = self.batch.submit(ct, commands.clone()).await?;

        let mut outcome = BulkOutcome::new(tasks.len(), true);
        for (task, command) in tasks.iter().zip(&commands) {
            if result.succeeded(command) {
                outcome.record_success();
                if let Some(id) = result.resolved_id(command) {
                    outcome.created_ids.push(id.to_string());
                }
            } else {
                warn!(content = %task.content, status = ?result.status(command), "batch create failed");
                outcome.record_failure(task.content.as_str());
            }
        }
        Ok(outcome)
    }
}

fn id_args(id: &ValidId) -> Map<String, Value> {
    let mut args = Map::new();
    args.insert("id".into(), json!(id.as_str()));
    args
}

fn id_of(task: &Value) -> Option<String> {
    match task.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
