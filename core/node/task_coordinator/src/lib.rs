//! Cooperative scheduling of named periodic duties across a cluster.
//!
//! Every instance registers the same set of tasks and shares a
//! coordination store. A per-task permit record leases the duty to one
//! instance at a time; a crashed holder is detected by a stale permit
//! timestamp and taken over. Two instances starting simultaneously may
//! both run a task on the very first tick, so handlers must be
//! idempotent.

mod metrics;
mod permit;

pub use self::permit::{PermitStatus, TaskPermit};

use std::{collections::HashMap, sync::Arc, time::Duration};

use anchor_config::TaskCoordinatorConfig;
use anchor_storage::Store;
use anchor_types::time::seconds_since_epoch;
use futures::future::BoxFuture;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};

use crate::metrics::METRICS;

type TaskHandler = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

struct RegisteredTask {
    id: String,
    interval: Duration,
    handler: TaskHandler,
}

pub struct TaskManager {
    store: Arc<dyn Store>,
    instance_id: String,
    config: TaskCoordinatorConfig,
    tasks: Mutex<HashMap<String, RegisteredTask>>,
    running: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TaskManager {
    pub fn new(store: Arc<dyn Store>, instance_id: String, config: TaskCoordinatorConfig) -> Self {
        Self {
            store,
            instance_id,
            config,
            tasks: Mutex::new(HashMap::new()),
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a handler for a named task, replacing any previous
    /// registration under the same id. Handlers MUST be idempotent:
    /// overlapping runs across instances are rare but possible.
    pub async fn register<F>(&self, task_id: &str, interval: Duration, handler: F)
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        tasks.insert(
            task_id.to_string(),
            RegisteredTask {
                id: task_id.to_string(),
                interval,
                handler: Arc::new(handler),
            },
        );
        tracing::info!("Registered task [{task_id}] with interval {interval:?}");
    }

    pub async fn run(
        self: Arc<Self>,
        mut stop_receiver: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let mut timer = tokio::time::interval(self.config.poll_interval());

        while !*stop_receiver.borrow_and_update() {
            tokio::select! {
                _ = timer.tick() => { /* continue iterations */ }
                _ = stop_receiver.changed() => break,
            }

            let task_ids: Vec<String> = {
                let tasks = self.tasks.lock().await;
                tasks.keys().cloned().collect()
            };

            for task_id in task_ids {
                self.tick_task(&task_id).await;
            }
        }

        // Permits are left to time out so a peer can take over.
        tracing::info!("Stop signal received, task coordinator is shutting down");
        Ok(())
    }

    async fn tick_task(&self, task_id: &str) {
        // A task we started is either still running (keep the lease
        // alive) or finished (release our bookkeeping).
        {
            let mut running = self.running.lock().await;
            if let Some(handle) = running.get(task_id) {
                if handle.is_finished() {
                    running.remove(task_id);
                } else {
                    if let Err(err) = self.write_permit(task_id, PermitStatus::Running).await {
                        tracing::warn!("Failed to renew permit for task [{task_id}]: {err}");
                    }
                    return;
                }
            }
        }

        let (interval, handler) = {
            let tasks = self.tasks.lock().await;
            match tasks.get(task_id) {
                Some(task) => (task.interval, Arc::clone(&task.handler)),
                None => return,
            }
        };

        match self.should_run(task_id, interval).await {
            Ok(true) => self.start_task(task_id, handler).await,
            Ok(false) => {}
            Err(err) => {
                // Storage hiccups skip the task for this tick only.
                tracing::warn!("Failed to read permit for task [{task_id}]: {err}");
            }
        }
    }

    async fn should_run(&self, task_id: &str, interval: Duration) -> anyhow::Result<bool> {
        let permit = match self.store.get(task_id).await {
            Ok(bytes) => Some(serde_json::from_slice::<TaskPermit>(&bytes)?),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err.into()),
        };

        let Some(permit) = permit else {
            return Ok(true);
        };

        let now = seconds_since_epoch();
        let elapsed = now.saturating_sub(permit.updated_unix);

        if permit.holder == self.instance_id {
            return Ok(elapsed >= interval.as_secs());
        }

        // A foreign permit is only taken over once the incumbent has
        // missed both its interval and a full poll cycle.
        let stale_after = self.config.poll_interval().as_secs() + interval.as_secs();
        if elapsed > stale_after {
            tracing::info!(
                "Taking over task [{task_id}] from [{}]: permit is {elapsed}s old",
                permit.holder
            );
            METRICS.takeovers.inc();
            return Ok(true);
        }

        Ok(false)
    }

    async fn start_task(&self, task_id: &str, handler: TaskHandler) {
        if let Err(err) = self.write_permit(task_id, PermitStatus::Running).await {
            tracing::warn!("Failed to claim permit for task [{task_id}]: {err}");
            return;
        }

        METRICS.task_runs[&task_id.to_string()].inc();

        let store = Arc::clone(&self.store);
        let instance_id = self.instance_id.clone();
        let id = task_id.to_string();

        let wrapper = tokio::spawn(async move {
            let latency = METRICS.task_latency.start();

            // The inner spawn contains handler panics; the permit is
            // restored to idle on every exit path.
            if let Err(err) = tokio::spawn(handler()).await {
                tracing::error!("Task [{id}] terminated abnormally: {err}");
            }

            latency.observe();

            let permit = TaskPermit {
                task_id: id.clone(),
                holder: instance_id,
                status: PermitStatus::Idle,
                updated_unix: seconds_since_epoch(),
            };
            match serde_json::to_vec(&permit) {
                Ok(bytes) => {
                    if let Err(err) = store.put(&id, &bytes, &[]).await {
                        tracing::warn!("Failed to release permit for task [{id}]: {err}");
                    }
                }
                Err(err) => tracing::error!("Failed to serialize permit for task [{id}]: {err}"),
            }
        });

        let mut running = self.running.lock().await;
        running.insert(task_id.to_string(), wrapper);
    }

    async fn write_permit(&self, task_id: &str, status: PermitStatus) -> anyhow::Result<()> {
        let permit = TaskPermit {
            task_id: task_id.to_string(),
            holder: self.instance_id.clone(),
            status,
            updated_unix: seconds_since_epoch(),
        };
        let bytes = serde_json::to_vec(&permit)?;
        self.store.put(task_id, &bytes, &[]).await?;
        Ok(())
    }
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskManager")
            .field("instance_id", &self.instance_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
