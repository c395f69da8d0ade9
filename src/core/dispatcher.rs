//! Long-polling loop and per-chat session routing.
//!
//! Every chat gets a worker task that owns its [`Conversation`]; updates for
//! one chat are handled strictly in arrival order while different chats
//! proceed independently (a slow conversion only blocks its own chat).
//! Routing never waits on a worker: each chat queue is capped and updates
//! beyond the cap are dropped with a warning.

use crate::core::conversation::{Conversation, ReportOutcome};
use crate::core::engine::ReportEngine;
use crate::core::ReportPipeline;
use crate::domain::model::{Effect, FuelKind, Input, ReportData};
use crate::domain::ports::{BotApi, UpdateBatch};
use crate::utils::error::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Updates waiting for one chat worker before new ones are dropped.
pub const CHAT_QUEUE_LIMIT: usize = 64;

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub poll_timeout: Duration,
    pub session_idle_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub shutdown_grace: Duration,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(30),
            session_idle_timeout: Duration::from_secs(30 * 60),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(150),
        }
    }
}

/// Exponential backoff between failed polls.
#[derive(Debug)]
struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    fn next_delay(&mut self, retry_after: Option<u64>) -> Duration {
        if let Some(seconds) = retry_after {
            return Duration::from_secs(seconds);
        }
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

struct ChatHandle {
    sender: mpsc::UnboundedSender<Input>,
    pending: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl ChatHandle {
    /// Queues `input` unless the chat is at its limit or the worker is gone.
    fn offer(&self, input: Input) -> std::result::Result<bool, Input> {
        if self.pending.load(Ordering::Acquire) >= CHAT_QUEUE_LIMIT {
            return Ok(false);
        }
        self.pending.fetch_add(1, Ordering::AcqRel);
        match self.sender.send(input) {
            Ok(()) => Ok(true),
            Err(mpsc::error::SendError(returned)) => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                Err(returned)
            }
        }
    }
}

pub struct Dispatcher<P: ReportPipeline + 'static> {
    api: Arc<dyn BotApi>,
    engine: Arc<ReportEngine<P>>,
    settings: DispatcherSettings,
    sessions: HashMap<i64, ChatHandle>,
    offset: Option<i64>,
}

impl<P: ReportPipeline + 'static> Dispatcher<P> {
    pub fn new(api: Arc<dyn BotApi>, engine: ReportEngine<P>, settings: DispatcherSettings) -> Self {
        Self {
            api,
            engine: Arc::new(engine),
            settings,
            sessions: HashMap::new(),
            offset: None,
        }
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions
            .values()
            .filter(|handle| !handle.task.is_finished())
            .count()
    }

    /// Polls until `shutdown` flips to `true` or polling fails permanently.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut backoff = Backoff::new(self.settings.initial_backoff, self.settings.max_backoff);
        tracing::info!(
            poll_timeout_s = self.settings.poll_timeout.as_secs(),
            "polling for updates"
        );

        let outcome = loop {
            if *shutdown.borrow() {
                break Ok(());
            }

            let polled = tokio::select! {
                _ = shutdown.changed() => break Ok(()),
                polled = self.api.get_updates(self.offset, self.settings.poll_timeout) => polled,
            };

            match polled {
                Ok(batch) => {
                    backoff.reset();
                    self.dispatch(batch).await;
                }
                Err(e) if !e.is_retryable() => {
                    tracing::error!(
                        category = ?e.category(),
                        "polling stopped: {} ({})",
                        e,
                        e.recovery_suggestion()
                    );
                    break Err(e);
                }
                Err(e) => {
                    let delay = backoff.next_delay(e.retry_after());
                    tracing::warn!(delay_s = delay.as_secs(), "getUpdates failed: {}", e);
                    tokio::select! {
                        _ = shutdown.changed() => break Ok(()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        };

        self.shutdown().await;
        outcome
    }

    /// Routes one poll result to the chat workers and advances the offset.
    pub async fn dispatch(&mut self, batch: UpdateBatch) {
        if let Some(last) = batch.last_update_id {
            self.offset = Some(last + 1);
        }

        for message in batch.messages {
            tracing::debug!(
                update_id = message.update_id,
                chat_id = message.chat_id,
                "routing update"
            );
            self.route(message.chat_id, message.input);
        }

        self.sessions.retain(|_, handle| !handle.task.is_finished());
    }

    fn route(&mut self, chat_id: i64, input: Input) {
        let mut input = input;
        // Two attempts: the existing worker may have just gone idle.
        for _ in 0..2 {
            if !self.sessions.contains_key(&chat_id) {
                let handle = self.spawn_worker(chat_id);
                self.sessions.insert(chat_id, handle);
            }
            let Some(handle) = self.sessions.get(&chat_id) else {
                break;
            };
            match handle.offer(input) {
                Ok(true) => return,
                Ok(false) => {
                    tracing::warn!(
                        chat_id,
                        limit = CHAT_QUEUE_LIMIT,
                        "chat queue is full, dropping update"
                    );
                    return;
                }
                Err(returned) => {
                    input = returned;
                    self.sessions.remove(&chat_id);
                }
            }
        }
        tracing::error!(chat_id, "could not deliver update to chat worker");
    }

    fn spawn_worker(&self, chat_id: i64) -> ChatHandle {
        let (sender, receiver) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let session = ChatSession {
            chat_id,
            api: Arc::clone(&self.api),
            engine: Arc::clone(&self.engine),
            conversation: Conversation::new(),
            rng: StdRng::from_entropy(),
            pending: Arc::clone(&pending),
        };
        let idle_timeout = self.settings.session_idle_timeout;
        let task = tokio::spawn(session.run(receiver, idle_timeout));
        tracing::debug!(chat_id, "chat worker started");
        ChatHandle {
            sender,
            pending,
            task,
        }
    }

    /// Closes every chat queue and waits for in-flight work to finish.
    pub async fn shutdown(self) {
        let tasks: Vec<JoinHandle<()>> = self
            .sessions
            .into_values()
            .map(|handle| handle.task)
            .collect();
        if tasks.is_empty() {
            return;
        }

        tracing::info!(workers = tasks.len(), "waiting for chat workers to finish");
        let drain = async {
            for task in tasks {
                if let Err(e) = task.await {
                    tracing::error!("chat worker panicked: {}", e);
                }
            }
        };
        if tokio::time::timeout(self.settings.shutdown_grace, drain)
            .await
            .is_err()
        {
            tracing::warn!("chat workers did not finish within the shutdown grace period");
        }
    }
}

struct ChatSession<P: ReportPipeline> {
    chat_id: i64,
    api: Arc<dyn BotApi>,
    engine: Arc<ReportEngine<P>>,
    conversation: Conversation,
    rng: StdRng,
    pending: Arc<AtomicUsize>,
}

impl<P: ReportPipeline> ChatSession<P> {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Input>, idle_timeout: Duration) {
        loop {
            match tokio::time::timeout(idle_timeout, inbox.recv()).await {
                Ok(Some(input)) => self.handle(input).await,
                Ok(None) => break,
                Err(_) => {
                    // Stop accepting, then finish whatever raced in.
                    inbox.close();
                    while let Some(input) = inbox.recv().await {
                        self.handle(input).await;
                    }
                    if self.conversation.is_active() {
                        tracing::info!(chat_id = self.chat_id, "conversation timed out");
                        let effects = self.conversation.expire();
                        self.apply(effects).await;
                    }
                    break;
                }
            }
        }
        tracing::debug!(chat_id = self.chat_id, "chat worker stopped");
    }

    async fn handle(&mut self, input: Input) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
        let effects = self.conversation.handle(&input, &mut self.rng);
        self.apply(effects).await;
    }

    async fn apply(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Reply { text, keyboard } => {
                    if let Err(e) = self.api.send_message(self.chat_id, &text, keyboard).await {
                        tracing::warn!(chat_id = self.chat_id, "sendMessage failed: {}", e);
                    }
                }
                Effect::Generate { kind, data } => {
                    let outcome = self.generate_and_send(kind, &data).await;
                    queue.extend(self.conversation.report_finished(outcome));
                }
            }
        }
    }

    async fn generate_and_send(
        &self,
        kind: FuelKind,
        data: &ReportData,
    ) -> ReportOutcome {
        let report = match self.engine.generate(kind, data).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(
                    chat_id = self.chat_id,
                    category = ?e.category(),
                    severity = ?e.severity(),
                    "report generation failed: {}",
                    e
                );
                return ReportOutcome::GenerationFailed;
            }
        };

        match self
            .api
            .send_document(self.chat_id, &report.file_name, report.pdf)
            .await
        {
            Ok(()) => ReportOutcome::Delivered,
            Err(e) => {
                tracing::error!(chat_id = self.chat_id, "sending PDF failed: {}", e);
                ReportOutcome::DeliveryFailed
            }
        }
    }
}
