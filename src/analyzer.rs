//! The analysis entry point
//!
//! [`CarbonAnalyzer`] wires the token provider, the Gmail client, the
//! retrieval pipeline and the result store together. UI collaborators call
//! [`trigger_analysis`](CarbonAnalyzer::trigger_analysis) and
//! [`last_result`](CarbonAnalyzer::last_result), and follow a run through
//! [`subscribe`](CarbonAnalyzer::subscribe).

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::auth::TokenProvider;
use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::footprint;
use crate::gmail::{BatchExecutor, GmailClient, MailApi, MessageLister};
use crate::orchestrator::BatchOrchestrator;
use crate::retry::{Sleeper, TokioSleeper};
use crate::store::{KeyValueStore, ResultStore};
use crate::types::{AnalysisResult, Event};

/// Mailbox carbon analyzer (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct CarbonAnalyzer {
    api: Arc<dyn MailApi>,
    tokens: Arc<dyn TokenProvider>,
    results: ResultStore,
    sleeper: Arc<dyn Sleeper>,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: broadcast::Sender<Event>,
    config: Arc<Config>,
}

impl CarbonAnalyzer {
    /// Create an analyzer against the real Gmail API
    ///
    /// Validates the configuration, builds the HTTP client and opens (or
    /// creates) the SQLite result cache at `config.persistence.database_path`.
    pub async fn new(config: Config, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        config.validate()?;

        let api = Arc::new(GmailClient::new(&config.gmail)?);
        let db = Arc::new(Database::new(&config.persistence.database_path).await?);

        Self::with_components(config, api, tokens, db, Arc::new(TokioSleeper))
    }

    /// Create an analyzer from explicit collaborators
    ///
    /// Used to run against another provider endpoint, another store, or a
    /// sleeper that does not wait.
    pub fn with_components(
        config: Config,
        api: Arc<dyn MailApi>,
        tokens: Arc<dyn TokenProvider>,
        store: Arc<dyn KeyValueStore>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self> {
        config.validate()?;

        // Buffer size of 1000 lets slow subscribers fall behind a whole run
        let (event_tx, _rx) = broadcast::channel(1000);

        Ok(Self {
            api,
            tokens,
            results: ResultStore::new(store),
            sleeper,
            event_tx,
            config: Arc::new(config),
        })
    }

    /// Run a full analysis and cache its result
    ///
    /// Emits [`Event::Started`], [`Event::Listed`], one [`Event::Progress`]
    /// per cohort and finally [`Event::Complete`] or [`Event::Failed`].
    /// A failed run leaves the previously cached result untouched.
    ///
    /// # Errors
    /// The first fatal error of the run: token, profile, list, batch or
    /// storage failure.
    pub async fn trigger_analysis(&self) -> Result<AnalysisResult> {
        self.emit_event(Event::Started);

        match self.run_analysis().await {
            Ok(result) => {
                self.emit_event(Event::Complete {
                    result: result.clone(),
                });
                Ok(result)
            }
            Err(e) => {
                tracing::error!(error = %e, "Analysis failed");
                self.emit_event(Event::Failed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_analysis(&self) -> Result<AnalysisResult> {
        let token = self.tokens.acquire_token(true).await?;

        let profile = self.api.get_profile(&token).await?;
        let mailbox_total = profile.messages_total;

        let max_messages = self.config.analysis.max_messages;
        let analyze_all = max_messages.is_none_or(|max| max as u64 >= mailbox_total);
        let max_results = if analyze_all { None } else { max_messages };

        tracing::info!(
            mailbox_total,
            analyze_all,
            max_results = ?max_results,
            "Starting mailbox analysis"
        );

        let lister = MessageLister::new(
            self.api.clone(),
            self.sleeper.clone(),
            self.config.pipeline.clone(),
        );
        let ids: Vec<String> = lister
            .list_all(&token, max_results)
            .await?
            .into_iter()
            .map(|message| message.id)
            .collect();
        self.emit_event(Event::Listed { total: ids.len() });

        let executor = Arc::new(BatchExecutor::new(
            self.api.clone(),
            self.sleeper.clone(),
            self.config.retry.clone(),
            self.config.gmail.batch_path_prefix.clone(),
        ));
        let orchestrator = BatchOrchestrator::new(
            executor,
            self.sleeper.clone(),
            self.config.pipeline.clone(),
            self.event_tx.clone(),
        );
        let details = orchestrator.run(&token, &ids).await?;

        let result = footprint::summarize(
            &details,
            ids.len(),
            Some(mailbox_total),
            chrono::Utc::now(),
        );
        self.results.save(&result).await?;

        tracing::info!(
            total_emails = result.total_emails,
            analyzed_emails = result.analyzed_emails,
            skipped_emails = result.skipped_emails,
            total_co2_grams = result.total_co2_grams,
            "Analysis complete"
        );
        Ok(result)
    }

    /// The cached result of the last successful run, if any
    pub async fn last_result(&self) -> Result<Option<AnalysisResult>> {
        self.results.load().await
    }

    /// Subscribe to analysis events
    ///
    /// Each subscriber receives every event sent after it subscribed. Having
    /// no subscriber never affects a run.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Address of the signed-in account, without prompting
    ///
    /// Returns `None` when the token provider has no cached token.
    ///
    /// # Errors
    /// Profile request failures and token errors other than
    /// [`Error::Auth`].
    pub async fn connected_account(&self) -> Result<Option<String>> {
        let token = match self.tokens.acquire_token(false).await {
            Ok(token) => token,
            Err(Error::Auth(reason)) => {
                tracing::debug!(reason = %reason, "No connected account");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let profile = self.api.get_profile(&token).await?;
        Ok(Some(profile.email_address))
    }

    /// Forget the cached token and every stored value
    pub async fn logout(&self) -> Result<()> {
        match self.tokens.acquire_token(false).await {
            Ok(token) => self.tokens.invalidate(&token).await?,
            Err(Error::Auth(_)) => {}
            Err(e) => return Err(e),
        }

        self.results.clear().await?;
        tracing::info!("Logged out, local data cleared");
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let analyzer = Arc::new(self.clone());
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(analyzer, config).await })
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
