use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;

use crate::{
    api,
    clients::{
        CandidateSourceClient, CompletionClient, SimilarityIndexClient, StanceClassifierClient,
    },
    config::Config,
    observability::Telemetry,
    pipeline::{
        cache::InMemoryTopicCache,
        navigation::{NavigationManager, SimilaritySearch},
        orchestrator::{CandidateSource, TopicOrchestrator},
        rotation::RotationSettings,
        stance::{StanceClassifier, StanceSplitter},
        summary::{Completion, SummaryGenerator},
    },
};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    candidate_client: Arc<CandidateSourceClient>,
    stance_client: Arc<StanceClassifierClient>,
    completion_client: Arc<CompletionClient>,
    similarity_client: Arc<SimilarityIndexClient>,
    orchestrator: Arc<TopicOrchestrator>,
    navigation: Arc<NavigationManager>,
}

impl AppState {
    pub(crate) fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.registry.telemetry
    }

    pub(crate) fn candidate_client(&self) -> Arc<CandidateSourceClient> {
        Arc::clone(&self.registry.candidate_client)
    }

    pub(crate) fn stance_client(&self) -> Arc<StanceClassifierClient> {
        Arc::clone(&self.registry.stance_client)
    }

    pub(crate) fn completion_client(&self) -> Arc<CompletionClient> {
        Arc::clone(&self.registry.completion_client)
    }

    pub(crate) fn similarity_client(&self) -> Arc<SimilarityIndexClient> {
        Arc::clone(&self.registry.similarity_client)
    }

    pub(crate) fn orchestrator(&self) -> Arc<TopicOrchestrator> {
        Arc::clone(&self.registry.orchestrator)
    }

    pub(crate) fn navigation(&self) -> Arc<NavigationManager> {
        Arc::clone(&self.registry.navigation)
    }

    pub(crate) fn rotation_settings(&self) -> RotationSettings {
        self.registry.config.rotation_settings()
    }
}

impl ComponentRegistry {
    /// Initialize telemetry, clients, and the engine from one config.
    ///
    /// # Errors
    /// Fails when telemetry initialization or an HTTP client build fails.
    pub fn build(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let telemetry = Telemetry::new().context("failed to initialize telemetry")?;
        let metrics = telemetry.metrics();
        let retry = config.retry_config();

        let candidate_client = Arc::new(CandidateSourceClient::new(
            config.embedding_source_base_url(),
            config.client_connect_timeout(),
            config.client_total_timeout(),
            retry,
        )?);
        let stance_client = Arc::new(StanceClassifierClient::new(
            config.stance_classifier_base_url(),
            config.client_connect_timeout(),
            config.client_total_timeout(),
            retry,
        )?);
        let completion_client = Arc::new(CompletionClient::new(
            config.completion_base_url(),
            config.client_connect_timeout(),
            config.completion_timeout(),
            retry,
        )?);
        let similarity_client = Arc::new(SimilarityIndexClient::new(
            config.similarity_index_base_url(),
            config.client_connect_timeout(),
            config.client_total_timeout(),
            retry,
        )?);

        let cache = Arc::new(InMemoryTopicCache::new(config.topic_ttl()));
        let splitter = StanceSplitter::new(
            Arc::clone(&stance_client) as Arc<dyn StanceClassifier>,
            config.stance_split_settings(),
            Arc::clone(&metrics),
        );
        let summarizer = SummaryGenerator::new(
            Arc::clone(&completion_client) as Arc<dyn Completion>,
            config.summary_max_tokens(),
            config.summary_sample_per_side(),
        );
        let orchestrator = Arc::new(TopicOrchestrator::new(
            Arc::clone(&candidate_client) as Arc<dyn CandidateSource>,
            splitter,
            summarizer,
            cache,
            config.engine_settings(),
            Arc::clone(&metrics),
        ));
        let navigation = Arc::new(NavigationManager::new(
            Arc::clone(&similarity_client) as Arc<dyn SimilaritySearch>,
            Arc::clone(&candidate_client) as Arc<dyn CandidateSource>,
            config.navigation_settings(),
            metrics,
        ));

        Ok(Self {
            config,
            telemetry,
            candidate_client,
            stance_client,
            completion_client,
            similarity_client,
            orchestrator,
            navigation,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Build the control-plane router over one registry.
#[must_use]
pub fn build_router(registry: ComponentRegistry) -> Router {
    api::router(AppState::new(registry))
}
