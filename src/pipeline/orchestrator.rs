use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::app::ports::CompletionPort;
use crate::app::enrich_use_case::{AnalysisSettings, EnrichOutcome, EnrichUseCase};
use crate::app::fetch_use_case::{FetchOutcome, FetchUseCase};
use crate::app::validate_use_case::{ValidateOutcome, ValidateUseCase};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::infra::Adapters;
use crate::pipeline::keys::KeyLayout;

/// Outcomes of a full fetch, validate, enrich pass
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunSummary {
    pub fetch: FetchOutcome,
    pub validate: ValidateOutcome,
    /// `None` when validation produced no products to enrich
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrich: Option<EnrichOutcome>,
    pub duration_secs: f64,
}

/// Chains the three stages in-process, feeding each stage's output
/// location to the next one as its event.
pub struct PipelineOrchestrator {
    pub fetch: FetchUseCase,
    pub validate: ValidateUseCase,
    pub enrich: EnrichUseCase,
}

impl PipelineOrchestrator {
    pub fn new(fetch: FetchUseCase, validate: ValidateUseCase, enrich: EnrichUseCase) -> Self {
        Self { fetch, validate, enrich }
    }

    pub fn from_config(config: &PipelineConfig, adapters: &Adapters, completion: Arc<dyn CompletionPort>) -> Self {
        let keys = KeyLayout::from_config(&config.storage);
        Self::new(
            FetchUseCase::new(
                adapters.http.clone(),
                adapters.store.clone(),
                config.catalog.url.clone(),
                config.storage.bucket.clone(),
                keys.clone(),
            ),
            ValidateUseCase::with_product_contract(adapters.store.clone(), keys.clone()),
            EnrichUseCase::new(
                adapters.store.clone(),
                completion,
                keys,
                AnalysisSettings::from(&config.inference),
            ),
        )
    }

    pub async fn run(&self) -> Result<PipelineRunSummary> {
        let span = info_span!("pipeline_run", run_id = %Uuid::new_v4());
        async {
            let started = Instant::now();

            let fetch = self.fetch.run().await?;
            let validate = self.validate.run(&fetch.next_event()).await?;

            let enrich = if validate.summary.validated_count > 0 {
                Some(self.enrich.run(&validate.next_event()).await?)
            } else {
                info!("No validated products, skipping enrichment");
                None
            };

            let duration_secs = started.elapsed().as_secs_f64();
            info!(
                products = fetch.products_count,
                validated = validate.summary.validated_count,
                failed = validate.summary.failed_count,
                enriched = enrich.is_some(),
                duration_secs,
                "Pipeline run finished"
            );

            Ok(PipelineRunSummary {
                fetch,
                validate,
                enrich,
                duration_secs,
            })
        }
        .instrument(span)
        .await
    }
}
