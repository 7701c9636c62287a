//! Orchestrator module for the sync pipeline.
//!
//! Coordinates the extractor, transformer and loader for every configured
//! entity type, one cycle after another.

use std::fmt;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::errors::SyncError;
use crate::extractor::Extractor;
use crate::loader::SearchLoader;
use crate::state::WatermarkStore;
use crate::transformer::Transformer;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Entity types synced each cycle, in order.
    pub entity_types: Vec<String>,
    /// Number of documents per bulk request.
    pub batch_size: usize,
    /// Pause between the end of one cycle and the start of the next.
    pub interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            entity_types: vec!["movies".into(), "genres".into(), "persons".into()],
            batch_size: 100,
            interval: Duration::from_secs(60),
        }
    }
}

/// How the sync of one entity type ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The pipeline ran to completion.
    Synced {
        /// Documents written to the index.
        written: usize,
    },
    /// The entity type was skipped for this cycle.
    Skipped {
        /// Why it was skipped.
        reason: String,
    },
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synced { written } => write!(f, "synced ({} written)", written),
            Self::Skipped { reason } => write!(f, "skipped ({})", reason),
        }
    }
}

/// Outcome of every entity type in one cycle, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub outcomes: Vec<(String, SyncOutcome)>,
}

impl CycleReport {
    /// Outcome of one entity type.
    pub fn outcome(&self, entity_type: &str) -> Option<&SyncOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == entity_type)
            .map(|(_, outcome)| outcome)
    }

    /// Documents written across all entity types.
    pub fn total_written(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, outcome)| match outcome {
                SyncOutcome::Synced { written } => *written,
                SyncOutcome::Skipped { .. } => 0,
            })
            .sum()
    }
}

/// Orchestrator that runs the pipeline for each entity type.
///
/// The orchestrator:
/// - Resolves the watermark of each type before extracting
/// - Skips unsupported types and carries on with the rest
/// - Propagates fatal errors, which end the process
/// - Sleeps for the configured interval between cycles
pub struct Orchestrator {
    watermarks: WatermarkStore,
    extractor: Extractor,
    transformer: Transformer,
    loader: SearchLoader,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        watermarks: WatermarkStore,
        extractor: Extractor,
        transformer: Transformer,
        loader: SearchLoader,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            watermarks,
            extractor,
            transformer,
            loader,
            config,
        }
    }

    /// The configuration this orchestrator runs with.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Make sure every configured index exists.
    ///
    /// Unsupported types are left for [`Orchestrator::run_cycle`] to report.
    #[instrument(skip(self))]
    pub async fn prepare(&self) -> Result<(), SyncError> {
        for entity_type in &self.config.entity_types {
            match self.loader.ensure_index(entity_type).await {
                Ok(_) => {}
                Err(e) if e.is_skippable() => {
                    warn!(entity_type = %entity_type, error = %e, "Skipping index creation");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Run cycles forever.
    ///
    /// Only returns on a fatal error.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), SyncError> {
        info!(
            entity_types = ?self.config.entity_types,
            interval_secs = self.config.interval.as_secs(),
            "Starting search sync orchestrator"
        );

        loop {
            if let Err(e) = self.run_cycle().await {
                error!(error = %e, "Sync cycle failed");
                return Err(e);
            }

            info!(
                interval_secs = self.config.interval.as_secs(),
                "Sleeping until next cycle"
            );
            tokio::time::sleep(self.config.interval).await;
        }
    }

    /// Sync every configured entity type once.
    pub async fn run_cycle(&self) -> Result<CycleReport, SyncError> {
        info!("Starting sync...");

        let mut report = CycleReport::default();
        for entity_type in &self.config.entity_types {
            let outcome = self.sync_entity(entity_type).await?;
            info!(entity_type = %entity_type, outcome = %outcome, "Entity type done");
            report.outcomes.push((entity_type.clone(), outcome));
        }

        info!(written = report.total_written(), "Sync cycle complete");
        Ok(report)
    }

    /// Run the pipeline for one entity type.
    ///
    /// The watermark only moves when the loader has written and committed the
    /// whole batch.
    #[instrument(skip(self))]
    pub async fn sync_entity(&self, entity_type: &str) -> Result<SyncOutcome, SyncError> {
        let watermark = self.watermarks.load(entity_type).await?;

        let records = match self.extractor.extract(entity_type, &watermark).await {
            Ok(records) => records,
            Err(e) if e.is_skippable() => {
                warn!(error = %e, "Skipping entity type");
                return Ok(SyncOutcome::Skipped {
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let stream = self.transformer.transform(entity_type, watermark, records);
        let written = self
            .loader
            .load(entity_type, stream, self.config.batch_size)
            .await?;

        Ok(SyncOutcome::Synced { written })
    }
}
