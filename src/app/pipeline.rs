//! Shared pipeline logic used by every CLI command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load (cached) -> filter -> {aggregate, detect, export}
//!
//! `Session` owns the only long-lived state (the parsed upload). Every filter
//! change produces a fresh `FilteredView`; aggregations and exports are derived
//! from the view on demand and never modify it.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::analysis::{self, Detection, DetectorConfig, GroupSummary, Summary, TimeBucket};
use crate::domain::{Dataset, Dimension, ExportFormat, FilterSpec};
use crate::error::{AppError, ExportError, LoadError};
use crate::io::cache::{DatasetCache, SingleFileCache, load_cached};
use crate::io::export::{ExportOptions, export};
use crate::io::ingest::{LoadOptions, LoadReport, LoadedDataset};

/// Everything a single CLI run needs, folded from flags/env.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub csv_path: PathBuf,
    pub load: LoadOptions,
    pub filter: FilterSpec,
    pub detector: DetectorConfig,
    pub top_n: usize,
}

/// Where the session is in `NoData -> Loaded -> Filtered`.
#[derive(Debug, Clone, Default)]
pub enum PipelineState {
    #[default]
    NoData,
    Loaded(Arc<LoadedDataset>),
}

/// One user's working state: the active upload plus its parse cache.
#[derive(Debug)]
pub struct Session<C: DatasetCache = SingleFileCache> {
    cache: C,
    options: LoadOptions,
    state: PipelineState,
}

impl Session<SingleFileCache> {
    pub fn with_options(options: LoadOptions) -> Self {
        Self::new(SingleFileCache::new(), options)
    }
}

impl<C: DatasetCache> Session<C> {
    pub fn new(cache: C, options: LoadOptions) -> Self {
        Self {
            cache,
            options,
            state: PipelineState::NoData,
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Load an upload. On failure the session falls back to `NoData`.
    pub fn load(&mut self, bytes: &[u8]) -> Result<Arc<LoadedDataset>, LoadError> {
        match load_cached(&mut self.cache, bytes, &self.options) {
            Ok(loaded) => {
                self.state = PipelineState::Loaded(Arc::clone(&loaded));
                Ok(loaded)
            }
            Err(err) => {
                warn!(error = %err, "Load failed; session has no data");
                self.cache.invalidate();
                self.state = PipelineState::NoData;
                Err(err)
            }
        }
    }

    pub fn loaded(&self) -> Result<&Arc<LoadedDataset>, AppError> {
        match &self.state {
            PipelineState::Loaded(loaded) => Ok(loaded),
            PipelineState::NoData => Err(AppError::new(3, "No dataset loaded.")),
        }
    }

    /// Apply `spec` to the active dataset.
    pub fn apply(&self, spec: &FilterSpec) -> Result<FilteredView, AppError> {
        let loaded = self.loaded()?;
        let dataset = analysis::apply_filter(&loaded.dataset, spec);
        info!(
            total = loaded.dataset.len(),
            kept = dataset.len(),
            "Applied filters"
        );
        Ok(FilteredView {
            spec: spec.clone(),
            dataset,
        })
    }
}

/// The filtered dataset for one predicate set.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView {
    pub spec: FilterSpec,
    pub dataset: Dataset,
}

impl FilteredView {
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn summary(&self) -> Summary {
        analysis::summarize(&self.dataset)
    }

    /// Time series at the view's granularity.
    pub fn time_series(&self) -> Vec<TimeBucket> {
        analysis::group_by_time(&self.dataset, self.spec.granularity)
    }

    pub fn group_by(&self, dimension: Dimension) -> Vec<GroupSummary> {
        analysis::group_by(&self.dataset, dimension)
    }

    pub fn top_n(&self, dimension: Dimension, n: usize) -> Vec<GroupSummary> {
        analysis::top_n(&self.dataset, dimension, n)
    }

    pub fn bottom_n(&self, dimension: Dimension, n: usize) -> Vec<GroupSummary> {
        analysis::bottom_n(&self.dataset, dimension, n)
    }

    pub fn detect(&self, config: &DetectorConfig) -> Detection {
        analysis::detect(&self.dataset, config)
    }

    pub fn export(&self, format: ExportFormat, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
        export(&self.dataset, format, options)
    }
}

const FILTER_DIMENSIONS: [Dimension; 4] = [
    Dimension::ProductType,
    Dimension::ProductLine,
    Dimension::Country,
    Dimension::OrderingMethod,
];

/// All computed outputs of a `sales summary` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub report: LoadReport,
    pub view: FilteredView,
    pub summary: Summary,
    pub series: Vec<TimeBucket>,
    pub top: Vec<GroupSummary>,
    pub bottom: Vec<GroupSummary>,
    /// Values available to each categorical filter, from the unfiltered upload.
    pub choices: Vec<(Dimension, Vec<String>)>,
}

/// Execute load -> filter -> aggregate over `bytes`.
pub fn run_summary(config: &PipelineConfig, bytes: &[u8]) -> Result<RunOutput, AppError> {
    let mut session = Session::with_options(config.load.clone());
    let loaded = session.load(bytes)?;
    let view = session.apply(&config.filter)?;

    Ok(RunOutput {
        report: loaded.report.clone(),
        summary: view.summary(),
        series: view.time_series(),
        top: view.top_n(Dimension::ProductType, config.top_n),
        bottom: view.bottom_n(Dimension::ProductType, config.top_n),
        choices: FILTER_DIMENSIONS
            .iter()
            .map(|&dim| (dim, loaded.dataset.distinct(dim)))
            .collect(),
        view,
    })
}
