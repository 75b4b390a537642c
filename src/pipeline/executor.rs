// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! Pipeline executor
//!
//! Turns a pipeline definition into a [`Flux`] and drives it to a terminal
//! signal.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::{FlowError, FlowResult};
use crate::flow::{Flux, Mono, OutcomeStatus, Subscriber};
use crate::pipeline::{
    Flow, Pipeline, PipelineValidator, Source, Stage, Termination, ValidationResult,
};
use crate::runner::random::{self, SharedRandom, ThreadRandom};
use crate::runner::{NoticeHook, ThresholdGenerator};

type NoticeLog = Arc<Mutex<Vec<String>>>;

/// Result of executing a pipeline
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Pipeline name
    pub pipeline: String,
    /// Items delivered to the subscriber
    pub delivered: usize,
    /// Terminal state
    pub status: OutcomeStatus,
    /// Terminal error, if the pipeline failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Last delivered item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    /// Messages published by `on-error` stages, in order
    pub notices: Vec<String>,
    /// Wall-clock duration of the run
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.status == OutcomeStatus::Completed
    }
}

/// Pipeline executor
pub struct PipelineExecutor {
    random: SharedRandom,
    notices: Option<NoticeHook>,
}

impl PipelineExecutor {
    pub fn new(random: SharedRandom) -> Self {
        Self {
            random,
            notices: None,
        }
    }

    /// Executor whose random sources replay from `seed`
    pub fn seeded(seed: u64) -> Self {
        Self::new(random::shared(random::SeededRandom::from_seed(seed)))
    }

    pub fn unseeded() -> Self {
        Self::new(random::shared(ThreadRandom))
    }

    /// Also publish `on-error` messages through `hook` as they happen
    pub fn with_notices(mut self, hook: NoticeHook) -> Self {
        self.notices = Some(hook);
        self
    }

    /// Build the pipeline's flux without subscribing to it
    pub fn build(&self, pipeline: &Pipeline) -> FlowResult<Flux<String>> {
        Self::check(pipeline)?;
        Ok(self.build_flow(&pipeline.source, &pipeline.stages, &NoticeLog::default()))
    }

    /// Execute a pipeline, delivering its items to `subscriber`
    ///
    /// A pipeline that ends in an error still returns `Ok`; the error is in
    /// the report. `Err` means the pipeline is invalid or the subscriber
    /// failed.
    pub async fn execute<S>(&self, pipeline: &Pipeline, subscriber: S) -> FlowResult<RunReport>
    where
        S: Subscriber<String> + 'static,
    {
        Self::check(pipeline)?;

        let start = Instant::now();
        let log = NoticeLog::default();
        let flux = self.build_flow(&pipeline.source, &pipeline.stages, &log);

        let last = Arc::new(Mutex::new(None));
        let mut tracked = Tracking {
            inner: subscriber,
            last: Arc::clone(&last),
        };

        tracing::info!(
            pipeline = %pipeline.name,
            termination = ?pipeline.termination,
            "executing pipeline"
        );

        let outcome = match pipeline.termination {
            Termination::Subscribe => flux.subscribe(tracked).join().await?,
            Termination::BlockLast => flux.deliver(&mut tracked).await?,
        };

        let elapsed = start.elapsed();
        tracing::info!(
            pipeline = %pipeline.name,
            status = %outcome.status(),
            delivered = outcome.delivered(),
            elapsed_ms = elapsed.as_millis() as u64,
            "pipeline finished"
        );

        let last = lock(&last).clone();
        let notices = lock(&log).clone();

        Ok(RunReport {
            pipeline: pipeline.name.clone(),
            delivered: outcome.delivered(),
            status: outcome.status(),
            error: outcome.error().map(ToString::to_string),
            last,
            notices,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    fn check(pipeline: &Pipeline) -> FlowResult<()> {
        let mut result = ValidationResult::new();
        PipelineValidator::validate_pipeline(pipeline, &mut result);

        for warning in &result.warnings {
            tracing::warn!(pipeline = %pipeline.name, "{}", warning);
        }

        if result.is_valid() {
            Ok(())
        } else {
            Err(FlowError::InvalidPipeline {
                reason: result.errors.join("; "),
                help: Some(format!("Run `reflow show {}` to inspect it", pipeline.name)),
            })
        }
    }

    fn build_flow(&self, source: &Source, stages: &[Stage], log: &NoticeLog) -> Flux<String> {
        stages
            .iter()
            .fold(self.build_source(source, log), |flux, stage| {
                self.apply_stage(flux, stage, log)
            })
    }

    fn build_sub_flow(&self, flow: &Flow, log: &NoticeLog) -> Flux<String> {
        self.build_flow(&flow.source, &flow.stages, log)
    }

    fn build_source(&self, source: &Source, log: &NoticeLog) -> Flux<String> {
        match source {
            Source::Just { value } => Mono::just(value.clone()).into_flux(),
            Source::Error { message } => Flux::error(FlowError::signaled(message.clone())),
            Source::Items { items } => Flux::from_iter(items.clone()),
            Source::Range { start, count } => Flux::range(*start, *count).map(|n| n.to_string()),
            Source::Random {
                lower,
                upper,
                threshold,
                failure,
            } => ThresholdGenerator::new(Arc::clone(&self.random), *lower, *upper)
                .with_threshold(*threshold)
                .into_mono(*failure)
                .map(|value| value.to_string())
                .into_flux(),
            Source::Zip {
                left,
                right,
                combiner,
                policy,
            } => {
                let combiner = combiner.clone();
                Flux::zip_with(
                    self.build_sub_flow(left, log),
                    self.build_sub_flow(right, log),
                    *policy,
                    move |l: String, r: String| combiner.combine(&l, &r),
                )
            }
            Source::Merge { flows } => Flux::merge_all(
                flows
                    .iter()
                    .map(|flow| self.build_sub_flow(flow, log))
                    .collect(),
            ),
        }
    }

    fn apply_stage(&self, flux: Flux<String>, stage: &Stage, log: &NoticeLog) -> Flux<String> {
        match stage {
            Stage::Map { transform, value } => {
                let transform = *transform;
                let value = value.clone();
                flux.map(move |item| transform.apply(value.as_deref(), &item))
            }
            Stage::Delay { millis } => flux.delay_elements(Duration::from_millis(*millis)),
            Stage::Repeat { times } => flux.repeat(*times),
            Stage::Retry { max_retries } => flux.retry(*max_retries),
            Stage::OnError { message } => {
                let message = message.clone();
                let log = Arc::clone(log);
                let hook = self.notices.clone();
                flux.do_on_error(move |error| {
                    tracing::info!(error = %error, "error passed through pipeline");
                    lock(&log).push(message.clone());
                    if let Some(hook) = &hook {
                        hook(&message);
                    }
                })
            }
        }
    }
}

impl Default for PipelineExecutor {
    fn default() -> Self {
        Self::unseeded()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Forwards every signal and remembers the last item
struct Tracking<S> {
    inner: S,
    last: Arc<Mutex<Option<String>>>,
}

#[async_trait]
impl<S: Subscriber<String>> Subscriber<String> for Tracking<S> {
    async fn on_next(&mut self, item: String) -> FlowResult<()> {
        *lock(&self.last) = Some(item.clone());
        self.inner.on_next(item).await
    }

    async fn on_error(&mut self, error: FlowError) -> FlowResult<()> {
        self.inner.on_error(error).await
    }

    async fn on_complete(&mut self) -> FlowResult<()> {
        self.inner.on_complete().await
    }
}
