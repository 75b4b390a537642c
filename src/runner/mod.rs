// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! Pipeline runner
//!
//! One operation per demonstration scenario. Every operation builds a fresh
//! pipeline, delivers it to the given subscriber, and returns the terminal
//! [`Outcome`]. Pipeline errors are delivered to the subscriber's error
//! channel and reported in the outcome; the `Err` arm of the returned
//! result is reserved for subscriber failures.

pub mod random;

use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{FlowError, FlowResult};
use crate::flow::{Flux, Mono, Outcome, Subscriber, ZipPolicy};
use random::{SharedRandom, ThreadRandom};

/// Draws below this value count as failed attempts
pub const DEFAULT_THRESHOLD: i64 = 50;

/// Message of the error a generator reports for a low draw
pub const LOW_DRAW_MESSAGE: &str = "Too low number";

/// Message published on every failed attempt
pub const ERROR_NOTICE: &str = "Error happened.";

/// Side channel for messages produced inside a pipeline (error hooks)
pub type NoticeHook = Arc<dyn Fn(&str) + Send + Sync>;

/// How a generator reports a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Return an error value through the result channel
    #[default]
    Signaled,
    /// Panic; the pipeline catches it and turns it into an error
    Disruptive,
}

/// Generator that fails whenever its draw is below a threshold
#[derive(Clone)]
pub struct ThresholdGenerator {
    random: SharedRandom,
    lower: i64,
    upper: i64,
    threshold: i64,
    draws: Arc<Mutex<Vec<i64>>>,
}

impl ThresholdGenerator {
    pub fn new(random: SharedRandom, lower: i64, upper: i64) -> Self {
        Self {
            random,
            lower,
            upper,
            threshold: DEFAULT_THRESHOLD,
            draws: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_threshold(mut self, threshold: i64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Every value drawn so far, across all attempts
    pub fn draws(&self) -> Vec<i64> {
        self.draws
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn next_draw(&self) -> i64 {
        let value = random::draw(&self.random, self.lower, self.upper);
        self.draws
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(value);
        tracing::trace!(value, threshold = self.threshold, "drew value");
        value
    }

    /// One attempt, failing with a signaled error
    pub fn attempt(&self) -> FlowResult<i64> {
        let value = self.next_draw();
        if value < self.threshold {
            Err(FlowError::signaled(LOW_DRAW_MESSAGE))
        } else {
            Ok(value)
        }
    }

    /// One attempt, failing by panicking
    ///
    /// # Panics
    ///
    /// Panics when the draw is below the threshold.
    pub fn attempt_or_panic(&self) -> i64 {
        let value = self.next_draw();
        if value < self.threshold {
            panic!("{}", LOW_DRAW_MESSAGE);
        }
        value
    }

    /// A single-value container running one attempt per subscription
    pub fn into_mono(self, policy: FailurePolicy) -> Mono<i64> {
        match policy {
            FailurePolicy::Signaled => Mono::from_callable(move || self.attempt()),
            FailurePolicy::Disruptive => Mono::from_fallible(move || self.attempt_or_panic()),
        }
    }
}

/// Result of [`PipelineRunner::run_retried`]
#[derive(Debug, Clone)]
pub struct RetryReport {
    pub outcome: Outcome,
    /// Values drawn, one per attempt, in order
    pub draws: Vec<i64>,
    /// Attempts that ended in an error
    pub failed_attempts: usize,
}

/// Runs the demonstration scenarios against an injected subscriber
pub struct PipelineRunner {
    random: SharedRandom,
    notices: Option<NoticeHook>,
}

impl PipelineRunner {
    pub fn new(random: SharedRandom) -> Self {
        Self {
            random,
            notices: None,
        }
    }

    /// Runner with a reproducible random source
    pub fn seeded(seed: u64) -> Self {
        Self::new(random::shared(random::SeededRandom::from_seed(seed)))
    }

    /// Runner with the process-wide, unseeded random source
    pub fn unseeded() -> Self {
        Self::new(random::shared(ThreadRandom))
    }

    /// Publish error-hook messages through `hook`
    pub fn with_notices(mut self, hook: NoticeHook) -> Self {
        self.notices = Some(hook);
        self
    }

    pub fn random(&self) -> &SharedRandom {
        &self.random
    }

    /// One item, then completion
    pub async fn run_single_value<S>(&self, value: &str, subscriber: &mut S) -> FlowResult<Outcome>
    where
        S: Subscriber<String> + ?Sized,
    {
        Mono::just(value.to_string()).deliver(subscriber).await
    }

    /// One item passed through `transform`, then completion
    pub async fn run_single_value_transformed<F, S>(
        &self,
        value: &str,
        transform: F,
        subscriber: &mut S,
    ) -> FlowResult<Outcome>
    where
        F: Fn(String) -> String + Send + Sync + 'static,
        S: Subscriber<String> + ?Sized,
    {
        Mono::just(value.to_string())
            .map(transform)
            .deliver(subscriber)
            .await
    }

    /// An immediate signaled error carrying `message`
    pub async fn run_single_value_error<S>(
        &self,
        message: &str,
        subscriber: &mut S,
    ) -> FlowResult<Outcome>
    where
        S: Subscriber<String> + ?Sized,
    {
        Mono::error(FlowError::signaled(message))
            .deliver(subscriber)
            .await
    }

    /// Every item in order, then completion
    pub async fn run_sequence<T, S>(&self, items: Vec<T>, subscriber: &mut S) -> FlowResult<Outcome>
    where
        T: Display + Clone + Send + Sync + 'static,
        S: Subscriber<String> + ?Sized,
    {
        Flux::from_iter(items)
            .map(|item| item.to_string())
            .deliver(subscriber)
            .await
    }

    /// Pairwise combination, truncated to the shorter sequence
    pub async fn run_zipped<A, B, F, S>(
        &self,
        left: Vec<A>,
        right: Vec<B>,
        combiner: F,
        subscriber: &mut S,
    ) -> FlowResult<Outcome>
    where
        A: Clone + Send + Sync + 'static,
        B: Clone + Send + Sync + 'static,
        F: Fn(A, B) -> String + Send + Sync + 'static,
        S: Subscriber<String> + ?Sized,
    {
        self.run_zipped_with(left, right, ZipPolicy::Truncate, combiner, subscriber)
            .await
    }

    pub async fn run_zipped_with<A, B, F, S>(
        &self,
        left: Vec<A>,
        right: Vec<B>,
        policy: ZipPolicy,
        combiner: F,
        subscriber: &mut S,
    ) -> FlowResult<Outcome>
    where
        A: Clone + Send + Sync + 'static,
        B: Clone + Send + Sync + 'static,
        F: Fn(A, B) -> String + Send + Sync + 'static,
        S: Subscriber<String> + ?Sized,
    {
        if left.len() != right.len() {
            tracing::debug!(
                left = left.len(),
                right = right.len(),
                ?policy,
                "zipping sequences of different lengths"
            );
        }

        Flux::zip_with(Flux::from_iter(left), Flux::from_iter(right), policy, combiner)
            .deliver(subscriber)
            .await
    }

    /// Two delayed sequences merged in arrival order
    ///
    /// Returns once both sequences have completed.
    pub async fn run_merged_with_delay<A, B, S>(
        &self,
        first: Vec<A>,
        first_delay: Duration,
        second: Vec<B>,
        second_delay: Duration,
        subscriber: &mut S,
    ) -> FlowResult<Outcome>
    where
        A: Display + Clone + Send + Sync + 'static,
        B: Display + Clone + Send + Sync + 'static,
        S: Subscriber<String> + ?Sized,
    {
        let first = Flux::from_iter(first)
            .delay_elements(first_delay)
            .map(|item| item.to_string());
        let second = Flux::from_iter(second)
            .delay_elements(second_delay)
            .map(|item| item.to_string());

        Flux::merge(first, second).deliver(subscriber).await
    }

    /// The sequence followed by `times` replays of it
    pub async fn run_repeated<T, S>(
        &self,
        items: Vec<T>,
        times: usize,
        subscriber: &mut S,
    ) -> FlowResult<Outcome>
    where
        T: Display + Clone + Send + Sync + 'static,
        S: Subscriber<String> + ?Sized,
    {
        Flux::from_iter(items)
            .repeat(times)
            .map(|item| item.to_string())
            .deliver(subscriber)
            .await
    }

    /// Draw in `lower..=upper` until a draw reaches the threshold
    ///
    /// Makes at most `max_retries + 1` attempts. Every failed attempt
    /// publishes a notice before the retry.
    pub async fn run_retried<S>(
        &self,
        lower: i64,
        upper: i64,
        max_retries: usize,
        policy: FailurePolicy,
        subscriber: &mut S,
    ) -> FlowResult<RetryReport>
    where
        S: Subscriber<String> + ?Sized,
    {
        let generator = ThresholdGenerator::new(Arc::clone(&self.random), lower, upper);
        let failures = Arc::new(Mutex::new(0usize));

        let seen = Arc::clone(&failures);
        let notices = self.notices.clone();
        let mono = generator
            .clone()
            .into_mono(policy)
            .do_on_error(move |error| {
                tracing::info!(error = %error, "attempt failed");
                *seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) += 1;
                if let Some(hook) = &notices {
                    hook(ERROR_NOTICE);
                }
            })
            .retry(max_retries)
            .map(|value| value.to_string());

        let outcome = mono.deliver(subscriber).await?;
        let failed_attempts = *failures.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        Ok(RetryReport {
            outcome,
            draws: generator.draws(),
            failed_attempts,
        })
    }
}

impl Default for PipelineRunner {
    fn default() -> Self {
        Self::unseeded()
    }
}

#[cfg(test)]
mod tests {
    use super::random::{shared, ScriptedRandom};
    use super::*;
    use crate::flow::{Recorder, Signal};

    fn words() -> Vec<&'static str> {
        vec!["One", "Two", "Three", "Four"]
    }

    fn scripted(values: Vec<i64>) -> PipelineRunner {
        PipelineRunner::new(shared(ScriptedRandom::new(values)))
    }

    #[tokio::test]
    async fn test_run_single_value() {
        let mut recorder = Recorder::new();
        PipelineRunner::default()
            .run_single_value("first-mono", &mut recorder)
            .await
            .unwrap();

        assert_eq!(
            recorder.signals(),
            vec![Signal::Next("first-mono".to_string()), Signal::Complete]
        );
    }

    #[tokio::test]
    async fn test_run_single_value_transformed() {
        let mut recorder = Recorder::new();
        PipelineRunner::default()
            .run_single_value_transformed("first-mono", |s| s.to_uppercase(), &mut recorder)
            .await
            .unwrap();

        assert_eq!(recorder.items(), vec!["FIRST-MONO"]);
    }

    #[tokio::test]
    async fn test_run_single_value_error() {
        let mut recorder = Recorder::new();
        let outcome = PipelineRunner::default()
            .run_single_value_error("this is an error", &mut recorder)
            .await
            .unwrap();

        assert!(recorder.items().is_empty());
        assert_eq!(recorder.error().unwrap().to_string(), "this is an error");
        assert_eq!(outcome.error().unwrap().to_string(), "this is an error");
    }

    #[tokio::test]
    async fn test_run_sequence() {
        let mut recorder = Recorder::new();
        let outcome = PipelineRunner::default()
            .run_sequence(words(), &mut recorder)
            .await
            .unwrap();

        assert_eq!(outcome.delivered(), 4);
        assert_eq!(recorder.items(), words());
        assert_eq!(recorder.completions(), 1);
        assert_eq!(recorder.signals().len(), 5);
    }

    #[tokio::test]
    async fn test_run_zipped_example() {
        let mut recorder = Recorder::new();
        PipelineRunner::default()
            .run_zipped(words(), vec![1, 2, 3, 4], |s, i| format!("{}-{}", i, s), &mut recorder)
            .await
            .unwrap();

        assert_eq!(recorder.items(), vec!["1-One", "2-Two", "3-Three", "4-Four"]);
    }

    #[tokio::test]
    async fn test_run_zipped_uneven_lengths() {
        let mut recorder = Recorder::new();
        let outcome = PipelineRunner::default()
            .run_zipped(words(), vec![1, 2, 3], |s, i| format!("{}-{}", i, s), &mut recorder)
            .await
            .unwrap();

        assert!(outcome.is_completed());
        assert_eq!(recorder.items().len(), 3);

        let mut strict = Recorder::new();
        let outcome = PipelineRunner::default()
            .run_zipped_with(
                words(),
                vec![1, 2, 3],
                ZipPolicy::Strict,
                |s, i| format!("{}-{}", i, s),
                &mut strict,
            )
            .await
            .unwrap();

        assert_eq!(strict.items().len(), 3);
        assert!(matches!(
            outcome.error(),
            Some(FlowError::ZipLengthMismatch { index: 3, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_merged_with_delay() {
        let mut recorder = Recorder::new();
        let outcome = PipelineRunner::default()
            .run_merged_with_delay(
                words(),
                Duration::from_millis(500),
                vec![1, 2, 3, 4],
                Duration::from_millis(1000),
                &mut recorder,
            )
            .await
            .unwrap();

        let items = recorder.items();
        assert!(outcome.is_completed());
        assert_eq!(items.len(), 8);
        assert_eq!(items[0], "One");

        let position = |s: &str| items.iter().position(|i| i == s).unwrap();
        assert!(position("One") < position("1"));

        // order within each source is preserved
        let letters: Vec<_> = items.iter().filter(|i| i.parse::<i64>().is_err()).collect();
        let numbers: Vec<_> = items.iter().filter(|i| i.parse::<i64>().is_ok()).collect();
        assert_eq!(letters, ["One", "Two", "Three", "Four"]);
        assert_eq!(numbers, ["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_run_repeated() {
        let mut recorder = Recorder::new();
        PipelineRunner::default()
            .run_repeated(words(), 4, &mut recorder)
            .await
            .unwrap();

        let items = recorder.items();
        assert_eq!(items.len(), 4 * 5);
        assert_eq!(&items[16..], ["One", "Two", "Three", "Four"]);
        assert_eq!(recorder.completions(), 1);
    }

    #[tokio::test]
    async fn test_run_retried_recovers() {
        let notices = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notices);
        let runner = scripted(vec![10, 20, 55]).with_notices(Arc::new(move |msg: &str| {
            sink.lock().unwrap().push(msg.to_string());
        }));

        let mut recorder = Recorder::new();
        let report = runner
            .run_retried(1, 60, 5, FailurePolicy::Signaled, &mut recorder)
            .await
            .unwrap();

        assert_eq!(report.draws, vec![10, 20, 55]);
        assert_eq!(report.failed_attempts, 2);
        assert_eq!(recorder.items(), vec!["55"]);
        assert!(report.outcome.is_completed());
        assert_eq!(*notices.lock().unwrap(), vec![ERROR_NOTICE, ERROR_NOTICE]);
    }

    #[tokio::test]
    async fn test_run_retried_exhausts() {
        let mut recorder = Recorder::new();
        let report = scripted(vec![10])
            .run_retried(1, 60, 5, FailurePolicy::Signaled, &mut recorder)
            .await
            .unwrap();

        assert_eq!(report.draws.len(), 6);
        assert_eq!(report.failed_attempts, 6);
        assert!(recorder.items().is_empty());
        match recorder.error() {
            Some(FlowError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 6);
                assert_eq!(last.to_string(), LOW_DRAW_MESSAGE);
            }
            other => panic!("expected exhausted retries, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_retried_disruptive() {
        let mut recorder = Recorder::new();
        let report = scripted(vec![3, 58])
            .run_retried(1, 60, 5, FailurePolicy::Disruptive, &mut recorder)
            .await
            .unwrap();

        assert_eq!(report.failed_attempts, 1);
        assert_eq!(recorder.items(), vec!["58"]);
    }

    #[tokio::test]
    async fn test_run_retried_properties_over_seeds() {
        for seed in 0..200 {
            let mut recorder = Recorder::new();
            let report = PipelineRunner::seeded(seed)
                .run_retried(1, 60, 5, FailurePolicy::Signaled, &mut recorder)
                .await
                .unwrap();

            let low = report.draws.iter().filter(|&&d| d < DEFAULT_THRESHOLD).count();
            assert_eq!(report.failed_attempts, low);
            assert!(report.draws.len() <= 6);

            let items = recorder.items();
            match report.draws.last() {
                Some(&last) if last >= DEFAULT_THRESHOLD => {
                    assert_eq!(items, vec![last.to_string()]);
                    assert_eq!(low, report.draws.len() - 1);
                }
                _ => {
                    assert!(items.is_empty());
                    assert_eq!(report.draws.len(), 6);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_run_retried_reproducible_with_seed() {
        let mut first = Recorder::new();
        let mut second = Recorder::new();
        let a = PipelineRunner::seeded(99)
            .run_retried(1, 60, 5, FailurePolicy::Signaled, &mut first)
            .await
            .unwrap();
        let b = PipelineRunner::seeded(99)
            .run_retried(1, 60, 5, FailurePolicy::Signaled, &mut second)
            .await
            .unwrap();

        assert_eq!(a.draws, b.draws);
        assert_eq!(first.items(), second.items());
    }
}
