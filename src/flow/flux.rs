// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! Sequence container

use std::sync::Arc;
use std::time::Duration;

use futures::future;
use futures::stream::{self, PollNext, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::errors::{FlowError, FlowResult};
use crate::flow::{drive, FlowStream, Outcome, Subscriber, Subscription};

type Factory<T> = Arc<dyn Fn() -> FlowStream<T> + Send + Sync>;

/// What `zip` does when one side runs out before the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZipPolicy {
    /// Stop at the shorter side
    #[default]
    Truncate,
    /// Signal `ZipLengthMismatch` at the first unmatched index
    Strict,
}

/// A lazy, re-subscribable sequence of zero or more items
pub struct Flux<T> {
    factory: Factory<T>,
}

impl<T> Clone for Flux<T> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

struct ZipState<A, B> {
    left: FlowStream<A>,
    right: FlowStream<B>,
    index: usize,
    done: bool,
}

impl<T: Send + 'static> Flux<T> {
    pub(crate) fn from_factory<F>(factory: F) -> Self
    where
        F: Fn() -> FlowStream<T> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// Sequence over a fixed list of items
    pub fn from_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Clone + Sync,
    {
        let items: Vec<T> = items.into_iter().collect();
        Self::from_factory(move || stream::iter(items.clone().into_iter().map(Ok)).boxed())
    }

    pub fn empty() -> Self {
        Self::from_factory(|| stream::empty().boxed())
    }

    /// Sequence that signals `error` without producing items
    pub fn error(error: FlowError) -> Self {
        Self::from_factory(move || stream::once(future::ready(Err(error.clone()))).boxed())
    }

    /// Start a fresh run of the source
    ///
    /// The returned stream ends right after the first error, whatever the
    /// source does afterwards.
    pub fn open(&self) -> FlowStream<T> {
        (self.factory)()
            .scan(false, |failed, item| {
                if *failed {
                    return future::ready(None);
                }
                *failed = item.is_err();
                future::ready(Some(item))
            })
            .boxed()
    }

    pub fn map<U, F>(self, f: F) -> Flux<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let source = self.factory;
        Flux::from_factory(move || {
            let f = Arc::clone(&f);
            source().map(move |item| item.map(|value| f(value))).boxed()
        })
    }

    /// Hold each item back by `delay` before emitting it
    pub fn delay_elements(self, delay: Duration) -> Self {
        let source = self.factory;
        Self::from_factory(move || {
            source()
                .then(move |item| async move {
                    if item.is_ok() {
                        tokio::time::sleep(delay).await;
                    }
                    item
                })
                .boxed()
        })
    }

    pub fn do_on_next<F>(self, f: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let source = self.factory;
        Self::from_factory(move || {
            let f = Arc::clone(&f);
            source()
                .inspect(move |item| {
                    if let Ok(value) = item {
                        f(value);
                    }
                })
                .boxed()
        })
    }

    /// Run `f` on every error the source signals, before it propagates
    pub fn do_on_error<F>(self, f: F) -> Self
    where
        F: Fn(&FlowError) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let source = self.factory;
        Self::from_factory(move || {
            let f = Arc::clone(&f);
            source()
                .inspect(move |item| {
                    if let Err(error) = item {
                        f(error);
                    }
                })
                .boxed()
        })
    }

    /// Replay the whole source `times` more times after it completes
    pub fn repeat(self, times: usize) -> Self {
        let source = self.factory;
        Self::from_factory(move || {
            let source = Arc::clone(&source);
            stream::iter(0..=times)
                .flat_map(move |round| {
                    tracing::trace!(round, times, "subscribing to repeated source");
                    source()
                })
                .boxed()
        })
    }

    /// Resubscribe after an error, at most `max_retries` times
    ///
    /// Items emitted by a failed attempt have already been delivered and are
    /// delivered again by the next attempt. When every attempt fails the
    /// last error is wrapped in `RetriesExhausted`.
    pub fn retry(self, max_retries: usize) -> Self {
        let source = self.factory;
        Self::from_factory(move || {
            let source = Arc::clone(&source);
            let first = source();
            stream::unfold(Some((0usize, first)), move |state| {
                let source = Arc::clone(&source);
                async move {
                    let (mut retries, mut current) = match state {
                        Some(state) => state,
                        None => return None,
                    };
                    loop {
                        match current.next().await {
                            Some(Ok(item)) => return Some((Ok(item), Some((retries, current)))),
                            Some(Err(error)) if retries < max_retries => {
                                retries += 1;
                                tracing::debug!(
                                    retry = retries,
                                    max_retries,
                                    error = %error,
                                    "resubscribing after error"
                                );
                                current = source();
                            }
                            Some(Err(error)) => {
                                tracing::debug!(attempts = retries + 1, "retries exhausted");
                                let exhausted = FlowError::RetriesExhausted {
                                    attempts: retries + 1,
                                    last: Box::new(error),
                                };
                                return Some((Err(exhausted), None));
                            }
                            None => return None,
                        }
                    }
                }
            })
            .boxed()
        })
    }

    /// Pair items positionally, stopping at the shorter side
    pub fn zip<U, R, F>(left: Flux<T>, right: Flux<U>, combiner: F) -> Flux<R>
    where
        U: Send + 'static,
        R: Send + 'static,
        F: Fn(T, U) -> R + Send + Sync + 'static,
    {
        Self::zip_with(left, right, ZipPolicy::Truncate, combiner)
    }

    pub fn zip_with<U, R, F>(left: Flux<T>, right: Flux<U>, policy: ZipPolicy, combiner: F) -> Flux<R>
    where
        U: Send + 'static,
        R: Send + 'static,
        F: Fn(T, U) -> R + Send + Sync + 'static,
    {
        let combiner = Arc::new(combiner);
        Flux::from_factory(move || {
            let combiner = Arc::clone(&combiner);
            let state = ZipState {
                left: left.open(),
                right: right.open(),
                index: 0,
                done: false,
            };

            stream::unfold(state, move |mut state| {
                let combiner = Arc::clone(&combiner);
                async move {
                    if state.done {
                        return None;
                    }

                    let (l, r) = futures::join!(state.left.next(), state.right.next());
                    let index = state.index;
                    state.index += 1;

                    let item = match (l, r) {
                        (Some(Ok(a)), Some(Ok(b))) => Ok(combiner(a, b)),
                        (Some(Err(e)), _) | (_, Some(Err(e))) => Err(e),
                        (None, None) => return None,
                        (Some(Ok(_)), None) | (None, Some(Ok(_)))
                            if policy == ZipPolicy::Truncate =>
                        {
                            return None
                        }
                        (Some(Ok(_)), None) => Err(FlowError::ZipLengthMismatch {
                            index,
                            longer: "left".into(),
                        }),
                        (None, Some(Ok(_))) => Err(FlowError::ZipLengthMismatch {
                            index,
                            longer: "right".into(),
                        }),
                    };

                    state.done = item.is_err();
                    Some((item, state))
                }
            })
            .boxed()
        })
    }

    /// Interleave two sources in arrival order
    ///
    /// When both sides have an item ready at the same poll, `first` wins.
    pub fn merge(first: Flux<T>, second: Flux<T>) -> Flux<T> {
        Flux::from_factory(move || {
            stream::select_with_strategy(first.open(), second.open(), prefer_first).boxed()
        })
    }

    /// Merge any number of sources; earlier sources win ties
    pub fn merge_all(sources: Vec<Flux<T>>) -> Flux<T> {
        sources
            .into_iter()
            .reduce(Flux::merge)
            .unwrap_or_else(Flux::empty)
    }

    /// Deliver on a spawned task and return immediately
    pub fn subscribe<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<T> + 'static,
    {
        Subscription::spawn(self.open(), subscriber)
    }

    /// Deliver on the current task until a terminal signal
    pub async fn deliver<S>(&self, subscriber: &mut S) -> FlowResult<Outcome>
    where
        S: Subscriber<T> + ?Sized,
    {
        drive(self.open(), subscriber, None, |_| {}).await
    }

    /// Deliver every item and return the last one
    ///
    /// A source error is delivered to the subscriber and also returned.
    pub async fn block_last<S>(&self, subscriber: &mut S) -> FlowResult<Option<T>>
    where
        S: Subscriber<T> + ?Sized,
        T: Clone,
    {
        let mut last = None;
        let outcome = drive(self.open(), subscriber, None, |item: &T| {
            last = Some(item.clone());
        })
        .await?;

        match outcome {
            Outcome::Failed { error, .. } => Err(error),
            _ => Ok(last),
        }
    }

    /// Collect every item, failing on the first error
    pub async fn collect_list(&self) -> FlowResult<Vec<T>> {
        self.open().try_collect().await
    }
}

impl Flux<i64> {
    /// `count` consecutive integers starting at `start`
    ///
    /// A value past `i64::MAX` is signaled as `RangeOverflow` in its place.
    pub fn range(start: i64, count: usize) -> Self {
        Self::from_factory(move || {
            stream::iter((0..count).map(move |offset| {
                i64::try_from(offset)
                    .ok()
                    .and_then(|offset| start.checked_add(offset))
                    .ok_or_else(|| FlowError::RangeOverflow { start, count })
            }))
            .boxed()
        })
    }

    /// Whether every value of the range fits in an `i64`
    pub fn range_fits(start: i64, count: usize) -> bool {
        match count.checked_sub(1) {
            None => true,
            Some(last) => i64::try_from(last)
                .ok()
                .and_then(|last| start.checked_add(last))
                .is_some(),
        }
    }
}

fn prefer_first(_: &mut ()) -> PollNext {
    PollNext::Left
}
