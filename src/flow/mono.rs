// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! Single-value container

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

use futures::future::{self, BoxFuture};
use futures::stream::{self, StreamExt};
use futures::FutureExt;

use crate::errors::{FlowError, FlowResult};
use crate::flow::{Flux, Outcome, Subscriber, Subscription};

type Factory<T> = Arc<dyn Fn() -> BoxFuture<'static, FlowResult<T>> + Send + Sync>;

thread_local! {
    static CATCHING: Cell<bool> = const { Cell::new(false) };
}

static QUIET_HOOK: Once = Once::new();

/// Run `f`, catching a panic without reporting it through the panic hook
///
/// Panics on other threads, or outside `f`, still reach the previous hook.
fn call_quietly<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !CATCHING.with(Cell::get) {
                previous(info);
            }
        }));
    });

    CATCHING.with(|catching| catching.set(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CATCHING.with(|catching| catching.set(false));
    result
}

/// A lazy container holding either one value or one error
///
/// Each subscription runs the producer again; that is what lets
/// [`Mono::retry`] draw a fresh value per attempt.
pub struct Mono<T> {
    factory: Factory<T>,
}

impl<T> Clone for Mono<T> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T: Send + 'static> Mono<T> {
    fn from_factory<F>(factory: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, FlowResult<T>> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    pub fn just(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::from_factory(move || future::ready(Ok(value.clone())).boxed())
    }

    pub fn error(error: FlowError) -> Self {
        Self::from_factory(move || future::ready(Err(error.clone())).boxed())
    }

    /// Producer that reports failure by returning an error
    pub fn from_callable<F>(producer: F) -> Self
    where
        F: Fn() -> FlowResult<T> + Send + Sync + 'static,
    {
        let producer = Arc::new(producer);
        Self::from_factory(move || {
            let producer = Arc::clone(&producer);
            async move { producer() }.boxed()
        })
    }

    /// Producer that may panic
    ///
    /// The producer runs on the blocking pool. A panic is caught there and
    /// surfaces as [`FlowError::Fault`] through the error channel, so retry
    /// and error hooks observe it like any other error. The panic hook is
    /// not run for it; the fault is its only report.
    pub fn from_fallible<F>(producer: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let producer = Arc::new(producer);
        Self::from_factory(move || {
            let producer = Arc::clone(&producer);
            async move {
                match tokio::task::spawn_blocking(move || call_quietly(|| producer())).await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(payload)) => {
                        let fault = FlowError::from_panic(payload);
                        tracing::debug!(error = %fault, "producer panicked");
                        Err(fault)
                    }
                    Err(e) if e.is_panic() => Err(FlowError::from_panic(e.into_panic())),
                    Err(e) => Err(FlowError::SubscriptionFailed {
                        message: e.to_string(),
                    }),
                }
            }
            .boxed()
        })
    }

    pub fn map<U, F>(self, f: F) -> Mono<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let source = self.factory;
        Mono::from_factory(move || {
            let f = Arc::clone(&f);
            source().map(move |result| result.map(|value| f(value))).boxed()
        })
    }

    /// Run `f` when the producer fails, before the error propagates
    pub fn do_on_error<F>(self, f: F) -> Self
    where
        F: Fn(&FlowError) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let source = self.factory;
        Self::from_factory(move || {
            let f = Arc::clone(&f);
            source()
                .inspect(move |result| {
                    if let Err(error) = result {
                        f(error);
                    }
                })
                .boxed()
        })
    }

    /// Run the producer again after a failure, at most `max_retries` times
    pub fn retry(self, max_retries: usize) -> Self {
        let source = self.factory;
        Self::from_factory(move || {
            let source = Arc::clone(&source);
            async move {
                let mut retries = 0;
                loop {
                    match source().await {
                        Ok(value) => return Ok(value),
                        Err(error) if retries < max_retries => {
                            retries += 1;
                            tracing::debug!(
                                retry = retries,
                                max_retries,
                                error = %error,
                                "retrying producer"
                            );
                        }
                        Err(error) => {
                            return Err(FlowError::RetriesExhausted {
                                attempts: retries + 1,
                                last: Box::new(error),
                            })
                        }
                    }
                }
            }
            .boxed()
        })
    }

    pub fn into_flux(self) -> Flux<T> {
        let source = self.factory;
        Flux::from_factory(move || stream::once(source()).boxed())
    }

    pub fn subscribe<S>(&self, subscriber: S) -> Subscription
    where
        S: Subscriber<T> + 'static,
    {
        self.clone().into_flux().subscribe(subscriber)
    }

    /// Deliver on the current task until a terminal signal
    pub async fn deliver<S>(&self, subscriber: &mut S) -> FlowResult<Outcome>
    where
        S: Subscriber<T> + ?Sized,
    {
        self.clone().into_flux().deliver(subscriber).await
    }

    /// Run the producer and return its result directly
    pub async fn block(&self) -> FlowResult<T> {
        (self.factory)().await
    }
}
