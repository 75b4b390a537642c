// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! Subscribers and subscriptions
//!
//! A [`Subscriber`] receives the signals of one subscription. Delivery goes
//! through this trait instead of straight to the console so that callers can
//! swap in a [`Recorder`] and assert on what was delivered.

use async_trait::async_trait;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::errors::{FlowError, FlowResult};
use crate::flow::{FlowStream, Outcome, Signal};

/// Trait for signal consumers
#[async_trait]
pub trait Subscriber<T: Send + 'static>: Send {
    /// Called once per delivered item
    async fn on_next(&mut self, item: T) -> FlowResult<()>;

    /// Called at most once, when the source signals an error
    async fn on_error(&mut self, error: FlowError) -> FlowResult<()>;

    /// Called at most once, after the last item of a successful source
    async fn on_complete(&mut self) -> FlowResult<()> {
        Ok(())
    }
}

/// How a [`ConsoleSubscriber`] prints terminal errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStyle {
    /// Print only the error message
    #[default]
    Message,
    /// Print the error and its chain of causes
    Trace,
}

/// Writes one line per item to an async writer
pub struct ConsoleSubscriber<W> {
    writer: W,
    error_style: ErrorStyle,
}

impl ConsoleSubscriber<tokio::io::Stdout> {
    /// Subscriber printing to standard output
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> ConsoleSubscriber<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            error_style: ErrorStyle::default(),
        }
    }

    pub fn with_error_style(mut self, style: ErrorStyle) -> Self {
        self.error_style = style;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn write_line(&mut self, line: &str) -> FlowResult<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<T, W> Subscriber<T> for ConsoleSubscriber<W>
where
    T: Display + Send + 'static,
    W: AsyncWrite + Unpin + Send,
{
    async fn on_next(&mut self, item: T) -> FlowResult<()> {
        self.write_line(&item.to_string()).await
    }

    async fn on_error(&mut self, error: FlowError) -> FlowResult<()> {
        let text = match self.error_style {
            ErrorStyle::Message => error.to_string(),
            ErrorStyle::Trace => error.trace(),
        };
        self.write_line(&text).await
    }
}

/// Captures every signal it receives
///
/// Clones share the same buffer, so a clone handed to a spawned
/// subscription can be inspected from the caller afterwards.
#[derive(Debug)]
pub struct Recorder<T> {
    signals: Arc<Mutex<Vec<Signal<T>>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            signals: Arc::clone(&self.signals),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self {
            signals: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> Recorder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// All signals in delivery order
    pub fn signals(&self) -> Vec<Signal<T>> {
        self.lock().clone()
    }

    /// Items delivered through `on_next`
    pub fn items(&self) -> Vec<T> {
        self.lock()
            .iter()
            .filter_map(|s| match s {
                Signal::Next(item) => Some(item.clone()),
                _ => None,
            })
            .collect()
    }

    /// The error delivered through `on_error`, if any
    pub fn error(&self) -> Option<FlowError> {
        self.lock().iter().find_map(|s| match s {
            Signal::Error(e) => Some(e.clone()),
            _ => None,
        })
    }

    /// Number of completion signals received
    pub fn completions(&self) -> usize {
        self.lock()
            .iter()
            .filter(|s| matches!(s, Signal::Complete))
            .count()
    }

    fn push(&self, signal: Signal<T>) {
        self.lock().push(signal);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Signal<T>>> {
        self.signals.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl<T: Clone + Send + 'static> Subscriber<T> for Recorder<T> {
    async fn on_next(&mut self, item: T) -> FlowResult<()> {
        self.push(Signal::Next(item));
        Ok(())
    }

    async fn on_error(&mut self, error: FlowError) -> FlowResult<()> {
        self.push(Signal::Error(error));
        Ok(())
    }

    async fn on_complete(&mut self) -> FlowResult<()> {
        self.push(Signal::Complete);
        Ok(())
    }
}

/// Subscriber built from a pair of closures
pub struct FnSubscriber<N, E> {
    on_next: N,
    on_error: E,
}

impl<N, E> FnSubscriber<N, E> {
    pub fn new(on_next: N, on_error: E) -> Self {
        Self { on_next, on_error }
    }
}

#[async_trait]
impl<T, N, E> Subscriber<T> for FnSubscriber<N, E>
where
    T: Send + 'static,
    N: FnMut(T) + Send,
    E: FnMut(FlowError) + Send,
{
    async fn on_next(&mut self, item: T) -> FlowResult<()> {
        (self.on_next)(item);
        Ok(())
    }

    async fn on_error(&mut self, error: FlowError) -> FlowResult<()> {
        (self.on_error)(error);
        Ok(())
    }
}

/// Cancellation flag shared between a subscription and its delivery loop
#[derive(Debug, Default)]
pub(crate) struct CancelSignal {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelSignal {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        // notify_one keeps a permit if the loop is not currently waiting
        self.notify.notify_one();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Handle to a running subscription
pub struct Subscription {
    cancel: Arc<CancelSignal>,
    handle: JoinHandle<FlowResult<Outcome>>,
}

impl Subscription {
    pub(crate) fn spawn<T, S>(stream: FlowStream<T>, mut subscriber: S) -> Self
    where
        T: Send + 'static,
        S: Subscriber<T> + 'static,
    {
        let cancel = Arc::new(CancelSignal::default());
        let loop_cancel = Arc::clone(&cancel);
        let handle = tokio::spawn(async move {
            drive(stream, &mut subscriber, Some(loop_cancel.as_ref()), |_| {}).await
        });

        Self { cancel, handle }
    }

    /// Stop delivering items; the subscriber receives no further signals
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the subscription to reach a terminal state
    pub async fn join(self) -> FlowResult<Outcome> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(FlowError::from_panic(e.into_panic())),
            Err(e) => Err(FlowError::SubscriptionFailed {
                message: e.to_string(),
            }),
        }
    }
}

/// Deliver a stream to a subscriber until a terminal signal
///
/// Items after the first error are never delivered. `observe` sees every
/// item just before the subscriber does.
pub(crate) async fn drive<T, S, F>(
    mut stream: FlowStream<T>,
    subscriber: &mut S,
    cancel: Option<&CancelSignal>,
    mut observe: F,
) -> FlowResult<Outcome>
where
    T: Send + 'static,
    S: Subscriber<T> + ?Sized,
    F: FnMut(&T),
{
    let mut delivered = 0usize;

    loop {
        let next = match cancel {
            Some(signal) => {
                if signal.is_cancelled() {
                    tracing::debug!(delivered, "subscription cancelled");
                    return Ok(Outcome::Cancelled { delivered });
                }
                tokio::select! {
                    biased;
                    _ = signal.notify.notified() => {
                        tracing::debug!(delivered, "subscription cancelled");
                        return Ok(Outcome::Cancelled { delivered });
                    }
                    next = stream.next() => next,
                }
            }
            None => stream.next().await,
        };

        match next {
            Some(Ok(item)) => {
                observe(&item);
                subscriber.on_next(item).await?;
                delivered += 1;
            }
            Some(Err(error)) => {
                tracing::debug!(delivered, error = %error, "source signaled error");
                subscriber.on_error(error.clone()).await?;
                return Ok(Outcome::Failed { delivered, error });
            }
            None => {
                subscriber.on_complete().await?;
                return Ok(Outcome::Completed { delivered });
            }
        }
    }
}
