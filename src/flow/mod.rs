// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! Lazy reactive containers
//!
//! [`Mono`] holds at most one value and [`Flux`] holds a sequence. Both are
//! descriptions, not running computations: nothing is produced until a
//! subscriber attaches, and every subscription re-runs the source from the
//! start. Scheduling and timers come from `tokio`, stream plumbing from
//! `futures`.

mod flux;
mod mono;
mod subscriber;

pub use flux::{Flux, ZipPolicy};
pub use mono::Mono;
pub use subscriber::{
    ConsoleSubscriber, ErrorStyle, FnSubscriber, Recorder, Subscriber, Subscription,
};

pub(crate) use subscriber::drive;

use futures::stream::BoxStream;
use serde::Serialize;

use crate::errors::{FlowError, FlowResult};

/// A running source: items and errors share one channel
pub type FlowStream<T> = BoxStream<'static, FlowResult<T>>;

/// One signal observed by a subscriber
#[derive(Debug, Clone)]
pub enum Signal<T> {
    Next(T),
    Error(FlowError),
    Complete,
}

impl<T: PartialEq> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Next(a), Self::Next(b)) => a == b,
            (Self::Error(a), Self::Error(b)) => a.to_string() == b.to_string(),
            (Self::Complete, Self::Complete) => true,
            _ => false,
        }
    }
}

/// Terminal state of a subscription
#[derive(Debug, Clone)]
pub enum Outcome {
    Completed { delivered: usize },
    Failed { delivered: usize, error: FlowError },
    Cancelled { delivered: usize },
}

impl Outcome {
    /// Number of items the subscriber received
    pub fn delivered(&self) -> usize {
        match self {
            Self::Completed { delivered }
            | Self::Failed { delivered, .. }
            | Self::Cancelled { delivered } => *delivered,
        }
    }

    pub fn error(&self) -> Option<&FlowError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn status(&self) -> OutcomeStatus {
        match self {
            Self::Completed { .. } => OutcomeStatus::Completed,
            Self::Failed { .. } => OutcomeStatus::Failed,
            Self::Cancelled { .. } => OutcomeStatus::Cancelled,
        }
    }
}

/// Outcome without its payload, for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}
