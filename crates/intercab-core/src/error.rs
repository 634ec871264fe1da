// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the intercab dispatch engine.

use thiserror::Error;

use crate::types::{OrderId, OrderStatus, Role};

/// The primary error type used across all intercab crates.
#[derive(Debug, Error)]
pub enum IntercabError {
    /// Configuration errors (invalid TOML, missing tokens, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database unreachable, constraint violation, bad row).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter errors (connection failure, send failure, bad chat id).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A guarded order transition affected zero rows: another actor got there first.
    #[error("order #{order_id} is no longer {expected}")]
    Contention {
        order_id: OrderId,
        expected: OrderStatus,
    },

    /// A wizard step ran without the state an earlier step should have recorded.
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),

    /// A notification could not be delivered to a peer role.
    #[error("delivery to {role} failed: {message}")]
    Delivery { role: Role, message: String },

    /// A referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Input rejected before reaching the store.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by the conversational layer to decide how an
/// error reaches the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lost a race. Rendered as a plain message, never logged as a fault.
    Contention,
    /// Session lost or a reference vanished. Rendered as a restart prompt.
    MissingPrerequisite,
    /// Notification failed. Logged only.
    Delivery,
    /// Everything else. Rendered as a generic failure; state is left untouched.
    Persistence,
}

impl IntercabError {
    /// Classifies this error into the user-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IntercabError::Contention { .. } => ErrorKind::Contention,
            IntercabError::MissingPrerequisite(_) | IntercabError::NotFound { .. } => {
                ErrorKind::MissingPrerequisite
            }
            IntercabError::Delivery { .. } | IntercabError::Channel { .. } => ErrorKind::Delivery,
            IntercabError::Config(_)
            | IntercabError::Storage { .. }
            | IntercabError::Validation(_)
            | IntercabError::Internal(_) => ErrorKind::Persistence,
        }
    }

    /// Shorthand for a missing entity.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        IntercabError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns `true` if this error is the expected outcome of losing a race.
    pub fn is_contention(&self) -> bool {
        matches!(self, IntercabError::Contention { .. })
    }
}
