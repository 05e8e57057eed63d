use std::fmt;

use thiserror::Error;

use crate::{draft::DraftIssue, remote::Method};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestFailure {
    #[error("HTTP error! status: {status} ({method} {endpoint}){}", detail_suffix(.detail))]
    Status {
        method: Method,
        endpoint: String,
        status: u16,
        detail: Option<String>,
    },
    #[error("request to {method} {endpoint} failed: {message}")]
    Transport {
        method: Method,
        endpoint: String,
        message: String,
    },
    #[error("unreadable response from {method} {endpoint}: {message}")]
    Decode {
        method: Method,
        endpoint: String,
        message: String,
    },
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!(": {detail}"),
        None => String::new(),
    }
}

impl RequestFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Decode { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationFailure {
    pub issues: Vec<DraftIssue>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Please fill in all required fields")?;
        if !self.issues.is_empty() {
            let listed = self
                .issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            write!(f, " ({})", listed.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("meta tag index {0} is out of range (expected 0..3)")]
pub struct TagIndexOutOfRange(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Request(#[from] RequestFailure),
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

impl ClientError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
