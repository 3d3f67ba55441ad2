// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Audit records for backend attempts
//!
//! Every backend attempt produces exactly one record. Sinks are
//! best-effort: a failed write is reported to the caller, which logs
//! and moves on.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use super::types::{BackendKind, BackendResult};

/// Errors writing an audit record
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audit record serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One backend attempt
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuditRecord {
    pub timestamp: String,
    pub url: String,
    pub backend: BackendKind,
    pub success: bool,
    pub status_code: Option<u16>,
    pub elapsed_secs: f64,
    pub error_message: Option<String>,
    pub html: String,
}

impl AuditRecord {
    /// Record for a finished attempt
    pub fn from_result(
        url: &str,
        backend: BackendKind,
        result: &BackendResult,
        elapsed_secs: f64,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            url: url.to_string(),
            backend,
            success: result.is_success(),
            status_code: result.status_code,
            elapsed_secs,
            error_message: result.error_message.clone(),
            html: result.raw_content.clone(),
        }
    }
}

/// Destination for attempt records
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Emits each record as a structured tracing event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        info!(
            url = %record.url,
            backend = %record.backend,
            success = record.success,
            status_code = ?record.status_code,
            elapsed_secs = record.elapsed_secs,
            error = ?record.error_message,
            response_size = record.html.len(),
            "scrape attempt"
        );
        Ok(())
    }
}

/// Appends one JSON line per record to a file
pub struct JsonlAuditSink {
    file: Mutex<File>,
    path: PathBuf,
}

impl JsonlAuditSink {
    /// Open or create the audit file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
