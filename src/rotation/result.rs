//! # Result Model
//!
//! Outcome records produced by rotators and returned up through operations.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Variant-specific payload attached to a [`RotationResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RotationContext {
    /// Nothing to report
    Empty,
    /// The vault entry the decision was made about
    SecretName { secret_name: String },
    /// The credential exists but is outside its rotation window
    NotDue {
        expiration: Option<DateTime<Utc>>,
        expiration_overlap_days: i64,
    },
    /// A write was evaluated under what-if and skipped
    WhatIf { expiration: Option<DateTime<Utc>> },
    /// A credential was written to the vault
    Written {
        id: String,
        expiration: Option<DateTime<Utc>>,
    },
    /// PEM-wrapped certificate signing request (empty when none was issued)
    Csr { csr: String },
    /// A signed certificate was merged into the vault
    Merge { thumbprint: String },
    /// The lifecycle step failed
    Error { message: String, detail: String },
}

impl RotationContext {
    /// The CSR text, if this context carries one
    #[must_use]
    pub fn csr(&self) -> Option<&str> {
        match self {
            Self::Csr { csr } => Some(csr),
            _ => None,
        }
    }

    /// The merged certificate thumbprint, if this context carries one
    #[must_use]
    pub fn thumbprint(&self) -> Option<&str> {
        match self {
            Self::Merge { thumbprint } => Some(thumbprint),
            _ => None,
        }
    }
}

/// Outcome of one Initialize or Rotate call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationResult {
    pub name: String,
    pub rotated: bool,
    pub notes: String,
    pub context: RotationContext,
}

impl RotationResult {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        rotated: bool,
        notes: impl Into<String>,
        context: RotationContext,
    ) -> Self {
        Self {
            name: name.into(),
            rotated,
            notes: notes.into(),
            context,
        }
    }

    /// The credential was written (or would have been, under what-if)
    #[must_use]
    pub fn rotated(name: impl Into<String>, notes: impl Into<String>, context: RotationContext) -> Self {
        Self::new(name, true, notes, context)
    }

    /// The step was skipped by policy or validation
    #[must_use]
    pub fn skipped(name: impl Into<String>, notes: impl Into<String>, context: RotationContext) -> Self {
        Self::new(name, false, notes, context)
    }

    /// The step failed; the error message becomes the notes
    #[must_use]
    pub fn failed(name: impl Into<String>, error: &anyhow::Error) -> Self {
        Self::new(
            name,
            false,
            error.to_string(),
            RotationContext::Error {
                message: error.to_string(),
                detail: format!("{error:#}"),
            },
        )
    }
}

/// Read-only status report for one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionResult {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub secret_id: String,
    pub resource_id: String,
    pub notes: String,
    pub updated_on: Option<DateTime<Utc>>,
    pub expires_on: Option<DateTime<Utc>>,
}

impl InspectionResult {
    /// Report for a resource that has no vault entry yet
    #[must_use]
    pub fn missing(name: &str, resource_type: &str, resource_id: &str, notes: &str) -> Self {
        Self {
            name: name.to_owned(),
            resource_type: resource_type.to_owned(),
            secret_id: String::new(),
            resource_id: resource_id.to_owned(),
            notes: notes.to_owned(),
            updated_on: None,
            expires_on: None,
        }
    }

    /// Column headers matching [`InspectionResult::to_row`]
    pub const COLUMNS: [&'static str; 7] = [
        "name",
        "type",
        "secretId",
        "resourceId",
        "expiresOn",
        "updatedOn",
        "notes",
    ];

    /// Flatten into one table row, timestamps as RFC 3339
    #[must_use]
    pub fn to_row(&self) -> [String; 7] {
        let timestamp = |value: Option<DateTime<Utc>>| {
            value
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_default()
        };
        [
            self.name.clone(),
            self.resource_type.clone(),
            self.secret_id.clone(),
            self.resource_id.clone(),
            timestamp(self.expires_on),
            timestamp(self.updated_on),
            self.notes.clone(),
        ]
    }
}
