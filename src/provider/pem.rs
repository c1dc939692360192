//! # PEM Helpers
//!
//! Text encodings exchanged with the operator: CSRs handed out for external
//! signing and certificate bundles merged back into the vault.

use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

const BEGIN_CERTIFICATE: &str = "-----BEGIN CERTIFICATE-----";
const END_CERTIFICATE: &str = "-----END CERTIFICATE-----";
const BEGIN_CSR: &str = "-----BEGIN CERTIFICATE REQUEST-----";
const END_CSR: &str = "-----END CERTIFICATE REQUEST-----";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PemError {
    #[error("PEM bundle does not contain any certificate")]
    Empty,
    #[error("Certificate {index} in PEM bundle is missing its BEGIN CERTIFICATE marker")]
    MissingBegin { index: usize },
    #[error("Certificate {index} in PEM bundle is not valid base64: {reason}")]
    InvalidBase64 { index: usize, reason: String },
}

/// Wrap raw CSR bytes as a PEM `CERTIFICATE REQUEST`
///
/// The body is a single base64 line, which is what operators paste into
/// signing portals.
#[must_use]
pub fn csr_to_pem(csr: &[u8]) -> String {
    format!(
        "{BEGIN_CSR}\n{}\n{END_CSR}",
        general_purpose::STANDARD.encode(csr)
    )
}

/// Split a bundle of concatenated PEM certificates into individual blocks
///
/// Accepts CRLF or LF line endings. Each returned block is LF terminated and
/// ends with its `END CERTIFICATE` marker. Blank fragments are dropped.
#[must_use]
pub fn split_pem_certificates(content: &str) -> Vec<String> {
    let normalized = content.replace("\r\n", "\n");

    normalized
        .split(END_CERTIFICATE)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(|fragment| format!("{fragment}\n{END_CERTIFICATE}\n"))
        .collect()
}

/// Base64 DER bodies of every certificate in a PEM bundle, in bundle order
pub fn certificate_bodies(content: &str) -> Result<Vec<String>, PemError> {
    let blocks = split_pem_certificates(content);
    if blocks.is_empty() {
        return Err(PemError::Empty);
    }

    blocks
        .iter()
        .enumerate()
        .map(|(index, block)| {
            let (_, after_begin) = block
                .split_once(BEGIN_CERTIFICATE)
                .ok_or(PemError::MissingBegin { index })?;
            let body: String = after_begin
                .trim_end()
                .trim_end_matches(END_CERTIFICATE)
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();

            general_purpose::STANDARD
                .decode(body.as_bytes())
                .map_err(|e| PemError::InvalidBase64 {
                    index,
                    reason: e.to_string(),
                })?;
            Ok(body)
        })
        .collect()
}

/// Upper-case hex rendering of a thumbprint digest
#[must_use]
pub fn thumbprint_hex(digest: &[u8]) -> String {
    digest.iter().map(|b| format!("{b:02X}")).collect()
}
