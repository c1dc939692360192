//! Key Vault Rotator Library
//!
//! Lifecycle automation for secrets and certificates held in Azure Key
//! Vault. A run loads a configuration file of managed resources, selects an
//! operation (initialize, rotate, request-csr, inspect, manual-secret) and
//! drives each resource's rotator against the vault.
//!
//! - `config`: resource model and configuration file loading
//! - `rotation`: clock, rotation window policy, result records
//! - `rotator`: per-type lifecycle state machines and their registry
//! - `operation`: iteration over the selected resources
//! - `provider`: vault backend trait and the Key Vault REST client
//! - `report`: rendering of run output for the host

pub mod config;
pub mod constants;
pub mod observability;
pub mod operation;
pub mod provider;
pub mod report;
pub mod rotation;
pub mod rotator;
