//! # kv-rotate
//!
//! Runs one rotator operation over the resources of a configuration file.
//!
//! ## Usage
//!
//! ```bash
//! # Rotate everything that is due
//! kv-rotate --configuration rotation.yaml --operation rotate
//!
//! # Hand out CSRs for two certificates, without touching the vault
//! kv-rotate -c rotation.yaml -o request-csr --resources "web-cert, api-cert" --what-if
//!
//! # Store a new value for one manual secret
//! kv-rotate -c rotation.yaml -o manual-secret --resources db-password --secret-value-1 "$VALUE"
//! ```
//!
//! Every flag can also be supplied through the environment variable named in
//! `--help`, so the binary can run as a CI step.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use keyvault_rotator::config::{parse_resource_filter, ConfigurationFile, OperationSettings};
use keyvault_rotator::constants::DEFAULT_VAULT_DNS_SUFFIX;
use keyvault_rotator::observability::{build_datetime, build_version, init_logging, LogFormat};
use keyvault_rotator::operation::{build_operation, OperationKind};
use keyvault_rotator::provider::azure::{AzureAuthConfig, AzureKeyVaultConnector, KeyVaultCredential};
use keyvault_rotator::provider::VaultClientCache;
use keyvault_rotator::report::{write_report, ReportTargets};
use keyvault_rotator::rotation::SystemClock;
use keyvault_rotator::rotator::{RotatorContext, RotatorRegistry};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use zeroize::Zeroizing;

/// How to authenticate against Key Vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AuthMethod {
    ManagedIdentity,
    WorkloadIdentity,
    AzureCli,
    AccessToken,
}

/// Secret and certificate rotation for Azure Key Vault
#[derive(Parser)]
#[command(name = "kv-rotate", version = build_version(), long_about = None)]
struct Cli {
    /// Configuration file (JSON or YAML)
    #[arg(short, long, env = "INPUT_CONFIGURATION")]
    configuration: PathBuf,

    /// Operation to run
    #[arg(short, long, value_enum, env = "INPUT_OPERATION", default_value = "nothing")]
    operation: OperationKind,

    /// Resources to process, comma or space separated; `*` selects all
    #[arg(short, long, env = "INPUT_RESOURCES", default_value = "*")]
    resources: String,

    /// Write even when the credential exists or is not due yet
    #[arg(long, env = "INPUT_FORCE")]
    force: bool,

    /// Evaluate and report without changing the vault
    #[arg(long, env = "INPUT_WHAT_IF")]
    what_if: bool,

    /// Primary value (secret value or base64 PFX)
    #[arg(long, env = "INPUT_SECRET_VALUE_1", hide_env_values = true, default_value = "")]
    secret_value_1: String,

    /// Secondary value (PFX password)
    #[arg(long, env = "INPUT_SECRET_VALUE_2", hide_env_values = true, default_value = "")]
    secret_value_2: String,

    /// Key Vault authentication method
    #[arg(long, value_enum, env = "AZURE_AUTH_METHOD", default_value = "managed-identity")]
    auth: AuthMethod,

    /// Application (client) id for workload identity
    #[arg(long, env = "AZURE_CLIENT_ID")]
    client_id: Option<String>,

    /// Pre-acquired bearer token for `--auth access-token`
    #[arg(long, env = "AZURE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Key Vault DNS suffix (sovereign clouds)
    #[arg(long, env = "AZURE_KEYVAULT_DNS_SUFFIX", default_value = DEFAULT_VAULT_DNS_SUFFIX)]
    vault_dns_suffix: String,

    /// Send every vault request to this endpoint instead
    #[arg(long, env = "AZURE_KEYVAULT_ENDPOINT")]
    vault_endpoint: Option<String>,

    /// File receiving `rotated-resources=<ids>`
    #[arg(long, env = "GITHUB_OUTPUT")]
    output_file: Option<PathBuf>,

    /// Markdown file receiving the inspection table
    #[arg(long, env = "GITHUB_STEP_SUMMARY")]
    summary_file: Option<PathBuf>,

    /// Directory receiving CSR files
    #[arg(long, env = "INPUT_ARTIFACT_DIR")]
    artifact_dir: Option<PathBuf>,

    /// Log line format
    #[arg(long, value_enum, env = "LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,
}

impl Cli {
    fn auth_config(&self) -> Result<AzureAuthConfig> {
        let config = match self.auth {
            AuthMethod::ManagedIdentity => AzureAuthConfig::ManagedIdentity,
            AuthMethod::WorkloadIdentity => AzureAuthConfig::WorkloadIdentity {
                client_id: self
                    .client_id
                    .clone()
                    .context("--client-id is required for workload identity")?,
            },
            AuthMethod::AzureCli => AzureAuthConfig::AzureCli,
            AuthMethod::AccessToken => AzureAuthConfig::AccessToken(Zeroizing::new(
                self.access_token
                    .clone()
                    .context("--access-token is required for access token authentication")?,
            )),
        };
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_format) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Starting kv-rotate {}", build_version());
    info!(
        "Build info: datetime={}, git_hash={}",
        build_datetime(),
        env!("BUILD_GIT_HASH")
    );

    let configuration = ConfigurationFile::load(&cli.configuration)?;
    let targets = parse_resource_filter(&cli.resources);

    let credential = KeyVaultCredential::from_config(&cli.auth_config()?)?;
    let connector = AzureKeyVaultConnector::new(credential)?
        .with_dns_suffix(cli.vault_dns_suffix.clone())
        .with_endpoint_override(cli.vault_endpoint.clone());
    let vaults = Arc::new(VaultClientCache::new(Arc::new(connector)));

    let settings = OperationSettings {
        force: cli.force,
        what_if: cli.what_if,
        secret_value_1: Zeroizing::new(cli.secret_value_1),
        secret_value_2: Zeroizing::new(cli.secret_value_2),
    };
    if settings.what_if {
        info!("what-if mode: no changes will be written to Key Vault");
    }

    let context = RotatorContext::new(settings, vaults, Arc::new(SystemClock));
    let registry = Arc::new(RotatorRegistry::with_default_rotators(&context));
    let operation = build_operation(cli.operation, registry);

    info!(
        operation = %cli.operation,
        resources = %cli.resources,
        "Running operation"
    );
    let output = operation
        .run(&configuration, &targets)
        .await
        .with_context(|| format!("Operation {} failed", cli.operation))?;

    write_report(
        &output,
        &ReportTargets {
            output_file: cli.output_file,
            summary_file: cli.summary_file,
            artifact_dir: cli.artifact_dir,
        },
    )?;

    info!(
        rotated = output.rotated_resources.len(),
        inspected = output.inspection.len(),
        "Operation {} complete",
        cli.operation
    );
    Ok(())
}
