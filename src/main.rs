// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kube::CustomResourceExt;
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use console_provider::config::ProviderConfig;
use console_provider::constants::MANIFEST_SUFFIX;
use console_provider::kubernetes::{crd_served, create_client, wait_for_crd};
use console_provider::resource::type_name_for;
use console_provider::types::Console;
use console_provider::Provider;

/// Manage RocketMQ Console custom resources with server-side apply
#[derive(Parser, Debug)]
#[command(name = "console-provider", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides of the configuration loaded from the environment
#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Path to the kubeconfig file
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Context to use from the kubeconfig
    #[arg(long, global = true)]
    context: Option<String>,

    /// Don't connect to a cluster
    #[arg(long, global = true)]
    offline: bool,

    /// Default field manager for server-side apply
    #[arg(long, global = true)]
    field_manager: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the provider schema as JSON
    Schema,

    /// Print the Console CRD as YAML
    Crd,

    /// Check whether the cluster serves the Console CRD
    Check {
        /// Keep polling until the CRD is served
        #[arg(long)]
        wait: bool,
    },

    /// Plan a change and print the planned state
    Plan {
        #[command(flatten)]
        input: InputArgs,

        /// File with the prior state
        #[arg(long)]
        prior: Option<PathBuf>,
    },

    /// Create or update a resource from its planned state
    Apply {
        #[command(flatten)]
        input: InputArgs,

        /// File with the prior state, the resource is updated when set
        #[arg(long)]
        prior: Option<PathBuf>,
    },

    /// Refresh a resource from the cluster
    Read(InputArgs),

    /// Delete a resource
    Delete(InputArgs),

    /// Import an existing resource
    Import {
        /// Identifier with format `namespace/name`
        id: String,

        /// Resource type name
        #[arg(long = "type")]
        type_name: Option<String>,
    },

    /// Read a data source
    Data(InputArgs),

    /// Render a Console manifest without contacting a cluster
    Manifest {
        /// File with the manifest configuration (JSON or YAML)
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// File with the configuration or state (JSON or YAML)
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Resource or data source type name
    #[arg(long = "type")]
    type_name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, stdout carries the output
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.connection)?;

    match cli.command {
        Commands::Schema => print_json(&serde_json::to_value(Provider::new().schema())?),
        Commands::Crd => {
            let crd = serde_yaml::to_string(&Console::crd()).context("Failed to serialize CRD")?;
            println!("{crd}");
            Ok(())
        }
        Commands::Check { wait } => run_check(config, wait).await,
        Commands::Plan { input, prior } => {
            let provider = offline_provider(config).await?;
            let proposed = read_input(&input.file).await?;
            let prior = match prior {
                Some(path) => Some(read_input(&path).await?),
                None => None,
            };
            let plan = provider.plan(&resource_type(input.type_name), prior, proposed)?;
            for path in &plan.requires_replace {
                warn!("Changing {} requires replacing the resource", path);
            }
            print_json(&serde_json::to_value(plan)?)
        }
        Commands::Apply { input, prior } => {
            let provider = configured_provider(config).await?;
            let type_name = resource_type(input.type_name);
            let planned = read_input(&input.file).await?;
            let state = match prior {
                Some(path) => {
                    let prior = read_input(&path).await?;
                    provider.update(&type_name, prior, planned).await?
                }
                None => provider.create(&type_name, planned).await?,
            };
            print_json(&state)
        }
        Commands::Read(input) => {
            let provider = configured_provider(config).await?;
            let current = read_input(&input.file).await?;
            match provider.read(&resource_type(input.type_name), current).await? {
                Some(state) => print_json(&state),
                None => {
                    warn!("The resource no longer exists");
                    print_json(&Value::Null)
                }
            }
        }
        Commands::Delete(input) => {
            let provider = configured_provider(config).await?;
            let current = read_input(&input.file).await?;
            provider.delete(&resource_type(input.type_name), current).await?;
            info!("Deleted");
            Ok(())
        }
        Commands::Import { id, type_name } => {
            let provider = configured_provider(config).await?;
            let state = provider.import_state(&resource_type(type_name), &id).await?;
            print_json(&state)
        }
        Commands::Data(input) => {
            let provider = configured_provider(config).await?;
            let query = read_input(&input.file).await?;
            let state = provider
                .read_data_source(&resource_type(input.type_name), query)
                .await?;
            print_json(&state)
        }
        Commands::Manifest { file } => {
            let provider = offline_provider(config).await?;
            let type_name = format!("{}{}", resource_type(None), MANIFEST_SUFFIX);
            let state = provider.read_data_source(&type_name, read_input(&file).await?).await?;
            match state.get("yaml").and_then(Value::as_str) {
                Some(yaml) => print!("{yaml}"),
                None => anyhow::bail!("{} returned no manifest", type_name),
            }
            Ok(())
        }
    }
}

fn load_config(args: ConnectionArgs) -> Result<ProviderConfig> {
    let mut config = ProviderConfig::from_env()?;
    if args.kubeconfig.is_some() {
        config.kubeconfig = args.kubeconfig;
    }
    if args.context.is_some() {
        config.context = args.context;
    }
    if args.offline {
        config.offline = true;
    }
    if let Some(field_manager) = args.field_manager {
        config.field_manager = field_manager;
    }
    Ok(config)
}

/// A provider for commands that never talk to the cluster
async fn offline_provider(config: ProviderConfig) -> Result<Provider> {
    let mut provider = Provider::new();
    provider
        .configure(ProviderConfig {
            offline: true,
            ..config
        })
        .await?;
    Ok(provider)
}

async fn configured_provider(config: ProviderConfig) -> Result<Provider> {
    let mut provider = Provider::new();
    provider
        .configure(config)
        .await
        .context("Failed to configure the provider")?;
    Ok(provider)
}

async fn run_check(config: ProviderConfig, wait: bool) -> Result<()> {
    if config.offline {
        anyhow::bail!("Cannot check the cluster while offline");
    }
    let client = create_client(&config).await?;
    let ar = Console::api_resource();

    if wait {
        info!("Waiting for {} CRD to become available...", ar.kind);
        wait_for_crd(&client, &ar).await?;
        return Ok(());
    }

    if crd_served(&client, &ar).await? {
        info!("{} ({}) is served", ar.kind, ar.api_version);
        Ok(())
    } else {
        anyhow::bail!("{} ({}) is not served, is the CRD installed?", ar.kind, ar.api_version)
    }
}

fn resource_type(type_name: Option<String>) -> String {
    type_name.unwrap_or_else(|| type_name_for(&Console::api_resource()))
}

/// Read a JSON or YAML document
async fn read_input(path: &Path) -> Result<Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
