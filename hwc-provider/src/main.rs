//! hwc: command line front-end for the RTS and CCE lifecycle drivers.
//!
//! Every mutating command blocks until the remote resource has converged,
//! failed, or the operation timed out. Ctrl-C cancels a wait in progress.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hwc_provider::clients::types::{ClusterUpdateSpec, TemplateOpts};
use hwc_provider::clients::{ClusterUpdateOpts, StackCreateOpts, StackUpdateOpts};
use hwc_provider::query::{self, ClusterFilter, NodeFilter, ResourceFilter};
use hwc_provider::{
    ApiConfig, ClusterDriver, Config, Driver, HttpClient, NodeDriver, NodeKey, StackDriver,
    StackKey, TimeoutConfig,
};

/// hwc - manage RTS stacks and CCE clusters
#[derive(Parser, Debug)]
#[command(name = "hwc", version, about)]
struct Cli {
    /// JSON config file (flags and environment take precedence)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Region, e.g. eu-de
    #[arg(long, env = "HWC_REGION")]
    region: Option<String>,

    /// Project ID
    #[arg(long, env = "HWC_PROJECT_ID")]
    project_id: Option<String>,

    /// Auth token
    #[arg(long, env = "HWC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// CCE endpoint override
    #[arg(long, env = "HWC_CCE_ENDPOINT")]
    cce_endpoint: Option<String>,

    /// RTS endpoint override (including version and project)
    #[arg(long, env = "HWC_ORCHESTRATION_ENDPOINT")]
    orchestration_endpoint: Option<String>,

    /// Create timeout in seconds
    #[arg(long)]
    create_timeout: Option<u64>,

    /// Update timeout in seconds
    #[arg(long)]
    update_timeout: Option<u64>,

    /// Delete timeout in seconds
    #[arg(long)]
    delete_timeout: Option<u64>,

    /// Seconds between two status checks
    #[arg(long)]
    poll_interval: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Orchestration stacks
    #[command(subcommand)]
    Stack(StackCommand),
    /// CCE clusters
    #[command(subcommand)]
    Cluster(ClusterCommand),
    /// CCE cluster nodes
    #[command(subcommand)]
    Node(NodeCommand),
}

#[derive(Args, Debug)]
struct StackRef {
    /// Stack name
    #[arg(long)]
    name: String,
    /// Stack ID
    #[arg(long)]
    id: String,
}

#[derive(Args, Debug)]
struct TemplateArgs {
    /// Template file (JSON or YAML text)
    #[arg(long)]
    template_file: Option<PathBuf>,
    /// Template URL
    #[arg(long)]
    template_url: Option<String>,
    /// Stack parameter, KEY=VALUE (repeatable)
    #[arg(long = "param", value_parser = parse_key_val)]
    params: Vec<(String, String)>,
    /// Stack timeout in minutes
    #[arg(long)]
    timeout_mins: Option<u32>,
    /// Disable rollback on failure
    #[arg(long)]
    disable_rollback: Option<bool>,
}

#[derive(Subcommand, Debug)]
enum StackCommand {
    /// Create a stack and wait for CREATE_COMPLETE
    Create {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        template: TemplateArgs,
    },
    /// Update a stack and wait for UPDATE_COMPLETE
    Update {
        #[command(flatten)]
        stack: StackRef,
        #[command(flatten)]
        template: TemplateArgs,
    },
    /// Delete a stack and wait until it is gone
    Delete {
        #[command(flatten)]
        stack: StackRef,
    },
    /// Show a stack (ID may be omitted to look it up by name)
    Show {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        id: String,
    },
    /// Find a single resource of a stack
    Resource {
        #[command(flatten)]
        stack: StackRef,
        #[arg(long)]
        resource_name: Option<String>,
        #[arg(long)]
        logical_id: Option<String>,
        #[arg(long)]
        physical_id: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        resource_type: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ClusterCommand {
    /// Show a cluster by ID
    Show {
        #[arg(long)]
        id: String,
    },
    /// Find a single cluster by filter
    Find {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        cluster_type: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        vpc_id: Option<String>,
    },
    /// Change a cluster's description
    Describe {
        #[arg(long)]
        id: String,
        #[arg(long)]
        description: String,
    },
    /// Delete a cluster and wait until it is gone
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum NodeCommand {
    /// Show a node
    Show {
        #[arg(long)]
        cluster_id: String,
        #[arg(long)]
        id: String,
    },
    /// Find a single node of a cluster by filter
    Find {
        #[arg(long)]
        cluster_id: String,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        flavor: Option<String>,
        #[arg(long)]
        az: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Delete a node and wait until it is gone
    Delete {
        #[arg(long)]
        cluster_id: String,
        #[arg(long)]
        id: String,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' in '{s}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hwc=info,hwc_provider=info,reqwest=warn,hyper=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    info!("Region: {}", config.api.region);

    let client = Arc::new(HttpClient::new(&config.api).context("Failed to build HTTP client")?);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            ctrl_c.cancel();
        }
    });

    match cli.command {
        Command::Stack(cmd) => run_stack(cmd, client, &config, cancel).await,
        Command::Cluster(cmd) => run_cluster(cmd, client, &config, cancel).await,
        Command::Node(cmd) => run_node(cmd, client, &config, cancel).await,
    }
}

/// Merge the config file with flags and environment.
fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config {
            api: ApiConfig {
                region: String::new(),
                project_id: String::new(),
                token: String::new(),
                cce_endpoint: None,
                orchestration_endpoint: None,
                request_timeout_secs: 60,
            },
            timeouts: TimeoutConfig::default(),
        },
    };

    if let Some(region) = &cli.region {
        config.api.region = region.clone();
    }
    if let Some(project_id) = &cli.project_id {
        config.api.project_id = project_id.clone();
    }
    if let Some(token) = &cli.token {
        config.api.token = token.clone();
    }
    if cli.cce_endpoint.is_some() {
        config.api.cce_endpoint = cli.cce_endpoint.clone();
    }
    if cli.orchestration_endpoint.is_some() {
        config.api.orchestration_endpoint = cli.orchestration_endpoint.clone();
    }
    config.timeouts.create_secs = cli.create_timeout.or(config.timeouts.create_secs);
    config.timeouts.update_secs = cli.update_timeout.or(config.timeouts.update_secs);
    config.timeouts.delete_secs = cli.delete_timeout.or(config.timeouts.delete_secs);
    config.timeouts.poll_interval_secs = cli.poll_interval.or(config.timeouts.poll_interval_secs);

    if config.api.region.is_empty() {
        anyhow::bail!("No region given (--region or HWC_REGION)");
    }
    if config.api.project_id.is_empty() {
        anyhow::bail!("No project ID given (--project-id or HWC_PROJECT_ID)");
    }
    if config.api.token.is_empty() {
        anyhow::bail!("No auth token given (--token or HWC_TOKEN)");
    }

    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn template_opts(args: &TemplateArgs) -> Result<TemplateOpts> {
    let body = match &args.template_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            // RTS accepts JSON objects or raw template text
            Some(serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw)))
        }
        None => None,
    };
    if body.is_none() && args.template_url.is_none() {
        anyhow::bail!("Either --template-file or --template-url is required");
    }
    Ok(TemplateOpts {
        body,
        url: args.template_url.clone(),
        files: HashMap::new(),
    })
}

async fn run_stack(
    cmd: StackCommand,
    client: Arc<HttpClient>,
    config: &Config,
    cancel: CancellationToken,
) -> Result<()> {
    let driver = StackDriver::new(client.clone()).with_cancellation(cancel);
    let defaults = *driver.timeouts();
    let driver = driver.with_timeouts(config.timeouts.apply(defaults));

    match cmd {
        StackCommand::Create { name, template } => {
            let opts = StackCreateOpts {
                name,
                template: template_opts(&template)?,
                environment: None,
                parameters: template.params.into_iter().collect(),
                timeout_mins: template.timeout_mins,
                disable_rollback: template.disable_rollback,
            };
            let (key, stack) = driver.create(&opts).await?;
            info!("Stack {} created with ID {}", key.name, key.id);
            print_json(&stack)
        }
        StackCommand::Update { stack, template } => {
            let key = StackKey::new(stack.name, stack.id);
            let params: HashMap<String, String> = template.params.iter().cloned().collect();
            let opts = StackUpdateOpts {
                template: template_opts(&template)?,
                environment: None,
                parameters: (!params.is_empty()).then_some(params),
                timeout_mins: template.timeout_mins,
                disable_rollback: template.disable_rollback,
            };
            print_json(&driver.update(&key, &opts).await?)
        }
        StackCommand::Delete { stack } => {
            driver.delete(&StackKey::new(stack.name, stack.id)).await?;
            Ok(())
        }
        StackCommand::Show { name, id } => {
            print_json(&query::find_stack(client.as_ref(), &name, &id).await?)
        }
        StackCommand::Resource {
            stack,
            resource_name,
            logical_id,
            physical_id,
            status,
            resource_type,
        } => {
            let filter = ResourceFilter {
                name: resource_name,
                logical_id,
                physical_id,
                status,
                resource_type,
            };
            let resource =
                query::find_stack_resource(client.as_ref(), &stack.name, &stack.id, &filter)
                    .await?;
            print_json(&resource)
        }
    }
}

async fn run_cluster(
    cmd: ClusterCommand,
    client: Arc<HttpClient>,
    config: &Config,
    cancel: CancellationToken,
) -> Result<()> {
    let driver = ClusterDriver::new(client.clone())
        .with_cancellation(cancel)
        .with_timeouts(config.timeouts.apply(Default::default()));

    match cmd {
        ClusterCommand::Show { id } => match driver.read(&id).await? {
            Some(cluster) => print_json(&cluster),
            None => anyhow::bail!("Cluster {} not found", id),
        },
        ClusterCommand::Find {
            id,
            name,
            cluster_type,
            status,
            vpc_id,
        } => {
            let filter = ClusterFilter {
                id,
                name,
                cluster_type,
                phase: status,
                vpc_id,
            };
            print_json(&query::find_cluster(client.as_ref(), &filter).await?)
        }
        ClusterCommand::Describe { id, description } => {
            let opts = ClusterUpdateOpts {
                spec: ClusterUpdateSpec { description },
            };
            print_json(&driver.update(&id, &opts).await?)
        }
        ClusterCommand::Delete { id } => {
            driver.delete(&id).await?;
            Ok(())
        }
    }
}

async fn run_node(
    cmd: NodeCommand,
    client: Arc<HttpClient>,
    config: &Config,
    cancel: CancellationToken,
) -> Result<()> {
    let driver = NodeDriver::new(client.clone())
        .with_cancellation(cancel)
        .with_timeouts(config.timeouts.apply(Default::default()));

    match cmd {
        NodeCommand::Show { cluster_id, id } => {
            match driver.read(&NodeKey::new(cluster_id, id.clone())).await? {
                Some(node) => print_json(&node),
                None => anyhow::bail!("Node {} not found", id),
            }
        }
        NodeCommand::Find {
            cluster_id,
            id,
            name,
            flavor,
            az,
            status,
        } => {
            let filter = NodeFilter {
                node_id: id,
                name,
                flavor,
                az,
                phase: status,
            };
            print_json(&query::find_node(client.as_ref(), &cluster_id, &filter).await?)
        }
        NodeCommand::Delete { cluster_id, id } => {
            driver.delete(&NodeKey::new(cluster_id, id)).await?;
            Ok(())
        }
    }
}
