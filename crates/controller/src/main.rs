//! Manta install controller: watches Install records and drives the
//! reconciliation engine.

#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use kube::{
    api::Api,
    core::DynamicObject,
    runtime::{
        controller::{Action, Controller},
        watcher,
    },
    Client,
};
use tracing::{info, warn};

use manta_reconcile::{bootstrap, ReconcileError, Reconciler};
use manta_store::{install_api_resource, KubeStore};

#[derive(Parser, Debug)]
#[command(name = "manta-operator", version, about = "Manta install controller")]
struct Cli {
    /// File or directory containing the YAML resources to apply
    #[arg(long = "filename", default_value = "deploy/resources")]
    filename: PathBuf,

    /// If filename is a directory, process all manifests recursively
    #[arg(long = "recursive")]
    recursive: bool,

    /// Namespace in which to create an Install record, if none exist
    #[arg(long = "install-ns")]
    install_ns: Option<String>,
}

/// Process-wide configuration, immutable after startup.
struct ControllerConfig {
    filename: PathBuf,
    recursive: bool,
    install_ns: Option<String>,
}

impl From<Cli> for ControllerConfig {
    fn from(cli: Cli) -> Self {
        Self { filename: cli.filename, recursive: cli.recursive, install_ns: cli.install_ns }
    }
}

struct Ctx {
    reconciler: Reconciler,
}

fn init_tracing() {
    let env = std::env::var("MANTA_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("MANTA_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid MANTA_METRICS_ADDR; expected host:port");
        }
    }
}

async fn reconcile(obj: Arc<DynamicObject>, ctx: Arc<Ctx>) -> Result<Action, ReconcileError> {
    let namespace = obj.metadata.namespace.clone().unwrap_or_default();
    let name = obj.metadata.name.clone().unwrap_or_default();
    ctx.reconciler.reconcile(&namespace, &name).await?;
    Ok(Action::await_change())
}

fn error_policy(_obj: Arc<DynamicObject>, err: &ReconcileError, _ctx: Arc<Ctx>) -> Action {
    warn!(error = %err, "requeueing after reconcile error");
    Action::requeue(Duration::from_secs(10))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let config = ControllerConfig::from(Cli::parse());

    let manifest = manta_manifest::loader::load(&config.filename, config.recursive)
        .with_context(|| format!("loading manifest from {}", config.filename.display()))?;
    info!(path = %config.filename.display(), resources = manifest.len(), "manifest loaded");

    let client = Client::try_default().await.context("building kube client")?;
    let store = Arc::new(KubeStore::new(client.clone()).await?);
    let reconciler = Reconciler::new(store.clone(), manifest);

    // One-shot, best-effort seeding; races with external creates are benign.
    if let Some(ns) = config.install_ns.clone() {
        let seed_store = store.clone();
        tokio::spawn(async move {
            bootstrap::run(seed_store.as_ref(), Path::new(bootstrap::BOOTSTRAP_MANIFEST), &ns)
                .await;
        });
    }

    let ar = install_api_resource();
    let installs: Api<DynamicObject> = Api::all_with(client, &ar);
    let ctx = Arc::new(Ctx { reconciler });

    info!("starting install controller");
    Controller::new_with(installs, watcher::Config::default(), ar)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => info!(name = %obj.name, ns = ?obj.namespace, "reconciled"),
                Err(e) => warn!(error = %e, "reconcile dispatch failed"),
            }
        })
        .await;

    Ok(())
}
