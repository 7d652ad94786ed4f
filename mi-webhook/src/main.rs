mod config;
mod mutation;

use std::net::{
    IpAddr,
    Ipv4Addr,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mi_core::errors::*;
use mi_core::k8s::KubeStore;
use mi_core::logging;
use mi_core::prelude::*;
use mi_injector::{
    EngineConfig,
    Injector,
};
use rocket::config::TlsConfig;
use tracing::*;

use crate::config::WebhookConfig;
use crate::mutation::MutationContext;

#[derive(Clone, Debug, Parser)]
struct Options {
    #[arg(long)]
    cert_path: String,

    #[arg(long)]
    key_path: String,

    #[arg(long, default_value = DEFAULT_WEBHOOK_PORT)]
    port: u16,

    // Liveness and readiness probes are served over plain HTTP on their own port
    #[arg(long, default_value = DEFAULT_HEALTH_PROBE_PORT)]
    health_probe_port: u16,

    #[arg(long, default_value = DEFAULT_MUTATION_TIMEOUT_SECONDS)]
    mutation_timeout_seconds: u64,

    // Admit pods unmodified if injection fails, instead of rejecting them
    #[arg(long)]
    ignore_errors: bool,

    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config_file: PathBuf,

    #[arg(short, long, default_value = "info")]
    verbosity: String,
}

#[rocket::get("/healthz")]
fn healthz() -> &'static str {
    "ok"
}

#[rocket::get("/readyz")]
fn readyz() -> &'static str {
    "ok"
}

fn webhook_server(config: &rocket::Config, ctx: MutationContext) -> rocket::Rocket<rocket::Build> {
    rocket::custom(config).mount("/", rocket::routes![mutation::handler]).manage(ctx)
}

fn probe_server(config: &rocket::Config) -> rocket::Rocket<rocket::Build> {
    rocket::custom(config).mount("/", rocket::routes![healthz, readyz])
}

#[instrument(ret, err)]
async fn run(opts: Options) -> EmptyResult {
    let config = WebhookConfig::load(&opts.config_file)?;
    let engine_config = Arc::new(EngineConfig::build(config.infra_agent_injection)?);
    info!("injector configured: {engine_config:?}");

    let client = kube::Client::try_default().await?;
    let injector = Injector::new(engine_config, Arc::new(KubeStore::new(client)));
    let ctx = MutationContext::new(injector, Duration::from_secs(opts.mutation_timeout_seconds), opts.ignore_errors);

    let webhook_config = rocket::Config {
        address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        port: opts.port,
        tls: Some(TlsConfig::from_paths(&opts.cert_path, &opts.key_path)),
        ..Default::default()
    };
    let probe_config = rocket::Config {
        address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        port: opts.health_probe_port,
        ..Default::default()
    };

    let webhook_task = tokio::spawn(webhook_server(&webhook_config, ctx).launch());
    let probe_task = tokio::spawn(probe_server(&probe_config).launch());

    // Either server stopping takes the whole process down
    tokio::select! {
        res = webhook_task => Err(anyhow!("webhook server terminated: {:?}", res.map(|r| r.map(|_| ())))),
        res = probe_task => Err(anyhow!("health probe server terminated: {:?}", res.map(|r| r.map(|_| ())))),
    }
}

#[tokio::main]
async fn main() {
    let args = Options::parse();
    logging::setup(&format!("{},rocket=warn", args.verbosity));
    if let Err(err) = run(args).await {
        skerr!(err, "webhook failed");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests;
