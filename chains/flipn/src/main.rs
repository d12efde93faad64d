use flipn_project::balance::{apply_balances, fetch_balances};
use flipn_project::config::{FlipnConfig, DEFAULT_CONFIG_PATH};
use flipn_project::{BuyExecutor, BuyParams, FlipnClient, LikeExecutor, SolanaRpc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use core_logic::{
    generate_wallets, import_wallets, read_wallet_records, setup_logger, shorten,
    validate_wallets, BatchRequest, BatchResult, BatchRunner, DecodedKeypair, DelayOverrides,
    KeyDecoder, OperationExecutor, OperationOverride, RangeOverride, WalletCredential,
    WalletRecord, WalletStore,
};
use dialoguer::{theme::ColorfulTheme, Password};
use dotenv::dotenv;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "FlipN batch like/buy automation", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    /// Legacy decoding: keys that are not base58 or base64 (hex included) run as a SHA-256 derived wallet
    #[arg(long, global = true)]
    allow_derived_keys: bool,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate new wallets and add them to the wallet file
    Generate {
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
        /// Write the new wallets here instead of the wallet file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import wallets from a JSON file into the wallet file
    Import { file: PathBuf },
    /// Check that every address matches its private key
    Validate {
        /// Defaults to the wallet file
        file: Option<PathBuf>,
    },
    /// Show SOL balances of stored wallets
    Balance {
        /// Store the fetched balances in the wallet file
        #[arg(long)]
        save: bool,
    },
    /// List trending projects
    Projects {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Look up the projects of a token address
    Project { address: String },
    /// Like every target with every stored wallet
    Like(BatchArgs),
    /// Buy every target with every stored wallet
    Buy {
        #[command(flatten)]
        batch: BatchArgs,
        /// SOL to spend per wallet and target
        #[arg(long)]
        amount: f64,
        /// Slippage tolerance in percent
        #[arg(long, default_value_t = 3.0)]
        slippage: f64,
    },
    /// Decode a private key and show its address
    InspectKey {
        /// Prompted for when omitted
        key: Option<String>,
    },
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Comma separated token addresses; defaults to TARGET_LIST or the config
    #[arg(short, long, value_delimiter = ',')]
    targets: Vec<String>,
    #[command(flatten)]
    delays: DelayArgs,
    /// Also write the batch result as JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DelayArgs {
    /// Minimum delay between wallets (ms)
    #[arg(long)]
    wallet_delay_min: Option<u64>,
    /// Maximum delay between wallets (ms)
    #[arg(long)]
    wallet_delay_max: Option<u64>,
    /// Fixed delay between operations of one wallet (ms)
    #[arg(long)]
    op_delay: Option<u64>,
}

impl DelayArgs {
    fn to_overrides(&self) -> DelayOverrides {
        let wallet = (self.wallet_delay_min.is_some() || self.wallet_delay_max.is_some()).then(
            || RangeOverride {
                min: self.wallet_delay_min,
                max: self.wallet_delay_max,
            },
        );
        let operation = self.op_delay.map(|fixed| OperationOverride {
            fixed: Some(fixed),
            ..Default::default()
        });
        DelayOverrides { wallet, operation }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = setup_logger();
    dotenv().ok();

    let cli = Cli::parse();
    info!("Loading config from: {}", cli.config);

    let mut config = FlipnConfig::load(&cli.config)?;
    if cli.allow_derived_keys {
        config.allow_derived_keys = true;
    }
    if config.allow_derived_keys {
        warn!("Derived keys enabled: hex and undecodable keys run as a derived wallet");
    }

    let ctx = App {
        store: WalletStore::new(&config.wallets_file),
        decoder: KeyDecoder::new(config.decode_policy()),
        json: cli.json,
        config,
    };

    match cli.command {
        Command::Generate { count, output } => generate(&ctx, count, output.as_deref()),
        Command::Import { file } => import(&ctx, &file),
        Command::Validate { file } => validate(&ctx, file.as_deref()),
        Command::Balance { save } => balance(&ctx, save).await,
        Command::Projects { page } => projects(&ctx, page).await,
        Command::Project { address } => project(&ctx, &address).await,
        Command::Like(args) => {
            let client = Arc::new(FlipnClient::new(&ctx.config)?);
            let executor = LikeExecutor::new(client);
            run_batch(&ctx, &args, &executor).await
        }
        Command::Buy {
            batch,
            amount,
            slippage,
        } => {
            let params = BuyParams::new(amount, slippage)?;
            let client = Arc::new(FlipnClient::new(&ctx.config)?);
            let rpc = Arc::new(SolanaRpc::new(
                &ctx.config.rpc_url,
                ctx.config.request_timeout(),
            ));
            let executor = BuyExecutor::new(client, rpc, params, ctx.config.confirm_timeout());
            run_batch(&ctx, &batch, &executor).await
        }
        Command::InspectKey { key } => inspect_key(&ctx, key),
    }
}

struct App {
    config: FlipnConfig,
    store: WalletStore,
    decoder: KeyDecoder,
    json: bool,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("Failed to write {:?}", path))
}

fn generate(ctx: &App, count: usize, output: Option<&Path>) -> Result<()> {
    let wallets = generate_wallets(count)?;

    match output {
        Some(path) => {
            WalletStore::new(path).save(&wallets)?;
            info!("Wrote {} wallets to {:?}", wallets.len(), path);
        }
        None => {
            let summary = ctx.store.merge(&wallets)?;
            info!(
                "Added {} wallets to {:?} ({} total)",
                summary.added,
                ctx.store.path(),
                summary.total
            );
        }
    }

    if ctx.json {
        let addresses: Vec<&str> = wallets.iter().map(|w| w.public_key.as_str()).collect();
        return print_json(&json!({ "generated": addresses }));
    }
    for (i, wallet) in wallets.iter().enumerate() {
        println!("{:>3}. {}", i + 1, wallet.public_key.green());
    }
    Ok(())
}

fn import(ctx: &App, file: &Path) -> Result<()> {
    let records = read_wallet_records(file)?;
    let report = import_wallets(&records, ctx.config.decode_policy());
    let summary = ctx.store.merge(&report.wallets)?;

    if ctx.json {
        return print_json(&json!({
            "processed": records.len(),
            "imported": report.imported(),
            "invalid": report.invalid,
            "store": summary,
        }));
    }

    println!(
        "Processed {} | Imported {} | Invalid {}",
        records.len(),
        report.imported().to_string().green(),
        report.invalid.len().to_string().red()
    );
    println!(
        "Wallet file {:?}: {} added, {} updated, {} total",
        ctx.store.path(),
        summary.added,
        summary.updated,
        summary.total
    );
    for invalid in &report.invalid {
        println!("  {} {}", "invalid".red(), invalid.public_key);
    }
    Ok(())
}

fn validate(ctx: &App, file: Option<&Path>) -> Result<()> {
    let records = match file {
        Some(path) => read_wallet_records(path)?,
        None => ctx
            .store
            .load()?
            .iter()
            .map(|w| WalletRecord {
                public_key: Some(w.public_key.clone()),
                private_key: Some(w.private_key.clone()),
                balance: w.balance,
            })
            .collect(),
    };
    let report = validate_wallets(&records, ctx.config.decode_policy());

    if ctx.json {
        return print_json(&json!({
            "stats": report.stats,
            "invalid": report.invalid,
        }));
    }

    println!(
        "Total {} | Valid {} | Invalid {}",
        report.stats.total,
        report.stats.valid.to_string().green(),
        report.stats.invalid.to_string().red()
    );
    for invalid in &report.invalid {
        let flags = &invalid.errors;
        let mut reasons = Vec::new();
        if flags.missing_required_fields {
            reasons.push("missing fields");
        }
        if flags.invalid_public_key {
            reasons.push("bad address");
        }
        if flags.invalid_private_key {
            reasons.push("bad private key");
        }
        if flags.key_mismatch {
            reasons.push("address does not match key");
        }
        println!("  {} {}: {}", "x".red(), invalid.public_key, reasons.join(", "));
    }
    Ok(())
}

async fn balance(ctx: &App, save: bool) -> Result<()> {
    let mut wallets = ctx.store.load()?;
    let rpc = SolanaRpc::new(&ctx.config.rpc_url, ctx.config.request_timeout());
    let entries = fetch_balances(&rpc, &wallets).await;

    if save {
        let updated = apply_balances(&mut wallets, &entries);
        ctx.store.save(&wallets)?;
        info!("Saved {} balances to {:?}", updated, ctx.store.path());
    }

    if ctx.json {
        return print_json(&entries);
    }
    for entry in &entries {
        match (entry.balance, &entry.error) {
            (Some(sol), _) => println!("{}  {:.9} SOL", entry.public_key, sol),
            (None, Some(error)) => println!("{}  {}", entry.public_key, error.red()),
            (None, None) => println!("{}  -", entry.public_key),
        }
    }
    Ok(())
}

/// First stored wallet that decodes, or a throwaway keypair.
fn auth_keypair(ctx: &App) -> DecodedKeypair {
    let stored = ctx
        .store
        .load()
        .ok()
        .and_then(|wallets| {
            wallets
                .iter()
                .find_map(|w| ctx.decoder.decode(&w.private_key).ok())
        });
    stored.unwrap_or_else(|| {
        info!("No usable stored wallet, authenticating with an ephemeral keypair");
        DecodedKeypair::generate()
    })
}

fn project_label(project: &Value) -> String {
    ["name", "tokenName", "symbol", "id", "address"]
        .iter()
        .find_map(|key| match project.get(*key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "<unnamed>".to_string())
}

async fn projects(ctx: &App, page: u32) -> Result<()> {
    let client = FlipnClient::new(&ctx.config)?;
    let token = client.authenticate(&auth_keypair(ctx)).await?;
    let page = client.trends(&token, page, ctx.config.page_limit).await?;

    if ctx.json {
        return print_json(&page);
    }
    println!(
        "Page {} ({} projects{})",
        page.page,
        page.projects.len(),
        if page.has_more { ", more available" } else { "" }
    );
    for project in &page.projects {
        println!("  {}", project_label(project));
    }
    Ok(())
}

async fn project(ctx: &App, address: &str) -> Result<()> {
    let client = FlipnClient::new(&ctx.config)?;
    let token = client.authenticate(&auth_keypair(ctx)).await?;
    let projects = client.projects(&token, address).await?;

    if ctx.json {
        return print_json(&projects);
    }
    if projects.is_empty() {
        println!("No projects for {}", address);
    }
    for project in &projects {
        println!("  {}", project_label(project));
    }
    Ok(())
}

async fn run_batch<E>(ctx: &App, args: &BatchArgs, executor: &E) -> Result<()>
where
    E: OperationExecutor,
{
    let wallets: Vec<WalletCredential> = ctx.store.load()?;
    let targets = if args.targets.is_empty() {
        ctx.config.target_tokens.clone()
    } else {
        args.targets.clone()
    };
    let delays = ctx.config.delay_config(&args.delays.to_overrides())?;
    let request = BatchRequest::new(&wallets, &targets, delays)?;

    let result = BatchRunner::new(ctx.decoder).run(&request, executor).await;

    if let Some(path) = &args.output {
        write_json(path, &result)?;
        info!("Batch result written to {:?}", path);
    }
    if ctx.json {
        return print_json(&result);
    }
    print_summary(executor.name(), &result);
    Ok(())
}

fn print_summary(operation: &str, result: &BatchResult) {
    println!();
    println!("{} {}", "Batch".bold(), operation.bold());
    println!(
        "  Success: {}  Failed: {}  Rate: {:.2}%",
        result.success.to_string().green(),
        result.failed.to_string().red(),
        result.success_rate()
    );
    for detail in result.details.iter().filter(|d| d.success) {
        if let Some(receipt) = &detail.result {
            println!("  {} {}", "ok".green(), receipt.summary);
        }
    }
    for error in &result.errors {
        println!("  {} {}", "err".red(), error);
    }
}

fn inspect_key(ctx: &App, key: Option<String>) -> Result<()> {
    let secret = match key {
        Some(key) => key,
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Private key")
            .interact()
            .context("Cannot prompt for a key (not a terminal); pass it as an argument")?,
    };

    let keypair = ctx.decoder.decode(&secret)?;
    if ctx.json {
        return print_json(&json!({
            "address": keypair.address(),
            "source": keypair.source(),
            "derived": keypair.source().is_derived(),
        }));
    }

    println!("Address: {}", keypair.address().green());
    println!("Decoded: {}", keypair.source());
    if keypair.source().is_derived() {
        println!(
            "{}",
            "Derived wallet: this is NOT the wallet the key originally belonged to".yellow()
        );
    }
    println!("Short:   {}", shorten(keypair.address(), 10));
    Ok(())
}
