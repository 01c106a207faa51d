use anyhow::{Context, Result};
use clap::Parser;
use std::{fs, path::Path};
use testnetify::{
    AccountIdentity, TestnetConfig, TestnetParams, ValidatorIdentity, execute,
    post_genesis::{self, LedgerSnapshot},
    storage,
    utils::{DEFAULT_CHAIN_ID, DEFAULT_INPUT_GENESIS, DEFAULT_OUTPUT_GENESIS},
};
use tracing::{Level, info};
use tracing_appender::non_blocking::WorkerGuard;

/// Create a testnet from a state export
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Chain ID for the testnet
    #[arg(short, long, default_value = DEFAULT_CHAIN_ID)]
    chain_id: String,

    /// Path to input genesis
    #[arg(short, long = "input", default_value = DEFAULT_INPUT_GENESIS)]
    input_genesis: String,

    /// Path to output genesis
    #[arg(short, long = "output", default_value = DEFAULT_OUTPUT_GENESIS)]
    output_genesis: String,

    /// Validator hex address to replace
    #[arg(long)]
    validator_hex_address: String,

    /// Validator operator address to replace
    #[arg(long)]
    validator_operator_address: String,

    /// Validator consensus address to replace
    #[arg(long)]
    validator_consensus_address: String,

    /// Validator pubkey to replace
    #[arg(long)]
    validator_pubkey: String,

    /// Account address to replace
    #[arg(long)]
    account_address: String,

    /// The accounts public key
    #[arg(long)]
    account_pubkey: String,

    /// Less verbose output
    #[arg(short, long)]
    quiet: bool,

    /// Prune the IBC module
    #[arg(long)]
    prune_ibc: bool,

    /// Properly indent output genesis (increases time and file size)
    #[arg(long)]
    pretty_output: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// JSON file overriding chain parameters and the impersonated identities
    #[arg(long)]
    config_file: Option<String>,

    /// Log file path (optional)
    #[arg(short, long)]
    log_file: Option<String>,
}

impl Args {
    fn testnet_config(&self, params: TestnetParams) -> TestnetConfig {
        TestnetConfig {
            chain_id: self.chain_id.clone(),
            prune_ibc: self.prune_ibc,
            new_validator: ValidatorIdentity {
                moniker: params.new_validator_moniker.clone(),
                pubkey: self.validator_pubkey.clone(),
                hex_address: self.validator_hex_address.clone(),
                operator_address: self.validator_operator_address.clone(),
                consensus_address: self.validator_consensus_address.clone(),
            },
            new_account: AccountIdentity {
                pubkey: self.account_pubkey.clone(),
                address: self.account_address.clone(),
            },
            params,
        }
    }
}

/// The returned guard must live until exit so buffered file logs are flushed.
fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    let level = if args.debug {
        Level::DEBUG
    } else if args.quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    if let Some(log_file_path) = &args.log_file {
        let path = Path::new(log_file_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating log directory {}", parent.display()))?;
            }
        }

        let file_appender = tracing_appender::rolling::never("", log_file_path);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(non_blocking)
            .with_ansi(false)
            .init();

        info!("Logging to file: {}", log_file_path);
        Ok(Some(guard))
    } else {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
        Ok(None)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = init_logging(&args)?;

    info!("Starting testnetify");

    let params = match &args.config_file {
        Some(path) => TestnetParams::from_file(path)
            .with_context(|| format!("loading testnet parameters from {path}"))?,
        None => TestnetParams::default(),
    };
    let config = args.testnet_config(params);

    let mut genesis = storage::read_genesis(&args.input_genesis)
        .with_context(|| format!("reading genesis from {}", args.input_genesis))?;

    let before = LedgerSnapshot::before(&genesis, &config)?;
    let report = execute::testnetify(&mut genesis, &config).context("transforming genesis")?;
    post_genesis::verify_result(&genesis, &before, &config)?;
    info!(
        "Replaced {} identity values, chain-id {} -> {}",
        report.replaced_values, report.previous_chain_id, config.chain_id
    );

    storage::write_genesis(&args.output_genesis, &genesis, args.pretty_output)
        .with_context(|| format!("writing genesis to {}", args.output_genesis))?;

    info!("testnetify completed successfully");
    Ok(())
}
