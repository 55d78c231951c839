//! strand-cli — Command-line host for the Strand wallet engine.
//!
//! Derives addresses, reports the balance of an indexer coin export and
//! builds unsigned transactions (optionally as a PSBT) for an external
//! signer. Nothing is signed, broadcast or persisted.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bitcoin::bip32::Fingerprint;
use bitcoin::{OutPoint, Txid};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use strand_core::address::parse_address;
use strand_core::config::EngineConfig;
use strand_core::constants::FEE_RATE_SCALE;
use strand_core::network::{Network, NetworkParams, ScriptKind};
use strand_core::traits::StaticCoinSource;
use strand_core::types::{Chain, FeeRate, WalletCoin};
use strand_wallet::{
    generate_mnemonic, parse_path, Account, Wallet, WalletBalance, WalletProvider,
};

/// Environment variable holding the mnemonic; prompted for when unset.
const MNEMONIC_ENV: &str = "STRAND_MNEMONIC";
/// Optional BIP-39 passphrase.
const PASSPHRASE_ENV: &str = "STRAND_PASSPHRASE";

/// Strand command-line wallet host.
#[derive(Parser)]
#[command(name = "strand-cli")]
#[command(version, about = "Derive addresses and build unsigned transactions.")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Config file (default: <config dir>/strand/strand.toml if present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Network override (mainnet, testnet, signet, regtest).
    #[arg(short, long, global = true)]
    network: Option<String>,

    /// Script kind override (legacy, nested-segwit, native-segwit, taproot).
    #[arg(short, long, global = true)]
    script_kind: Option<String>,

    /// Account index.
    #[arg(short, long, global = true, default_value_t = 0)]
    account: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a fresh mnemonic.
    NewMnemonic(NewMnemonicArgs),
    /// Derive addresses.
    Address(AddressArgs),
    /// Report the owned balance of a coin export.
    Balance(BalanceArgs),
    /// Build an unsigned transaction.
    Build(BuildArgs),
}

#[derive(Args)]
struct NewMnemonicArgs {
    /// Number of words (12, 15, 18, 21 or 24).
    #[arg(short, long, default_value_t = 24)]
    words: usize,
}

#[derive(Args)]
struct AddressArgs {
    /// Chain: external (receive) or internal (change).
    #[arg(long, default_value = "external")]
    chain: String,

    /// First address index.
    #[arg(short, long, default_value_t = 0)]
    index: u32,

    /// Number of consecutive addresses.
    #[arg(long, default_value_t = 1)]
    count: u32,
}

#[derive(Args)]
struct BalanceArgs {
    /// JSON coin export from an indexer.
    #[arg(long)]
    coins: PathBuf,
}

#[derive(Args)]
struct BuildArgs {
    /// JSON coin export; every coin listed is spent.
    #[arg(long)]
    coins: PathBuf,

    /// Destination address.
    #[arg(short, long)]
    to: String,

    /// Amount in satoshis.
    #[arg(long)]
    amount: u64,

    /// Fee rate in sat/vB (up to three decimals, e.g. 2.5).
    #[arg(short, long)]
    fee_rate: String,

    /// Internal chain index receiving change.
    #[arg(long, default_value_t = 0)]
    change_index: u32,

    /// Print the hex-encoded PSBT instead of the JSON summary.
    #[arg(long)]
    psbt: bool,
}

/// One coin in an indexer export.
#[derive(Debug, Deserialize)]
struct CoinRecord {
    txid: String,
    vout: u32,
    value: u64,
    address: String,
    path: String,
    #[serde(default)]
    fingerprint: Option<String>,
}

impl CoinRecord {
    fn into_coin(self, network: Network) -> Result<WalletCoin> {
        let txid = Txid::from_str(&self.txid)
            .with_context(|| format!("Invalid txid {}", self.txid))?;
        let address = parse_address(&self.address, network)?;
        let path = parse_path(&self.path)?;
        let outpoint = OutPoint::new(txid, self.vout);
        let mut coin = WalletCoin::new(outpoint, self.value, address.script_pubkey(), path);
        if let Some(fp) = self.fingerprint {
            let fp = Fingerprint::from_str(&fp)
                .with_context(|| format!("Invalid fingerprint {fp}"))?;
            coin = coin.with_fingerprint(fp);
        }
        Ok(coin)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.global.log_level, &cli.global.log_format);

    match cli.command {
        Commands::NewMnemonic(args) => new_mnemonic(args),
        Commands::Address(args) => show_addresses(&cli.global, args),
        Commands::Balance(args) => show_balance(&cli.global, args),
        Commands::Build(args) => build(&cli.global, args),
    }
}

fn new_mnemonic(args: NewMnemonicArgs) -> Result<()> {
    let phrase = generate_mnemonic(args.words)?;
    println!("{phrase}");
    Ok(())
}

fn show_addresses(global: &GlobalArgs, args: AddressArgs) -> Result<()> {
    let params = load_params(global)?;
    let chain = parse_chain(&args.chain)?;
    let account = open_account(&params, global.account)?;

    let addresses: Vec<_> = account
        .derive_range(chain, args.index, args.count)?
        .into_iter()
        .map(|a| {
            json!({
                "index": a.index,
                "path": format!("m/{}", a.path),
                "address": a.address.to_string(),
                "public_key": a.public_key.to_string(),
            })
        })
        .collect();

    print_json(&json!({
        "account": account.id().to_string(),
        "xpub": account.xpub().to_string(),
        "chain": chain.to_string(),
        "addresses": addresses,
    }))
}

fn show_balance(global: &GlobalArgs, args: BalanceArgs) -> Result<()> {
    let params = load_params(global)?;
    let coins = read_coins(&args.coins, params.network)?;
    let source = StaticCoinSource::new(coins);
    let account = open_account(&params, global.account)?;

    let split = Wallet::spendable_from(&source, &account)?;
    let balance = WalletBalance::from_partition(&split)?;

    let foreign: Vec<_> = split
        .foreign
        .iter()
        .map(|(coin, reason)| {
            json!({
                "outpoint": coin.outpoint.to_string(),
                "reason": reason.to_string(),
            })
        })
        .collect();

    print_json(&json!({
        "account": account.id().to_string(),
        "total_sat": balance.total,
        "total_btc": balance.total_btc(),
        "coin_count": balance.coin_count,
        "foreign_count": balance.foreign_count,
        "foreign": foreign,
    }))
}

fn build(global: &GlobalArgs, args: BuildArgs) -> Result<()> {
    let params = load_params(global)?;
    let fee_rate = parse_fee_rate(&args.fee_rate)?;
    let coins = read_coins(&args.coins, params.network)?;
    let account = open_account(&params, global.account)?;
    let wallet = Wallet::new(params, Arc::new(StaticCoinSource::default()))?;

    let tx = wallet
        .build_transaction(&account, &coins, &args.to, args.amount, fee_rate, args.change_index)
        .context("Failed to build transaction")?;

    if args.psbt {
        let psbt = tx.to_psbt()?;
        println!("{}", hex::encode(psbt.serialize()));
        return Ok(());
    }

    let outputs: Vec<_> = tx
        .outputs()
        .iter()
        .map(|o| json!({ "address": o.address.to_string(), "value": o.value }))
        .collect();
    let inputs: Vec<_> = tx
        .inputs()
        .iter()
        .map(|c| {
            json!({
                "outpoint": c.outpoint.to_string(),
                "value": c.value,
                "path": format!("m/{}", c.path),
            })
        })
        .collect();
    let change = tx
        .change()
        .map(|c| {
            json!({
                "index": c.index,
                "path": format!("m/{}", c.path),
                "address": c.address.to_string(),
            })
        });

    print_json(&json!({
        "txid": tx.to_transaction().compute_txid().to_string(),
        "inputs": inputs,
        "outputs": outputs,
        "fee": tx.fee(),
        "fee_rate": tx.fee_rate().to_string(),
        "vsize_estimate": tx.vsize_estimate(),
        "change": change,
    }))
}

/// Initialize the tracing subscriber with env-filter support.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}

/// Load the engine config and apply command-line overrides.
fn load_params(global: &GlobalArgs) -> Result<NetworkParams> {
    let path = resolve_config_path(global.config.clone());
    let mut config = EngineConfig::load(path.as_deref()).context("Failed to load config")?;
    if let Some(network) = &global.network {
        config.network = Network::from_str(network)?;
    }
    if let Some(kind) = &global.script_kind {
        config.script_kind = ScriptKind::from_str(kind)?;
    }
    let params = config.resolve()?;
    debug!("resolved params: {params:?}");
    Ok(params)
}

/// Use the explicit config path, or the default one when it exists.
fn resolve_config_path(path: Option<PathBuf>) -> Option<PathBuf> {
    if path.is_some() {
        return path;
    }
    dirs::config_dir()
        .map(|d| d.join("strand").join("strand.toml"))
        .filter(|p| p.exists())
}

fn open_account(params: &NetworkParams, index: u32) -> Result<Account> {
    let phrase = match std::env::var(MNEMONIC_ENV) {
        Ok(p) => p,
        Err(_) => prompt_secret("Mnemonic")?,
    };
    let passphrase = std::env::var(PASSPHRASE_ENV).unwrap_or_default();
    Account::from_mnemonic(&phrase, &passphrase, params, index).context("Failed to derive account")
}

fn read_coins(path: &Path, network: Network) -> Result<Vec<WalletCoin>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_coins(&raw, network)
}

fn parse_coins(raw: &str, network: Network) -> Result<Vec<WalletCoin>> {
    let records: Vec<CoinRecord> = serde_json::from_str(raw).context("Invalid coin file")?;
    records.into_iter().map(|r| r.into_coin(network)).collect()
}

fn parse_chain(s: &str) -> Result<Chain> {
    match s.to_lowercase().as_str() {
        "external" | "receive" | "0" => Ok(Chain::External),
        "internal" | "change" | "1" => Ok(Chain::Internal),
        _ => bail!("Invalid chain (must be 'external' or 'internal')"),
    }
}

/// Parse a sat/vB rate with up to three decimals into an exact per-kvB rate.
fn parse_fee_rate(s: &str) -> Result<FeeRate> {
    let s = s.trim();
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if frac.len() > 3 || (whole.is_empty() && frac.is_empty()) {
        bail!("Invalid fee rate {s:?}");
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        bail!("Invalid fee rate {s:?}");
    }
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .with_context(|| format!("Invalid fee rate {s:?}"))?
    };
    let frac_kvb: u64 = if frac.is_empty() {
        0
    } else {
        let digits: u64 = frac
            .parse()
            .with_context(|| format!("Invalid fee rate {s:?}"))?;
        digits * 10u64.pow(3 - frac.len() as u32)
    };
    let kvb = whole
        .checked_mul(FEE_RATE_SCALE)
        .and_then(|w| w.checked_add(frac_kvb))
        .context("Fee rate too large")?;
    Ok(FeeRate::from_sat_per_kvb(kvb))
}

fn prompt_secret(prompt: &str) -> Result<String> {
    rpassword::prompt_password(format!("{}: ", prompt)).context("Failed to read input")
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_rate_parsing() {
        assert_eq!(parse_fee_rate("10").unwrap(), FeeRate::from_sat_per_vb(10));
        assert_eq!(parse_fee_rate("2.5").unwrap().sat_per_kvb(), 2_500);
        assert_eq!(parse_fee_rate("0.125").unwrap().sat_per_kvb(), 125);
        assert_eq!(parse_fee_rate(".5").unwrap().sat_per_kvb(), 500);
        assert!(parse_fee_rate("1.2345").is_err());
        assert!(parse_fee_rate("abc").is_err());
        assert!(parse_fee_rate("").is_err());
        assert!(parse_fee_rate("-1").is_err());
        assert!(parse_fee_rate("+1").is_err());
        assert!(parse_fee_rate("1.+5").is_err());
        assert!(parse_fee_rate("1.-5").is_err());
    }

    #[test]
    fn chain_parsing() {
        assert_eq!(parse_chain("External").unwrap(), Chain::External);
        assert_eq!(parse_chain("change").unwrap(), Chain::Internal);
        assert!(parse_chain("2").is_err());
    }

    #[test]
    fn coin_file_parsing() {
        let raw = r#"[
            {
                "txid": "0101010101010101010101010101010101010101010101010101010101010101",
                "vout": 1,
                "value": 1200000,
                "address": "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu",
                "path": "m/84'/0'/0'/0/0",
                "fingerprint": "73c5da0a"
            }
        ]"#;
        let coins = parse_coins(raw, Network::Mainnet).unwrap();
        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].outpoint.vout, 1);
        assert_eq!(coins[0].value, 1_200_000);
        assert_eq!(coins[0].master_fingerprint.unwrap().to_string(), "73c5da0a");
    }

    #[test]
    fn coin_file_wrong_network_fails() {
        let raw = r#"[{
            "txid": "0101010101010101010101010101010101010101010101010101010101010101",
            "vout": 0,
            "value": 1,
            "address": "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu",
            "path": "m/84'/1'/0'/0/0"
        }]"#;
        assert!(parse_coins(raw, Network::Testnet).is_err());
    }

    #[test]
    fn coin_file_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coins.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(read_coins(&path, Network::Mainnet).unwrap().is_empty());
        assert!(read_coins(&dir.path().join("missing.json"), Network::Mainnet).is_err());
    }

    #[test]
    fn cli_parses_build() {
        let cli = Cli::try_parse_from([
            "strand-cli",
            "--network",
            "testnet",
            "build",
            "--coins",
            "coins.json",
            "--to",
            "tb1qexample",
            "--amount",
            "1000",
            "--fee-rate",
            "1.5",
            "--psbt",
        ])
        .unwrap();
        assert_eq!(cli.global.network.as_deref(), Some("testnet"));
        assert!(matches!(cli.command, Commands::Build(ref b) if b.psbt && b.amount == 1000));
    }
}
