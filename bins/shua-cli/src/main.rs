//! shua: command-line wallet and social publisher for BSV.
//!
//! Manages an encrypted two-key wallet, sends payments, and publishes
//! signed social records (posts, likes, follows...) as on-chain data.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::{Args, Parser, Subcommand};
use shua_core::address::Network;
use shua_core::constants::COIN;
use shua_social::{BSocial, Encoding, Ops, PostContent, sign};
use shua_wallet::{
    BroadcastClient, EncryptedFileStore, IndexerClient, KeyMaterial, KeyStore, TransactionBuilder,
    Wallet,
};

use crate::config::Config;

/// BSV wallet with an on-chain social layer.
#[derive(Parser)]
#[command(name = "shua")]
#[command(version, about = "Pay and post on BSV.")]
struct Cli {
    /// Path to wallet file (default: ~/.shua/wallet.dat or $SHUA_WALLET_PATH).
    #[arg(short, long, global = true)]
    wallet: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wallet management subcommands.
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
    /// Show the payment and identity addresses.
    Address,
    /// Query the payment address balance from the indexer.
    Balance,
    /// Send a payment.
    Send(SendArgs),
    /// Publish a post, or a reply with --reply-to.
    Post(PostArgs),
    /// Repost an existing record.
    Repost(TargetArgs),
    /// Like a record, optionally with an emoji reaction.
    Like(LikeArgs),
    /// Tip the author of a record.
    Tip(TipArgs),
    /// Follow an identity.
    Follow(IdentityArgs),
    /// Stop following an identity.
    Unfollow(IdentityArgs),
}

#[derive(Subcommand)]
enum WalletAction {
    /// Create a wallet with fresh payment and identity keys.
    Create(WalletCreateArgs),
    /// Restore a wallet from its two WIF keys.
    Restore(WalletRestoreArgs),
}

#[derive(Args)]
struct WalletCreateArgs {
    /// Network (mainnet or testnet); defaults to $SHUA_NETWORK.
    #[arg(short, long)]
    network: Option<String>,
}

#[derive(Args)]
struct WalletRestoreArgs {
    /// WIF payment key. If not provided, will prompt securely.
    #[arg(long)]
    payment_key: Option<String>,

    /// WIF identity key. If not provided, will prompt securely.
    #[arg(long)]
    identity_key: Option<String>,
}

#[derive(Args)]
struct SendArgs {
    /// Recipient address.
    #[arg(short, long)]
    to: String,

    /// Amount in BSV (e.g., 0.0001). Ignored with --max.
    #[arg(short, long, required_unless_present = "max")]
    amount: Option<f64>,

    /// Send the whole balance.
    #[arg(long)]
    max: bool,

    /// Fee rate in satoshis per kilobyte.
    #[arg(long)]
    fee_per_kb: Option<u64>,
}

#[derive(Args)]
struct PublishArgs {
    /// Print the signed tokens instead of broadcasting them.
    #[arg(long)]
    dry_run: bool,

    /// Print tokens as hex rather than UTF-8 in --dry-run output.
    #[arg(long)]
    hex: bool,
}

#[derive(Args)]
struct PostArgs {
    /// Markdown text. May be repeated.
    #[arg(short, long)]
    text: Vec<String>,

    /// Image file (png, jpeg, gif or webp). May be repeated.
    #[arg(short, long)]
    image: Vec<PathBuf>,

    /// Extra metadata as key=value. May be repeated.
    #[arg(short, long)]
    meta: Vec<String>,

    /// Reply to this transaction id.
    #[arg(long)]
    reply_to: Option<String>,

    #[command(flatten)]
    publish: PublishArgs,
}

#[derive(Args)]
struct TargetArgs {
    /// Transaction id of the target record.
    tx_id: String,

    #[command(flatten)]
    publish: PublishArgs,
}

#[derive(Args)]
struct LikeArgs {
    /// Transaction id of the liked record.
    tx_id: String,

    /// Single-emoji reaction.
    #[arg(short, long)]
    emoji: Option<String>,

    #[command(flatten)]
    publish: PublishArgs,
}

#[derive(Args)]
struct TipArgs {
    /// Transaction id of the tipped record.
    tx_id: String,

    /// Tip amount, recorded as metadata.
    #[arg(short, long)]
    amount: Option<f64>,

    /// Currency of the amount (default: USD).
    #[arg(short, long)]
    currency: Option<String>,

    #[command(flatten)]
    publish: PublishArgs,
}

#[derive(Args)]
struct IdentityArgs {
    /// Identity key of the followed user.
    id_key: String,

    #[command(flatten)]
    publish: PublishArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(path) = cli.wallet {
        config.wallet_path = path;
    }

    match cli.command {
        Commands::Wallet { action } => match action {
            WalletAction::Create(args) => wallet_create(&config, args),
            WalletAction::Restore(args) => wallet_restore(&config, args),
        },
        Commands::Address => wallet_address(&config),
        Commands::Balance => wallet_balance(&config).await,
        Commands::Send(args) => wallet_send(&config, args).await,
        Commands::Post(args) => social_post(&config, args).await,
        Commands::Repost(args) => {
            let ops = social(&config)?.repost(&args.tx_id)?;
            publish(&config, ops, &args.publish).await
        }
        Commands::Like(args) => {
            let ops = social(&config)?.like(&args.tx_id, args.emoji.as_deref())?;
            publish(&config, ops, &args.publish).await
        }
        Commands::Tip(args) => {
            let ops =
                social(&config)?.tip(&args.tx_id, args.amount, args.currency.as_deref())?;
            publish(&config, ops, &args.publish).await
        }
        Commands::Follow(args) => {
            let ops = social(&config)?.follow(&args.id_key)?;
            publish(&config, ops, &args.publish).await
        }
        Commands::Unfollow(args) => {
            let ops = social(&config)?.unfollow(&args.id_key)?;
            publish(&config, ops, &args.publish).await
        }
    }
}

/// Create a new wallet with random keys.
fn wallet_create(config: &Config, args: WalletCreateArgs) -> Result<()> {
    let network = match args.network {
        Some(s) => parse_network(&s)?,
        None => config.network,
    };
    ensure_absent(config)?;

    let keys = KeyMaterial::generate(network).context("Failed to generate keys")?;
    let store = open_store(config, true)?;
    store.save(&keys.to_record()).context("Failed to save wallet")?;

    println!("\n=== WALLET CREATED ===");
    println!("Network: {}", network_name(network));
    println!("Payment address:  {}", keys.payment_address());
    println!("Identity address: {}", keys.identity_address());
    println!("\nBack up the wallet file. Anyone holding it and its password can spend your funds.");
    println!("Wallet saved to: {}", config.wallet_path.display());
    Ok(())
}

/// Restore a wallet from WIF keys.
fn wallet_restore(config: &Config, args: WalletRestoreArgs) -> Result<()> {
    ensure_absent(config)?;

    let payment_wif = match args.payment_key {
        Some(k) => k,
        None => prompt_password("Enter payment key (WIF)")?,
    };
    let identity_wif = match args.identity_key {
        Some(k) => k,
        None => prompt_password("Enter identity key (WIF)")?,
    };

    let keys = KeyMaterial::restore(identity_wif.trim(), payment_wif.trim())
        .context("Failed to restore keys")?;
    let store = open_store(config, true)?;
    store.save(&keys.to_record()).context("Failed to save wallet")?;

    println!("\n=== WALLET RESTORED ===");
    println!("Network: {}", network_name(keys.network()));
    println!("Payment address: {}", keys.payment_address());
    println!("Wallet saved to: {}", config.wallet_path.display());
    Ok(())
}

/// Display the wallet's addresses.
fn wallet_address(config: &Config) -> Result<()> {
    let keys = load_keys(config)?;
    println!("payment:  {}", keys.payment_address());
    println!("identity: {}", keys.identity_address());
    Ok(())
}

/// Query and display the payment balance.
async fn wallet_balance(config: &Config) -> Result<()> {
    let keys = load_keys(config)?;
    let wallet = connect(config, TransactionBuilder::new())?;

    let balance = wallet
        .balance(&keys)
        .await
        .context("Failed to query balance")?;

    println!("Address: {}", keys.payment_address());
    println!("Balance: {} BSV ({balance} satoshis)", format_bsv(balance));
    Ok(())
}

/// Build, sign and broadcast a payment.
async fn wallet_send(config: &Config, args: SendArgs) -> Result<()> {
    let keys = load_keys(config)?;
    let mut builder = TransactionBuilder::new();
    if let Some(rate) = args.fee_per_kb {
        builder.set_fee_per_kb(rate);
    }
    let wallet = connect(config, builder)?;

    let txid = if args.max {
        wallet.send_max(&keys, &args.to).await
    } else {
        let amount = args.amount.context("--amount is required")?;
        wallet.send(&keys, &args.to, parse_bsv(amount)?).await
    }
    .context("Failed to send")?;

    println!("Transaction sent: {txid}");
    Ok(())
}

async fn social_post(config: &Config, args: PostArgs) -> Result<()> {
    let mut content = PostContent::new();
    for text in &args.text {
        content.add_markdown(text.as_str());
    }
    for path in &args.image {
        content.add_image(&image_data_url(path)?)?;
    }
    for pair in &args.meta {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("metadata must be key=value, got {pair}"))?;
        content.add_map_data(key, value)?;
    }

    let social = social(config)?;
    let ops = match &args.reply_to {
        Some(tx_id) => social.reply(tx_id, content)?,
        None => social.post(content)?,
    };
    publish(config, ops, &args.publish).await
}

/// Sign `ops` with the identity key and broadcast them, or print them on --dry-run.
async fn publish(config: &Config, ops: Ops, args: &PublishArgs) -> Result<()> {
    let keys = load_keys(config)?;
    let signed = sign(&ops, Some(keys.identity_key()), keys.network());

    if args.dry_run {
        let encoding = if args.hex { Encoding::Hex } else { Encoding::Utf8 };
        for token in signed.render(encoding) {
            println!("{token}");
        }
        return Ok(());
    }

    let wallet = connect(config, TransactionBuilder::new())?;
    let txid = wallet
        .publish(&keys, signed.tokens())
        .await
        .with_context(|| format!("Failed to publish {}", signed.kind()))?;

    println!("Published {}: {txid}", signed.kind());
    Ok(())
}

fn social(config: &Config) -> Result<BSocial> {
    BSocial::new(config.app_name.as_str()).context("SHUA_APP_NAME must not be empty")
}

fn connect(config: &Config, builder: TransactionBuilder) -> Result<Wallet> {
    let source = IndexerClient::new(&config.indexer_url).context("Failed to create indexer client")?;
    let broadcaster =
        BroadcastClient::new(&config.broadcast_url).context("Failed to create broadcast client")?;
    Ok(Wallet::new(Arc::new(source), Arc::new(broadcaster)).with_builder(builder))
}

fn load_keys(config: &Config) -> Result<KeyMaterial> {
    let store = open_store(config, false)?;
    let record = store
        .load()
        .context("Failed to load wallet (check password)")?
        .with_context(|| format!("No wallet at {}", config.wallet_path.display()))?;
    KeyMaterial::from_record(&record).context("Wallet file holds invalid keys")
}

fn open_store(config: &Config, confirm: bool) -> Result<EncryptedFileStore> {
    let password = match &config.wallet_password {
        Some(p) => p.clone(),
        None if confirm => {
            let password = prompt_password("Enter new wallet password")?;
            if password != prompt_password("Confirm password")? {
                bail!("Passwords do not match");
            }
            password
        }
        None => prompt_password("Wallet password")?,
    };
    Ok(EncryptedFileStore::new(config.wallet_path.clone(), password.as_bytes()))
}

fn ensure_absent(config: &Config) -> Result<()> {
    if config.wallet_path.exists() {
        bail!("Wallet file already exists: {}", config.wallet_path.display());
    }
    Ok(())
}

/// Read an image file into a base64 data URL.
fn image_data_url(path: &Path) -> Result<String> {
    let media_type = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => bail!("Unsupported image type: {}", path.display()),
    };
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(format!("data:{media_type};base64,{}", BASE64.encode(bytes)))
}

/// Convert a BSV amount to satoshis.
fn parse_bsv(amount: f64) -> Result<u64> {
    if !amount.is_finite() || amount <= 0.0 {
        bail!("Amount must be positive");
    }
    let sats = (amount * COIN as f64).round();
    if sats < 1.0 || sats > u64::MAX as f64 {
        bail!("Amount out of range");
    }
    Ok(sats as u64)
}

fn format_bsv(sats: u64) -> String {
    format!("{}.{:08}", sats / COIN, sats % COIN)
}

/// Prompt for a password with hidden input.
fn prompt_password(prompt: &str) -> Result<String> {
    rpassword::prompt_password(format!("{prompt}: ")).context("Failed to read password")
}

/// Parse network string to Network enum.
fn parse_network(s: &str) -> Result<Network> {
    s.parse::<Network>().map_err(anyhow::Error::msg)
}

/// Human-readable network name.
fn network_name(network: Network) -> &'static str {
    match network {
        Network::Mainnet => "Mainnet",
        Network::Testnet => "Testnet",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bsv_amounts_convert_to_satoshis() {
        assert_eq!(parse_bsv(1.0).unwrap(), COIN);
        assert_eq!(parse_bsv(0.00000001).unwrap(), 1);
        assert_eq!(parse_bsv(0.0001).unwrap(), 10_000);
        assert!(parse_bsv(0.0).is_err());
        assert!(parse_bsv(-1.0).is_err());
        assert!(parse_bsv(f64::NAN).is_err());
    }

    #[test]
    fn satoshis_format_as_bsv() {
        assert_eq!(format_bsv(0), "0.00000000");
        assert_eq!(format_bsv(150_000_000), "1.50000000");
        assert_eq!(format_bsv(4_998), "0.00004998");
    }

    #[test]
    fn image_type_follows_extension() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("shua-cli-test-{}.png", std::process::id()));
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        let url = image_data_url(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(url, "data:image/png;base64,iVBORw==");

        assert!(image_data_url(Path::new("notes.txt")).is_err());
    }

    #[test]
    fn cli_parses_send_max_without_amount() {
        let cli = Cli::try_parse_from(["shua", "send", "--to", "1abc", "--max"]).unwrap();
        match cli.command {
            Commands::Send(args) => {
                assert!(args.max);
                assert_eq!(args.amount, None);
            }
            _ => panic!("expected send"),
        }
        assert!(Cli::try_parse_from(["shua", "send", "--to", "1abc"]).is_err());
    }
}
