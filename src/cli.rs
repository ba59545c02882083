use anyhow::{Context as _, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use codesign::config::{SigningConfig, SigningContext};
use codesign::integrity::{self, KeyPair, KeyStore, Keyring};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "codesign",
    version,
    about = "Sign a directory tree and verify it later with the public key"
)]
pub struct Cli {
    /// Directory that ledger paths are relative to
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Increase log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Also write rotating log files to the platform data directory
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a new RSA key pair
    GenerateKeys {
        /// Where to store the keys. Defaults to `keys` under the root.
        #[arg(long)]
        keys_dir: Option<PathBuf>,

        /// Overwrite an existing key pair
        #[arg(long)]
        force: bool,
    },
    /// Sign every matching file in a directory
    Sign {
        /// Directory to sign. Defaults to the root.
        #[arg(short, long)]
        directory: Option<PathBuf>,

        /// Only sign files ending in these extensions (e.g. .py .js)
        #[arg(short, long, num_args = 1..)]
        extensions: Vec<String>,

        /// Key directory. A new pair is generated there if none exists.
        #[arg(long)]
        keys_dir: Option<PathBuf>,

        /// Ledger file. Defaults to `signatures.json` under the root.
        #[arg(long)]
        ledger: Option<PathBuf>,
    },
    /// Verify every signed file in a directory
    Verify {
        /// Directory to verify. Defaults to the root.
        #[arg(short, long)]
        directory: Option<PathBuf>,

        /// Public key (PEM) to verify with
        #[arg(short, long)]
        public_key: PathBuf,

        /// Ledger file. Defaults to `signatures.json` under the root.
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run_command(cli: Cli) -> Result<ExitCode> {
    let config = SigningConfig::load(&cli.root)
        .with_context(|| format!("Failed to load configuration from {}", cli.root.display()))?;

    match cli.command {
        Commands::GenerateKeys { keys_dir, force } => {
            handle_generate_keys(&with_overrides(config, keys_dir, None, Vec::new()), force)
        }
        Commands::Sign {
            directory,
            extensions,
            keys_dir,
            ledger,
        } => handle_sign(
            with_overrides(config, keys_dir, ledger, extensions),
            directory,
        ),
        Commands::Verify {
            directory,
            public_key,
            ledger,
            json,
        } => handle_verify(
            with_overrides(config, None, ledger, Vec::new()),
            directory,
            &public_key,
            json,
        ),
    }
}

fn with_overrides(
    mut config: SigningConfig,
    keys_dir: Option<PathBuf>,
    ledger: Option<PathBuf>,
    extensions: Vec<String>,
) -> SigningConfig {
    if let Some(keys_dir) = keys_dir {
        config.keys_dir = keys_dir;
    }
    if let Some(ledger) = ledger {
        config.ledger_file = ledger;
    }
    if !extensions.is_empty() {
        config.extensions = extensions;
    }
    config
}

fn handle_generate_keys(config: &SigningConfig, force: bool) -> Result<ExitCode> {
    let store = config.key_store();
    if store.exists() && !force {
        bail!(
            "A private key already exists at {}; pass --force to replace it",
            store.private_key_path().display()
        );
    }

    let pair = KeyPair::generate().context("Failed to generate key pair")?;
    let (private_path, public_path) = store.save(&pair)?;
    println!("Keys generated and saved in {}", store.dir().display());
    println!("  private: {}", private_path.display());
    println!("  public:  {}", public_path.display());
    Ok(ExitCode::SUCCESS)
}

fn handle_sign(config: SigningConfig, directory: Option<PathBuf>) -> Result<ExitCode> {
    let directory = directory.unwrap_or_else(|| config.root.clone());
    let store = config.key_store();
    let (pair, generated) = store.load_or_generate().with_context(|| {
        format!("Failed to load private key from {}", store.dir().display())
    })?;
    if generated {
        println!("No key pair found; generated one in {}", store.dir().display());
    }

    let ctx = SigningContext::new(config, Keyring::with_key_pair(pair));
    let mut ledger = ctx.config.load_ledger()?;
    let report = integrity::sign_tree(&ctx, &mut ledger, &directory)?;

    for identity in &report.signed {
        println!("Signed {identity}");
    }
    for failure in &report.failures {
        println!("✗ {}: {}", failure.path.display(), failure.reason);
    }
    println!(
        "{} file(s) signed, {} failed. Ledger: {}",
        report.signed.len(),
        report.failures.len(),
        ledger.path().display()
    );

    Ok(exit_code(report.succeeded()))
}

fn handle_verify(
    config: SigningConfig,
    directory: Option<PathBuf>,
    public_key: &Path,
    json: bool,
) -> Result<ExitCode> {
    let directory = directory.unwrap_or_else(|| config.root.clone());
    let public = KeyStore::load_public_key(public_key)?;
    let ledger_path = config.ledger_path();
    if !ledger_path.exists() {
        println!("No signature ledger found at {}", ledger_path.display());
        return Ok(ExitCode::FAILURE);
    }

    let ctx = SigningContext::new(config, Keyring::verify_only(public));
    let ledger = ctx.config.load_ledger()?;
    let report = integrity::verify_tree(&ctx, &ledger, &directory)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for result in &report.results {
            println!("{}", result.format_cli());
        }
        println!(
            "{}/{} file(s) verified",
            report.valid_count(),
            report.results.len()
        );
    }

    Ok(exit_code(report.passed()))
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
