use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
mod auth;
use deadbolt::{Deadbolt, KdfProfile, Operation, paths};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, clap::Args)]
struct TargetArgs {
    /// File or folder to process
    #[arg(value_name = "FILE")]
    path: Option<PathBuf>,

    /// Alternative to the positional FILE argument
    #[arg(short, long = "file", value_name = "PATH", conflicts_with = "path")]
    file: Option<PathBuf>,

    /// Password (will prompt if not provided; may end up in shell history)
    #[arg(short, long, env = "DEADBOLT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Move the result to this path after success
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

impl TargetArgs {
    fn input(&self) -> Result<PathBuf> {
        let Some(path) = self.path.as_ref().or(self.file.as_ref()) else {
            bail!("file path is required");
        };

        let absolute = std::path::absolute(path)?;
        if !absolute.exists() {
            bail!("File not found: {}", absolute.display());
        }
        Ok(absolute)
    }

    fn output(&self) -> Result<Option<PathBuf>> {
        let Some(output) = &self.output else {
            return Ok(None);
        };

        let absolute = std::path::absolute(output)?;
        let dir = absolute.parent().unwrap_or(Path::new("/"));
        if !dir.is_dir() {
            bail!("Output directory does not exist: {}", dir.display());
        }
        if absolute.symlink_metadata().is_ok() {
            bail!("Output file already exists: {}", absolute.display());
        }
        Ok(Some(absolute))
    }
}

#[derive(Debug, Parser)]
#[command(name = "deadbolt")]
#[command(
    version,
    about = "Encrypt and decrypt files and folders with a password (AES-256-GCM, Argon2id)."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use cheap Argon2id parameters (testing only)
    #[arg(
        long,
        global = true,
        hide = true,
        env = "DEADBOLT_ARGON2_TEST_PARAMS",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    fast_kdf: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts a file or folder (folders are zipped first)
    #[command(arg_required_else_help = true)]
    Encrypt {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Decrypts a .deadbolt or .dbolt file
    #[command(arg_required_else_help = true)]
    Decrypt {
        #[command(flatten)]
        target: TargetArgs,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let args = Cli::parse();
    init_logging(args.verbose);

    let profile = if args.fast_kdf {
        KdfProfile::Fast
    } else {
        KdfProfile::Standard
    };
    let engine = Deadbolt::with_kdf_profile(profile);

    let (operation, result) = match args.command {
        Commands::Encrypt { target } => (Operation::Encryption, encrypt(engine, &target)),
        Commands::Decrypt { target } => (Operation::Decryption, decrypt(engine, &target)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let label = match operation {
                Operation::Decryption => "Decryption",
                _ => "Encryption",
            };
            eprintln!("\n{label} failed:");
            eprintln!("{}", render_error(&e));
            ExitCode::FAILURE
        }
    }
}

/// Library errors carry the user-facing message on their own; their sources
/// hold low-level crypto detail and stay in the debug log.
fn render_error(e: &anyhow::Error) -> String {
    match e.downcast_ref::<deadbolt::Error>() {
        Some(err) => {
            tracing::debug!(error = ?err, "operation failed");
            err.to_string()
        }
        None => format!("{e:#}"),
    }
}

fn encrypt(engine: Deadbolt, target: &TargetArgs) -> Result<()> {
    let input = target.input()?;
    let output = target.output()?;

    let Some(password) = auth::read_password(target.password.clone(), true)? else {
        eprintln!("\nOperation cancelled.");
        return Ok(());
    };

    eprintln!("Encrypting...");
    let encrypted = engine.encrypt_file(&input, &password)?;
    let final_path = move_to_output(encrypted, output);

    println!(
        "Successfully encrypted file: {}",
        paths::pretty_path(&final_path)
    );
    Ok(())
}

fn decrypt(engine: Deadbolt, target: &TargetArgs) -> Result<()> {
    let input = target.input()?;
    if !paths::is_encrypted_file_path(&input) {
        bail!(
            "File is not an encrypted file\nExpected file extension: .{} or .{}\nReceived: {}",
            paths::ENCRYPTED_FILE_EXTENSION,
            paths::LEGACY_ENCRYPTED_FILE_EXTENSION,
            input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        );
    }
    let output = target.output()?;

    let Some(password) = auth::read_password(target.password.clone(), false)? else {
        eprintln!("\nOperation cancelled.");
        return Ok(());
    };

    eprintln!("Decrypting...");
    let decrypted = engine.decrypt_file(&input, &password)?;

    if decrypted.is_legacy() {
        eprintln!("\nLegacy V{} Format Detected", decrypted.version());
        eprintln!("For better security, consider re-encrypting this file.");
        eprintln!(
            "V001 uses PBKDF2 (10K iterations). V002 uses Argon2id with 2 GiB memory, 1 iteration, and 4-lane parallelism, making password cracking significantly more expensive.\n"
        );
    }

    let final_path = move_to_output(decrypted.into_path(), output);
    println!(
        "Successfully decrypted file: {}",
        paths::pretty_path(&final_path)
    );
    Ok(())
}

/// Moves `produced` to the requested output path. On failure the file stays
/// where it was written.
fn move_to_output(produced: PathBuf, output: Option<PathBuf>) -> PathBuf {
    let Some(output) = output else {
        return produced;
    };

    match deadbolt::rename_noclobber(&produced, &output) {
        Ok(()) => output,
        Err(e) => {
            eprintln!("Warning: Failed to move file to output path: {e}");
            eprintln!("File is available at: {}", paths::pretty_path(&produced));
            produced
        }
    }
}
