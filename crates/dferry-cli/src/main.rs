//! dferry: dropferry terminal client
//!
//! Commands:
//!   send <file>         - upload a file, print its share link + access token
//!   recv <id-or-link>   - download a file by id or pasted share link
//!   delete <token>      - delete an uploaded file using its access token
//!   encryption [on|off] - show or change the persisted encryption setting
//!   config show         - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use dferry_client::{
    download_file, plan_chunk_size, upload_file, ApiClient, DownloadOutcome, DownloadRequest,
    ProgressFn, RemoteStore, UploadOutcome, UploadRequest,
};
use dferry_core::config::FerryConfig;
use dferry_core::{FerryError, MAX_FILE_SIZE};

// ── CLI structure ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "dferry",
    version,
    about = "dropferry transfer client",
    long_about = "dferry: move files to and from a drop service in size-tiered chunks, \
                  optionally protected with password-derived encryption"
)]
struct Cli {
    /// Path to dferry.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "DFERRY_CONFIG",
        default_value = "~/.config/dferry/config.toml"
    )]
    config: PathBuf,

    /// Remote service base URL (overrides config)
    #[arg(long, env = "DFERRY_REMOTE")]
    remote: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DFERRY_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a local file and print its share link + access token
    Send {
        /// File to upload
        file: PathBuf,
        /// Encrypt without asking (requires the encryption setting to be on)
        #[arg(long)]
        encrypt: bool,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Download a file by id or pasted share link
    Recv {
        /// File id, or a full share link to extract it from
        target: String,
        /// Destination path (default: the stored file name)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Delete an uploaded file using its access token
    Delete {
        /// Access token printed by `send`
        token: String,
    },

    /// Show or change the persisted encryption setting
    Encryption {
        /// New state; omit to print the current one
        state: Option<Toggle>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Clone, Debug, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let config_path = expand_tilde(&cli.config);
    let mut config = load_config(&config_path)?;
    if let Some(remote) = &cli.remote {
        config.remote.base_url = remote.trim_end_matches('/').to_string();
    }
    tracing::debug!(
        config = %config_path.display(),
        remote = %config.remote.base_url,
        "dferry starting"
    );

    match cli.command {
        Commands::Send { file, encrypt, yes } => cmd_send(&config, &file, encrypt, yes).await,
        Commands::Recv { target, output } => cmd_recv(&config, &target, output.as_deref()).await,
        Commands::Delete { token } => cmd_delete(&config, &token).await,
        Commands::Encryption { state } => cmd_encryption(&mut config, &config_path, state),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

// ── Config loading / saving ───────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<FerryConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config: {}", path.display()))
    } else {
        Ok(FerryConfig::default())
    }
}

fn save_config(config: &FerryConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating config dir: {}", parent.display()))?;
    }
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    std::fs::write(path, rendered).with_context(|| format!("writing config: {}", path.display()))
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if s.starts_with("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(format!("{}/{}", home, &s[2..]))
    } else {
        path.to_path_buf()
    }
}

// ── Progress bar ──────────────────────────────────────────────────────────────

fn make_transfer_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template("[{bar:44}] {percent:>3}%")
            .unwrap()
            .progress_chars("## "),
    );
    pb
}

fn bar_progress(pb: &ProgressBar) -> ProgressFn {
    let pb = pb.clone();
    Box::new(move |ev| {
        pb.set_length(ev.total_size);
        pb.set_position(ev.bytes_moved);
    })
}

// ── Prompts / signals ─────────────────────────────────────────────────────────

fn confirm(prompt: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "(Y/n)" } else { "(y/N)" };
    print!("{prompt} {hint}? ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(match line.trim().to_ascii_lowercase().as_str() {
        "" => default_yes,
        "y" | "yes" => true,
        _ => false,
    })
}

/// Token that trips on Ctrl-C; the engines observe it at their next
/// suspension point.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let child = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            child.cancel();
        }
    });
    cancel
}

/// Render a terminal transfer error the way the original terminal did and
/// exit non-zero.
fn fail(err: FerryError) -> ! {
    let message = match &err {
        FerryError::NotFound(_) => "Invalid File ID.".to_string(),
        FerryError::Authorization(_) => "Invalid access token.".to_string(),
        FerryError::Authentication(_) => "Invalid decryption password was entered.".to_string(),
        FerryError::Validation(msg) => msg.clone(),
        FerryError::Transport(msg) => format!("Transfer error: {msg}"),
        other => other.to_string(),
    };
    eprintln!("{message}");
    std::process::exit(1);
}

// ── `dferry send` ─────────────────────────────────────────────────────────────

async fn cmd_send(config: &FerryConfig, file: &Path, encrypt: bool, yes: bool) -> Result<()> {
    let meta =
        std::fs::metadata(file).with_context(|| format!("reading {}", file.display()))?;
    if !meta.is_file() {
        anyhow::bail!("not a regular file: {}", file.display());
    }
    let total_size = meta.len();
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("file name is not valid UTF-8")?
        .to_string();

    println!("{filename}, {}", fmt_bytes(total_size));
    if total_size > MAX_FILE_SIZE {
        eprintln!("File is too large, max size is 5 GiB.");
        std::process::exit(1);
    }

    if !yes && !confirm("Confirm upload", true)? {
        println!("Upload canceled.");
        return Ok(());
    }

    let want_encryption = if encrypt {
        if !config.crypto.enabled {
            anyhow::bail!("encryption is disabled; enable it with: dferry encryption on");
        }
        true
    } else {
        config.crypto.enabled && confirm("Encrypt this file", false)?
    };
    let password = if want_encryption {
        Some(SecretString::from(rpassword::prompt_password(
            "Encryption password: ",
        )?))
    } else {
        None
    };

    let store = ApiClient::new(&config.remote.base_url)?;
    let mut source = tokio::fs::File::open(file)
        .await
        .with_context(|| format!("opening {}", file.display()))?;

    let cancel = cancel_on_ctrl_c();
    let pb = make_transfer_bar(total_size);
    let progress = bar_progress(&pb);

    let request = UploadRequest {
        filename,
        total_size,
        password,
        kdf_iterations: config.crypto.kdf_iterations,
    };
    let outcome = upload_file(&store, &mut source, request, Some(&progress), &cancel).await;
    pb.finish_and_clear();

    match outcome {
        Ok(UploadOutcome::Completed(receipt)) => {
            println!();
            println!("File link:    {}/d/{}", config.remote.base_url, receipt.file);
            println!("Access token: {}", receipt.token);
            Ok(())
        }
        Ok(UploadOutcome::Canceled) => {
            println!("Upload canceled.");
            Ok(())
        }
        Err(err) => fail(err),
    }
}

// ── `dferry recv` ─────────────────────────────────────────────────────────────

async fn cmd_recv(config: &FerryConfig, target: &str, output: Option<&Path>) -> Result<()> {
    let file_id = parse_file_id(target);
    let store = ApiClient::new(&config.remote.base_url)?;

    let meta = match store.find(&file_id).await {
        Ok(meta) => meta,
        Err(err) => fail(err),
    };

    let chunk_size = plan_chunk_size(meta.size);
    println!(
        "{}{}, {}, {} chunks",
        meta.file,
        if meta.is_encrypted() { ", encrypted" } else { "" },
        fmt_bytes(meta.size),
        fmt_bytes(chunk_size),
    );

    let header = match meta.header() {
        Ok(header) => header,
        Err(err) => fail(err),
    };
    let password = if header.is_some() {
        Some(SecretString::from(rpassword::prompt_password("Password: ")?))
    } else {
        None
    };

    let out_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&meta.file));
    let mut sink = tokio::fs::File::create(&out_path)
        .await
        .with_context(|| format!("creating {}", out_path.display()))?;

    let cancel = cancel_on_ctrl_c();
    let pb = make_transfer_bar(meta.size);
    let progress = bar_progress(&pb);

    let request = DownloadRequest {
        file_id,
        filename: meta.file.clone(),
        total_size: meta.size,
        header,
        password,
        kdf_iterations: config.crypto.kdf_iterations,
    };
    let outcome = download_file(&store, &mut sink, request, Some(&progress), &cancel).await;
    pb.finish_and_clear();

    match outcome {
        Ok(DownloadOutcome::Completed { bytes_written }) => {
            println!("Saved {} ({}).", out_path.display(), fmt_bytes(bytes_written));
            Ok(())
        }
        Ok(DownloadOutcome::Canceled) => {
            println!("Download canceled.");
            Ok(())
        }
        Err(err) => fail(err),
    }
}

/// Accept either a bare file id or a full share link
/// (`https://host/d/<id>/<name>`); the id is the fifth `/`-separated field.
fn parse_file_id(target: &str) -> String {
    if target.contains("http") {
        target.split('/').nth(4).unwrap_or(target).to_string()
    } else {
        target.to_string()
    }
}

// ── `dferry delete` ───────────────────────────────────────────────────────────

async fn cmd_delete(config: &FerryConfig, token: &str) -> Result<()> {
    let store = ApiClient::new(&config.remote.base_url)?;
    match store.delete(token).await {
        Ok(receipt) => {
            println!("File with ID {} was deleted.", receipt.id);
            Ok(())
        }
        Err(err) => fail(err),
    }
}

// ── `dferry encryption` ───────────────────────────────────────────────────────

fn cmd_encryption(config: &mut FerryConfig, path: &Path, state: Option<Toggle>) -> Result<()> {
    let Some(state) = state else {
        println!(
            "Encryption is {}.",
            if config.crypto.enabled { "ON" } else { "OFF" }
        );
        return Ok(());
    };

    let enable = matches!(state, Toggle::On);
    if enable == config.crypto.enabled {
        println!("Encryption setting unchanged.");
        return Ok(());
    }

    config.crypto.enabled = enable;
    save_config(config, path)?;
    println!(
        "Encryption setting updated to {}.",
        if enable { "ON" } else { "OFF" }
    );
    Ok(())
}

// ── `dferry config show` ──────────────────────────────────────────────────────

fn cmd_config_show(config: &FerryConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!(
            "# Configuration: defaults (no file at {})",
            config_path.display()
        );
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

// ── Utilities ─────────────────────────────────────────────────────────────────

fn fmt_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    loop {
        value /= 1024.0;
        if value < 1024.0 || unit == UNITS.len() - 1 {
            break;
        }
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_id_from_link() {
        assert_eq!(
            parse_file_id("https://drop.example.com/d/aB3xY9kQz1/report.pdf"),
            "aB3xY9kQz1"
        );
        assert_eq!(
            parse_file_id("http://localhost:8000/d/aB3xY9kQz1/x.bin"),
            "aB3xY9kQz1"
        );
    }

    #[test]
    fn test_parse_file_id_passthrough() {
        assert_eq!(parse_file_id("aB3xY9kQz1"), "aB3xY9kQz1");
    }

    #[test]
    fn test_fmt_bytes() {
        assert_eq!(fmt_bytes(0), "0 B");
        assert_eq!(fmt_bytes(1023), "1023 B");
        assert_eq!(fmt_bytes(1024), "1.0 KiB");
        assert_eq!(fmt_bytes(5 * 1024 * 1024), "5.0 MiB");
        assert_eq!(fmt_bytes(5_368_709_120), "5.0 GiB");
    }

    #[test]
    fn test_config_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = FerryConfig::default();
        config.crypto.enabled = true;
        save_config(&config, &path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert!(loaded.crypto.enabled);
        assert_eq!(loaded.remote.base_url, config.remote.base_url);
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let loaded = load_config(Path::new("/nonexistent/dferry.toml")).unwrap();
        assert!(!loaded.crypto.enabled);
    }
}
