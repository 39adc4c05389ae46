//! sstc: Samsung Smart TV remote for the terminal
//!
//! Pairs with the TV over its secure control channel, then turns single
//! keystrokes into remote-control key presses.

mod raw_mode;
mod shell;

use anyhow::{bail, Context, Result};
use clap::Parser;
use sstc_core::{
    AppCatalog, AppLauncher, DeviceIdentity, FileTokenStore, KeyCatalog, LauncherConfig,
    MemoryTokenStore, Session, SessionConfig, SessionState, TokenStore, DEFAULT_DISPLAY_NAME,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::shell::Shell;

/// Remote control for Samsung Smart TVs
#[derive(Parser, Debug)]
#[command(name = "sstc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Control a Samsung Smart TV from the terminal", long_about = None)]
struct Args {
    /// TV IP address (prompted for when omitted)
    #[arg(short = 'H', long, env = "SSTC_HOST")]
    host: Option<String>,

    /// Name shown on the TV's pairing prompt
    #[arg(long, default_value = DEFAULT_DISPLAY_NAME)]
    name: String,

    /// Directory holding pairing tokens
    #[arg(long, env = "SSTC_TOKEN_DIR")]
    token_dir: Option<PathBuf>,

    /// Keep the pairing token in memory only
    #[arg(long, default_value = "false")]
    no_persist: bool,

    /// Seconds to wait for the TV to accept the connection
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Plain ws:// instead of wss:// (local test servers only)
    #[arg(long, default_value = "false", hide = true)]
    insecure_plain: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = setup_logging(&args.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[-] {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    print_banner();

    let ip = match args.host.clone() {
        Some(host) => host,
        None => read_line("TV IP > ")?,
    };
    if ip.trim().is_empty() {
        bail!("No TV address given");
    }

    let device = DeviceIdentity::new(ip, args.name.clone());
    let keys = Arc::new(KeyCatalog::default());
    let apps = Arc::new(AppCatalog::default());
    let launcher = AppLauncher::new(&device, LauncherConfig::default())?;

    if let Some(info) = launcher.system_info().await {
        let d = &info.device;
        println!("\n[+] TV information:");
        println!("  Model:      {}", d.model_name.as_deref().unwrap_or("?"));
        println!("  Name:       {}", d.name.as_deref().or(info.name.as_deref()).unwrap_or("?"));
        println!("  OS:         {}", d.os.as_deref().unwrap_or("?"));
        println!("  Resolution: {}", d.resolution.as_deref().unwrap_or("?"));
    }

    let config = SessionConfig {
        connect_timeout: Duration::from_secs(args.timeout_secs),
        secure: !args.insecure_plain,
        ..SessionConfig::default()
    };
    let session = Arc::new(Session::new(
        device.clone(),
        config,
        keys.clone(),
        token_store(&args),
    ));

    println!("\n[-] Connecting to {}...", device.ip);
    if session.token().await.is_provisional() {
        watch_for_approval(&session);
    }

    session
        .connect()
        .await
        .with_context(|| format!("Could not connect to {}", device.ip))?;

    println!(
        "[+] Connected to {} at {}",
        device.ip,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let shell = Shell::new(session.clone(), launcher, keys, apps);
    let result = shell.run().await;

    session.close().await;
    result?;
    println!("[+] Session ended.");
    Ok(())
}

/// Pick where pairing tokens live
fn token_store(args: &Args) -> Arc<dyn TokenStore> {
    if args.no_persist {
        return Arc::new(MemoryTokenStore::new());
    }
    if let Some(dir) = &args.token_dir {
        return Arc::new(FileTokenStore::in_dir(dir));
    }
    match FileTokenStore::new() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("{}; pairing token will not be saved", e);
            Arc::new(MemoryTokenStore::new())
        }
    }
}

/// Tell the user to look at the TV once it shows the pairing prompt
fn watch_for_approval(session: &Session) {
    let mut rx = session.subscribe();
    tokio::spawn(async move {
        if rx
            .wait_for(|s| {
                matches!(
                    s,
                    SessionState::AwaitingApproval | SessionState::Ready | SessionState::Closed
                )
            })
            .await
            .map(|s| *s == SessionState::AwaitingApproval)
            .unwrap_or(false)
        {
            println!("[-] Waiting for the TV to accept this device. Check the TV screen.");
        }
    });
}

fn print_banner() {
    println!("╔══════════════════════════════════════╗");
    println!("║        Samsung Smart TV Control      ║");
    println!("╚══════════════════════════════════════╝");
}

fn read_line(label: &str) -> Result<String> {
    let mut stdout = std::io::stdout();
    stdout.write_all(label.as_bytes())?;
    stdout.flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn setup_logging(level: &str) -> Result<()> {
    let log_level = level.parse::<Level>().unwrap_or(Level::WARN);

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["sstc"]);
        assert!(args.host.is_none() || std::env::var("SSTC_HOST").is_ok());
        assert_eq!(args.name, DEFAULT_DISPLAY_NAME);
        assert_eq!(args.timeout_secs, 10);
        assert_eq!(args.log_level, "warn");
        assert!(!args.no_persist);
        assert!(!args.insecure_plain);
    }

    #[test]
    fn test_args_host_and_flags() {
        let args = Args::parse_from([
            "sstc",
            "-H",
            "192.168.1.20",
            "--no-persist",
            "--timeout-secs",
            "30",
        ]);
        assert_eq!(args.host.as_deref(), Some("192.168.1.20"));
        assert!(args.no_persist);
        assert_eq!(args.timeout_secs, 30);
    }

    #[test]
    fn test_token_store_selection() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args::parse_from([
            "sstc",
            "--token-dir",
            dir.path().to_str().unwrap(),
        ]);
        let store = token_store(&args);
        let token = sstc_core::PairingToken::new("123").unwrap();
        store.save("10.0.0.1", &token).unwrap();
        assert!(dir.path().join(".tv_token_10_0_0_1").exists());
    }
}
