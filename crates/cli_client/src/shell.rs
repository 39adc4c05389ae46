//! Interactive single-keystroke remote

use anyhow::Result;
use sstc_core::{
    AppCatalog, AppLauncher, AppTarget, CoreError, KeyCatalog, MessageCodec, Session,
    SessionState,
};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::raw_mode::{self, KeyInput};

/// How long one key poll blocks before re-checking the connection
const KEY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Keystroke → symbolic key name sent straight to the TV
const DEFAULT_BINDINGS: &[(char, &str)] = &[
    ('w', "UP"),
    ('s', "DOWN"),
    ('a', "LEFT"),
    ('d', "RIGHT"),
    ('e', "ENTER"),
    ('m', "MENU"),
    ('+', "VOLUP"),
    ('-', "VOLDOWN"),
    (' ', "PAUSE"),
    ('p', "POWER"),
    ('0', "0"),
    ('1', "1"),
    ('2', "2"),
    ('3', "3"),
    ('4', "4"),
    ('5', "5"),
    ('6', "6"),
    ('7', "7"),
    ('8', "8"),
    ('9', "9"),
];

const HELP: &str = "\
╔═════════════════════════════════════════════════════════╗
║                    AVAILABLE COMMANDS                   ║
╠═════════════════════════════════════════════════════════╣
║ w / a / s / d   → Directional navigation                ║
║ e               → OK / Enter                            ║
║ m               → Menu                                  ║
║ + / -           → Volume up / down                      ║
║ space           → Play / Pause                          ║
║ p               → Power on / off                        ║
║ 0 to 9          → Number keys                           ║
║ l               → List every supported key              ║
║ x               → Open the app menu                     ║
║ c               → Send a custom command                 ║
║ h or ?          → Show this help                        ║
║ q               → Leave interactive mode                ║
╚═════════════════════════════════════════════════════════╝";

/// What a keystroke asks the shell to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellAction {
    Quit,
    Help,
    ListKeys,
    AppMenu,
    CustomCommand,
    /// Send this device key code
    SendKey(String),
    Unmapped(char),
    Ignore,
}

/// Keystroke bindings resolved against a key catalog
#[derive(Debug, Clone)]
pub struct KeyBindings {
    keys: BTreeMap<char, String>,
}

impl KeyBindings {
    /// Resolve the default bindings; names missing from `catalog` are skipped
    pub fn new(catalog: &KeyCatalog) -> Self {
        let keys = DEFAULT_BINDINGS
            .iter()
            .filter_map(|(c, name)| catalog.resolve(name).map(|code| (*c, code.to_string())))
            .collect();
        Self { keys }
    }

    pub fn action_for(&self, input: KeyInput) -> ShellAction {
        let c = match input {
            KeyInput::Interrupt => return ShellAction::Quit,
            KeyInput::Other => return ShellAction::Ignore,
            KeyInput::Char(c) => c,
        };
        match c {
            'q' => ShellAction::Quit,
            '?' | 'h' => ShellAction::Help,
            'l' => ShellAction::ListKeys,
            'x' => ShellAction::AppMenu,
            'c' => ShellAction::CustomCommand,
            c => match self.keys.get(&c) {
                Some(code) => ShellAction::SendKey(code.clone()),
                None => ShellAction::Unmapped(c),
            },
        }
    }
}

/// Parse the hold duration typed in the custom command menu (seconds)
pub fn parse_hold(raw: &str) -> std::result::Result<Duration, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Duration::ZERO);
    }
    let secs: f64 = raw
        .parse()
        .map_err(|_| format!("invalid hold duration: {}", raw))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("invalid hold duration: {}", raw))
}

/// Interactive shell bound to one session
pub struct Shell {
    session: Arc<Session>,
    launcher: AppLauncher,
    keys: Arc<KeyCatalog>,
    apps: Arc<AppCatalog>,
    bindings: KeyBindings,
}

impl Shell {
    pub fn new(
        session: Arc<Session>,
        launcher: AppLauncher,
        keys: Arc<KeyCatalog>,
        apps: Arc<AppCatalog>,
    ) -> Self {
        let bindings = KeyBindings::new(&keys);
        Self {
            session,
            launcher,
            keys,
            apps,
            bindings,
        }
    }

    /// Run the key loop until the user quits or the TV goes away
    pub async fn run(&self) -> Result<()> {
        raw_mode::say("\n[-] Interactive mode active. Press '?' or 'h' for help, 'q' to quit.");
        raw_mode::say(HELP);

        // Fallback: line input in non-TTY environments
        let guard = match raw_mode::RawModeGuard::enable() {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Warning: Raw mode not available: {}. Keys need Enter.", e);
                None
            }
        };
        let raw = guard.is_some();

        loop {
            if self.session.state() == SessionState::Closed {
                raw_mode::say("[!] Connection to the TV was lost");
                break;
            }

            let input = tokio::task::spawn_blocking(move || {
                if raw {
                    raw_mode::poll_key(KEY_POLL_INTERVAL)
                } else {
                    raw_mode::read_key_line()
                }
            })
            .await??;
            let Some(input) = input else {
                continue;
            };

            match self.bindings.action_for(input) {
                ShellAction::Quit => break,
                ShellAction::Help => raw_mode::say(HELP),
                ShellAction::ListKeys => self.list_keys(),
                ShellAction::AppMenu => self.app_menu().await?,
                ShellAction::CustomCommand => self.custom_command_menu().await?,
                ShellAction::SendKey(code) => {
                    if let Err(e) = self.session.send_key(&code, Duration::ZERO).await {
                        report(&e);
                    }
                }
                ShellAction::Unmapped(c) => {
                    raw_mode::say(&format!("[!] Unmapped key: {:?}", c));
                }
                ShellAction::Ignore => {}
            }
        }
        Ok(())
    }

    fn list_keys(&self) {
        let mut out = String::from("\n[+] Supported keys:\n");
        for (name, code) in self.keys.iter() {
            out.push_str(&format!("  {:<10} → {}\n", name, code));
        }
        raw_mode::say(&out);
    }

    async fn app_menu(&self) -> Result<()> {
        let mut out = String::from("\n[-] Available apps:\n");
        for (name, id) in self.apps.iter() {
            out.push_str(&format!("  {:<12} → {}\n", name, id));
        }
        raw_mode::say(&out);

        let input = prompt("\n> App name or ID: ").await?;
        match self.launcher.launch_named(&self.apps, &input).await {
            Ok((target, true)) => raw_mode::say(&format!("[+] Launched {}", describe(&target))),
            Ok((target, false)) => {
                raw_mode::say(&format!("[!] Launch failed: {}", describe(&target)))
            }
            Err(CoreError::UnknownApp(_)) => raw_mode::say("[-] Unrecognized app"),
            Err(e) => report(&e),
        }
        Ok(())
    }

    async fn custom_command_menu(&self) -> Result<()> {
        raw_mode::say("\n[+] Custom command mode:\n1. Send key   2. Send raw method");
        let choice = prompt("> Choice (1/2): ").await?;

        match choice.as_str() {
            "1" => {
                let key = prompt("Key: ").await?.to_uppercase();
                let hold = prompt("Hold for (seconds): ").await?;
                let hold = match parse_hold(&hold) {
                    Ok(hold) => hold,
                    Err(e) => {
                        raw_mode::say(&format!("[-] {}", e));
                        return Ok(());
                    }
                };
                if let Err(e) = self.session.send_key(&key, hold).await {
                    report(&e);
                }
            }
            "2" => {
                let method = prompt("Method: ").await?;
                let raw = prompt("Params (JSON): ").await?;
                let params = match MessageCodec::parse_params(&raw) {
                    Ok(params) => params,
                    Err(e) => {
                        report(&e);
                        return Ok(());
                    }
                };
                if method.is_empty() {
                    raw_mode::say("[-] Method is required");
                    return Ok(());
                }
                if let Err(e) = self.session.send_command(&method, params).await {
                    report(&e);
                }
            }
            other => raw_mode::say(&format!("[-] Unknown choice: {:?}", other)),
        }
        Ok(())
    }
}

/// Status line for a failed command: `[-]` for bad input, `[!]` for the TV side
fn failure_line(e: &CoreError) -> String {
    let marker = if e.is_input_error() { "[-]" } else { "[!]" };
    format!("{} {}", marker, e)
}

fn report(e: &CoreError) {
    raw_mode::say(&failure_line(e));
}

fn describe(target: &AppTarget) -> String {
    match target {
        AppTarget::Known { name, id } => format!("{} ({})", name, id),
        AppTarget::Direct { id } => id.clone(),
    }
}

/// Read one trimmed line in cooked mode
pub async fn prompt(label: &str) -> Result<String> {
    let label = label.to_string();
    let line = tokio::task::spawn_blocking(move || {
        raw_mode::cooked(|| -> std::io::Result<String> {
            let mut stdout = std::io::stdout();
            stdout.write_all(label.as_bytes())?;
            stdout.flush()?;
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok(line.trim().to_string())
        })
    })
    .await??;
    Ok(line)
}
