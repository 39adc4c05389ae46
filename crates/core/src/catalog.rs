//! Key and app lookup tables
//!
//! Both catalogs are plain values: build them once at startup and hand an
//! `Arc` to whoever needs them (session, shell).

use crate::error::{CoreError, Result};
use std::collections::BTreeMap;

/// Starter set of apps: (name, TV application id)
const DEFAULT_APPS: &[(&str, &str)] = &[
    ("netflix", "3201907018807"),
    ("youtube", "111299001912"),
    ("disney", "3201901017640"),
    ("globoplay", "3201807016597"),
    ("spotify", "3201606009684"),
    ("appletv", "3201910019365"),
    ("browser", "org.tizen.browser"),
    ("stremio", "3202306031311"),
];

/// Symbolic names that are not simply `KEY_<NAME>`
const KEY_ALIASES: &[(&str, &str)] = &[("EXIT", "KEY_RETURN")];

/// Names mapped one-to-one onto `KEY_<NAME>`
const KEY_NAMES: &[&str] = &[
    "UP", "DOWN", "LEFT", "RIGHT", "ENTER", "RETURN", "MENU", "HOME", "GUIDE", "INFO", "TOOLS",
    "SOURCE", "PLAY", "PAUSE", "STOP", "FF", "REWIND", "REC", "VOLUP", "VOLDOWN", "MUTE", "POWER",
    "POWEROFF", "POWERON", "HDMI1", "HDMI2", "HDMI3", "HDMI4", "CHUP", "CHDOWN", "CH_LIST",
    "APP_LIST",
];

/// Minimum length (exclusive) for an unknown app name to be tried as a raw id
const MIN_DIRECT_APP_ID_LEN: usize = 5;

/// True if `code` is shaped like a TV key code (`KEY_` + `[A-Z0-9_]+`)
pub fn is_valid_key_code(code: &str) -> bool {
    match code.strip_prefix("KEY_") {
        Some(rest) => {
            !rest.is_empty()
                && rest
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        }
        None => false,
    }
}

/// Symbolic key name → device key code
#[derive(Debug, Clone)]
pub struct KeyCatalog {
    keys: BTreeMap<String, String>,
}

impl KeyCatalog {
    /// Build a catalog from (name, code) pairs
    ///
    /// # Errors
    /// - `InvalidKey` if any code is not a valid device key code
    pub fn from_pairs<I, N, C>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: Into<String>,
    {
        let mut keys = BTreeMap::new();
        for (name, code) in pairs {
            let code = code.into();
            if !is_valid_key_code(&code) {
                return Err(CoreError::InvalidKey(code));
            }
            keys.insert(name.into().to_ascii_uppercase(), code);
        }
        Ok(Self { keys })
    }

    /// Resolve a symbolic name or an already-known device code
    ///
    /// Names are matched case-insensitively and take precedence over codes.
    pub fn resolve(&self, key: &str) -> Option<&str> {
        let key = key.trim();
        if let Some(code) = self.keys.get(&key.to_ascii_uppercase()) {
            return Some(code.as_str());
        }
        self.keys
            .values()
            .find(|code| code.as_str() == key)
            .map(String::as_str)
    }

    /// Like [`resolve`](Self::resolve), but reports unknown keys as errors
    pub fn require(&self, key: &str) -> Result<&str> {
        self.resolve(key)
            .ok_or_else(|| CoreError::InvalidKey(key.to_string()))
    }

    /// All (name, code) pairs, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.keys.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for KeyCatalog {
    fn default() -> Self {
        let digits = (0..10).map(|i| (i.to_string(), format!("KEY_{}", i)));
        let named = KEY_NAMES
            .iter()
            .map(|name| (name.to_string(), format!("KEY_{}", name)));
        let aliases = KEY_ALIASES
            .iter()
            .map(|(name, code)| (name.to_string(), code.to_string()));

        let keys = digits
            .chain(named)
            .chain(aliases)
            .collect::<BTreeMap<String, String>>();
        Self { keys }
    }
}

/// How an app launch request resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppTarget {
    /// Name found in the catalog
    Known { name: String, id: String },
    /// Not in the catalog, sent to the TV as a raw application id
    Direct { id: String },
}

impl AppTarget {
    /// Application id to launch
    pub fn id(&self) -> &str {
        match self {
            AppTarget::Known { id, .. } | AppTarget::Direct { id } => id,
        }
    }
}

/// App name → TV application id
#[derive(Debug, Clone)]
pub struct AppCatalog {
    apps: BTreeMap<String, String>,
}

impl AppCatalog {
    /// Build a catalog from (name, id) pairs; names are stored lower-case
    pub fn from_pairs<I, N, A>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, A)>,
        N: Into<String>,
        A: Into<String>,
    {
        let apps = pairs
            .into_iter()
            .map(|(name, id)| (name.into().to_lowercase(), id.into()))
            .collect();
        Self { apps }
    }

    /// Look up an app id by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.apps.get(&name.trim().to_lowercase()).map(String::as_str)
    }

    /// Resolve operator input to something launchable
    ///
    /// Catalog names win. Anything else longer than five characters is
    /// passed through as a raw id, since the TV is the authority on ids.
    pub fn resolve(&self, input: &str) -> Result<AppTarget> {
        let name = input.trim().to_lowercase();
        if let Some(id) = self.apps.get(&name) {
            return Ok(AppTarget::Known {
                name,
                id: id.clone(),
            });
        }
        if name.chars().count() > MIN_DIRECT_APP_ID_LEN {
            return Ok(AppTarget::Direct { id: name });
        }
        Err(CoreError::UnknownApp(input.trim().to_string()))
    }

    /// All (name, id) pairs, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.apps.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

impl Default for AppCatalog {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_APPS.iter().copied())
    }
}
