//! Runtime configuration from the environment, plus the `.env` loader used by
//! the binary. Defaults target a backend on localhost.

use crate::utils::parse_flag;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_ACTOR: &str = "user";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub backend_url: String,
    pub http_timeout: Duration,
    /// Name written into audit entries.
    pub actor: String,
    /// Snapshot JSON to validate and upload.
    pub push_file: Option<PathBuf>,
    pub push_enabled: bool,
    /// Log a validation report after pulling the mapping.
    pub report_enabled: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend_url = non_empty("MAPPING_BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let timeout_secs = match non_empty("MAPPING_HTTP_TIMEOUT_SECS") {
            Some(s) => s
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| format!("MAPPING_HTTP_TIMEOUT_SECS must be a positive integer, got {:?}", s))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let actor = non_empty("MAPPING_ACTOR").unwrap_or_else(|| DEFAULT_ACTOR.to_string());
        let push_file = non_empty("MAPPING_PUSH_FILE").map(|s| PathBuf::from(s.trim()));
        let push_enabled = lookup("MAPPING_PUSH_ENABLED").map(|s| parse_flag(&s)).unwrap_or(false);
        let report_enabled = lookup("MAPPING_REPORT_ENABLED").map(|s| parse_flag(&s)).unwrap_or(true);

        if push_enabled && push_file.is_none() {
            return Err("MAPPING_PUSH_ENABLED is set but MAPPING_PUSH_FILE is missing".to_string());
        }

        Ok(Config {
            backend_url,
            http_timeout: Duration::from_secs(timeout_secs),
            actor,
            push_file,
            push_enabled,
            report_enabled,
        })
    }
}

/// Load `KEY=VALUE` lines from `path` into the process environment. Variables
/// that are already set keep their value.
pub fn load_env_file(path: &Path) -> Result<(), String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    for (index, line) in text.lines().enumerate() {
        let parsed = parse_env_line(line).map_err(|e| format!("{}:{}: {}", path.display(), index + 1, e))?;
        if let Some((key, value)) = parsed {
            if std::env::var_os(&key).is_none() {
                // Mutating the environment is unsafe once other threads may read it;
                // this runs before logging or any client is started.
                unsafe {
                    std::env::set_var(key, value);
                }
            }
        }
    }
    Ok(())
}

/// One `.env` line: blank and `#` lines are skipped, `export ` is allowed,
/// values may be single or double quoted, and unquoted values end at ` #`.
pub fn parse_env_line(line: &str) -> Result<Option<(String, String)>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);
    let (key, raw) = line.split_once('=').ok_or("missing '=' in assignment")?;
    let key = key.trim();
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return Err(format!("invalid variable name {:?}", key));
    }

    let raw = raw.trim();
    let value = match raw.chars().next() {
        Some('"') => parse_double_quoted(&raw[1..])?,
        Some('\'') => {
            let rest = &raw[1..];
            let end = rest.find('\'').ok_or("unterminated ' quote")?;
            let tail = rest[end + 1..].trim();
            if !(tail.is_empty() || tail.starts_with('#')) {
                return Err("unexpected characters after closing quote".to_string());
            }
            rest[..end].to_string()
        }
        _ => match raw.find(" #") {
            Some(i) => raw[..i].trim_end().to_string(),
            None => raw.to_string(),
        },
    };
    Ok(Some((key.to_string(), value)))
}

/// Body of a double-quoted value, after the opening quote. Backslash escapes
/// `\n`, `\r`, `\t`, `\\` and `\"`; any other escaped char is kept as is.
fn parse_double_quoted(input: &str) -> Result<String, String> {
    let mut value = String::new();
    let mut chars = input.chars();
    let mut escape = false;

    while let Some(ch) = chars.next() {
        if escape {
            value.push(match ch {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                other => other,
            });
            escape = false;
            continue;
        }
        match ch {
            '\\' => escape = true,
            '"' => {
                let tail = chars.as_str().trim();
                return if tail.is_empty() || tail.starts_with('#') {
                    Ok(value)
                } else {
                    Err("unexpected characters after closing quote".to_string())
                };
            }
            other => value.push(other),
        }
    }

    if escape {
        Err("unterminated escape sequence in \" quote".to_string())
    } else {
        Err("unterminated \" quote".to_string())
    }
}
