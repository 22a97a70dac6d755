//! Console system.
//!
//! Provides typed console variables (cvars) and the built-in commands that
//! manipulate them. Game commands (`noclip`, `give`, ...) are matched by the
//! server or client first; whatever they don't recognise lands here.
//!
//! # Usage
//! ```ignore
//! let mut console = Console::new();
//! console.register_cvar(
//!     "sv_cheats",
//!     CvarValue::Bool(false),
//!     "Allow cheats",
//!     CvarFlags::REPLICATED,
//! );
//! console.exec("sv_cheats 1")?;
//! assert!(console.cvar_bool("sv_cheats"));
//! ```

use std::collections::BTreeMap;

use anyhow::bail;

/// Console variable value.
#[derive(Debug, Clone, PartialEq)]
pub enum CvarValue {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

impl CvarValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CvarValue::Int(v) => Some(*v),
            CvarValue::Float(v) => Some(*v as i64),
            CvarValue::Bool(v) => Some(i64::from(*v)),
            CvarValue::String(s) => s.parse().ok(),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            CvarValue::Bool(v) => *v,
            CvarValue::Int(v) => *v != 0,
            CvarValue::Float(v) => *v != 0.0,
            CvarValue::String(s) => !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false"),
        }
    }

    /// Parses user input into a value of the same kind as `self`.
    fn parse_like(&self, text: &str) -> anyhow::Result<CvarValue> {
        Ok(match self {
            CvarValue::Int(_) => CvarValue::Int(text.parse()?),
            CvarValue::Float(_) => CvarValue::Float(text.parse()?),
            CvarValue::Bool(_) => match text {
                "1" | "true" | "on" => CvarValue::Bool(true),
                "0" | "false" | "off" => CvarValue::Bool(false),
                other => bail!("expected a boolean, got '{other}'"),
            },
            CvarValue::String(_) => CvarValue::String(text.trim_matches('"').to_string()),
        })
    }
}

impl std::fmt::Display for CvarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CvarValue::Int(v) => write!(f, "{}", v),
            CvarValue::Float(v) => write!(f, "{}", v),
            CvarValue::String(v) => write!(f, "\"{}\"", v),
            CvarValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Console variable metadata.
#[derive(Debug, Clone)]
pub struct Cvar {
    pub value: CvarValue,
    pub default: CvarValue,
    pub description: String,
    pub flags: CvarFlags,
}

bitflags::bitflags! {
    /// Cvar flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CvarFlags: u32 {
        const NONE = 0;
        const ARCHIVE = 1 << 0;      // Saved to config
        const CHEAT = 1 << 1;        // Requires sv_cheats
        const REPLICATED = 1 << 2;   // Server -> client
        const SERVER_ONLY = 1 << 3;  // Server-side only
    }
}

impl Default for CvarFlags {
    fn default() -> Self {
        Self::NONE
    }
}

/// The console.
#[derive(Default)]
pub struct Console {
    cvars: BTreeMap<String, Cvar>,
}

impl Console {
    pub fn new() -> Self {
        Self {
            cvars: BTreeMap::new(),
        }
    }

    /// Registers a console variable.
    pub fn register_cvar(
        &mut self,
        name: &str,
        default: CvarValue,
        description: &str,
        flags: CvarFlags,
    ) {
        self.cvars.insert(
            name.to_string(),
            Cvar {
                value: default.clone(),
                default,
                description: description.to_string(),
                flags,
            },
        );
    }

    pub fn get_cvar(&self, name: &str) -> Option<&CvarValue> {
        self.cvars.get(name).map(|c| &c.value)
    }

    /// Reads a cvar as a boolean; unknown cvars read as `false`.
    pub fn cvar_bool(&self, name: &str) -> bool {
        self.get_cvar(name).is_some_and(CvarValue::as_bool)
    }

    pub fn set_cvar(&mut self, name: &str, value: CvarValue) -> anyhow::Result<()> {
        let Some(flags) = self.cvars.get(name).map(|c| c.flags) else {
            bail!("unknown cvar: {}", name);
        };
        if flags.contains(CvarFlags::CHEAT) && !self.cvar_bool("sv_cheats") {
            bail!("{} is cheat protected", name);
        }
        if let Some(cvar) = self.cvars.get_mut(name) {
            cvar.value = value;
        }
        Ok(())
    }

    /// Executes a console command line and returns the lines to print.
    pub fn exec(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            return Ok(Vec::new());
        }

        let tokens = parse_command_line(line);
        let Some((name, args)) = tokens.split_first() else {
            return Ok(Vec::new());
        };

        match name.as_str() {
            "echo" => Ok(vec![args.join(" ")]),
            "cvarlist" => Ok(self
                .cvars
                .iter()
                .map(|(name, cvar)| {
                    format!(
                        "  {} = {} (default: {}) - {}",
                        name, cvar.value, cvar.default, cvar.description
                    )
                })
                .collect()),
            "set" => match args.split_first() {
                Some((cvar, rest)) if !rest.is_empty() => self.assign(cvar, &rest.join(" ")),
                _ => bail!("usage: set <cvar> <value>"),
            },
            cvar if self.cvars.contains_key(cvar) => {
                if args.is_empty() {
                    Ok(self.describe_cvar(cvar).into_iter().collect())
                } else {
                    self.assign(cvar, &args.join(" "))
                }
            }
            other => Ok(vec![format!("Unknown command: {}", other)]),
        }
    }

    fn assign(&mut self, name: &str, text: &str) -> anyhow::Result<Vec<String>> {
        let Some(cvar) = self.cvars.get(name) else {
            bail!("unknown cvar: {}", name);
        };
        let value = cvar.value.parse_like(text)?;
        let out = format!("{} = {}", name, value);
        self.set_cvar(name, value)?;
        Ok(vec![out])
    }

    /// `name = value (default: ..)`, or `None` for an unknown cvar.
    pub fn describe_cvar(&self, name: &str) -> Option<String> {
        self.cvars
            .get(name)
            .map(|c| format!("{} = {} (default: {})", name, c.value, c.default))
    }
}

/// Parses a command line into tokens, respecting quotes.
pub fn parse_command_line(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}
