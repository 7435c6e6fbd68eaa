//! Module Parameters - Load-time driver configuration
//!
//! Parameters arrive as `key=value` tokens the way a module loader passes
//! them, or from a TOML table via serde. Boolean values accept the usual
//! loader spellings (`0/1`, `n/y`, `no/yes`, `false/true`).

use serde::Deserialize;
use thiserror::Error;

/// Errors from parameter parsing
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("unknown module parameter: {name}")]
    UnknownParameter { name: String },

    #[error("malformed parameter token (expected key=value): {token}")]
    MalformedToken { token: String },

    #[error("invalid boolean for {name}: {value}")]
    InvalidBool { name: String, value: String },
}

/// Driver configuration, fixed at module init
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModuleParams {
    /// Enable verbose diagnostic logging
    pub debug: bool,

    /// Restrict read to a single data transfer per open session
    pub one_shot: bool,
}

impl Default for ModuleParams {
    fn default() -> Self {
        Self {
            debug: false,
            one_shot: true,
        }
    }
}

impl ModuleParams {
    /// Parse a list of `key=value` tokens on top of the defaults
    ///
    /// # Errors
    /// Rejects tokens without `=`, unknown keys, and unrecognized boolean
    /// spellings.
    pub fn parse<'a, I>(tokens: I) -> Result<Self, ParamError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut params = Self::default();
        for token in tokens {
            params.apply(token)?;
        }
        Ok(params)
    }

    /// Apply a single `key=value` token
    pub fn apply(&mut self, token: &str) -> Result<(), ParamError> {
        let (name, value) = token
            .split_once('=')
            .ok_or_else(|| ParamError::MalformedToken {
                token: token.to_string(),
            })?;

        match name {
            "debug" => self.debug = parse_bool(name, value)?,
            "one_shot" => self.one_shot = parse_bool(name, value)?,
            _ => {
                return Err(ParamError::UnknownParameter {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ParamError> {
    match value {
        "1" | "y" | "Y" | "yes" | "true" => Ok(true),
        "0" | "n" | "N" | "no" | "false" => Ok(false),
        _ => Err(ParamError::InvalidBool {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
