use std::{env, fmt, path::Path};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Authentication for a single remote host.
///
/// Fields are kept as an opaque mapping. Only `host`, `username`, `password` and `token` carry
/// meaning here, everything else passes through untouched. Secret values may contain `$VAR`
/// or `${VAR}` placeholders which are expanded when the credential is resolved, never when it
/// is loaded.
#[derive(Clone, PartialEq, Deserialize)]
pub struct Credential(Map<String, Value>);

impl Credential {
    /// Return a string field or `None` if it is absent or not a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    fn host(&self) -> Result<&str> {
        match self.0.get("host") {
            Some(Value::String(host)) => Ok(host),
            Some(_) => bail!("Credential field host is not a string"),
            None => bail!("Credential is missing the required field host"),
        }
    }

    fn expand(&self, lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let fields = self
            .0
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => Value::String(
                        shellexpand::env_with_context_no_errors(s, |var| {
                            Some(lookup(var).unwrap_or_default())
                        })
                        .into_owned(),
                    ),
                    other => other.clone(),
                };
                (key.clone(), value)
            })
            .collect();
        Self(fields)
    }
}

// Never print secrets.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut keys = self.0.keys().map(String::as_str).collect::<Vec<_>>();
        keys.sort_unstable();
        f.debug_struct("Credential")
            .field("host", &self.get_str("host"))
            .field("fields", &keys)
            .finish()
    }
}

/// Read credentials from a JSON file containing an array of objects.
pub fn from_file(path: impl AsRef<Path>) -> Result<Vec<Credential>> {
    let json = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read {:?}", path.as_ref()))?;

    serde_json::from_str(&json).context("Failed to deserialize credentials")
}

/// Select the credential for `host` and expand its placeholders from the environment.
///
/// The first credential in list order whose host matches exactly wins. A credential without a
/// string `host` field is a configuration error.
pub fn resolve(credentials: &[Credential], host: &str) -> Result<Option<Credential>> {
    resolve_with(credentials, host, |var| env::var(var).ok())
}

fn resolve_with(
    credentials: &[Credential],
    host: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<Credential>> {
    for (index, credential) in credentials.iter().enumerate() {
        let candidate = credential
            .host()
            .with_context(|| format!("Invalid credential at position {index}"))?;
        if candidate == host {
            return Ok(Some(credential.expand(&lookup)));
        }
    }
    Ok(None)
}
