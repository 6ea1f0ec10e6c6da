//! Credential assembly
//!
//! Merges cookie fragments from several sources into one `name=value; ...`
//! string. Order is first-insertion order; setting an existing name replaces
//! its value in place.

use std::fmt;

/// Tracking field the provider sets on login; never part of the credential
pub const DECOY_FIELD: &str = "i-wanna-go-back";

/// Fingerprint cookie fetched separately on login
pub const FINGERPRINT_FIELD: &str = "buvid3";

/// Ordered cookie field map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    fields: Vec<(String, String)>,
}

impl Credential {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw `name=value[; attrs]` strings
    pub fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut credential = Self::new();
        credential.add(raw);
        credential
    }

    /// Set one field, keeping its position if it already exists
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(field) => field.1 = value,
            None => self.fields.push((name, value)),
        }
        self
    }

    /// Merge raw `Set-Cookie` style strings.
    ///
    /// Attributes after the first `;` are dropped and the remainder is split
    /// at the first `=`, so values may themselves contain `=`.
    pub fn add<I, S>(&mut self, raw: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in raw {
            let pair = entry.as_ref().split(';').next().unwrap_or_default();
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            self.set(name, value);
        }
        self
    }

    /// Remove a field; removing an absent name is a no-op
    pub fn delete(&mut self, name: &str) -> &mut Self {
        self.fields.retain(|(n, _)| n != name);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

/// Assemble a login credential in the canonical merge order.
///
/// The fingerprint goes first, then the response cookies, then any token
/// fields. The decoy field is removed last, whichever source supplied it.
pub fn assemble<C, S>(fingerprint: Option<&str>, cookies: C, tokens: &[(&str, String)]) -> Credential
where
    C: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut credential = Credential::new();
    if let Some(fingerprint) = fingerprint {
        credential.set(FINGERPRINT_FIELD, fingerprint);
    }
    credential.add(cookies);
    for (name, value) in tokens {
        credential.set(*name, value.as_str());
    }
    credential.delete(DECOY_FIELD);
    credential
}
