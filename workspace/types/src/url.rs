use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use thiserror::Error;
use url::Url as OriginalUrl;

/// Schemes flatpak-builder can fetch a runtime repo descriptor from.
const SUPPORTED_SCHEMES: [&str; 3] = ["http", "https", "file"];

#[derive(Debug, Error, PartialEq)]
pub enum UrlError {
    #[error("invalid runtime repo url '{0}': {1}")]
    Parse(String, url::ParseError),

    #[error("unsupported scheme '{scheme}' in runtime repo url '{url}'")]
    UnsupportedScheme { url: String, scheme: String },
}

/// URL of the remote repo that provides the manifest's runtime dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Url(OriginalUrl);

impl Url {
    pub fn parse(value: &str) -> Result<Self, UrlError> {
        let url =
            OriginalUrl::parse(value).map_err(|err| UrlError::Parse(value.to_string(), err))?;
        if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
            return Err(UrlError::UnsupportedScheme {
                url: value.to_string(),
                scheme: url.scheme().to_string(),
            });
        }
        Ok(Url(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Url {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Url::parse(s)
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Deref for Url {
    type Target = OriginalUrl;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Url {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Serialize for Url {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for Url {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct UrlVisitor;

        impl de::Visitor<'_> for UrlVisitor {
            type Value = Url;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string containing an http, https or file URL")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Url::parse(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(UrlVisitor)
    }
}
