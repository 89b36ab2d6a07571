//! Clone source descriptors

use std::fmt;

use serde_json::Value;

use crate::hg::url::{build_repo_url, folder_name, resolve_source};
use crate::{Error, Result};

/// Where to clone from
#[derive(Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    /// A local path or URL
    Path(String),
    /// A URL plus credentials to embed in it
    Credentialed {
        url: String,
        username: String,
        password: String,
    },
    /// Several sources to merge into one repository, in order
    List(Vec<SourceDescriptor>),
}

impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Credentialed { url, username, .. } => f
                .debug_struct("Credentialed")
                .field("url", url)
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::List(sources) => f.debug_tuple("List").field(sources).finish(),
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path),
            Self::Credentialed { url, .. } => write!(f, "{}", url),
            Self::List(sources) => write!(f, "list of {} sources", sources.len()),
        }
    }
}

impl From<&str> for SourceDescriptor {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for SourceDescriptor {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl<T: Into<SourceDescriptor>> From<Vec<T>> for SourceDescriptor {
    fn from(sources: Vec<T>) -> Self {
        Self::List(sources.into_iter().map(Into::into).collect())
    }
}

impl SourceDescriptor {
    /// Build a descriptor from loosely typed JSON
    ///
    /// Strings become paths, objects with a `url` become credentialed
    /// sources and arrays become lists of either. Anything else is rejected
    /// with [`Error::InvalidSourceType`] naming what was received.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => {
                let sources = items
                    .iter()
                    .map(|item| match item {
                        Value::Array(_) => Err(invalid("nested list")),
                        other => Self::scalar_from_value(other),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::List(sources))
            }
            other => Self::scalar_from_value(other),
        }
    }

    fn scalar_from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(path) => Ok(Self::Path(path.clone())),
            Value::Object(map) => {
                let url = match map.get("url") {
                    Some(Value::String(url)) => url.clone(),
                    _ => return Err(invalid("object without url")),
                };
                let field = |key: &str| {
                    map.get(key)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                Ok(Self::Credentialed {
                    url,
                    username: field("username"),
                    password: field("password"),
                })
            }
            Value::Null => Err(invalid("null")),
            Value::Bool(_) => Err(invalid("boolean")),
            Value::Number(_) => Err(invalid("number")),
            Value::Array(_) => Err(invalid("list")),
        }
    }

    /// Parse a descriptor from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Name of the folder this source is moved into when merged
    ///
    /// Fails when the last component is empty, `.` or `..`.
    pub fn basename(&self) -> Result<String> {
        match self {
            Self::Path(path) => folder_name(path),
            Self::Credentialed { url, .. } => folder_name(url),
            Self::List(_) => Err(invalid("nested list")),
        }
    }

    /// URL to hand to `hg`, with any credentials embedded
    ///
    /// Relative local paths are resolved against the current directory.
    pub fn connection_url(&self) -> Result<String> {
        match self {
            Self::Path(path) => resolve_source(path),
            Self::Credentialed {
                url,
                username,
                password,
            } => build_repo_url(&resolve_source(url)?, username, password),
            Self::List(_) => Err(invalid("nested list")),
        }
    }

    /// Check that every entry of a merge list is a single source with a
    /// usable folder name
    pub fn validate_entries(sources: &[SourceDescriptor]) -> Result<()> {
        if sources.iter().any(|s| matches!(s, Self::List(_))) {
            return Err(invalid("nested list"));
        }
        for source in sources {
            source.basename()?;
        }
        Ok(())
    }
}

fn invalid(received: &str) -> Error {
    Error::InvalidSourceType {
        received: received.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_string() {
        let source = SourceDescriptor::from_value(&json!("../repoA")).unwrap();
        assert_eq!(source, SourceDescriptor::Path("../repoA".to_string()));
    }

    #[test]
    fn test_from_value_object() {
        let source = SourceDescriptor::from_value(&json!({
            "url": "https://hg.example.com/repoA",
            "username": "alice",
            "password": "pw"
        }))
        .unwrap();
        assert_eq!(
            source,
            SourceDescriptor::Credentialed {
                url: "https://hg.example.com/repoA".to_string(),
                username: "alice".to_string(),
                password: "pw".to_string(),
            }
        );
    }

    #[test]
    fn test_from_value_list() {
        let source =
            SourceDescriptor::from_value(&json!(["repoA", {"url": "https://h/repoB"}])).unwrap();
        match source {
            SourceDescriptor::List(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[1].basename().unwrap(), "repoB");
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_from_value_rejects_other_shapes() {
        for (value, shape) in [
            (json!(42), "number"),
            (json!(true), "boolean"),
            (json!(null), "null"),
            (json!({"path": "x"}), "object without url"),
            (json!(["repoA", ["repoB"]]), "nested list"),
            (json!([1]), "number"),
        ] {
            match SourceDescriptor::from_value(&value) {
                Err(Error::InvalidSourceType { received }) => assert_eq!(received, shape),
                other => panic!("{} should be rejected, got {:?}", value, other),
            }
        }
    }

    #[test]
    fn test_connection_url_embeds_credentials() {
        let source = SourceDescriptor::Credentialed {
            url: "https://hg.example.com/repoA".to_string(),
            username: "alice".to_string(),
            password: "pw".to_string(),
        };
        assert_eq!(
            source.connection_url().unwrap(),
            "https://alice:pw@hg.example.com/repoA"
        );
        assert_eq!(source.basename().unwrap(), "repoA");
    }

    #[test]
    fn test_debug_redacts_password() {
        let source = SourceDescriptor::Credentialed {
            url: "https://hg.example.com/repoA".to_string(),
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", source).contains("hunter2"));
    }

    #[test]
    fn test_validate_entries() {
        let flat = vec![SourceDescriptor::from("a"), SourceDescriptor::from("b")];
        assert!(SourceDescriptor::validate_entries(&flat).is_ok());

        let nested = vec![
            SourceDescriptor::from("a"),
            SourceDescriptor::from(vec!["b", "c"]),
        ];
        assert!(matches!(
            SourceDescriptor::validate_entries(&nested),
            Err(Error::InvalidSourceType { .. })
        ));

        let unnamed = vec![
            SourceDescriptor::from("a"),
            SourceDescriptor::from("https://hg.example.com/"),
        ];
        assert!(SourceDescriptor::validate_entries(&unnamed).is_err());
    }

    #[test]
    fn test_connection_url_resolves_relative_paths() {
        let cwd = std::env::current_dir().unwrap();
        let source = SourceDescriptor::from("repoA");
        assert_eq!(
            source.connection_url().unwrap(),
            cwd.join("repoA").to_string_lossy()
        );
        assert_eq!(source.basename().unwrap(), "repoA");

        let remote = SourceDescriptor::from("https://hg.example.com/repoA");
        assert_eq!(remote.connection_url().unwrap(), "https://hg.example.com/repoA");
    }
}
