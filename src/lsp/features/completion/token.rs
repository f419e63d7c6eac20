//! Resumption tokens of package completion items
//!
//! A package item's documentation is only fetched when the editor resolves it,
//! possibly long after the completion request finished. The item therefore
//! carries, in its `data` field, everything needed to repeat the query.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TokenDecodeError;
use crate::index::protocol::{AttrPath, AttrPathCompleteParams};

/// Current token format.
pub const TOKEN_VERSION: u32 = 1;

/// Decoded content of a resumption token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeToken {
    #[serde(rename = "v")]
    pub version: u32,
    /// Scope of the original completion query.
    pub scope: AttrPath,
    /// Prefix of the original completion query.
    pub prefix: String,
    /// The completed attribute name.
    pub name: String,
}

impl ResumeToken {
    pub fn new(query: &AttrPathCompleteParams, name: impl Into<String>) -> Self {
        ResumeToken {
            version: TOKEN_VERSION,
            scope: query.scope.clone(),
            prefix: query.prefix.clone(),
            name: name.into(),
        }
    }

    /// Attribute path of the completed package: `scope ++ [name]`.
    pub fn attr_path(&self) -> AttrPath {
        let mut path = self.scope.clone();
        path.push(self.name.clone());
        path
    }

    pub fn encode(&self) -> Value {
        // Plain strings and integers always serialize.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn decode(data: &Value) -> Result<Self, TokenDecodeError> {
        let token = ResumeToken::deserialize(data)?;
        if token.version != TOKEN_VERSION {
            return Err(TokenDecodeError::UnsupportedVersion(token.version));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query() -> AttrPathCompleteParams {
        AttrPathCompleteParams {
            scope: vec!["python3Packages".to_string()],
            prefix: "req".to_string(),
        }
    }

    #[test]
    fn test_token_reconstructs_query_and_name() {
        let token = ResumeToken::new(&query(), "requests");
        let decoded = ResumeToken::decode(&token.encode()).unwrap();

        assert_eq!(decoded.scope, query().scope);
        assert_eq!(decoded.prefix, query().prefix);
        assert_eq!(decoded.name, "requests");
        assert_eq!(decoded.attr_path(), vec!["python3Packages", "requests"]);
    }

    #[test]
    fn test_wire_shape() {
        let token = ResumeToken::new(&query(), "requests");
        assert_eq!(
            token.encode(),
            json!({"v": 1, "scope": ["python3Packages"], "prefix": "req", "name": "requests"})
        );
    }

    #[test]
    fn test_decode_rejects_malformed_data() {
        assert!(matches!(
            ResumeToken::decode(&json!("not a token")),
            Err(TokenDecodeError::Json(_))
        ));
        assert!(matches!(
            ResumeToken::decode(&json!({"v": 1, "scope": ["a"]})),
            Err(TokenDecodeError::Json(_))
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let data = json!({"v": 2, "scope": [], "prefix": "", "name": "hello"});
        assert!(matches!(
            ResumeToken::decode(&data),
            Err(TokenDecodeError::UnsupportedVersion(2))
        ));
    }
}
