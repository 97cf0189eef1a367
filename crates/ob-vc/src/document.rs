//! Tagged credential documents.
//!
//! Documents cross the engine boundary as [`CredentialDocument`], never as
//! an open JSON map. Untrusted JSON is sniffed into a variant by its `type`.

use serde_json::Value;

use crate::error::VcError;
use crate::ob2::Ob2Assertion;
use crate::ob3::Ob3Credential;

/// Which Open Badges representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialFormat {
    /// Hosted OB2 assertion.
    Ob2,
    /// OB3 verifiable credential.
    Ob3,
}

impl CredentialFormat {
    /// Stable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ob2 => "ob2",
            Self::Ob3 => "ob3",
        }
    }
}

impl std::fmt::Display for CredentialFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CredentialFormat {
    type Err = VcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ob2" | "v2" | "2.0" => Ok(Self::Ob2),
            "ob3" | "v3" | "3.0" => Ok(Self::Ob3),
            other => Err(VcError::InvalidField {
                field: "format",
                reason: format!("unknown credential format {other:?}"),
            }),
        }
    }
}

/// An OB2 or OB3 document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialDocument {
    /// Hosted assertion.
    Ob2(Ob2Assertion),
    /// Verifiable credential.
    Ob3(Box<Ob3Credential>),
}

impl CredentialDocument {
    /// Sniff the representation from `type` and parse.
    ///
    /// `"Assertion"` is OB2; a type array containing `VerifiableCredential`
    /// is OB3.
    pub fn from_value(value: Value) -> Result<Self, VcError> {
        match sniff_format(&value) {
            Some(CredentialFormat::Ob2) => Ok(Self::Ob2(serde_json::from_value(value)?)),
            Some(CredentialFormat::Ob3) => Ok(Self::Ob3(Box::new(serde_json::from_value(value)?))),
            None => Err(VcError::UnrecognizedDocument(
                "expected type \"Assertion\" or a VerifiableCredential".into(),
            )),
        }
    }

    /// Serialize back to JSON.
    pub fn to_value(&self) -> Result<Value, VcError> {
        Ok(match self {
            Self::Ob2(doc) => serde_json::to_value(doc)?,
            Self::Ob3(doc) => serde_json::to_value(doc)?,
        })
    }

    /// Which representation.
    pub fn format(&self) -> CredentialFormat {
        match self {
            Self::Ob2(_) => CredentialFormat::Ob2,
            Self::Ob3(_) => CredentialFormat::Ob3,
        }
    }

    /// The document's own IRI.
    pub fn id(&self) -> &str {
        match self {
            Self::Ob2(doc) => &doc.id,
            Self::Ob3(doc) => &doc.id,
        }
    }
}

/// Format of a JSON document, judged by its `type`.
pub fn sniff_format(value: &Value) -> Option<CredentialFormat> {
    match value.get("type")? {
        Value::String(t) if t == "Assertion" => Some(CredentialFormat::Ob2),
        Value::Array(types) if types.iter().any(|t| t == "VerifiableCredential") => {
            Some(CredentialFormat::Ob3)
        }
        _ => None,
    }
}
