use std::fmt::{Display, Formatter as FmtFormatter, Result as FmtResult};
use std::str::FromStr;

use graphql_parser::query::Type as ParserType;
use serde::{Deserialize, Serialize};

/// A GraphQL type reference, e.g. `[ID!]!`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeNode {
    Named(String),
    List(Box<TypeNode>),
    NonNull(Box<TypeNode>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type reference \"{0}\"")]
pub struct TypeNodeParseError(pub String);

impl TypeNode {
    pub fn named(name: impl Into<String>) -> Self {
        TypeNode::Named(name.into())
    }

    pub fn non_null(inner: TypeNode) -> Self {
        TypeNode::NonNull(Box::new(inner))
    }

    pub fn list(inner: TypeNode) -> Self {
        TypeNode::List(Box::new(inner))
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeNode::NonNull(_))
    }

    /// True when the type is a list, ignoring an outer non-null wrapper.
    pub fn is_list(&self) -> bool {
        match self {
            TypeNode::List(_) => true,
            TypeNode::NonNull(inner) => inner.is_list(),
            TypeNode::Named(_) => false,
        }
    }

    /// The named type at the bottom of all list and non-null wrappers.
    pub fn inner_type(&self) -> &str {
        match self {
            TypeNode::Named(name) => name,
            TypeNode::List(inner) | TypeNode::NonNull(inner) => inner.inner_type(),
        }
    }

    fn parse(input: &str) -> Result<TypeNode, TypeNodeParseError> {
        let trimmed = input.trim();

        if let Some(inner) = trimmed.strip_suffix('!') {
            let inner = TypeNode::parse(inner)?;
            if inner.is_non_null() {
                return Err(TypeNodeParseError(input.to_string()));
            }
            return Ok(TypeNode::non_null(inner));
        }

        if let Some(inner) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            return Ok(TypeNode::list(TypeNode::parse(inner)?));
        }

        let is_name = trimmed
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !is_name {
            return Err(TypeNodeParseError(input.to_string()));
        }

        Ok(TypeNode::Named(trimmed.to_string()))
    }
}

impl FromStr for TypeNode {
    type Err = TypeNodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeNode::parse(s)
    }
}

impl TryFrom<String> for TypeNode {
    type Error = TypeNodeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TypeNode::parse(&value)
    }
}

impl From<TypeNode> for String {
    fn from(value: TypeNode) -> Self {
        value.to_string()
    }
}

impl From<&ParserType<'_, String>> for TypeNode {
    fn from(value: &ParserType<'_, String>) -> Self {
        match value {
            ParserType::NamedType(name) => TypeNode::Named(name.to_string()),
            ParserType::ListType(inner) => TypeNode::list(inner.as_ref().into()),
            ParserType::NonNullType(inner) => TypeNode::non_null(inner.as_ref().into()),
        }
    }
}

impl Display for TypeNode {
    fn fmt(&self, f: &mut FmtFormatter<'_>) -> FmtResult {
        match self {
            TypeNode::Named(name) => write!(f, "{}", name),
            TypeNode::List(inner) => write!(f, "[{}]", inner),
            TypeNode::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}
