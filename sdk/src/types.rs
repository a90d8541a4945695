//! Snippet request and response types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::decode_html_entities;

/// Identifier routing a response back to the chat that sent the request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// A snippet submitted from a conversation
///
/// Expressions are stored as received (HTML-entity encoded) and decoded with
/// [`SnippetRequest::decoded_expressions`] right before evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetRequest {
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub expressions: Vec<String>,
}

impl SnippetRequest {
    /// Create an empty request for a conversation
    pub fn new(conversation_id: impl Into<ConversationId>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            packages: Vec::new(),
            imports: Vec::new(),
            expressions: Vec::new(),
        }
    }

    /// Add a package to install before evaluation
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.packages.push(package.into());
        self
    }

    /// Add an import statement
    pub fn with_import(mut self, import: impl Into<String>) -> Self {
        self.imports.push(import.into());
        self
    }

    /// Add an expression
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expressions.push(expression.into());
        self
    }

    pub fn has_expressions(&self) -> bool {
        !self.expressions.is_empty()
    }

    /// Expressions with HTML entities decoded, in submission order
    pub fn decoded_expressions(&self) -> Vec<String> {
        self.expressions
            .iter()
            .map(|e| decode_html_entities(e))
            .collect()
    }
}

/// Result of installing a request's packages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Every package installed (or there were none)
    Installed,
    /// The named package failed; later packages were not attempted
    Failed { package: String },
}

/// Result of running the evaluator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// One value per expression, in order
    Values(Vec<String>),
    /// Evaluator diagnostic text, verbatim
    Failed { diagnostic: String },
}

/// The kind of a response message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseKind {
    NoExpressions,
    InstallFailed { package: String },
    EvalFailed { diagnostic: String },
    Result { value: String },
    InfrastructureError { message: String },
}

impl ResponseKind {
    /// Stable snake_case name of the variant
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoExpressions => "no_expressions",
            Self::InstallFailed { .. } => "install_failed",
            Self::EvalFailed { .. } => "eval_failed",
            Self::Result { .. } => "result",
            Self::InfrastructureError { .. } => "infrastructure_error",
        }
    }
}

/// A response tagged with the conversation it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub conversation_id: ConversationId,
    #[serde(flatten)]
    pub kind: ResponseKind,
}

impl ResponseMessage {
    pub fn new(conversation_id: ConversationId, kind: ResponseKind) -> Self {
        Self {
            conversation_id,
            kind,
        }
    }

    pub fn is_result(&self) -> bool {
        matches!(self.kind, ResponseKind::Result { .. })
    }
}
