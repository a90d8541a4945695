//! Parsing chat messages into snippet requests
//!
//! An `/eval` message looks like:
//!
//! ```text
//! /eval elm-lang/html elm-community/list-extra
//! import List.Extra
//! List.Extra.unique [1, 1, 2]
//! ```
//!
//! The rest of the first line lists packages. Following lines starting with
//! `import ` are imports; every other non-blank line is an expression. Code
//! fence lines are skipped. Expressions are kept entity-encoded, decoding
//! happens in the pipeline.

use sdk::types::{ConversationId, SnippetRequest};

/// The command word of a message, without a `@botname` suffix
///
/// Returns `None` for messages that are not commands.
pub fn command_name(text: &str) -> Option<&str> {
    let word = text.split_whitespace().next()?;
    if !word.starts_with('/') {
        return None;
    }
    Some(word.split('@').next().unwrap_or(word))
}

/// Build a request from the text of an `/eval` message
pub fn parse_eval(conversation_id: ConversationId, text: &str) -> SnippetRequest {
    let mut lines = text.lines();
    let mut request = SnippetRequest::new(conversation_id);

    if let Some(first) = lines.next() {
        // Skip the command word itself
        for package in first.split_whitespace().skip(1) {
            request = request.with_package(package);
        }
    }

    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with("```") {
            continue;
        }
        if line.starts_with("import ") {
            request = request.with_import(line);
        } else {
            request = request.with_expression(line);
        }
    }

    request
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> SnippetRequest {
        parse_eval(ConversationId::from("7"), text)
    }

    #[test]
    fn test_command_name() {
        assert_eq!(command_name("/eval 1"), Some("/eval"));
        assert_eq!(command_name("/eval@evalbot\n1"), Some("/eval"));
        assert_eq!(command_name("  /help"), Some("/help"));
        assert_eq!(command_name("hello"), None);
        assert_eq!(command_name(""), None);
    }

    #[test]
    fn test_parse_full_message() {
        let request = parse(
            "/eval elm-lang/html elm-community/list-extra\n\
             import List.Extra\n\
             \n\
             List.Extra.unique [1, 1, 2]\n\
             1 + 1",
        );

        assert_eq!(request.packages, vec!["elm-lang/html", "elm-community/list-extra"]);
        assert_eq!(request.imports, vec!["import List.Extra"]);
        assert_eq!(request.expressions, vec!["List.Extra.unique [1, 1, 2]", "1 + 1"]);
    }

    #[test]
    fn test_parse_skips_code_fences() {
        let request = parse("/eval\n```elm\n\"a\" ++ \"b\"\n```");

        assert!(request.packages.is_empty());
        assert_eq!(request.expressions, vec!["\"a\" ++ \"b\""]);
    }

    #[test]
    fn test_parse_without_expressions() {
        let request = parse("/eval elm-lang/html");
        assert!(!request.has_expressions());
        assert_eq!(request.packages, vec!["elm-lang/html"]);
    }

    #[test]
    fn test_parse_keeps_entities_encoded() {
        let request = parse("/eval\n1 &lt; 2");
        assert_eq!(request.expressions, vec!["1 &lt; 2"]);
        assert_eq!(request.decoded_expressions(), vec!["1 < 2"]);
    }
}
