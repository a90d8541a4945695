//! Rendering responses as chat text

use sdk::types::ResponseKind;

/// Longest reply sent in one message
pub const MAX_REPLY_CHARS: usize = 4000;

pub fn render(kind: &ResponseKind) -> String {
    match kind {
        ResponseKind::NoExpressions => {
            "Nothing to evaluate: add at least one expression after /eval.".to_string()
        }
        ResponseKind::InstallFailed { package } => {
            format!("Couldn't install package {}", package)
        }
        ResponseKind::EvalFailed { diagnostic } => diagnostic.clone(),
        ResponseKind::Result { value } => value.clone(),
        ResponseKind::InfrastructureError { message } => {
            format!("Something went wrong on our side: {}", message)
        }
    }
}

/// Cut `text` to at most `MAX_REPLY_CHARS` characters, marking the cut
pub fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_REPLY_CHARS) {
        Some((cut, _)) => format!("{}...\n\n(truncated)", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_is_value_itself() {
        let kind = ResponseKind::Result {
            value: "2 : number".to_string(),
        };
        assert_eq!(render(&kind), "2 : number");
    }

    #[test]
    fn test_install_failure_names_package() {
        let kind = ResponseKind::InstallFailed {
            package: "missing-pkg".to_string(),
        };
        assert!(render(&kind).contains("missing-pkg"));
    }

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(truncate("hello"), "hello");
        let exact = "a".repeat(MAX_REPLY_CHARS);
        assert_eq!(truncate(&exact), exact);
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        let long = "é".repeat(MAX_REPLY_CHARS + 5);
        let cut = truncate(&long);

        assert!(cut.ends_with("(truncated)"));
        assert_eq!(cut.chars().filter(|c| *c == 'é').count(), MAX_REPLY_CHARS);
    }
}
