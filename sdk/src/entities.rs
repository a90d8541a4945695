//! HTML entity decoding for snippet text
//!
//! Chat platforms escape `&`, `<` and `>` (and sometimes quotes) in message
//! text. Snippets must be decoded back to source before they reach the
//! evaluator.

/// Longest entity body we try to resolve, e.g. `#x10FFFF`
const MAX_ENTITY_LEN: usize = 8;

/// Decode named and numeric HTML entities
///
/// Unknown or malformed entities are left untouched.
pub fn decode_html_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];

        let decoded = after
            .find(';')
            .filter(|&end| end > 0 && end <= MAX_ENTITY_LEN)
            .and_then(|end| resolve_entity(&after[..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn resolve_entity(body: &str) -> Option<char> {
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let digits = body.strip_prefix('#')?;
            let hex = digits
                .strip_prefix('x')
                .or_else(|| digits.strip_prefix('X'));
            let code = match hex {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_entities() {
        assert_eq!(decode_html_entities("a &lt; b &amp;&amp; c &gt; d"), "a < b && c > d");
        assert_eq!(decode_html_entities("&quot;hi&quot;"), "\"hi\"");
        assert_eq!(decode_html_entities("it&apos;s"), "it's");
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(decode_html_entities("&#39;x&#39;"), "'x'");
        assert_eq!(decode_html_entities("&#x41;&#X42;"), "AB");
    }

    #[test]
    fn test_unknown_entities_untouched() {
        assert_eq!(decode_html_entities("&bogus; &"), "&bogus; &");
        assert_eq!(decode_html_entities("a & b; c"), "a & b; c");
        assert_eq!(decode_html_entities("&#xZZ;"), "&#xZZ;");
    }

    #[test]
    fn test_no_double_decoding() {
        assert_eq!(decode_html_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(decode_html_entities("1 + 1"), "1 + 1");
        assert_eq!(decode_html_entities(""), "");
    }
}
