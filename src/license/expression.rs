//! Minimal SPDX expression handling: enough to split a declared license into
//! the identifiers whose texts belong in the notice.

use super::spdx::normalize;

/// Tokens produced by [`tokenize`].
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Id(String),
    And,
    Or,
    With,
    LParen,
    RParen,
}

/// Tokenize an SPDX license expression into a flat [`Vec<Token>`].
pub fn tokenize(expr: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '(' {
            tokens.push(Token::LParen);
            chars.next();
        } else if c == ')' {
            tokens.push(Token::RParen);
            chars.next();
        } else {
            let mut s = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '(' || c == ')' {
                    break;
                }
                s.push(c);
                chars.next();
            }
            let token = match s.as_str() {
                "AND" | "and" => Token::And,
                "OR" | "or" => Token::Or,
                "WITH" | "with" => Token::With,
                _ => Token::Id(s),
            };
            tokens.push(token);
        }
    }
    tokens
}

/// Declared values that carry no license information.
const PLACEHOLDERS: &[&str] = &["UNKNOWN", "NOASSERTION", "NONE"];

/// Longest declared value still treated as an identifier or expression.
/// Some registries put the whole license text in the license field.
const MAX_EXPRESSION_LEN: usize = 200;

/// Distinct license (and exception) identifiers in `declared`, in the order
/// they appear. `None` when nothing usable is declared.
pub fn identifiers(declared: &str) -> Option<Vec<String>> {
    let declared = declared.trim();
    if declared.is_empty() || declared.len() > MAX_EXPRESSION_LEN || declared.contains('\n') {
        return None;
    }

    // Whole-string aliases first ("MIT License"), then "/" as an OR shorthand.
    let normalized = normalize(declared).replace('/', " OR ");

    let mut ids: Vec<String> = Vec::new();
    for token in tokenize(&normalized) {
        if let Token::Id(raw) = token {
            let id = normalize(&raw);
            if !is_identifier(&id) || PLACEHOLDERS.contains(&id.to_uppercase().as_str()) {
                return None;
            }
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}

/// SPDX identifiers are ASCII letters, digits, `.`, `-` and a trailing `+`.
fn is_identifier(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_parentheses() {
        assert_eq!(
            tokenize("(MIT OR Apache-2.0) AND BSD-3-Clause"),
            vec![
                Token::LParen,
                Token::Id("MIT".into()),
                Token::Or,
                Token::Id("Apache-2.0".into()),
                Token::RParen,
                Token::And,
                Token::Id("BSD-3-Clause".into()),
            ]
        );
    }

    #[test]
    fn test_single_identifier() {
        assert_eq!(identifiers("MIT"), Some(vec!["MIT".to_string()]));
        assert_eq!(identifiers("  Apache-2.0 "), Some(vec!["Apache-2.0".to_string()]));
    }

    #[test]
    fn test_alias_is_normalized() {
        assert_eq!(identifiers("MIT License"), Some(vec!["MIT".to_string()]));
        assert_eq!(identifiers("Apache License 2.0"), Some(vec!["Apache-2.0".to_string()]));
    }

    #[test]
    fn test_compound_expressions() {
        assert_eq!(
            identifiers("MIT OR Apache-2.0"),
            Some(vec!["MIT".to_string(), "Apache-2.0".to_string()])
        );
        assert_eq!(
            identifiers("MIT/Apache-2.0"),
            Some(vec!["MIT".to_string(), "Apache-2.0".to_string()])
        );
        assert_eq!(
            identifiers("GPL-2.0 WITH Classpath-exception-2.0"),
            Some(vec!["GPL-2.0".to_string(), "Classpath-exception-2.0".to_string()])
        );
        assert_eq!(identifiers("MIT OR MIT"), Some(vec!["MIT".to_string()]));
    }

    #[test]
    fn test_nothing_usable() {
        assert_eq!(identifiers(""), None);
        assert_eq!(identifiers("UNKNOWN"), None);
        assert_eq!(identifiers("NOASSERTION"), None);
        assert_eq!(identifiers("Copyright (c) 2020 Someone\n\nPermission is hereby granted"), None);
        assert_eq!(identifiers("BSD-style, see LICENSE"), None);
    }
}
