//! Identifier quoting (§4.5.3 `identifierEscape`).

use crate::ast::IdentifierString;

use super::options::IdentifierEscape;

/// Renders an identifier per the configured escape style. An identifier
/// that was quoted in the source is always re-quoted (its case/characters
/// may not be representable unquoted); an identifier that wasn't is only
/// quoted when the escape style forces it.
pub fn render_identifier(ident: &IdentifierString, escape: IdentifierEscape) -> String {
    if !ident.quoted && escape == IdentifierEscape::None {
        return ident.text.clone();
    }
    match escape.delimiters() {
        Some((start, end)) => {
            if start == end && needs_doubling(start) {
                format!("{start}{}{end}", ident.text.replace(start, &format!("{start}{start}")))
            } else {
                format!("{start}{}{end}", ident.text)
            }
        }
        None => ident.text.clone(),
    }
}

fn needs_doubling(quote: char) -> bool {
    quote == '"' || quote == '`'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquoted_plain_identifier_passes_through() {
        let id = IdentifierString::new("users");
        assert_eq!(render_identifier(&id, IdentifierEscape::None), "users");
    }

    #[test]
    fn quote_style_wraps_in_double_quotes() {
        let id = IdentifierString::new("users");
        assert_eq!(render_identifier(&id, IdentifierEscape::Quote), "\"users\"");
    }

    #[test]
    fn embedded_quote_is_doubled() {
        let id = IdentifierString::quoted("a\"b");
        assert_eq!(render_identifier(&id, IdentifierEscape::Quote), "\"a\"\"b\"");
    }

    #[test]
    fn bracket_style_for_sql_server() {
        let id = IdentifierString::new("Order");
        assert_eq!(render_identifier(&id, IdentifierEscape::Bracket), "[Order]");
    }
}
