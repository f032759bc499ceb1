use crate::sql::tokenizer::{tokenize, Token};

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Version,
    ShowTables,
    DescribeUsers,
    PkLookup {
        table: String,
        column: String,
        value: String,
    },
    FullScan {
        table: String,
    },
    TokenVerify {
        token: String,
    },
    Noop,
    Rejected,
}

/// Any of these appearing as a bare word anywhere in the query forces
/// `Rejected`, independent of whether some pattern below would otherwise
/// match. Comparison operators other than `=` are checked separately.
const FORBIDDEN_WORDS: &[&str] = &[
    "AND", "OR", "LIKE", "IN", "JOIN", "ORDER", "GROUP", "LIMIT", "OFFSET", "UNION", "INSERT",
    "UPDATE", "DELETE", "REPLACE", "CREATE", "DROP", "ALTER", "TRUNCATE", "GRANT", "REVOKE",
];

const USERS_TABLE: &str = "users";
const USERS_PRIMARY_KEY: &str = "id";

pub fn classify(sql: &str) -> Classification {
    let Ok(tokens) = tokenize(sql) else {
        return Classification::Rejected;
    };
    let tokens = strip_trailing_semicolon(&tokens);

    if has_forbidden_token(tokens) || has_stray_semicolon(tokens) {
        return Classification::Rejected;
    }

    match_version(tokens)
        .or_else(|| match_show_tables(tokens))
        .or_else(|| match_describe_users(tokens))
        .or_else(|| match_token_verify(tokens))
        .or_else(|| match_pk_lookup(tokens))
        .or_else(|| match_full_scan(tokens))
        .or_else(|| match_noop(tokens))
        .unwrap_or(Classification::Rejected)
}

fn strip_trailing_semicolon(tokens: &[Token]) -> &[Token] {
    match tokens.last() {
        Some(Token::Symbol(s)) if s == ";" => &tokens[..tokens.len() - 1],
        _ => tokens,
    }
}

fn has_stray_semicolon(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .any(|t| matches!(t, Token::Symbol(s) if s == ";"))
}

fn has_forbidden_token(tokens: &[Token]) -> bool {
    let mut select_count = 0;
    for t in tokens {
        match t {
            Token::Word(w) if FORBIDDEN_WORDS.contains(&w.to_uppercase().as_str()) => {
                return true
            }
            Token::Word(w) if w.eq_ignore_ascii_case("SELECT") => select_count += 1,
            Token::Symbol(s) if s != "*" && s != "=" && s != "(" && s != ")" && s != "," => {
                return true
            }
            _ => {}
        }
    }
    select_count > 1
}

fn is_word(t: &Token, expected: &str) -> bool {
    matches!(t, Token::Word(w) if w.eq_ignore_ascii_case(expected))
}

fn is_symbol(t: &Token, expected: &str) -> bool {
    matches!(t, Token::Symbol(s) if s == expected)
}

fn word_text(t: &Token) -> Option<&str> {
    match t {
        Token::Word(w) => Some(w.as_str()),
        _ => None,
    }
}

fn match_version(tokens: &[Token]) -> Option<Classification> {
    if tokens.len() == 2 && is_word(&tokens[0], "SELECT") && is_word(&tokens[1], "@@version") {
        Some(Classification::Version)
    } else {
        None
    }
}

fn match_show_tables(tokens: &[Token]) -> Option<Classification> {
    if tokens.len() == 2 && is_word(&tokens[0], "SHOW") && is_word(&tokens[1], "TABLES") {
        Some(Classification::ShowTables)
    } else {
        None
    }
}

fn match_describe_users(tokens: &[Token]) -> Option<Classification> {
    if tokens.len() == 2
        && (is_word(&tokens[0], "DESC") || is_word(&tokens[0], "DESCRIBE"))
        && is_word(&tokens[1], USERS_TABLE)
    {
        Some(Classification::DescribeUsers)
    } else {
        None
    }
}

fn match_token_verify(tokens: &[Token]) -> Option<Classification> {
    if tokens.len() == 5
        && is_word(&tokens[0], "SELECT")
        && is_word(&tokens[1], "qr_verify")
        && is_symbol(&tokens[2], "(")
        && is_symbol(&tokens[4], ")")
    {
        if let Token::StringLit(token) = &tokens[3] {
            return Some(Classification::TokenVerify {
                token: token.clone(),
            });
        }
    }
    None
}

fn match_pk_lookup(tokens: &[Token]) -> Option<Classification> {
    if tokens.len() == 8
        && is_word(&tokens[0], "SELECT")
        && is_symbol(&tokens[1], "*")
        && is_word(&tokens[2], "FROM")
        && is_word(&tokens[4], "WHERE")
        && is_symbol(&tokens[6], "=")
    {
        let table = word_text(&tokens[3])?.to_string();
        let column = word_text(&tokens[5])?.to_string();
        if let Token::StringLit(value) = &tokens[7] {
            if table.eq_ignore_ascii_case(USERS_TABLE) && column.eq_ignore_ascii_case(USERS_PRIMARY_KEY)
            {
                return Some(Classification::PkLookup {
                    table,
                    column,
                    value: value.clone(),
                });
            }
        }
    }
    None
}

fn match_full_scan(tokens: &[Token]) -> Option<Classification> {
    if tokens.len() == 4
        && is_word(&tokens[0], "SELECT")
        && is_symbol(&tokens[1], "*")
        && is_word(&tokens[2], "FROM")
    {
        let table = word_text(&tokens[3])?.to_string();
        if table.eq_ignore_ascii_case(USERS_TABLE) {
            return Some(Classification::FullScan { table });
        }
    }
    None
}

fn match_noop(tokens: &[Token]) -> Option<Classification> {
    if tokens.is_empty() {
        return None;
    }
    if is_word(&tokens[0], "SET") || is_word(&tokens[0], "USE") {
        return Some(Classification::Noop);
    }
    if tokens.len() >= 2 && is_word(&tokens[0], "SHOW") && is_word(&tokens[1], "VARIABLES") {
        return Some(Classification::Noop);
    }
    if tokens.len() == 2 && is_word(&tokens[0], "SELECT") {
        if let Token::Number(n) = &tokens[1] {
            if n == "1" {
                return Some(Classification::Noop);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_version_query() {
        assert_eq!(classify("SELECT @@version"), Classification::Version);
        assert_eq!(classify("select @@version;"), Classification::Version);
    }

    #[test]
    fn classifies_show_tables() {
        assert_eq!(classify("SHOW TABLES"), Classification::ShowTables);
    }

    #[test]
    fn classifies_describe_users() {
        assert_eq!(classify("DESC users"), Classification::DescribeUsers);
        assert_eq!(classify("DESCRIBE users"), Classification::DescribeUsers);
    }

    #[test]
    fn classifies_pk_lookup() {
        assert_eq!(
            classify("SELECT * FROM users WHERE id = 'u001'"),
            Classification::PkLookup {
                table: "users".into(),
                column: "id".into(),
                value: "u001".into(),
            }
        );
    }

    #[test]
    fn classifies_full_scan() {
        assert_eq!(
            classify("SELECT * FROM users"),
            Classification::FullScan {
                table: "users".into()
            }
        );
    }

    #[test]
    fn rejects_full_scan_of_unknown_table() {
        assert_eq!(
            classify("SELECT * FROM other_table"),
            Classification::Rejected
        );
    }

    #[test]
    fn classifies_token_verify() {
        assert_eq!(
            classify("SELECT qr_verify('abc123')"),
            Classification::TokenVerify {
                token: "abc123".into()
            }
        );
    }

    #[test]
    fn classifies_session_chatter_as_noop() {
        assert_eq!(classify("SET NAMES utf8mb4"), Classification::Noop);
        assert_eq!(classify("USE mydb"), Classification::Noop);
        assert_eq!(classify("SELECT 1"), Classification::Noop);
        assert_eq!(
            classify("SHOW VARIABLES LIKE 'version'"),
            Classification::Noop
        );
    }

    #[test]
    fn rejects_queries_with_forbidden_tokens() {
        for bad in [
            "SELECT * FROM users WHERE id = 'u001' AND name = 'Alice'",
            "SELECT * FROM users WHERE id = 'u001' OR id = 'u002'",
            "SELECT * FROM users ORDER BY id",
            "SELECT * FROM users LIMIT 1",
            "SELECT * FROM users WHERE id IN ('u001')",
            "SELECT * FROM users WHERE name LIKE 'A%'",
            "INSERT INTO users (id) VALUES ('u001')",
            "UPDATE users SET name = 'x' WHERE id = 'u001'",
            "DELETE FROM users WHERE id = 'u001'",
            "DROP TABLE users",
            "SELECT * FROM users WHERE id > 'u001'",
        ] {
            assert_eq!(classify(bad), Classification::Rejected, "{bad}");
        }
    }

    #[test]
    fn rejects_stacked_queries() {
        assert_eq!(
            classify("SELECT * FROM users; DROP TABLE users;"),
            Classification::Rejected
        );
    }

    #[test]
    fn forbidden_words_inside_string_literals_do_not_trigger_rejection() {
        assert_eq!(
            classify("SELECT * FROM users WHERE id = 'AND OR LIMIT'"),
            Classification::PkLookup {
                table: "users".into(),
                column: "id".into(),
                value: "AND OR LIMIT".into(),
            }
        );
    }

    #[test]
    fn rejects_unrecognised_queries_by_default() {
        assert_eq!(classify("SELECT id, name FROM users"), Classification::Rejected);
        assert_eq!(classify("SELECT now()"), Classification::Rejected);
        assert_eq!(
            classify("SELECT * FROM (SELECT * FROM users) t"),
            Classification::Rejected
        );
    }
}
