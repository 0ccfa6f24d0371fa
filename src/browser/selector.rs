//! Element selectors
//!
//! Turns the selector strings found in scenario definitions into something a
//! WebDriver endpoint understands. Plain CSS passes through untouched; the
//! `text=`, `testid=` and `:has-text(...)` shorthands are rewritten to CSS or
//! XPath because WebDriver has no native text matching.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::BrowserError;

/// A resolved element locator
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    /// Parse a selector string
    pub fn parse(raw: &str) -> Result<Self, BrowserError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(BrowserError::InvalidSelector("empty selector".to_string()));
        }

        if let Some(xpath) = raw.strip_prefix("xpath=") {
            return Ok(Selector::XPath(xpath.trim().to_string()));
        }
        if raw.starts_with("//") || raw.starts_with("(//") {
            return Ok(Selector::XPath(raw.to_string()));
        }
        if let Some(text) = raw.strip_prefix("text=") {
            return Ok(Self::text(unquote(text.trim())));
        }
        if let Some(id) = raw.strip_prefix("testid=") {
            return Ok(Self::test_id(unquote(id.trim())));
        }
        if let Some(idx) = raw.find(":has-text(") {
            let (prefix, rest) = raw.split_at(idx);
            let argument = rest[":has-text(".len()..]
                .strip_suffix(')')
                .ok_or_else(|| {
                    BrowserError::InvalidSelector(format!("unterminated :has-text in '{raw}'"))
                })?;
            let base = css_to_xpath(prefix)
                .map_err(|reason| BrowserError::InvalidSelector(format!("{raw}: {reason}")))?;
            return Ok(Selector::XPath(format!(
                "{base}[contains(normalize-space(.), {})]",
                xpath_literal(unquote(argument.trim()))
            )));
        }

        Ok(Selector::Css(raw.to_string()))
    }

    pub fn css(css: impl Into<String>) -> Self {
        Selector::Css(css.into())
    }

    /// Match on a `data-testid` attribute
    pub fn test_id(id: &str) -> Self {
        Selector::Css(format!("[data-testid=\"{id}\"]"))
    }

    /// Deepest element whose normalized text contains `text`
    pub fn text(text: &str) -> Self {
        let literal = xpath_literal(text);
        Selector::XPath(format!(
            "//*[contains(normalize-space(.), {literal}) and not(.//*[contains(normalize-space(.), {literal})])]"
        ))
    }

    /// Raw locator expression
    pub fn expression(&self) -> &str {
        match self {
            Selector::Css(s) | Selector::XPath(s) => s,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css={s}"),
            Selector::XPath(s) => write!(f, "xpath={s}"),
        }
    }
}

fn unquote(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' || first == b'\'') && first == last {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Quote a string for use inside an XPath expression
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{s}'")
    } else if !s.contains('"') {
        format!("\"{s}\"")
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{p}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Convert a descendant/child chain of compound CSS selectors to XPath.
///
/// Supports tags, `*`, `.class`, `#id`, `[attr]`, `[attr=v]`, `[attr*=v]`
/// and `[attr^=v]`, joined by whitespace or `>`.
fn css_to_xpath(css: &str) -> Result<String, String> {
    let tokens = split_combinators(css)?;
    if tokens.is_empty() {
        return Ok("//*".to_string());
    }

    let mut xpath = String::new();
    let mut child = false;
    for token in tokens {
        if token == ">" {
            if xpath.is_empty() || child {
                return Err("dangling '>' combinator".to_string());
            }
            child = true;
            continue;
        }
        xpath.push_str(if child { "/" } else { "//" });
        xpath.push_str(&compound_to_xpath(&token)?);
        child = false;
    }
    if child {
        return Err("dangling '>' combinator".to_string());
    }
    Ok(xpath)
}

fn split_combinators(css: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in css.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    current.push(c);
                }
                '[' => {
                    depth += 1;
                    current.push(c);
                }
                ']' => {
                    depth = depth.checked_sub(1).ok_or("unbalanced ']'")?;
                    current.push(c);
                }
                '>' if depth == 0 => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                    tokens.push(">".to_string());
                }
                c if c.is_whitespace() && depth == 0 => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                }
                _ => current.push(c),
            },
        }
    }

    if quote.is_some() || depth != 0 {
        return Err("unbalanced brackets or quotes".to_string());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn compound_to_xpath(compound: &str) -> Result<String, String> {
    let chars: Vec<char> = compound.chars().collect();
    let mut i = 0;

    let mut tag = String::new();
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '-' || chars[i] == '*')
    {
        tag.push(chars[i]);
        i += 1;
    }
    if tag.is_empty() {
        tag.push('*');
    }

    let mut predicates = Vec::new();
    while i < chars.len() {
        match chars[i] {
            '.' | '#' => {
                let marker = chars[i];
                i += 1;
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '-' || chars[i] == '_')
                {
                    i += 1;
                }
                if start == i {
                    return Err(format!("empty name after '{marker}'"));
                }
                let name: String = chars[start..i].iter().collect();
                predicates.push(if marker == '.' {
                    format!("contains(concat(' ', normalize-space(@class), ' '), ' {name} ')")
                } else {
                    format!("@id={}", xpath_literal(&name))
                });
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or("unterminated attribute selector")?;
                let body: String = chars[i + 1..i + close].iter().collect();
                predicates.push(attribute_predicate(&body)?);
                i += close + 1;
            }
            other => return Err(format!("unsupported selector syntax at '{other}'")),
        }
    }

    if predicates.is_empty() {
        Ok(tag)
    } else {
        Ok(format!("{tag}[{}]", predicates.join(" and ")))
    }
}

fn attribute_predicate(body: &str) -> Result<String, String> {
    let Some(eq) = body.find('=') else {
        let name = body.trim();
        if name.is_empty() {
            return Err("empty attribute selector".to_string());
        }
        return Ok(format!("@{name}"));
    };

    let (lhs, rhs) = body.split_at(eq);
    let value = unquote(rhs[1..].trim().trim_end_matches(" i").trim());
    let literal = xpath_literal(value);

    if let Some(name) = lhs.strip_suffix('*') {
        Ok(format!("contains(@{}, {literal})", name.trim()))
    } else if let Some(name) = lhs.strip_suffix('^') {
        Ok(format!("starts-with(@{}, {literal})", name.trim()))
    } else {
        Ok(format!("@{}={literal}", lhs.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_css_passes_through() {
        let sel = Selector::parse("[data-testid=\"login-email-input\"]").unwrap();
        assert_eq!(sel, Selector::css("[data-testid=\"login-email-input\"]"));
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(
            Selector::parse("testid=main-nav-system").unwrap(),
            Selector::css("[data-testid=\"main-nav-system\"]")
        );
        assert_eq!(
            Selector::parse("xpath=//div").unwrap(),
            Selector::XPath("//div".to_string())
        );
        assert!(matches!(
            Selector::parse("text=\"Create Repo\"").unwrap(),
            Selector::XPath(x) if x.contains("'Create Repo'")
        ));
    }

    #[test]
    fn test_has_text_with_tag() {
        let sel = Selector::parse("button:has-text(\"Sign In\")").unwrap();
        assert_eq!(
            sel,
            Selector::XPath("//button[contains(normalize-space(.), 'Sign In')]".to_string())
        );
    }

    #[test]
    fn test_has_text_with_descendant_chain() {
        let sel = Selector::parse(".ant-popconfirm button.ant-btn-dangerous:has-text('Yes')")
            .unwrap();
        let expected = "//*[contains(concat(' ', normalize-space(@class), ' '), ' ant-popconfirm ')]\
                        //button[contains(concat(' ', normalize-space(@class), ' '), ' ant-btn-dangerous ')]\
                        [contains(normalize-space(.), 'Yes')]";
        assert_eq!(sel.expression(), expected);
    }

    #[test]
    fn test_has_text_with_attribute() {
        let sel = Selector::parse("[role=\"dialog\"]:has-text(\"Queue Item Trace\")").unwrap();
        assert_eq!(
            sel.expression(),
            "//*[@role='dialog'][contains(normalize-space(.), 'Queue Item Trace')]"
        );
    }

    #[test]
    fn test_unsupported_has_text_prefix() {
        assert!(Selector::parse("tr:nth-child(2):has-text(\"x\")").is_err());
        assert!(Selector::parse("   ").is_err());
    }

    #[test]
    fn test_xpath_literal_quotes() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(
            xpath_literal("a'b\"c"),
            "concat('a', \"'\", 'b\"c')"
        );
    }
}
