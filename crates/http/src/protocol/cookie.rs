//! `Cookie` request header parsing, including the RFC 2965 `$Version`,
//! `$Path` and `$Domain` attributes.

use super::quality::split_quoted;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    version: u32,
    path: Option<String>,
    domain: Option<String>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), version: 0, path: None, domain: None }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// The cookies a request carried, exposed to handlers as a request extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies(Vec<Cookie>);

impl Cookies {
    /// Collects the cookies of every `Cookie` header value; a later cookie
    /// replaces an earlier one of the same name.
    pub fn parse<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut cookies: Vec<Cookie> = Vec::new();
        for cookie in values.into_iter().flat_map(parse) {
            match cookies.iter_mut().find(|existing| existing.name == cookie.name) {
                Some(existing) => *existing = cookie,
                None => cookies.push(cookie),
            }
        }
        Self(cookies)
    }

    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.0.iter().find(|cookie| cookie.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parses one `Cookie` header value. `$Version` applies to the cookies that
/// follow it, `$Path` and `$Domain` to the cookie before them.
pub fn parse(header: &str) -> Vec<Cookie> {
    let mut version = 0;
    let mut cookies: Vec<Cookie> = Vec::new();

    for attribute in split_quoted(header, ';').flat_map(|part| split_quoted(part, ',')) {
        let attribute = attribute.trim();
        if attribute.is_empty() {
            continue;
        }

        let (name, value) = match attribute.split_once('=') {
            Some((name, value)) => (name.trim(), unquote(value.trim())),
            None => (attribute, String::new()),
        };

        if let Some(special) = name.strip_prefix('$') {
            if special.eq_ignore_ascii_case("version") {
                version = value.parse().unwrap_or(0);
            } else if special.eq_ignore_ascii_case("path") {
                if let Some(last) = cookies.last_mut() {
                    last.path = Some(value);
                }
            } else if special.eq_ignore_ascii_case("domain") {
                if let Some(last) = cookies.last_mut() {
                    last.domain = Some(value);
                }
            }
            continue;
        }

        if !name.is_empty() {
            cookies.push(Cookie { name: name.to_owned(), value, version, path: None, domain: None });
        }
    }

    cookies
}

fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|value| value.strip_suffix('"')) else {
        return value.to_owned();
    };

    let mut text = String::with_capacity(inner.len());
    let mut escaped = false;
    for ch in inner.chars() {
        if ch == '\\' && !escaped {
            escaped = true;
            continue;
        }
        escaped = false;
        text.push(ch);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_pairs() {
        let cookies = parse("session=abc123; theme=dark");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name(), "session");
        assert_eq!(cookies[0].value(), "abc123");
        assert_eq!(cookies[1].to_string(), "theme=dark");
        assert_eq!(cookies[1].version(), 0);
    }

    #[test]
    fn rfc2965_attributes() {
        let cookies = parse(r#"$Version="1"; Customer="WILE_E_COYOTE"; $Path="/acme"; Part="Rocket"; $Domain=".acme.com""#);
        assert_eq!(cookies.len(), 2);

        assert_eq!(cookies[0].name(), "Customer");
        assert_eq!(cookies[0].value(), "WILE_E_COYOTE");
        assert_eq!(cookies[0].version(), 1);
        assert_eq!(cookies[0].path(), Some("/acme"));
        assert_eq!(cookies[0].domain(), None);

        assert_eq!(cookies[1].value(), "Rocket");
        assert_eq!(cookies[1].domain(), Some(".acme.com"));
    }

    #[test]
    fn quoted_value_keeps_separators() {
        let cookies = parse(r#"note="a; b, \"c\"""#);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].value(), r#"a; b, "c""#);
    }

    #[test]
    fn later_cookie_wins() {
        let cookies = Cookies::parse(["id=1; lang=en", "id=2"]);
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies.get("id").map(Cookie::value), Some("2"));
        assert!(cookies.get("missing").is_none());
    }
}
