//! Quality ordered header lists such as `Accept` or `Accept-Language`.

/// Splits comma separated header values into tokens ordered by their `q`
/// parameter, highest first.
///
/// The `;q=` segment is stripped from each token, every other parameter is
/// kept verbatim. Tokens of equal quality keep their original order, tokens
/// with `q=0` are dropped. Commas inside quoted strings do not split.
pub fn ordered<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tokens: Vec<(u16, String)> = values
        .into_iter()
        .flat_map(|value| split_quoted(value, ','))
        .filter_map(|token| {
            let (quality, text) = strip_quality(token);
            (quality > 0 && !text.is_empty()).then_some((quality, text))
        })
        .collect();

    tokens.sort_by(|left, right| right.0.cmp(&left.0));
    tokens.into_iter().map(|(_, token)| token).collect()
}

/// Splits `value` on `separator` outside double quoted strings.
pub(crate) fn split_quoted(value: &str, separator: char) -> impl Iterator<Item = &str> {
    let mut quoted = false;
    let mut escaped = false;
    let mut start = 0;
    let mut parts = Vec::new();

    for (index, ch) in value.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            _ if ch == separator && !quoted => {
                parts.push(&value[start..index]);
                start = index + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts.into_iter()
}

/// Returns the quality in thousandths and the token without its `q` segment.
fn strip_quality(token: &str) -> (u16, String) {
    let mut quality = 1000;
    let mut text = String::with_capacity(token.len());

    for (index, segment) in split_quoted(token, ';').enumerate() {
        if index > 0 {
            if let Some(q) = quality_param(segment) {
                quality = q;
                continue;
            }
            text.push(';');
        }
        text.push_str(segment);
    }

    (quality, text.trim().to_owned())
}

fn quality_param(segment: &str) -> Option<u16> {
    let segment = segment.trim();
    let value = segment.strip_prefix("q=").or_else(|| segment.strip_prefix("Q="))?;
    Some(parse_qvalue(value.trim()))
}

/// `qvalue = ( "0" [ "." 0*3DIGIT ] ) / ( "1" [ "." 0*3("0") ] )`, read
/// leniently: digits are taken until the first other byte.
fn parse_qvalue(value: &str) -> u16 {
    let mut bytes = value.bytes();
    let whole = match bytes.next() {
        Some(digit @ b'0'..=b'9') => u16::from(digit - b'0'),
        _ => return 0,
    };
    if whole >= 1 {
        return 1000;
    }

    if bytes.next() != Some(b'.') {
        return 0;
    }

    let mut quality = 0;
    let mut scale = 100;
    for byte in bytes.take(3) {
        if !byte.is_ascii_digit() {
            break;
        }
        quality += u16::from(byte - b'0') * scale;
        scale /= 10;
    }
    quality
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_quality() {
        let values = ordered(["image/gif;q=1.0,image/jpeg;q=0.8,image/png;q=1.0,*;q=0.1"]);
        assert_eq!(values, vec!["image/gif", "image/png", "image/jpeg", "*"]);
    }

    #[test]
    fn missing_quality_is_one() {
        let values = ordered(["en-US;q=0.5", "fr, de;q=0.9"]);
        assert_eq!(values, vec!["fr", "de", "en-US"]);
    }

    #[test]
    fn zero_quality_is_dropped() {
        let values = ordered(["gzip;q=0, br, identity;q=0.000"]);
        assert_eq!(values, vec!["br"]);
    }

    #[test]
    fn other_parameters_are_kept() {
        let values = ordered(["text/html; level=1;q=0.4, text/plain"]);
        assert_eq!(values, vec!["text/plain", "text/html; level=1"]);
    }

    #[test]
    fn quoted_commas_do_not_split() {
        let values = ordered([r#"a;title="x, y";q=0.5, b"#]);
        assert_eq!(values, vec!["b", r#"a;title="x, y""#]);
    }

    #[test]
    fn qvalue_digits() {
        assert_eq!(parse_qvalue("0.125"), 125);
        assert_eq!(parse_qvalue("0.5"), 500);
        assert_eq!(parse_qvalue("1"), 1000);
        assert_eq!(parse_qvalue("0"), 0);
        assert_eq!(parse_qvalue("abc"), 0);
    }
}
