//! HTTP date handling, RFC 7231 section 7.1.1.1.

use std::time::SystemTime;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Parses any of the three date formats HTTP/1.1 recipients must accept.
pub fn parse_http_date(text: &str) -> Option<SystemTime> {
    // Sun, 06 Nov 1994 08:49:37 GMT
    let imf_fixdate =
        format_description!("[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT");
    // Sun Nov  6 08:49:37 1994
    let asctime =
        format_description!("[weekday repr:short] [month repr:short] [day padding:space] [hour]:[minute]:[second] [year]");
    // Sunday, 06-Nov-1994 08:49:37 GMT, once the two digit year is widened
    let rfc_850 = format_description!("[weekday], [day]-[month repr:short]-[year] [hour]:[minute]:[second] GMT");

    let text = text.trim();
    let parsed = PrimitiveDateTime::parse(text, imf_fixdate)
        .or_else(|_e| PrimitiveDateTime::parse(text, asctime))
        .ok()
        .or_else(|| widen_rfc850_year(text).and_then(|text| PrimitiveDateTime::parse(&text, rfc_850).ok()))?;

    Some(parsed.assume_utc().into())
}

/// Formats `time` as an IMF-fixdate, the only format senders may generate.
pub fn format_http_date(time: SystemTime) -> String {
    let imf_fixdate =
        format_description!("[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT");
    OffsetDateTime::from(time).format(imf_fixdate).unwrap_or_default()
}

/// `06-Nov-94` becomes `06-Nov-1994`; years below 70 are taken as 20xx.
fn widen_rfc850_year(text: &str) -> Option<String> {
    let (weekday, rest) = text.split_once(", ")?;
    let (date, time) = rest.split_once(' ')?;
    let (day_month, year) = date.rsplit_once('-')?;

    if year.len() != 2 || !year.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let century = if year < "70" { "20" } else { "19" };
    Some(format!("{weekday}, {day_month}-{century}{year} {time}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // Sun, 06 Nov 1994 08:49:37 GMT
    const EXPECTED: u64 = 784_111_777;

    fn expected() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(EXPECTED)
    }

    #[test]
    fn parses_all_formats() {
        assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT"), Some(expected()));
        assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"), Some(expected()));
        assert_eq!(parse_http_date("Sun Nov  6 08:49:37 1994"), Some(expected()));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_http_date("yesterday"), None);
        assert_eq!(parse_http_date("Sun, 32 Nov 1994 08:49:37 GMT"), None);
    }

    #[test]
    fn formats_imf_fixdate() {
        assert_eq!(format_http_date(expected()), "Sun, 06 Nov 1994 08:49:37 GMT");
    }
}
