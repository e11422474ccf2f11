//! Substring-based value extraction from raw metadata XML.
//!
//! Nothing here parses XML. Values are found by searching for marker
//! substrings, which keeps scanning a large directory cheap and tolerates
//! documents a strict parser would reject. A reordered or malformed document
//! can yield a wrong value; callers treat `None` as "field absent".

/// Markers locating the record identifier.
pub const IDENTIFIER_TAGS: (&str, &str) = ("fileIdentifier", "CharacterString");
/// Markers locating the metadata modification date.
pub const DATE_STAMP_TAGS: (&str, &str) = ("dateStamp", "Date");

/// Extract the text value following `close_tag` inside `open_tag`.
///
/// 1. `open_tag` must occur at an offset greater than zero.
/// 2. `close_tag` must occur after the start of `open_tag`.
/// 3. The value starts after the next `>` (skipping attributes) and runs up
///    to the next `<`.
///
/// ```
/// use metadata_push::extract::extract_value;
///
/// assert_eq!(extract_value("<a><b>42</b></a>", "a", "b"), Some("42"));
/// assert_eq!(extract_value("<a></a>", "x", "y"), None);
/// ```
pub fn extract_value<'a>(text: &'a str, open_tag: &str, close_tag: &str) -> Option<&'a str> {
    let open = text.find(open_tag).filter(|&pos| pos > 0)?;
    let close = open + text[open..].find(close_tag).filter(|&rel| rel > 0)?;
    let value_start = close + text[close..].find('>')? + 1;
    let value_len = text[value_start..].find('<')?;
    Some(&text[value_start..value_start + value_len])
}

/// Record identifier (`fileIdentifier`), trimmed. Empty values count as absent.
pub fn identifier(text: &str) -> Option<&str> {
    non_empty(extract_value(text, IDENTIFIER_TAGS.0, IDENTIFIER_TAGS.1))
}

/// Metadata modification stamp (`dateStamp`), trimmed.
///
/// Records stamped with `gco:DateTime` instead of `gco:Date` resolve through
/// the same `Date` marker, since it is a prefix of `DateTime`.
pub fn modified_at(text: &str) -> Option<&str> {
    non_empty(extract_value(text, DATE_STAMP_TAGS.0, DATE_STAMP_TAGS.1))
}

/// Number of records a CSW transaction reports for `marker`
/// (`totalInserted`, `totalUpdated`, `totalDeleted`).
pub fn affected_count(response: &str, marker: &str) -> Option<u32> {
    extract_value(response, "TransactionSummary", marker)?
        .trim()
        .parse()
        .ok()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd">
  <gmd:fileIdentifier>
    <gco:CharacterString>0b5a1c2e-77aa-4c1d-9e3e-5f0d1a2b3c4d</gco:CharacterString>
  </gmd:fileIdentifier>
  <gmd:dateStamp>
    <gco:Date>2019-12-03</gco:Date>
  </gmd:dateStamp>
</gmd:MD_Metadata>"#;

    #[test]
    fn nested_value() {
        assert_eq!(extract_value("<a><b>42</b></a>", "a", "b"), Some("42"));
    }

    #[test]
    fn missing_tags() {
        assert_eq!(extract_value("<a></a>", "x", "y"), None);
        assert_eq!(extract_value("<a><c>1</c></a>", "a", "b"), None);
    }

    #[test]
    fn open_tag_at_offset_zero_is_not_found() {
        assert_eq!(extract_value("a<b>1</b>", "a", "b"), None);
    }

    #[test]
    fn close_tag_must_follow_open_tag() {
        // `b` appears only before `a`.
        assert_eq!(extract_value("<b>1</b><a></a>", "a", "b"), None);
    }

    #[test]
    fn attributes_are_skipped() {
        let xml = r#"<x><code codeList="list#CI">pointOfContact</code></x>"#;
        assert_eq!(extract_value(xml, "x", "code"), Some("pointOfContact"));
    }

    #[test]
    fn no_closing_bracket_is_absent() {
        assert_eq!(extract_value("<a><b", "a", "b"), None);
        assert_eq!(extract_value("<a><b>42", "a", "b"), None);
    }

    #[test]
    fn identifier_and_date() {
        assert_eq!(
            identifier(RECORD),
            Some("0b5a1c2e-77aa-4c1d-9e3e-5f0d1a2b3c4d")
        );
        assert_eq!(modified_at(RECORD), Some("2019-12-03"));
    }

    #[test]
    fn date_time_stamp() {
        let xml = "<r><dateStamp><gco:DateTime>2020-01-02T10:00:00</gco:DateTime></dateStamp></r>";
        assert_eq!(modified_at(xml), Some("2020-01-02T10:00:00"));
    }

    #[test]
    fn empty_identifier_is_absent() {
        let xml = "<r><fileIdentifier><gco:CharacterString>  </gco:CharacterString></fileIdentifier></r>";
        assert_eq!(identifier(xml), None);
    }

    #[test]
    fn transaction_summary_counts() {
        let response = r#"<csw:TransactionResponse xmlns:csw="http://www.opengis.net/cat/csw/2.0.2">
  <csw:TransactionSummary>
    <csw:totalInserted>1</csw:totalInserted>
    <csw:totalUpdated>0</csw:totalUpdated>
    <csw:totalDeleted>0</csw:totalDeleted>
  </csw:TransactionSummary>
</csw:TransactionResponse>"#;
        assert_eq!(affected_count(response, "totalInserted"), Some(1));
        assert_eq!(affected_count(response, "totalUpdated"), Some(0));
        assert_eq!(affected_count("<ows:ExceptionReport/>", "totalInserted"), None);
    }

    #[test]
    fn non_numeric_count_is_absent() {
        let response = "<r><TransactionSummary><totalDeleted>n/a</totalDeleted></TransactionSummary></r>";
        assert_eq!(affected_count(response, "totalDeleted"), None);
    }
}
