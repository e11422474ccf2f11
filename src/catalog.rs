//! CSW catalog client.
//!
//! The reconciliation engine talks to the catalog through the [`Catalog`]
//! trait, which returns raw response text. [`CswClient`] implements it over
//! HTTP with a blocking `reqwest` client: every call is an authenticated
//! POST of an OGC CSW 2.0.2 request body.
//!
//! # Endpoints
//!
//! | Call | Request | URL |
//! |------|---------|-----|
//! | `search` | `GetRecords` filtered on `orgName` | `catalog.search_path` |
//! | `insert` | `Transaction/Insert` | `catalog.publication_path` |
//! | `update` | `Transaction/Update` + identifier constraint | `catalog.publication_path` |
//! | `delete` | `Transaction/Delete` + identifier constraint | `catalog.publication_path` |

use std::time::Duration;

use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::Event;
use tracing::debug;

use crate::config::Config;
use crate::error::{CatalogResult, PushError};
use crate::extract;

/// Transaction summary markers for each kind of mutation.
pub const TOTAL_INSERTED: &str = "totalInserted";
pub const TOTAL_UPDATED: &str = "totalUpdated";
pub const TOTAL_DELETED: &str = "totalDeleted";

/// A remote metadata catalog.
///
/// Implementations map any transport failure or non-2xx status to
/// [`PushError::Transport`]. Interpreting the response body is left to the
/// caller.
pub trait Catalog {
    /// One page of the organisation's records, starting at the 1-based
    /// `start_position`.
    fn search(&self, organisation: &str, start_position: u32) -> CatalogResult<String>;

    fn insert(&self, document: &str) -> CatalogResult<String>;

    /// Replace the record carrying `identifier` with `document`.
    fn update(&self, document: &str, identifier: &str) -> CatalogResult<String>;

    fn delete(&self, identifier: &str) -> CatalogResult<String>;
}

/// HTTP implementation of [`Catalog`].
pub struct CswClient {
    http: reqwest::blocking::Client,
    search_url: String,
    publication_url: String,
    user: String,
    password: String,
    page_size: u32,
}

impl CswClient {
    pub fn from_config(config: &Config) -> Result<Self, PushError> {
        let password = config.catalog_password()?;
        let http = reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(!config.catalog.verify_tls)
            .timeout(Duration::from_secs(config.catalog.timeout_secs))
            .user_agent(concat!("mdpush/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PushError::ConfigMissing(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            search_url: config.catalog.search_url(),
            publication_url: config.catalog.publication_url(),
            user: config.catalog.user.clone(),
            password,
            page_size: config.catalog.page_size,
        })
    }

    fn post(&self, url: &str, body: String) -> CatalogResult<String> {
        debug!("POST {} ({} bytes)", url, body.len());
        let resp = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .basic_auth(&self.user, Some(&self.password))
            .body(body)
            .send()?;

        let status = resp.status();
        let text = resp.text()?;
        if !status.is_success() {
            return Err(PushError::Transport(format!(
                "HTTP {}: {}",
                status,
                text.chars().take(500).collect::<String>()
            )));
        }
        Ok(text)
    }
}

impl Catalog for CswClient {
    fn search(&self, organisation: &str, start_position: u32) -> CatalogResult<String> {
        let body = get_records_request(organisation, start_position, self.page_size);
        self.post(&self.search_url, body)
    }

    fn insert(&self, document: &str) -> CatalogResult<String> {
        self.post(&self.publication_url, insert_request(document))
    }

    fn update(&self, document: &str, identifier: &str) -> CatalogResult<String> {
        self.post(&self.publication_url, update_request(document, identifier))
    }

    fn delete(&self, identifier: &str) -> CatalogResult<String> {
        self.post(&self.publication_url, delete_request(identifier))
    }
}

// ============ Request bodies ============

/// `GetRecords` for full ISO records of one organisation.
pub fn get_records_request(organisation: &str, start_position: u32, max_records: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<csw:GetRecords xmlns:csw="http://www.opengis.net/cat/csw/2.0.2" xmlns:ogc="http://www.opengis.net/ogc" xmlns:gmd="http://www.isotc211.org/2005/gmd" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:apiso="http://www.opengis.net/cat/csw/apiso/1.0" service="CSW" version="2.0.2" resultType="results" startPosition="{start}" maxRecords="{max}" outputSchema="http://www.isotc211.org/2005/gmd" outputFormat="application/xml">
<csw:Query typeNames="gmd:MD_Metadata">
<csw:ElementSetName>full</csw:ElementSetName>
<csw:Constraint version="1.1.0">
<ogc:Filter>
<ogc:PropertyIsEqualTo>
<ogc:PropertyName>orgName</ogc:PropertyName>
<ogc:Literal>{org}</ogc:Literal>
</ogc:PropertyIsEqualTo>
</ogc:Filter>
</csw:Constraint>
</csw:Query>
</csw:GetRecords>"#,
        start = start_position,
        max = max_records,
        org = escape(organisation),
    )
}

pub fn insert_request(document: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<csw:Transaction service="CSW" version="2.0.2" xmlns:csw="http://www.opengis.net/cat/csw/2.0.2">
<csw:Insert>
{document}
</csw:Insert>
</csw:Transaction>
"#
    )
}

pub fn update_request(document: &str, identifier: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<csw:Transaction xmlns:csw="http://www.opengis.net/cat/csw/2.0.2" xmlns:ogc="http://www.opengis.net/ogc" xmlns:dc="http://www.purl.org/dc/elements/1.1/" version="2.0.2" service="CSW">
<csw:Update>
{document}
{constraint}
</csw:Update>
</csw:Transaction>
"#,
        constraint = identifier_constraint(identifier),
    )
}

pub fn delete_request(identifier: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<csw:Transaction xmlns:csw="http://www.opengis.net/cat/csw/2.0.2" xmlns:ogc="http://www.opengis.net/ogc" xmlns:dc="http://www.purl.org/dc/elements/1.1/" version="2.0.2" service="CSW">
<csw:Delete typeName="csw:Record">
{constraint}
</csw:Delete>
</csw:Transaction>
"#,
        constraint = identifier_constraint(identifier),
    )
}

fn identifier_constraint(identifier: &str) -> String {
    format!(
        r#"<csw:Constraint version="2.0.0">
<ogc:Filter>
<ogc:PropertyIsEqualTo>
<ogc:PropertyName>/csw:Record/dc:identifier</ogc:PropertyName>
<ogc:Literal>{}</ogc:Literal>
</ogc:PropertyIsEqualTo>
</ogc:Filter>
</csw:Constraint>"#,
        escape(identifier)
    )
}

// ============ Responses ============

/// Paging attributes of a `csw:SearchResults` element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub matched: u32,
    pub returned: u32,
    /// `None` when the catalog leaves `nextRecord` out.
    pub next_record: Option<u32>,
}

impl SearchPage {
    /// Start position of the page after this one, or `None` when this page
    /// was the last.
    pub fn next_start(&self, start: u32) -> Option<u32> {
        if self.returned == 0 {
            return None;
        }
        let next = match self.next_record {
            Some(0) => return None,
            Some(next) => next,
            None => start.saturating_add(self.returned),
        };
        (next > start && next <= self.matched).then_some(next)
    }
}

/// Read the paging attributes of the first `SearchResults` element.
pub fn parse_search_results(xml: &str) -> Option<SearchPage> {
    let mut reader = quick_xml::Reader::from_reader(xml.as_bytes());
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"SearchResults" =>
            {
                let mut page = SearchPage::default();
                for attr in e.attributes().flatten() {
                    match attr.key.local_name().as_ref() {
                        b"numberOfRecordsMatched" => page.matched = attr_u32(&attr)?,
                        b"numberOfRecordsReturned" => page.returned = attr_u32(&attr)?,
                        b"nextRecord" => page.next_record = attr_u32(&attr),
                        _ => {}
                    }
                }
                return Some(page);
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

fn attr_u32(attr: &Attribute) -> Option<u32> {
    std::str::from_utf8(&attr.value).ok()?.trim().parse().ok()
}

/// Text of an OWS exception report, if the response is one.
pub fn exception_text(response: &str) -> Option<&str> {
    extract::extract_value(response, "ExceptionReport", "ExceptionText")
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

/// Check that a transaction response reports exactly one affected record.
pub fn expect_single(response: &str, marker: &str) -> CatalogResult<()> {
    match extract::affected_count(response, marker) {
        Some(1) => Ok(()),
        Some(n) => Err(PushError::NoEffect(format!("{} = {}", marker, n))),
        None => Err(PushError::NoEffect(match exception_text(response) {
            Some(text) => format!("{} missing, catalog said: {}", marker, text),
            None => format!("{} missing from response", marker),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<csw:GetRecordsResponse xmlns:csw="http://www.opengis.net/cat/csw/2.0.2">
  <csw:SearchStatus timestamp="2019-12-03T10:00:00" />
  <csw:SearchResults numberOfRecordsMatched="25" numberOfRecordsReturned="10" elementSet="full" nextRecord="11">
  </csw:SearchResults>
</csw:GetRecordsResponse>"#;

    #[test]
    fn search_results_attributes() {
        let page = parse_search_results(SEARCH_PAGE).unwrap();
        assert_eq!(
            page,
            SearchPage {
                matched: 25,
                returned: 10,
                next_record: Some(11)
            }
        );
        assert_eq!(page.next_start(1), Some(11));
    }

    #[test]
    fn empty_search_results_element() {
        let xml = r#"<GetRecordsResponse><SearchResults numberOfRecordsMatched="0" numberOfRecordsReturned="0" nextRecord="0"/></GetRecordsResponse>"#;
        let page = parse_search_results(xml).unwrap();
        assert_eq!(page.matched, 0);
        assert_eq!(page.next_start(1), None);
    }

    #[test]
    fn exception_report_has_no_results() {
        let xml = r#"<ows:ExceptionReport><ows:Exception exceptionCode="NoApplicableCode"><ows:ExceptionText>Access denied</ows:ExceptionText></ows:Exception></ows:ExceptionReport>"#;
        assert_eq!(parse_search_results(xml), None);
        assert_eq!(exception_text(xml), Some("Access denied"));
    }

    #[test]
    fn paging_stops_at_last_page() {
        let last = SearchPage {
            matched: 25,
            returned: 5,
            next_record: Some(0),
        };
        assert_eq!(last.next_start(21), None);

        let no_next = SearchPage {
            matched: 25,
            returned: 10,
            next_record: None,
        };
        assert_eq!(no_next.next_start(11), Some(21));
        assert_eq!(no_next.next_start(21), None);
    }

    #[test]
    fn paging_never_moves_backwards() {
        let stuck = SearchPage {
            matched: 25,
            returned: 10,
            next_record: Some(1),
        };
        assert_eq!(stuck.next_start(1), None);
    }

    #[test]
    fn search_request_carries_paging_and_org() {
        let body = get_records_request("Noord & Zuid", 11, 10);
        assert!(body.contains(r#"startPosition="11""#));
        assert!(body.contains(r#"maxRecords="10""#));
        assert!(body.contains("<ogc:Literal>Noord &amp; Zuid</ogc:Literal>"));
    }

    #[test]
    fn update_request_wraps_document_and_constraint() {
        let body = update_request("<gmd:MD_Metadata/>", "abc-1");
        let doc = body.find("<gmd:MD_Metadata/>").unwrap();
        let constraint = body.find("<csw:Constraint").unwrap();
        assert!(doc < constraint);
        assert!(body.contains("<ogc:Literal>abc-1</ogc:Literal>"));
        assert!(body.contains("<csw:Update>"));
    }

    #[test]
    fn delete_request_targets_identifier() {
        let body = delete_request("abc-1");
        assert!(body.contains(r#"<csw:Delete typeName="csw:Record">"#));
        assert!(body.contains("<ogc:Literal>abc-1</ogc:Literal>"));
    }

    #[test]
    fn single_record_transactions() {
        let ok = "<csw:TransactionResponse><csw:TransactionSummary><csw:totalInserted>1</csw:totalInserted></csw:TransactionSummary></csw:TransactionResponse>";
        assert!(expect_single(ok, TOTAL_INSERTED).is_ok());

        let zero = ok.replace(">1<", ">0<");
        assert!(matches!(
            expect_single(&zero, TOTAL_INSERTED),
            Err(PushError::NoEffect(_))
        ));

        let err = expect_single("<html>proxy error</html>", TOTAL_DELETED).unwrap_err();
        assert!(matches!(err, PushError::NoEffect(_)));
        assert!(err.to_string().contains("totalDeleted missing"));
    }
}
