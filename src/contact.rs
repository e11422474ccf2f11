//! Contact-block rewriting.
//!
//! Replaces every responsible party (`CI_ResponsibleParty`) in an ISO-19139
//! record with one normalized organisation contact, without parsing the
//! document. Element boundaries are located by substring search and edited
//! through an [`EditBuffer`], so everything outside the rewritten blocks
//! keeps its exact bytes.
//!
//! # Algorithm
//!
//! 1. The first two `MD_DataIdentification` markers bound the identification
//!    span; the first two `MD_Distributor` markers bound the distributor
//!    span. Later occurrences are ignored: records carry one owner and one
//!    distributor.
//! 2. Quality-lineage processor contacts (`<processor>` elements) are
//!    removed entirely.
//! 3. The namespace convention is detected: `gmd:CI_ResponsibleParty`
//!    selects prefixed output, a bare `CI_ResponsibleParty` selects bare
//!    output. Without either, the record has no contact to normalize.
//! 4. Each responsible party is replaced by the normalized block plus a
//!    role code chosen by position: `owner` inside the identification span,
//!    `distributor` inside the distributor span, `pointOfContact` elsewhere.
//! 5. Only the first two `pointOfContact` blocks are kept; later ones are
//!    deleted, together with their property element when it becomes empty.

use quick_xml::escape::escape;

use crate::config::ContactInfo;
use crate::span::{EditBuffer, Span, SpanId};

pub const IDENTIFICATION_MARKER: &str = "MD_DataIdentification";
pub const DISTRIBUTOR_MARKER: &str = "MD_Distributor";
/// Matches both `<gmd:processor>` and `</gmd:processor>`, but not the
/// `processor` role code value.
pub const PROCESSOR_MARKER: &str = "processor>";
const PARTY_ELEMENT: &str = "CI_ResponsibleParty";
const GMD_PREFIX: &str = "gmd:";
const GCO_DECLARATION: &str = r#" xmlns:gco="http://www.isotc211.org/2005/gco""#;
const ROLE_CODE_LIST: &str = "./resources/codeList.xml#CI_RoleCode";

/// Number of `pointOfContact` blocks kept in a rewritten record.
pub const MAX_POINTS_OF_CONTACT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// ISO elements written as `gmd:name`.
    Prefixed,
    /// ISO elements written without prefix (default namespace).
    Bare,
}

impl Namespace {
    pub fn detect(text: &str) -> Option<Self> {
        if text.contains(&format!("{}{}", GMD_PREFIX, PARTY_ELEMENT)) {
            Some(Namespace::Prefixed)
        } else if text.contains(PARTY_ELEMENT) {
            Some(Namespace::Bare)
        } else {
            None
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Namespace::Prefixed => GMD_PREFIX,
            Namespace::Bare => "",
        }
    }

    fn gco_declaration(self) -> &'static str {
        match self {
            Namespace::Prefixed => GCO_DECLARATION,
            Namespace::Bare => "",
        }
    }

    fn party_marker(self) -> String {
        format!("{}{}", self.prefix(), PARTY_ELEMENT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleCode {
    Owner,
    Distributor,
    PointOfContact,
}

impl RoleCode {
    pub fn as_str(self) -> &'static str {
        match self {
            RoleCode::Owner => "owner",
            RoleCode::Distributor => "distributor",
            RoleCode::PointOfContact => "pointOfContact",
        }
    }

    /// Role for a block starting at `pos`. Identification wins over
    /// distributor when both spans contain the block.
    pub fn for_position(pos: usize, identification: Option<Span>, distributor: Option<Span>) -> Self {
        if identification.is_some_and(|span| span.strictly_contains(pos)) {
            RoleCode::Owner
        } else if distributor.is_some_and(|span| span.strictly_contains(pos)) {
            RoleCode::Distributor
        } else {
            RoleCode::PointOfContact
        }
    }
}

/// Rewrite every responsible party in `text` to the normalized `contact`.
///
/// Returns the text after processor removal unchanged when it contains no
/// responsible party at all.
pub fn rewrite_contacts(text: &str, contact: &ContactInfo) -> String {
    let mut buf = EditBuffer::new(text);
    let identification = track_first_pair(&mut buf, IDENTIFICATION_MARKER);
    let distributor = track_first_pair(&mut buf, DISTRIBUTOR_MARKER);

    for block in marker_blocks(&buf, PROCESSOR_MARKER).into_iter().rev() {
        buf.delete(block);
    }

    let Some(namespace) = Namespace::detect(buf.text()) else {
        return buf.into_string();
    };

    let body = contact_body(contact, namespace);
    let parties: Vec<SpanId> = marker_blocks(&buf, &namespace.party_marker())
        .into_iter()
        .map(|block| buf.track(block))
        .collect();

    let mut points_of_contact = Vec::new();
    for &party in parties.iter().rev() {
        let span = buf.span(party);
        let role = RoleCode::for_position(
            span.start,
            identification.map(|id| buf.span(id)),
            distributor.map(|id| buf.span(id)),
        );
        buf.replace(span, &party_block(&body, role, namespace));
        if role == RoleCode::PointOfContact {
            points_of_contact.push(party);
        }
    }

    // Collected last-to-first; keep the first ones in text order.
    let surplus = points_of_contact
        .len()
        .saturating_sub(MAX_POINTS_OF_CONTACT);
    for &party in &points_of_contact[..surplus] {
        remove_block(&mut buf, party);
    }

    buf.into_string()
}

/// Track the span between the first two occurrences of `marker`.
fn track_first_pair(buf: &mut EditBuffer, marker: &str) -> Option<SpanId> {
    match buf.find_all(marker).as_slice() {
        [open, close, ..] => Some(buf.track(Span::new(*open, *close))),
        _ => None,
    }
}

/// Full element ranges bracketed by `(open, close)` marker pairs, in text
/// order.
///
/// Markers are paired from the end of the text, so with an odd count the
/// leading marker (a comment or stray text ahead of the real elements) is
/// the unpaired one and is left alone. Each range runs from the `<`
/// preceding the open marker to the `>` closing the close marker.
fn marker_blocks(buf: &EditBuffer, marker: &str) -> Vec<Span> {
    let mut blocks: Vec<Span> = buf
        .find_all(marker)
        .rchunks_exact(2)
        .filter_map(|pair| {
            let start = buf.tag_start_before(pair[0])?;
            let end = buf.tag_end_after(pair[1])?;
            Some(Span::new(start, end))
        })
        .collect();
    blocks.reverse();
    blocks
}

/// Delete a rewritten block, and its parent element if nothing else is in it.
fn remove_block(buf: &mut EditBuffer, block: SpanId) {
    let span = buf.span(block);
    let range = empty_parent(buf.text(), span).unwrap_or(span);
    buf.delete(range);
}

/// Range of the element enclosing `span` when `span` is its only content
/// apart from whitespace.
fn empty_parent(text: &str, span: Span) -> Option<Span> {
    let before = text[..span.start].trim_end();
    if !before.ends_with('>') {
        return None;
    }
    let open_start = before.rfind('<')?;
    let open_tag = &before[open_start..];
    if open_tag.starts_with("</")
        || open_tag.starts_with("<?")
        || open_tag.starts_with("<!")
        || open_tag.ends_with("/>")
    {
        return None;
    }
    let name = open_tag[1..]
        .split(|c: char| c.is_whitespace() || c == '>')
        .next()
        .filter(|name| !name.is_empty())?;

    let after = &text[span.end..];
    let gap = after.len() - after.trim_start().len();
    let close_tag = format!("</{}>", name);
    if !after[gap..].starts_with(&close_tag) {
        return None;
    }
    Some(Span::new(open_start, span.end + gap + close_tag.len()))
}

/// Writes ISO elements with the namespace convention of the record.
struct BlockWriter {
    out: String,
    prefix: &'static str,
    gco: &'static str,
}

impl BlockWriter {
    fn new(namespace: Namespace) -> Self {
        Self {
            out: String::new(),
            prefix: namespace.prefix(),
            gco: namespace.gco_declaration(),
        }
    }

    fn open(&mut self, name: &str) {
        self.out.push_str(&format!("<{}{}>\n", self.prefix, name));
    }

    fn close(&mut self, name: &str) {
        self.out.push_str(&format!("</{}{}>\n", self.prefix, name));
    }

    /// `<name><gco:CharacterString>value</gco:CharacterString></name>`
    fn text(&mut self, name: &str, value: &str) {
        self.open(name);
        self.out.push_str(&format!(
            "<gco:CharacterString{}>{}</gco:CharacterString>\n",
            self.gco,
            escape(value)
        ));
        self.close(name);
    }

    fn optional_text(&mut self, name: &str, value: &Option<String>) {
        if let Some(value) = value {
            self.text(name, value);
        }
    }
}

/// Normalized block up to, not including, the role element.
fn contact_body(contact: &ContactInfo, namespace: Namespace) -> String {
    let mut w = BlockWriter::new(namespace);
    w.open(PARTY_ELEMENT);
    w.optional_text("organisationName", &contact.organisation);

    let has_address = [
        &contact.address,
        &contact.city,
        &contact.region,
        &contact.postal_code,
        &contact.country,
        &contact.email,
    ]
    .iter()
    .any(|field| field.is_some());

    if contact.phone.is_some() || has_address || contact.url.is_some() {
        w.open("contactInfo");
        w.open("CI_Contact");
        if let Some(ref phone) = contact.phone {
            w.open("phone");
            w.open("CI_Telephone");
            w.text("voice", phone);
            w.close("CI_Telephone");
            w.close("phone");
        }
        if has_address {
            w.open("address");
            w.open("CI_Address");
            w.optional_text("deliveryPoint", &contact.address);
            w.optional_text("city", &contact.city);
            w.optional_text("administrativeArea", &contact.region);
            w.optional_text("postalCode", &contact.postal_code);
            w.optional_text("country", &contact.country);
            w.optional_text("electronicMailAddress", &contact.email);
            w.close("CI_Address");
            w.close("address");
        }
        if let Some(ref url) = contact.url {
            w.open("onlineResource");
            w.open("CI_OnlineResource");
            w.open("linkage");
            w.out.push_str(&format!(
                "<{p}URL>{}</{p}URL>\n",
                escape(url.as_str()),
                p = w.prefix
            ));
            w.close("linkage");
            w.close("CI_OnlineResource");
            w.close("onlineResource");
        }
        w.close("CI_Contact");
        w.close("contactInfo");
    }
    w.out
}

/// Complete replacement for one responsible party.
fn party_block(body: &str, role: RoleCode, namespace: Namespace) -> String {
    let p = namespace.prefix();
    format!(
        "{body}<{p}role>\n<{p}CI_RoleCode codeList=\"{list}\" codeListValue=\"{role}\" />\n</{p}role>\n</{p}{party}>",
        body = body,
        p = p,
        list = ROLE_CODE_LIST,
        role = role.as_str(),
        party = PARTY_ELEMENT,
    )
}
