//! Encoding and decoding of reference tags.
//!
//! Encoding is canonical: attributes always appear in the order
//! `k v i o s`, optional attributes are omitted when unset, the operator is
//! lowercase, and tags are concatenated with no separator. Decoding is
//! lenient about attribute order and whitespace but strict about everything
//! that makes a tag well-formed: a quoted value for every attribute, no
//! unknown or repeated attributes, `k` and `v` present, and a `/>` close.

use std::fmt::Write as _;
use std::ops::Range;

use quire_types::Owner;

use crate::error::{ManifestError, ManifestResult};
use crate::reference::{Reference, Source};

const TAG_OPEN: &str = "<ref";
const TAG_CLOSE: &str = "/>";

/// Characters that can never appear inside an attribute value.
const FORBIDDEN_VALUE_CHARS: &[char] = &['"', '<', '>'];

/// A well-formed reference tag found in a text, with its exact byte span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagSpan {
    pub range: Range<usize>,
    pub reference: Reference,
}

/// Encode references as concatenated tags.
pub fn encode(references: &[Reference]) -> ManifestResult<String> {
    let mut out = String::new();
    for reference in references {
        encode_one(&mut out, reference)?;
    }
    Ok(out)
}

fn encode_one(out: &mut String, reference: &Reference) -> ManifestResult<()> {
    check_value("k", &reference.hash)?;
    check_value("v", &reference.version)?;

    // Writing to a String cannot fail.
    let _ = write!(out, "<ref k=\"{}\" v=\"{}\"", reference.hash, reference.version);
    if let Some(index) = reference.index {
        let _ = write!(out, " i=\"{index}\"");
    }
    if let Some(operator) = &reference.operator {
        let _ = write!(out, " o=\"{}\"", operator.as_str());
    }
    if let Some(source) = reference.source.wire_value() {
        let _ = write!(out, " s=\"{source}\"");
    }
    out.push_str(" />");
    Ok(())
}

fn check_value(attribute: &'static str, value: &str) -> ManifestResult<()> {
    if value.is_empty() {
        return Err(ManifestError::InvalidAttribute {
            attribute,
            value: value.to_string(),
            reason: "must not be empty".into(),
        });
    }
    if let Some(ch) = value.chars().find(|c| FORBIDDEN_VALUE_CHARS.contains(c)) {
        return Err(ManifestError::InvalidAttribute {
            attribute,
            value: value.to_string(),
            reason: format!("contains forbidden character: {ch:?}"),
        });
    }
    Ok(())
}

/// Decode every well-formed tag in `text`, in encounter order.
///
/// Malformed tags and any text between tags are skipped.
pub fn decode(text: &str) -> Vec<Reference> {
    scan(text).map(|span| span.reference).collect()
}

/// Whether `text` contains at least one well-formed reference tag.
pub fn detect(text: &str) -> bool {
    scan(text).next().is_some()
}

/// Lazily find every well-formed tag in `text` with its byte span.
pub fn scan(text: &str) -> TagScanner<'_> {
    TagScanner { text, pos: 0 }
}

/// Iterator returned by [`scan`].
pub struct TagScanner<'a> {
    text: &'a str,
    pos: usize,
}

impl Iterator for TagScanner<'_> {
    type Item = TagSpan;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let start = self.pos + self.text[self.pos..].find(TAG_OPEN)?;
            match parse_tag(self.text, start) {
                Some((end, reference)) => {
                    self.pos = end;
                    return Some(TagSpan {
                        range: start..end,
                        reference,
                    });
                }
                None => self.pos = start + 1,
            }
        }
    }
}

#[derive(Default)]
struct Attributes<'a> {
    k: Option<&'a str>,
    v: Option<&'a str>,
    i: Option<&'a str>,
    o: Option<&'a str>,
    s: Option<&'a str>,
}

impl<'a> Attributes<'a> {
    /// Record one attribute. Unknown and repeated names are rejected.
    fn set(&mut self, name: &str, value: &'a str) -> Option<()> {
        let slot = match name {
            "k" => &mut self.k,
            "v" => &mut self.v,
            "i" => &mut self.i,
            "o" => &mut self.o,
            "s" => &mut self.s,
            _ => return None,
        };
        if slot.is_some() {
            return None;
        }
        *slot = Some(value);
        Some(())
    }

    fn into_reference(self) -> Option<Reference> {
        let hash = self.k.filter(|k| !k.is_empty())?;
        let version = self.v.filter(|v| !v.is_empty())?;
        let mut reference = Reference::new(hash, version);
        if let Some(index) = self.i {
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            reference.index = Some(index.parse().ok()?);
        }
        if let Some(operator) = self.o {
            reference.operator = Some(Owner::new(operator).ok()?);
        }
        if let Some(source) = self.s {
            reference.source = Source::from_wire(source)?;
        }
        Some(reference)
    }
}

/// Parse one tag starting at `start` (which points at `<ref`). Returns the
/// end offset of the tag and the decoded reference.
fn parse_tag(text: &str, start: usize) -> Option<(usize, Reference)> {
    let bytes = text.as_bytes();
    let mut pos = start + TAG_OPEN.len();
    if !bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
        return None;
    }

    let mut attributes = Attributes::default();
    loop {
        while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
            pos += 1;
        }
        if text[pos..].starts_with(TAG_CLOSE) {
            pos += TAG_CLOSE.len();
            break;
        }

        let name_start = pos;
        while bytes.get(pos).is_some_and(u8::is_ascii_lowercase) {
            pos += 1;
        }
        if pos == name_start {
            return None;
        }
        let name = &text[name_start..pos];

        if bytes.get(pos) != Some(&b'=') || bytes.get(pos + 1) != Some(&b'"') {
            return None;
        }
        pos += 2;
        let value_start = pos;
        let value_len = text[pos..].find(FORBIDDEN_VALUE_CHARS)?;
        pos += value_len;
        if bytes[pos] != b'"' {
            return None;
        }
        let value = &text[value_start..pos];
        pos += 1;
        attributes.set(name, value)?;

        // Attributes must be separated from each other, or followed by `/>`.
        match bytes.get(pos) {
            Some(b) if b.is_ascii_whitespace() => {}
            Some(b'/') => {}
            _ => return None,
        }
    }

    attributes.into_reference().map(|reference| (pos, reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn owner(id: &str) -> Owner {
        Owner::new(id).unwrap()
    }

    // -----------------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------------

    #[test]
    fn encodes_canonical_tag() {
        let refs = vec![Reference::new("0xAA", "0.0.1")
            .with_index(0)
            .with_operator(owner("0xOP"))];
        assert_eq!(
            encode(&refs).unwrap(),
            r#"<ref k="0xAA" v="0.0.1" i="0" o="0xop" />"#
        );
    }

    #[test]
    fn encodes_minimal_and_direct_tags_without_separators() {
        let refs = vec![
            Reference::new("0x01", "0.0.1"),
            Reference::new("0x02", "0.0.1").with_source(Source::Direct),
        ];
        assert_eq!(
            encode(&refs).unwrap(),
            r#"<ref k="0x01" v="0.0.1" /><ref k="0x02" v="0.0.1" s="d" />"#
        );
    }

    #[test]
    fn encodes_all_attributes_in_fixed_order() {
        let r = Reference::new("0x03", "1")
            .with_source(Source::Direct)
            .with_operator(owner("0xB"))
            .with_index(12);
        assert_eq!(
            encode(&[r]).unwrap(),
            r#"<ref k="0x03" v="1" i="12" o="0xb" s="d" />"#
        );
    }

    #[test]
    fn empty_reference_list_encodes_to_empty_text() {
        assert_eq!(encode(&[]).unwrap(), "");
        assert!(!detect(""));
    }

    #[test]
    fn rejects_unencodable_values() {
        let err = encode(&[Reference::new("0x\"1", "0.0.1")]).unwrap_err();
        assert!(matches!(
            err,
            ManifestError::InvalidAttribute { attribute: "k", .. }
        ));
        assert!(encode(&[Reference::new("0x01", "")]).is_err());
        assert!(encode(&[Reference::new("0x01", "<v>")]).is_err());
    }

    // -----------------------------------------------------------------------
    // Decoding
    // -----------------------------------------------------------------------

    #[test]
    fn decodes_with_optional_attributes_omitted() {
        let refs = decode(r#"<ref k="H1" v="0.0.1" />"#);
        assert_eq!(refs, vec![Reference::new("H1", "0.0.1")]);
    }

    #[test]
    fn decodes_in_encounter_order_ignoring_surrounding_text() {
        let text = r#"head <ref k="A" v="1" />middle<ref k="B" v="1" s="d" /> tail"#;
        let refs = decode(text);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].hash, "A");
        assert_eq!(refs[1].hash, "B");
        assert_eq!(refs[1].source, Source::Direct);
    }

    #[test]
    fn tolerates_attribute_order_and_whitespace() {
        let refs = decode("<ref  o=\"0xAB\"\ti=\"3\" v=\"2\"  k=\"K\"/>");
        assert_eq!(
            refs,
            vec![Reference::new("K", "2")
                .with_index(3)
                .with_operator(owner("0xab"))]
        );
    }

    #[test]
    fn requires_hash_and_version() {
        assert!(decode(r#"<ref v="0.0.1" />"#).is_empty());
        assert!(decode(r#"<ref k="A" />"#).is_empty());
        assert!(decode(r#"<ref k="" v="1" />"#).is_empty());
    }

    #[test]
    fn skips_malformed_tags() {
        for bad in [
            r#"<ref k="A" v="1">"#,
            r#"<ref k="A" v="1" x="2" />"#,
            r#"<ref k="A" k="B" v="1" />"#,
            r#"<ref k="A" v="1" i="-1" />"#,
            r#"<ref k="A" v="1" i="" />"#,
            r#"<ref k="A" v="1" s="c" />"#,
            r#"<ref k="A" v="1" o="" />"#,
            r#"<refk="A" v="1" />"#,
            r#"<ref k="A"v="1" />"#,
            r#"<ref k=A v="1" />"#,
            r#"<ref k="A v="1" />"#,
            r#"<reference k="A" v="1" />"#,
        ] {
            assert!(!detect(bad), "should not detect: {bad}");
        }
    }

    #[test]
    fn recovers_after_malformed_tag() {
        let text = r#"<ref k="A" <ref k="B" v="1" />"#;
        let spans: Vec<TagSpan> = scan(text).collect();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].reference.hash, "B");
        assert_eq!(&text[spans[0].range.clone()], r#"<ref k="B" v="1" />"#);
    }

    #[test]
    fn scan_reports_exact_spans() {
        let text = r#"ab<ref k="A" v="1" />cd"#;
        let span = scan(text).next().unwrap();
        assert_eq!(span.range, 2..text.len() - 2);
    }

    #[test]
    fn detect_distinguishes_manifests_from_leaf_content() {
        assert!(detect(r#"<ref k="A" v="1" />"#));
        assert!(!detect("plain leaf content"));
        assert!(!detect("<ref>not a tag</ref>"));
    }

    #[test]
    fn handles_multibyte_text_around_tags() {
        let text = "héllo <ref k=\"A\" v=\"1\" /> wörld";
        let span = scan(text).next().unwrap();
        assert_eq!(&text[span.range], "<ref k=\"A\" v=\"1\" />");
    }

    // -----------------------------------------------------------------------
    // Round-trip law
    // -----------------------------------------------------------------------

    fn attribute_value() -> impl Strategy<Value = String> {
        "[0-9a-zA-Z.x_ -]{1,24}"
    }

    fn reference() -> impl Strategy<Value = Reference> {
        (
            attribute_value(),
            attribute_value(),
            proptest::option::of(any::<u64>()),
            proptest::option::of("0x[0-9a-fA-F]{1,40}"),
            any::<bool>(),
        )
            .prop_map(|(hash, version, index, operator, direct)| Reference {
                hash,
                version,
                index,
                operator: operator.map(|o| Owner::new(o).unwrap()),
                source: if direct { Source::Direct } else { Source::Chunked },
            })
    }

    proptest! {
        #[test]
        fn decode_reverses_encode(refs in proptest::collection::vec(reference(), 0..8)) {
            let text = encode(&refs).unwrap();
            prop_assert_eq!(decode(&text), refs);
        }
    }
}
