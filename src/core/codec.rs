//! Translation between shipment data and the carrier's XML dialect.
//!
//! Requests are `<orders>` documents carrying an optional `<authentication>`
//! block followed by either shipment `<item>`s or a label request. Responses
//! are either a success document with `<item>` children or an `<error>`
//! envelope. The envelope may hold free text, or `<item>`s of which one or
//! more carry their own `<error><code/><text/><input/></error>`.
//!
//! Everything here is pure: no I/O and no logging.

use std::io::{self, Write};

use quick_xml::events::BytesText;
use quick_xml::Writer;

use crate::core::batch::ShipmentBatch;
use crate::core::xml::{self, Element};
use crate::domain::model::{Credentials, LabelDocument, ShipmentRecord};
use crate::utils::error::{CarrierError, ItemError, Result, ShippingError};

/// Root element of every request document.
pub const REQUEST_ROOT: &str = "orders";

/// Bytes a label response starts with when it is an error envelope rather
/// than a document. Matched exactly at offset 0: leading whitespace, a BOM or
/// an XML declaration in front of the root defeat it.
pub const LABEL_ERROR_PREFIX: &[u8] = b"<error>";

const MISSING_MESSAGE: &str = "Carrier returned an error without a message";

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// The `<authentication>` fragment, or an empty string when either half of
/// the credentials is missing.
pub fn encode_authentication(credentials: &Credentials) -> Result<String> {
    let mut buf = Vec::with_capacity(128);
    let mut writer = Writer::new(&mut buf);
    write_authentication(&mut writer, credentials).map_err(xml_error)?;
    into_string(buf)
}

/// Request body for the shipment and tracking endpoints.
pub fn encode_shipment_batch(batch: &ShipmentBatch, credentials: &Credentials) -> Result<String> {
    for record in batch.iter() {
        check_weight(record.weight)?;
        for (name, _) in &record.extra_fields {
            check_element_name(name)?;
        }
    }

    write_document(|w| {
        write_authentication(w, credentials)?;
        for record in batch.iter() {
            write_shipment(w, record)?;
        }
        Ok(())
    })
}

/// Request body for the labels endpoint.
pub fn encode_label_request<S: AsRef<str>>(
    tracking_codes: &[S],
    format: &str,
    credentials: &Credentials,
) -> Result<String> {
    write_document(|w| {
        write_authentication(w, credentials)?;
        write_text_element(w, "format", format)?;
        for code in tracking_codes {
            write_text_element(w, "barcode", code.as_ref())?;
        }
        Ok(())
    })
}

fn write_document<F>(content: F) -> Result<String>
where
    F: FnOnce(&mut Writer<&mut Vec<u8>>) -> io::Result<()>,
{
    let mut buf = Vec::with_capacity(512);
    let mut writer = Writer::new(&mut buf);
    writer
        .create_element(REQUEST_ROOT)
        .write_inner_content(content)
        .map_err(xml_error)?;
    into_string(buf)
}

fn write_authentication<W: Write>(
    writer: &mut Writer<W>,
    credentials: &Credentials,
) -> io::Result<()> {
    if !credentials.is_complete() {
        return Ok(());
    }
    writer
        .create_element("authentication")
        .write_inner_content(|w| {
            write_text_element(w, "user", credentials.username())?;
            write_text_element(w, "password", credentials.password())
        })?;
    Ok(())
}

fn write_shipment<W: Write>(writer: &mut Writer<W>, record: &ShipmentRecord) -> io::Result<()> {
    writer.create_element("item").write_inner_content(|w| {
        write_optional_text(w, "barcode", record.tracking_number.as_deref())?;
        write_optional_text(w, "reference", record.reference.as_deref())?;
        write_optional_text(w, "content", record.content.as_deref())?;
        write_optional_text(w, "orderparent", record.order_parent.as_deref())?;
        if let Some(weight) = record.weight {
            write_text_element(w, "weight", &weight.to_string())?;
        }
        if let Some(size) = record.size {
            write_text_element(w, "size", &size.to_string())?;
        }

        if let Some(recipient) = &record.recipient {
            w.create_element("recipient").write_inner_content(|w| {
                write_text_element(w, "name", &recipient.name)?;
                write_optional_text(w, "phone", recipient.phone.as_deref())?;
                write_optional_text(w, "email", recipient.email.as_deref())
            })?;
        }

        if let Some(destination) = &record.destination {
            w.create_element("destination").write_inner_content(|w| {
                write_optional_text(w, "place_id", destination.place_id.as_deref())?;
                write_optional_text(w, "postcode", destination.postcode.as_deref())?;
                write_optional_text(w, "routingcode", destination.routing_code.as_deref())
            })?;
        }

        for (name, value) in &record.extra_fields {
            write_text_element(w, name, value)?;
        }
        Ok(())
    })?;
    Ok(())
}

/// Write a simple `<tag>text</tag>` element, escaping the text.
fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}

fn write_optional_text<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: Option<&str>,
) -> io::Result<()> {
    if let Some(v) = value {
        write_text_element(writer, tag, v)?;
    }
    Ok(())
}

/// Pass-through field names end up as raw tag names, so only plain XML names
/// are accepted.
fn check_element_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if valid_start && valid_rest && !name.to_ascii_lowercase().starts_with("xml") {
        Ok(())
    } else {
        Err(ShippingError::Xml(format!("invalid field name '{}'", name)))
    }
}

fn check_weight(weight: Option<f64>) -> Result<()> {
    match weight {
        Some(w) if !w.is_finite() => Err(ShippingError::Xml(format!("invalid weight '{}'", w))),
        _ => Ok(()),
    }
}

fn into_string(buf: Vec<u8>) -> Result<String> {
    String::from_utf8(buf).map_err(|e| ShippingError::Xml(e.to_string()))
}

fn xml_error(err: io::Error) -> ShippingError {
    ShippingError::Xml(err.to_string())
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Checks a response for carrier-reported failure.
///
/// Returns `MalformedResponse` when the body is not a well-formed document and
/// `Carrier` when its root is `<error>`. Any other document passes.
pub fn detect_error(response: &[u8]) -> Result<()> {
    let root = xml::parse_document(response).map_err(|e| ShippingError::MalformedResponse {
        message: format!("Parsing results failed: {}", e),
    })?;

    if root.name() == "error" {
        return Err(ShippingError::Carrier(carrier_error(&root)));
    }
    Ok(())
}

/// Builds the error for an `<error>` root. The first `<item>` holding an
/// `<error>` child wins; otherwise the envelope's own text is the message.
fn carrier_error(root: &Element) -> CarrierError {
    let failed = root
        .children_named("item")
        .enumerate()
        .find_map(|(idx, item)| item.child("error").map(|err| (idx + 1, err)));

    match failed {
        Some((position, err)) => item_error(position, err),
        None => CarrierError::new(envelope_message(root)),
    }
}

fn item_error(position: usize, err: &Element) -> CarrierError {
    let message = format!("Error with item #{}", position);
    let code = err.child_text("code").unwrap_or_default();
    if code.is_empty() {
        return CarrierError::new(message);
    }

    let text = err.child_text("text").unwrap_or_default();
    let input = err.child_text("input").unwrap_or_default();
    CarrierError {
        message: format!(
            "{} (CODE: {}, MSG: {}, VALUE: {})",
            message, code, text, input
        ),
        item: Some(ItemError {
            position,
            code,
            text,
            input,
        }),
    }
}

fn envelope_message(root: &Element) -> String {
    let own = root.own_text();
    let own = own.trim();
    if !own.is_empty() {
        return own.to_string();
    }

    let full = root.full_text();
    let full = full.trim();
    if full.is_empty() {
        MISSING_MESSAGE.to_string()
    } else {
        full.to_string()
    }
}

/// Maps a clean shipment or tracking response to records, in document order.
///
/// Items without a barcode are skipped; the carrier leaves failed items out
/// of the success list that way. Call [`detect_error`] first: this function
/// does not tell an `<error>` envelope from a success document.
pub fn decode_shipment_results(response: &[u8]) -> Result<Vec<ShipmentRecord>> {
    let root = xml::parse_document(response).map_err(|e| ShippingError::DecodeFailure {
        message: format!("Successful request was made but parsing failed: {}", e),
    })?;

    let records = root
        .children_named("item")
        .filter_map(|item| {
            let barcode = item.child_text("barcode").filter(|b| !b.is_empty())?;
            Some(ShipmentRecord {
                tracking_number: Some(barcode),
                reference: item.child_text("reference"),
                door_code: item
                    .path(&["sender", "doorcode"])
                    .map(|code| code.full_text().trim().to_string()),
                ..Default::default()
            })
        })
        .collect();

    Ok(records)
}

/// True when a label response is an error envelope instead of a document.
pub fn detect_label_error(response: &[u8]) -> bool {
    response.starts_with(LABEL_ERROR_PREFIX)
}

/// Turns a label response into a [`LabelDocument`] or the carrier's error.
///
/// Non-envelope bytes are never handed to the XML parser.
pub fn decode_label_response(response: Vec<u8>) -> Result<LabelDocument> {
    if !detect_label_error(&response) {
        return Ok(LabelDocument::new(response));
    }

    let err = match detect_error(&response) {
        Err(ShippingError::MalformedResponse { message }) => {
            CarrierError::new(format!("Parsing error message failed: {}", message))
        }
        Err(other) => return Err(other),
        Ok(()) => CarrierError::new("Parsing error message failed"),
    };
    Err(ShippingError::Carrier(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Destination, Recipient};

    fn creds() -> Credentials {
        Credentials::new("shop", "secret")
    }

    #[test]
    fn test_encode_authentication() {
        assert_eq!(
            encode_authentication(&creds()).unwrap(),
            "<authentication><user>shop</user><password>secret</password></authentication>"
        );
    }

    #[test]
    fn test_encode_authentication_is_empty_without_both_halves() {
        assert_eq!(encode_authentication(&Credentials::anonymous()).unwrap(), "");
        assert_eq!(encode_authentication(&Credentials::new("shop", "")).unwrap(), "");
        assert_eq!(encode_authentication(&Credentials::new("", "secret")).unwrap(), "");
    }

    #[test]
    fn test_encode_escapes_interpolated_text() {
        let auth = encode_authentication(&Credentials::new("a<b", "p&w")).unwrap();
        assert!(auth.contains("<user>a&lt;b</user>"));
        assert!(auth.contains("<password>p&amp;w</password>"));

        let mut batch = ShipmentBatch::new();
        batch.add(ShipmentRecord::new("</reference><x>"));
        let xml = encode_shipment_batch(&batch, &Credentials::anonymous()).unwrap();
        assert!(xml.contains("<reference>&lt;/reference&gt;&lt;x&gt;</reference>"));

        let labels = encode_label_request(&["<b>"], "A5&", &Credentials::anonymous()).unwrap();
        assert_eq!(
            labels,
            "<orders><format>A5&amp;</format><barcode>&lt;b&gt;</barcode></orders>"
        );
    }

    #[test]
    fn test_encode_shipment_batch_preserves_order() {
        let mut batch = ShipmentBatch::new();
        batch.add(
            ShipmentRecord::new("order-1")
                .with_recipient(Recipient {
                    name: "Mari Maasikas".to_string(),
                    phone: Some("+3725555555".to_string()),
                    email: None,
                })
                .with_terminal("171"),
        );
        batch.add(ShipmentRecord::new("order-2").with_field("cod", "12.50"));

        let xml = encode_shipment_batch(&batch, &creds()).unwrap();

        assert!(xml.starts_with("<orders><authentication>"));
        assert!(xml.ends_with("</orders>"));
        assert!(xml.contains(
            "<item><reference>order-1</reference><recipient><name>Mari Maasikas</name>\
             <phone>+3725555555</phone></recipient><destination><place_id>171</place_id>\
             </destination></item>"
        ));
        assert!(xml.contains("<item><reference>order-2</reference><cod>12.50</cod></item>"));
        let first = xml.find("order-1").unwrap();
        let second = xml.find("order-2").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_encode_numeric_and_destination_fields() {
        let mut batch = ShipmentBatch::new();
        batch.add(ShipmentRecord {
            weight: Some(1.5),
            size: Some(3),
            destination: Some(Destination {
                place_id: None,
                postcode: Some("10111".to_string()),
                routing_code: Some("R1".to_string()),
            }),
            ..ShipmentRecord::tracked("BC1")
        });

        let xml = encode_shipment_batch(&batch, &Credentials::anonymous()).unwrap();
        assert_eq!(
            xml,
            "<orders><item><barcode>BC1</barcode><weight>1.5</weight><size>3</size>\
             <destination><postcode>10111</postcode><routingcode>R1</routingcode>\
             </destination></item></orders>"
        );
    }

    #[test]
    fn test_encode_rejects_bad_field_names() {
        let mut batch = ShipmentBatch::new();
        batch.add(ShipmentRecord::new("r").with_field("a><b", "x"));
        assert!(matches!(
            encode_shipment_batch(&batch, &creds()),
            Err(ShippingError::Xml(_))
        ));
    }

    #[test]
    fn test_encode_rejects_non_finite_weight() {
        for weight in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut batch = ShipmentBatch::new();
            batch.add(ShipmentRecord {
                weight: Some(weight),
                ..ShipmentRecord::new("r")
            });
            assert!(matches!(
                encode_shipment_batch(&batch, &creds()),
                Err(ShippingError::Xml(_))
            ));
        }
    }

    #[test]
    fn test_encode_label_request() {
        let codes = vec!["BC1".to_string(), "BC2".to_string()];
        let xml = encode_label_request(&codes, "A6-4", &creds()).unwrap();
        assert_eq!(
            xml,
            "<orders><authentication><user>shop</user><password>secret</password>\
             </authentication><format>A6-4</format><barcode>BC1</barcode>\
             <barcode>BC2</barcode></orders>"
        );
    }

    #[test]
    fn test_detect_error_passes_success_document() {
        assert!(detect_error(b"<orders><item><barcode>BC1</barcode></item></orders>").is_ok());
    }

    #[test]
    fn test_detect_error_plain_envelope() {
        match detect_error(b"<error>Quota exceeded</error>") {
            Err(ShippingError::Carrier(err)) => {
                assert_eq!(err.message, "Quota exceeded");
                assert!(err.item.is_none());
                assert_eq!(err.code(), None);
            }
            other => panic!("expected carrier error, got {:?}", other),
        }
    }

    #[test]
    fn test_detect_error_item_envelope() {
        let body = b"<error><item><error><code>12</code><text>Bad address</text>\
                     <input>X1</input></error></item></error>";
        match detect_error(body) {
            Err(ShippingError::Carrier(err)) => {
                assert!(err.message.contains("Error with item #1"));
                assert_eq!(
                    err.message,
                    "Error with item #1 (CODE: 12, MSG: Bad address, VALUE: X1)"
                );
                let item = err.item.unwrap();
                assert_eq!(item.position, 1);
                assert_eq!(item.code, "12");
                assert_eq!(item.text, "Bad address");
                assert_eq!(item.input, "X1");
            }
            other => panic!("expected carrier error, got {:?}", other),
        }
    }

    #[test]
    fn test_detect_error_reports_first_failing_item() {
        let body = b"<error>\
            <item><barcode>OK1</barcode></item>\
            <item><error><code></code><text>ignored</text></error></item>\
            <item><error><code>7</code><text>later</text></error></item>\
            </error>";
        match detect_error(body) {
            Err(ShippingError::Carrier(err)) => {
                assert_eq!(err.message, "Error with item #2");
                assert!(err.item.is_none());
            }
            other => panic!("expected carrier error, got {:?}", other),
        }
    }

    #[test]
    fn test_detect_error_without_message() {
        match detect_error(b"<error/>") {
            Err(ShippingError::Carrier(err)) => assert_eq!(err.message, MISSING_MESSAGE),
            other => panic!("expected carrier error, got {:?}", other),
        }
    }

    #[test]
    fn test_detect_error_malformed() {
        for body in [&b"<orders><item>"[..], &b"not xml at all"[..], &b""[..]] {
            match detect_error(body) {
                Err(ShippingError::MalformedResponse { message }) => {
                    assert!(message.starts_with("Parsing results failed"));
                }
                other => panic!("expected malformed response, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_decode_shipment_results() {
        let body = br#"<orders>
            <item><barcode>BC1</barcode><reference>order-1</reference>
                <sender><doorcode>4321</doorcode></sender></item>
            <item><reference>order-2</reference></item>
            <item><barcode>BC3</barcode><reference>order-3</reference></item>
        </orders>"#;

        let records = decode_shipment_results(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tracking_number.as_deref(), Some("BC1"));
        assert_eq!(records[0].reference.as_deref(), Some("order-1"));
        assert_eq!(records[0].door_code.as_deref(), Some("4321"));
        assert_eq!(records[1].tracking_number.as_deref(), Some("BC3"));
        assert_eq!(records[1].door_code, None);
    }

    #[test]
    fn test_decode_latin1_declared_response() {
        let body = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\
            <orders><item><barcode>B</barcode><reference>\xE4</reference></item></orders>";

        assert!(detect_error(body).is_ok());
        let records = decode_shipment_results(body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tracking_number.as_deref(), Some("B"));
        assert_eq!(records[0].reference.as_deref(), Some("\u{e4}"));
    }

    #[test]
    fn test_decode_skips_item_without_barcode() {
        let body = b"<orders><item><barcode>BC1</barcode></item>\
                     <item><barcode>  </barcode></item></orders>";
        assert_eq!(decode_shipment_results(body).unwrap().len(), 1);
    }

    #[test]
    fn test_decode_empty_result_list() {
        assert!(decode_shipment_results(b"<orders/>").unwrap().is_empty());
    }

    #[test]
    fn test_decode_failure_kind() {
        assert!(matches!(
            decode_shipment_results(b"<orders>"),
            Err(ShippingError::DecodeFailure { .. })
        ));
    }

    #[test]
    fn test_detect_label_error_is_prefix_only() {
        assert!(detect_label_error(b"<error>anything"));
        assert!(!detect_label_error(b"%PDF-1.4"));
        assert!(!detect_label_error(b" <error>x</error>"));
        assert!(!detect_label_error(b"<?xml version=\"1.0\"?><error>x</error>"));
    }

    #[test]
    fn test_decode_label_response_passes_binary_through() {
        let pdf = b"%PDF-1.4\n<error> inside a stream\x00\xff".to_vec();
        let doc = decode_label_response(pdf.clone()).unwrap();
        assert_eq!(doc.as_bytes(), pdf.as_slice());
    }

    #[test]
    fn test_decode_label_response_envelope() {
        match decode_label_response(b"<error>Unknown barcode</error>".to_vec()) {
            Err(ShippingError::Carrier(err)) => assert_eq!(err.message, "Unknown barcode"),
            other => panic!("expected carrier error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_label_response_broken_envelope() {
        match decode_label_response(b"<error><not-xml".to_vec()) {
            Err(ShippingError::Carrier(err)) => {
                assert!(err.message.starts_with("Parsing error message failed"));
                assert!(err.item.is_none());
            }
            other => panic!("expected carrier error, got {:?}", other),
        }
    }
}
