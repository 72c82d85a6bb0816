use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPage {
    pub text: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode bytes with {encoding}")]
    Malformed { encoding: String },
}

/// Decode fetched bytes into UTF-8 using: BOM -> Content-Type charset -> chardetng guess.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedPage, DecodeError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(enc) = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, enc);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']).to_string())
    })
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Result<DecodedPage, DecodeError> {
    // BOM-sniffing decode strips a leading BOM from the text.
    let (text, actual, had_errors) = enc.decode(bytes);
    if had_errors {
        return Err(DecodeError::Malformed {
            encoding: actual.name().to_string(),
        });
    }
    Ok(DecodedPage {
        text: text.into_owned(),
        encoding_label: actual.name().to_string(),
    })
}
