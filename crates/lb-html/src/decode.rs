use encoding_rs::Encoding;
use encoding_rs::UTF_8;

const META_PRESCAN_BYTES: usize = 8192;

/// Decodes legacy document bytes. A byte-order mark wins, then a charset
/// declared by a `<meta>` tag near the top, then UTF-8 with replacement.
pub fn decode_document_bytes(bytes: &[u8]) -> String {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| declared_encoding(bytes))
        .unwrap_or(UTF_8);

    let (decoded, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        log::trace!(
            target: "lb::html",
            "replacement characters while decoding as {}",
            encoding.name()
        );
    }
    decoded.into_owned()
}

/// Encoding named by the first `<meta>` tag in the prefix whose `charset`
/// is a label `encoding_rs` knows. Covers both `<meta charset=…>` and the
/// `http-equiv` form, whose `content` carries `charset=…`.
fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let prefix = String::from_utf8_lossy(&bytes[..bytes.len().min(META_PRESCAN_BYTES)])
        .to_ascii_lowercase();

    let mut rest = prefix.as_str();
    while let Some(start) = rest.find("<meta") {
        let tag = &rest[start..];
        let tag = &tag[..tag.find('>').unwrap_or(tag.len())];
        rest = &rest[start + tag.len()..];

        let Some(label) = charset_label(tag) else {
            continue;
        };
        match Encoding::for_label(label.as_bytes()) {
            Some(encoding) => return Some(encoding),
            None => log::debug!(target: "lb::html", "unknown charset label `{label}`"),
        }
    }

    None
}

fn charset_label(tag: &str) -> Option<&str> {
    let after = &tag[tag.find("charset")? + "charset".len()..];
    let value = after.trim_start().strip_prefix('=')?;
    let value = value.trim_start().trim_start_matches(['"', '\'']);
    let end = value
        .find(|ch: char| ch.is_ascii_whitespace() || matches!(ch, '"' | '\'' | ';' | '/'))
        .unwrap_or(value.len());
    let label = &value[..end];
    (!label.is_empty()).then_some(label)
}
