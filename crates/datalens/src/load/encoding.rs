//! Encoding detection and transcoding for delimited text sources.

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Bytes examined when sniffing an encoding.
pub const DETECTION_SAMPLE_BYTES: usize = 10 * 1024;

/// Encodings retried, in order, when the chosen one cannot decode the input.
pub const FALLBACK_ENCODINGS: &[&str] = &["latin-1", "cp1252", "iso-8859-1"];

/// Detect the encoding of a byte sample using statistical byte-frequency
/// analysis, mapping rare or ambiguous answers to a canonical supported name.
///
/// Fails open: any inconclusive detection yields `utf-8`; this never aborts
/// a load on its own.
pub fn detect_encoding(sample: &[u8]) -> String {
    let sample = &sample[..sample.len().min(DETECTION_SAMPLE_BYTES)];
    if sample.is_empty() {
        return "utf-8".to_string();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(sample, true);
    let guessed = detector.guess(None, true);
    canonical_name(guessed.name())
}

/// Collapse the detector's answer onto the loader's supported set:
/// plain ASCII reads fine as UTF-8, and the whole ISO-8859 family is
/// served by latin-1.
fn canonical_name(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if lower == "ascii" || lower == "us-ascii" {
        "utf-8".to_string()
    } else if lower.contains("iso-8859") || lower.contains("8859") {
        "latin-1".to_string()
    } else {
        lower
    }
}

/// Decode bytes with the named encoding. Returns `None` when the label is
/// unknown or the bytes are invalid for that encoding, so callers can walk
/// the fallback chain.
///
/// "latin-1" is not a WHATWG label, so it is aliased to "iso-8859-1"
/// before the lookup.
pub fn decode(bytes: &[u8], label: &str) -> Option<String> {
    let label = match label.to_ascii_lowercase().as_str() {
        "latin-1" | "latin1" => "iso-8859-1".to_string(),
        other => other.to_string(),
    };
    let encoding = Encoding::for_label(label.as_bytes())?;
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}
