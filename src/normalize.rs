//! Content-type and encoding normalization for payloads crossing the
//! text-based transport.
//!
//! Normalization is lossless by construction: for every supported
//! (content type, content encoding) pair, denormalizing the decrypted
//! bytes reproduces the caller's original logical payload exactly.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::errors::{Error, Result};

/// Canonical text content type.
pub const TEXT_PLAIN: &str = "text/plain";
/// Canonical binary content type.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Canonicalize a content-type header value.
///
/// Matching is case-insensitive and whitespace-tolerant. `text/plain` may
/// carry a `charset=utf-8` parameter; any other charset is rejected rather
/// than silently accepted.
pub fn canonicalize_content_type(raw: &str) -> Result<String> {
    let unsupported = || Error::ContentTypeNotSupported {
        content_type: raw.to_string(),
    };

    let lowered = raw.trim().to_ascii_lowercase();
    let mut parts = lowered.split(';').map(str::trim);
    let mime = parts.next().ok_or_else(unsupported)?;

    match mime {
        TEXT_PLAIN => {
            for param in parts {
                if param.is_empty() {
                    continue;
                }
                match param.split_once('=') {
                    Some((key, value)) if key.trim() == "charset" => {
                        if value.trim() != "utf-8" {
                            return Err(unsupported());
                        }
                    }
                    _ => return Err(unsupported()),
                }
            }
            Ok(TEXT_PLAIN.to_string())
        }
        OCTET_STREAM => {
            if parts.any(|param| !param.is_empty()) {
                return Err(unsupported());
            }
            Ok(OCTET_STREAM.to_string())
        }
        _ => Err(unsupported()),
    }
}

/// Pick the preferred encoding from a quality-sorted header value.
///
/// Entries look like `base64` or `gzip;q=0.5`; the highest quality wins and
/// ties resolve to the earliest entry. Returns `None` for an absent or
/// blank header.
fn best_content_encoding(header: Option<&str>) -> Option<String> {
    let header = header?.trim();
    if header.is_empty() {
        return None;
    }

    let mut best: Option<(f32, String)> = None;
    for entry in header.split(',') {
        let mut pieces = entry.split(';').map(str::trim);
        let name = match pieces.next() {
            Some(name) if !name.is_empty() => name.to_ascii_lowercase(),
            _ => continue,
        };
        let mut quality = 1.0f32;
        for param in pieces {
            if let Some((key, value)) = param.split_once('=') {
                if key.trim() == "q" {
                    quality = value.trim().parse().unwrap_or(0.0);
                }
            }
        }
        match &best {
            Some((best_q, _)) if *best_q >= quality => {}
            _ => best = Some((quality, name)),
        }
    }

    best.map(|(_, name)| name)
}

/// Validate and transform a payload ahead of encryption.
///
/// Returns the plaintext bytes to hand to a plugin together with the
/// canonical content type to record on the resulting datum.
/// `enforce_text_only` is set on the single-step inline-payload path, where
/// raw binary cannot be carried and octet-stream payloads must arrive
/// base64-encoded.
pub fn normalize_before_encryption(
    payload: Option<&str>,
    content_type: &str,
    content_encoding: Option<&str>,
    enforce_text_only: bool,
) -> Result<(Vec<u8>, String)> {
    let payload = match payload {
        Some(value) if !value.is_empty() => value,
        _ => return Err(Error::NoPayloadProvided),
    };

    let canonical = canonicalize_content_type(content_type)?;
    match canonical.as_str() {
        // Text payloads ignore any content-encoding header.
        TEXT_PLAIN => Ok((payload.as_bytes().to_vec(), canonical)),
        OCTET_STREAM => match best_content_encoding(content_encoding) {
            Some(encoding) if encoding == "base64" => {
                let bytes = STANDARD.decode(payload).map_err(|err| Error::PayloadDecoding {
                    reason: err.to_string(),
                })?;
                Ok((bytes, canonical))
            }
            Some(encoding) => Err(Error::ContentEncodingNotSupported {
                content_encoding: encoding,
            }),
            None if enforce_text_only => Err(Error::ContentEncodingMustBeBase64),
            None => Ok((payload.as_bytes().to_vec(), canonical)),
        },
        other => Err(Error::General {
            detail: format!("canonicalization produced unexpected content type {other}"),
        }),
    }
}

/// Validate the requested content type ahead of decryption.
pub fn analyze_before_decryption(accept: &str) -> Result<String> {
    canonicalize_content_type(accept).map_err(|_| Error::AcceptNotSupported {
        accept: accept.to_string(),
    })
}

/// Transform decrypted bytes back into the caller's logical payload.
///
/// Text plaintext must be valid UTF-8; bytes that are not cannot honestly
/// be returned as text. A content type outside the supported set here
/// signals a normalizer/storage mismatch, not caller error.
pub fn denormalize_after_decryption(plaintext: Vec<u8>, content_type: &str) -> Result<Vec<u8>> {
    match content_type {
        TEXT_PLAIN => {
            if std::str::from_utf8(&plaintext).is_err() {
                return Err(Error::AcceptNotSupported {
                    accept: content_type.to_string(),
                });
            }
            Ok(plaintext)
        }
        OCTET_STREAM => Ok(plaintext),
        other => Err(Error::General {
            detail: format!("stored datum carries unexpected content type {other}"),
        }),
    }
}
