//! Document payload validation.
//!
//! The inbound contract is a `data:application/pdf;base64,` URI, exactly as
//! the browser's `FileReader.readAsDataURL` produces it. Validation happens
//! before the quota check and before any model call, so a malformed upload
//! costs the caller nothing — and costs us nothing.

use crate::error::ConvertError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// URI prefix required on every inbound document.
pub const PDF_DATA_URI_PREFIX: &str = "data:application/pdf;base64,";

/// PDF files begin with `%PDF` followed by a version marker.
const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A validated PDF payload.
///
/// Construction is the validation: holding a `DocumentPayload` means the
/// bytes were non-empty, base64-decoded cleanly, and carry the PDF magic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPayload {
    bytes: Vec<u8>,
}

impl DocumentPayload {
    /// Parse and validate a `data:application/pdf;base64,` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self, ConvertError> {
        let encoded = uri.strip_prefix(PDF_DATA_URI_PREFIX).ok_or_else(|| {
            ConvertError::invalid_input("payload is not a PDF data URI")
        })?;
        if encoded.is_empty() {
            return Err(ConvertError::invalid_input("document is empty"));
        }
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| ConvertError::invalid_input(format!("base64 decode failed: {e}")))?;
        Self::from_bytes(bytes)
    }

    /// Validate raw PDF bytes (for callers that already decoded the upload).
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ConvertError> {
        if bytes.is_empty() {
            return Err(ConvertError::invalid_input("document is empty"));
        }
        if bytes.len() < PDF_MAGIC.len() || &bytes[..PDF_MAGIC.len()] != PDF_MAGIC {
            let mut magic = [0u8; 4];
            let n = bytes.len().min(4);
            magic[..n].copy_from_slice(&bytes[..n]);
            return Err(ConvertError::invalid_input(format!(
                "not a PDF (first bytes: {magic:?})"
            )));
        }
        Ok(Self { bytes })
    }

    /// The validated PDF bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes, for logging.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Re-encode as a data URI. Hosted multimodal APIs take the document in
    /// exactly this form, so backends use this rather than re-implementing
    /// the encoding.
    pub fn to_data_uri(&self) -> String {
        format!("{PDF_DATA_URI_PREFIX}{}", BASE64.encode(&self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn pdf_uri(body: &[u8]) -> String {
        format!("{PDF_DATA_URI_PREFIX}{}", BASE64.encode(body))
    }

    #[test]
    fn accepts_well_formed_pdf_uri() {
        let doc = DocumentPayload::from_data_uri(&pdf_uri(b"%PDF-1.7 minimal")).unwrap();
        assert!(doc.bytes().starts_with(b"%PDF"));
        assert_eq!(doc.len(), 16);
    }

    #[test]
    fn round_trips_through_data_uri() {
        let uri = pdf_uri(b"%PDF-1.4 content");
        let doc = DocumentPayload::from_data_uri(&uri).unwrap();
        assert_eq!(doc.to_data_uri(), uri);
    }

    #[test]
    fn rejects_missing_prefix() {
        let err = DocumentPayload::from_data_uri("data:text/plain;base64,aGk=").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn rejects_empty_body() {
        let err = DocumentPayload::from_data_uri(PDF_DATA_URI_PREFIX).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn rejects_invalid_base64() {
        let uri = format!("{PDF_DATA_URI_PREFIX}!!!not-base64!!!");
        let err = DocumentPayload::from_data_uri(&uri).unwrap_err();
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn rejects_wrong_magic() {
        let err = DocumentPayload::from_data_uri(&pdf_uri(b"PK\x03\x04 a zip")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("not a PDF"));
    }

    #[test]
    fn rejects_truncated_magic() {
        assert!(DocumentPayload::from_bytes(b"%P".to_vec()).is_err());
    }
}
