use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the crypto core.
///
/// Every rejection is synchronous and propagates immediately to the caller;
/// retries belong to the orchestration layer or to a plugin's own internal
/// handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No crypto plugins are configured, or none matches a stored datum.
    #[error("no crypto plugin available")]
    PluginNotFound,
    /// Plugins are configured but none declares the requested capability.
    #[error("no configured plugin supports the requested operation")]
    SupportedPluginNotFound,
    /// The request names a content type outside the supported set.
    #[error("content type not supported: {content_type}")]
    ContentTypeNotSupported { content_type: String },
    /// The request names a content encoding outside the supported set.
    #[error("content encoding not supported: {content_encoding}")]
    ContentEncodingNotSupported { content_encoding: String },
    /// Octet-stream payloads on the text-only path must arrive base64-encoded.
    #[error("content encoding must be base64 for this request")]
    ContentEncodingMustBeBase64,
    /// The payload could not be decoded with the declared encoding.
    #[error("payload could not be decoded: {reason}")]
    PayloadDecoding { reason: String },
    /// The request carried no payload bytes at all.
    #[error("no payload provided")]
    NoPayloadProvided,
    /// The requested key algorithm is not in the classification table.
    #[error("algorithm not supported: {algorithm}")]
    AlgorithmNotSupported { algorithm: String },
    /// The requested accept type cannot be honoured on decryption.
    #[error("accept type not supported: {accept}")]
    AcceptNotSupported { accept: String },
    /// The algorithm has no passphrase protection in the selected plugin.
    #[error("passphrase not supported for algorithm: {algorithm}")]
    PassphraseNotSupported { algorithm: String },
    /// A plugin failed to establish key material during KEK binding.
    #[error("KEK binding failed for label {label}")]
    KekBinding { label: String },
    /// Decrypt was requested for a secret with no stored datums.
    #[error("no secret or encrypted data found")]
    NoSecretOrDataFound,
    /// Internal consistency fault, e.g. a stored content type the
    /// normalizer never produces.
    #[error("internal error: {detail}")]
    General { detail: String },
    /// Failure inside a cryptographic primitive.
    #[error("crypto error: {detail}")]
    Crypto { detail: String },
    /// Failure reported by a repository implementation.
    #[error("storage error: {detail}")]
    Storage { detail: String },
}
