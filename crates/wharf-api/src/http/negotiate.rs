//! Download format negotiation.
//!
//! The decision is data, not branching: an explicit request field wins
//! unconditionally, then an ordered table of `Accept` substrings applies,
//! then tar.gz as the universal fallback (no multipart parser required on
//! the client, compresses text-heavy trees well).

use crate::http::errors::ApiError;
use wharf_transfer::ArchiveFormat;

const EXPLICIT_FORMATS: &[(&str, ArchiveFormat)] = &[
    ("tar", ArchiveFormat::Tar),
    ("tar.gz", ArchiveFormat::TarGz),
    ("mixed", ArchiveFormat::Multipart),
    ("multipart", ArchiveFormat::Multipart),
];

const ACCEPT_RULES: &[(&str, ArchiveFormat)] = &[
    ("multipart/mixed", ArchiveFormat::Multipart),
    ("application/x-tar", ArchiveFormat::Tar),
];

/// Choose the archive encoding for a download request.
///
/// # Errors
///
/// Returns a bad-request error when the explicit format field names an
/// unsupported encoding.
pub(crate) fn negotiate_format(
    explicit: Option<&str>,
    accept: Option<&str>,
) -> Result<ArchiveFormat, ApiError> {
    if let Some(requested) = explicit {
        return EXPLICIT_FORMATS
            .iter()
            .find(|(name, _)| requested.eq_ignore_ascii_case(name))
            .map(|(_, format)| *format)
            .ok_or_else(|| {
                ApiError::bad_request(format!("unsupported archive format: {requested}"))
            });
    }
    Ok(accept.map_or(ArchiveFormat::TarGz, format_from_accept))
}

fn format_from_accept(accept: &str) -> ArchiveFormat {
    let accept = accept.to_ascii_lowercase();
    for (needle, format) in ACCEPT_RULES {
        if !accept.contains(needle) {
            continue;
        }
        // A tar request that also advertises gzip support gets the
        // compressed stream.
        if *format == ArchiveFormat::Tar && accept.contains("gzip") {
            continue;
        }
        return *format;
    }
    ArchiveFormat::TarGz
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn explicit_field_wins_over_accept_header() -> Result<()> {
        let format = negotiate_format(Some("tar"), Some("multipart/mixed"))?;
        assert_eq!(format, ArchiveFormat::Tar);
        Ok(())
    }

    #[test]
    fn explicit_field_accepts_every_documented_name() -> Result<()> {
        assert_eq!(negotiate_format(Some("tar"), None)?, ArchiveFormat::Tar);
        assert_eq!(
            negotiate_format(Some("tar.gz"), None)?,
            ArchiveFormat::TarGz
        );
        assert_eq!(
            negotiate_format(Some("mixed"), None)?,
            ArchiveFormat::Multipart
        );
        assert_eq!(
            negotiate_format(Some("MULTIPART"), None)?,
            ArchiveFormat::Multipart
        );
        Ok(())
    }

    #[test]
    fn unknown_explicit_format_is_rejected() {
        let err = negotiate_format(Some("zip"), None).expect_err("zip is unsupported");
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn accept_header_drives_the_decision_when_no_field_is_set() -> Result<()> {
        assert_eq!(
            negotiate_format(None, Some("multipart/mixed"))?,
            ArchiveFormat::Multipart
        );
        assert_eq!(
            negotiate_format(None, Some("application/x-tar"))?,
            ArchiveFormat::Tar
        );
        assert_eq!(
            negotiate_format(None, Some("application/x-tar, gzip"))?,
            ArchiveFormat::TarGz
        );
        assert_eq!(
            negotiate_format(None, Some("application/gzip"))?,
            ArchiveFormat::TarGz
        );
        assert_eq!(negotiate_format(None, Some("*/*"))?, ArchiveFormat::TarGz);
        assert_eq!(negotiate_format(None, None)?, ArchiveFormat::TarGz);
        Ok(())
    }
}
