//! Shared HTTP constants (headers, problem URIs, body limits).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const HEADER_FILE_PATH: &str = "x-wharf-file-path";

pub(crate) const PROBLEM_INTERNAL: &str = "https://wharf.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://wharf.dev/problems/bad-request";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://wharf.dev/problems/not-found";
pub(crate) const PROBLEM_SERVICE_UNAVAILABLE: &str =
    "https://wharf.dev/problems/service-unavailable";

/// Envelope allowance on top of the base64-expanded payload when bounding
/// inline JSON write bodies.
pub(crate) const JSON_ENVELOPE_BYTES: usize = 4096;
