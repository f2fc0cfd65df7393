use std::sync::LazyLock;

use regex::Regex;

use crate::stl_api::errors::SettlementError;

static LOCAL_MOBILE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^3\d{9}$").expect("mobile number pattern is a valid regex"));

/// Validate and normalize a payer reference. The push network only accepts local mobile numbers: ten digits starting
/// with `3`. Spaces and dashes are stripped before checking.
pub fn normalize_payer_reference(reference: &str) -> Result<String, SettlementError> {
    let digits = reference.chars().filter(|c| !c.is_whitespace() && *c != '-').collect::<String>();
    if LOCAL_MOBILE_NUMBER.is_match(&digits) {
        Ok(digits)
    } else {
        Err(SettlementError::InvalidPayerReference(reference.to_string()))
    }
}
