// src/utils/error_message.rs
//! Human-readable descriptions for native engine status codes.
//!
//! The native engine only ever reports a bare integer. This table turns the
//! codes a credential definition can run into into something worth putting
//! in a log line.

use crate::models::handle::ErrorCode;

/// Looks up the description of a native status code.
///
/// # Arguments
/// * `code` - Status code reported by the native engine
///
/// # Returns
/// Static description, or `"Unknown error"` for codes not in the table
pub fn error_message(code: ErrorCode) -> &'static str {
    match code {
        0 => "Success",
        1001 => "Unknown error",
        1004 => "Invalid configuration",
        1008 => "Invalid DID",
        1016 => "Invalid JSON string",
        1025 => "Failed to connect to the ledger pool",
        1028 => "Ledger rejected the submitted request",
        1029 => "Failed to build credential definition request",
        1030 => "No ledger pool open",
        1031 => "Invalid schema",
        1034 => "Failed to create credential definition",
        1035 => "Unknown error from the ledger library",
        1036 => "Invalid credential definition handle",
        1037 => "Timed out waiting for the ledger library",
        1038 => "Credential definition already exists on the ledger",
        1041 => "Invalid schema handle",
        1049 => "Unable to serialize object",
        1055 => "Credential definition creation was rejected",
        1064 => "Insufficient amount of tokens to process request",
        1066 => "Invalid payment handle",
        _ => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_code() {
        assert_eq!(error_message(1036), "Invalid credential definition handle");
    }

    #[test]
    fn test_unknown_code_falls_back() {
        assert_eq!(error_message(4242), "Unknown error");
    }
}
