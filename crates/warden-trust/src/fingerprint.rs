// fingerprint.rs — Content-addressed identifiers for command classes.
//
// All fingerprints are SHA-256, hex-encoded. Two families exist:
//
// - confidence fingerprint: (command, policy_version, autonomy_mode, caps)
// - promotion fingerprint:  (command, caps, adapter_type)
//
// The families are distinct namespaces — each hash is prefixed with a
// family tag so identical field values can never collide across families.
//
// Determinism contract: command whitespace is collapsed, capability sets
// are sorted and deduplicated, and no timestamp or other volatile field
// ever enters the hash.

use sha2::{Digest, Sha256};

/// Family tag for confidence fingerprints.
const CONFIDENCE_FAMILY: &str = "warden.confidence.v1";

/// Family tag for promotion fingerprints.
const PROMOTION_FAMILY: &str = "warden.promotion.v1";

/// Collapse runs of whitespace in a command string to single spaces.
pub fn normalize_command(command: &str) -> String {
    command.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sort and deduplicate a capability set into its canonical form.
pub fn normalize_capabilities<S: AsRef<str>>(capabilities: &[S]) -> Vec<String> {
    let mut caps: Vec<String> = capabilities.iter().map(|c| c.as_ref().to_string()).collect();
    caps.sort();
    caps.dedup();
    caps
}

/// Fingerprint identifying a command class for confidence tracking.
pub fn confidence_fingerprint<S: AsRef<str>>(
    command: &str,
    policy_version: &str,
    autonomy_mode: &str,
    capabilities: &[S],
) -> String {
    hash_fields(
        CONFIDENCE_FAMILY,
        &[
            &normalize_command(command),
            policy_version,
            autonomy_mode,
            &normalize_capabilities(capabilities).join(","),
        ],
    )
}

/// Fingerprint identifying a command class for promotion tracking.
pub fn promotion_fingerprint<S: AsRef<str>>(
    command: &str,
    capabilities: &[S],
    adapter_type: &str,
) -> String {
    hash_fields(
        PROMOTION_FAMILY,
        &[
            &normalize_command(command),
            &normalize_capabilities(capabilities).join(","),
            adapter_type,
        ],
    )
}

/// Short, filesystem-safe identifier for a command: the first 16 hex
/// chars of the normalized command's SHA-256. Used to key plan artifacts
/// on disk; not a trust fingerprint.
pub fn command_slug(command: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_command(command).as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// Hash a family tag plus ordered fields, newline-separated.
///
/// The separator makes field boundaries unambiguous: ("ab", "c") and
/// ("a", "bc") hash differently.
fn hash_fields(family: &str, fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(family.as_bytes());
    for field in fields {
        hasher.update(b"\n");
        hasher.update(field.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_order_does_not_change_fingerprint() {
        let a = confidence_fingerprint(
            "notion sync",
            "v3",
            "APPROVAL_GATED_AUTONOMY",
            &["notion.write", "http.get"],
        );
        let b = confidence_fingerprint(
            "notion sync",
            "v3",
            "APPROVAL_GATED_AUTONOMY",
            &["http.get", "notion.write"],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn duplicate_capabilities_do_not_change_fingerprint() {
        let a = confidence_fingerprint("x", "v1", "OFF", &["cap.a", "cap.a", "cap.b"]);
        let b = confidence_fingerprint("x", "v1", "OFF", &["cap.a", "cap.b"]);
        assert_eq!(a, b);
    }

    #[test]
    fn command_whitespace_does_not_change_fingerprint() {
        let a = confidence_fingerprint("notion   sync \t pages", "v1", "OFF", &["cap.a"]);
        let b = confidence_fingerprint("notion sync pages", "v1", "OFF", &["cap.a"]);
        assert_eq!(a, b);
    }

    #[test]
    fn families_do_not_collide() {
        // Same field values through both families must differ.
        let conf = confidence_fingerprint("cmd", "a", "b", &["c"]);
        let promo = promotion_fingerprint("cmd", &["c"], "b");
        assert_ne!(conf, promo);
    }

    #[test]
    fn policy_version_is_significant() {
        let a = confidence_fingerprint("cmd", "v1", "OFF", &["c"]);
        let b = confidence_fingerprint("cmd", "v2", "OFF", &["c"]);
        assert_ne!(a, b);
    }

    #[test]
    fn adapter_type_is_significant() {
        let a = promotion_fingerprint("cmd", &["c"], "notion");
        let b = promotion_fingerprint("cmd", &["c"], "slack");
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = promotion_fingerprint("cmd", &["c"], "notion");
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn field_boundaries_are_unambiguous() {
        let a = confidence_fingerprint("ab", "c", "OFF", &[] as &[&str]);
        let b = confidence_fingerprint("a", "bc", "OFF", &[] as &[&str]);
        assert_ne!(a, b);
    }

    #[test]
    fn command_slug_is_short_and_whitespace_stable() {
        let a = command_slug("notion   sync");
        let b = command_slug("notion sync");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn fingerprint_is_stable_across_calls() {
        let a = confidence_fingerprint("cmd", "v1", "OFF", &["c"]);
        let b = confidence_fingerprint("cmd", "v1", "OFF", &["c"]);
        assert_eq!(a, b);
    }
}
