// lanes.rs — Per-integration safety lanes.
//
// Some adapters get a dedicated lane with rules tighter than the generic
// policy. Lanes are checked per step during stage six of evaluation.
//
// - notion: live writes must be read-only unless approval-scoped with a
//   recorded prestate, and scoped writes are PATCH-only.
// - docs-capture: deny-by-default; only explicitly allowlisted hosts pass.
// - browser: local file access is fine, network navigation is
//   deny-by-default and approval-mandatory even when allowlisted.

use glob::Pattern;

use warden_plan::ExecutionStep;

use crate::codes;
use crate::decision::PolicyResult;

/// Adapter name that triggers the Notion live-write lane.
const NOTION_ADAPTER: &str = "notion";
/// Adapter name that triggers the docs-capture lane.
const DOCS_CAPTURE_ADAPTER: &str = "docs-capture";
/// Adapter name that triggers the browser-operator lane.
const BROWSER_ADAPTER: &str = "browser";

/// Check one step against the Notion live-write lane.
pub fn notion_live_write(step: &ExecutionStep) -> Option<PolicyResult> {
    if step.adapter != NOTION_ADAPTER || !step.is_write() {
        return None;
    }

    if step.approval_scoped == Some(true) {
        if !step.has_approval_scope() {
            return Some(PolicyResult::denied(
                codes::NOTION_LIVE_PRESTATE_REQUIRED,
                format!(
                    "step '{}' is approval-scoped but lacks a recorded prestate and fingerprint",
                    step.step_id
                ),
            ));
        }
        let method_is_patch = step
            .method
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("PATCH"));
        if !method_is_patch {
            return Some(PolicyResult::denied(
                codes::NOTION_LIVE_PATCH_ONLY,
                format!(
                    "step '{}' is an approval-scoped live write; only PATCH is permitted",
                    step.step_id
                ),
            ));
        }
        return None;
    }

    Some(PolicyResult::denied(
        codes::NOTION_LIVE_WRITE_BLOCKED,
        format!(
            "step '{}' writes to notion without read_only or an approval scope",
            step.step_id
        ),
    ))
}

/// Check one step against the docs-capture lane.
pub fn docs_capture(step: &ExecutionStep, allowed_hosts: Option<&[String]>) -> Option<PolicyResult> {
    if step.adapter != DOCS_CAPTURE_ADAPTER {
        return None;
    }

    let Some(patterns) = allowed_hosts else {
        return Some(PolicyResult::denied(
            codes::DOCS_CAPTURE_NOT_CONFIGURED,
            "docs-capture is deny-by-default; no host allowlist is configured",
        ));
    };

    let Some(host) = step.url_host() else {
        return Some(PolicyResult::denied(
            codes::DOCS_CAPTURE_HOST_NOT_ALLOWED,
            format!("step '{}' has no resolvable host", step.step_id),
        ));
    };

    if host_matches(host, patterns) {
        None
    } else {
        Some(PolicyResult::denied(
            codes::DOCS_CAPTURE_HOST_NOT_ALLOWED,
            format!("host '{}' is not in the docs-capture allowlist", host),
        ))
    }
}

/// Check one step against the browser-operator lane.
///
/// `has_approval` is whether a matching approval token accompanies the
/// plan — network navigation needs it even for allowlisted hosts.
pub fn browser_operator(
    step: &ExecutionStep,
    allowed_hosts: Option<&[String]>,
    has_approval: bool,
) -> Option<PolicyResult> {
    if step.adapter != BROWSER_ADAPTER {
        return None;
    }

    // Local file access is allowed.
    match step.url_scheme() {
        None | Some("file") => return None,
        Some(_) => {}
    }

    let host = step.url_host().unwrap_or("");
    let allowlisted = allowed_hosts.is_some_and(|patterns| host_matches(host, patterns));
    if !allowlisted {
        return Some(PolicyResult::denied(
            codes::BROWSER_OPERATOR_NETWORK_BLOCKED,
            format!(
                "step '{}' navigates to '{}'; network navigation is deny-by-default",
                step.step_id, host
            ),
        ));
    }

    if !has_approval {
        return Some(PolicyResult::approval_required(
            codes::BROWSER_OPERATOR_APPROVAL_REQUIRED,
            format!("browser navigation to '{}' requires approval", host),
            step.action.clone(),
            host,
            format!("{} via browser", step.action),
        ));
    }

    None
}

/// Fail-closed glob match: invalid patterns never match.
fn host_matches(host: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| match Pattern::new(p) {
        Ok(pattern) => pattern.matches(host),
        Err(_) => false,
    })
}
