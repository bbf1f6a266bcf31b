// explain.rs — Human-facing explanations for reason codes.
//
// Every stable code the engine can emit has an entry here. The table is
// what `warden policy explain <CODE>` serves, and the exhaustiveness
// test below keeps it honest when codes are added.

use crate::codes;

/// Explanation text for a reason code, if the code is known.
pub fn explain(code: &str) -> Option<&'static str> {
    let text = match code {
        "ALLOWED" => "The plan passed every policy check and may run unattended.",
        c if c == codes::BUDGET_MAX_STEPS_EXCEEDED => {
            "The plan contains more steps than the configured step budget allows."
        }
        c if c == codes::BUDGET_MAX_RUNTIME_EXCEEDED => {
            "A step declares a timeout above the configured runtime budget."
        }
        c if c == codes::BUDGET_EXCEEDED => {
            "The run exceeded a configured budget (steps, runtime, or runs per day)."
        }
        c if c == codes::BUDGET_MAX_RUNS_PER_DAY => {
            "This job already ran as many times today as its budget allows."
        }
        c if c == codes::AUTONOMY_MODE_OFF => {
            "Autonomy is OFF; no plan runs unattended in this mode."
        }
        c if c == codes::AUTONOMY_READ_ONLY_VIOLATION => {
            "READ_ONLY_AUTONOMY permits only steps explicitly marked read-only."
        }
        c if c == codes::AUTONOMY_APPROVAL_REQUIRED => {
            "A write-capable step needs a matching approval token, an active \
             promotion, or an active delegation before it may run."
        }
        c if c == codes::CONFIDENCE_TOO_LOW => {
            "The confidence score for this command class is at or below the \
             floor; write-capable plans are denied regardless of approvals."
        }
        c if c == codes::REQUALIFICATION_BLOCKED => {
            "This command class is not ACTIVE in requalification; write-capable \
             steps are blocked until it requalifies."
        }
        c if c == codes::PROBATION_READ_ONLY_ENFORCED => {
            "This command class is on PROBATION; every step must be explicitly \
             read-only."
        }
        c if c == codes::DOMAIN_OVERLAY_DENY_WRITE => {
            "A domain overlay forbids write-capable steps for this domain."
        }
        c if c == codes::MODE_DECLARATION_MISSING => {
            "Mode governance is enabled but no mode declaration artifact exists \
             on disk."
        }
        c if c == codes::MODE_FROZEN => {
            "The declared mode is FROZEN; nothing runs, read-only or otherwise."
        }
        c if c == codes::LIMB_INACTIVE => {
            "Write-capable plans require SINGLE_RUN_APPROVED mode with the \
             relevant capability limb active."
        }
        c if c == codes::NOTION_LIVE_WRITE_BLOCKED => {
            "Live Notion writes must be read-only unless approval-scoped with a \
             recorded prestate."
        }
        c if c == codes::NOTION_LIVE_PATCH_ONLY => {
            "Approval-scoped Notion writes may only use the PATCH method."
        }
        c if c == codes::NOTION_LIVE_PRESTATE_REQUIRED => {
            "Approval-scoped Notion writes must record the target's prestate and \
             its fingerprint."
        }
        c if c == codes::DOCS_CAPTURE_NOT_CONFIGURED => {
            "The docs-capture lane is deny-by-default; configure \
             DOCS_CAPTURE_ALLOWED_HOSTS to permit hosts."
        }
        c if c == codes::DOCS_CAPTURE_HOST_NOT_ALLOWED => {
            "The target host is not in the docs-capture host allowlist."
        }
        c if c == codes::BROWSER_OPERATOR_NETWORK_BLOCKED => {
            "Browser network navigation is deny-by-default; only allowlisted \
             hosts may be visited."
        }
        c if c == codes::BROWSER_OPERATOR_APPROVAL_REQUIRED => {
            "Browser navigation to an allowlisted host still requires an \
             approval token."
        }
        c if c == codes::CAPABILITY_NOT_ALLOWED => {
            "The plan claims a capability outside the configured allowlist."
        }
        c if c == codes::POLICY_URL_INVALID => {
            "A step's URL could not be parsed."
        }
        c if c == codes::POLICY_URL_PROTOCOL_BLOCK => {
            "A step's URL uses a protocol outside the permitted set."
        }
        c if c == codes::DOMAIN_NOT_ALLOWED => {
            "A step targets a domain outside the configured allowlist."
        }
        c if c == codes::POLICY_METHOD_BLOCK => {
            "A step uses an HTTP method outside the configured allowlist."
        }
        c if c == codes::POLICY_MAX_PHASES => {
            "The plan has more phases than the configured cap."
        }
        c if c == codes::POLICY_MAX_TOTAL_STEPS => {
            "The plan has more total steps than the configured cap."
        }
        c if c == codes::POLICY_TIME_WINDOW => {
            "Execution is denied after the configured UTC cutoff time."
        }
        c if c == codes::PRODUCTION_APPROVAL_REQUIRED => {
            "Write-capable steps in a production environment require an approval \
             token matching the plan's execution id."
        }
        c if c == codes::JOB_PAUSED => {
            "The scheduled job is paused; unattended sweeps skip it."
        }
        c if c == codes::JOB_NOT_DUE => {
            "The job's schedule does not match the current evaluation window."
        }
        c if c == codes::SCHEDULE_DUE => {
            "The job's schedule matches the current evaluation window."
        }
        c if c == codes::MANUAL_TRIGGER => {
            "The job was triggered manually; the schedule window is bypassed."
        }
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_has_an_explanation() {
        for code in codes::ALL {
            assert!(explain(code).is_some(), "missing explanation for {}", code);
        }
    }

    #[test]
    fn allowed_has_an_explanation() {
        assert!(explain("ALLOWED").is_some());
    }

    #[test]
    fn unknown_code_has_none() {
        assert!(explain("NO_SUCH_CODE").is_none());
    }
}
