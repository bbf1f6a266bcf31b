// codes.rs — Stable reason codes.
//
// These strings are audit evidence: they appear in persisted receipts and
// check records, and the explain table is keyed by them. Renaming one is
// a breaking change to every stored artifact.

// Budget
pub const BUDGET_MAX_STEPS_EXCEEDED: &str = "BUDGET_MAX_STEPS_EXCEEDED";
pub const BUDGET_MAX_RUNTIME_EXCEEDED: &str = "BUDGET_MAX_RUNTIME_EXCEEDED";
pub const BUDGET_EXCEEDED: &str = "BUDGET_EXCEEDED";
pub const BUDGET_MAX_RUNS_PER_DAY: &str = "BUDGET_MAX_RUNS_PER_DAY";

// Autonomy
pub const AUTONOMY_MODE_OFF: &str = "AUTONOMY_MODE_OFF";
pub const AUTONOMY_READ_ONLY_VIOLATION: &str = "AUTONOMY_READ_ONLY_VIOLATION";
pub const AUTONOMY_APPROVAL_REQUIRED: &str = "AUTONOMY_APPROVAL_REQUIRED";

// Trust / governance
pub const CONFIDENCE_TOO_LOW: &str = "CONFIDENCE_TOO_LOW";
pub const REQUALIFICATION_BLOCKED: &str = "REQUALIFICATION_BLOCKED";
pub const PROBATION_READ_ONLY_ENFORCED: &str = "PROBATION_READ_ONLY_ENFORCED";
pub const DOMAIN_OVERLAY_DENY_WRITE: &str = "DOMAIN_OVERLAY_DENY_WRITE";

// Mode/limb governance
pub const MODE_DECLARATION_MISSING: &str = "MODE_DECLARATION_MISSING";
pub const MODE_FROZEN: &str = "MODE_FROZEN";
pub const LIMB_INACTIVE: &str = "LIMB_INACTIVE";

// Integration safety lanes
pub const NOTION_LIVE_WRITE_BLOCKED: &str = "NOTION_LIVE_WRITE_BLOCKED";
pub const NOTION_LIVE_PATCH_ONLY: &str = "NOTION_LIVE_PATCH_ONLY";
pub const NOTION_LIVE_PRESTATE_REQUIRED: &str = "NOTION_LIVE_PRESTATE_REQUIRED";
pub const DOCS_CAPTURE_NOT_CONFIGURED: &str = "DOCS_CAPTURE_NOT_CONFIGURED";
pub const DOCS_CAPTURE_HOST_NOT_ALLOWED: &str = "DOCS_CAPTURE_HOST_NOT_ALLOWED";
pub const BROWSER_OPERATOR_NETWORK_BLOCKED: &str = "BROWSER_OPERATOR_NETWORK_BLOCKED";
pub const BROWSER_OPERATOR_APPROVAL_REQUIRED: &str = "BROWSER_OPERATOR_APPROVAL_REQUIRED";

// Generic policy
pub const CAPABILITY_NOT_ALLOWED: &str = "CAPABILITY_NOT_ALLOWED";
pub const POLICY_URL_INVALID: &str = "POLICY_URL_INVALID";
pub const POLICY_URL_PROTOCOL_BLOCK: &str = "POLICY_URL_PROTOCOL_BLOCK";
pub const DOMAIN_NOT_ALLOWED: &str = "DOMAIN_NOT_ALLOWED";
pub const POLICY_METHOD_BLOCK: &str = "POLICY_METHOD_BLOCK";
pub const POLICY_MAX_PHASES: &str = "POLICY_MAX_PHASES";
pub const POLICY_MAX_TOTAL_STEPS: &str = "POLICY_MAX_TOTAL_STEPS";
pub const POLICY_TIME_WINDOW: &str = "POLICY_TIME_WINDOW";

// Production gate
pub const PRODUCTION_APPROVAL_REQUIRED: &str = "PRODUCTION_APPROVAL_REQUIRED";

// Scheduler
pub const JOB_PAUSED: &str = "JOB_PAUSED";
pub const JOB_NOT_DUE: &str = "JOB_NOT_DUE";
pub const SCHEDULE_DUE: &str = "SCHEDULE_DUE";
pub const MANUAL_TRIGGER: &str = "MANUAL_TRIGGER";

/// Every code, for exhaustiveness checks against the explain table.
pub const ALL: &[&str] = &[
    BUDGET_MAX_STEPS_EXCEEDED,
    BUDGET_MAX_RUNTIME_EXCEEDED,
    BUDGET_EXCEEDED,
    BUDGET_MAX_RUNS_PER_DAY,
    AUTONOMY_MODE_OFF,
    AUTONOMY_READ_ONLY_VIOLATION,
    AUTONOMY_APPROVAL_REQUIRED,
    CONFIDENCE_TOO_LOW,
    REQUALIFICATION_BLOCKED,
    PROBATION_READ_ONLY_ENFORCED,
    DOMAIN_OVERLAY_DENY_WRITE,
    MODE_DECLARATION_MISSING,
    MODE_FROZEN,
    LIMB_INACTIVE,
    NOTION_LIVE_WRITE_BLOCKED,
    NOTION_LIVE_PATCH_ONLY,
    NOTION_LIVE_PRESTATE_REQUIRED,
    DOCS_CAPTURE_NOT_CONFIGURED,
    DOCS_CAPTURE_HOST_NOT_ALLOWED,
    BROWSER_OPERATOR_NETWORK_BLOCKED,
    BROWSER_OPERATOR_APPROVAL_REQUIRED,
    CAPABILITY_NOT_ALLOWED,
    POLICY_URL_INVALID,
    POLICY_URL_PROTOCOL_BLOCK,
    DOMAIN_NOT_ALLOWED,
    POLICY_METHOD_BLOCK,
    POLICY_MAX_PHASES,
    POLICY_MAX_TOTAL_STEPS,
    POLICY_TIME_WINDOW,
    PRODUCTION_APPROVAL_REQUIRED,
    JOB_PAUSED,
    JOB_NOT_DUE,
    SCHEDULE_DUE,
    MANUAL_TRIGGER,
];
