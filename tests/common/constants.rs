//! Shared constants for end-to-end tests
//!
//! Viewer ids, ticket ids and timing knobs used across the suite.

// ============================================================================
// Viewers
// ============================================================================

/// Administrator viewer id
pub const ADMIN_ID: &str = "admin-1";

/// Support agent viewer id
pub const AGENT_ID: &str = "agent-1";

/// Second support agent, used for assignments to someone else
pub const OTHER_AGENT_ID: &str = "agent-2";

/// Customer viewer id
pub const CUSTOMER_ID: &str = "customer-1";

/// Another customer whose tickets must stay invisible to `CUSTOMER_ID`
pub const OTHER_CUSTOMER_ID: &str = "customer-2";

// ============================================================================
// Seeded tickets
// ============================================================================

/// Open ticket owned by `CUSTOMER_ID`, unassigned
pub const TICKET_1_ID: &str = "T-1";

/// In-progress ticket owned by `OTHER_CUSTOMER_ID`, assigned to `OTHER_AGENT_ID`
pub const TICKET_2_ID: &str = "T-2";

// ============================================================================
// Timing
// ============================================================================

/// Poll interval of the engine under test
pub const POLL_INTERVAL_MS: u64 = 50;

/// How long `wait_until` keeps checking before giving up
pub const WAIT_TIMEOUT_MS: u64 = 5000;

/// Delay between `wait_until` checks
pub const WAIT_POLL_INTERVAL_MS: u64 = 20;

/// Per-request timeout of the test HTTP client
pub const REQUEST_TIMEOUT_SECS: u64 = 5;

/// Max time to wait for a spawned server to accept requests
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Delay between readiness checks
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;
