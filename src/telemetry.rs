//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus, statsd);
//! without a recorder installed, all metric calls are no-ops.
//!
//! All metrics are prefixed with `greeter_`. Counters end in `_total`,
//! histograms carry their unit in the name.

/// Total `Greet` calls handled by the server.
///
/// Labels: `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "greeter_requests_total";

/// Server-side `Greet` handling time in seconds.
pub const REQUEST_DURATION_SECONDS: &str = "greeter_request_duration_seconds";
