/*!
 * Structured Tracing
 * Subscriber setup and usage reporting for arena events
 *
 * The allocator emits `tracing` events at these levels:
 * - trace: individual allocations, in-place growth, tip releases
 * - debug: arena creation, scratch derivation/release, page commits, resets
 * - warn: OOM recovered at a checkpoint, high arena pressure
 * - error: fatal exhaustion, right before the panic
 */

use crate::memory::{ArenaPressure, ArenaStats};
use tracing::{debug, info, warn};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - ARENA_TRACE_JSON: Enable JSON output (default: false)
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = json_requested();

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "arena tracing initialized");
    }
}

fn json_requested() -> bool {
    matches!(
        std::env::var("ARENA_TRACE_JSON").as_deref(),
        Ok("1") | Ok("true")
    )
}

/// Emit a usage report for an arena
///
/// High and critical pressure are reported as warnings.
pub fn report_stats(label: &str, stats: &ArenaStats) {
    let pressure = stats.pressure();
    match pressure {
        ArenaPressure::High | ArenaPressure::Critical => warn!(
            arena = label,
            used = stats.used,
            capacity = stats.capacity,
            usage = format_args!("{:.1}%", stats.usage_percentage),
            %pressure,
            "arena under pressure"
        ),
        ArenaPressure::Low | ArenaPressure::Medium => debug!(
            arena = label,
            used = stats.used,
            capacity = stats.capacity,
            committed = ?stats.committed,
            %pressure,
            "arena usage"
        ),
    }
}
