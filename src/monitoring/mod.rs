/*!
 * Monitoring Module
 * Structured logging setup and usage reporting
 */

pub mod tracer;

pub use tracer::{init_tracing, report_stats};
