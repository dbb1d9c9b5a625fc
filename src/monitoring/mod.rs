/*!
 * Monitoring
 * Structured tracing for supervision and resolution
 */

mod tracer;

pub use tracer::{generate_trace_id, init_tracing, span_operation, OperationSpan};
