//! Strongly-typed identifiers for Conduit entities.
//!
//! Each id is a [`domain_key::define_uuid!`] newtype over a UUID, keyed by a
//! distinct domain marker, so that an `ExecutionId` can never be passed
//! where a `NodeId` is expected even though both are bit-for-bit UUIDs
//! underneath.

use domain_key::define_uuid;

// Re-exported so callers matching on a failed `parse()` don't need a direct
// dependency on `domain-key` themselves.
pub use domain_key::UuidParseError;

define_uuid!(WorkflowIdDomain => WorkflowId);
define_uuid!(ExecutionIdDomain => ExecutionId);
define_uuid!(NodeIdDomain => NodeId);
define_uuid!(SpanIdDomain => SpanId);
define_uuid!(TraceIdDomain => TraceId);
define_uuid!(SubscriptionIdDomain => SubscriptionId);
