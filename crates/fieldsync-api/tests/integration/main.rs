//! Integration tests for fieldsync-api
//!
//! Uses wiremock to simulate the backend REST API and verifies
//! end-to-end behavior of queued-operation delivery, failure
//! classification, the connectivity probe, and the reference
//! fetch and search endpoints.

mod common;

mod test_deliver;
mod test_reference;
