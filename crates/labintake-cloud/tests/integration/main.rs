//! Integration tests for labintake-cloud
//!
//! Uses wiremock to simulate the S3, storage, mail and token endpoints and
//! verifies the requests the adapters send and how responses are classified.

mod common;

mod test_mail;
mod test_s3;
mod test_storage;
mod test_token_refresh;
