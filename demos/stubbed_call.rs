//! Answering requests from stubs instead of the network.
//!
//! This example shows how to:
//! - Enable stubbing for a whole endpoint
//! - Stub a literal model, a literal error, and a fixture file
//! - See that stubbed callbacks run before `perform` returns
//!
//! Run with: `cargo run --example stubbed_call`

use outcall::{ApiError, Endpoint, FixtureDir, FixtureLoader};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
struct User {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ServiceError {
    code: u16,
    message: String,
}

fn main() -> Result<(), outcall::Error> {
    tracing_subscriber::fmt()
        .with_env_filter("outcall=debug,stubbed_call=info")
        .init();

    let endpoint = Endpoint::builder()
        .base_url("https://api.example.com")?
        .stubbing_enabled(true)
        .build()?;
    let fixtures: Arc<dyn FixtureLoader> = Arc::new(FixtureDir::new(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures"
    )));

    println!("=== Literal Model ===");
    endpoint
        .request::<User, ServiceError>("users/7")?
        .stub_model(User {
            id: 7,
            name: "Kevin Flynn".to_string(),
        })
        .perform(
            |response| println!("Stubbed user: {:?}", response.data),
            |error| eprintln!("Unexpected failure: {}", error),
        );
    println!("perform returned");
    println!();

    println!("=== Literal Error ===");
    endpoint
        .request::<User, ServiceError>("users/8")?
        .stub_error(ApiError::from_model(ServiceError {
            code: 404,
            message: "User not found".to_string(),
        }))
        .perform(
            |response| println!("Unexpected success: {:?}", response.data),
            |error| println!("Stubbed error model: {:?}", error.error_model),
        );
    println!();

    println!("=== Fixture ===");
    let request = endpoint
        .request::<User, ServiceError>("users/1")?
        .stub_fixture("user.json", fixtures.clone());
    println!("Preview: {:?}", request.stubbed_model()?);
    request.perform(
        |response| println!("Fixture user: {}", response.data.name),
        |error| eprintln!("Unexpected failure: {}", error),
    );
    println!();

    println!("=== Missing Stub ===");
    endpoint.request::<User, ServiceError>("users/9")?.perform(
        |_| println!("Unexpected success"),
        |error| println!("Failed fast: {}", error.cause),
    );

    Ok(())
}
