//! Basic example demonstrating real GET and POST requests.
//!
//! This example shows how to:
//! - Create an endpoint with a network activity plugin
//! - Send a request and read the typed success model
//! - Perform a request with callbacks
//! - Read the error model of a failed request
//!
//! Run with: `cargo run --example basic_call`

use outcall::{Endpoint, NetworkActivity, NetworkActivityPlugin};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

/// JSONPlaceholder answers unknown resources with an empty object.
#[derive(Debug, Deserialize)]
struct NoContent {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("outcall=debug,basic_call=info")
        .init();

    let activity = NetworkActivity::with_visibility_handler(|visible| {
        println!("[activity indicator {}]", if visible { "on" } else { "off" });
    });

    let endpoint = Endpoint::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .timeout(Duration::from_secs(10))
        .plugin(Arc::new(NetworkActivityPlugin::new(activity.clone())))
        .build()?;

    println!("=== GET Request Example ===");
    let response = endpoint
        .request::<Post, NoContent>("posts/1")?
        .send()
        .await?;

    println!("Post ID: {}", response.data.id);
    println!("Title: {}", response.data.title);
    println!("Request latency: {:?}", response.latency);
    println!("Status code: {}", response.status);
    println!();

    println!("=== POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };

    let request = endpoint
        .request::<Post, NoContent>("posts")?
        .method(http::Method::POST)
        .json_body(&new_post)?;

    let (tx, rx) = oneshot::channel();
    let failed = Arc::new(std::sync::Mutex::new(Some(tx)));
    let succeeded = failed.clone();
    request.perform(
        move |response| {
            println!("Created post ID: {}", response.data.id);
            println!("Content-Type: {:?}", response.header("content-type"));
            if let Some(tx) = succeeded.lock().unwrap().take() {
                let _ = tx.send(());
            }
        },
        move |error| {
            eprintln!("POST failed: {}", error);
            if let Some(tx) = failed.lock().unwrap().take() {
                let _ = tx.send(());
            }
        },
    );
    rx.await?;
    println!();

    println!("=== Error Response Example ===");
    let result = endpoint
        .request::<Post, NoContent>("posts/999999")?
        .send()
        .await;

    match result {
        Ok(post) => println!("Unexpectedly found post {}", post.data.id),
        Err(error) => {
            println!("Status: {:?}", error.status());
            println!("Error model: {:?}", error.error_model);
            println!("Cause: {}", error.cause);
        }
    }

    println!("Requests still in flight: {}", activity.count());
    Ok(())
}
