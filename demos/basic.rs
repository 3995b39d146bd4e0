//! Walks through the cache client against the in-process mock server.
//!
//! ```bash
//! cargo run --example basic --features test-utils
//! ```

use std::time::Duration;

use dataplane::core::command;
use dataplane::testing::MockServer;
use dataplane::{Cache, ClientBuilder, Json};
use serde::Serialize;

#[derive(Serialize)]
struct Visit {
    path: &'static str,
    status: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    let client = ClientBuilder::new()
        .address(server.url())
        .max_active(4)
        .idle_timeout(Duration::from_secs(30))
        .build()?;

    client.set_ex("session:42", "alice", 60).await?;
    println!("session:42 = {}", client.get_string("session:42").await?);

    client
        .set("visit:last", &Json(Visit { path: "/", status: 200 }))
        .await?;
    println!("visit:last = {}", client.get_string("visit:last").await?);

    client.hmset("user:42", &[("name", "alice"), ("plan", "pro")]).await?;
    println!("user:42 = {:?}", client.hgetall("user:42").await?);

    for (score, member) in [(3.0, "carol"), (1.0, "alice"), (2.0, "bob")] {
        client.zadd("leaderboard", score, member).await?;
    }
    println!(
        "top two = {:?}",
        client.zrange_by_score("leaderboard", "(1", "+inf").await?
    );

    let last = client
        .execute_batch_last_reply_only(&[
            command::incr("hits"),
            command::incr("hits"),
            command::get("hits"),
        ])
        .await?;
    println!("hits after batch = {last:?}");

    println!("pool = {:?}", client.pool().stats());
    client.shutdown();
    Ok(())
}
