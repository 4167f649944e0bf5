use crate::api_client::ApiClient;
use crate::output::TestResult;
use crate::sse_client::Connection;
use anyhow::Result;
use colored::*;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);
const SETTLE_DELAY: Duration = Duration::from_millis(500);

fn unique_message(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

/// A stream can be opened and stays open without receiving anything unprompted.
pub async fn test_connection(base_url: &str) -> Result<TestResult> {
    println!("\n{} Running: Connection Test", "→".blue());
    let started = Instant::now();

    let mut consumer = Connection::establish(base_url, "Consumer".to_string()).await?;
    let unexpected = consumer.drain(SETTLE_DELAY).await;

    if unexpected.is_empty() {
        Ok(TestResult::pass("Connection Test", started.elapsed()))
    } else {
        Ok(TestResult::fail(
            "Connection Test",
            format!(
                "{} received {} message(s) without any submission",
                consumer.label,
                unexpected.len()
            ),
            started.elapsed(),
        ))
    }
}

/// A submitted message comes out of the stream.
pub async fn test_round_trip(base_url: &str, api_client: &ApiClient) -> Result<TestResult> {
    println!("\n{} Running: Round Trip Test", "→".blue());
    let started = Instant::now();

    let mut consumer = Connection::establish(base_url, "Consumer".to_string()).await?;
    tokio::time::sleep(SETTLE_DELAY).await;

    let message = unique_message("round-trip");
    let submission = api_client.post_webhook(&message).await?;
    if submission.status != StatusCode::OK {
        return Ok(TestResult::fail(
            "Round Trip Test",
            format!("Webhook returned {}: {}", submission.status, submission.body),
            started.elapsed(),
        ));
    }

    let malformed = api_client.post_raw("{not json".to_string()).await?;
    if malformed.status != StatusCode::BAD_REQUEST {
        return Ok(TestResult::fail(
            "Round Trip Test",
            format!("Malformed body returned {} instead of 400", malformed.status),
            started.elapsed(),
        ));
    }

    match consumer.wait_for_message(&message, DELIVERY_TIMEOUT).await {
        Ok(event) => {
            let latency = event.timestamp.duration_since(started);
            println!("{} Delivered after {}ms", "✓".green(), latency.as_millis());
            Ok(TestResult::pass("Round Trip Test", started.elapsed()))
        }
        Err(e) => Ok(TestResult::fail(
            "Round Trip Test",
            e.to_string(),
            started.elapsed(),
        )),
    }
}

/// Two consumers share a batch of messages: every message reaches exactly one of them.
pub async fn test_competing_consumers(
    base_url: &str,
    api_client: &ApiClient,
) -> Result<TestResult> {
    println!("\n{} Running: Competing Consumers Test", "→".blue());
    let started = Instant::now();
    const BATCH: usize = 6;

    let mut first = Connection::establish(base_url, "Consumer 1".to_string()).await?;
    let mut second = Connection::establish(base_url, "Consumer 2".to_string()).await?;
    tokio::time::sleep(SETTLE_DELAY).await;

    let prefix = unique_message("competing");
    let mut expected = Vec::with_capacity(BATCH);
    for i in 0..BATCH {
        let message = format!("{}-{}", prefix, i);
        let submission = api_client.post_webhook(&message).await?;
        if submission.status != StatusCode::OK {
            return Ok(TestResult::fail(
                "Competing Consumers Test",
                format!("Webhook returned {}: {}", submission.status, submission.body),
                started.elapsed(),
            ));
        }
        expected.push(message);
    }

    let (first_events, second_events) =
        tokio::join!(first.drain(SETTLE_DELAY * 2), second.drain(SETTLE_DELAY * 2));

    let mut counts: HashMap<String, usize> = HashMap::new();
    for event in first_events.iter().chain(second_events.iter()) {
        if event.data.starts_with(&prefix) {
            *counts.entry(event.data.clone()).or_default() += 1;
        }
    }

    let missing: Vec<_> = expected.iter().filter(|m| !counts.contains_key(*m)).collect();
    let duplicated: Vec<_> = counts.iter().filter(|(_, n)| **n > 1).collect();

    println!(
        "{} {} received {}, {} received {}",
        "→".blue(),
        first.label,
        first_events.len(),
        second.label,
        second_events.len()
    );

    if missing.is_empty() && duplicated.is_empty() {
        Ok(TestResult::pass("Competing Consumers Test", started.elapsed()))
    } else {
        Ok(TestResult::fail(
            "Competing Consumers Test",
            format!("missing: {:?}, duplicated: {:?}", missing, duplicated),
            started.elapsed(),
        ))
    }
}

/// With no consumers attached, the submission after the queue fills up is
/// answered with 503 once the server's grace period runs out. The queue is
/// drained afterwards so the server is left empty.
///
/// Requires that no other consumers are connected to the server.
pub async fn test_busy(
    base_url: &str,
    api_client: &ApiClient,
    queue_capacity: usize,
) -> Result<TestResult> {
    println!("\n{} Running: Busy Test", "→".blue());
    let started = Instant::now();

    let prefix = unique_message("busy");
    for i in 0..queue_capacity {
        let submission = api_client.post_webhook(&format!("{}-{}", prefix, i)).await?;
        if submission.status != StatusCode::OK {
            return Ok(TestResult::fail(
                "Busy Test",
                format!(
                    "Submission {} returned {} before the queue was full",
                    i, submission.status
                ),
                started.elapsed(),
            ));
        }
    }

    println!(
        "{} Queue filled, waiting for the server to give up on one more...",
        "→".blue()
    );
    let waited_from = Instant::now();
    let overflow = api_client.post_webhook(&format!("{}-overflow", prefix)).await?;
    let waited = waited_from.elapsed();

    // Drain what we queued so later runs start from an empty queue.
    let mut drainer = Connection::establish(base_url, "Drainer".to_string()).await?;
    let drained = drainer.drain(SETTLE_DELAY * 2).await;
    println!("{} Drained {} message(s)", "→".blue(), drained.len());

    if overflow.status == StatusCode::SERVICE_UNAVAILABLE {
        println!(
            "{} Got 503 after {}ms: {}",
            "✓".green(),
            waited.as_millis(),
            overflow.body
        );
        Ok(TestResult::pass("Busy Test", started.elapsed()))
    } else {
        Ok(TestResult::fail(
            "Busy Test",
            format!(
                "Expected 503 for submission past capacity, got {}",
                overflow.status
            ),
            started.elapsed(),
        ))
    }
}
