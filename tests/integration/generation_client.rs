//! Gate and retry behavior of the generation client, on paused tokio time.

use crate::integration::support::ScriptedProvider;
use draftsmith::error::ProviderError;
use draftsmith::generation::{ClientConfig, GenerationClient};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

fn config(max_concurrent: usize, min_interval_ms: u64, max_retries: u32) -> ClientConfig {
    ClientConfig {
        max_concurrent,
        min_interval_ms,
        max_retries,
        base_retry_delay_ms: 1_000,
        max_retry_delay_ms: 8_000,
        call_timeout_secs: 0,
        context_budget_chars: 1_000,
    }
}

#[tokio::test(start_paused = true)]
async fn in_flight_calls_never_exceed_limit() {
    let provider = Arc::new(
        ScriptedProvider::new(|_, i| Ok(format!("reply {}", i)))
            .with_latency(Duration::from_millis(500)),
    );
    let client = GenerationClient::new(provider.clone(), &config(3, 0, 0));

    let prompts: Vec<String> = (0..20).map(|i| format!("prompt {}", i)).collect();
    let results = join_all(prompts.iter().map(|p| client.generate(p))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(provider.call_count(), 20);
    assert_eq!(provider.peak_in_flight(), 3);
    assert_eq!(client.gate().in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn consecutive_dispatches_respect_min_interval() {
    let provider = Arc::new(
        ScriptedProvider::new(|_, _| Ok("ok".to_string())).with_latency(Duration::from_millis(10)),
    );
    let client = GenerationClient::new(provider.clone(), &config(8, 300, 0));

    let prompts: Vec<String> = (0..10).map(|i| format!("prompt {}", i)).collect();
    join_all(prompts.iter().map(|p| client.generate(p))).await;

    let mut starts: Vec<_> = provider.calls().into_iter().map(|c| c.started_at).collect();
    starts.sort();
    assert_eq!(starts.len(), 10);
    for pair in starts.windows(2) {
        assert!(
            pair[1] - pair[0] >= Duration::from_millis(300),
            "dispatches {:?} apart",
            pair[1] - pair[0]
        );
    }
}

#[tokio::test(start_paused = true)]
async fn retry_waits_for_suggested_delay() {
    let provider = Arc::new(ScriptedProvider::new(|_, i| {
        if i == 0 {
            Err(ProviderError::transient_after(
                "429 quota",
                Duration::from_secs(17),
            ))
        } else {
            Ok("  recovered \r\n".to_string())
        }
    }));
    let client = GenerationClient::new(provider.clone(), &config(1, 0, 3));

    let text = client.generate("prompt").await.unwrap();
    assert_eq!(text, "recovered");

    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].started_at - calls[0].started_at >= Duration::from_secs(17));
}

#[tokio::test(start_paused = true)]
async fn fallback_backoff_grows_between_attempts() {
    let provider = Arc::new(ScriptedProvider::new(|_, i| {
        if i < 3 {
            Err(ProviderError::transient("503 overloaded"))
        } else {
            Ok("ok".to_string())
        }
    }));
    let client = GenerationClient::new(provider.clone(), &config(1, 0, 4));
    client.generate("prompt").await.unwrap();

    let starts: Vec<_> = provider.calls().into_iter().map(|c| c.started_at).collect();
    assert_eq!(starts.len(), 4);
    assert!(starts[1] - starts[0] >= Duration::from_secs(1));
    assert!(starts[2] - starts[1] >= Duration::from_secs(2));
    assert!(starts[3] - starts[2] >= Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_last_error_unchanged() {
    let provider = Arc::new(ScriptedProvider::new(|_, _| {
        Err(ProviderError::transient_after(
            "RESOURCE_EXHAUSTED",
            Duration::from_secs(2),
        ))
    }));
    let client = GenerationClient::new(provider.clone(), &config(1, 0, 2));

    let err = client.generate("prompt").await.unwrap_err();
    assert_eq!(
        err,
        ProviderError::transient_after("RESOURCE_EXHAUSTED", Duration::from_secs(2))
    );
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn fatal_errors_are_not_retried() {
    let provider = Arc::new(ScriptedProvider::new(|_, _| {
        Err(ProviderError::fatal("API key not valid"))
    }));
    let client = GenerationClient::new(provider.clone(), &config(1, 0, 5));

    let err = client.generate("prompt").await.unwrap_err();
    assert_eq!(err, ProviderError::fatal("API key not valid"));
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn timed_out_calls_are_retried_as_transient() {
    let provider = Arc::new(
        ScriptedProvider::new(|_, _| Ok("late".to_string())).with_latency(Duration::from_secs(5)),
    );
    let mut cfg = config(2, 0, 1);
    cfg.call_timeout_secs = 1;
    let client = GenerationClient::new(provider.clone(), &cfg);

    let err = client.generate("prompt").await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(provider.call_count(), 2);
    assert_eq!(client.gate().in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn context_is_capped_before_prompt() {
    let provider = Arc::new(ScriptedProvider::new(|_, _| Ok("ok".to_string())));
    let mut cfg = config(1, 0, 0);
    cfg.context_budget_chars = 10;
    let client = GenerationClient::new(provider.clone(), &cfg);

    client
        .generate_with_context(&["abcdefghijklmnop".to_string()], "PROMPT")
        .await
        .unwrap();

    let input = &provider.calls()[0].input;
    assert!(input.starts_with("abcdefghij\n\n[Context truncated to 10 characters]"));
    assert!(input.ends_with("\n\nPROMPT"));
}
