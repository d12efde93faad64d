use async_trait::async_trait;
use core_logic::{
    generate_wallets, BatchRequest, BatchRunner, DecodedKeypair, DelayConfig, DelayOverrides,
    DelayRange, KeyDecoder, OperationDelay, OperationError, OperationExecutor, OperationReceipt,
    OperationResult, WalletCredential,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

/// Records every call and fails the targets it was told to fail.
#[derive(Default)]
struct RecordingExecutor {
    calls: Mutex<Vec<(String, String)>>,
    failing_targets: HashSet<String>,
}

impl RecordingExecutor {
    fn failing(targets: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing_targets: targets.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OperationExecutor for RecordingExecutor {
    fn name(&self) -> &str {
        "record"
    }

    async fn execute(&self, keypair: &DecodedKeypair, target: &str) -> OperationResult {
        self.calls
            .lock()
            .unwrap()
            .push((keypair.address().to_string(), target.to_string()));

        if self.failing_targets.contains(target) {
            return Err(OperationError::unexpected(format!("{} refused", target)));
        }
        Ok(OperationReceipt::new(
            format!("{} -> {}", keypair.address(), target),
            json!({"target": target}),
        ))
    }
}

fn no_delays() -> DelayConfig {
    DelayConfig {
        wallet: DelayRange { min_ms: 0, max_ms: 0 },
        operation: OperationDelay::Fixed(0),
    }
}

fn targets(names: &[&str]) -> Vec<String> {
    names.iter().map(|t| t.to_string()).collect()
}

#[tokio::test]
async fn test_visits_pairs_in_input_order() {
    let wallets = generate_wallets(2).unwrap();
    let targets = targets(&["X", "Y"]);
    let request = BatchRequest::new(&wallets, &targets, no_delays()).unwrap();
    let executor = RecordingExecutor::default();

    let result = BatchRunner::default().run(&request, &executor).await;

    let a = wallets[0].public_key.clone();
    let b = wallets[1].public_key.clone();
    assert_eq!(
        executor.calls(),
        vec![
            (a.clone(), "X".to_string()),
            (a, "Y".to_string()),
            (b.clone(), "X".to_string()),
            (b, "Y".to_string()),
        ]
    );
    assert_eq!(result.success, 4);
    assert_eq!(result.failed, 0);
    assert!(result.errors.is_empty());
    assert_eq!(result.details.len(), 4);
    assert!(result.details.iter().all(|d| d.success));
}

#[tokio::test]
async fn test_single_like_scenario() {
    let wallets = generate_wallets(1).unwrap();
    let targets = targets(&["T1"]);
    let request = BatchRequest::new(&wallets, &targets, DelayConfig::default()).unwrap();
    let executor = RecordingExecutor::default();

    let result = BatchRunner::default().run(&request, &executor).await;

    assert_eq!(result.success, 1);
    assert_eq!(result.failed, 0);
    assert_eq!(result.details.len(), 1);
    let detail = &result.details[0];
    assert_eq!(detail.wallet, wallets[0].public_key);
    assert_eq!(detail.target, "T1");
    assert!(detail.result.is_some());
    assert!(detail.error.is_none());
}

#[tokio::test]
async fn test_operation_failures_are_recorded_not_propagated() {
    let wallets = generate_wallets(2).unwrap();
    let targets = targets(&["ok", "bad", "ok2"]);
    let request = BatchRequest::new(&wallets, &targets, no_delays()).unwrap();
    let executor = RecordingExecutor::failing(&["bad"]);

    let result = BatchRunner::default().run(&request, &executor).await;

    assert_eq!(executor.calls().len(), 6);
    assert_eq!(result.success, 4);
    assert_eq!(result.failed, 2);
    assert_eq!(result.errors.len() as u64, result.failed);
    assert_eq!(result.total(), 6);

    let failures: Vec<_> = result.details.iter().filter(|d| !d.success).collect();
    assert_eq!(failures.len(), 2);
    for failure in failures {
        assert_eq!(failure.target, "bad");
        assert!(failure.result.is_none());
        assert!(failure
            .error
            .as_deref()
            .is_some_and(|e| e.contains("bad refused")));
    }
}

#[tokio::test]
async fn test_undecodable_wallet_counts_once() {
    let mut wallets = generate_wallets(2).unwrap();
    wallets.insert(
        1,
        WalletCredential::new("BrokenWallet1111111111111111111111", "not-a-real-key"),
    );
    let targets = targets(&["X", "Y", "Z"]);
    let request = BatchRequest::new(&wallets, &targets, no_delays()).unwrap();
    let executor = RecordingExecutor::default();

    let result = BatchRunner::new(KeyDecoder::strict())
        .run(&request, &executor)
        .await;

    assert_eq!(executor.calls().len(), 6);
    assert_eq!(result.success, 6);
    assert_eq!(result.failed, 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("Failed to process wallet BrokenWallet"));
    assert_eq!(result.details.len(), 6);
    assert!(result
        .details
        .iter()
        .all(|d| d.wallet != "BrokenWallet1111111111111111111111"));
}

#[tokio::test]
async fn test_permissive_policy_runs_derived_wallet() {
    let wallets = vec![WalletCredential::new("SomeAddress", "not-a-real-key")];
    let targets = targets(&["T1"]);
    let request = BatchRequest::new(&wallets, &targets, no_delays()).unwrap();
    let executor = RecordingExecutor::default();

    let result = BatchRunner::new(KeyDecoder::permissive())
        .run(&request, &executor)
        .await;

    let expected = KeyDecoder::permissive().decode("not-a-real-key").unwrap();
    assert_eq!(result.success, 1);
    assert_eq!(result.failed, 0);
    assert_eq!(
        executor.calls(),
        vec![(expected.address().to_string(), "T1".to_string())]
    );
}

#[tokio::test]
async fn test_counts_always_add_up() {
    let mut wallets = generate_wallets(3).unwrap();
    wallets.push(WalletCredential::new("x", "???"));
    let targets = targets(&["a", "b", "c", "d"]);
    let request = BatchRequest::new(&wallets, &targets, no_delays()).unwrap();
    let executor = RecordingExecutor::failing(&["b", "d"]);

    let result = BatchRunner::default().run(&request, &executor).await;

    let decodable = 3u64;
    let undecodable = 1u64;
    assert_eq!(
        result.success + result.failed,
        decodable * targets.len() as u64 + undecodable
    );
    assert_eq!(result.errors.len() as u64, result.failed);
    assert_eq!(result.details.len() as u64, decodable * targets.len() as u64);
}

#[test]
fn test_request_rejects_empty_inputs() {
    let wallets = generate_wallets(1).unwrap();
    let none: Vec<WalletCredential> = Vec::new();
    let some_targets = targets(&["T1"]);
    let no_targets: Vec<String> = Vec::new();

    assert!(BatchRequest::new(&none, &some_targets, no_delays()).is_err());
    assert!(BatchRequest::new(&wallets, &no_targets, no_delays()).is_err());
    assert!(BatchRequest::new(&wallets, &targets(&["T1", "  "]), no_delays()).is_err());
}

#[tokio::test]
async fn test_invalid_delay_range_never_starts() {
    let overrides: DelayOverrides =
        serde_json::from_value(json!({"wallet": {"min": 100, "max": 50}})).unwrap();
    assert!(overrides.resolve().is_err());

    let wallets = generate_wallets(1).unwrap();
    let targets = targets(&["T1"]);
    let inverted = DelayConfig {
        wallet: DelayRange { min_ms: 100, max_ms: 50 },
        operation: OperationDelay::Fixed(0),
    };
    assert!(BatchRequest::new(&wallets, &targets, inverted).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_sleeps_only_between_items() {
    let wallets = generate_wallets(2).unwrap();
    let targets = targets(&["a", "b", "c"]);
    let delays = DelayConfig {
        wallet: DelayRange { min_ms: 30, max_ms: 30 },
        operation: OperationDelay::Fixed(10),
    };
    let request = BatchRequest::new(&wallets, &targets, delays).unwrap();
    let executor = RecordingExecutor::default();

    let started = tokio::time::Instant::now();
    let result = BatchRunner::default().run(&request, &executor).await;
    let elapsed = started.elapsed();

    // one wallet gap plus two operation gaps per wallet
    assert_eq!(result.success, 6);
    assert!(elapsed >= Duration::from_millis(70));
    assert!(elapsed < Duration::from_millis(80));
}

#[tokio::test(start_paused = true)]
async fn test_random_wallet_delay_stays_in_bounds() {
    let wallets = generate_wallets(5).unwrap();
    let targets = targets(&["only"]);
    let delays = DelayConfig {
        wallet: DelayRange { min_ms: 50, max_ms: 100 },
        operation: OperationDelay::Fixed(0),
    };
    let request = BatchRequest::new(&wallets, &targets, delays).unwrap();
    let executor = RecordingExecutor::default();

    let started = tokio::time::Instant::now();
    BatchRunner::default().run(&request, &executor).await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(4 * 50));
    assert!(elapsed <= Duration::from_millis(4 * 100 + 5));
}
