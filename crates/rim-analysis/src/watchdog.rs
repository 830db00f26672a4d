//! Wall-clock limit for one analysis job.

use std::time::Duration;

use crate::error::{AnalysisError, Result};

/// Run `job` on the blocking pool, giving up after `timeout_secs` when set.
///
/// An expired job is detached, not cancelled: it runs to completion and its
/// result is dropped.
pub async fn run_with_timeout<T, F>(job: F, timeout_secs: Option<u64>) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(job);
    let joined = match timeout_secs {
        Some(max_seconds) => tokio::time::timeout(Duration::from_secs(max_seconds), handle)
            .await
            .map_err(|_| {
                tracing::warn!(max_seconds, "Analysis exceeded its time limit");
                AnalysisError::Timeout { max_seconds }
            })?,
        None => handle.await,
    };
    joined?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use crate::RiskAnalysisEngine;
    use rim_core::types::*;

    fn input() -> GraphInput {
        GraphInput {
            risks: vec![op("a"), strat("b")],
            objectives: vec![objective("t")],
            influences: vec![influence("a", "b", InfluenceStrength::Strong)],
            objective_impacts: vec![impact("b", "t", ImpactLevel::High)],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_expired_limit_returns_timeout() {
        let slow = || -> Result<String> {
            std::thread::sleep(Duration::from_millis(500));
            Ok("late".to_string())
        };
        let err = run_with_timeout(slow, Some(0)).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Timeout { max_seconds: 0 }));
    }

    #[tokio::test]
    async fn test_unlimited_job_returns_report_json() {
        let engine = RiskAnalysisEngine::new();
        let job = move || -> Result<String> {
            Ok(serde_json::to_string(&engine.analyze(&input())?)?)
        };
        let json = run_with_timeout(job, None).await.unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["graph_stats"]["risk_count"], 2);
        assert_eq!(value["influence"]["total_paths"], 2);
    }

    #[tokio::test]
    async fn test_job_within_limit_and_job_errors_pass_through() {
        let ok = run_with_timeout(|| Ok(7_u32), Some(30)).await.unwrap();
        assert_eq!(ok, 7);

        let mut bad = input();
        bad.influences.push(influence("a", "ghost", InfluenceStrength::Weak));
        let engine = RiskAnalysisEngine::new();
        let err = run_with_timeout(move || engine.analyze(&bad).map(|_| ()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Structural(_)));
    }

    #[tokio::test]
    async fn test_panicking_job_is_reported() {
        let err = run_with_timeout(|| -> Result<()> { panic!("boom") }, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::TaskFailed(_)));
    }
}
