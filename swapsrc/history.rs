//! Swap history sink (§10 ambient stack): appends one JSON line per
//! terminal outcome. Persistence-shaped, not persistence-backed — nothing
//! reads this file back in to resume state after a restart (§1 Non-goals
//! exclude a resumable store); it exists purely as an audit trail, the way
//! the teacher's `SavedSwap` log is written but, in this design, never
//! replayed.

use std::path::PathBuf;

use log::warn;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::deal::SwapOutcome;
use crate::errors::CoordinatorError;

pub struct SwapHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SwapHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SwapHistory {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Serializes `outcome` to a single JSON line and appends it. Errors are
    /// logged, not propagated: a history write failure must never fail the
    /// swap it is recording.
    pub async fn record(&self, outcome: &SwapOutcome) {
        if let Err(e) = self.try_record(outcome).await {
            warn!("failed to append swap history entry: {e}");
        }
    }

    async fn try_record(&self, outcome: &SwapOutcome) -> Result<(), CoordinatorError> {
        let line = serde_json::to_string(&HistoryEntry::from(outcome))
            .map_err(|e| CoordinatorError::ConfigError(e.to_string()))?;

        let _guard = self.lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| CoordinatorError::ConfigError(format!("opening {}: {e}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| CoordinatorError::ConfigError(e.to_string()))?;
        file.write_all(b"\n")
            .await
            .map_err(|e| CoordinatorError::ConfigError(e.to_string()))?;
        Ok(())
    }
}

#[derive(serde::Serialize)]
#[serde(tag = "outcome")]
enum HistoryEntry {
    #[serde(rename = "paid")]
    Paid {
        r_hash: String,
        order_id: String,
        pair_id: String,
    },
    #[serde(rename = "failed")]
    Failed { r_hash: String, reason: String },
}

impl From<&SwapOutcome> for HistoryEntry {
    fn from(outcome: &SwapOutcome) -> Self {
        match outcome {
            SwapOutcome::Paid(result) => HistoryEntry::Paid {
                r_hash: result.r_hash.clone(),
                order_id: result.order_id.clone(),
                pair_id: result.pair_id.clone(),
            },
            SwapOutcome::Failed { r_hash, reason } => HistoryEntry::Failed {
                r_hash: r_hash.clone(),
                reason: reason.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::deal::{Role, SwapResult};

    #[tokio::test]
    async fn record_appends_one_line_per_call() {
        let dir = std::env::temp_dir().join(format!("swap-history-test-{}", std::process::id()));
        let history = SwapHistory::new(dir.clone());

        let paid = SwapOutcome::Paid(SwapResult {
            order_id: "O1".into(),
            local_order_id: "L1".into(),
            pair_id: "LTC/BTC".into(),
            quantity: BigDecimal::from(1),
            amount_received: 100,
            amount_sent: 100,
            r_hash: "hash1".into(),
            peer_pub_key: "peer".into(),
            role: Role::Taker,
        });
        let failed = SwapOutcome::Failed {
            r_hash: "hash2".into(),
            reason: "no route".into(),
        };

        history.record(&paid).await;
        history.record(&failed).await;

        let contents = tokio::fs::read_to_string(&dir).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("hash1"));
        assert!(contents.contains("no route"));

        let _ = tokio::fs::remove_file(&dir).await;
    }
}
