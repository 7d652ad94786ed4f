use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::*;

use crate::constants::*;
use crate::k8s::is_conflict;

/// Bounds for retrying an optimistic-concurrency update.  `steps` is the total number of
/// attempts; the delay before attempt `n + 1` is `duration * factor^(n - 1)`, capped at `cap`,
/// and then scaled by a random factor in `[1 - jitter, 1 + jitter)`.
#[derive(Clone, Debug)]
pub struct Backoff {
    pub steps: u32,
    pub duration: Duration,
    pub factor: f64,
    pub cap: Duration,
    pub jitter: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            steps: CONFLICT_RETRY_STEPS,
            duration: Duration::from_millis(CONFLICT_RETRY_DELAY_MS),
            factor: 1.0,
            cap: Duration::from_secs(1),
            jitter: CONFLICT_RETRY_JITTER,
        }
    }
}

impl Backoff {
    // Requests that lost the same race would otherwise all wake up and collide again
    pub fn jittered(&self, delay: Duration) -> Duration {
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return delay;
        }
        let scale = rand::thread_rng().gen_range(1.0 - jitter..1.0 + jitter);
        delay.mul_f64(scale)
    }
}

/// Run `op` until it succeeds, fails with something other than a 409 Conflict, or runs out of
/// attempts.  `op` is expected to re-read whatever it's about to write on every call, since a
/// conflict means its previous view of the object was stale.
pub async fn retry_on_conflict<F, Fut, T>(backoff: &Backoff, op_name: &str, mut op: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 0u32;
    let mut delay = backoff.duration;

    loop {
        attempt += 1;
        match op().await {
            Ok(res) => return Ok(res),
            Err(err) if is_conflict(&err) && attempt < backoff.steps => {
                let jittered_delay = backoff.jittered(delay);
                warn!(operation = %op_name, attempt, delay_ms = jittered_delay.as_millis(), "conflict, retrying: {err}");
                tokio::time::sleep(jittered_delay).await;
                delay = delay.mul_f64(backoff.factor).min(backoff.cap);
            },
            Err(err) => {
                if is_conflict(&err) {
                    error!(operation = %op_name, attempt, "giving up after repeated conflicts");
                }
                return Err(err);
            },
        }
    }
}
