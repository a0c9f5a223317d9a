// ============================================================
// Layer 4 — Logging
// ============================================================
// Installs a fmt subscriber filtered by RUST_LOG, falling back
// to `seq2seq_attn=info`. Training logs one line per epoch at
// info, per step at debug, and per decode step at trace.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVE: &str = "seq2seq_attn=info";

/// Install the global subscriber. Fails if `directive` does not
/// parse or a global subscriber is already set.
pub fn init_tracing(directive: &str) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(directive.parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

/// `init_tracing(DEFAULT_DIRECTIVE)`, ignoring an already-installed subscriber.
pub fn init_default() {
    if init_tracing(DEFAULT_DIRECTIVE).is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error_not_a_panic() {
        init_default();
        assert!(init_tracing(DEFAULT_DIRECTIVE).is_err());
    }

    #[test]
    fn test_bad_directive_is_rejected() {
        assert!(init_tracing("seq2seq_attn=notalevel").is_err());
    }
}
