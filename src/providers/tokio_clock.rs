// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::traits::Clock;

/// Wall-clock [`Clock`] backed by `tokio::time::sleep`.
///
/// Honors `tokio::time::pause`, so paused-runtime tests still run instantly.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}
