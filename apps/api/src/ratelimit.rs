//! Per-key daily request quotas for the public chat and contact endpoints.
//!
//! Counters live in process memory, which matches the single-process
//! deployment model; they reset when the UTC day rolls over.

use std::collections::HashMap;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;

use crate::errors::AppError;
use crate::state::AppState;

/// (scope, caller key) -> (day bucket, requests used)
type QuotaMap = HashMap<(String, String), (NaiveDate, u32)>;

#[derive(Default)]
pub struct DailyQuotas {
    counters: Mutex<QuotaMap>,
}

impl DailyQuotas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one unit of quota; returns false once the daily limit is hit.
    pub async fn try_acquire(
        &self,
        scope: &str,
        key: &str,
        limit: u32,
        today: NaiveDate,
    ) -> bool {
        let mut counters = self.counters.lock().await;
        let entry = counters
            .entry((scope.to_string(), key.to_string()))
            .or_insert((today, 0));

        if entry.0 != today {
            *entry = (today, 0);
        }
        if entry.1 >= limit {
            return false;
        }
        entry.1 += 1;
        true
    }
}

/// API key header first, proxy-forwarded address second, anonymous last.
fn caller_key(headers: &HeaderMap) -> String {
    if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return key.to_string();
    }
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            return first.trim().to_string();
        }
    }
    "anonymous".to_string()
}

/// 30 requests per key per day on POST /chat.
pub async fn chat_quota(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state, "chat", state.config.chat_daily_limit, req.headers()).await?;
    Ok(next.run(req).await)
}

/// 3 requests per key per day on POST /contact.
pub async fn contact_quota(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state, "contact", state.config.contact_daily_limit, req.headers()).await?;
    Ok(next.run(req).await)
}

async fn enforce(
    state: &AppState,
    scope: &str,
    limit: u32,
    headers: &HeaderMap,
) -> Result<(), AppError> {
    let key = caller_key(headers);
    if state
        .quotas
        .try_acquire(scope, &key, limit, Utc::now().date_naive())
        .await
    {
        Ok(())
    } else {
        Err(AppError::TooManyRequests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, n).unwrap()
    }

    #[tokio::test]
    async fn test_allows_up_to_limit_then_blocks() {
        let quotas = DailyQuotas::new();
        for _ in 0..3 {
            assert!(quotas.try_acquire("contact", "key-a", 3, day(1)).await);
        }
        assert!(!quotas.try_acquire("contact", "key-a", 3, day(1)).await);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let quotas = DailyQuotas::new();
        assert!(quotas.try_acquire("contact", "key-a", 1, day(1)).await);
        assert!(!quotas.try_acquire("contact", "key-a", 1, day(1)).await);
        assert!(quotas.try_acquire("contact", "key-b", 1, day(1)).await);
    }

    #[tokio::test]
    async fn test_scopes_are_independent() {
        let quotas = DailyQuotas::new();
        assert!(quotas.try_acquire("contact", "key-a", 1, day(1)).await);
        assert!(quotas.try_acquire("chat", "key-a", 1, day(1)).await);
    }

    #[tokio::test]
    async fn test_quota_resets_on_day_rollover() {
        let quotas = DailyQuotas::new();
        assert!(quotas.try_acquire("chat", "key-a", 1, day(1)).await);
        assert!(!quotas.try_acquire("chat", "key-a", 1, day(1)).await);
        assert!(quotas.try_acquire("chat", "key-a", 1, day(2)).await);
    }

    #[test]
    fn test_caller_key_precedence() {
        let mut headers = HeaderMap::new();
        assert_eq!(caller_key(&headers), "anonymous");

        headers.insert("x-forwarded-for", "10.0.0.1, 10.0.0.2".parse().unwrap());
        assert_eq!(caller_key(&headers), "10.0.0.1");

        headers.insert("x-api-key", "secret".parse().unwrap());
        assert_eq!(caller_key(&headers), "secret");
    }
}
