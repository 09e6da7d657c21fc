/// Rate Limiting System
///
/// Fixed-window counters keyed by endpoint class and request source, plus a
/// process-wide ceiling enforced with `governor`.
use crate::{
    api::middleware::client_key,
    config::{RateLimitConfig, RateLimitRules, WindowRule},
    context::AppContext,
    error::{CmsError, CmsResult},
};
use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{
    collections::HashMap,
    num::NonZeroU32,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

/// Endpoint class with its own window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitClass {
    Api,
    Login,
    Register,
    PasswordReset,
}

impl LimitClass {
    pub fn rule<'a>(&self, rules: &'a RateLimitRules) -> &'a WindowRule {
        match self {
            LimitClass::Api => &rules.api,
            LimitClass::Login => &rules.login,
            LimitClass::Register => &rules.register,
            LimitClass::PasswordReset => &rules.password_reset,
        }
    }
}

/// Classes a request counts against, most specific last
pub fn classify(method: &Method, path: &str) -> &'static [LimitClass] {
    if !(path == "/api" || path.starts_with("/api/")) {
        return &[];
    }

    if method == Method::POST {
        match path {
            "/api/auth/login" => return &[LimitClass::Api, LimitClass::Login],
            "/api/auth/register" => return &[LimitClass::Api, LimitClass::Register],
            "/api/auth/reset-password/request" => {
                return &[LimitClass::Api, LimitClass::PasswordReset]
            }
            _ => {}
        }
    }

    &[LimitClass::Api]
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Slot granted by [`RateLimiter::admit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub class: LimitClass,
    pub limit: u32,
    pub remaining: u32,
}

/// Rate limiter manager
pub struct RateLimiter {
    enabled: bool,
    rules: RateLimitRules,
    global: Option<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    windows: Mutex<HashMap<(LimitClass, String), Window>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let global = NonZeroU32::new(config.global_requests_per_minute)
            .map(|rpm| GovernorLimiter::direct(Quota::per_minute(rpm)));

        Self {
            enabled: config.enabled,
            rules: config.rules.clone(),
            global,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn rule(&self, class: LimitClass) -> &WindowRule {
        class.rule(&self.rules)
    }

    // A poisoned map only holds counters; keep using it
    fn windows(&self) -> MutexGuard<'_, HashMap<(LimitClass, String), Window>> {
        self.windows.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Process-wide ceiling across all sources
    pub fn check_global(&self) -> CmsResult<()> {
        match &self.global {
            Some(limiter) => limiter.check().map_err(|_| CmsError::RateLimitExceeded {
                message: "Server is busy, please try again shortly".to_string(),
                retry_after: Duration::from_secs(1),
            }),
            None => Ok(()),
        }
    }

    pub fn admit(&self, class: LimitClass, key: &str) -> CmsResult<Admission> {
        self.admit_at(class, key, Instant::now())
    }

    /// Count one request from `key` against `class` at time `now`
    pub fn admit_at(&self, class: LimitClass, key: &str, now: Instant) -> CmsResult<Admission> {
        let rule = self.rule(class);
        let mut windows = self.windows();
        let window = windows
            .entry((class, key.to_string()))
            .or_insert(Window {
                started: now,
                count: 0,
            });

        let elapsed = now.saturating_duration_since(window.started);
        if elapsed >= rule.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= rule.max_requests {
            let retry_after = rule
                .window
                .saturating_sub(now.saturating_duration_since(window.started));
            tracing::warn!("Rate limit hit: {:?} from {}", class, key);
            return Err(CmsError::RateLimitExceeded {
                message: rule.message.clone(),
                retry_after,
            });
        }

        window.count += 1;
        Ok(Admission {
            class,
            limit: rule.max_requests,
            remaining: rule.max_requests - window.count,
        })
    }

    /// Give back a slot taken by [`admit`](Self::admit)
    pub fn refund(&self, class: LimitClass, key: &str) {
        if let Some(window) = self.windows().get_mut(&(class, key.to_string())) {
            window.count = window.count.saturating_sub(1);
        }
    }

    /// Drop windows that have run out; returns how many were removed
    pub fn prune(&self, now: Instant) -> usize {
        let mut windows = self.windows();
        let before = windows.len();
        windows.retain(|(class, _), window| {
            now.saturating_duration_since(window.started) < class.rule(&self.rules).window
        });
        before - windows.len()
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, CmsError> {
    let limiter = &ctx.rate_limiter;
    if !limiter.is_enabled() {
        return Ok(next.run(request).await);
    }

    limiter.check_global()?;

    let classes = classify(request.method(), request.uri().path());
    if classes.is_empty() {
        return Ok(next.run(request).await);
    }

    let key = client_key(&request, ctx.config.service.trust_proxy);
    let mut admitted = Vec::with_capacity(classes.len());
    for class in classes {
        admitted.push(limiter.admit(*class, &key)?);
    }

    let mut response = next.run(request).await;

    if response.status().is_success() {
        for admission in &admitted {
            if limiter.rule(admission.class).skip_successful {
                limiter.refund(admission.class, &key);
            }
        }
    }

    // Report the most specific window
    if let Some(admission) = admitted.last() {
        let headers = response.headers_mut();
        headers.insert("X-RateLimit-Limit", HeaderValue::from(admission.limit));
        headers.insert("X-RateLimit-Remaining", HeaderValue::from(admission.remaining));
    }

    Ok(response)
}
