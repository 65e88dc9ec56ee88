use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Fixed-window request budget shared by every inbound request.
///
/// A window opens with the first admitted request. Once `max_requests` have
/// been admitted, later callers are held until the window closes instead of
/// being rejected.
#[derive(Debug)]
pub struct WindowBudget {
    max_requests: u32,
    window: Duration,
    state: Mutex<WindowState>,
}

#[derive(Debug, Default)]
struct WindowState {
    opened_at: Option<Instant>,
    used: u32,
}

impl WindowBudget {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            state: Mutex::new(WindowState::default()),
        }
    }

    /// Wait for a slot in the current or a later window.
    pub async fn acquire(&self) {
        while let Some(wait) = self.try_acquire() {
            debug!("Inbound request budget exhausted, delaying {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    // Returns how long to wait before trying again, or None once admitted.
    fn try_acquire(&self) -> Option<Duration> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();

        let opened_at = match state.opened_at {
            Some(opened_at) if now.duration_since(opened_at) < self.window => opened_at,
            _ => {
                state.opened_at = Some(now);
                state.used = 0;
                now
            }
        };

        if state.used < self.max_requests {
            state.used += 1;
            None
        } else {
            Some(self.window.saturating_sub(now.duration_since(opened_at)))
        }
    }
}

pub async fn throttle(
    State(budget): State<Arc<WindowBudget>>,
    request: Request,
    next: Next,
) -> Response {
    budget.acquire().await;
    next.run(request).await
}
