use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Sleeps up to `total` in `step` slices. Returns `false` as soon as `stop`
/// is observed set.
pub(crate) fn sleep_with_stop(stop: &AtomicBool, total: Duration, step: Duration) -> bool {
    let mut remaining = total;
    while !remaining.is_zero() {
        if stop.load(Ordering::Acquire) {
            return false;
        }
        let slice = remaining.min(step);
        thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
    !stop.load(Ordering::Acquire)
}
