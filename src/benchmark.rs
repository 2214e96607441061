//! Engine-agnostic timing/space telemetry for mesh operations.
//!
//! Feature-gated and runtime-toggled to ensure zero overhead when
//! disabled: with the `metrics` feature off, [`time`] and [`space`] reduce
//! to calling the wrapped closure directly.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::time::Duration;

use crate::metrics::RollingWindow;

/// Runtime toggle for benchmark collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Whether benchmark collection is active (both compile-time and
/// runtime).
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// Per-label timing/space history, keyed by the `label` passed to [`time`]/[`space`].
static REGISTRY: Mutex<Option<HashMap<&'static str, RollingWindow<u64>>>> = Mutex::new(None);

const WINDOW_CAPACITY: usize = 256;

fn with_window<R>(label: &'static str, f: impl FnOnce(&mut RollingWindow<u64>) -> R) -> R {
  let mut guard = REGISTRY.lock().expect("benchmark registry poisoned");
  let map = guard.get_or_insert_with(HashMap::new);
  let window = map.entry(label).or_insert_with(|| RollingWindow::new(WINDOW_CAPACITY));
  f(window)
}

/// Time `f`, recording the elapsed microseconds under `label` if metrics
/// collection is enabled, and return `f`'s result either way.
pub fn time<T>(label: &'static str, f: impl FnOnce() -> T) -> T {
  if !is_enabled() {
    return f();
  }
  let start = std::time::Instant::now();
  let result = f();
  let elapsed: Duration = start.elapsed();
  with_window(label, |window| window.push(elapsed.as_micros() as u64));
  result
}

/// Run `f`, recording `size_of(&result)` under `label` if metrics
/// collection is enabled, and return `f`'s result either way.
pub fn space<T>(label: &'static str, size_of: impl FnOnce(&T) -> u64, f: impl FnOnce() -> T) -> T {
  let result = f();
  if is_enabled() {
    let size = size_of(&result);
    with_window(label, |window| window.push(size));
  }
  result
}

/// Snapshot of a label's recorded samples: count, average, and most
/// recent value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStats {
  /// Number of samples recorded for this label.
  pub count: usize,
  /// Mean of all recorded samples.
  pub average: f64,
  /// Most recently recorded sample.
  pub last: Option<u64>,
}

/// Snapshot every label's current statistics. Returns an empty map if
/// collection was never enabled (the registry is never initialized).
pub fn report() -> HashMap<&'static str, LabelStats> {
  let guard = REGISTRY.lock().expect("benchmark registry poisoned");
  let Some(map) = guard.as_ref() else {
    return HashMap::new();
  };
  map
    .iter()
    .map(|(&label, window)| {
      (
        label,
        LabelStats {
          count: window.len(),
          average: window.average(),
          last: window.last().copied(),
        },
      )
    })
    .collect()
}

/// Clear every recorded sample for every label.
pub fn reset() {
  let mut guard = REGISTRY.lock().expect("benchmark registry poisoned");
  if let Some(map) = guard.as_mut() {
    map.clear();
  }
}
