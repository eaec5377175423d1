#![cfg(feature = "metrics")]

use once_cell::sync::Lazy;
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Instant,
};

/* ───────────── Roh‑Latenzen ─────────────────────────── */

static TIMES: Lazy<Mutex<Vec<(&'static str, u128)>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Called around each API step: `record("enqueue_write", t0);`
pub fn record(name: &'static str, start: Instant) {
    let dur = start.elapsed().as_micros();
    if let Ok(mut times) = TIMES.lock() {
        times.push((name, dur));
    }
}

/* ───────────── Buffer‑Allokationen ───────────────────── */

pub static ALLOCS: AtomicUsize = AtomicUsize::new(0);
pub static ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);

/* ───────────── Zusammenfassung ──────────────────────── */

/// Per-step sample count, mean and p95 in µs, sorted by step name.
pub fn snapshot() -> Vec<(&'static str, usize, u128, u128)> {
    let mut map: BTreeMap<&'static str, Vec<u128>> = BTreeMap::new();
    if let Ok(times) = TIMES.lock() {
        for &(name, us) in times.iter() {
            map.entry(name).or_default().push(us);
        }
    }
    map.into_iter()
        .map(|(name, mut v)| {
            v.sort_unstable();
            let mean = v.iter().sum::<u128>() / v.len() as u128;
            let p95 = v[((v.len() * 95) / 100).saturating_sub(1)];
            (name, v.len(), mean, p95)
        })
        .collect()
}

/// Call once at the end of `main`; goes to stderr so stdout keeps the walkthrough text.
pub fn summary() {
    eprintln!("── metrics summary ──");
    for (name, n, mean, p95) in snapshot() {
        eprintln!("{name:<18} n={n:<3} mean={mean:>7} µs   p95={p95:>7} µs");
    }
    let allocs = ALLOCS.load(Ordering::Relaxed);
    let bytes = ALLOC_BYTES.load(Ordering::Relaxed);
    eprintln!("device allocations: {allocs}   ({} KiB)", bytes / 1024);
}
