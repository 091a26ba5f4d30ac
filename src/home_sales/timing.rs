use std::time::{Duration, Instant};

/// Run `f`, returning its result and the wall-clock time it took.
pub fn timed<T, E>(label: &str, f: impl FnOnce() -> Result<T, E>) -> Result<(T, Duration), E> {
    let start = Instant::now();
    let out = f()?;
    let elapsed = start.elapsed();
    log::info!("{label}: {}", format_elapsed(elapsed));
    Ok((out, elapsed))
}

/// `--- 0.5213 seconds ---`, the line printed after each timed query.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("--- {:.4} seconds ---", elapsed.as_secs_f64())
}
