/// Initialize tracing for the homepost binary and its tests.
///
/// `default_level` comes from the log settings; a value that does not name
/// a `tracing::Level` falls back to `info`.
pub fn init(default_level: &str) {
    let level: tracing::Level = default_level.parse().unwrap_or(tracing::Level::INFO);

    // try_init: tests and embedding consumers may initialize more than once.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::init;

    #[test]
    fn init_accepts_levels_and_garbage() {
        // Should not panic, and repeated calls are fine.
        init("info");
        init("DEBUG");
        init("not-a-level");
    }
}
