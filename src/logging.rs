//! Log output setup.
//!
//! The library only emits through the `log` macros. Binaries, tests and
//! benches that want to see the output call [`init`] once; `RUST_LOG`
//! picks the level (`RUST_LOG=paged_btree=debug` shows rebalancing).

use std::io::Write;

use env_logger::Builder;

/// Install a stderr logger formatted as `[LEVEL] [file:line] message`.
/// Later calls are no-ops.
pub fn init() {
    let _ = builder().try_init();
}

/// Like [`init`], but routed through the test harness capture.
pub fn init_for_tests() {
    let _ = builder().is_test(true).try_init();
}

fn builder() -> Builder {
    let mut builder = Builder::from_default_env();
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] [{}:{}] {}",
            record.level(),
            record.file().unwrap_or("?"),
            record.line().unwrap_or(0),
            record.args()
        )
    });
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_repeatable() {
        init_for_tests();
        init_for_tests();
        init();
        log::debug!("logger installed");
    }
}
