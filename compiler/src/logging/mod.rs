use tracing::subscriber::set_global_default;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

const DEFAULT_FILTER: &str = "warn";
const TRACE_FILTER: &str = "alpha=debug,alpha_lang=debug";

/// Pick the filter directives: `RUST_LOG` wins, then `--trace`, then warnings only
pub fn filter_directives(env: Option<&str>, trace: bool) -> String {
    match env {
        Some(directives) if !directives.trim().is_empty() => directives.to_string(),
        _ if trace => TRACE_FILTER.to_string(),
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Install the global subscriber. Log lines go to stderr so they never mix
/// with program output on stdout.
pub fn setup_tracing(trace: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::try_new(filter_directives(env.as_deref(), trace))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let sub = Registry::default().with(filter).with(fmt_layer);

    // Already installed when called twice; keep the first one
    let _ = set_global_default(sub);
}
