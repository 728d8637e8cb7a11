#![forbid(unsafe_code)]

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Installs a stderr subscriber filtered by `directives`. Unparseable directives are dropped
/// and the default level is `warn`. Safe to call twice; the second call is a no-op.
pub fn init(directives: &str) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(directives);
    let layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(true);
    let _ = Registry::default().with(filter).with(layer).try_init();
}
