//! Process-wide logging setup.
//!
//! Logs never go to stdout, which carries the chunk stream.

use std::ffi::OsStr;
use std::path::Path;

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Optional JSON-lines log file. When unset, logs go to stderr.
pub const LOG_FILE_ENV: &str = "GOAL_BRIDGE_LOG_FILE";

const DEFAULT_FILTER: &str = "warn";
const DEFAULT_LOG_FILE_NAME: &str = "goal-bridge.logs.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber once; later calls do nothing.
///
/// `RUST_LOG` selects the filter (default `warn`; `off` silences logging).
pub fn init_observability() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let output = match std::env::var_os(LOG_FILE_ENV).filter(|path| !path.is_empty()) {
            Some(path) => json_file_layer(Path::new(&path)),
            None => fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed(),
        };
        let _ = tracing_subscriber::registry()
            .with(output.with_filter(filter))
            .try_init();
    });
}

fn json_file_layer(path: &Path) -> BoxedLayer {
    let (dir, file_name) = log_file_target(path);
    let _ = std::fs::create_dir_all(dir);
    fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_target(false)
        .with_writer(tracing_appender::rolling::never(dir, file_name))
        .boxed()
}

/// Splits a log path into the directory to create and the file name.
fn log_file_target(path: &Path) -> (&Path, &OsStr) {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .unwrap_or(OsStr::new(DEFAULT_LOG_FILE_NAME));
    (dir, file_name)
}
