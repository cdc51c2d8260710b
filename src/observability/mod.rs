pub mod logging;
pub mod metrics;

pub use logging::{init_logging, mask_amount, LogConfig, LogFormat};
pub use metrics::{get_metrics, init_metrics, serve_metrics, LatencyTimer, Metrics, METRICS};
