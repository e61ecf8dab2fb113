//! ログ初期化（stderr、ターゲット別フィルタ）

use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

pub fn parse_log_level(value: &str) -> LevelFilter {
    match value.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// フィルタを作成。verbose指定時は設定値にかかわらずDEBUG
pub fn build_filter(verbose: bool, log_level: &str) -> Targets {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        parse_log_level(log_level)
    };

    Targets::new()
        .with_default(level)
        .with_target("hyper", LevelFilter::WARN)
        .with_target("hyper_util", LevelFilter::WARN)
        .with_target("reqwest", LevelFilter::WARN)
}

/// 2回目以降の呼び出しは無視される
pub fn init_logging(verbose: bool, log_level: &str) {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_filter(build_filter(verbose, log_level));

    let _ = tracing_subscriber::registry().with(stderr_layer).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(parse_log_level(" warning "), LevelFilter::WARN);
        assert_eq!(parse_log_level("nonsense"), LevelFilter::INFO);
    }

    #[test]
    fn test_filter_caps_http_crates() {
        let filter = build_filter(true, "info");
        assert!(filter.would_enable("loom_lens::gemini", &Level::DEBUG));
        assert!(!filter.would_enable("reqwest::connect", &Level::DEBUG));
        assert!(filter.would_enable("hyper", &Level::WARN));
    }

    #[test]
    fn test_filter_respects_configured_level() {
        let filter = build_filter(false, "warn");
        assert!(!filter.would_enable("loom_lens", &Level::INFO));
        assert!(filter.would_enable("loom_lens", &Level::ERROR));
    }
}
