//! 生成中の進捗表示
//!
//! スピナーのメッセージを1.5秒ごとに進め、最後のメッセージで止める。
//! 表示文字列以外には触れない。

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;

pub const LOADING_MESSAGES: &[&str] = &[
    "Analyzing cloth texture...",
    "Retrieving model geometry...",
    "Merging cloth physics with pose...",
    "Rendering lighting environment...",
    "Applying final style grading...",
];

pub const MESSAGE_INTERVAL: Duration = Duration::from_millis(1500);

/// 経過ステップ数に対応するメッセージ（最後で止まる）
pub fn message_at(step: usize) -> &'static str {
    LOADING_MESSAGES[step.min(LOADING_MESSAGES.len() - 1)]
}

pub struct LoadingIndicator {
    bar: ProgressBar,
    cycler: JoinHandle<()>,
}

impl LoadingIndicator {
    /// tokioランタイム内で呼ぶこと
    pub fn start() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message_at(0));
        bar.enable_steady_tick(Duration::from_millis(100));

        let handle = bar.clone();
        let cycler = tokio::spawn(async move {
            let mut interval = tokio::time::interval(MESSAGE_INTERVAL);
            // 初回tickは即時
            interval.tick().await;
            for step in 1..LOADING_MESSAGES.len() {
                interval.tick().await;
                handle.set_message(message_at(step));
            }
        });

        Self { bar, cycler }
    }

    /// 現在のポーズ（例: "[2/3] Walking"）
    pub fn set_task(&self, index: usize, total: usize, name: &str) {
        self.bar.set_prefix(format!("[{}/{}] {}", index, total, name));
    }

    pub fn finish(self) {
        self.cycler.abort();
        self.bar.finish_and_clear();
    }
}
