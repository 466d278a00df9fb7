//! Loader configuration.
//!
//! An explicit configuration struct handed to [`ResourceLoader`] at
//! construction — process-wide state lives only at the top-level entry
//! point, not in statics scattered across the crate.

use serde::{Deserialize, Serialize};

/// Startup tracing for the resource-loading pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceOption {
    /// No tracing.
    #[default]
    None,
    /// Log the total wall-clock milliseconds the loading pass took.
    ShowLoadTime,
    /// Log every registered segment path after loading, oldest first.
    ListLoadedFiles,
}

impl TraceOption {
    /// Parses the value of the `StartupDBPFLoadTrace` command-line switch.
    /// Unknown values mean no tracing.
    pub fn parse_switch(value: &str) -> Self {
        if value.eq_ignore_ascii_case("showloadtime") {
            TraceOption::ShowLoadTime
        } else if value.eq_ignore_ascii_case("listloadedfiles") {
            TraceOption::ListLoadedFiles
        } else {
            TraceOption::None
        }
    }
}

/// Whether the user-plugins directory scan overlaps the synchronous steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanConcurrency {
    /// Everything runs on the calling thread.
    #[default]
    Sequential,
    /// The user-plugins walk runs on one short-lived worker thread, joined
    /// before its results are registered.
    Background,
}

/// Configuration for one [`ResourceLoader`](crate::ResourceLoader).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoaderConfig {
    pub trace: TraceOption,
    pub scan_concurrency: ScanConcurrency,
}
