use axum::{routing::get, Router};
use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Count one completed analysis by path: "rule_based", "generative", or
/// "fallback" (backend configured but failed). Safe to call before `init`;
/// the events just go nowhere.
pub(crate) fn record_analysis(path: &'static str) {
    counter!("email_analyze_total", "path" => path).increment(1);
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and expose a static gauge with the
    /// lexicon size, so dashboards can spot a truncated trigger list.
    pub fn init(lexicon_size: usize) -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");

        gauge!("spam_lexicon_entries").set(lexicon_size as f64);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
