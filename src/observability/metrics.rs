//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Own the request and error counters of one service
//! - Render them in the Prometheus text format for `/metrics`
//!
//! # Metrics
//! - `http_requests_total` (counter): every handled request
//! - `http_errors_total` (counter): requests whose outcome was not success
//!
//! - `tokio_workers` (gauge): runtime worker threads
//! - `tokio_alive_tasks` (gauge): tasks spawned and not yet finished
//! - `tokio_global_queue_depth` (gauge): tasks waiting in the injection queue
//! - `process_uptime_seconds` (gauge): time since the service started
//! - `tracepipe_build_info` (gauge, always 1): carries the `version` label
//!
//! All carry the fixed labels `app` and `svc`.
//!
//! # Design Decisions
//! - Each `ServiceMetrics` builds its own Prometheus recorder instead of
//!   installing a global one, so instances are injected and independent
//! - Counter handles are atomic; increments never lock
//! - Runtime gauges are sampled at scrape time, not on a timer

use std::time::Instant;

use metrics::{Counter, Gauge, Key, KeyName, Label, Level, Metadata, Recorder, SharedString};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const ERRORS_TOTAL: &str = "http_errors_total";
pub const TOKIO_WORKERS: &str = "tokio_workers";
pub const TOKIO_ALIVE_TASKS: &str = "tokio_alive_tasks";
pub const TOKIO_GLOBAL_QUEUE_DEPTH: &str = "tokio_global_queue_depth";
pub const PROCESS_UPTIME_SECONDS: &str = "process_uptime_seconds";
pub const BUILD_INFO: &str = "tracepipe_build_info";

/// Content type of the text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Gauges describing the process the service runs in.
#[derive(Clone)]
struct RuntimeGauges {
    workers: Gauge,
    alive_tasks: Gauge,
    global_queue_depth: Gauge,
    uptime: Gauge,
    started: Instant,
}

impl RuntimeGauges {
    /// Sample the current Tokio runtime. Outside a runtime only uptime moves.
    fn refresh(&self) {
        self.uptime.set(self.started.elapsed().as_secs_f64());
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let metrics = runtime.metrics();
            self.workers.set(metrics.num_workers() as f64);
            self.alive_tasks.set(metrics.num_alive_tasks() as f64);
            self.global_queue_depth.set(metrics.global_queue_depth() as f64);
        }
    }
}

/// Request/error counters and runtime gauges for one service.
#[derive(Clone)]
pub struct ServiceMetrics {
    requests: Counter,
    errors: Counter,
    runtime: RuntimeGauges,
    handle: PrometheusHandle,
}

impl ServiceMetrics {
    pub fn new(app: &str, service: &str) -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let metadata = Metadata::new(module_path!(), Level::INFO, Some(module_path!()));
        let labels = vec![
            Label::new("app", app.to_string()),
            Label::new("svc", service.to_string()),
        ];

        recorder.describe_counter(
            KeyName::from(REQUESTS_TOTAL),
            None,
            SharedString::from("Total number of requests"),
        );
        recorder.describe_counter(
            KeyName::from(ERRORS_TOTAL),
            None,
            SharedString::from("Total number of errors"),
        );

        let requests = recorder.register_counter(
            &Key::from_parts(REQUESTS_TOTAL, labels.clone()),
            &metadata,
        );
        let errors = recorder.register_counter(
            &Key::from_parts(ERRORS_TOTAL, labels.clone()),
            &metadata,
        );

        // Registered counters start at zero and are rendered immediately.
        requests.increment(0);
        errors.increment(0);

        let gauge = |name: &'static str, help: &'static str| {
            recorder.describe_gauge(KeyName::from(name), None, SharedString::from(help));
            let gauge = recorder.register_gauge(&Key::from_parts(name, labels.clone()), &metadata);
            gauge.set(0.0);
            gauge
        };
        let runtime = RuntimeGauges {
            workers: gauge(TOKIO_WORKERS, "Worker threads of the async runtime"),
            alive_tasks: gauge(TOKIO_ALIVE_TASKS, "Tasks alive on the async runtime"),
            global_queue_depth: gauge(
                TOKIO_GLOBAL_QUEUE_DEPTH,
                "Tasks waiting in the runtime injection queue",
            ),
            uptime: gauge(PROCESS_UPTIME_SECONDS, "Seconds since the service started"),
            started: Instant::now(),
        };

        let mut build_labels = labels;
        build_labels.push(Label::new("version", env!("CARGO_PKG_VERSION")));
        recorder.describe_gauge(
            KeyName::from(BUILD_INFO),
            None,
            SharedString::from("Build information"),
        );
        recorder
            .register_gauge(&Key::from_parts(BUILD_INFO, build_labels), &metadata)
            .set(1.0);

        Self {
            requests,
            errors,
            runtime,
            handle: recorder.handle(),
        }
    }

    pub fn record_request(&self) {
        self.requests.increment(1);
    }

    pub fn record_error(&self) {
        self.errors.increment(1);
    }

    /// Prometheus text exposition of all counters and gauges.
    pub fn render(&self) -> String {
        self.runtime.refresh();
        self.handle.render()
    }

    pub fn requests_total(&self) -> u64 {
        sample(&self.render(), REQUESTS_TOTAL)
    }

    pub fn errors_total(&self) -> u64 {
        sample(&self.render(), ERRORS_TOTAL)
    }
}

/// Read the value of the first sample named `name` from an exposition.
pub fn sample(exposition: &str, name: &str) -> u64 {
    exposition
        .lines()
        .filter(|line| !line.starts_with('#'))
        .find(|line| {
            line.strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('{') || rest.starts_with(' '))
        })
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse::<f64>().ok())
        .map(|value| value as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero_and_render() {
        let metrics = ServiceMetrics::new("demo", "backend");
        let text = metrics.render();

        assert!(text.contains("http_requests_total{app=\"demo\",svc=\"backend\"} 0"));
        assert!(text.contains("http_errors_total{app=\"demo\",svc=\"backend\"} 0"));
        assert!(text.contains("# HELP http_requests_total Total number of requests"));
    }

    #[test]
    fn test_instances_are_independent() {
        let a = ServiceMetrics::new("demo", "gateway");
        let b = ServiceMetrics::new("demo", "backend");

        a.record_request();
        a.record_request();
        a.record_error();

        assert_eq!(a.requests_total(), 2);
        assert_eq!(a.errors_total(), 1);
        assert_eq!(b.requests_total(), 0);
    }

    #[test]
    fn test_sample_ignores_prefix_matches() {
        let text = "# TYPE x counter\nhttp_requests_total_extra 9\nhttp_requests_total{a=\"b\"} 4\n";
        assert_eq!(sample(text, REQUESTS_TOTAL), 4);
        assert_eq!(sample(text, ERRORS_TOTAL), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 3)]
    async fn test_render_samples_the_runtime() {
        let metrics = ServiceMetrics::new("demo", "backend");
        let idle = tokio::spawn(std::future::pending::<()>());

        let text = metrics.render();
        assert!(text.contains("tokio_workers{app=\"demo\",svc=\"backend\"} 3"));
        assert!(sample(&text, TOKIO_ALIVE_TASKS) >= 1);
        assert!(text.contains(TOKIO_GLOBAL_QUEUE_DEPTH));
        assert!(text.contains("# TYPE process_uptime_seconds gauge"));
        assert!(text.contains(&format!(
            "tracepipe_build_info{{app=\"demo\",svc=\"backend\",version=\"{}\"}} 1",
            env!("CARGO_PKG_VERSION")
        )));
        idle.abort();
    }

    #[test]
    fn test_render_outside_runtime_keeps_runtime_gauges_at_zero() {
        let text = ServiceMetrics::new("demo", "cli").render();
        assert_eq!(sample(&text, TOKIO_WORKERS), 0);
        assert!(text.contains(PROCESS_UPTIME_SECONDS));
    }
}
