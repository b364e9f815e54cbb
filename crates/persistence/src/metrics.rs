//! Repository query metrics.
//!
//! Every query a repository runs is timed into the
//! `database_query_duration_seconds` histogram, labelled with the query name
//! and whether it succeeded. Pool gauges are refreshed on scrape.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

const OUTCOME_OK: &str = "ok";
const OUTCOME_ERROR: &str = "error";

/// Record one query duration.
pub fn record_query_duration(query_name: &'static str, outcome: &'static str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name,
        "outcome" => outcome
    )
    .record(duration_secs);
}

/// Record database connection pool metrics.
///
/// Called when `/metrics` is scraped so the gauges are current.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("database_connections_active").set(active as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Times one repository operation and records it when dropped.
///
/// Pass the operation's result through [`QueryTimer::observe`] to label it
/// `ok` or `error`. A timer dropped before observing anything, for example
/// because `?` returned early from a transaction, is recorded as `error`.
///
/// ```ignore
/// let timer = QueryTimer::new("find_form_schema_by_slug");
/// let result = sqlx::query_as::<_, FormSchemaEntity>(...).fetch_optional(&pool).await;
/// timer.observe(result)
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
    outcome: &'static str,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
            outcome: OUTCOME_ERROR,
        }
    }

    /// Labels the timing from `result` and hands the result back.
    pub fn observe<T, E>(mut self, result: Result<T, E>) -> Result<T, E> {
        self.outcome = if result.is_ok() { OUTCOME_OK } else { OUTCOME_ERROR };
        result
    }
}

impl Drop for QueryTimer {
    fn drop(&mut self) {
        record_query_duration(
            self.query_name,
            self.outcome,
            self.start.elapsed().as_secs_f64(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    /// Runs `f` against a private recorder and returns the rendered output.
    fn render_with(f: impl FnOnce()) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, f);
        handle.render()
    }

    fn count_line<'a>(rendered: &'a str, query: &str, outcome: &str) -> Option<&'a str> {
        rendered.lines().find(|line| {
            line.starts_with("database_query_duration_seconds_count")
                && line.contains(&format!("query=\"{query}\""))
                && line.contains(&format!("outcome=\"{outcome}\""))
        })
    }

    #[test]
    fn test_observed_success_is_recorded_as_ok() {
        let rendered = render_with(|| {
            let result: Result<u8, ()> = QueryTimer::new("find_things").observe(Ok(1));
            assert_eq!(result, Ok(1));
        });

        let line = count_line(&rendered, "find_things", "ok").expect("ok sample");
        assert!(line.ends_with(" 1"), "{line}");
        assert!(count_line(&rendered, "find_things", "error").is_none());
    }

    #[test]
    fn test_observed_failure_is_recorded_as_error() {
        let rendered = render_with(|| {
            let result: Result<u8, &str> = QueryTimer::new("find_things").observe(Err("boom"));
            assert!(result.is_err());
        });

        assert!(count_line(&rendered, "find_things", "error").is_some());
        assert!(count_line(&rendered, "find_things", "ok").is_none());
    }

    #[test]
    fn test_early_return_is_recorded_as_error() {
        fn insert_twice(fail_first: bool) -> Result<(), &'static str> {
            let timer = QueryTimer::new("insert_things");
            if fail_first {
                return Err("first insert failed");
            }
            timer.observe(Ok(()))
        }

        let rendered = render_with(|| {
            assert!(insert_twice(true).is_err());
            assert!(insert_twice(false).is_ok());
        });

        let error = count_line(&rendered, "insert_things", "error").expect("error sample");
        assert!(error.ends_with(" 1"), "{error}");
        let ok = count_line(&rendered, "insert_things", "ok").expect("ok sample");
        assert!(ok.ends_with(" 1"), "{ok}");
    }
}
