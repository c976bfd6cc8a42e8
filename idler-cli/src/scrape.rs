//! Metric source backed by a Prometheus text exposition endpoint.
//!
//! The counter for a function is the sum of every sample of the configured
//! metric whose `function_name` label matches, across all other labels
//! (typically one series per HTTP status `code`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use idler_core::{FunctionName, IdlerError, IdlerResult, MetricSource};

/// Label carrying the function name on gateway metrics.
const FUNCTION_LABEL: &str = "function_name";

/// Scrapes the gateway's metrics endpoint on every read.
pub struct ScrapeSource {
    client: Client,
    url: Url,
    metric_name: String,
}

impl ScrapeSource {
    pub fn new(
        url: Url,
        metric_name: impl Into<String>,
        timeout: Duration,
    ) -> IdlerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdlerError::MetricSource {
                function: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url,
            metric_name: metric_name.into(),
        })
    }
}

#[async_trait]
impl MetricSource for ScrapeSource {
    async fn read_counter(&self, name: &FunctionName) -> IdlerResult<f64> {
        let source_error = |message: String| IdlerError::MetricSource {
            function: name.to_string(),
            message,
        };

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| source_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(source_error(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| source_error(e.to_string()))?;

        sum_counter(&body, &self.metric_name, name)
    }
}

/// Sum the samples of `metric_name` labelled with `function`.
/// No matching sample means the function was never invoked: 0.
///
/// A line that cannot be parsed only fails the read when it mentions
/// `function`. Broken series of other functions are skipped.
pub fn sum_counter(body: &str, metric_name: &str, function: &FunctionName) -> IdlerResult<f64> {
    let mut total = 0.0;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let name_end = line
            .find(|c: char| c == '{' || c.is_whitespace())
            .unwrap_or(line.len());
        if &line[..name_end] != metric_name {
            continue;
        }

        let malformed = || IdlerError::MalformedCounter {
            function: function.to_string(),
            value: line.to_string(),
        };

        let Some((labels, rest)) = split_labels(&line[name_end..]) else {
            if line.contains(function.as_str()) {
                return Err(malformed());
            }
            tracing::debug!(line = %line, "Skipping unparseable sample");
            continue;
        };
        let matches = labels
            .iter()
            .any(|(key, value)| *key == FUNCTION_LABEL && value == function.as_str());
        if !matches {
            continue;
        }

        let value = rest.split_whitespace().next().ok_or_else(malformed)?;
        let value: f64 = value.parse().map_err(|_| malformed())?;
        total += value;
    }

    Ok(total)
}

/// Split `{key="value",...} rest` into its labels and the remainder.
/// Returns `None` on an unterminated label set.
fn split_labels(s: &str) -> Option<(Vec<(&str, String)>, &str)> {
    let Some(body) = s.strip_prefix('{') else {
        return Some((Vec::new(), s));
    };

    let mut labels = Vec::new();
    let mut rest = body.trim_start();

    loop {
        if let Some(after) = rest.strip_prefix('}') {
            return Some((labels, after));
        }

        let eq = rest.find('=')?;
        let key = rest[..eq].trim();
        let quoted = rest[eq + 1..].trim_start().strip_prefix('"')?;

        let mut value = String::new();
        let mut escaped = false;
        let mut end = None;
        for (i, c) in quoted.char_indices() {
            if escaped {
                value.push(if c == 'n' { '\n' } else { c });
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                end = Some(i);
                break;
            } else {
                value.push(c);
            }
        }

        labels.push((key, value));
        rest = quoted[end? + 1..].trim_start();
        rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METRIC: &str = "gateway_function_invocation_total";

    const EXPOSITION: &str = r#"
# HELP gateway_function_invocation_total Function metrics
# TYPE gateway_function_invocation_total counter
gateway_function_invocation_total{code="200",function_name="sethostsport"} 16
gateway_function_invocation_total{code="500",function_name="sethostsport"} 2
gateway_function_invocation_total{code="200",function_name="sethostsport-v2"} 99
gateway_function_invocation_total{code="200",function_name="figlet"} 1.5e1 1712000000000
gateway_function_invocation_started{function_name="sethostsport"} 40
gateway_service_count{function_name="sethostsport"} 1
"#;

    fn name(s: &str) -> FunctionName {
        FunctionName::new(s).unwrap()
    }

    #[test]
    fn test_sums_across_codes() {
        let total = sum_counter(EXPOSITION, METRIC, &name("sethostsport")).unwrap();
        assert_eq!(total, 18.0);
    }

    #[test]
    fn test_exact_name_match_and_timestamp() {
        assert_eq!(sum_counter(EXPOSITION, METRIC, &name("figlet")).unwrap(), 15.0);
        assert_eq!(
            sum_counter(EXPOSITION, METRIC, &name("sethostsport-v2")).unwrap(),
            99.0
        );
    }

    #[test]
    fn test_absent_function_is_zero() {
        assert_eq!(sum_counter(EXPOSITION, METRIC, &name("nodeinfo")).unwrap(), 0.0);
        assert_eq!(sum_counter("", METRIC, &name("nodeinfo")).unwrap(), 0.0);
    }

    #[test]
    fn test_unparseable_value() {
        let body = r#"gateway_function_invocation_total{code="200",function_name="figlet"} lots"#;
        let err = sum_counter(body, METRIC, &name("figlet")).unwrap_err();
        assert!(matches!(err, IdlerError::MalformedCounter { .. }));
    }

    #[test]
    fn test_unparseable_value_for_other_function_ignored() {
        let body = r#"
gateway_function_invocation_total{code="200",function_name="other"} lots
gateway_function_invocation_total{code="200",function_name="figlet"} 3
"#;
        assert_eq!(sum_counter(body, METRIC, &name("figlet")).unwrap(), 3.0);
    }

    #[test]
    fn test_unterminated_labels() {
        let body = r#"gateway_function_invocation_total{code="200",function_name="figlet" 3"#;
        assert!(sum_counter(body, METRIC, &name("figlet")).is_err());
    }

    #[test]
    fn test_unterminated_labels_of_other_function_skipped() {
        let body = r#"
gateway_function_invocation_total{code="200",function_name="other" 7
gateway_function_invocation_total{code="200",function_name="figlet"} 3
gateway_function_invocation_total{code="500",function_name="figlet"} 1
"#;
        assert_eq!(sum_counter(body, METRIC, &name("figlet")).unwrap(), 4.0);
        assert!(sum_counter(body, METRIC, &name("other")).is_err());
    }

    #[test]
    fn test_escaped_label_values() {
        let (labels, rest) =
            split_labels(r#"{path="/a\"b}",function_name="figlet"} 4"#).unwrap();
        assert_eq!(labels[0], ("path", "/a\"b}".to_string()));
        assert_eq!(labels[1], ("function_name", "figlet".to_string()));
        assert_eq!(rest.trim(), "4");
    }

    #[tokio::test]
    async fn test_scrape_over_http() {
        use axum::routing::get;
        use axum::Router;

        let app = Router::new().route("/metrics", get(|| async { EXPOSITION }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let source = ScrapeSource::new(
            Url::parse(&format!("http://{}/metrics", addr)).unwrap(),
            METRIC,
            Duration::from_secs(5),
        )
        .unwrap();

        let total = source.read_counter(&name("sethostsport")).await.unwrap();
        assert_eq!(total, 18.0);
    }
}
