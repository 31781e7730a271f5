use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature: f64,
    pub timestamp: DateTime<Utc>,
}

// One series of a Graphite `render?format=json` response. Datapoints are
// `[value, timestamp]` pairs and either side may be null.
#[derive(Deserialize)]
struct Series {
    datapoints: Vec<Vec<Value>>,
}

fn as_timestamp(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|t| t as i64))
}

/// Most recent numeric datapoint of the first series in `body`.
pub fn latest_reading(body: &[u8]) -> Result<Reading> {
    let series: Vec<Value> = serde_json::from_slice(body).context("response is not a JSON array")?;
    let first = series.into_iter().next().context("response holds no series")?;
    let series: Series = serde_json::from_value(first).context("series has no datapoints array")?;

    let mut latest: Option<(i64, f64)> = None;
    for point in &series.datapoints {
        let temperature = point.first().and_then(Value::as_f64);
        let ts = point.get(1).and_then(as_timestamp);
        let (Some(temperature), Some(ts)) = (temperature, ts) else {
            debug!("skipping datapoint {:?}", point);
            continue;
        };
        if latest.map_or(true, |(last_ts, _)| ts >= last_ts) {
            latest = Some((ts, temperature));
        }
    }

    let (ts, temperature) = latest.context("no datapoint with a value")?;
    let timestamp = DateTime::from_timestamp(ts, 0).context("timestamp out of range")?;
    Ok(Reading {
        temperature,
        timestamp,
    })
}

pub struct GraphiteClient {
    http: reqwest::Client,
    max_response_bytes: usize,
}

impl GraphiteClient {
    pub fn new(timeout: Duration, max_response_bytes: usize) -> Result<GraphiteClient> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(GraphiteClient {
            http,
            max_response_bytes,
        })
    }

    pub async fn fetch_latest(&self, url: &str) -> Result<Reading> {
        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("cannot connect to {url}"))?;

        let status = response.status();
        if status != StatusCode::OK {
            bail!("server answered with code {}", status.as_u16());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.context("reading response body")? {
            if body.len() + chunk.len() > self.max_response_bytes {
                bail!("response larger than {} bytes", self.max_response_bytes);
            }
            body.extend_from_slice(&chunk);
        }

        let reading = latest_reading(&body)?;
        info!(
            temperature = reading.temperature,
            timestamp = %reading.timestamp,
            "temperature read"
        );
        Ok(reading)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{http::StatusCode as HttpStatus, routing::get, Json, Router};
    use serde_json::json;
    use std::net::SocketAddr;

    pub(crate) async fn serve(app: Router) -> Result<SocketAddr> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move { axum::serve(listener, app).await });
        Ok(addr)
    }

    pub(crate) fn render(datapoints: Value) -> Value {
        json!([{ "target": "ambient.temperature", "datapoints": datapoints }])
    }

    fn client() -> Result<GraphiteClient> {
        GraphiteClient::new(Duration::from_secs(5), 256 * 1024)
    }

    #[test]
    fn picks_latest_numeric_point() -> Result<()> {
        let body = render(json!([
            [21.5, 1_700_000_000],
            [null, 1_700_000_120],
            [22.25, 1_700_000_060],
            [19.0, 1_699_999_940]
        ]));
        let reading = latest_reading(body.to_string().as_bytes())?;
        assert_eq!(reading.temperature, 22.25);
        assert_eq!(reading.timestamp.timestamp(), 1_700_000_060);
        Ok(())
    }

    #[test]
    fn equal_timestamps_take_the_later_entry() -> Result<()> {
        let body = render(json!([[20.0, 100], [23.0, 100]]));
        assert_eq!(latest_reading(body.to_string().as_bytes())?.temperature, 23.0);
        Ok(())
    }

    #[test]
    fn only_first_series_counts() -> Result<()> {
        let body = json!([
            { "target": "a", "datapoints": [[18.0, 10]] },
            { "target": "b", "datapoints": [[30.0, 20]] }
        ]);
        assert_eq!(latest_reading(body.to_string().as_bytes())?.temperature, 18.0);
        Ok(())
    }

    #[test]
    fn rejects_unusable_bodies() {
        for body in [
            "not json".to_string(),
            "{}".to_string(),
            "[]".to_string(),
            json!([{ "target": "a" }]).to_string(),
            render(json!([[null, 10], ["x", 20]])).to_string(),
        ] {
            assert!(latest_reading(body.as_bytes()).is_err(), "{body}");
        }
    }

    #[tokio::test]
    async fn fetches_over_http() -> Result<()> {
        let app = Router::new().route(
            "/render",
            get(|| async { Json(render(json!([[24.5, 1_700_000_000], [24.75, 1_700_000_060]]))) }),
        );
        let addr = serve(app).await?;

        let reading = client()?
            .fetch_latest(&format!("http://{addr}/render?format=json"))
            .await?;
        assert_eq!(reading.temperature, 24.75);
        Ok(())
    }

    #[tokio::test]
    async fn non_200_is_an_error() -> Result<()> {
        let app = Router::new().route("/render", get(|| async { HttpStatus::SERVICE_UNAVAILABLE }));
        let addr = serve(app).await?;

        let err = client()?
            .fetch_latest(&format!("http://{addr}/render"))
            .await
            .err()
            .context("expected an error")?;
        assert!(err.to_string().contains("503"), "{err:#}");
        Ok(())
    }

    #[tokio::test]
    async fn oversized_body_is_an_error() -> Result<()> {
        let app = Router::new().route("/render", get(|| async { "x".repeat(4096) }));
        let addr = serve(app).await?;

        let small = GraphiteClient::new(Duration::from_secs(5), 1024)?;
        let result = small.fetch_latest(&format!("http://{addr}/render")).await;
        assert!(result.is_err());
        Ok(())
    }
}
