use async_trait::async_trait;
use aurum_core::common::{Instrument, TimeFrame};
use aurum_core::market::entity::{Candle, normalize_candles};
use aurum_core::market::error::MarketError;
use aurum_core::market::port::MarketDataProvider;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// # Summary
/// Yahoo Finance 行情提供者实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯，单次请求 10 秒超时。
/// - 输出序列按时间严格递增，只保留最后 `count` 根。
#[derive(Clone)]
pub struct YahooProvider {
    /// 内部使用的 HTTP 客户端
    client: Client,
    /// chart 接口根地址
    base_url: String,
}

impl YahooProvider {
    /// # Summary
    /// 创建一个新的 YahooProvider 实例。
    ///
    /// # Logic
    /// 1. 配置 10 秒超时。
    /// 2. 设置伪装浏览器 Header (User-Agent) 以减少被拦截风险。
    /// 3. 初始化 reqwest 客户端。
    ///
    /// # Returns
    /// 成功返回 YahooProvider，客户端构建失败返回 MarketError。
    pub fn new() -> Result<Self, MarketError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// 使用自定义 chart 接口地址创建实例（用于代理或镜像）。
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, MarketError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
            ),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()
            .map_err(|e| MarketError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

/// # Summary
/// Yahoo API 响应顶层结构。
///
/// # Invariants
/// - 映射自 Yahoo v8 chart 接口。
#[derive(Deserialize, Debug)]
struct YahooResponse {
    chart: YahooChart,
}

/// # Summary
/// Yahoo API 图表数据部分。
#[derive(Deserialize, Debug)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

/// # Summary
/// Yahoo API 错误详情。
#[derive(Deserialize, Debug)]
struct YahooError {
    description: String,
}

/// # Summary
/// Yahoo API 单个时间序列结果。休市区间可能没有 `timestamp` 字段。
#[derive(Deserialize, Debug)]
struct YahooResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

/// # Summary
/// Yahoo API 指标容器。
#[derive(Deserialize, Debug)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

/// # Summary
/// Yahoo API 原始报价数据。
#[derive(Deserialize, Debug)]
struct YahooQuote {
    /// 开盘价列表
    #[serde(default)]
    open: Vec<Option<f64>>,
    /// 最高价列表
    #[serde(default)]
    high: Vec<Option<f64>>,
    /// 最低价列表
    #[serde(default)]
    low: Vec<Option<f64>>,
    /// 收盘价列表
    #[serde(default)]
    close: Vec<Option<f64>>,
    /// 成交量列表
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// # Summary
/// 周期到 Yahoo interval 的映射。
///
/// # Returns
/// (请求的 interval, 本地聚合桶秒数)。Yahoo 不提供 4 小时线，以小时线聚合得到。
fn source_interval(timeframe: TimeFrame) -> (&'static str, Option<i64>) {
    match timeframe {
        TimeFrame::Minute1 => ("1m", None),
        TimeFrame::Minute5 => ("5m", None),
        TimeFrame::Minute15 => ("15m", None),
        TimeFrame::Minute30 => ("30m", None),
        TimeFrame::Hour1 => ("60m", None),
        TimeFrame::Hour4 => ("60m", Some(TimeFrame::Hour4.seconds())),
        TimeFrame::Day1 => ("1d", None),
    }
}

/// # Summary
/// 根据所需根数推算回溯窗口。
///
/// # Logic
/// 1. 周期秒数 × 根数 × 2，为休市与周末留出余量。
/// 2. 按 Yahoo 对各周期的回溯上限截断，日线最多 100 年。
fn lookback(timeframe: TimeFrame, count: usize) -> ChronoDuration {
    let bars = i64::try_from(count).unwrap_or(i64::MAX);
    let wanted = timeframe.seconds().saturating_mul(bars).saturating_mul(2);
    let cap_days = match timeframe {
        TimeFrame::Minute1 => 7,
        TimeFrame::Minute5 | TimeFrame::Minute15 | TimeFrame::Minute30 => 59,
        TimeFrame::Hour1 | TimeFrame::Hour4 => 729,
        TimeFrame::Day1 => 36_500,
    };
    let seconds = wanted.min(cap_days * 86_400);
    ChronoDuration::seconds(seconds.max(timeframe.seconds()))
}

/// # Summary
/// 解析 chart 响应为 K 线列表。
///
/// # Logic
/// 1. 平台错误转换为 `MarketError::Unknown`，缺少结果返回 `NotFound`。
/// 2. 任一 OHLCV 字段缺失的位置被丢弃（休市占位）。
/// 3. 结果整理为严格递增序列。
fn candles_from_response(json: YahooResponse) -> Result<Vec<Candle>, MarketError> {
    if let Some(err) = json.chart.error {
        return Err(MarketError::Unknown(err.description));
    }

    let result = json
        .chart
        .result
        .ok_or(MarketError::NotFound)?
        .pop()
        .ok_or(MarketError::NotFound)?;

    let quote = result
        .indicators
        .quote
        .first()
        .ok_or(MarketError::Parse("No quote data".into()))?;

    let mut candles = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        if let (Some(o), Some(h), Some(l), Some(c)) = (
            quote.open.get(i).and_then(|x| *x),
            quote.high.get(i).and_then(|x| *x),
            quote.low.get(i).and_then(|x| *x),
            quote.close.get(i).and_then(|x| *x),
        ) {
            let time = Utc
                .timestamp_opt(ts, 0)
                .single()
                .ok_or_else(|| MarketError::Parse(format!("Invalid timestamp {}", ts)))?;
            candles.push(Candle {
                time,
                open: o,
                high: h,
                low: l,
                close: c,
                // 部分品种 (如外汇) 不提供成交量
                volume: quote.volume.get(i).and_then(|x| *x).unwrap_or(0.0),
            });
        }
    }

    Ok(normalize_candles(candles))
}

/// # Summary
/// 将有序 K 线按 UTC 对齐的时间桶合并。
///
/// # Logic
/// 1. 桶起点 = 时间戳向下取整到 `bucket_secs` 的整数倍。
/// 2. 开盘取桶内第一根，收盘取最后一根，高低取极值，成交量求和。
fn aggregate(candles: &[Candle], bucket_secs: i64) -> Vec<Candle> {
    let mut out: Vec<Candle> = Vec::new();
    for candle in candles {
        let ts = candle.time.timestamp();
        let bucket_start = ts - ts.rem_euclid(bucket_secs);
        let Some(bucket_time) = DateTime::<Utc>::from_timestamp(bucket_start, 0) else {
            continue;
        };
        match out.last_mut() {
            Some(bar) if bar.time == bucket_time => {
                bar.high = bar.high.max(candle.high);
                bar.low = bar.low.min(candle.low);
                bar.close = candle.close;
                bar.volume += candle.volume;
            }
            _ => out.push(Candle {
                time: bucket_time,
                ..candle.clone()
            }),
        }
    }
    out
}

/// 只保留最后 `count` 根。
fn keep_last(mut candles: Vec<Candle>, count: usize) -> Vec<Candle> {
    let skip = candles.len().saturating_sub(count);
    candles.split_off(skip)
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    /// # Summary
    /// 从 Yahoo Finance 抓取最近的 K 线。
    ///
    /// # Logic
    /// 1. 映射 TimeFrame 周期为 Yahoo 识别的 interval。
    /// 2. 根据根数推算 period1，period2 取当前时间。
    /// 3. 发起异步请求并解析嵌套的 JSON 数据。
    /// 4. 4 小时周期由小时线聚合得到。
    /// 5. 截取最后 `count` 根。
    ///
    /// # Arguments
    /// * `instrument`: 标的。
    /// * `timeframe`: 周期。
    /// * `count`: 需要的根数。
    ///
    /// # Returns
    /// 成功返回 K 线列表，失败返回 MarketError。
    async fn fetch_latest(
        &self,
        instrument: &Instrument,
        timeframe: TimeFrame,
        count: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        let symbol = &instrument.symbol;
        let (interval, bucket) = source_interval(timeframe);
        let end = Utc::now();
        let start = end - lookback(timeframe, count);

        let url = format!("{}/{}", self.base_url, symbol);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", start.timestamp().to_string().as_str()),
                ("period2", end.timestamp().to_string().as_str()),
                ("interval", interval),
                ("includePrePost", "false"),
            ])
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(MarketError::Network(format!("HTTP {}", resp.status())));
        }

        let json: YahooResponse = resp
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;

        let mut candles = candles_from_response(json)?;
        if let Some(bucket_secs) = bucket {
            candles = aggregate(&candles, bucket_secs);
        }
        let candles = keep_last(candles, count);

        debug!(
            "Fetched {} {} candles for {}",
            candles.len(),
            timeframe,
            symbol
        );
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<Vec<Candle>, MarketError> {
        let json: YahooResponse = serde_json::from_str(raw).unwrap();
        candles_from_response(json)
    }

    fn bar(ts: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
        Candle {
            time: Utc.timestamp_opt(ts, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    #[test]
    fn test_parse_chart_drops_gaps_and_sorts() {
        let raw = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1714989600, 1714986000, 1714993200],
                    "indicators": { "quote": [{
                        "open":   [2301.0, 2300.0, null],
                        "high":   [2305.0, 2302.0, null],
                        "low":    [2299.5, 2298.0, null],
                        "close":  [2304.0, 2301.0, null],
                        "volume": [1200, null, null]
                    }]}
                }],
                "error": null
            }
        }"#;
        let candles = parse(raw).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time.timestamp(), 1714986000);
        assert_eq!(candles[0].close, 2301.0);
        assert_eq!(candles[0].volume, 0.0);
        assert_eq!(candles[1].volume, 1200.0);
    }

    #[test]
    fn test_parse_chart_error_and_missing_result() {
        let err = parse(r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#)
            .unwrap_err();
        assert!(matches!(err, MarketError::Unknown(ref d) if d.contains("delisted")));

        let err = parse(r#"{"chart":{"result":[],"error":null}}"#).unwrap_err();
        assert!(matches!(err, MarketError::NotFound));
    }

    #[test]
    fn test_parse_chart_without_timestamps_is_empty() {
        let raw = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse(raw).unwrap().is_empty());
    }

    #[test]
    fn test_aggregate_four_hour_buckets() {
        // 2024-05-06 00:00 UTC = 1714953600，按 4 小时对齐
        let base = 1714953600;
        let hourly = vec![
            bar(base, 10.0, 12.0, 9.0, 11.0, 1.0),
            bar(base + 3600, 11.0, 13.0, 10.0, 12.0, 2.0),
            bar(base + 3 * 3600, 12.0, 12.5, 8.0, 9.0, 3.0),
            bar(base + 4 * 3600, 9.0, 10.0, 8.5, 9.5, 4.0),
        ];
        let out = aggregate(&hourly, 4 * 3600);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], bar(base, 10.0, 13.0, 8.0, 9.0, 6.0));
        assert_eq!(out[1], bar(base + 4 * 3600, 9.0, 10.0, 8.5, 9.5, 4.0));
    }

    #[test]
    fn test_keep_last_and_lookback() {
        let bars: Vec<Candle> = (0..5).map(|i| bar(i * 60, 1.0, 1.0, 1.0, 1.0, 0.0)).collect();
        let kept = keep_last(bars.clone(), 3);
        assert_eq!(kept.first().unwrap().time.timestamp(), 120);
        assert_eq!(keep_last(bars, 10).len(), 5);

        assert_eq!(lookback(TimeFrame::Hour1, 500), ChronoDuration::hours(1000));
        assert_eq!(lookback(TimeFrame::Minute1, 500_000), ChronoDuration::days(7));
        assert_eq!(lookback(TimeFrame::Day1, 0), ChronoDuration::days(1));
        assert_eq!(lookback(TimeFrame::Day1, 500), ChronoDuration::days(1000));
    }

    #[test]
    fn test_lookback_saturates_for_huge_counts() {
        assert_eq!(
            lookback(TimeFrame::Day1, 100_000_000_000_000),
            ChronoDuration::days(36_500)
        );
        assert_eq!(lookback(TimeFrame::Day1, usize::MAX), ChronoDuration::days(36_500));
        assert_eq!(lookback(TimeFrame::Hour4, usize::MAX), ChronoDuration::days(729));
        assert_eq!(source_interval(TimeFrame::Hour4), ("60m", Some(14_400)));
    }
}
