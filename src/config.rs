/// 采集配置
///
/// 所有字段都有默认值，配置文件（JSON）中只需写需要覆盖的字段。

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::algorithms::{DEFAULT_PROXIMITY_THRESHOLD_M, DEFAULT_RETENTION_SECS, DEFAULT_WINDOW_COUNT};
use crate::error::{Result, SurveyError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    /// 采样频率 (Hz)
    pub sample_rate_hz: u32,
    /// 缓冲区保留时长（秒）
    pub retention_secs: i64,
    /// 单次采集时长（毫秒）
    pub capture_duration_ms: u64,
    /// 采集开始前额外纳入的预热时长（秒）
    pub prewarm_secs: f64,
    /// 汇总窗口数
    pub window_count: usize,
    /// 合并距离阈值（米）
    pub proximity_threshold_m: f64,
    /// 每个地图单位对应的米数
    pub meters_per_unit: f64,
    /// 蓝牙外设轮询间隔（毫秒）
    pub scan_poll_interval_ms: u64,
    /// 设备名称过滤正则，None 表示不过滤
    pub name_pattern: Option<String>,
    /// 实时位置估计间隔（毫秒）
    pub estimate_interval_ms: u64,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        SurveyConfig {
            sample_rate_hz: 20,
            retention_secs: DEFAULT_RETENTION_SECS,
            capture_duration_ms: 5_000,
            prewarm_secs: 2.0,
            window_count: DEFAULT_WINDOW_COUNT,
            proximity_threshold_m: DEFAULT_PROXIMITY_THRESHOLD_M,
            meters_per_unit: 1.0,
            scan_poll_interval_ms: 500,
            name_pattern: None,
            estimate_interval_ms: 1_000,
        }
    }
}

impl SurveyConfig {
    /// 从 JSON 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| SurveyError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.sample_rate_hz.max(1) as u64)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retention_secs)
    }

    pub fn capture_duration(&self) -> Duration {
        Duration::from_millis(self.capture_duration_ms)
    }

    pub fn prewarm(&self) -> chrono::Duration {
        chrono::Duration::milliseconds((self.prewarm_secs.max(0.0) * 1000.0) as i64)
    }

    pub fn scan_poll_interval(&self) -> Duration {
        Duration::from_millis(self.scan_poll_interval_ms.max(1))
    }

    pub fn estimate_interval(&self) -> Duration {
        Duration::from_millis(self.estimate_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SurveyConfig::default();
        assert_eq!(config.sample_interval(), Duration::from_millis(50));
        assert_eq!(config.retention(), chrono::Duration::seconds(30));
        assert_eq!(config.prewarm(), chrono::Duration::seconds(2));
        assert_eq!(config.window_count, 5);
        assert_eq!(config.proximity_threshold_m, 18.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SurveyConfig::from_json(r#"{"capture_duration_ms": 3000, "name_pattern": "^RFstar"}"#).unwrap();
        assert_eq!(config.capture_duration(), Duration::from_secs(3));
        assert_eq!(config.name_pattern.as_deref(), Some("^RFstar"));
        assert_eq!(config.sample_rate_hz, 20);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = SurveyConfig::load("/nonexistent/blusurvey.json").unwrap_err();
        assert!(matches!(err, SurveyError::ConfigRead { .. }));
    }
}
