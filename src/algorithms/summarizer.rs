/// 窗口中位数汇总
///
/// 将一段时间内的噪声样本归约为单个 `CaptureSummary`：
/// 先把时间跨度等分为若干窗口，计算每个窗口内的均值，再对窗口均值取中位数。
/// 窗口内均值平滑短暂毛刺，窗口间中位数剔除持续异常的窗口。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::algorithms::{BleStats, Sample};

/// 默认窗口数
pub const DEFAULT_WINDOW_COUNT: usize = 5;

/// 最小窗口宽度（微秒）
const MIN_WINDOW_WIDTH_US: f64 = 1_000.0;

/// 单个位置的传感器汇总
///
/// 计数字段在合并时求和；连续字段始终是各次采集有效值的算术平均。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub horizontal_accuracy_m: Option<f64>,
    /// 磁场强度（µT）
    pub magnetic_norm_ut: Option<f64>,
    pub pressure_kpa: Option<f64>,
    pub relative_altitude_m: Option<f64>,
    pub ble_unique_devices: usize,
    pub ble_total_samples: usize,
    pub ble_ibeacon_samples: usize,
    pub sample_count: usize,
}

impl CaptureSummary {
    /// 所有连续字段为空的汇总
    pub fn empty(sample_count: usize) -> Self {
        CaptureSummary {
            sample_count,
            ..Default::default()
        }
    }

    /// 填入指纹采集器的蓝牙统计
    pub fn with_ble(mut self, stats: &BleStats) -> Self {
        self.ble_unique_devices = stats.unique_devices;
        self.ble_total_samples = stats.total_samples;
        self.ble_ibeacon_samples = stats.ibeacon_samples;
        self
    }
}

/// 窗口中位数汇总器
#[derive(Clone, Debug)]
pub struct WindowSummarizer {
    window_count: usize,
}

impl WindowSummarizer {
    pub fn new(window_count: usize) -> Self {
        WindowSummarizer {
            window_count: window_count.max(1),
        }
    }

    pub fn window_count(&self) -> usize {
        self.window_count
    }

    /// 汇总样本
    ///
    /// 少于 2 个样本时返回空汇总。蓝牙字段由调用方填写。
    pub fn summarize(&self, samples: &[Sample]) -> CaptureSummary {
        if samples.len() < 2 {
            return CaptureSummary::empty(samples.len());
        }

        let windows = self.assign_windows(samples);

        CaptureSummary {
            latitude: self.windowed_median(samples, &windows, |s| s.latitude),
            longitude: self.windowed_median(samples, &windows, |s| s.longitude),
            horizontal_accuracy_m: self.windowed_median(samples, &windows, |s| {
                s.horizontal_accuracy_m
            }),
            magnetic_norm_ut: self.windowed_median(samples, &windows, |s| s.magnetic_norm()),
            pressure_kpa: self.windowed_median(samples, &windows, |s| s.pressure_kpa),
            relative_altitude_m: self.windowed_median(samples, &windows, |s| {
                s.relative_altitude_m
            }),
            sample_count: samples.len(),
            ..Default::default()
        }
    }

    /// 计算每个样本所属的窗口下标
    ///
    /// 窗口为左闭右开区间，最后一个样本恰好落在右端点，归入最后一个窗口。
    fn assign_windows(&self, samples: &[Sample]) -> Vec<usize> {
        let first = samples.iter().map(|s| s.timestamp).min();
        let last = samples.iter().map(|s| s.timestamp).max();
        let (Some(first), Some(last)) = (first, last) else {
            return Vec::new();
        };

        let span_us = micros_between(first, last);
        let width_us = (span_us / self.window_count as f64).max(MIN_WINDOW_WIDTH_US);

        samples
            .iter()
            .map(|s| {
                let index = (micros_between(first, s.timestamp) / width_us).floor() as usize;
                index.min(self.window_count - 1)
            })
            .collect()
    }

    fn windowed_median<F>(&self, samples: &[Sample], windows: &[usize], extract: F) -> Option<f64>
    where
        F: Fn(&Sample) -> Option<f64>,
    {
        let mut sums = vec![0.0; self.window_count];
        let mut counts = vec![0usize; self.window_count];

        for (sample, &window) in samples.iter().zip(windows) {
            if let Some(value) = extract(sample) {
                sums[window] += value;
                counts[window] += 1;
            }
        }

        let mut means: Vec<f64> = sums
            .iter()
            .zip(&counts)
            .filter(|(_, count)| **count > 0)
            .map(|(sum, count)| sum / *count as f64)
            .collect();

        median(&mut means)
    }
}

impl Default for WindowSummarizer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_COUNT)
    }
}

/// 中位数，偶数个时取中间两个值的平均
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

fn micros_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_microseconds().unwrap_or(i64::MAX) as f64
}
