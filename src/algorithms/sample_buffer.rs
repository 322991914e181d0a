/// 滚动采样缓冲区
///
/// 按追加顺序保存样本，每次追加后淘汰早于 `最新时间 - 保留时长` 的头部样本。

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::algorithms::Sample;

/// 默认保留时长（秒）
pub const DEFAULT_RETENTION_SECS: i64 = 30;

#[derive(Clone, Debug)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    retention: Duration,
}

impl SampleBuffer {
    pub fn new(retention: Duration) -> Self {
        SampleBuffer {
            samples: VecDeque::new(),
            retention,
        }
    }

    /// 追加样本并淘汰过期样本
    ///
    /// 以新样本的时间戳作为当前时间，从头部开始淘汰，遇到第一个未过期的样本即停止。
    pub fn append(&mut self, sample: Sample) {
        let cutoff = sample.timestamp - self.retention;
        self.samples.push_back(sample);

        while let Some(front) = self.samples.front() {
            if front.timestamp < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// 读取 `from <= t <= to` 的所有样本，不修改缓冲区
    pub fn slice(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Sample> {
        self.samples
            .iter()
            .filter(|s| s.timestamp >= from && s.timestamp <= to)
            .cloned()
            .collect()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_RETENTION_SECS))
    }
}
