/// 多次采集合并
///
/// 同一地图位置（按锚点距离判断）的多次采集合并为一条记录：
/// - 连续字段取各次汇总有效值的平均（汇总的汇总，不回溯原始样本）
/// - 计数字段求和
/// - 锚点取各次锚点的质心
/// - 蓝牙观测全部拼接，原始样本只保留最新一次

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::algorithms::{BleSample, CaptureSummary, Sample};

/// 默认合并距离阈值（米）
pub const DEFAULT_PROXIMITY_THRESHOLD_M: f64 = 18.0;

/// 地图锚点
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapAnchor {
    /// 地图页/楼层标识
    pub page_id: String,
    pub x: f64,
    pub y: f64,
}

impl MapAnchor {
    pub fn new(page_id: impl Into<String>, x: f64, y: f64) -> Self {
        MapAnchor {
            page_id: page_id.into(),
            x,
            y,
        }
    }

    /// 同一页面内的欧几里得距离（地图单位），不同页面返回 None
    pub fn distance_to(&self, other: &MapAnchor) -> Option<f64> {
        if self.page_id != other.page_id {
            return None;
        }
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        Some((dx * dx + dy * dy).sqrt())
    }
}

/// 一个位置的采集记录
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptureSession {
    pub id: String,
    pub captured_at: DateTime<Utc>,
    pub anchor: MapAnchor,
    pub summary: CaptureSummary,
    /// 最近一次采集使用的原始样本
    pub samples: Vec<Sample>,
    /// 所有采集的蓝牙观测
    pub ble_samples: Vec<BleSample>,
    /// 参与合并的采集次数
    pub averaged_from_count: u32,
}

impl CaptureSession {
    pub fn new(
        id: impl Into<String>,
        captured_at: DateTime<Utc>,
        anchor: MapAnchor,
        summary: CaptureSummary,
        samples: Vec<Sample>,
        ble_samples: Vec<BleSample>,
    ) -> Self {
        CaptureSession {
            id: id.into(),
            captured_at,
            anchor,
            summary,
            samples,
            ble_samples,
            averaged_from_count: 1,
        }
    }
}

/// 合并结果
#[derive(Clone, Debug)]
pub struct MergeOutcome {
    /// 更新后的位置集合
    pub locations: Vec<CaptureSession>,
    /// 新插入或合并后的记录
    pub merged: CaptureSession,
}

/// 位置合并器
#[derive(Clone, Debug)]
pub struct LocationAggregator {
    /// 合并距离阈值（米）
    pub proximity_threshold_m: f64,
    /// 每个地图单位对应的米数
    pub meters_per_unit: f64,
}

impl LocationAggregator {
    pub fn new(proximity_threshold_m: f64, meters_per_unit: f64) -> Self {
        LocationAggregator {
            proximity_threshold_m,
            meters_per_unit,
        }
    }

    /// 两个锚点是否属于同一位置
    pub fn is_same_location(&self, a: &MapAnchor, b: &MapAnchor) -> bool {
        a.distance_to(b)
            .map(|units| units * self.meters_per_unit <= self.proximity_threshold_m)
            .unwrap_or(false)
    }

    /// 将新采集并入位置集合
    ///
    /// 附近没有已有记录时原样插入；否则与所有附近记录合并，被合并的旧记录删除。
    pub fn merge_into(&self, existing: Vec<CaptureSession>, new: CaptureSession) -> MergeOutcome {
        let (neighbours, mut locations): (Vec<_>, Vec<_>) = existing
            .into_iter()
            .partition(|session| self.is_same_location(&session.anchor, &new.anchor));

        let merged = if neighbours.is_empty() {
            new
        } else {
            merge_sessions(neighbours, new)
        };

        locations.push(merged.clone());
        MergeOutcome { locations, merged }
    }
}

impl Default for LocationAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_PROXIMITY_THRESHOLD_M, 1.0)
    }
}

/// 合并旧记录与最新记录，ID、时间和原始样本取最新记录
fn merge_sessions(previous: Vec<CaptureSession>, newest: CaptureSession) -> CaptureSession {
    let summaries: Vec<&CaptureSummary> = previous
        .iter()
        .map(|s| &s.summary)
        .chain(std::iter::once(&newest.summary))
        .collect();
    let summary = merge_summaries(&summaries);

    let anchors: Vec<&MapAnchor> = previous
        .iter()
        .map(|s| &s.anchor)
        .chain(std::iter::once(&newest.anchor))
        .collect();
    let count = anchors.len() as f64;
    let anchor = MapAnchor {
        page_id: newest.anchor.page_id.clone(),
        x: anchors.iter().map(|a| a.x).sum::<f64>() / count,
        y: anchors.iter().map(|a| a.y).sum::<f64>() / count,
    };

    let averaged_from_count = previous
        .iter()
        .map(|s| s.averaged_from_count)
        .sum::<u32>()
        + newest.averaged_from_count;

    let mut ble_samples: Vec<BleSample> = previous.into_iter().flat_map(|s| s.ble_samples).collect();
    ble_samples.extend(newest.ble_samples);

    CaptureSession {
        id: newest.id,
        captured_at: newest.captured_at,
        anchor,
        summary,
        samples: newest.samples,
        ble_samples,
        averaged_from_count,
    }
}

/// 汇总的汇总
///
/// 连续字段为各汇总非空值的简单平均，不按各次采集的样本数加权。
/// 这是有意接受的近似：合并代价与保留的原始数据量无关。
/// 改为全历史加权平均前需先评估存储代价。
pub fn merge_summaries(summaries: &[&CaptureSummary]) -> CaptureSummary {
    CaptureSummary {
        latitude: mean_of_present(summaries.iter().map(|s| s.latitude)),
        longitude: mean_of_present(summaries.iter().map(|s| s.longitude)),
        horizontal_accuracy_m: mean_of_present(summaries.iter().map(|s| s.horizontal_accuracy_m)),
        magnetic_norm_ut: mean_of_present(summaries.iter().map(|s| s.magnetic_norm_ut)),
        pressure_kpa: mean_of_present(summaries.iter().map(|s| s.pressure_kpa)),
        relative_altitude_m: mean_of_present(summaries.iter().map(|s| s.relative_altitude_m)),
        ble_unique_devices: summaries.iter().map(|s| s.ble_unique_devices).sum(),
        ble_total_samples: summaries.iter().map(|s| s.ble_total_samples).sum(),
        ble_ibeacon_samples: summaries.iter().map(|s| s.ble_ibeacon_samples).sum(),
        sample_count: summaries.iter().map(|s| s.sample_count).sum(),
    }
}

fn mean_of_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
