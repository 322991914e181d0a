/// 采集数据集
///
/// 位置记录、校准点与参考锚点整体交给外部的存储/导出模块，这里不决定文件格式。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::algorithms::{CalibrationPoint, CaptureSession, LocationAggregator, ReferenceAnchor};

/// 持久化/导出用的数据集合
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub sessions: Vec<CaptureSession>,
    #[serde(default)]
    pub calibration_points: Vec<CalibrationPoint>,
    #[serde(default)]
    pub reference_anchors: Vec<ReferenceAnchor>,
}

impl Dataset {
    pub fn new(
        sessions: Vec<CaptureSession>,
        calibration_points: Vec<CalibrationPoint>,
        reference_anchors: Vec<ReferenceAnchor>,
    ) -> Self {
        Dataset {
            sessions,
            calibration_points,
            reference_anchors,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty() && self.calibration_points.is_empty() && self.reference_anchors.is_empty()
    }

    /// 所有位置累计的采集次数
    pub fn total_visits(&self) -> u32 {
        self.sessions.iter().map(|s| s.averaged_from_count).sum()
    }
}

/// 位置记录集合（线程安全）
#[derive(Clone, Debug, Default)]
pub struct LocationStore {
    sessions: Arc<Mutex<Vec<CaptureSession>>>,
}

impl LocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用已持久化的记录初始化
    pub fn from_sessions(sessions: Vec<CaptureSession>) -> Self {
        LocationStore {
            sessions: Arc::new(Mutex::new(sessions)),
        }
    }

    /// 并入一次新采集，返回合并后的记录
    pub async fn merge(&self, aggregator: &LocationAggregator, session: CaptureSession) -> CaptureSession {
        let mut guard = self.sessions.lock().await;
        let existing = std::mem::take(&mut *guard);
        let outcome = aggregator.merge_into(existing, session);
        *guard = outcome.locations;
        outcome.merged
    }

    /// 导出用的副本
    pub async fn sessions(&self) -> Vec<CaptureSession> {
        self.sessions.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
