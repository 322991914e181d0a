/// 蓝牙指纹采集状态机
///
/// 同一时间只有一个采集会话：
/// - `Idle`：空闲，广播事件被忽略
/// - `PendingStart`：已请求开始，等待扫描硬件就绪
/// - `Active`：正在记录
///
/// 该结构本身不处理并发，由 `collector` 模块中的单一任务独占持有。

use chrono::{DateTime, Utc};

use crate::algorithms::{Advertisement, BleSample, BleStats};

/// 采集器状态
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    PendingStart {
        session_id: String,
    },
    Active {
        session_id: String,
        started_at: DateTime<Utc>,
    },
}

#[derive(Debug)]
pub struct FingerprintCollector {
    state: CollectorState,
    hardware_ready: bool,
    samples: Vec<BleSample>,
}

impl FingerprintCollector {
    pub fn new() -> Self {
        FingerprintCollector {
            state: CollectorState::Idle,
            hardware_ready: false,
            samples: Vec::new(),
        }
    }

    pub fn state(&self) -> &CollectorState {
        &self.state
    }

    pub fn is_hardware_ready(&self) -> bool {
        self.hardware_ready
    }

    /// 当前会话 ID（等待中或进行中）
    pub fn session_id(&self) -> Option<&str> {
        match &self.state {
            CollectorState::Idle => None,
            CollectorState::PendingStart { session_id }
            | CollectorState::Active { session_id, .. } => Some(session_id),
        }
    }

    /// 开始新会话
    ///
    /// 清空已记录数据。硬件未就绪时进入等待状态，后一次请求覆盖前一次。
    pub fn start(&mut self, session_id: impl Into<String>, now: DateTime<Utc>) {
        let session_id = session_id.into();
        self.samples.clear();
        self.state = if self.hardware_ready {
            CollectorState::Active {
                session_id,
                started_at: now,
            }
        } else {
            CollectorState::PendingStart { session_id }
        };
    }

    /// 扫描硬件就绪
    ///
    /// 返回 true 表示等待中的会话在此刻转为进行中。
    pub fn mark_ready(&mut self, now: DateTime<Utc>) -> bool {
        self.hardware_ready = true;

        let session_id = match &self.state {
            CollectorState::PendingStart { session_id } => session_id.clone(),
            _ => return false,
        };

        self.state = CollectorState::Active {
            session_id,
            started_at: now,
        };
        true
    }

    /// 扫描硬件不可用，进行中的会话保留已记录数据
    pub fn mark_unavailable(&mut self) {
        self.hardware_ready = false;
    }

    /// 记录一次广播事件，仅在进行中有效
    ///
    /// 同一设备的重复广播全部保留。
    pub fn record(&mut self, ad: &Advertisement, now: DateTime<Utc>) -> Option<&BleSample> {
        let CollectorState::Active {
            session_id,
            started_at,
        } = &self.state
        else {
            return None;
        };

        let offset_ms = (now - *started_at).num_milliseconds().max(0) as u64;
        self.samples
            .push(BleSample::from_advertisement(session_id.clone(), offset_ms, ad));
        self.samples.last()
    }

    /// 结束会话，返回全部记录并回到空闲状态
    ///
    /// 任何状态下都可调用。
    pub fn stop(&mut self) -> Vec<BleSample> {
        self.state = CollectorState::Idle;
        std::mem::take(&mut self.samples)
    }

    pub fn snapshot(&self) -> Vec<BleSample> {
        self.samples.clone()
    }

    pub fn stats(&self) -> BleStats {
        BleStats::from_samples(&self.samples)
    }
}

impl Default for FingerprintCollector {
    fn default() -> Self {
        Self::new()
    }
}
