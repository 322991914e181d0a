/// 指纹采集任务
///
/// `FingerprintCollector` 由一个独立任务独占持有，广播事件与 start/stop/快照请求
/// 都通过同一个通道按顺序处理，不存在事件与 stop 之间的竞争。

use chrono::Utc;
use log::{debug, info};
use tokio::sync::{mpsc, oneshot};

use crate::algorithms::{Advertisement, BleSample, BleStats, CollectorState, FingerprintCollector};
use crate::error::{Result, SurveyError};

const COMMAND_BUFFER: usize = 1024;

enum Command {
    Start {
        session_id: String,
    },
    Stop {
        reply: oneshot::Sender<Vec<BleSample>>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<BleSample>>,
    },
    Stats {
        reply: oneshot::Sender<BleStats>,
    },
    State {
        reply: oneshot::Sender<CollectorState>,
    },
    Advertise(Advertisement),
    MarkReady,
    MarkUnavailable,
}

/// 采集任务句柄，可克隆后在扫描线程、采集线程间共享
#[derive(Clone, Debug)]
pub struct CollectorHandle {
    tx: mpsc::Sender<Command>,
}

impl CollectorHandle {
    /// 启动采集任务，所有句柄释放后任务退出
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(collector_task(rx));
        CollectorHandle { tx }
    }

    pub async fn start(&self, session_id: impl Into<String>) -> Result<()> {
        self.send(Command::Start {
            session_id: session_id.into(),
        })
        .await
    }

    /// 结束会话并取回所有观测
    pub async fn stop(&self) -> Result<Vec<BleSample>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stop { reply }).await?;
        rx.await.map_err(|_| SurveyError::CollectorClosed)
    }

    pub async fn snapshot(&self) -> Result<Vec<BleSample>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| SurveyError::CollectorClosed)
    }

    pub async fn stats(&self) -> Result<BleStats> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stats { reply }).await?;
        rx.await.map_err(|_| SurveyError::CollectorClosed)
    }

    pub async fn state(&self) -> Result<CollectorState> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::State { reply }).await?;
        rx.await.map_err(|_| SurveyError::CollectorClosed)
    }

    /// 投递一次广播事件
    pub async fn advertise(&self, ad: Advertisement) -> Result<()> {
        self.send(Command::Advertise(ad)).await
    }

    /// 扫描硬件就绪
    pub async fn mark_ready(&self) -> Result<()> {
        self.send(Command::MarkReady).await
    }

    /// 扫描硬件停止
    pub async fn mark_unavailable(&self) -> Result<()> {
        self.send(Command::MarkUnavailable).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| SurveyError::CollectorClosed)
    }
}

async fn collector_task(mut rx: mpsc::Receiver<Command>) {
    let mut collector = FingerprintCollector::new();

    while let Some(command) = rx.recv().await {
        match command {
            Command::Start { session_id } => {
                collector.start(session_id.clone(), Utc::now());
                if collector.is_hardware_ready() {
                    info!("指纹采集开始: {}", session_id);
                } else {
                    info!("扫描未就绪，采集请求 {} 进入等待", session_id);
                }
            }
            Command::Stop { reply } => {
                let samples = collector.stop();
                info!("指纹采集结束，共 {} 条观测", samples.len());
                let _ = reply.send(samples);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(collector.snapshot());
            }
            Command::Stats { reply } => {
                let _ = reply.send(collector.stats());
            }
            Command::State { reply } => {
                let _ = reply.send(collector.state().clone());
            }
            Command::Advertise(ad) => {
                if let Some(sample) = collector.record(&ad, Utc::now()) {
                    match sample.estimated_distance_m() {
                        Some(distance) => debug!(
                            "记录 iBeacon {} RSSI {} dBm (+{} ms)，约 {:.1} m",
                            &sample.device_key[..8],
                            sample.rssi,
                            sample.offset_ms,
                            distance
                        ),
                        None => debug!(
                            "记录广播 {} RSSI {} dBm (+{} ms)",
                            &sample.device_key[..8],
                            sample.rssi,
                            sample.offset_ms
                        ),
                    }
                }
            }
            Command::MarkReady => {
                if collector.mark_ready(Utc::now()) {
                    info!(
                        "扫描就绪，等待中的采集开始: {}",
                        collector.session_id().unwrap_or_default()
                    );
                }
            }
            Command::MarkUnavailable => collector.mark_unavailable(),
        }
    }

    debug!("指纹采集任务退出");
}
