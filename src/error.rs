use std::path::PathBuf;

use thiserror::Error;

/// 运行时错误
///
/// 核心算法不会产生错误，只返回空值或哨兵结果；这里只覆盖蓝牙、任务通信和配置加载。
#[derive(Debug, Error)]
pub enum SurveyError {
    #[error("蓝牙操作失败: {0}")]
    Bluetooth(#[from] btleplug::Error),

    #[error("未找到蓝牙适配器")]
    NoAdapter,

    #[error("已有采集任务正在进行")]
    CaptureInProgress,

    #[error("指纹采集任务已退出")]
    CollectorClosed,

    #[error("读取配置文件 {path} 失败: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("设备名称过滤表达式无效: {0}")]
    InvalidPattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, SurveyError>;
