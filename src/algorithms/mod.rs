/// 室内采集算法模块
///
/// 该模块提供：
/// - 传感器样本与滚动缓冲区
/// - 窗口中位数汇总
/// - 蓝牙/iBeacon 指纹采集状态机
/// - 同一位置多次采集的合并
/// - 基于校准点与 Wi-Fi 指纹的实时位置估计

pub mod sample;
pub mod sample_buffer;
pub mod summarizer;
pub mod beacon;
pub mod rssi_model;
pub mod fingerprint;
pub mod aggregator;
pub mod location_algorithms;
pub mod results;

pub use sample::*;
pub use sample_buffer::*;
pub use summarizer::*;
pub use beacon::*;
pub use rssi_model::*;
pub use fingerprint::*;
pub use aggregator::*;
pub use location_algorithms::*;
pub use results::*;
