pub mod algorithms;
pub mod capture;
pub mod collector;
pub mod config;
pub mod dataset;
pub mod error;
pub mod positioning;
pub mod scanner;
pub mod sensors;

pub use capture::CaptureController;
pub use collector::CollectorHandle;
pub use config::SurveyConfig;
pub use dataset::{Dataset, LocationStore};
pub use error::{Result, SurveyError};
pub use positioning::{CalibrationStore, LivePositioning};
pub use scanner::BleScanner;
pub use sensors::SensorHub;
