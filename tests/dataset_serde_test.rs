/// 数据集序列化测试
///
/// 位置记录整体交给外部存储，写出再读回必须逐字段一致。

use blusurvey::algorithms::*;
use blusurvey::{Dataset, LocationStore};
use chrono::{Duration, TimeZone, Utc};

fn recorded_session() -> CaptureSession {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + Duration::microseconds(123_456);
    let samples: Vec<Sample> = (0..4)
        .map(|i| {
            Sample::empty(t0 + Duration::milliseconds(i * 50))
                .with_gps(GpsFix::new(31.230416, 121.473701).with_accuracy(4.7).with_motion(0.3, -1.0))
                .with_magnetic_field(Vector3::new(12.5, -33.1, 40.2))
                .with_barometer(BarometerReading {
                    pressure_kpa: 101.325,
                    relative_altitude_m: 0.42,
                })
        })
        .collect();

    let mut payload = vec![0x4C, 0x00, 0x02, 0x15];
    payload.extend_from_slice(&[0xAB; 16]);
    payload.extend_from_slice(&[0x00, 0x0A, 0x00, 0x0B, 0xC3]);
    let ble_samples = vec![
        BleSample::from_advertisement(
            "session-1".to_string(),
            17,
            &Advertisement::new("20:A7:16:5E:C5:D6", -63).with_manufacturer_data(payload),
        ),
        BleSample::from_advertisement(
            "session-1".to_string(),
            42,
            &Advertisement::new("phone", -88).with_local_name("Pixel"),
        ),
    ];

    let stats = BleStats::from_samples(&ble_samples);
    let summary = WindowSummarizer::default().summarize(&samples).with_ble(&stats);
    CaptureSession::new(
        "session-1",
        t0,
        MapAnchor::new("floor-1", 12.75, 80.5),
        summary,
        samples,
        ble_samples,
    )
}

#[test]
fn test_capture_session_round_trip() {
    let session = recorded_session();
    let json = serde_json::to_string_pretty(&session).unwrap();
    println!("{}", json);

    let restored: CaptureSession = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, session);
    assert_eq!(restored.samples[0].course_deg, None);
    assert!(restored.ble_samples[0].is_ibeacon());
}

#[tokio::test]
async fn test_dataset_export_and_restore() {
    let store = LocationStore::new();
    let merged = store.merge(&LocationAggregator::default(), recorded_session()).await;
    assert_eq!(merged.averaged_from_count, 1);

    let dataset = Dataset::new(
        store.sessions().await,
        vec![CalibrationPoint::new(GpsCoordinate::new(31.23, 121.47), PixelPoint::new(5.0, 6.0))
            .with_wifi(WifiFingerprint::from_pairs(vec![("ap", -55)]))],
        vec![ReferenceAnchor::new(GpsCoordinate::new(31.0, 121.0), PixelPoint::new(0.0, 0.0))],
    );
    assert_eq!(dataset.total_visits(), 1);

    let json = serde_json::to_string(&dataset).unwrap();
    let restored: Dataset = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, dataset);

    let reloaded = LocationStore::from_sessions(restored.sessions);
    assert_eq!(reloaded.len().await, 1);

    // 缺省字段按空集合处理
    let minimal: Dataset = serde_json::from_str(r#"{"sessions": []}"#).unwrap();
    assert!(minimal.is_empty());
}
