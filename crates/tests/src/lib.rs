//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（无需接收机硬件）
//! - 队列重启恢复

#[cfg(test)]
mod contract_tests {
    use contracts::FixRecord;

    #[test]
    fn test_fix_record_wire_keys() {
        let record = FixRecord {
            timestamp: 1_714_550_400,
            lon: -0.1278,
            lat: 51.5074,
            speed_over_ground: 12.5,
            course: 270.0,
            altitude: 35.0,
        };
        let value = serde_json::to_value(record).unwrap();
        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, ["a", "c", "lat", "lon", "s", "t"]);
    }

    #[test]
    fn test_config_round_trip_through_loader() {
        let toml = r#"
[input]
path = "/dev/ttyACM0"

[sampler]
minimum_sampling_distance = 25.0
moving_average_length = 4

[publisher]
name = "fleet"
kind = "tcp"
params = { addr = "collector.local:7000" }
"#;
        let config =
            config_loader::ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        assert_eq!(config.sampler.moving_average_length, 4);
        assert_eq!(config.publisher.kind, contracts::PublisherKind::Tcp);

        let json = config_loader::ConfigLoader::to_json(&config).unwrap();
        let reloaded =
            config_loader::ConfigLoader::load_from_str(&json, config_loader::ConfigFormat::Json)
                .unwrap();
        assert_eq!(reloaded.sampler, config.sampler);
        assert_eq!(reloaded.publisher.params, config.publisher.params);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{FixRecord, PublisherConfig, PublisherKind, SamplerConfig};
    use dispatcher::{create_publisher, AnyPublisher, DeliveryQueue, PoolConfig, WorkerPool};
    use ingestion::{frame, IngestionPipeline, MockReceiver, MockReceiverConfig};
    use sampler::AdaptiveSampler;

    async fn file_publisher(path: &Path) -> AnyPublisher {
        create_publisher(&PublisherConfig {
            name: "file".to_string(),
            kind: PublisherKind::File,
            params: HashMap::from([("path".to_string(), path.display().to_string())]),
        })
        .await
        .unwrap()
    }

    fn pool_config() -> PoolConfig {
        PoolConfig {
            workers: 1,
            retry_backoff: Duration::from_millis(10),
            max_retry_backoff: Duration::from_millis(50),
        }
    }

    fn read_records(path: &Path) -> Vec<FixRecord> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn assert_same_records(delivered: &[FixRecord], expected: &[FixRecord]) {
        assert_eq!(delivered.len(), expected.len());
        for (got, want) in delivered.iter().zip(expected) {
            assert_eq!(got.timestamp, want.timestamp);
            assert!((got.lat - want.lat).abs() < 1e-9);
            assert!((got.lon - want.lon).abs() < 1e-9);
        }
    }

    /// One hand-written epoch: satellites → fix data → track → DOP → transit
    #[test]
    fn test_fabricated_epoch_yields_record() {
        let lines = [
            frame("GPGSV,3,1,12,01,40,083,46,02,17,308,41,03,07,344,39,04,22,228,45"),
            frame("GPGSV,3,2,12,05,40,083,46,06,17,308,41,07,07,344,39,08,22,228,45"),
            frame("GPGSV,3,3,12,09,40,083,46,10,17,308,41,11,07,344,39,12,22,228,45"),
            frame("GPGGA,092750.000,5130.4440,N,00007.6680,W,1,08,0.9,35.0,M,46.9,M,,"),
            frame("GPVTG,090.0,T,,M,000.0,N,000.0,K,A"),
            frame("GPGSA,A,3,01,02,03,04,05,06,,,,,,,1.8,0.9,1.5"),
            frame("GPRMC,092750.000,A,5130.4440,N,00007.6680,W,000.0,090.0,010524,,"),
        ];

        let mut pipeline = IngestionPipeline::new();
        let mut completed = Vec::new();
        for line in &lines {
            completed.extend(pipeline.ingest_line(line));
        }

        assert_eq!(completed.len(), 1);
        let epoch = &completed[0];
        assert_eq!(epoch.blob.satellites_reported(), 12);

        let record = FixRecord::try_from(&epoch.fix).unwrap();
        assert!((record.lat - 51.5074).abs() < 1e-6);
        assert!((record.lon + 0.1278).abs() < 1e-6);
        assert!(record.timestamp > 0);
    }

    /// MockReceiver → IngestionPipeline → AdaptiveSampler → DeliveryQueue → WorkerPool
    #[tokio::test]
    async fn test_e2e_mock_relay() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.jsonl");

        let queue = Arc::new(DeliveryQueue::open(dir.path().join("queue"), None).unwrap());
        let publisher = Arc::new(file_publisher(&out).await);
        let pool = WorkerPool::spawn(Arc::clone(&queue), publisher, pool_config());

        let mut receiver = MockReceiver::new(MockReceiverConfig::default());
        let mut ingestion = IngestionPipeline::new();
        let mut sampler = AdaptiveSampler::new(SamplerConfig {
            minimum_sampling_distance: 5.0,
            maximum_sampling_distance: 50.0,
            ..Default::default()
        })
        .unwrap();

        let mut emitted = Vec::new();
        for line in receiver.lines(30) {
            let Some(epoch) = ingestion.ingest_line(&line) else {
                continue;
            };
            for emission in sampler.process_update(&epoch.fix).unwrap() {
                queue.enqueue(&emission.record).unwrap();
                emitted.push(emission.record);
            }
        }

        assert_eq!(ingestion.metrics().snapshot().epochs_completed, 30);
        assert!(emitted.len() > 2, "emitted {}", emitted.len());

        tokio::time::timeout(Duration::from_secs(5), queue.wait_drained())
            .await
            .unwrap();
        let report = pool.shutdown(Duration::from_secs(1)).await;
        assert_eq!(report.aborted, 0);

        // 单 worker 保证投递顺序
        assert_same_records(&read_records(&out), &emitted);
        assert_eq!(queue.metrics().snapshot().delivered, emitted.len() as u64);
    }

    /// A stationary receiver pauses once and stays quiet
    #[test]
    fn test_parked_receiver_is_decimated() {
        let mut receiver = MockReceiver::parked(51.5074, -0.1278);
        let mut ingestion = IngestionPipeline::new();
        let mut sampler = AdaptiveSampler::new(SamplerConfig::default()).unwrap();

        let mut emissions = Vec::new();
        for line in receiver.lines(20) {
            if let Some(epoch) = ingestion.ingest_line(&line) {
                emissions.extend(sampler.process_update(&epoch.fix).unwrap());
            }
        }

        assert_eq!(emissions.len(), 1);
        assert!(sampler.is_paused());
    }

    /// 静止时接收机不报航向：航向为空的 epoch 仍然触发一次 pause
    #[test]
    fn test_stationary_blank_course_pauses() {
        let mut ingestion = IngestionPipeline::new();
        let mut sampler = AdaptiveSampler::new(SamplerConfig::default()).unwrap();

        let mut emissions = Vec::new();
        for second in 0..15 {
            let hhmmss = format!("0927{second:02}.000");
            let lines = [
                frame("GPGSV,1,1,04,01,40,083,46,02,17,308,41,03,07,344,39,04,22,228,45"),
                frame(&format!(
                    "GPGGA,{hhmmss},5130.4440,N,00007.6680,W,1,04,1.2,35.0,M,46.9,M,,"
                )),
                frame("GPVTG,,T,,M,0.004,N,0.008,K,A"),
                frame("GPGSA,A,3,01,02,03,04,,,,,,,,,1.8,0.9,1.5"),
                frame(&format!(
                    "GPRMC,{hhmmss},A,5130.4440,N,00007.6680,W,0.004,,010524,,,A"
                )),
            ];
            for line in &lines {
                if let Some(epoch) = ingestion.ingest_line(line) {
                    assert!(epoch.fix.course.is_none());
                    emissions.extend(sampler.process_update(&epoch.fix).unwrap());
                }
            }
        }

        assert_eq!(ingestion.metrics().snapshot().epochs_completed, 15);
        assert_eq!(emissions.len(), 1);
        assert_eq!(emissions[0].reason, sampler::EmissionReason::Pause);
        assert!(sampler.is_paused());
    }

    /// Items left behind by a crash are delivered exactly once after restart
    #[tokio::test]
    async fn test_queue_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let queue_dir = dir.path().join("queue");
        let out = dir.path().join("out.jsonl");

        let records: Vec<FixRecord> = (0..5)
            .map(|i| FixRecord {
                timestamp: 1_714_550_400 + i,
                lon: -0.1278,
                lat: 51.5074 + i as f64 * 1e-3,
                speed_over_ground: 20.0,
                course: 0.0,
                altitude: 35.0,
            })
            .collect();

        {
            let queue = DeliveryQueue::open(&queue_dir, None).unwrap();
            for record in &records {
                queue.enqueue(record).unwrap();
            }
            // 取出但不确认，模拟投递中崩溃
            let delivery = queue.try_dequeue().unwrap();
            assert_eq!(delivery.record, records[0]);
        }

        let queue = Arc::new(DeliveryQueue::open(&queue_dir, None).unwrap());
        assert_eq!(queue.len(), 5);
        assert_eq!(queue.metrics().snapshot().recovered, 5);

        let publisher = Arc::new(file_publisher(&out).await);
        let pool = WorkerPool::spawn(Arc::clone(&queue), publisher, pool_config());
        tokio::time::timeout(Duration::from_secs(5), queue.wait_drained())
            .await
            .unwrap();
        pool.shutdown(Duration::from_secs(1)).await;

        assert_same_records(&read_records(&out), &records);

        let reopened = DeliveryQueue::open(&queue_dir, None).unwrap();
        assert!(reopened.is_empty());
    }
}
