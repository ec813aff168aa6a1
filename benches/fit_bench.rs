//! Benchmarks for the model fit and the full training flow

use arthya::config::{FeatureConfig, PipelineConfig, StoreConfig};
use arthya::data::{extract_features, DailyRecord};
use arthya::encode::FeaturePipeline;
use arthya::model::{ForecastModel, ModelConfig};
use arthya::pipeline::Pipeline;
use arthya::tracking::NoopTracker;
use arthya::{MuSigma, UserId};
use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

fn records(days: usize) -> Vec<DailyRecord> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    (0..days)
        .map(|i| DailyRecord {
            date: start + Duration::days(i as i64),
            category: ["ride", "delivery", "tutoring"][i % 3].to_string(),
            daily_income: 900.0 + 3.0 * i as f64 + ((i % 7) as f64 - 3.0) * 40.0,
            daily_expenses: 200.0 + (i % 5) as f64 * 10.0,
            hours_worked: Some(4.0 + (i % 6) as f64),
            gas_price: Some(95.0 + (i % 11) as f64),
            is_holiday: i % 45 == 0,
            job_type: None,
        })
        .collect()
}

/// Benchmark the MAP fit alone at growing history lengths
fn bench_model_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("ForecastModel::fit");
    group.sample_size(10);

    let mut config = ModelConfig::default();
    config.optimizer.max_iters = 500;

    for days in [90usize, 365, 800] {
        let frame = extract_features(&records(days), &FeatureConfig::default()).unwrap();
        let ms = MuSigma::fit(frame.income()).unwrap();
        let y = ms.transform_all(frame.income());
        let encoding = FeaturePipeline::default().fit(&frame).unwrap();
        let features = encoding.transform(&frame).unwrap();

        group.throughput(Throughput::Elements(days as u64));
        group.bench_with_input(BenchmarkId::new("days", days), &days, |b, _| {
            b.iter(|| {
                let model =
                    ForecastModel::fit(frame.dates(), &y, &features, &config, None).unwrap();
                black_box(model)
            });
        });
    }
    group.finish();
}

/// Benchmark train_records end to end, including persistence
fn bench_train_records(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let mut config = PipelineConfig::default();
    config.store = StoreConfig {
        root: dir.path().to_path_buf(),
        ..StoreConfig::default()
    };
    config.model.optimizer.max_iters = 500;
    let pipeline = Pipeline::new(config, NoopTracker).unwrap();
    let recs = records(365);

    let mut group = c.benchmark_group("Pipeline");
    group.sample_size(10);
    group.bench_function("train_records_365", |b| {
        b.iter(|| black_box(pipeline.train_records(UserId::new(1), &recs).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, bench_model_fit, bench_train_records);
criterion_main!(benches);
