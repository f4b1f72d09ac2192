use std::rc::Rc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use direct_mvp::logging::{LogEvent, LogSink};
use direct_mvp::{
    CollectingErrorSink, Logger, LoggingResult, MemoryTree, Runtime, RuntimeConfig, Spec,
    WidgetModel,
};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _event: &LogEvent) -> LoggingResult<()> {
        Ok(())
    }
}

const SIZES: &[usize] = &[8, 32, 64];

fn table_rerender(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_rerender");
    for &size in SIZES {
        group.bench_with_input(BenchmarkId::new("fresh_data", size), &size, |b, &size| {
            let mut runtime = build_runtime();
            let first = table_model(size, 0);
            let node = runtime
                .render_widget(&first)
                .expect("initial render");
            let mut seed = 1;
            b.iter(|| {
                let model = table_model(size, seed);
                seed += 1;
                runtime
                    .reconcile(&Spec::from(black_box(&model)), Some(node), None)
                    .expect("re-render");
            });
        });

        group.bench_with_input(BenchmarkId::new("unchanged", size), &size, |b, &size| {
            let mut runtime = build_runtime();
            let model = table_model(size, 7);
            runtime.render_widget(&model).expect("initial render");
            b.iter(|| {
                runtime
                    .render_widget(black_box(&model))
                    .expect("re-render");
            });
        });
    }
    group.finish();
}

fn table_mount(c: &mut Criterion) {
    c.bench_function("table_mount_32", |b| {
        let model = table_model(32, 3);
        b.iter(|| {
            let mut runtime = build_runtime();
            runtime
                .reconcile(&Spec::from(black_box(&model)), None, None)
                .expect("mount");
        });
    });
}

fn build_runtime() -> Runtime<MemoryTree> {
    let config = RuntimeConfig {
        logger: Some(Logger::new(NullSink)),
        metrics_interval: Duration::from_millis(250),
        error_sink: Some(Rc::new(CollectingErrorSink::new())),
        ..RuntimeConfig::default()
    };
    let mut runtime = Runtime::with_config(MemoryTree::new(), config);
    runtime.register_widget("Table", |model| {
        let rows = match model.value("data") {
            Value::Array(rows) => rows,
            _ => Vec::new(),
        };
        Spec::element("table")
            .child(
                Spec::element("tbody").children(
                    rows.into_iter()
                        .map(|row| Spec::widget("TableRow").field("data", row)),
                ),
            )
            .build()
    });
    runtime.register_widget("TableRow", |model| {
        let cells = match model.value("data") {
            Value::Array(cells) => cells,
            _ => Vec::new(),
        };
        Spec::element("tr")
            .children(
                cells
                    .iter()
                    .map(|cell| Spec::element("td").child(cell.to_string())),
            )
            .build()
    });
    runtime
}

fn table_model(size: usize, seed: u64) -> Rc<WidgetModel> {
    let data: Vec<Value> = (0..size)
        .map(|row| {
            let cells: Vec<u64> = (0..size)
                .map(|col| (seed.wrapping_mul(31) + (row * size + col) as u64) % 10)
                .collect();
            json!(cells)
        })
        .collect();
    Spec::widget("Table").field("data", data).into_model()
}

criterion_group!(benches, table_rerender, table_mount);
criterion_main!(benches);
