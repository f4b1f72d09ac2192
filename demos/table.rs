//! Static markup plus a table widget re-rendered with random data.
//!
//! Run with `cargo run --example table`. Each update reconciles a fresh
//! model into the same table node and reports how long the pass took once
//! layout has been flushed.

use std::time::Instant;

use direct_mvp::{
    HostTree, MarkupRenderer, MemoryTree, NodeId, Result, Runtime, RuntimeConfig, Spec, WidgetModel,
};
use serde_json::{Value, json};

const UPDATES: usize = 10;

/// Small linear congruential generator; good enough for demo data.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

fn main() -> Result<()> {
    let mut config = RuntimeConfig::default();
    config.enable_metrics();
    let mut runtime = Runtime::with_config(MemoryTree::new(), config);
    runtime.register_widget("Table", |model| {
        let row_specs = rows(&model.value("data"))
            .into_iter()
            .map(|row| Spec::widget("TableRow").field("data", row));
        Spec::element("table")
            .child(Spec::element("tbody").children(row_specs))
            .build()
    });
    runtime.register_widget("TableRow", |model| {
        let cells = rows(&model.value("data"))
            .into_iter()
            .map(|cell| Spec::element("td").child(cell.to_string()));
        Spec::element("tr").children(cells).build()
    });

    let intro = runtime.reconcile(&static_content(), None, None)?;
    println!("{}", MarkupRenderer::pretty(2).render_to_string(runtime.host(), intro)?);

    let mut rng = Lcg(0x5eed);
    let mut table: Option<NodeId> = None;
    for update in 0..UPDATES {
        let size = 2 + rng.below(6) as usize;
        let model = random_table(&mut rng, size);
        let started = Instant::now();
        let node = runtime.reconcile(
            &Spec::from(&model),
            table,
            Some(Box::new(move |host: &dyn HostTree, node: NodeId| {
                let rows = host.children(node).ok().and_then(|body| {
                    body.first().and_then(|tbody| host.children(*tbody).ok())
                });
                println!(
                    "update {update}: {} rows rendered in {:?}",
                    rows.map(|rows| rows.len()).unwrap_or(0),
                    started.elapsed()
                );
            })),
        )?;
        runtime.run_until_idle()?;
        table = Some(node);
    }

    if let Some(node) = table {
        println!("{}", MarkupRenderer::pretty(2).render_to_string(runtime.host(), node)?);
    }
    if let Some(snapshot) = runtime.metrics_snapshot() {
        println!("{:?}", snapshot.totals);
    }
    Ok(())
}

fn static_content() -> Spec {
    Spec::element("div")
        .attr("class", "static")
        .child(
            Spec::element("p")
                .child("This div contains example of static content with ")
                .child(
                    Spec::element("span")
                        .attr("style", "font-family:monospace")
                        .child("nested"),
                )
                .child(" elements.")
                .child(Spec::element("br"))
                .child("Table below updates on every pass."),
        )
        .build()
}

fn random_table(rng: &mut Lcg, size: usize) -> std::rc::Rc<WidgetModel> {
    let matrix: Vec<Value> = (0..size)
        .map(|_| json!((0..size).map(|_| rng.below(10)).collect::<Vec<_>>()))
        .collect();
    Spec::widget("Table").field("data", matrix).into_model()
}

fn rows(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}
