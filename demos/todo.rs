//! Todo list driven through scripted host events.
//!
//! Run with `cargo run --example todo`. Set `DIRECT_LOG=1` to stream the
//! runtime's JSON log records to stderr.

use std::rc::Rc;

use direct_mvp::{
    Handler, HostTree, Logger, MarkupRenderer, MemoryTree, NodeId, Result, Runtime,
    RuntimeConfig, RuntimeEvent, Spec, WidgetModel, find_first_by_tag,
};
use serde_json::{Value, json};

fn main() -> Result<()> {
    let mut config = RuntimeConfig::default();
    if std::env::var_os("DIRECT_LOG").is_some() {
        config.logger = Some(Logger::stderr());
    }

    let app = Spec::widget("TodoApp")
        .field("header", "Todo App")
        .field(
            "data",
            json!([
                {"title": "Create repo", "done": true},
                {"title": "Submit code", "done": true},
                {"title": "Add LICENSE", "done": false},
                {"title": "Add README", "done": false},
            ]),
        )
        .into_model();

    let mut runtime = Runtime::with_config(MemoryTree::new(), config);
    register_widgets(&mut runtime, &app);

    let root = runtime.reconcile(
        &Spec::from(&app),
        None,
        Some(Box::new(|host: &dyn HostTree, node: NodeId| {
            let items = find_first_by_tag(host, node, "ol")
                .ok()
                .flatten()
                .and_then(|list| host.children(list).ok())
                .map(|children| children.len())
                .unwrap_or(0);
            println!("mounted with {items} tasks");
        })),
    )?;
    runtime.run_until_idle()?;
    print_tree(&runtime, root, "initial")?;

    let form = find(&runtime, root, "form")?;
    let input = find(&runtime, root, "input")?;
    runtime
        .host_mut()
        .set_property(input, "value", json!("Write tests"))?;
    runtime.run_scripted([RuntimeEvent::dispatch(form, "submit")])?;
    print_tree(&runtime, root, "after submit")?;

    let list = find(&runtime, root, "ol")?;
    let third = runtime.host().children(list)?[2];
    runtime.run_scripted([RuntimeEvent::dispatch(third, "click")])?;
    print_tree(&runtime, root, "after toggling task 3")?;

    let tasks = items(&app.value("data"));
    let done = tasks.iter().filter(|task| is_done(task)).count();
    println!("{done} of {} tasks done", tasks.len());
    Ok(())
}

/// The app model owns the task list; `Form`, `TaskList` and `Task` get
/// copies of it through their model fields and write changes back to it.
fn register_widgets(runtime: &mut Runtime<MemoryTree>, app: &Rc<WidgetModel>) {
    runtime.register_widget("TodoApp", |model| {
        Spec::element("div")
            .attr("class", "Todo")
            .child(Spec::widget("Header").field("content", model.value("header")))
            .child(Spec::widget("Form").field("tasks", model.value("data")))
            .build()
    });

    runtime.register_widget("Header", |model| {
        Spec::element("h1").child(Spec::text(as_text(&model.value("content")))).build()
    });

    let store = Rc::clone(app);
    runtime.register_widget("Form", move |model| {
        let submit = {
            let store = Rc::clone(&store);
            let model = Rc::clone(model);
            Handler::new(move |ctx| {
                ctx.prevent_default();
                let form = ctx.current_target();
                let Ok(Some(input)) = find_first_by_tag(ctx.host(), form, "input") else {
                    return;
                };
                let title = match ctx.host().property(input, "value") {
                    Ok(Value::String(title)) if !title.is_empty() => title,
                    _ => return,
                };
                store.update(|fields| {
                    if let Some(Value::Array(tasks)) = fields.get_mut("data") {
                        tasks.push(json!({"title": title, "done": false}));
                    }
                });
                model.set("tasks", store.value("data"));
                let _ = ctx.host_mut().set_property(input, "value", json!(""));
                ctx.rerender(&model);
            })
        };
        Spec::element("form")
            .on("submit", submit)
            .child(Spec::element("input").attr("placeholder", "Add task"))
            .child(Spec::widget("TaskList").field("tasks", model.value("tasks")))
            .build()
    });

    runtime.register_widget("TaskList", |model| {
        let tasks = items(&model.value("tasks"));
        Spec::element("ol")
            .children(tasks.into_iter().enumerate().map(|(index, task)| {
                Spec::widget("Task").field("index", index).field("data", task)
            }))
            .build()
    });

    let store = Rc::clone(app);
    runtime.register_widget("Task", move |model| {
        let task = model.value("data");
        let click = {
            let store = Rc::clone(&store);
            let model = Rc::clone(model);
            Handler::new(move |ctx| {
                ctx.prevent_default();
                let index = model.value("index").as_u64().unwrap_or(0) as usize;
                let done = !is_done(&model.value("data"));
                model.update(|fields| set_done(fields.get_mut("data"), done));
                store.update(|fields| {
                    set_done(fields.get_mut("data").and_then(|tasks| tasks.get_mut(index)), done)
                });
                ctx.rerender(&model);
            })
        };
        Spec::element("li")
            .attr("class", if is_done(&task) { "done" } else { "" })
            .on("click", click)
            .child(as_text(&task["title"]))
            .build()
    });
}

fn items(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        _ => Vec::new(),
    }
}

fn is_done(task: &Value) -> bool {
    task["done"].as_bool().unwrap_or(false)
}

fn set_done(task: Option<&mut Value>, done: bool) {
    if let Some(Value::Object(task)) = task {
        task.insert("done".to_string(), Value::Bool(done));
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn find(runtime: &Runtime<MemoryTree>, root: NodeId, tag: &str) -> Result<NodeId> {
    find_first_by_tag(runtime.host(), root, tag)?
        .ok_or_else(|| std::io::Error::other(format!("no <{tag}> under {root}")).into())
}

fn print_tree(runtime: &Runtime<MemoryTree>, root: NodeId, label: &str) -> Result<()> {
    let markup = MarkupRenderer::pretty(2).render_to_string(runtime.host(), root)?;
    println!("--- {label} ---\n{markup}");
    Ok(())
}
