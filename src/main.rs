//! Sentinel demo: watch a headless document for inserted elements.

use std::process::ExitCode;

use sentinel::{Callback, Document, NodeId, Sentinel, SentinelConfig};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => SentinelConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => SentinelConfig::default(),
    };
    println!("── Sentinel ──");
    println!("   dispatch mode: {:?}", config.effective_dispatch_mode());

    let doc = Document::new();
    let sentinel = Sentinel::with_config(doc.clone(), config)?;

    let reporter = doc.downgrade();
    let on_insert = Callback::new(move |el: &NodeId| {
        if let Some(doc) = reporter.upgrade() {
            println!(
                "   inserted <{}> class={:?}",
                doc.tag_name(*el).unwrap_or_default(),
                doc.class_name(*el)
            );
        }
    });
    sentinel.on(&[".card", "li.item"], &on_insert)?;
    println!(
        "   watching 2 selectors, {} rules in #{}",
        sentinel.rule_count(),
        sentinel.config().effective_style_element_id()
    );

    println!("\n── Inserting ──");
    let list = doc.create_element("ul");
    doc.append_child(doc.body(), list)?;
    for class in ["item", "item", "other"] {
        let li = doc.create_element_with("li", &[("class", class)]);
        doc.append_child(list, li)?;
    }
    let card = doc.create_element_with("div", &[("class", "card")]);
    doc.append_child(doc.body(), card)?;
    let fired = doc.update_style();
    println!("   {fired} animationstart events");

    println!("\n── Re-inserting ──");
    doc.remove_child(doc.body(), card)?;
    doc.update_style();
    doc.append_child(doc.body(), card)?;
    doc.update_style();

    sentinel.off(".card", &on_insert)?;
    println!("\n   after off: {} rules", sentinel.rule_count());
    sentinel.reset()?;
    println!("   after reset: initialized = {}", sentinel.is_initialized());
    Ok(())
}
