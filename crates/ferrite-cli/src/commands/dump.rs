//! `ferrite dump`: load an image and emit the decoded tree as JSON.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use ferrite_bytecode::{ExecutableUnit, Program};
use serde_json::{json, Value};

pub fn run(file: &Path, pretty: bool) -> Result<()> {
    let image = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let program =
        Program::load(&image).with_context(|| format!("loading {}", file.display()))?;

    let document = json!({
        "image": file.display().to_string(),
        "size": image.len(),
        "root": unit_json(&program.root),
    });

    let rendered = if pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };
    println!("{rendered}");
    Ok(())
}

fn unit_json(unit: &ExecutableUnit<'_>) -> Value {
    let handlers: Vec<Value> = unit
        .catch_handlers()
        .map(|handler| {
            json!({
                "kind": handler.kind,
                "begin": handler.begin,
                "end": handler.end,
                "target": handler.target,
            })
        })
        .collect();

    let symbols: Vec<String> = unit
        .symbols()
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect();

    let children: Vec<Value> = unit.children.iter().map(unit_json).collect();

    json!({
        "locals": unit.nlocals,
        "registers": unit.nregs,
        "instructions": hex(unit.instructions()),
        "handlers": handlers,
        "pool": unit.pool,
        "symbols": symbols,
        "children": children,
    })
}

fn hex(bytes: &[u8]) -> String {
    let mut rendered = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(rendered, "{byte:02x}");
    }
    rendered
}
