//! `ferrite inspect`: load an image and print a tree summary.

use std::path::Path;

use anyhow::{Context, Result};
use ferrite_bytecode::{ExecutableUnit, Literal};
use ferrite_vm::Vm;

use crate::output::{resolve_color_choice, StyledOutput};

pub fn run(file: &Path, color: Option<&str>) -> Result<()> {
    let image = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;

    let mut vm = Vm::new();
    vm.load(&image)
        .with_context(|| format!("loading {}", file.display()))?;

    let mut out = StyledOutput::new(resolve_color_choice(color));
    out.label("image");
    out.writeln(&format!(
        " {} ({} bytes, fingerprint {:#010x})",
        file.display(),
        image.len(),
        vm.fingerprint().unwrap_or(0),
    ));

    if let Some(root) = vm.root() {
        print_unit(&mut out, root, 0);
    }
    Ok(())
}

fn print_unit(out: &mut StyledOutput, unit: &ExecutableUnit<'_>, depth: usize) {
    let indent = "  ".repeat(depth);

    out.write(&indent);
    out.label("unit");
    out.writeln(&format!(
        " locals={} regs={} code={}B handlers={} pool={} syms={} children={}",
        unit.nlocals,
        unit.nregs,
        unit.ilen,
        unit.nhandlers,
        unit.pool.len(),
        unit.symbol_count(),
        unit.children.len(),
    ));

    for (index, literal) in unit.pool.iter().enumerate() {
        out.write(&indent);
        out.dim(&format!("  pool[{index}] = {}", preview(literal)));
        out.writeln("");
    }

    let names: Vec<String> = unit
        .symbols()
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect();
    if !names.is_empty() {
        out.write(&indent);
        out.dim(&format!("  syms: {}", names.join(", ")));
        out.writeln("");
    }

    for child in &unit.children {
        print_unit(out, child, depth + 1);
    }
}

fn preview(literal: &Literal) -> String {
    if let Some(text) = literal.as_str() {
        format!("{text:?}")
    } else if let Some(value) = literal.as_int() {
        value.to_string()
    } else if let Some(value) = literal.as_float() {
        value.to_string()
    } else {
        "<opaque>".to_string()
    }
}
