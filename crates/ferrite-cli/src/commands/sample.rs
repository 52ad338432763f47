//! `ferrite sample`: write a small generated example image.

use std::path::Path;

use anyhow::{Context, Result};
use ferrite_bytecode::{build_image, PoolEntry, UnitDef};

pub fn run(out: &Path) -> Result<()> {
    let root = UnitDef {
        nlocals: 1,
        nregs: 4,
        instructions: vec![0x51, 0x01, 0x00, 0x2E, 0x01, 0x00, 0x00, 0x69],
        pool: vec![
            PoolEntry::String("Hello, Ferrite!".to_string()),
            PoolEntry::Int32(42),
        ],
        symbols: vec!["puts".to_string()],
        children: vec![UnitDef {
            nlocals: 0,
            nregs: 2,
            instructions: vec![0x69],
            ..UnitDef::default()
        }],
        ..UnitDef::default()
    };

    let image = build_image(&root);
    std::fs::write(out, &image).with_context(|| format!("writing {}", out.display()))?;
    println!("wrote {} ({} bytes)", out.display(), image.len());
    Ok(())
}
