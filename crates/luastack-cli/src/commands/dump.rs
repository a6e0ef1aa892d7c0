//! `luastack dump` - Compile a script to a bytecode file.

use super::path_bytes;
use anyhow::Context;
use luastack::{Bridge, BridgeConfig};
use std::path::Path;

pub fn execute(config: BridgeConfig, file: &Path, output: &Path, strip: bool) -> anyhow::Result<()> {
    let bytecode = compile(config, file, strip)?;
    std::fs::write(output, &bytecode)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {} bytes to {}", bytecode.len(), output.display());
    Ok(())
}

/// Load `file` without running it and return its bytecode
pub fn compile(config: BridgeConfig, file: &Path, strip: bool) -> anyhow::Result<Vec<u8>> {
    let path = path_bytes(file)?;
    tracing::debug!(file = %file.display(), strip, "Compiling script");
    let bridge = Bridge::new(config);
    let id = bridge.create()?;

    let bytecode = bridge.with_vm(id, |vm| {
        vm.loadfile(path)?;
        vm.dump(strip)
    });
    bridge.close(id)?;
    Ok(bytecode?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::run::run_file;
    use std::io::Write;

    #[test]
    fn test_dump_then_run() {
        let mut source = tempfile::NamedTempFile::new().unwrap();
        writeln!(source, "local x = 20").unwrap();
        writeln!(source, "return x + 22").unwrap();

        let out = tempfile::NamedTempFile::new().unwrap();
        execute(BridgeConfig::default(), source.path(), out.path(), true).unwrap();

        let bytecode = std::fs::read(out.path()).unwrap();
        assert!(bytecode.starts_with(b"\x1bLua"));

        let lines = run_file(BridgeConfig::default(), out.path()).unwrap();
        assert_eq!(lines, vec!["42"]);
    }

    #[test]
    fn test_dump_rejects_invalid_source() {
        let mut source = tempfile::NamedTempFile::new().unwrap();
        writeln!(source, "return return").unwrap();
        assert!(compile(BridgeConfig::default(), source.path(), false).is_err());
    }
}
