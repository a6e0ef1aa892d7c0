//! `luastack run` - Load a script, call it, print what it returns.

use super::path_bytes;
use luastack::{Bridge, BridgeConfig, LuaType, LuaVm, TypeCheck};
use std::path::Path;

pub fn execute(config: BridgeConfig, file: &Path) -> anyhow::Result<()> {
    for line in run_file(config, file)? {
        println!("{}", line);
    }
    Ok(())
}

/// Run `file` in a fresh VM and render each returned value
pub fn run_file(config: BridgeConfig, file: &Path) -> anyhow::Result<Vec<String>> {
    let path = path_bytes(file)?;
    tracing::debug!(file = %file.display(), "Running script");
    let bridge = Bridge::new(config);
    let id = bridge.create()?;

    let rendered = bridge.with_vm(id, |vm| {
        vm.loadfile(path)?;
        vm.pcall(0, -1)?;
        Ok((1..=vm.gettop()).map(|idx| render(vm, idx)).collect::<Vec<_>>())
    });
    bridge.close(id)?;
    Ok(rendered?)
}

fn render(vm: &LuaVm, idx: i32) -> String {
    let ty = vm.type_of(idx);
    match ty {
        LuaType::Nil => "nil".to_string(),
        LuaType::Boolean => vm.to_boolean(idx).to_string(),
        LuaType::Number if vm.is(idx, TypeCheck::Integer) => vm
            .to_integer(idx)
            .map(|i| i.to_string())
            .unwrap_or_else(|_| ty.name().to_string()),
        LuaType::Number => vm
            .to_number(idx)
            .map(|n| n.to_string())
            .unwrap_or_else(|_| ty.name().to_string()),
        LuaType::String => vm
            .to_string(idx)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default(),
        other => other.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn script(source: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", source).unwrap();
        file
    }

    #[test]
    fn test_run_renders_results() {
        let file = script("return 1 + 2, 'three', 4.5, true, nil, {}");
        let lines = run_file(BridgeConfig::default(), file.path()).unwrap();
        assert_eq!(lines, vec!["3", "three", "4.5", "true", "nil", "table"]);
    }

    #[test]
    fn test_run_reports_script_errors() {
        let file = script("error('script failed')");
        let err = run_file(BridgeConfig::default(), file.path()).unwrap_err();
        assert!(err.to_string().contains("script failed"));
    }

    #[test]
    fn test_run_with_bare_config() {
        let file = script("return print, host, 1");
        let lines = run_file(BridgeConfig::bare(), file.path()).unwrap();
        assert_eq!(lines, vec!["nil", "nil", "1"]);
    }
}
