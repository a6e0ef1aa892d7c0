//! `luastack ops` - List the operation table.

use luastack::Op;
use strum::IntoEnumIterator;

pub fn execute() -> anyhow::Result<()> {
    for line in listing() {
        println!("{}", line);
    }
    Ok(())
}

/// One line per operation: name and argument count (handle included)
pub fn listing() -> Vec<String> {
    Op::iter()
        .map(|op| format!("{:<16} {}", op.name(), op.arity()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_covers_every_operation() {
        let lines = listing();
        assert_eq!(lines.len(), Op::iter().count());
        assert!(lines[0].starts_with("newstate"));
        assert!(lines.iter().any(|line| line.starts_with("pcall ") && line.ends_with('3')));
    }
}
