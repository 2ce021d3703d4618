use std::collections::HashMap;

/// Renders a dialect function call from already-escaped operands.
pub type FunctionRenderer = fn(&[&str]) -> String;

#[derive(Debug, Clone, Copy)]
struct Translation {
    arity: usize,
    render: FunctionRenderer,
}

/// Per-function overrides consulted when a query expression calls a named function.
///
/// Each entry has a fixed arity. A call whose operand is missing or NULL renders the
/// literal `0` instead of an invalid function call.
#[derive(Debug, Clone)]
pub struct FunctionTable {
    entries: HashMap<String, Translation>,
}

impl Default for FunctionTable {
    fn default() -> Self {
        let mut table = Self {
            entries: HashMap::new(),
        };
        table.register("length", 1, |a| format!("LENGTH({})", a[0]));
        table.register("day", 1, |a| format!("DAY_OF_MONTH({})", a[0]));
        table.register("date", 1, |a| format!("CAST({} AS DATE)", a[0]));
        table.register("mod", 2, |a| format!("MOD({},{})", a[0], a[1]));
        table.register("bit", 2, |a| format!("BITAND({},{})", a[0], a[1]));
        table
    }
}

impl FunctionTable {
    /// Add or replace a translation. Names are matched case-insensitively.
    pub fn register(&mut self, name: &str, arity: usize, render: FunctionRenderer) {
        self.entries
            .insert(name.to_ascii_lowercase(), Translation { arity, render });
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    #[must_use]
    pub fn arity(&self, name: &str) -> Option<usize> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|t| t.arity)
    }

    /// Translate a call; `None` operands are NULL/absent.
    ///
    /// Returns `None` if `name` is not registered.
    #[must_use]
    pub fn translate(&self, name: &str, operands: &[Option<String>]) -> Option<String> {
        let translation = self.entries.get(&name.to_ascii_lowercase())?;
        let args: Option<Vec<&str>> = (0..translation.arity)
            .map(|i| operands.get(i).and_then(|o| o.as_deref()))
            .collect();
        Some(match args {
            Some(args) => (translation.render)(&args),
            None => "0".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn builtins() {
        let t = FunctionTable::default();
        assert_eq!(t.translate("length", &[some("\"name\"")]).unwrap(), "LENGTH(\"name\")");
        assert_eq!(t.translate("day", &[some("\"born\"")]).unwrap(), "DAY_OF_MONTH(\"born\")");
        assert_eq!(t.translate("date", &[some("\"born\"")]).unwrap(), "CAST(\"born\" AS DATE)");
        assert_eq!(t.translate("MOD", &[some("\"id\""), some("2")]).unwrap(), "MOD(\"id\",2)");
        assert_eq!(t.translate("bit", &[some("\"flags\""), some("4")]).unwrap(), "BITAND(\"flags\",4)");
    }

    #[test]
    fn missing_operands_render_zero() {
        let t = FunctionTable::default();
        assert_eq!(t.translate("mod", &[some("\"id\""), None]).unwrap(), "0");
        assert_eq!(t.translate("bit", &[some("\"flags\"")]).unwrap(), "0");
        assert_eq!(t.translate("length", &[]).unwrap(), "0");
    }

    #[test]
    fn extensible() {
        let mut t = FunctionTable::default();
        assert!(t.translate("year", &[some("\"d\"")]).is_none());
        t.register("year", 1, |a| format!("YEAR({})", a[0]));
        assert_eq!(t.translate("Year", &[some("\"d\"")]).unwrap(), "YEAR(\"d\")");
        assert_eq!(t.arity("year"), Some(1));
    }
}
