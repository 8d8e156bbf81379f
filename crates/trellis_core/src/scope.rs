//! Scoped evaluation state carried through elaboration.
//!
//! [`ParamStack`] is the lexically scoped environment of `(name, f64)`
//! bindings under which embedded expressions evaluate; [`NameStack`] is the
//! dotted path qualifying local names into unique graph identifiers. Both
//! grow and shrink strictly in sync with the recursive descent.

use std::collections::HashSet;

use crate::def::RawParam;
use crate::error::Error;

/// The parameter environment. Pushes append at the tail; the most recent
/// binding for a name wins during evaluation.
#[derive(Debug, Default)]
pub struct ParamStack {
    params: Vec<(String, f64)>,
}

impl ParamStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate `raw.value` against the current stack and push the result,
    /// so later entries may reference earlier ones.
    pub fn enter(&mut self, raw: &RawParam) -> Result<(), Error> {
        let value = self.eval(&raw.value)?;
        self.params.push((raw.name.clone(), value));
        Ok(())
    }

    /// Push a literal binding without evaluation (loop and index variables).
    pub fn enter_literal(&mut self, name: &str, value: i64) {
        self.params.push((name.to_string(), value as f64));
    }

    /// Pop the most recent binding.
    pub fn leave(&mut self) {
        self.params.pop();
    }

    /// Flat snapshot of the stack, tail-first so that shadowed names resolve
    /// to their most recent binding.
    fn context(&self) -> meval::Context<'_> {
        let mut ctx = meval::Context::new();
        let mut seen = HashSet::new();
        for (name, value) in self.params.iter().rev() {
            if seen.insert(name.as_str()) {
                ctx.var(name.clone(), *value);
            }
        }
        ctx
    }

    /// Compile `expr` against the current bindings and evaluate it.
    pub fn eval(&self, expr: &str) -> Result<f64, Error> {
        let compiled: meval::Expr = expr.parse().map_err(|e| Error::eval(expr, e))?;
        compiled
            .eval_with_context(self.context())
            .map_err(|e| Error::eval(expr, e))
    }

    /// Evaluate `expr` and round to the nearest integer.
    pub fn eval_int(&self, expr: &str) -> Result<i64, Error> {
        Ok(self.eval(expr)?.round() as i64)
    }

    /// Substitute every `[expr]` group in `pattern` with `[<int>]`, leaving
    /// the rest verbatim. Idempotent on patterns without brackets.
    pub fn eval_name(&self, pattern: &str) -> Result<String, Error> {
        let mut out = String::with_capacity(pattern.len());
        let mut rest = pattern;
        while let Some(open) = rest.find('[') {
            let Some(close) = rest[open + 1..].find(']') else {
                return Err(Error::eval(pattern, "unbalanced `[`"));
            };
            let close = open + 1 + close;
            let index = self.eval_int(&rest[open + 1..close])?;
            out.push_str(&rest[..=open]);
            out.push_str(&index.to_string());
            out.push(']');
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// The hierarchical scope path. A segment is either `name` or `name[i]`;
/// the full path joins the non-empty segments with `.`.
#[derive(Debug)]
pub struct NameStack {
    segments: Vec<String>,
}

impl NameStack {
    pub fn new(root: &str) -> Self {
        Self {
            segments: vec![root.to_string()],
        }
    }

    /// Push a segment, indexed when `index` is given.
    pub fn enter(&mut self, name: &str, index: Option<i64>) {
        match index {
            Some(i) => self.segments.push(format!("{name}[{i}]")),
            None => self.segments.push(name.to_string()),
        }
    }

    /// Pop the last segment.
    pub fn leave(&mut self) {
        self.segments.pop();
    }

    /// The current full path.
    pub fn full(&self) -> String {
        let mut out = String::new();
        for segment in self.segments.iter().filter(|s| !s.is_empty()) {
            if !out.is_empty() {
                out.push('.');
            }
            out.push_str(segment);
        }
        out
    }

    /// Qualify a local name against the current path.
    pub fn qualify(&self, local: &str, index: Option<i64>) -> String {
        let full = self.full();
        let local = match index {
            Some(i) => format!("{local}[{i}]"),
            None => local.to_string(),
        };
        if full.is_empty() {
            local
        } else {
            format!("{full}.{local}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, value: &str) -> RawParam {
        RawParam {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn most_recent_binding_wins() {
        let mut p = ParamStack::new();
        p.enter(&raw("n", "1")).unwrap();
        p.enter(&raw("n", "2")).unwrap();
        assert_eq!(p.eval("n").unwrap(), 2.0);
        p.leave();
        assert_eq!(p.eval("n").unwrap(), 1.0);
    }

    #[test]
    fn entries_may_reference_earlier_ones() {
        let mut p = ParamStack::new();
        p.enter(&raw("n", "4")).unwrap();
        p.enter(&raw("m", "n * 2 + 1")).unwrap();
        assert_eq!(p.eval("m").unwrap(), 9.0);
    }

    #[test]
    fn literal_bindings_and_arithmetic() {
        let mut p = ParamStack::new();
        p.enter_literal("i", 3);
        assert_eq!(p.eval_int("(i + 1) % 4").unwrap(), 0);
        assert_eq!(p.eval("2^i").unwrap(), 8.0);
    }

    #[test]
    fn eval_rejects_garbage() {
        let p = ParamStack::new();
        assert!(matches!(p.eval("1 +"), Err(Error::Eval { .. })));
        assert!(matches!(p.eval("undefined_var"), Err(Error::Eval { .. })));
    }

    #[test]
    fn eval_name_substitutes_brackets() {
        let mut p = ParamStack::new();
        p.enter_literal("i", 1);
        assert_eq!(
            p.eval_name("n[i].g[(i+1)%4]").unwrap(),
            "n[1].g[2]".to_string()
        );
    }

    #[test]
    fn eval_name_is_idempotent_without_brackets() {
        let p = ParamStack::new();
        assert_eq!(p.eval_name("a.b.c").unwrap(), "a.b.c");
    }

    #[test]
    fn eval_name_rejects_unbalanced_brackets() {
        let p = ParamStack::new();
        assert!(matches!(p.eval_name("n[1"), Err(Error::Eval { .. })));
    }

    #[test]
    fn name_stack_paths() {
        let mut s = NameStack::new("network");
        s.enter("router", None);
        s.enter("port", Some(2));
        assert_eq!(s.full(), "network.router.port[2]");
        assert_eq!(s.qualify("g", Some(0)), "network.router.port[2].g[0]");
        s.leave();
        assert_eq!(s.qualify("g", None), "network.router.g");
        s.leave();
        assert_eq!(s.full(), "network");
    }

    #[test]
    fn empty_segments_are_skipped() {
        let mut s = NameStack::new("");
        assert_eq!(s.full(), "");
        s.enter("a", None);
        assert_eq!(s.full(), "a");
        assert_eq!(s.qualify("g", None), "a.g");
    }
}
