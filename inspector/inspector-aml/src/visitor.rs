//! Passes over the parsed tree that refine the namespace.

use std::collections::BTreeSet;

use log::{debug, info};

use crate::context::Context;
use crate::interpreter::Interpreter;
use crate::namespace::NodeId;
use crate::tree::{Term, Tree, TreeId};

/// A pre-order pass over the top-level terms of every loaded table.
pub trait Visitor {
    /// Called once per term. Returning `false` skips the term's children.
    fn visit(&mut self, interpreter: &mut Interpreter<'_>, id: TreeId, term: &Term) -> bool;
}

/// Runs `visitor` over every table in load order.
pub fn walk(ctx: &mut Context, visitor: &mut impl Visitor) {
    let roots: Vec<TreeId> = ctx
        .tables()
        .into_iter()
        .flat_map(|t| ctx.roots(t).iter().copied())
        .collect();
    let mut interpreter = ctx.interpreter();
    let tree = interpreter.tree();
    let mut stack: Vec<TreeId> = roots.into_iter().rev().collect();
    while let Some(id) = stack.pop() {
        let term = tree.term(id);
        if visitor.visit(&mut interpreter, id, term) {
            stack.extend(term.children().into_iter().rev());
        }
    }
}

/// Removes objects that cannot be present on this platform:
///
/// * devices whose `_STA` evaluates to exactly 0;
/// * objects defined only in the branch of an `If` whose predicate is a
///   constant that selects the other branch.
///
/// Anything that does not evaluate statically is kept.
#[derive(Debug, Default)]
pub struct ConditionallyUnregister {
    removed: Vec<String>,
}

impl ConditionallyUnregister {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of the objects removed so far.
    #[must_use]
    pub fn removed(&self) -> &[String] {
        &self.removed
    }

    /// Runs the pass over `ctx` and returns the removed paths.
    pub fn run(ctx: &mut Context) -> Vec<String> {
        let mut pass = Self::new();
        walk(ctx, &mut pass);
        info!("{} objects are statically absent", pass.removed.len());
        pass.removed
    }

    fn unregister(&mut self, interpreter: &mut Interpreter<'_>, node: NodeId, why: &str) {
        let path = interpreter.namespace().path(node);
        debug!("unregistering {path}: {why}");
        interpreter.namespace_mut().unregister(node);
        self.removed.push(path);
    }

    fn device(&mut self, interpreter: &mut Interpreter<'_>, node: NodeId) -> bool {
        match interpreter.evaluate_child(node, "_STA") {
            Some(Ok(v)) if v.as_integer() == Some(0) => {
                self.unregister(interpreter, node, "_STA is 0");
                false
            }
            Some(Err(e)) => {
                debug!("{}._STA is unknown: {e}", interpreter.namespace().path(node));
                true
            }
            _ => true,
        }
    }

    /// Removes what only the branch not taken defines.
    fn branch(&mut self, interpreter: &mut Interpreter<'_>, taken: &[TreeId], skipped: &[TreeId]) {
        let tree = interpreter.tree();
        let kept: BTreeSet<NodeId> = definitions(tree, taken).into_iter().map(|(node, _)| node).collect();
        for (node, def) in definitions(tree, skipped) {
            let ns = interpreter.namespace();
            let current = ns.get(node).and_then(|n| n.definition);
            if current == Some(def) && !kept.contains(&node) && ns.is_live(node) {
                self.unregister(interpreter, node, "defined in a branch that is never taken");
            }
        }
    }
}

impl Visitor for ConditionallyUnregister {
    fn visit(&mut self, interpreter: &mut Interpreter<'_>, _id: TreeId, term: &Term) -> bool {
        match term {
            Term::Device { node, .. } => interpreter.namespace().is_live(*node) && self.device(interpreter, *node),
            Term::If {
                predicate,
                then,
                otherwise,
            } => {
                let tree = interpreter.tree();
                let other: &[TreeId] = match otherwise.map(|e| tree.term(e)) {
                    Some(Term::Else { body }) => body,
                    _ => &[],
                };
                match interpreter.evaluate_term(*predicate).and_then(|v| v.to_integer()) {
                    Ok(0) => self.branch(interpreter, other, then),
                    Ok(_) => self.branch(interpreter, then, other),
                    Err(e) => debug!("predicate {predicate} is unknown: {e}"),
                }
                true
            }
            Term::Method { .. } => false,
            _ => true,
        }
    }
}

/// Namespace objects defined below `roots`, with the defining term.
fn definitions(tree: &Tree, roots: &[TreeId]) -> Vec<(NodeId, TreeId)> {
    let mut found = Vec::new();
    tree.walk(roots, &mut |id, n| {
        if let Some(node) = n.term.defines() {
            found.push((node, id));
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::test_util::definition_block;

    fn load(body: &[u8]) -> Context {
        let mut ctx = Context::new();
        ctx.load_table("DSDT", &definition_block(b"DSDT", body)).unwrap();
        ctx.expand_deferred();
        ctx
    }

    /// `Device (<name>) {}`
    fn device(name: &[u8; 4]) -> Vec<u8> {
        let mut out = vec![0x5B, 0x82, 0x05];
        out.extend_from_slice(name);
        out
    }

    #[test]
    fn branch_not_taken_is_unregistered() {
        // If (Zero) { Device (DEVA) {} } Else { Device (DEVB) {} }
        let mut body = vec![0xA0, 0x09, 0x00];
        body.extend(device(b"DEVA"));
        body.extend([0xA1, 0x08]);
        body.extend(device(b"DEVB"));
        let mut ctx = load(&body);

        assert_eq!(ConditionallyUnregister::run(&mut ctx), vec!["\\DEVA".to_owned()]);
        assert!(ctx.namespace().lookup_path("\\DEVA").is_none());
        assert!(ctx.namespace().lookup_path("\\DEVB").is_some());
    }

    #[test]
    fn unknown_predicate_keeps_both_branches() {
        // OperationRegion (GNVS, SystemMemory, 0x1000, 0x10)
        // Field (GNVS, AnyAcc, NoLock, Preserve) { FLD1, 8 }
        // If (FLD1) { Device (DEVC) {} }
        let mut body = vec![
            0x5B, 0x80, b'G', b'N', b'V', b'S', 0x00, 0x0B, 0x00, 0x10, 0x0A, 0x10, //
            0x5B, 0x81, 0x0B, b'G', b'N', b'V', b'S', 0x00, b'F', b'L', b'D', b'1', 0x08, //
            0xA0, 0x0C, b'F', b'L', b'D', b'1',
        ];
        body.extend(device(b"DEVC"));
        let mut ctx = load(&body);

        assert!(ConditionallyUnregister::run(&mut ctx).is_empty());
        assert!(ctx.namespace().lookup_path("\\DEVC").is_some());
    }

    #[test]
    fn name_defined_in_both_branches_is_kept() {
        // If (One) { Name (BOTH, 1) } Else { Name (BOTH, 2) }
        let body = [
            0xA0, 0x08, 0x01, 0x08, b'B', b'O', b'T', b'H', 0x01, //
            0xA1, 0x08, 0x08, b'B', b'O', b'T', b'H', 0x0A, 0x02,
        ];
        let mut ctx = load(&body);

        assert!(ConditionallyUnregister::run(&mut ctx).is_empty());
        assert!(ctx.namespace().lookup_path("\\BOTH").is_some());
    }
}
