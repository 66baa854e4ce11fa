//! Loading of definition blocks into one namespace.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::AmlError;
use crate::interpreter::Interpreter;
use crate::namespace::{Namespace, NodeId};
use crate::parser::Parser;
use crate::stream::AmlStream;
use crate::tree::{Term, Tree, TreeId};

/// Everything parsed during one inspection run.
///
/// Tables are loaded in order, the DSDT first. Once all of them are in,
/// [`Context::expand_deferred`] parses the packages that referred to names
/// defined later.
#[derive(Debug, Clone, Default)]
pub struct Context {
    stream: AmlStream,
    namespace: Namespace,
    tree: Tree,
    roots: BTreeMap<String, Vec<TreeId>>,
    deferred: Vec<TreeId>,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn parser(&mut self, scope: NodeId, tolerant: bool) -> Parser<'_> {
        Parser {
            stream: &mut self.stream,
            namespace: &mut self.namespace,
            tree: &mut self.tree,
            deferred: &mut self.deferred,
            scope,
            tolerant,
        }
    }

    /// Parses the definition block `bytes` and stores it under `name`.
    ///
    /// # Errors
    /// A hard decode error at the top level of the table. The stream context
    /// is logged before the error is returned.
    pub fn load_table(&mut self, name: &str, bytes: &[u8]) -> Result<(), AmlError> {
        self.stream.add_table(name, bytes)?;
        self.stream.switch_stream(name)?;
        let root = self.namespace.root();
        let result = self.parser(root, false).definition_block();
        match result {
            Ok(terms) => {
                info!(
                    "loaded {name}: {} top-level terms, {} deferred packages so far",
                    terms.len(),
                    self.deferred.len()
                );
                self.roots.insert(name.to_owned(), terms);
                Ok(())
            }
            Err(e) => {
                self.stream.dump_context();
                Err(e)
            }
        }
    }

    /// Loads tables in order and expands deferred packages afterwards.
    ///
    /// # Errors
    /// The first table that fails to load.
    pub fn load_tables<'a>(&mut self, tables: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Result<usize, AmlError> {
        for (name, bytes) in tables {
            self.load_table(name, bytes)?;
        }
        Ok(self.expand_deferred())
    }

    /// Parses deferred packages again now that more names are known.
    ///
    /// Strict passes repeat while at least one package succeeds. A final
    /// tolerant pass then tags the names that are still undefined. Returns
    /// the number of packages left deferred.
    pub fn expand_deferred(&mut self) -> usize {
        loop {
            let before = self.deferred.len();
            let progress = self.expand_pass(false);
            debug!("deferred pass: {progress} of {before} packages expanded");
            if progress == 0 {
                break;
            }
        }
        if !self.deferred.is_empty() {
            let progress = self.expand_pass(true);
            debug!("tolerant pass: {progress} packages expanded");
        }
        for &slot in &self.deferred {
            if let Term::Deferred(d) = self.tree.term(slot) {
                debug!(
                    "package at {}:{:#x} stays unparsed",
                    self.stream.table_names().get(d.table).copied().unwrap_or("?"),
                    d.start
                );
            }
        }
        self.deferred.len()
    }

    /// One sweep over the deferred list; returns how many packages parsed.
    fn expand_pass(&mut self, tolerant: bool) -> usize {
        let pending = core::mem::take(&mut self.deferred);
        let mut progress = 0;
        for slot in pending {
            let Term::Deferred(d) = self.tree.term(slot).clone() else {
                continue;
            };
            if let Err(e) = self.stream.select(d.table, d.start, d.end) {
                debug!("cannot revisit deferred package: {e}");
                self.deferred.push(slot);
                continue;
            }
            let result = self
                .parser(d.scope, tolerant)
                .expand_package(d.opcode, slot, d.start, d.end, d.attached);
            match result {
                Ok(()) if !matches!(self.tree.term(slot), Term::Deferred(_)) => progress += 1,
                Ok(()) => {}
                Err(e) => {
                    debug!("deferred package failed hard: {e}");
                    self.deferred.push(slot);
                }
            }
        }
        progress
    }

    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub const fn namespace_mut(&mut self) -> &mut Namespace {
        &mut self.namespace
    }

    #[must_use]
    pub const fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Top-level terms of a loaded table.
    #[must_use]
    pub fn roots(&self, table: &str) -> &[TreeId] {
        self.roots.get(table).map_or(&[], Vec::as_slice)
    }

    /// Names of the loaded tables in load order.
    #[must_use]
    pub fn tables(&self) -> Vec<&str> {
        self.stream.table_names()
    }

    /// Packages that are still unparsed.
    #[must_use]
    pub fn deferred(&self) -> &[TreeId] {
        &self.deferred
    }

    /// An interpreter over the loaded namespace.
    pub fn interpreter(&mut self) -> Interpreter<'_> {
        Interpreter::new(&self.tree, &mut self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::test_util::definition_block;

    #[test]
    fn top_level_garbage_is_a_hard_error() {
        let mut ctx = Context::new();
        let err = ctx.load_table("DSDT", &definition_block(b"DSDT", &[0x5B, 0xFF])).unwrap_err();
        assert!(matches!(err, AmlError::Decode { offset: 0x24, .. }));
    }

    #[test]
    fn same_table_twice_is_rejected() {
        let mut ctx = Context::new();
        let t = definition_block(b"DSDT", &[]);
        ctx.load_table("DSDT", &t).unwrap();
        assert!(ctx.load_table("DSDT", &t).is_err());
    }

    #[test]
    fn forward_reference_inside_scope_is_deferred_then_resolved() {
        // Scope (\_SB) { Name (A, B) }  then later  Name (\B, 5)
        let body = [
            0x10, 0x0F, b'\\', b'_', b'S', b'B', b'_', //
            0x08, b'A', b'_', b'_', b'_', b'B', b'_', b'_', b'_', //
            0x08, b'\\', b'B', b'_', b'_', b'_', 0x0A, 0x05,
        ];
        let mut ctx = Context::new();
        ctx.load_table("DSDT", &definition_block(b"DSDT", &body)).unwrap();
        assert_eq!(ctx.deferred().len(), 1);
        assert_eq!(ctx.expand_deferred(), 0);
        assert!(ctx.namespace().lookup_path("\\_SB_.A___").is_some());
    }
}
