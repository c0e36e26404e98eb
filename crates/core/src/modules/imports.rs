use std::collections::HashMap;

use crate::container::diagnostics::Diagnostic;
use crate::errors::AssemblyError;
use crate::modules::catalog::DeclarationCatalog;
use crate::modules::declaration::ConfigurationDeclaration;

/// Declarations reachable from a root, each listed once
#[derive(Debug)]
pub struct ImportPlan<'a> {
    pub root: &'a ConfigurationDeclaration,
    /// Breadth-first import order, root excluded
    pub imported: Vec<&'a ConfigurationDeclaration>,
    /// One entry per name that had to be picked among several declarations
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> ImportPlan<'a> {
    /// Imported declarations first, the root last, so the root's own
    /// definitions override anything it imports.
    pub fn contribution_order(&self) -> impl Iterator<Item = &'a ConfigurationDeclaration> + '_ {
        self.imported.iter().copied().chain(std::iter::once(self.root))
    }

    pub fn names(&self) -> Vec<&str> {
        self.contribution_order().map(|d| d.name.as_str()).collect()
    }
}

struct ImportNode<'a> {
    declaration: &'a ConfigurationDeclaration,
    imports: Vec<usize>,
}

/// Walks the import graph of a root declaration
pub struct ImportResolver<'a> {
    catalog: &'a DeclarationCatalog,
}

impl<'a> ImportResolver<'a> {
    pub fn new(catalog: &'a DeclarationCatalog) -> Self {
        Self { catalog }
    }

    /// Breadth-first from `root`. Every name is looked up in the catalog once.
    pub fn resolve(&self, root: &str) -> Result<ImportPlan<'a>, AssemblyError> {
        let mut diagnostics = Vec::new();
        let root_declaration = self
            .find(root, &mut diagnostics)?
            .ok_or_else(|| AssemblyError::DeclarationNotFound {
                name: root.to_string(),
            })?;

        let mut nodes = vec![ImportNode {
            declaration: root_declaration,
            imports: Vec::new(),
        }];
        let mut index: HashMap<&'a str, usize> = HashMap::new();
        index.insert(root_declaration.name.as_str(), 0);

        let mut cursor = 0;
        while cursor < nodes.len() {
            let declaration = nodes[cursor].declaration;
            for import in &declaration.imports {
                let pos = match index.get(import.as_str()) {
                    Some(&pos) => pos,
                    None => {
                        let target = self.find(import, &mut diagnostics)?.ok_or_else(|| {
                            AssemblyError::UnresolvedImport {
                                declaration: declaration.name.clone(),
                                import: import.to_string(),
                            }
                        })?;
                        tracing::debug!("'{}' imports '{}'", declaration.name, target.name);
                        let pos = nodes.len();
                        index.insert(target.name.as_str(), pos);
                        nodes.push(ImportNode {
                            declaration: target,
                            imports: Vec::new(),
                        });
                        pos
                    }
                };
                nodes[cursor].imports.push(pos);
            }
            cursor += 1;
        }

        detect_cycles(&nodes)?;

        Ok(ImportPlan {
            root: root_declaration,
            imported: nodes.iter().skip(1).map(|node| node.declaration).collect(),
            diagnostics,
        })
    }

    fn find(
        &self,
        name: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Option<&'a ConfigurationDeclaration>, AssemblyError> {
        let found = self.catalog.resolve(name)?;
        let count = self.catalog.count(name);
        if count > 1 {
            let diagnostic = Diagnostic::ambiguous_declaration(name, count);
            diagnostic.emit();
            diagnostics.push(diagnostic);
        }
        Ok(found)
    }
}

/// Depth-first over the resolved imports, with an explicit frame stack
fn detect_cycles(nodes: &[ImportNode<'_>]) -> Result<(), AssemblyError> {
    let mut done = vec![false; nodes.len()];
    let mut on_path = vec![false; nodes.len()];
    let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
    on_path[0] = true;

    while let Some(frame) = stack.last_mut() {
        let (pos, next) = *frame;
        let Some(&target) = nodes[pos].imports.get(next) else {
            stack.pop();
            on_path[pos] = false;
            done[pos] = true;
            continue;
        };
        frame.1 += 1;

        if on_path[target] {
            let start = stack.iter().position(|(p, _)| *p == target).unwrap_or(0);
            let mut path: Vec<String> = stack[start..]
                .iter()
                .map(|(p, _)| nodes[*p].declaration.name.clone())
                .collect();
            path.push(nodes[target].declaration.name.clone());
            return Err(AssemblyError::CyclicImport { path });
        }
        if !done[target] {
            on_path[target] = true;
            stack.push((target, 0));
        }
    }

    Ok(())
}
