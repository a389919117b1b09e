//! Join/multiplicity planner.
//!
//! For every to-many relationship path appearing anywhere in a request, the
//! planner decides whether it contributes a fan-out join (it feeds a group-by
//! or aggregate) or a correlated existence check (it only restricts rows).
//! The subtle case is a to-many path used as both: its filter condition is
//! applied inside the fanned rows feeding that path's aggregates, and the
//! same condition still restricts the root as an existence check. Together
//! the two reproduce what a single filtered join would compute: filtered
//! contributions, and no group from a root with zero qualifying related rows.

pub mod chunk;
pub mod plan;

use std::collections::HashMap;

pub use plan::{
    BoundHaving, ExecutionRequest, ExistenceCheck, GroupBySpec, JoinContext, PlannedQuery,
    SourceSpec,
};

use crate::model::{AggregateFunction, Catalog, Expr, Having, Predicate};
use crate::semantic::error::{AggregateError, AggregateResult};
use crate::semantic::{EntityGraph, ResolvedPath};

pub struct JoinPlanner<'a> {
    catalog: &'a Catalog,
    graph: &'a EntityGraph,
}

impl<'a> JoinPlanner<'a> {
    pub fn new(catalog: &'a Catalog, graph: &'a EntityGraph) -> Self {
        Self { catalog, graph }
    }

    /// Build the execution request for one aggregation query.
    pub fn plan(
        &self,
        root: &str,
        predicate: &Predicate,
        group_bys: &[(String, Expr)],
        aggregates: &[(String, AggregateFunction, Expr)],
        having: Option<&Having>,
    ) -> AggregateResult<PlannedQuery> {
        if !self.graph.has_entity(root) {
            return Err(AggregateError::UnknownEntity(root.to_string()));
        }

        let mut contexts: Vec<JoinContext> = Vec::new();
        let mut context_index: HashMap<String, usize> = HashMap::new();
        let mut sources: Vec<SourceSpec> = Vec::new();

        // Aggregation-source uses first: they own the fan-out contexts.
        for (name, function, expr) in aggregates {
            let spec = self.source_spec(
                root,
                name.clone(),
                *function,
                expr,
                false,
                &mut contexts,
                &mut context_index,
            )?;
            sources.push(spec);
        }

        // Having comparisons re-derive their aggregate per group; one that
        // matches no selected source gets a shadow source.
        let bound_having = match having {
            Some(tree) => Some(self.bind_having(
                root,
                tree,
                &mut sources,
                &mut contexts,
                &mut context_index,
            )?),
            None => None,
        };

        // A group-by over a to-many path fans the root out exactly like an
        // aggregation source does, and shares the context when an aggregate
        // uses the same path.
        let mut group_by_specs = Vec::with_capacity(group_bys.len());
        for (name, expr) in group_bys {
            let kind = expr.kind(self.catalog, root)?;
            let (path, inner) = self.decompose(root, expr)?;
            let context = path.map(|p| intern_context(p, &mut contexts, &mut context_index));
            group_by_specs.push(GroupBySpec {
                name: name.clone(),
                expr: inner,
                context,
                kind,
            });
        }

        // Classify the base predicate's AND-reachable conjuncts. A simple
        // to-many conjunct always restricts the root through an existence
        // check; when the same path is fanned it additionally becomes that
        // context's pre-aggregation filter, so the fanned rows the aggregates
        // and group keys see are the qualifying ones. Everything else stays
        // in the residual predicate.
        let mut existence_checks: Vec<ExistenceCheck> = Vec::new();
        let mut residual: Vec<Predicate> = Vec::new();
        for conjunct in predicate.conjuncts() {
            match self.strip_to_many(root, conjunct)? {
                Some((path, stripped)) => {
                    if let Some(&i) = context_index.get(&path.key()) {
                        let merged = match contexts[i].pre_filter.take() {
                            Some(existing) => existing.and(stripped.clone()),
                            None => stripped.clone(),
                        };
                        contexts[i].pre_filter = Some(merged);
                    }
                    existence_checks.push(ExistenceCheck {
                        path,
                        condition: stripped,
                    });
                }
                None => residual.push(conjunct.clone()),
            }
        }

        log::debug!(
            "planned root '{}': {} fan-out context(s), {} existence check(s), {} source(s)",
            root,
            contexts.len(),
            existence_checks.len(),
            sources.len()
        );

        Ok(PlannedQuery {
            request: ExecutionRequest {
                root: root.to_string(),
                predicate: Predicate::from_conjuncts(residual),
                existence_checks,
                contexts,
                group_bys: group_by_specs,
                sources,
            },
            having: bound_having,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn source_spec(
        &self,
        root: &str,
        name: String,
        function: AggregateFunction,
        expr: &Expr,
        shadow: bool,
        contexts: &mut Vec<JoinContext>,
        context_index: &mut HashMap<String, usize>,
    ) -> AggregateResult<SourceSpec> {
        let kind = expr.kind(self.catalog, root)?;
        let (path, inner) = self.decompose(root, expr)?;
        let context = path.map(|p| intern_context(p, contexts, context_index));
        Ok(SourceSpec {
            name,
            function,
            expr: inner,
            context,
            kind,
            shadow,
        })
    }

    fn bind_having(
        &self,
        root: &str,
        having: &Having,
        sources: &mut Vec<SourceSpec>,
        contexts: &mut Vec<JoinContext>,
        context_index: &mut HashMap<String, usize>,
    ) -> AggregateResult<BoundHaving> {
        match having {
            Having::Compare {
                function,
                expr,
                op,
                value,
            } => {
                let (path, inner) = self.decompose(root, expr)?;
                let context = path.map(|p| intern_context(p, contexts, context_index));
                let existing = sources.iter().find(|s| {
                    !s.shadow && s.function == *function && s.context == context && s.expr == inner
                });
                let source = match existing {
                    Some(spec) => spec.name.clone(),
                    None => {
                        // A caller aggregate may legitimately carry a
                        // $having_N name; skip past any taken one.
                        let mut n = sources.len();
                        let mut name = format!("$having_{}", n);
                        while sources.iter().any(|s| s.name == name) {
                            n += 1;
                            name = format!("$having_{}", n);
                        }
                        let kind = expr.kind(self.catalog, root)?;
                        sources.push(SourceSpec {
                            name: name.clone(),
                            function: *function,
                            expr: inner,
                            context,
                            kind,
                            shadow: true,
                        });
                        name
                    }
                };
                Ok(BoundHaving::Compare {
                    source,
                    function: *function,
                    op: *op,
                    value: value.clone(),
                })
            }
            Having::And(left, right) => Ok(BoundHaving::And(
                Box::new(self.bind_having(root, left, sources, contexts, context_index)?),
                Box::new(self.bind_having(root, right, sources, contexts, context_index)?),
            )),
            Having::Or(left, right) => Ok(BoundHaving::Or(
                Box::new(self.bind_having(root, left, sources, contexts, context_index)?),
                Box::new(self.bind_having(root, right, sources, contexts, context_index)?),
            )),
        }
    }

    /// Split an expression into its outermost to-many path (if any) and the
    /// expression relative to that path's target.
    ///
    /// Rejects to-many traversals nested inside a calculation or extraction:
    /// fanning out inside an operand is ill-defined.
    fn decompose(&self, root: &str, expr: &Expr) -> AggregateResult<(Option<ResolvedPath>, Expr)> {
        let flat = expr.flattened();
        if let Expr::Mapped { path, inner } = &flat {
            let resolved = self.graph.resolve(root, path)?;
            if resolved.is_to_many() {
                let target = resolved
                    .target()
                    .ok_or_else(|| AggregateError::UnknownEntity(root.to_string()))?
                    .to_string();
                self.reject_to_many(&target, inner)?;
                return Ok((Some(resolved), (**inner).clone()));
            }
        }
        self.reject_to_many(root, &flat)?;
        Ok((None, flat))
    }

    /// Error if any to-many traversal appears anywhere in `expr`.
    fn reject_to_many(&self, entity: &str, expr: &Expr) -> AggregateResult<()> {
        match expr {
            Expr::Attribute { .. } => Ok(()),
            Expr::Calculated { operands, .. } => {
                for operand in operands {
                    self.reject_to_many(entity, operand)?;
                }
                Ok(())
            }
            Expr::Extract { operand, .. } => self.reject_to_many(entity, operand),
            Expr::Mapped { path, inner } => {
                let resolved = self.graph.resolve(entity, path)?;
                if resolved.is_to_many() {
                    return Err(AggregateError::NestedToMany(resolved.key()));
                }
                let target = resolved.target().unwrap_or(entity).to_string();
                self.reject_to_many(&target, inner)
            }
        }
    }

    /// If the conjunct is a simple condition over one to-many mapped
    /// expression, return the path and the condition with the mapping
    /// stripped (relative to the path target).
    fn strip_to_many(
        &self,
        root: &str,
        conjunct: &Predicate,
    ) -> AggregateResult<Option<(ResolvedPath, Predicate)>> {
        let rebuilt = match conjunct {
            Predicate::Compare { expr, op, value } => {
                let (path, inner) = self.decompose(root, expr)?;
                path.map(|p| (p, Predicate::compare(inner, *op, value.clone())))
            }
            Predicate::In { expr, values } => {
                let (path, inner) = self.decompose(root, expr)?;
                path.map(|p| (p, Predicate::is_in(inner, values.clone())))
            }
            Predicate::Between { expr, low, high } => {
                let (path, inner) = self.decompose(root, expr)?;
                path.map(|p| (p, Predicate::between(inner, low.clone(), high.clone())))
            }
            // Or/Not subtrees keep inline existence semantics in the
            // residual predicate; lifting them out would change meaning.
            _ => None,
        };
        Ok(rebuilt)
    }
}

fn intern_context(
    path: ResolvedPath,
    contexts: &mut Vec<JoinContext>,
    context_index: &mut HashMap<String, usize>,
) -> usize {
    let key = path.key();
    if let Some(&i) = context_index.get(&key) {
        return i;
    }
    contexts.push(JoinContext {
        path,
        pre_filter: None,
    });
    let i = contexts.len() - 1;
    context_index.insert(key, i);
    i
}
