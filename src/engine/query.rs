//! The aggregation query builder and executor.
//!
//! `AggregateQuery` is the engine's front door: declare a root entity and a
//! filter, add group-by and aggregate attributes under distinct names, then
//! hand it a row source to execute. Validation is fail-fast where a mistake is
//! detectable at declaration time (unknown names, non-numeric sums, duplicate
//! attribute names); join-shape errors surface from `execute`.

use std::collections::HashMap;

use crate::model::{
    AggregateFunction, Catalog, Expr, GroupKey, Having, Predicate, Value,
};
use crate::planner::chunk::{self, DEFAULT_CHUNK_SIZE};
use crate::planner::JoinPlanner;
use crate::semantic::{AggregateError, AggregateResult, EntityGraph};

use super::aggregate::Accumulator;
use super::having;
use super::result::{AggregateList, AggregateRow};
use super::row_source::RowSource;

pub struct AggregateQuery<'a> {
    catalog: &'a Catalog,
    root: String,
    predicate: Predicate,
    group_bys: Vec<(String, Expr)>,
    aggregates: Vec<(String, AggregateFunction, Expr)>,
    having: Option<Having>,
    orderings: Vec<(String, bool)>,
    chunk_size: usize,
}

impl<'a> AggregateQuery<'a> {
    pub fn new(catalog: &'a Catalog, root: &str, predicate: Predicate) -> AggregateResult<Self> {
        if catalog.entity(root).is_none() {
            return Err(AggregateError::UnknownEntity(root.to_string()));
        }
        Ok(Self {
            catalog,
            root: root.to_string(),
            predicate,
            group_bys: Vec::new(),
            aggregates: Vec::new(),
            having: None,
            orderings: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    fn name_taken(&self, name: &str) -> bool {
        self.group_bys.iter().any(|(n, _)| n == name)
            || self.aggregates.iter().any(|(n, _, _)| n == name)
    }

    /// Declare a group-by attribute. The expression is type-checked against
    /// the catalog immediately.
    pub fn add_group_by(&mut self, name: &str, expr: Expr) -> AggregateResult<()> {
        if self.name_taken(name) {
            return Err(AggregateError::DuplicateGroupByName(name.to_string()));
        }
        expr.kind(self.catalog, &self.root)?;
        self.group_bys.push((name.to_string(), expr));
        Ok(())
    }

    /// Declare an aggregate attribute.
    pub fn add_aggregate_attribute(
        &mut self,
        name: &str,
        function: AggregateFunction,
        expr: Expr,
    ) -> AggregateResult<()> {
        if self.name_taken(name) {
            return Err(AggregateError::DuplicateAggregateName(name.to_string()));
        }
        let kind = expr.kind(self.catalog, &self.root)?;
        if function.requires_numeric() && kind.numeric().is_none() {
            return Err(AggregateError::NotNumeric(format!(
                "aggregate '{}' over a {} expression",
                name,
                kind.name()
            )));
        }
        self.aggregates.push((name.to_string(), function, expr));
        Ok(())
    }

    /// Set the post-aggregation filter, replacing any previous one. The
    /// compared expressions need not be selected for output.
    pub fn set_having_operation(&mut self, having: Having) -> AggregateResult<()> {
        for leaf in having.comparisons() {
            if let Having::Compare { function, expr, .. } = leaf {
                let kind = expr.kind(self.catalog, &self.root)?;
                if function.requires_numeric() && kind.numeric().is_none() {
                    return Err(AggregateError::NotNumeric(format!(
                        "having comparison over a {} expression",
                        kind.name()
                    )));
                }
            }
        }
        self.having = Some(having);
        Ok(())
    }

    /// Append one result ordering key; earlier keys are more significant.
    pub fn add_order_by(&mut self, name: &str, ascending: bool) -> AggregateResult<()> {
        if !self.name_taken(name) {
            return Err(AggregateError::UnknownRequestName(name.to_string()));
        }
        self.orderings.push((name.to_string(), ascending));
        Ok(())
    }

    /// Cap on a single sub-request's in-list size.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size.max(1);
    }

    /// Plan, execute (chunked if needed), reduce, filter and order.
    ///
    /// Consumes the query: the request handed to the row source is immutable,
    /// and a consumed builder cannot be mutated into disagreeing with it.
    pub fn execute(self, source: &dyn RowSource) -> AggregateResult<AggregateList> {
        let graph = EntityGraph::from_catalog(self.catalog)?;
        let planner = JoinPlanner::new(self.catalog, &graph);
        let planned = planner.plan(
            &self.root,
            &self.predicate,
            &self.group_bys,
            &self.aggregates,
            self.having.as_ref(),
        )?;

        let requests = chunk::split(&planned.request, self.chunk_size);

        // One accumulator per (group, source); chunk partials merge through
        // commutative sufficient statistics, so chunk order is immaterial to
        // the values. Group order is first-seen across the chunk sequence.
        let mut order: Vec<GroupKey> = Vec::new();
        let mut groups: HashMap<GroupKey, (Vec<Value>, HashMap<String, Accumulator>)> =
            HashMap::new();

        for request in &requests {
            for group in source.execute(request)? {
                let key = GroupKey(group.key.clone());
                if !groups.contains_key(&key) {
                    order.push(key.clone());
                    let accumulators = planned
                        .request
                        .sources
                        .iter()
                        .map(|spec| (spec.name.clone(), Accumulator::new(spec.kind)))
                        .collect();
                    groups.insert(key.clone(), (group.key.clone(), accumulators));
                }
                if let Some((_, accumulators)) = groups.get_mut(&key) {
                    for spec in &planned.request.sources {
                        let mut partial = Accumulator::new(spec.kind);
                        if let Some(values) = group.sources.get(&spec.name) {
                            for value in values {
                                partial.push(value);
                            }
                        }
                        if let Some(accumulator) = accumulators.get_mut(&spec.name) {
                            accumulator.merge(&partial);
                        }
                    }
                }
            }
        }

        let mut rows = Vec::new();
        for key in order {
            let (key_values, accumulators) = match groups.remove(&key) {
                Some(group) => group,
                None => continue,
            };
            if let Some(filter) = &planned.having {
                if !having::evaluate(filter, &accumulators) {
                    continue;
                }
            }
            let mut values = Vec::with_capacity(self.group_bys.len() + self.aggregates.len());
            for (spec, value) in planned.request.group_bys.iter().zip(key_values) {
                values.push((spec.name.clone(), value));
            }
            for spec in planned.request.sources.iter().filter(|s| !s.shadow) {
                let value = accumulators
                    .get(&spec.name)
                    .map(|acc| acc.finalize(spec.function))
                    .unwrap_or(Value::Null);
                values.push((spec.name.clone(), value));
            }
            rows.push(AggregateRow::new(values));
        }

        let mut list = AggregateList::from_rows(rows);
        for (name, ascending) in &self.orderings {
            list.add_order_by(name, *ascending)?;
        }
        Ok(list)
    }
}
