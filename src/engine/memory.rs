//! In-memory dataset and the reference row source.
//!
//! `MemoryRowSource` is the engine's executable backend for tests and
//! embedded use: entity rows live in plain vectors, relationship instances in
//! id-to-id link tables. It honors the planned semantics exactly: inline
//! existence for to-many conditions left in the residual predicate, separate
//! correlated existence checks, and one independent fan-out per join context
//! with that context's pre-aggregation filter applied before any value is
//! contributed. When a group-by keys a context, each fanned row's value lands
//! only in the group keyed by that row's own group-by values, as a single
//! filtered join would place it.

use std::collections::HashMap;

use chrono::Datelike;

use crate::model::{ArithOp, Catalog, CompareOp, Expr, ExtractFunc, GroupKey, Predicate, Value};
use crate::planner::{ExecutionRequest, ExistenceCheck, JoinContext, SourceSpec};
use crate::semantic::AggregateResult;

use super::row_source::{GroupRows, RowSource};

/// One entity instance.
#[derive(Debug, Clone)]
pub struct EntityRow {
    pub id: u64,
    values: HashMap<String, Value>,
}

impl EntityRow {
    pub fn value(&self, name: &str) -> Value {
        self.values.get(name).cloned().unwrap_or(Value::Null)
    }
}

/// Entity rows plus relationship instance links.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: HashMap<String, Vec<EntityRow>>,
    // entity -> relationship -> from id -> to ids
    links: HashMap<String, HashMap<String, HashMap<u64, Vec<u64>>>>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>>(
        &mut self,
        entity: &str,
        id: u64,
        values: impl IntoIterator<Item = (K, Value)>,
    ) {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect::<HashMap<_, _>>();
        self.rows
            .entry(entity.to_string())
            .or_default()
            .push(EntityRow { id, values });
    }

    /// Record one relationship instance from a row to a related row.
    pub fn link(&mut self, entity: &str, relationship: &str, from: u64, to: u64) {
        self.links
            .entry(entity.to_string())
            .or_default()
            .entry(relationship.to_string())
            .or_default()
            .entry(from)
            .or_default()
            .push(to);
    }

    fn rows_of(&self, entity: &str) -> &[EntityRow] {
        self.rows.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    fn row_by_id(&self, entity: &str, id: u64) -> Option<&EntityRow> {
        self.rows_of(entity).iter().find(|r| r.id == id)
    }

    fn related_ids(&self, entity: &str, relationship: &str, from: u64) -> &[u64] {
        self.links
            .get(entity)
            .and_then(|rels| rels.get(relationship))
            .and_then(|map| map.get(&from))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

pub struct MemoryRowSource {
    catalog: Catalog,
    dataset: Dataset,
}

impl MemoryRowSource {
    pub fn new(catalog: Catalog, dataset: Dataset) -> Self {
        Self { catalog, dataset }
    }

    /// Follow unresolved relationship names from a row, returning the target
    /// entity and the reached rows.
    fn traverse<'s>(
        &'s self,
        entity: &str,
        row: &'s EntityRow,
        path: &[String],
    ) -> (String, Vec<&'s EntityRow>) {
        let mut current_entity = entity.to_string();
        let mut current: Vec<&EntityRow> = vec![row];
        for segment in path {
            let target = match self
                .catalog
                .entity(&current_entity)
                .and_then(|e| e.relationship(segment))
            {
                Some(relationship) => relationship.target.clone(),
                None => return (current_entity, Vec::new()),
            };
            let mut next = Vec::new();
            for r in &current {
                for id in self.dataset.related_ids(&current_entity, segment, r.id) {
                    if let Some(reached) = self.dataset.row_by_id(&target, *id) {
                        next.push(reached);
                    }
                }
            }
            current_entity = target;
            current = next;
        }
        (current_entity, current)
    }

    /// Follow an already-resolved path.
    fn related_rows<'s>(
        &'s self,
        row: &'s EntityRow,
        path: &crate::semantic::ResolvedPath,
    ) -> Vec<&'s EntityRow> {
        let mut current: Vec<&EntityRow> = vec![row];
        for step in &path.steps {
            let mut next = Vec::new();
            for r in &current {
                for id in self.dataset.related_ids(&step.from, &step.relationship, r.id) {
                    if let Some(reached) = self.dataset.row_by_id(&step.to, *id) {
                        next.push(reached);
                    }
                }
            }
            current = next;
        }
        current
    }

    /// All values an expression produces from one row; more than one when it
    /// crosses a to-many relationship.
    fn eval_multi(&self, entity: &str, row: &EntityRow, expr: &Expr) -> Vec<Value> {
        match expr {
            Expr::Mapped { path, inner } => {
                let (target, rows) = self.traverse(entity, row, path);
                rows.into_iter()
                    .flat_map(|r| self.eval_multi(&target, r, inner))
                    .collect()
            }
            other => vec![self.eval_single(entity, row, other)],
        }
    }

    /// Single-value evaluation; a per-row calculation with any null operand
    /// is null, exactly as a null base attribute would be.
    fn eval_single(&self, entity: &str, row: &EntityRow, expr: &Expr) -> Value {
        match expr {
            Expr::Attribute { name, .. } => row.value(name),
            Expr::Calculated { op, operands } => {
                let values: Vec<Value> = operands
                    .iter()
                    .map(|o| self.eval_single(entity, row, o))
                    .collect();
                match (op, values.as_slice()) {
                    (ArithOp::AbsoluteValue, [v]) => v.abs(),
                    (ArithOp::Plus, [a, b]) => a.add(b),
                    (ArithOp::Minus, [a, b]) => a.sub(b),
                    (ArithOp::Times, [a, b]) => a.mul(b),
                    (ArithOp::DividedBy, [a, b]) => a.div(b),
                    (ArithOp::Modulo, [a, b]) => a.rem(b),
                    _ => Value::Null,
                }
            }
            Expr::Extract { func, operand } => {
                extract(*func, &self.eval_single(entity, row, operand))
            }
            Expr::Mapped { .. } => self
                .eval_multi(entity, row, expr)
                .into_iter()
                .next()
                .unwrap_or(Value::Null),
        }
    }

    /// Predicate over one row. A condition over a to-many mapped expression
    /// holds when at least one reached value satisfies it.
    fn eval_predicate(&self, entity: &str, row: &EntityRow, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::All => true,
            Predicate::Compare { expr, op, value } => self
                .eval_multi(entity, row, expr)
                .iter()
                .any(|v| op.matches(v.compare(value))),
            Predicate::In { expr, values } => self.eval_multi(entity, row, expr).iter().any(|v| {
                !v.is_null() && values.iter().any(|member| v.same(member))
            }),
            Predicate::Between { expr, low, high } => {
                self.eval_multi(entity, row, expr).iter().any(|v| {
                    CompareOp::GtEq.matches(v.compare(low)) && CompareOp::LtEq.matches(v.compare(high))
                })
            }
            Predicate::And(left, right) => {
                self.eval_predicate(entity, row, left) && self.eval_predicate(entity, row, right)
            }
            Predicate::Or(left, right) => {
                self.eval_predicate(entity, row, left) || self.eval_predicate(entity, row, right)
            }
            Predicate::Not(inner) => !self.eval_predicate(entity, row, inner),
        }
    }

    fn exists(&self, row: &EntityRow, check: &ExistenceCheck) -> bool {
        let target = match check.path.target() {
            Some(target) => target.to_string(),
            None => return false,
        };
        self.related_rows(row, &check.path)
            .into_iter()
            .any(|r| self.eval_predicate(&target, r, &check.condition))
    }

    /// The pre-filtered fan one context produces from a root row.
    fn context_rows<'s>(
        &'s self,
        root: &str,
        row: &'s EntityRow,
        context: &JoinContext,
    ) -> Vec<&'s EntityRow> {
        let target = context.path.target().unwrap_or(root).to_string();
        self.related_rows(row, &context.path)
            .into_iter()
            .filter(|r| match &context.pre_filter {
                Some(filter) => self.eval_predicate(&target, r, filter),
                None => true,
            })
            .collect()
    }
}

impl RowSource for MemoryRowSource {
    fn execute(&self, request: &ExecutionRequest) -> AggregateResult<Vec<GroupRows>> {
        let mut order: Vec<GroupKey> = Vec::new();
        let mut groups: HashMap<GroupKey, GroupRows> = HashMap::new();

        // Without group-bys there is exactly one global group, present even
        // when no row matches, so count aggregates to 0 rather than nothing.
        if request.group_bys.is_empty() {
            let key = GroupKey(Vec::new());
            order.push(key.clone());
            groups.insert(key, empty_group(Vec::new(), &request.sources));
        }

        // Group-by positions each fan-out context keys, and the position of
        // each keyed context in the key cross product.
        let mut context_slots: Vec<Vec<usize>> = vec![Vec::new(); request.contexts.len()];
        for (slot, group_by) in request.group_bys.iter().enumerate() {
            if let Some(i) = group_by.context {
                context_slots[i].push(slot);
            }
        }
        let keyed: Vec<usize> = (0..request.contexts.len())
            .filter(|&i| !context_slots[i].is_empty())
            .collect();
        let mut keyed_pos: Vec<Option<usize>> = vec![None; request.contexts.len()];
        for (pos, &i) in keyed.iter().enumerate() {
            keyed_pos[i] = Some(pos);
        }

        'rows: for row in self.dataset.rows_of(&request.root) {
            if !self.eval_predicate(&request.root, row, &request.predicate) {
                continue;
            }
            if !request.existence_checks.iter().all(|c| self.exists(row, c)) {
                continue;
            }

            // One pre-filtered fan per context, shared by group keys and
            // value sources.
            let fans: Vec<Vec<&EntityRow>> = request
                .contexts
                .iter()
                .map(|context| self.context_rows(&request.root, row, context))
                .collect();

            // Per keyed context: the key tuple each fanned row carries, and
            // the distinct tuples the row fans out to.
            let mut row_tuples: Vec<Vec<Vec<Value>>> = Vec::with_capacity(fans.len());
            let mut distinct_tuples: Vec<Vec<Vec<Value>>> = Vec::with_capacity(fans.len());
            for (i, fan) in fans.iter().enumerate() {
                if context_slots[i].is_empty() {
                    row_tuples.push(Vec::new());
                    distinct_tuples.push(Vec::new());
                    continue;
                }
                // A root whose keyed fan is empty joins to nothing.
                if fan.is_empty() {
                    continue 'rows;
                }
                let target = request.contexts[i]
                    .path
                    .target()
                    .unwrap_or(request.root.as_str());
                let tuples: Vec<Vec<Value>> = fan
                    .iter()
                    .map(|r| {
                        context_slots[i]
                            .iter()
                            .map(|&slot| {
                                self.eval_single(target, r, &request.group_bys[slot].expr)
                            })
                            .collect()
                    })
                    .collect();
                let mut distinct: Vec<Vec<Value>> = Vec::new();
                for tuple in &tuples {
                    if !distinct.iter().any(|seen| tuples_match(seen, tuple)) {
                        distinct.push(tuple.clone());
                    }
                }
                row_tuples.push(tuples);
                distinct_tuples.push(distinct);
            }

            // Key template: root-level values are fixed per row, keyed slots
            // are filled per cross-product choice below.
            let mut base_key = vec![Value::Null; request.group_bys.len()];
            for (slot, group_by) in request.group_bys.iter().enumerate() {
                if group_by.context.is_none() {
                    base_key[slot] = self.eval_single(&request.root, row, &group_by.expr);
                }
            }

            // One choice per combination of distinct tuples across keyed
            // contexts; a single empty choice when no context is keyed.
            let mut choices: Vec<Vec<usize>> = vec![Vec::new()];
            for &i in &keyed {
                let mut expanded = Vec::with_capacity(choices.len() * distinct_tuples[i].len());
                for choice in &choices {
                    for t in 0..distinct_tuples[i].len() {
                        let mut next = choice.clone();
                        next.push(t);
                        expanded.push(next);
                    }
                }
                choices = expanded;
            }

            for choice in &choices {
                let mut key = base_key.clone();
                for (pos, &i) in keyed.iter().enumerate() {
                    let tuple = &distinct_tuples[i][choice[pos]];
                    for (t, &slot) in context_slots[i].iter().enumerate() {
                        key[slot] = tuple[t].clone();
                    }
                }

                let group_key = GroupKey(key.clone());
                if !groups.contains_key(&group_key) {
                    order.push(group_key.clone());
                    groups.insert(group_key.clone(), empty_group(key, &request.sources));
                }
                if let Some(group) = groups.get_mut(&group_key) {
                    for spec in &request.sources {
                        let values: Vec<Value> = match spec.context {
                            None => vec![self.eval_single(&request.root, row, &spec.expr)],
                            Some(i) => {
                                let target = request.contexts[i]
                                    .path
                                    .target()
                                    .unwrap_or(request.root.as_str());
                                match keyed_pos[i] {
                                    // Keyed fan: a row contributes only to the
                                    // group its own key tuple selects.
                                    Some(pos) => {
                                        let chosen = &distinct_tuples[i][choice[pos]];
                                        fans[i]
                                            .iter()
                                            .zip(&row_tuples[i])
                                            .filter(|(_, tuple)| tuples_match(tuple, chosen))
                                            .map(|(r, _)| self.eval_single(target, r, &spec.expr))
                                            .collect()
                                    }
                                    None => fans[i]
                                        .iter()
                                        .map(|r| self.eval_single(target, r, &spec.expr))
                                        .collect(),
                                }
                            }
                        };
                        if let Some(list) = group.sources.get_mut(&spec.name) {
                            list.extend(values);
                        }
                    }
                }
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|key| groups.remove(&key))
            .collect())
    }
}

fn tuples_match(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same(y))
}

fn empty_group(key: Vec<Value>, sources: &[SourceSpec]) -> GroupRows {
    GroupRows {
        key,
        sources: sources
            .iter()
            .map(|spec| (spec.name.clone(), Vec::new()))
            .collect(),
    }
}

fn extract(func: ExtractFunc, value: &Value) -> Value {
    let (year, month, day) = match value {
        Value::Date(d) => (d.year(), d.month(), d.day()),
        Value::Timestamp(t) => (t.year(), t.month(), t.day()),
        _ => return Value::Null,
    };
    match func {
        ExtractFunc::Year => Value::Int(year as i64),
        ExtractFunc::Month => Value::Int(month as i64),
        ExtractFunc::DayOfMonth => Value::Int(day as i64),
    }
}
