//! Reference planner.
//!
//! Resolves a statement against the schema and builds a [`LogicalPlan`].
//! Checks run in a fixed order so the same statement always fails the
//! same way: feature support, tables, then each clause in rendering order
//! (names, functions, aggregate placement), then grouping, then set
//! operation arity.

use super::{ErrorState, PlanFailure, Planner};
use crate::ast::{
    BinaryOp, ColumnRef, Expr, JoinKind, Limit, Select, SelectItem, Statement, TableExpr,
};
use crate::schema::SchemaContext;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Functions the reference planner accepts, aggregates included
pub const KNOWN_FUNCTIONS: &[&str] = &[
    "count",
    "sum",
    "min",
    "max",
    "avg",
    "group_concat",
    "abs",
    "ceil",
    "floor",
    "round",
    "mod",
    "lower",
    "upper",
    "length",
    "concat",
    "substr",
    "trim",
    "coalesce",
    "ifnull",
    "nullif",
    "greatest",
    "least",
];

// ============================================================================
// Features
// ============================================================================

/// Statement features that can be switched off to emulate planner gaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerFeature {
    SetOperation,
    LeftJoin,
    CrossJoin,
    Distinct,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
    InList,
    Like,
    AggregateDistinct,
}

impl PlannerFeature {
    pub const ALL: &'static [PlannerFeature] = &[
        PlannerFeature::SetOperation,
        PlannerFeature::LeftJoin,
        PlannerFeature::CrossJoin,
        PlannerFeature::Distinct,
        PlannerFeature::GroupBy,
        PlannerFeature::Having,
        PlannerFeature::OrderBy,
        PlannerFeature::Limit,
        PlannerFeature::Offset,
        PlannerFeature::InList,
        PlannerFeature::Like,
        PlannerFeature::AggregateDistinct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlannerFeature::SetOperation => "set_operation",
            PlannerFeature::LeftJoin => "left_join",
            PlannerFeature::CrossJoin => "cross_join",
            PlannerFeature::Distinct => "distinct",
            PlannerFeature::GroupBy => "group_by",
            PlannerFeature::Having => "having",
            PlannerFeature::OrderBy => "order_by",
            PlannerFeature::Limit => "limit",
            PlannerFeature::Offset => "offset",
            PlannerFeature::InList => "in_list",
            PlannerFeature::Like => "like",
            PlannerFeature::AggregateDistinct => "aggregate_distinct",
        }
    }
}

impl fmt::Display for PlannerFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlannerFeature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        PlannerFeature::ALL
            .iter()
            .find(|feature| feature.as_str() == normalized)
            .copied()
            .ok_or_else(|| {
                let known: Vec<&str> = PlannerFeature::ALL.iter().map(|f| f.as_str()).collect();
                format!("unknown planner feature '{s}' (known: {})", known.join(", "))
            })
    }
}

// ============================================================================
// Logical plan
// ============================================================================

/// Operator tree produced by a successful plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalPlan {
    /// Single-row source for a SELECT without FROM
    Dual,
    Scan {
        table: String,
        binding: String,
    },
    Join {
        kind: JoinKind,
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        condition: Option<Expr>,
    },
    Filter {
        predicate: Expr,
        input: Box<LogicalPlan>,
    },
    Aggregate {
        group_by: Vec<Expr>,
        aggregates: Vec<Expr>,
        input: Box<LogicalPlan>,
    },
    Project {
        columns: Vec<String>,
        input: Box<LogicalPlan>,
    },
    Distinct {
        input: Box<LogicalPlan>,
    },
    Sort {
        keys: Vec<(Expr, bool)>,
        input: Box<LogicalPlan>,
    },
    Limit {
        limit: Limit,
        input: Box<LogicalPlan>,
    },
    Union {
        all: bool,
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
    },
}

impl LogicalPlan {
    /// Number of output columns
    pub fn arity(&self) -> usize {
        match self {
            LogicalPlan::Dual | LogicalPlan::Scan { .. } | LogicalPlan::Join { .. } => 0,
            LogicalPlan::Project { columns, .. } => columns.len(),
            LogicalPlan::Filter { input, .. }
            | LogicalPlan::Aggregate { input, .. }
            | LogicalPlan::Distinct { input }
            | LogicalPlan::Sort { input, .. }
            | LogicalPlan::Limit { input, .. } => input.arity(),
            LogicalPlan::Union { left, .. } => left.arity(),
        }
    }

    /// Number of operators in the tree
    pub fn operator_count(&self) -> usize {
        1 + match self {
            LogicalPlan::Dual | LogicalPlan::Scan { .. } => 0,
            LogicalPlan::Join { left, right, .. } | LogicalPlan::Union { left, right, .. } => {
                left.operator_count() + right.operator_count()
            }
            LogicalPlan::Filter { input, .. }
            | LogicalPlan::Aggregate { input, .. }
            | LogicalPlan::Project { input, .. }
            | LogicalPlan::Distinct { input }
            | LogicalPlan::Sort { input, .. }
            | LogicalPlan::Limit { input, .. } => input.operator_count(),
        }
    }
}

impl fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalPlan::Dual => write!(f, "Dual"),
            LogicalPlan::Scan { table, binding } if table == binding => write!(f, "Scan({table})"),
            LogicalPlan::Scan { table, binding } => write!(f, "Scan({table} as {binding})"),
            LogicalPlan::Join {
                kind,
                left,
                right,
                condition,
            } => {
                write!(f, "Join[{}]({left}, {right}", kind.as_str())?;
                if let Some(condition) = condition {
                    write!(f, ", {condition}")?;
                }
                write!(f, ")")
            }
            LogicalPlan::Filter { predicate, input } => write!(f, "Filter[{predicate}]({input})"),
            LogicalPlan::Aggregate {
                group_by, input, ..
            } => {
                let keys: Vec<String> = group_by.iter().map(ToString::to_string).collect();
                write!(f, "Aggregate[{}]({input})", keys.join(", "))
            }
            LogicalPlan::Project { columns, input } => {
                write!(f, "Project[{}]({input})", columns.join(", "))
            }
            LogicalPlan::Distinct { input } => write!(f, "Distinct({input})"),
            LogicalPlan::Sort { input, .. } => write!(f, "Sort({input})"),
            LogicalPlan::Limit { limit, input } => write!(f, "{limit}({input})"),
            LogicalPlan::Union { all, left, right } => {
                let op = if *all { "UnionAll" } else { "Union" };
                write!(f, "{op}({left}, {right})")
            }
        }
    }
}

// ============================================================================
// Planner
// ============================================================================

/// Reference planner over a [`SchemaContext`]
#[derive(Debug, Clone, Default)]
pub struct SchemaPlanner {
    unsupported: HashSet<PlannerFeature>,
}

impl SchemaPlanner {
    /// Create a planner that supports every feature
    pub fn new() -> Self {
        SchemaPlanner {
            unsupported: HashSet::new(),
        }
    }

    /// Reject statements using `feature`
    pub fn with_unsupported(mut self, feature: PlannerFeature) -> Self {
        self.unsupported.insert(feature);
        self
    }

    /// Reject statements using any of `features`
    pub fn with_unsupported_all(mut self, features: impl IntoIterator<Item = PlannerFeature>) -> Self {
        self.unsupported.extend(features);
        self
    }

    pub fn supports(&self, feature: PlannerFeature) -> bool {
        !self.unsupported.contains(&feature)
    }

    fn require(&self, feature: PlannerFeature) -> Result<(), PlanFailure> {
        if self.supports(feature) {
            Ok(())
        } else {
            Err(PlanFailure::planning(
                ErrorState::Unsupported,
                format!("unsupported: {}", feature.as_str().replace('_', " ")),
            ))
        }
    }

    fn plan_statement(
        &self,
        statement: &Statement,
        schema: &SchemaContext,
    ) -> Result<LogicalPlan, PlanFailure> {
        match statement {
            Statement::Select(select) => self.plan_select(select, schema),
            Statement::SetOperation { op, left, right } => {
                self.require(PlannerFeature::SetOperation)?;
                let left = self.plan_statement(left, schema)?;
                let right = self.plan_statement(right, schema)?;
                if left.arity() != right.arity() {
                    return Err(PlanFailure::planning(
                        ErrorState::WrongNumberOfColumns,
                        "The used SELECT statements have a different number of columns",
                    ));
                }
                Ok(LogicalPlan::Union {
                    all: matches!(op, crate::ast::SetOperator::UnionAll),
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
        }
    }

    fn plan_select(&self, select: &Select, schema: &SchemaContext) -> Result<LogicalPlan, PlanFailure> {
        self.check_features(select)?;

        let scope = Scope::build(&select.from, schema)?;
        let aliases: Vec<String> = select
            .projection
            .iter()
            .filter_map(|item| match item {
                SelectItem::Expr {
                    alias: Some(alias), ..
                } => Some(alias.to_ascii_lowercase()),
                _ => None,
            })
            .collect();

        // Names, functions and aggregate placement, clause by clause
        let mut columns = Vec::with_capacity(select.projection.len());
        for item in &select.projection {
            match item {
                SelectItem::Wildcard => {
                    if scope.entries.is_empty() {
                        return Err(PlanFailure::planning(
                            ErrorState::BadTable,
                            "No tables used",
                        ));
                    }
                    for entry in &scope.entries {
                        columns.extend(entry.columns.iter().cloned());
                    }
                }
                SelectItem::QualifiedWildcard(table) => {
                    let entry = scope.lookup(table).ok_or_else(|| {
                        PlanFailure::planning(
                            ErrorState::BadTable,
                            format!("Unknown table '{table}'"),
                        )
                    })?;
                    columns.extend(entry.columns.iter().cloned());
                }
                SelectItem::Expr { expr, alias } => {
                    let ctx = ClauseContext::new("field list", true, false);
                    self.check_expr(expr, &scope, &aliases, &ctx, false)?;
                    columns.push(alias.clone().unwrap_or_else(|| expr.to_string()));
                }
            }
        }

        for entry in &select.from {
            self.check_join_conditions(entry, schema)?;
        }
        if let Some(selection) = &select.selection {
            let ctx = ClauseContext::new("where clause", false, false);
            self.check_expr(selection, &scope, &aliases, &ctx, false)?;
        }
        for key in &select.group_by {
            let ctx = ClauseContext::new("group statement", false, true);
            self.check_expr(key, &scope, &aliases, &ctx, false)?;
        }
        if let Some(having) = &select.having {
            let ctx = ClauseContext::new("having clause", true, true);
            self.check_expr(having, &scope, &aliases, &ctx, false)?;
        }
        for term in &select.order_by {
            let ctx = ClauseContext::new("order clause", true, true);
            self.check_expr(&term.expr, &scope, &aliases, &ctx, false)?;
        }

        let aggregated = !select.group_by.is_empty() || select.has_aggregate();
        if aggregated {
            check_grouping(select, &scope)?;
        }

        // Build the operator tree bottom-up
        let mut plan = scope.source_plan(&select.from);
        if let Some(selection) = &select.selection {
            plan = LogicalPlan::Filter {
                predicate: selection.clone(),
                input: Box::new(plan),
            };
        }
        if aggregated {
            let mut aggregates = Vec::new();
            for item in &select.projection {
                if let SelectItem::Expr { expr, .. } = item {
                    collect_aggregates(expr, &mut aggregates);
                }
            }
            if let Some(having) = &select.having {
                collect_aggregates(having, &mut aggregates);
            }
            plan = LogicalPlan::Aggregate {
                group_by: select.group_by.clone(),
                aggregates,
                input: Box::new(plan),
            };
        }
        if let Some(having) = &select.having {
            plan = LogicalPlan::Filter {
                predicate: having.clone(),
                input: Box::new(plan),
            };
        }
        plan = LogicalPlan::Project {
            columns,
            input: Box::new(plan),
        };
        if select.distinct {
            plan = LogicalPlan::Distinct {
                input: Box::new(plan),
            };
        }
        if !select.order_by.is_empty() {
            plan = LogicalPlan::Sort {
                keys: select
                    .order_by
                    .iter()
                    .map(|term| (term.expr.clone(), term.descending))
                    .collect(),
                input: Box::new(plan),
            };
        }
        if let Some(limit) = select.limit {
            plan = LogicalPlan::Limit {
                limit,
                input: Box::new(plan),
            };
        }
        Ok(plan)
    }

    fn check_features(&self, select: &Select) -> Result<(), PlanFailure> {
        if select.distinct {
            self.require(PlannerFeature::Distinct)?;
        }
        for entry in &select.from {
            self.check_join_features(entry)?;
        }
        if !select.group_by.is_empty() {
            self.require(PlannerFeature::GroupBy)?;
        }
        if select.having.is_some() {
            self.require(PlannerFeature::Having)?;
        }
        if !select.order_by.is_empty() {
            self.require(PlannerFeature::OrderBy)?;
        }
        if let Some(limit) = select.limit {
            self.require(PlannerFeature::Limit)?;
            if limit.offset.is_some() {
                self.require(PlannerFeature::Offset)?;
            }
        }
        Ok(())
    }

    fn check_join_features(&self, relation: &TableExpr) -> Result<(), PlanFailure> {
        if let TableExpr::Join {
            kind, left, right, ..
        } = relation
        {
            match kind {
                JoinKind::Left => self.require(PlannerFeature::LeftJoin)?,
                JoinKind::Cross => self.require(PlannerFeature::CrossJoin)?,
                JoinKind::Inner => {}
            }
            self.check_join_features(left)?;
            self.check_join_features(right)?;
        }
        Ok(())
    }

    /// ON conditions only see the tables of their own join
    fn check_join_conditions(
        &self,
        relation: &TableExpr,
        schema: &SchemaContext,
    ) -> Result<(), PlanFailure> {
        if let TableExpr::Join {
            left, right, on, ..
        } = relation
        {
            self.check_join_conditions(left, schema)?;
            self.check_join_conditions(right, schema)?;
            if let Some(on) = on {
                let scope = Scope::build(std::slice::from_ref(relation), schema)?;
                let ctx = ClauseContext::new("on clause", false, false);
                self.check_expr(on, &scope, &[], &ctx, false)?;
            }
        }
        Ok(())
    }

    fn check_expr(
        &self,
        expr: &Expr,
        scope: &Scope,
        aliases: &[String],
        ctx: &ClauseContext,
        inside_aggregate: bool,
    ) -> Result<(), PlanFailure> {
        match expr {
            Expr::Column(column) => {
                scope.resolve(column, aliases, ctx)?;
            }
            Expr::Function {
                name,
                args,
                distinct,
            } => {
                let lowered = name.to_ascii_lowercase();
                if !KNOWN_FUNCTIONS.contains(&lowered.as_str()) {
                    return Err(PlanFailure::planning(
                        ErrorState::UnknownFunction,
                        format!("FUNCTION {name} does not exist"),
                    ));
                }
                let is_aggregate = expr.is_aggregate();
                if is_aggregate && (inside_aggregate || !ctx.aggregates_allowed) {
                    return Err(PlanFailure::planning(
                        ErrorState::InvalidGroupFunction,
                        "Invalid use of group function",
                    ));
                }
                if *distinct {
                    self.require(PlannerFeature::AggregateDistinct)?;
                }
                if args.contains(&Expr::Star) && (lowered != "count" || args.len() != 1) {
                    return Err(PlanFailure::planning(
                        ErrorState::Unsupported,
                        format!("unsupported: '*' argument to {name}"),
                    ));
                }
                for arg in args.iter().filter(|arg| **arg != Expr::Star) {
                    self.check_expr(arg, scope, aliases, ctx, inside_aggregate || is_aggregate)?;
                }
            }
            Expr::Star => {
                return Err(PlanFailure::planning(
                    ErrorState::Internal,
                    "'*' outside of a function argument",
                ));
            }
            other => {
                match other {
                    Expr::InList { .. } => self.require(PlannerFeature::InList)?,
                    Expr::Binary {
                        op: BinaryOp::Like | BinaryOp::NotLike,
                        ..
                    } => self.require(PlannerFeature::Like)?,
                    _ => {}
                }
                for child in other.children() {
                    self.check_expr(child, scope, aliases, ctx, inside_aggregate)?;
                }
            }
        }
        Ok(())
    }
}

impl Planner for SchemaPlanner {
    type Plan = LogicalPlan;

    fn plan(&self, statement: &Statement, schema: &SchemaContext) -> Result<LogicalPlan, PlanFailure> {
        self.plan_statement(statement, schema)
    }
}

// ============================================================================
// Name resolution
// ============================================================================

/// Per-clause resolution rules
struct ClauseContext {
    /// Name used in error messages, MySQL style
    name: &'static str,
    aggregates_allowed: bool,
    /// Select-list aliases may stand in for columns
    aliases_allowed: bool,
}

impl ClauseContext {
    fn new(name: &'static str, aggregates_allowed: bool, aliases_allowed: bool) -> Self {
        ClauseContext {
            name,
            aggregates_allowed,
            aliases_allowed,
        }
    }
}

/// One table visible in a query block
struct ScopeEntry {
    table: String,
    /// Lowercased alias or table name
    binding: String,
    columns: Vec<String>,
}

/// A column resolved to its table binding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolvedColumn {
    binding: String,
    column: String,
}

struct Scope {
    entries: Vec<ScopeEntry>,
}

impl Scope {
    fn build(from: &[TableExpr], schema: &SchemaContext) -> Result<Scope, PlanFailure> {
        let mut entries: Vec<ScopeEntry> = Vec::new();
        for relation in from {
            for leaf in relation.tables() {
                let TableExpr::Table { name, .. } = leaf else {
                    continue;
                };
                let table = schema.table(name).ok_or_else(|| {
                    PlanFailure::planning(
                        ErrorState::BadTable,
                        format!("Table '{name}' doesn't exist"),
                    )
                })?;
                let binding = leaf.binding().unwrap_or(name).to_ascii_lowercase();
                if entries.iter().any(|entry| entry.binding == binding) {
                    return Err(PlanFailure::planning(
                        ErrorState::NonUniqueTable,
                        format!("Not unique table/alias: '{binding}'"),
                    ));
                }
                entries.push(ScopeEntry {
                    table: table.name.clone(),
                    binding,
                    columns: table.columns.iter().map(|c| c.name.clone()).collect(),
                });
            }
        }
        Ok(Scope { entries })
    }

    fn lookup(&self, binding: &str) -> Option<&ScopeEntry> {
        self.entries
            .iter()
            .find(|entry| entry.binding.eq_ignore_ascii_case(binding))
    }

    /// Resolve a column; `None` means it names a select-list alias
    fn resolve(
        &self,
        column: &ColumnRef,
        aliases: &[String],
        ctx: &ClauseContext,
    ) -> Result<Option<ResolvedColumn>, PlanFailure> {
        let unknown = || {
            PlanFailure::planning(
                ErrorState::BadField,
                format!("Unknown column '{column}' in '{}'", ctx.name),
            )
        };

        if let Some(table) = &column.table {
            let entry = self.lookup(table).ok_or_else(unknown)?;
            if !entry
                .columns
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&column.name))
            {
                return Err(unknown());
            }
            return Ok(Some(ResolvedColumn {
                binding: entry.binding.clone(),
                column: column.name.to_ascii_lowercase(),
            }));
        }

        let matches: Vec<&ScopeEntry> = self
            .entries
            .iter()
            .filter(|entry| {
                entry
                    .columns
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(&column.name))
            })
            .collect();
        match matches.as_slice() {
            [entry] => Ok(Some(ResolvedColumn {
                binding: entry.binding.clone(),
                column: column.name.to_ascii_lowercase(),
            })),
            [] if ctx.aliases_allowed
                && aliases
                    .iter()
                    .any(|alias| alias.eq_ignore_ascii_case(&column.name)) =>
            {
                Ok(None)
            }
            [] => Err(unknown()),
            _ => Err(PlanFailure::planning(
                ErrorState::AmbiguousField,
                format!("Column '{}' in {} is ambiguous", column.name, ctx.name),
            )),
        }
    }

    /// Source operator tree: comma-separated entries become cross joins
    fn source_plan(&self, from: &[TableExpr]) -> LogicalPlan {
        let mut plans = from.iter().map(|relation| self.relation_plan(relation));
        let Some(first) = plans.next() else {
            return LogicalPlan::Dual;
        };
        plans.fold(first, |left, right| LogicalPlan::Join {
            kind: JoinKind::Cross,
            left: Box::new(left),
            right: Box::new(right),
            condition: None,
        })
    }

    fn relation_plan(&self, relation: &TableExpr) -> LogicalPlan {
        match relation {
            TableExpr::Table { name, .. } => {
                let binding = relation.binding().unwrap_or(name).to_ascii_lowercase();
                let table = self
                    .lookup(&binding)
                    .map_or_else(|| name.clone(), |entry| entry.table.clone());
                LogicalPlan::Scan { table, binding }
            }
            TableExpr::Join {
                kind,
                left,
                right,
                on,
            } => LogicalPlan::Join {
                kind: *kind,
                left: Box::new(self.relation_plan(left)),
                right: Box::new(self.relation_plan(right)),
                condition: on.clone(),
            },
        }
    }
}

// ============================================================================
// Grouping
// ============================================================================

/// Every non-aggregated select-list column must be a grouping key
fn check_grouping(select: &Select, scope: &Scope) -> Result<(), PlanFailure> {
    let lenient = ClauseContext::new("group statement", true, true);
    let mut grouped = HashSet::new();
    for key in &select.group_by {
        if let Expr::Column(column) = key {
            if let Ok(Some(resolved)) = scope.resolve(column, &[], &lenient) {
                grouped.insert(resolved);
            }
        }
    }

    for (position, item) in select.projection.iter().enumerate() {
        let expr = match item {
            SelectItem::Expr { expr, .. } => expr,
            SelectItem::Wildcard | SelectItem::QualifiedWildcard(_) => {
                return Err(PlanFailure::planning(
                    ErrorState::WrongFieldWithGroup,
                    format!(
                        "Expression #{} of SELECT list is not in GROUP BY clause",
                        position + 1
                    ),
                ));
            }
        };
        if select.group_by.contains(expr) {
            continue;
        }
        let mut columns = Vec::new();
        collect_nonaggregated_columns(expr, &mut columns);
        for column in columns {
            let resolved = scope.resolve(column, &[], &lenient)?;
            if resolved.is_some_and(|resolved| grouped.contains(&resolved)) {
                continue;
            }
            let message = if select.group_by.is_empty() {
                format!(
                    "In aggregated query without GROUP BY, expression #{} of SELECT list \
                     contains nonaggregated column '{column}'; this is incompatible with \
                     sql_mode=only_full_group_by",
                    position + 1
                )
            } else {
                format!(
                    "Expression #{} of SELECT list is not in GROUP BY clause and contains \
                     nonaggregated column '{column}' which is not functionally dependent on \
                     columns in GROUP BY clause; this is incompatible with \
                     sql_mode=only_full_group_by",
                    position + 1
                )
            };
            return Err(PlanFailure::planning(ErrorState::WrongFieldWithGroup, message));
        }
    }
    Ok(())
}

fn collect_nonaggregated_columns<'a>(expr: &'a Expr, out: &mut Vec<&'a ColumnRef>) {
    if expr.is_aggregate() {
        return;
    }
    if let Expr::Column(column) = expr {
        out.push(column);
    }
    for child in expr.children() {
        collect_nonaggregated_columns(child, out);
    }
}

fn collect_aggregates(expr: &Expr, out: &mut Vec<Expr>) {
    if expr.is_aggregate() {
        if !out.contains(expr) {
            out.push(expr.clone());
        }
        return;
    }
    for child in expr.children() {
        collect_aggregates(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_statement;

    fn schema() -> SchemaContext {
        let mut schema = SchemaContext::new();
        schema.register_table("t1", ["id", "a", "b"]).unwrap();
        schema.register_table("t2", ["id", "c"]).unwrap();
        schema
    }

    fn plan(sql: &str) -> Result<LogicalPlan, PlanFailure> {
        SchemaPlanner::new().plan(&parse_statement(sql).unwrap(), &schema())
    }

    fn state(sql: &str) -> Option<ErrorState> {
        plan(sql).unwrap_err().state
    }

    #[test]
    fn test_plans_valid_query() {
        let plan = plan("select a, c from t1 join t2 on t1.id = t2.id where a > 1").unwrap();
        assert_eq!(plan.arity(), 2);
        assert!(matches!(plan, LogicalPlan::Project { .. }));
    }

    #[test]
    fn test_unknown_table_and_column() {
        assert_eq!(state("select a from nope"), Some(ErrorState::BadTable));
        assert_eq!(state("select zz from t1"), Some(ErrorState::BadField));
        assert_eq!(state("select t2.a from t1"), Some(ErrorState::BadField));
    }

    #[test]
    fn test_ambiguous_column() {
        assert_eq!(
            state("select id from t1, t2"),
            Some(ErrorState::AmbiguousField)
        );
        assert!(plan("select t1.id from t1, t2").is_ok());
    }

    #[test]
    fn test_non_unique_alias() {
        assert_eq!(
            state("select 1 from t1 as x, t2 as x"),
            Some(ErrorState::NonUniqueTable)
        );
    }

    #[test]
    fn test_on_clause_sees_only_its_join() {
        assert_eq!(
            state("select 1 from t1, t2 join t1 as t3 on t3.id = t1.id"),
            Some(ErrorState::BadField)
        );
    }

    #[test]
    fn test_grouping_rules() {
        assert_eq!(
            state("select a, count(*) from t1"),
            Some(ErrorState::WrongFieldWithGroup)
        );
        assert_eq!(
            state("select a, b from t1 group by a"),
            Some(ErrorState::WrongFieldWithGroup)
        );
        assert!(plan("select a, count(*) from t1 group by a").is_ok());
        assert!(plan("select a + 1 from t1 group by a + 1").is_ok());
        assert!(plan("select count(*) as n from t1 having n > 1").is_ok());
    }

    #[test]
    fn test_aggregate_placement() {
        assert_eq!(
            state("select a from t1 where count(*) > 1"),
            Some(ErrorState::InvalidGroupFunction)
        );
        assert_eq!(
            state("select sum(count(a)) from t1"),
            Some(ErrorState::InvalidGroupFunction)
        );
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            state("select frobnicate(a) from t1"),
            Some(ErrorState::UnknownFunction)
        );
    }

    #[test]
    fn test_union_arity() {
        assert_eq!(
            state("select a from t1 union select id, c from t2"),
            Some(ErrorState::WrongNumberOfColumns)
        );
        assert_eq!(plan("select * from t2 union select a, b from t1").unwrap().arity(), 2);
    }

    #[test]
    fn test_unsupported_feature() {
        let planner = SchemaPlanner::new().with_unsupported(PlannerFeature::Having);
        let statement = parse_statement("select a from t1 group by a having a > 1").unwrap();
        let failure = planner.plan(&statement, &schema()).unwrap_err();
        assert_eq!(failure.state, Some(ErrorState::Unsupported));
        assert_eq!(failure.message, "unsupported: having");
    }

    #[test]
    fn test_feature_from_str() {
        assert_eq!(
            "left-join".parse::<PlannerFeature>(),
            Ok(PlannerFeature::LeftJoin)
        );
        assert!("bogus".parse::<PlannerFeature>().is_err());
    }
}
