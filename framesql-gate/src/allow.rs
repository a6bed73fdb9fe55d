use std::fmt::Debug;
use std::ops::ControlFlow;

use sqlparser::ast::{
    Expr, Function, JoinOperator, Query, Select, SetExpr, Statement, TableFactor, TableVersion,
    Visit, Visitor,
};

use framesql_result::{Error, Result};

use crate::policy::{AllowListPolicy, NodeKind};
use crate::tables::object_name_parts;

/// Why a traversal stopped.
#[derive(Debug)]
pub(crate) struct Blocked {
    token: String,
    reason: String,
}

impl Blocked {
    fn node(kind: NodeKind) -> Self {
        Blocked {
            token: kind.as_str().to_string(),
            reason: format!("node kind {kind} is disabled by policy"),
        }
    }

    fn unknown<T: Debug>(what: &str, node: &T) -> Self {
        let token = variant_name(node);
        Blocked {
            reason: format!("{what} {token} is not on the allow-list"),
            token,
        }
    }

    fn into_error(self) -> Error {
        Error::blocked(self.token, self.reason)
    }
}

/// Check every node of `statement` against `policy`.
pub(crate) fn check_statement(statement: &Statement, policy: &AllowListPolicy) -> Result<()> {
    let mut visitor = AllowVisitor { policy };
    match statement.visit(&mut visitor) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(blocked) => Err(blocked.into_error()),
    }
}

struct AllowVisitor<'p> {
    policy: &'p AllowListPolicy,
}

impl AllowVisitor<'_> {
    fn require(&self, kind: NodeKind) -> ControlFlow<Blocked> {
        if self.policy.allows_node(kind) {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(Blocked::node(kind))
        }
    }

    fn check_set_expr(&self, body: &SetExpr) -> ControlFlow<Blocked> {
        match body {
            SetExpr::Select(select) => self.check_select(select),
            // Nested queries get their own pre_visit_query.
            SetExpr::Query(_) => ControlFlow::Continue(()),
            SetExpr::SetOperation { left, right, .. } => {
                self.require(NodeKind::SetOperation)?;
                self.check_set_expr(left)?;
                self.check_set_expr(right)
            }
            SetExpr::Values(_) => self.require(NodeKind::Values),
            other => ControlFlow::Break(Blocked::unknown("set expression", other)),
        }
    }

    fn check_select(&self, select: &Select) -> ControlFlow<Blocked> {
        self.require(NodeKind::Select)?;
        if select.into.is_some() {
            return ControlFlow::Break(Blocked {
                token: "SELECT INTO".into(),
                reason: "SELECT INTO writes a table".into(),
            });
        }
        for table in &select.from {
            for join in &table.joins {
                match join_kind(&join.join_operator) {
                    Some(kind) => self.require(kind)?,
                    None => {
                        return ControlFlow::Break(Blocked::unknown("join", &join.join_operator));
                    }
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn check_function(&self, function: &Function) -> ControlFlow<Blocked> {
        self.require(NodeKind::FunctionCall)?;
        if function.over.is_some() {
            self.require(NodeKind::WindowFunction)?;
        }
        let name = object_name_parts(&function.name).join(".");
        if self.policy.allows_function(&name) {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(Blocked {
                reason: format!("function {name} is not on the allow-list"),
                token: name,
            })
        }
    }
}

impl Visitor for AllowVisitor<'_> {
    type Break = Blocked;

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Break> {
        match statement {
            Statement::Query(_) => ControlFlow::Continue(()),
            other => ControlFlow::Break(Blocked::unknown("statement", other)),
        }
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        self.require(NodeKind::Query)?;
        if let Some(with) = &query.with {
            self.require(NodeKind::With)?;
            if with.recursive {
                self.require(NodeKind::RecursiveWith)?;
            }
        }
        if !query.locks.is_empty() {
            return ControlFlow::Break(Blocked {
                token: "FOR UPDATE".into(),
                reason: "row locking clauses take locks".into(),
            });
        }
        self.check_set_expr(&query.body)
    }

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Self::Break> {
        match factor {
            TableFactor::Table {
                name,
                args,
                version,
                ..
            } => {
                if args.is_some() {
                    let name = object_name_parts(name).join(".");
                    return ControlFlow::Break(Blocked {
                        reason: format!("table function {name} is not allowed"),
                        token: name,
                    });
                }
                match version {
                    None => {}
                    Some(TableVersion::ForSystemTimeAsOf(_)) => {
                        self.require(NodeKind::TableVersion)?
                    }
                    Some(other) => {
                        return ControlFlow::Break(Blocked::unknown("table version", other));
                    }
                }
                self.require(NodeKind::TableRef)
            }
            TableFactor::Derived { .. } => self.require(NodeKind::DerivedTable),
            TableFactor::NestedJoin { .. } => self.require(NodeKind::NestedJoin),
            other => ControlFlow::Break(Blocked::unknown("relation", other)),
        }
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if let Expr::Function(function) = expr {
            return self.check_function(function);
        }
        match expr_kind(expr) {
            Some(kind) => self.require(kind),
            None => ControlFlow::Break(Blocked::unknown("expression", expr)),
        }
    }
}

fn join_kind(operator: &JoinOperator) -> Option<NodeKind> {
    match operator {
        JoinOperator::Join { .. } | JoinOperator::Inner { .. } => Some(NodeKind::InnerJoin),
        JoinOperator::Left { .. } | JoinOperator::LeftOuter { .. } => Some(NodeKind::LeftJoin),
        JoinOperator::Right { .. } | JoinOperator::RightOuter { .. } => Some(NodeKind::RightJoin),
        JoinOperator::FullOuter { .. } => Some(NodeKind::FullJoin),
        JoinOperator::CrossJoin { .. } => Some(NodeKind::CrossJoin),
        JoinOperator::AsOf { .. } => Some(NodeKind::AsOfJoin),
        _ => None,
    }
}

fn expr_kind(expr: &Expr) -> Option<NodeKind> {
    let kind = match expr {
        Expr::Identifier { .. } => NodeKind::Identifier,
        Expr::CompoundIdentifier { .. } => NodeKind::CompoundIdentifier,
        Expr::Value { .. } => NodeKind::Literal,
        Expr::TypedString { .. } => NodeKind::TypedLiteral,
        Expr::BinaryOp { .. } => NodeKind::BinaryOp,
        Expr::UnaryOp { .. } => NodeKind::UnaryOp,
        Expr::Nested { .. } => NodeKind::Nested,
        Expr::Function { .. } => NodeKind::FunctionCall,
        Expr::Cast { .. } => NodeKind::Cast,
        Expr::Case { .. } => NodeKind::Case,
        Expr::IsNull { .. } | Expr::IsNotNull { .. } => NodeKind::NullTest,
        Expr::IsTrue { .. }
        | Expr::IsNotTrue { .. }
        | Expr::IsFalse { .. }
        | Expr::IsNotFalse { .. } => NodeKind::BooleanTest,
        Expr::IsDistinctFrom { .. } | Expr::IsNotDistinctFrom { .. } => NodeKind::DistinctFrom,
        Expr::Between { .. } => NodeKind::Between,
        Expr::InList { .. } => NodeKind::InList,
        Expr::InSubquery { .. } => NodeKind::InSubquery,
        Expr::Subquery { .. } => NodeKind::Subquery,
        Expr::Exists { .. } => NodeKind::Exists,
        Expr::Like { .. } | Expr::ILike { .. } => NodeKind::Like,
        Expr::Interval { .. } => NodeKind::Interval,
        Expr::Extract { .. } => NodeKind::Extract,
        Expr::Substring { .. } => NodeKind::Substring,
        Expr::Trim { .. } => NodeKind::Trim,
        Expr::Ceil { .. } | Expr::Floor { .. } => NodeKind::CeilFloor,
        Expr::Position { .. } => NodeKind::Position,
        Expr::Tuple { .. } => NodeKind::Tuple,
        Expr::AtTimeZone { .. } => NodeKind::AtTimeZone,
        Expr::Collate { .. } => NodeKind::Collate,
        Expr::Convert { .. } => NodeKind::Convert,
        Expr::GroupingSets { .. } | Expr::Cube { .. } | Expr::Rollup { .. } => {
            NodeKind::GroupingSets
        }
        _ => return None,
    };
    Some(kind)
}

/// Leading identifier of `node`'s debug form, which is its variant name.
fn variant_name<T: Debug>(node: &T) -> String {
    let debug = format!("{node:?}");
    let end = debug
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(debug.len());
    debug[..end].to_string()
}
