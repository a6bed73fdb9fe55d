use std::ops::ControlFlow;

use sqlparser::ast::{Ident, ObjectName, ObjectNamePart, Query, Statement, Visit, Visitor};

/// Identifier parts of `name`, unquoted.
pub(crate) fn object_name_parts(name: &ObjectName) -> Vec<String> {
    name.0
        .iter()
        .filter_map(|part| match part {
            ObjectNamePart::Identifier(ident) => Some(ident.value.clone()),
            _ => None,
        })
        .collect()
}

/// Table names `statement` reads, sorted and deduplicated.
///
/// A qualified name contributes its last part. `dual` is not a table, and neither
/// is an unqualified name inside the query whose `WITH` clause defines it.
pub(crate) fn referenced_tables(statement: &Statement) -> Vec<String> {
    let mut visitor = TablesVisitor::default();
    let ControlFlow::Continue(()) = statement.visit(&mut visitor);

    let mut names: Vec<String> = visitor
        .tables
        .into_iter()
        .filter(|name| !name.eq_ignore_ascii_case("dual"))
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}

/// Whether a reference to `name` resolves to the CTE `cte`. Unquoted identifiers
/// compare case-insensitively.
fn names_cte(name: &Ident, cte: &Ident) -> bool {
    if name.quote_style.is_none() || cte.quote_style.is_none() {
        name.value.eq_ignore_ascii_case(&cte.value)
    } else {
        name.value == cte.value
    }
}

#[derive(Default)]
struct TablesVisitor {
    tables: Vec<String>,
    /// CTE names of each enclosing query, innermost last.
    scopes: Vec<Vec<Ident>>,
}

impl TablesVisitor {
    fn is_cte(&self, name: &Ident) -> bool {
        self.scopes
            .iter()
            .flatten()
            .any(|cte| names_cte(name, cte))
    }
}

impl Visitor for TablesVisitor {
    type Break = std::convert::Infallible;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        let ctes = query
            .with
            .iter()
            .flat_map(|with| &with.cte_tables)
            .map(|cte| cte.alias.name.clone())
            .collect();
        self.scopes.push(ctes);
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.scopes.pop();
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        if let [ObjectNamePart::Identifier(ident)] = relation.0.as_slice()
            && self.is_cte(ident)
        {
            return ControlFlow::Continue(());
        }
        if let Some(name) = object_name_parts(relation).pop() {
            self.tables.push(name);
        }
        ControlFlow::Continue(())
    }
}
