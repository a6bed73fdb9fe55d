use std::fmt;
use std::sync::{Arc, LazyLock};

use rustc_hash::FxHashSet;

/// Every kind of syntax node the gatekeeper knows how to judge.
///
/// Nodes outside this set are rejected without consulting the policy, so a new parser
/// construct is blocked until it is given a kind here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // Query shape
    Query,
    With,
    RecursiveWith,
    Select,
    SetOperation,
    Values,
    // Relations
    TableRef,
    DerivedTable,
    NestedJoin,
    InnerJoin,
    LeftJoin,
    RightJoin,
    FullJoin,
    CrossJoin,
    AsOfJoin,
    /// `FOR SYSTEM_TIME AS OF` on a table reference.
    TableVersion,
    // Expressions
    Identifier,
    CompoundIdentifier,
    Literal,
    TypedLiteral,
    BinaryOp,
    UnaryOp,
    Nested,
    FunctionCall,
    WindowFunction,
    Cast,
    Case,
    NullTest,
    BooleanTest,
    DistinctFrom,
    Between,
    InList,
    InSubquery,
    Subquery,
    Exists,
    Like,
    Interval,
    Extract,
    Substring,
    Trim,
    CeilFloor,
    Position,
    Tuple,
    AtTimeZone,
    Collate,
    Convert,
    GroupingSets,
}

impl NodeKind {
    pub const ALL: [NodeKind; 47] = [
        NodeKind::Query,
        NodeKind::With,
        NodeKind::RecursiveWith,
        NodeKind::Select,
        NodeKind::SetOperation,
        NodeKind::Values,
        NodeKind::TableRef,
        NodeKind::DerivedTable,
        NodeKind::NestedJoin,
        NodeKind::InnerJoin,
        NodeKind::LeftJoin,
        NodeKind::RightJoin,
        NodeKind::FullJoin,
        NodeKind::CrossJoin,
        NodeKind::AsOfJoin,
        NodeKind::TableVersion,
        NodeKind::Identifier,
        NodeKind::CompoundIdentifier,
        NodeKind::Literal,
        NodeKind::TypedLiteral,
        NodeKind::BinaryOp,
        NodeKind::UnaryOp,
        NodeKind::Nested,
        NodeKind::FunctionCall,
        NodeKind::WindowFunction,
        NodeKind::Cast,
        NodeKind::Case,
        NodeKind::NullTest,
        NodeKind::BooleanTest,
        NodeKind::DistinctFrom,
        NodeKind::Between,
        NodeKind::InList,
        NodeKind::InSubquery,
        NodeKind::Subquery,
        NodeKind::Exists,
        NodeKind::Like,
        NodeKind::Interval,
        NodeKind::Extract,
        NodeKind::Substring,
        NodeKind::Trim,
        NodeKind::CeilFloor,
        NodeKind::Position,
        NodeKind::Tuple,
        NodeKind::AtTimeZone,
        NodeKind::Collate,
        NodeKind::Convert,
        NodeKind::GroupingSets,
    ];

    /// Name used in `blocked_node_or_func` errors.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Query => "query",
            NodeKind::With => "WITH",
            NodeKind::RecursiveWith => "WITH RECURSIVE",
            NodeKind::Select => "SELECT",
            NodeKind::SetOperation => "set operation",
            NodeKind::Values => "VALUES",
            NodeKind::TableRef => "table reference",
            NodeKind::DerivedTable => "derived table",
            NodeKind::NestedJoin => "nested join",
            NodeKind::InnerJoin => "INNER JOIN",
            NodeKind::LeftJoin => "LEFT JOIN",
            NodeKind::RightJoin => "RIGHT JOIN",
            NodeKind::FullJoin => "FULL JOIN",
            NodeKind::CrossJoin => "CROSS JOIN",
            NodeKind::AsOfJoin => "ASOF JOIN",
            NodeKind::TableVersion => "AS OF",
            NodeKind::Identifier => "identifier",
            NodeKind::CompoundIdentifier => "compound identifier",
            NodeKind::Literal => "literal",
            NodeKind::TypedLiteral => "typed literal",
            NodeKind::BinaryOp => "binary operator",
            NodeKind::UnaryOp => "unary operator",
            NodeKind::Nested => "parenthesized expression",
            NodeKind::FunctionCall => "function call",
            NodeKind::WindowFunction => "window function",
            NodeKind::Cast => "CAST",
            NodeKind::Case => "CASE",
            NodeKind::NullTest => "IS NULL",
            NodeKind::BooleanTest => "IS TRUE",
            NodeKind::DistinctFrom => "IS DISTINCT FROM",
            NodeKind::Between => "BETWEEN",
            NodeKind::InList => "IN list",
            NodeKind::InSubquery => "IN subquery",
            NodeKind::Subquery => "subquery",
            NodeKind::Exists => "EXISTS",
            NodeKind::Like => "LIKE",
            NodeKind::Interval => "INTERVAL",
            NodeKind::Extract => "EXTRACT",
            NodeKind::Substring => "SUBSTRING",
            NodeKind::Trim => "TRIM",
            NodeKind::CeilFloor => "CEIL",
            NodeKind::Position => "POSITION",
            NodeKind::Tuple => "tuple",
            NodeKind::AtTimeZone => "AT TIME ZONE",
            NodeKind::Collate => "COLLATE",
            NodeKind::Convert => "CONVERT",
            NodeKind::GroupingSets => "GROUPING SETS",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Functions every standard policy allows, lowercase.
#[rustfmt::skip]
const STANDARD_FUNCTIONS: &[&str] = &[
    // control flow
    "if", "coalesce", "nullif", "ifnull", "greatest", "least",
    // aggregates
    "sum", "avg", "count", "min", "max", "median", "stddev", "stddev_pop", "stddev_samp",
    "variance", "var_pop", "var_samp",
    // math
    "abs", "ceil", "ceiling", "floor", "round", "trunc", "sqrt", "cbrt", "pow", "power",
    "exp", "ln", "log", "log2", "log10", "mod", "sign", "signum", "pi",
    // strings
    "lower", "upper", "length", "char_length", "character_length", "concat", "concat_ws",
    "substr", "substring", "trim", "ltrim", "rtrim", "replace", "left", "right", "lpad",
    "rpad", "reverse", "strpos", "instr",
    // time
    "now", "date_trunc", "date_part", "to_timestamp", "str_to_date", "strftime",
    // window
    "row_number", "rank", "dense_rank", "lag", "lead", "first_value", "last_value",
];

static STANDARD: LazyLock<Arc<AllowListPolicy>> = LazyLock::new(|| {
    Arc::new(AllowListPolicy {
        nodes: NodeKind::ALL.iter().copied().collect(),
        functions: STANDARD_FUNCTIONS.iter().map(|f| f.to_string()).collect(),
    })
});

/// The closed set of node kinds and function names a query may use.
///
/// Function names are compared case-insensitively on their full dotted name, so
/// `pg_catalog.sum` is not `sum`.
#[derive(Debug, Clone)]
pub struct AllowListPolicy {
    nodes: FxHashSet<NodeKind>,
    functions: FxHashSet<String>,
}

impl AllowListPolicy {
    /// Every node kind and the standard function list. Shared; built once.
    pub fn standard() -> Arc<AllowListPolicy> {
        Arc::clone(&STANDARD)
    }

    pub fn builder() -> AllowListPolicyBuilder {
        AllowListPolicyBuilder {
            policy: (**STANDARD).clone(),
        }
    }

    pub fn allows_node(&self, kind: NodeKind) -> bool {
        self.nodes.contains(&kind)
    }

    pub fn allows_function(&self, name: &str) -> bool {
        self.functions.contains(&name.to_ascii_lowercase())
    }

    /// Allowed function names, sorted.
    pub fn functions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Starts from the standard policy and narrows or extends it.
#[derive(Debug, Clone)]
pub struct AllowListPolicyBuilder {
    policy: AllowListPolicy,
}

impl AllowListPolicyBuilder {
    pub fn allow_function(mut self, name: impl AsRef<str>) -> Self {
        self.policy
            .functions
            .insert(name.as_ref().to_ascii_lowercase());
        self
    }

    pub fn allow_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self = self.allow_function(name);
        }
        self
    }

    pub fn deny_function(mut self, name: impl AsRef<str>) -> Self {
        self.policy
            .functions
            .remove(&name.as_ref().to_ascii_lowercase());
        self
    }

    pub fn deny_node(mut self, kind: NodeKind) -> Self {
        self.policy.nodes.remove(&kind);
        self
    }

    pub fn build(self) -> Arc<AllowListPolicy> {
        Arc::new(self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_names_are_unique() {
        let names: FxHashSet<_> = NodeKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), NodeKind::ALL.len());
    }

    #[test]
    fn function_lookup_ignores_case() {
        let policy = AllowListPolicy::standard();
        assert!(policy.allows_function("SUM"));
        assert!(policy.allows_function("Str_To_Date"));
        assert!(!policy.allows_function("load_file"));
        assert!(!policy.allows_function("pg_catalog.sum"));
    }

    #[test]
    fn builder_extends_and_narrows() {
        let policy = AllowListPolicy::builder()
            .allow_functions(["JSON_EXTRACT"])
            .deny_function("now")
            .deny_node(NodeKind::RecursiveWith)
            .build();
        assert!(policy.allows_function("json_extract"));
        assert!(!policy.allows_function("NOW"));
        assert!(!policy.allows_node(NodeKind::RecursiveWith));
        assert!(policy.allows_node(NodeKind::With));
        assert!(AllowListPolicy::standard().allows_function("now"));
    }
}
