mod insert;
mod stack;
mod update;
mod walk;

use tracing::{debug, trace};

use crate::parser::{parse_insert, parse_update, parse_upsert, token_at, Keyword, ParseError};
use crate::settings::RewriteSettings;

use self::insert::InsertRewriter;
use self::update::UpdateRewriter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum StatementKind {
    Insert,
    Upsert,
    Update,
}

impl StatementKind {
    /// Classifies a statement by its leading keyword. Comments and
    /// whitespace before it are skipped.
    pub fn detect(sql: &str) -> Option<StatementKind> {
        let token = token_at(sql, 0)?;
        match Keyword::lookup(token.text)? {
            Keyword::Insert => Some(StatementKind::Insert),
            Keyword::Upsert => Some(StatementKind::Upsert),
            Keyword::Update => Some(StatementKind::Update),
            _ => None,
        }
    }
}

/// A rewritten bulk statement. Each of its `parameter_count` placeholders
/// takes one array holding that parameter's value for every row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rewrite {
    pub sql: String,
    pub parameter_count: usize,
}

#[derive(Clone, Debug)]
pub struct Rewriter {
    derived_alias: String,
    parameter_prefix: String,
}

impl Default for Rewriter {
    fn default() -> Self {
        Rewriter::new(&RewriteSettings::default())
    }
}

impl Rewriter {
    pub fn new(settings: &RewriteSettings) -> Self {
        Rewriter {
            derived_alias: settings.derived_alias.clone(),
            parameter_prefix: settings.parameter_prefix.clone(),
        }
    }

    /// Parses `sql` as a statement of the given kind and rebuilds it as a
    /// single bulk statement.
    ///
    /// # Panics
    ///
    /// If a listener finds the fragment stack in a state the grammar cannot
    /// produce. The panic message names the rule and the fragments left.
    pub fn rewrite(&self, sql: &str, kind: StatementKind) -> Result<Rewrite, ParseError> {
        let result = match kind {
            StatementKind::Insert => {
                let statement = parse_insert(sql)?;
                let mut listener = InsertRewriter::new(Keyword::Insert);
                walk::insert(&mut listener, &statement).and_then(|_| listener.finish())
            }
            StatementKind::Upsert => {
                let statement = parse_upsert(sql)?;
                let mut listener = InsertRewriter::new(Keyword::Upsert);
                walk::upsert(&mut listener, &statement).and_then(|_| listener.finish())
            }
            StatementKind::Update => {
                let statement = parse_update(sql)?;
                let mut listener = UpdateRewriter::new(&self.derived_alias, &self.parameter_prefix);
                walk::update(&mut listener, &statement).and_then(|_| listener.finish())
            }
        };

        match result {
            Ok(rewrite) => {
                trace!(original = sql, rewritten = %rewrite.sql, "rewrote batch statement");
                Ok(rewrite)
            }
            Err(err) => panic!("{} rewrite of `{}` failed: {}", kind, sql, err),
        }
    }

    /// Whether `sql` is a statement of the given kind that can be rewritten.
    /// The rewritten text is discarded.
    pub fn qualify(&self, sql: &str, kind: StatementKind) -> bool {
        match self.rewrite(sql, kind) {
            Ok(_) => true,
            Err(err) => {
                debug!(sql = sql, error = %err, "statement does not qualify for batch rewrite");
                false
            }
        }
    }
}

pub fn qualify(sql: &str, kind: StatementKind) -> bool {
    Rewriter::default().qualify(sql, kind)
}

pub fn rewrite(sql: &str, kind: StatementKind) -> Result<String, ParseError> {
    Rewriter::default()
        .rewrite(sql, kind)
        .map(|rewrite| rewrite.sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rewrite(kind: StatementKind, sql: &str, expected: &str) {
        assert!(qualify(sql, kind), "does not qualify: {}", sql);
        match rewrite(sql, kind) {
            Ok(rewritten) => assert_eq!(rewritten, expected),
            Err(err) => panic!("failed to rewrite {}: {}", sql, err),
        }
    }

    fn assert_not_qualified(kind: StatementKind, sql: &str) {
        assert!(!qualify(sql, kind), "qualifies: {}", sql);
        assert!(rewrite(sql, kind).is_err());
    }

    #[test]
    fn test_detect() {
        assert_eq!(
            StatementKind::detect("  -- bulk\n insert into t (a) values (?)"),
            Some(StatementKind::Insert)
        );
        assert_eq!(StatementKind::detect("UPSERT INTO t"), Some(StatementKind::Upsert));
        assert_eq!(StatementKind::detect("update t"), Some(StatementKind::Update));
        assert_eq!(StatementKind::detect("delete from t"), None);
        assert_eq!(StatementKind::detect("updated"), None);
        assert_eq!(StatementKind::detect(""), None);
    }

    #[test]
    fn test_insert_placeholders() {
        assert_rewrite(
            StatementKind::Insert,
            "INSERT into product (id,inventory) values (?,?)",
            "INSERT INTO product (id, inventory) SELECT unnest(?) AS id, unnest(?) AS inventory",
        );
    }

    #[test]
    fn test_insert_constant_atoms() {
        assert_rewrite(
            StatementKind::Insert,
            "INSERT into product (id,inventory,price) values (?,123,foo((500.50)))",
            "INSERT INTO product (id, inventory, price) SELECT unnest(?) AS id, 123, foo((500.50))",
        );
    }

    #[test]
    fn test_insert_on_conflict() {
        assert_rewrite(
            StatementKind::Insert,
            "insert into product (id,name) values (?,?) on conflict (id, name) do nothing",
            "INSERT INTO product (id, name) SELECT unnest(?) AS id, unnest(?) AS name ON CONFLICT (id, name) DO NOTHING",
        );
        assert_rewrite(
            StatementKind::Insert,
            "insert into product (id) values (?) on conflict on constraint x do nothing",
            "INSERT INTO product (id) SELECT unnest(?) AS id ON CONFLICT ON CONSTRAINT x DO NOTHING",
        );
    }

    #[test]
    fn test_insert_casts_and_nested_placeholders() {
        let rewrite = Rewriter::default()
            .rewrite(
                "insert into s.t (a, b, c) values (?::int, lower(?), now())",
                StatementKind::Insert,
            )
            .unwrap();
        assert_eq!(
            rewrite.sql,
            "INSERT INTO s.t (a, b, c) SELECT unnest(?)::int AS a, lower(unnest(?)), now()"
        );
        assert_eq!(rewrite.parameter_count, 2);
    }

    #[test]
    fn test_upsert() {
        assert_rewrite(
            StatementKind::Upsert,
            "upsert into product (id, inventory, name) values (?, ?, 'x')",
            "UPSERT INTO product (id, inventory, name) SELECT unnest(?) AS id, unnest(?) AS inventory, 'x'",
        );
    }

    #[test]
    fn test_update() {
        assert_rewrite(
            StatementKind::Update,
            "UPDATE product SET inventory = 100, price = ? WHERE id = ?",
            "UPDATE product SET inventory = 100, price = dt.p1 FROM (SELECT unnest(?) AS p1, unnest(?) AS p2) AS dt WHERE product.id = dt.p2",
        );
    }

    #[test]
    fn test_update_expressions() {
        assert_rewrite(
            StatementKind::Update,
            "update account set balance = balance + ?, updated = clock_timestamp() where id = ? and (foo(balance) + ?) * abs(allow_negative - 1) >= 0",
            "UPDATE account SET balance = account.balance + dt.p1, updated = clock_timestamp() \
             FROM (SELECT unnest(?) AS p1, unnest(?) AS p2, unnest(?) AS p3) AS dt \
             WHERE account.id = dt.p2 AND (foo(account.balance) + dt.p3) * abs(account.allow_negative - 1) >= 0",
        );
        assert_rewrite(
            StatementKind::Update,
            "update t set a = -?, b = ?::decimal where c is not null or d <> ? xor e IS NULL",
            "UPDATE t SET a = -dt.p1, b = dt.p2::decimal FROM (SELECT unnest(?) AS p1, unnest(?) AS p2, unnest(?) AS p3) AS dt \
             WHERE t.c IS NOT NULL OR t.d != dt.p3 XOR t.e IS NULL",
        );
    }

    #[test]
    fn test_update_nested_signs() {
        assert_rewrite(
            StatementKind::Update,
            "update t set a = - -? where id = ?",
            "UPDATE t SET a = - -dt.p1 FROM (SELECT unnest(?) AS p1, unnest(?) AS p2) AS dt WHERE t.id = dt.p2",
        );
        assert_rewrite(
            StatementKind::Update,
            "update t set a = - - 1, b = + -?, c = -+? where id = ?",
            "UPDATE t SET a = - -1, b = + -dt.p1, c = - +dt.p2 \
             FROM (SELECT unnest(?) AS p1, unnest(?) AS p2, unnest(?) AS p3) AS dt WHERE t.id = dt.p3",
        );
    }

    #[test]
    fn test_update_without_placeholders() {
        assert_rewrite(
            StatementKind::Update,
            "update product set version = version + 1 where false",
            "UPDATE product SET version = product.version + 1 WHERE false",
        );
    }

    #[test]
    fn test_update_placeholders_keep_source_order() {
        let sql = "update t set a = ?, b = ?, c = ?, d = ?, e = ?, f = ?, g = ?, h = ?, i = ?, j = ? where k = ?";
        let rewrite = Rewriter::default().rewrite(sql, StatementKind::Update).unwrap();
        assert_eq!(rewrite.parameter_count, 11);
        assert!(rewrite
            .sql
            .contains("unnest(?) AS p9, unnest(?) AS p10, unnest(?) AS p11) AS dt"));
        assert!(rewrite.sql.ends_with("WHERE t.k = dt.p11"));
    }

    #[test]
    fn test_update_settings() {
        let settings = RewriteSettings::builder()
            .derived_alias("_dt")
            .parameter_prefix("param")
            .build();
        let rewrite = Rewriter::new(&settings)
            .rewrite("update t set a = ? where t.id = ?", StatementKind::Update)
            .unwrap();
        assert_eq!(
            rewrite.sql,
            "UPDATE t SET a = _dt.param1 FROM (SELECT unnest(?) AS param1, unnest(?) AS param2) AS _dt WHERE t.id = _dt.param2"
        );
    }

    #[test]
    fn test_not_qualified() {
        assert_not_qualified(StatementKind::Insert, "insert into t (a,b,c) values (?,?,(select (1)))");
        assert_not_qualified(StatementKind::Insert, "insert into t (a) values (123+45)");
        assert_not_qualified(StatementKind::Insert, "insert into t (a) values (?), (?)");
        assert_not_qualified(StatementKind::Insert, "update t set a = ? where b = ?");
        assert_not_qualified(StatementKind::Upsert, "insert into t (a) values (?)");
        assert_not_qualified(StatementKind::Update, "update t set a = ?");
        assert_not_qualified(StatementKind::Update, "delete from t where a = ?");
    }

    #[test]
    fn test_rewrite_is_deterministic() {
        let sql = "update t set a = ? where b = ? and c = f(?, d)";
        assert_eq!(
            rewrite(sql, StatementKind::Update).unwrap(),
            rewrite(sql, StatementKind::Update).unwrap()
        );
    }
}
