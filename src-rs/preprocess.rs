use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

/// A statement with its `?` placeholders renumbered to `$1, $2, ...` for
/// the Postgres wire protocol.
pub struct PreprocessedSql<'a> {
    pub sql: Cow<'a, str>,
    pub param_count: usize,
}

lazy_static! {
    // Quoted text and comments are matched as a whole so that a `?` inside
    // them is left alone.
    static ref PARAM_OR_QUOTED: Regex = Regex::new(
        r#"(?s)'(?:[^']|'')*'|"(?:[^"]|"")*"|--[^\n]*|/\*.*?\*/|(?P<positional>\?)|(?P<numbered>\$\d+)"#
    )
    .unwrap();
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    MixedParamStyles,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MixedParamStyles => write!(
                f,
                "Mixing positional params (?) and numbered params (e.g. $1) is not supported"
            ),
        }
    }
}

impl std::error::Error for Error {}

pub fn preprocess_sql(sql: &str) -> Result<PreprocessedSql, Error> {
    let mut current: usize = 0;
    let mut has_numbered_params = false;

    let processed_sql = PARAM_OR_QUOTED.replace_all(sql, |captures: &Captures| {
        if captures.name("positional").is_some() {
            current += 1;
            format!("${}", current)
        } else {
            if captures.name("numbered").is_some() {
                has_numbered_params = true;
            }
            captures[0].to_string()
        }
    });

    if current > 0 && has_numbered_params {
        return Err(Error::MixedParamStyles);
    }
    if current == 0 {
        return Ok(PreprocessedSql {
            sql: Cow::Borrowed(sql),
            param_count: 0,
        });
    }
    Ok(PreprocessedSql {
        sql: processed_sql,
        param_count: current,
    })
}

#[test]
fn test_preprocess_sql() {
    let fail = preprocess_sql("SELECT ? $1");
    assert!(fail.is_err());

    let positional = preprocess_sql(
        "UPDATE t SET a = dt.p1 FROM (SELECT unnest(?) AS p1, unnest(?) AS p2) AS dt WHERE t.b = dt.p2",
    )
    .unwrap();
    assert_eq!(
        positional.sql,
        "UPDATE t SET a = dt.p1 FROM (SELECT unnest($1) AS p1, unnest($2) AS p2) AS dt WHERE t.b = dt.p2"
    );
    assert_eq!(positional.param_count, 2);

    let quoted = preprocess_sql("INSERT INTO t (a, \"b?\") SELECT unnest(?) AS a, 'why?' -- ?").unwrap();
    assert_eq!(
        quoted.sql,
        "INSERT INTO t (a, \"b?\") SELECT unnest($1) AS a, 'why?' -- ?"
    );
    assert_eq!(quoted.param_count, 1);

    let numbered = preprocess_sql("SELECT $2, $1::integer").unwrap();
    assert_eq!(numbered.sql, "SELECT $2, $1::integer");
    assert_eq!(numbered.param_count, 0);
}
