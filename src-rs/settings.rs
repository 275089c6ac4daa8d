use url::Url;

use crate::error::Error;
use crate::rewrite::StatementKind;

/// Controls which batched statements are rewritten and how the derived
/// table of a rewritten UPDATE is named.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewriteSettings {
    pub rewrite_inserts: bool,
    pub rewrite_upserts: bool,
    pub rewrite_updates: bool,
    /// Alias of the unnested derived table, `dt` in
    /// `FROM (SELECT unnest(?) AS p1) AS dt`
    pub derived_alias: String,
    /// Prefix of the derived table's columns, `p` in `p1, p2, ...`
    pub parameter_prefix: String,
}

impl Default for RewriteSettings {
    fn default() -> Self {
        Self {
            rewrite_inserts: true,
            rewrite_upserts: true,
            rewrite_updates: true,
            derived_alias: "dt".to_string(),
            parameter_prefix: "p".to_string(),
        }
    }
}

const REWRITE_PARAMS: [&str; 5] = [
    "rewriteBatchedInserts",
    "rewriteBatchedUpserts",
    "rewriteBatchedUpdates",
    "rewriteDerivedAlias",
    "rewriteParameterPrefix",
];

pub struct RewriteSettingsBuilder {
    settings: RewriteSettings,
}

fn parse_bool(value: &str, key: &str) -> Result<bool, Error> {
    match value {
        "1" | "true" | "TRUE" => Ok(true),
        "0" | "false" | "FALSE" => Ok(false),
        _ => Err(Error::InvalidSetting {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

// Both names end up unquoted in generated SQL
fn parse_name(value: &str, key: &str) -> Result<String, Error> {
    let mut chars = value.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(value.to_string())
    } else {
        Err(Error::InvalidSetting {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

impl RewriteSettings {
    pub fn builder() -> RewriteSettingsBuilder {
        RewriteSettingsBuilder {
            settings: RewriteSettings::default(),
        }
    }

    /// Reads the rewrite parameters from a connection url's query string.
    /// Parameters that are not about rewriting are ignored.
    pub fn from_dsn(dsn: &str) -> Result<Self, Error> {
        let url = Url::parse(dsn)?;
        let mut settings = RewriteSettings::default();

        for (k, v) in url.query_pairs() {
            let key = k.as_ref();
            let val = v.as_ref();

            match key {
                "rewriteBatchedInserts" => settings.rewrite_inserts = parse_bool(val, key)?,
                "rewriteBatchedUpserts" => settings.rewrite_upserts = parse_bool(val, key)?,
                "rewriteBatchedUpdates" => settings.rewrite_updates = parse_bool(val, key)?,
                "rewriteDerivedAlias" => settings.derived_alias = parse_name(val, key)?,
                "rewriteParameterPrefix" => settings.parameter_prefix = parse_name(val, key)?,
                _ => {}
            }
        }

        Ok(settings)
    }

    /// The connection url without the rewrite parameters, for clients that
    /// reject options they do not know.
    pub fn strip_dsn(dsn: &str) -> Result<String, Error> {
        let mut url = Url::parse(dsn)?;
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !REWRITE_PARAMS.contains(&k.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
        Ok(url.into())
    }

    pub fn is_enabled(&self, kind: StatementKind) -> bool {
        match kind {
            StatementKind::Insert => self.rewrite_inserts,
            StatementKind::Upsert => self.rewrite_upserts,
            StatementKind::Update => self.rewrite_updates,
        }
    }
}

impl RewriteSettingsBuilder {
    pub fn rewrite_inserts(mut self, enabled: bool) -> Self {
        self.settings.rewrite_inserts = enabled;
        self
    }
    pub fn rewrite_upserts(mut self, enabled: bool) -> Self {
        self.settings.rewrite_upserts = enabled;
        self
    }
    pub fn rewrite_updates(mut self, enabled: bool) -> Self {
        self.settings.rewrite_updates = enabled;
        self
    }
    pub fn derived_alias(mut self, alias: impl Into<String>) -> Self {
        self.settings.derived_alias = alias.into();
        self
    }
    pub fn parameter_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.settings.parameter_prefix = prefix.into();
        self
    }
    pub fn build(self) -> RewriteSettings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dsn() {
        let settings = RewriteSettings::from_dsn(
            "postgresql://root@localhost:26257/defaultdb?sslmode=disable&rewriteBatchedUpdates=false&rewriteDerivedAlias=_dt&rewriteParameterPrefix=param",
        )
        .unwrap();
        assert!(settings.rewrite_inserts);
        assert!(settings.rewrite_upserts);
        assert!(!settings.rewrite_updates);
        assert_eq!(settings.derived_alias, "_dt");
        assert_eq!(settings.parameter_prefix, "param");
        assert!(!settings.is_enabled(StatementKind::Update));
    }

    #[test]
    fn test_from_dsn_rejects_bad_values() {
        let err = RewriteSettings::from_dsn("postgresql://localhost/db?rewriteBatchedInserts=yes")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value \"yes\" for setting rewriteBatchedInserts"
        );
        assert!(RewriteSettings::from_dsn("postgresql://localhost/db?rewriteDerivedAlias=1dt").is_err());
        assert!(matches!(
            RewriteSettings::from_dsn("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_strip_dsn() {
        assert_eq!(
            RewriteSettings::strip_dsn(
                "postgresql://root@localhost:26257/defaultdb?rewriteBatchedInserts=false&sslmode=disable"
            )
            .unwrap(),
            "postgresql://root@localhost:26257/defaultdb?sslmode=disable"
        );
        assert_eq!(
            RewriteSettings::strip_dsn("postgresql://localhost/db?rewriteDerivedAlias=x").unwrap(),
            "postgresql://localhost/db"
        );
    }

    #[test]
    fn test_builder() {
        let settings = RewriteSettings::builder()
            .rewrite_inserts(false)
            .derived_alias("batch")
            .build();
        assert!(!settings.is_enabled(StatementKind::Insert));
        assert!(settings.is_enabled(StatementKind::Upsert));
        assert_eq!(settings.derived_alias, "batch");
        assert_eq!(settings.parameter_prefix, "p");
    }
}
