//! Field/value helpers and database identifiers shared by cfgmgr crates.

/// Database identifiers used by cfgmgr tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbId {
    /// Configuration database (CONFIG_DB) - source of configuration.
    ConfigDb,
    /// Application database (APPL_DB) - destination for processed config.
    ApplDb,
    /// State database (STATE_DB) - operational state tracking.
    StateDb,
}

impl DbId {
    /// Returns the database name as used in Redis/SONiC.
    pub fn name(&self) -> &'static str {
        match self {
            DbId::ConfigDb => "CONFIG_DB",
            DbId::ApplDb => "APPL_DB",
            DbId::StateDb => "STATE_DB",
        }
    }

    /// Returns the database ID number.
    pub fn id(&self) -> i64 {
        match self {
            DbId::ConfigDb => 4,
            DbId::ApplDb => 0,
            DbId::StateDb => 6,
        }
    }
}

/// Key separator used by CONFIG_DB for composite keys and table prefixes.
pub const KEY_SEPARATOR: char = '|';

/// Joins the parts of a composite key (`"1|Ethernet0"`).
pub fn join_key<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(&KEY_SEPARATOR.to_string())
}

/// Splits a composite key into its parts.
pub fn split_key(key: &str) -> Vec<&str> {
    key.split(KEY_SEPARATOR).collect()
}

/// Key-value tuple representing a field and its value.
pub type FieldValue = (String, String);

/// Collection of field-value pairs for a table entry.
pub type FieldValues = Vec<FieldValue>;

/// Helper trait for working with field-value collections.
pub trait FieldValuesExt {
    /// Gets the value for a field, if present.
    fn get_field(&self, field: &str) -> Option<&str>;

    /// Gets the value for a field, returning the default if not present.
    fn get_field_or<'a>(&'a self, field: &str, default: &'a str) -> &'a str;

    /// Checks if a field exists.
    fn has_field(&self, field: &str) -> bool;

    /// Sets a field, replacing an existing value in place.
    fn set_field(&mut self, field: &str, value: impl Into<String>);

    /// Removes a field, returning its previous value.
    fn remove_field(&mut self, field: &str) -> Option<String>;
}

impl FieldValuesExt for FieldValues {
    fn get_field(&self, field: &str) -> Option<&str> {
        self.iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    fn get_field_or<'a>(&'a self, field: &str, default: &'a str) -> &'a str {
        self.get_field(field).unwrap_or(default)
    }

    fn has_field(&self, field: &str) -> bool {
        self.iter().any(|(f, _)| f == field)
    }

    fn set_field(&mut self, field: &str, value: impl Into<String>) {
        let value = value.into();
        match self.iter_mut().find(|(f, _)| f == field) {
            Some((_, v)) => *v = value,
            None => self.push((field.to_string(), value)),
        }
    }

    fn remove_field(&mut self, field: &str) -> Option<String> {
        let idx = self.iter().position(|(f, _)| f == field)?;
        Some(self.remove(idx).1)
    }
}

/// Builds a FieldValues collection from key-value pairs.
#[macro_export]
macro_rules! field_values {
    ($($field:expr => $value:expr),* $(,)?) => {
        vec![
            $(($field.to_string(), $value.to_string()),)*
        ]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_id() {
        assert_eq!(DbId::ConfigDb.name(), "CONFIG_DB");
        assert_eq!(DbId::ConfigDb.id(), 4);
        assert_eq!(DbId::StateDb.id(), 6);
    }

    #[test]
    fn test_composite_keys() {
        assert_eq!(join_key(["1", "Ethernet0"]), "1|Ethernet0");
        assert_eq!(split_key("Vlan100|Ethernet4"), vec!["Vlan100", "Ethernet4"]);
        assert_eq!(split_key("Global"), vec!["Global"]);
    }

    #[test]
    fn test_field_values_ext() {
        let mut fvs: FieldValues = vec![
            ("cost".to_string(), "200".to_string()),
            ("root-guard".to_string(), "enabled".to_string()),
        ];

        assert_eq!(fvs.get_field("cost"), Some("200"));
        assert_eq!(fvs.get_field("nonexistent"), None);
        assert_eq!(fvs.get_field_or("edge-port", "false"), "false");
        assert!(fvs.has_field("root-guard"));

        fvs.set_field("cost", "400");
        fvs.set_field("edge-port", "auto");
        assert_eq!(fvs.get_field("cost"), Some("400"));
        assert_eq!(fvs.len(), 3);

        assert_eq!(fvs.remove_field("root-guard"), Some("enabled".to_string()));
        assert_eq!(fvs.remove_field("root-guard"), None);
        assert_eq!(fvs.len(), 2);
    }

    #[test]
    fn test_field_values_macro() {
        let fvs: FieldValues = field_values! {
            "value" => 15,
            "mode" => "rstp",
        };

        assert_eq!(fvs.len(), 2);
        assert_eq!(fvs.get_field("value"), Some("15"));
    }
}
