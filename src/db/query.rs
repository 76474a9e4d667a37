use chrono::NaiveDate;

use super::DataError;

/// A value bound to a named placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Int(i64),
    Text(String),
    Date(NaiveDate),
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl From<NaiveDate> for Param {
    fn from(v: NaiveDate) -> Self {
        Param::Date(v)
    }
}

/// A query template with `:name` placeholders and the values bound to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    template: &'static str,
    params: Vec<(&'static str, Param)>,
}

impl Query {
    pub fn new(template: &'static str) -> Self {
        Self {
            template,
            params: Vec::new(),
        }
    }

    /// Binds `value` to the placeholder `:name`, replacing any earlier value.
    pub fn bind(mut self, name: &'static str, value: impl Into<Param>) -> Self {
        let value = value.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.params.push((name, value)),
        }
        self
    }

    pub fn template(&self) -> &'static str {
        self.template
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Rewrites named placeholders into positional `?` markers and returns the
    /// values in the order the driver must bind them.
    ///
    /// Placeholders inside single-quoted literals are left alone. A
    /// placeholder without a bound value is a [`DataError::Query`].
    pub fn bind_positional(&self) -> Result<(String, Vec<Param>), DataError> {
        let mut sql = String::with_capacity(self.template.len());
        let mut ordered = Vec::new();
        let mut in_literal = false;
        let mut chars = self.template.char_indices().peekable();

        while let Some((idx, ch)) = chars.next() {
            if ch == '\'' {
                in_literal = !in_literal;
                sql.push(ch);
                continue;
            }

            let starts_name = chars
                .peek()
                .is_some_and(|(_, next)| next.is_ascii_alphabetic() || *next == '_');
            if in_literal || ch != ':' || !starts_name {
                sql.push(ch);
                continue;
            }

            let start = idx + 1;
            let mut end = start;
            while let Some((i, c)) = chars.peek().copied() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    end = i + c.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }

            let name = &self.template[start..end];
            let value = self
                .param(name)
                .ok_or_else(|| DataError::Query(format!("no value bound for :{name}")))?;
            ordered.push(value.clone());
            sql.push('?');
        }

        Ok((sql, ordered))
    }
}
