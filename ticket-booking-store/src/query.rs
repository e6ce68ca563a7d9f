use core::fmt::{self, Display, Write as _};

use serde_json::Value;

use crate::Item;

/// The subset of OData `$filter` expressions the booking views need.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Self::Eq(field, value) => item.get(field) == Some(value),
            Self::And(left, right) => left.matches(item) && right.matches(item),
            Self::Or(left, right) => left.matches(item) || right.matches(item),
        }
    }
}

/// Quotes a string literal, doubling single quotes.
pub fn odata_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn write_operand(f: &mut fmt::Formatter<'_>, filter: &Filter) -> fmt::Result {
    match filter {
        Filter::Eq(..) => write!(f, "{filter}"),
        Filter::And(..) | Filter::Or(..) => write!(f, "({filter})"),
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq(field, value) => {
                f.write_str(field)?;
                f.write_str(" eq ")?;
                match value {
                    Value::String(string) => f.write_str(&odata_string(string)),
                    Value::Null => f.write_str("null"),
                    other => write!(f, "{other}"),
                }
            }
            Self::And(left, right) => {
                write_operand(f, left)?;
                f.write_str(" and ")?;
                write_operand(f, right)
            }
            Self::Or(left, right) => {
                write_operand(f, left)?;
                f.write_str(" or ")?;
                write_operand(f, right)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<Filter>,
    pub select: Vec<String>,
    pub expand: Vec<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(fields.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn expand(mut self, field: impl Into<String>) -> Self {
        self.expand.push(field.into());
        self
    }

    /// Renders the query string (without the leading `?`). Spaces are sent as `%20`.
    pub fn to_query_string(&self) -> String {
        let mut pairs = Vec::new();
        if let Some(filter) = &self.filter {
            pairs.push(("$filter", filter.to_string()));
        }
        if !self.select.is_empty() {
            pairs.push(("$select", self.select.join(",")));
        }
        if !self.expand.is_empty() {
            pairs.push(("$expand", self.expand.join(",")));
        }
        let mut out = String::new();
        for (key, value) in pairs {
            if !out.is_empty() {
                out.push('&');
            }
            let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
            // byte_serialize turns a literal '+' into %2B, so every '+' left is a space
            let _ = write!(out, "{key}={}", encoded.replace('+', "%20"));
        }
        out
    }
}
