//! Collection queries
//!
//! A query names one collection and optionally narrows it with a single
//! filter, an order-by field and a limit. The same query value is used for
//! a one-shot fetch and for a live subscription, so both see the same window.

use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Store-level cap on the values of one any-of filter
pub const MAX_ANY_OF_VALUES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Field equals value
    Eq { field: String, value: Value },
    /// Array field contains at least one of the values
    ArrayContainsAny { field: String, values: Vec<Value> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub collection: String,
    pub filter: Option<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filter: None,
            order_by: None,
            limit: None,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = Some(Filter::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn where_array_contains_any(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.filter = Some(Filter::ArrayContainsAny {
            field: field.into(),
            values,
        });
        self
    }

    /// Reject queries the backend would refuse
    pub fn validate(&self) -> StoreResult<()> {
        if let Some(Filter::ArrayContainsAny { values, .. }) = &self.filter {
            if values.is_empty() {
                return Err(StoreError::Rejected(
                    "array-contains-any requires at least one value".to_string(),
                ));
            }
            if values.len() > MAX_ANY_OF_VALUES {
                return Err(StoreError::Rejected(format!(
                    "array-contains-any supports at most {} values, got {}",
                    MAX_ANY_OF_VALUES,
                    values.len()
                )));
            }
        }
        if self.limit == Some(0) {
            return Err(StoreError::Rejected("limit must be positive".to_string()));
        }
        Ok(())
    }

    /// Whether a document passes the filter and has the order-by field
    pub(crate) fn matches(&self, doc: &Document) -> bool {
        if let Some(order) = &self.order_by {
            // Documents without the order-by field are outside the index
            if !doc.fields.contains_key(&order.field) {
                return false;
            }
        }

        match &self.filter {
            None => true,
            Some(Filter::Eq { field, value }) => doc.get(field) == Some(value),
            Some(Filter::ArrayContainsAny { field, values }) => match doc.get(field) {
                Some(Value::Array(items)) => items.iter().any(|item| values.contains(item)),
                _ => false,
            },
        }
    }

    /// Sort matching documents and cut them to the limit
    pub(crate) fn window(&self, mut docs: Vec<Document>) -> Vec<Document> {
        docs.retain(|doc| self.matches(doc));

        if let Some(order) = &self.order_by {
            docs.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.field), b.get(&order.field))
                    .then_with(|| a.id.cmp(&b.id));
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        } else {
            docs.sort_by(|a, b| a.id.cmp(&b.id));
        }

        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }
        docs
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: by type first, then by value
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let null = Value::Null;
    let a = a.unwrap_or(&null);
    let b = b.unwrap_or(&null);

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ordering = compare_values(Some(left), Some(right));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
