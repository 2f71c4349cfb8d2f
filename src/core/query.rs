//! Query types: sorting, paging and predicates over entity fields

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::core::entity::Entity;
use crate::core::field::FieldValue;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

/// A single sort key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

/// Ordered list of sort keys, applied left to right
///
/// # Format
/// - `field` or `field:asc` (ascending)
/// - `field:desc` (descending)
/// - several keys separated by commas: `enabled:desc,name`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub orders: Vec<Order>,
}

impl Sort {
    /// Sort ascending by one field
    pub fn asc(field: impl Into<String>) -> Self {
        Self::unsorted().and(field, Direction::Asc)
    }

    /// Sort descending by one field
    pub fn desc(field: impl Into<String>) -> Self {
        Self::unsorted().and(field, Direction::Desc)
    }

    /// No ordering
    pub fn unsorted() -> Self {
        Self { orders: Vec::new() }
    }

    /// Append a sort key
    pub fn and(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(Order {
            field: field.into(),
            direction,
        });
        self
    }

    /// Parse a sort expression such as `name:asc,created_at:desc`
    pub fn parse(expr: &str) -> Self {
        let orders = expr
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once(':') {
                Some((field, "desc")) => Order {
                    field: field.to_string(),
                    direction: Direction::Desc,
                },
                Some((field, _)) => Order {
                    field: field.to_string(),
                    direction: Direction::Asc,
                },
                None => Order {
                    field: part.to_string(),
                    direction: Direction::Asc,
                },
            })
            .collect();

        Self { orders }
    }

    /// Compare two entities under this sort
    ///
    /// Missing fields sort like null; incomparable values are treated as equal
    /// so the sort stays stable.
    pub fn compare<T: Entity>(&self, a: &T, b: &T) -> Ordering {
        for order in &self.orders {
            let left = a.field_value(&order.field).unwrap_or(FieldValue::Null);
            let right = b.field_value(&order.field).unwrap_or(FieldValue::Null);
            let ordering = left.compare(&right).unwrap_or(Ordering::Equal);
            let ordering = match order.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Sort a collection in place
    pub fn apply<T: Entity>(&self, data: &mut [T]) {
        if !self.orders.is_empty() {
            data.sort_by(|a, b| self.compare(a, b));
        }
    }
}

/// Page request (pages start at 1)
///
/// # Example
/// ```rust,ignore
/// // GET /plugins?page=2&limit=10&sort=name:asc
/// let request = PageRequest::new(2, 10).with_sort(Sort::asc("name"));
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
    pub sort: Sort,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            sort: Sort::unsorted(),
        }
    }
}

impl PageRequest {
    /// Create a page request
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page,
            limit,
            sort: Sort::unsorted(),
        }
    }

    /// Attach a sort
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Get page number, ensuring minimum of 1
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    /// Get limit, clamped to 1..=100
    pub fn limit(&self) -> usize {
        self.limit.clamp(1, 100)
    }

    /// Number of items skipped before this page
    pub fn offset(&self) -> usize {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// The paginated data
    pub content: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

impl<T> Page<T> {
    /// Slice a sorted, filtered collection into the requested page
    pub fn from_sorted(all: Vec<T>, request: &PageRequest) -> Self {
        let total = all.len();
        let content = all
            .into_iter()
            .skip(request.offset())
            .take(request.limit())
            .collect();

        Self {
            content,
            pagination: PaginationMeta::new(request.page(), request.limit(), total),
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaginationMeta {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create pagination metadata
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = total.div_ceil(limit);
        let start = (page - 1).saturating_mul(limit);

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: start.saturating_add(limit) < total,
            has_prev: page > 1,
        }
    }
}

/// Comparison operator in a predicate condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// One `field op value` condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: FieldValue,
}

/// Conjunction of field conditions evaluated against an entity
///
/// # Format (JSON)
/// - Exact match: `{"field": "value"}`
/// - Comparison: `{"field>": v, "field<": v, "field>=": v, "field<=": v, "field!=": v}`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    pub conditions: Vec<Condition>,
}

impl Predicate {
    /// A predicate that matches everything
    pub fn all() -> Self {
        Self::default()
    }

    fn with(mut self, field: impl Into<String>, operator: Operator, value: FieldValue) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            operator,
            value,
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.with(field, Operator::Eq, value)
    }

    pub fn ne(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.with(field, Operator::Ne, value)
    }

    pub fn gt(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.with(field, Operator::Gt, value)
    }

    pub fn gte(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.with(field, Operator::Gte, value)
    }

    pub fn lt(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.with(field, Operator::Lt, value)
    }

    pub fn lte(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.with(field, Operator::Lte, value)
    }

    /// Build a predicate from a JSON filter object; non-objects match everything
    pub fn from_json(filter: &Value) -> Self {
        let mut predicate = Self::all();
        let Some(obj) = filter.as_object() else {
            return predicate;
        };

        for (key, value) in obj {
            let value = FieldValue::from_json(value);
            // Two-character operators first so ">=" is not read as ">"
            let (field, operator) = if let Some(f) = key.strip_suffix(">=") {
                (f, Operator::Gte)
            } else if let Some(f) = key.strip_suffix("<=") {
                (f, Operator::Lte)
            } else if let Some(f) = key.strip_suffix("!=") {
                (f, Operator::Ne)
            } else if let Some(f) = key.strip_suffix('>') {
                (f, Operator::Gt)
            } else if let Some(f) = key.strip_suffix('<') {
                (f, Operator::Lt)
            } else {
                (key.as_str(), Operator::Eq)
            };
            predicate = predicate.with(field, operator, value);
        }

        predicate
    }

    /// Evaluate against an entity; a missing field compares as null
    pub fn matches<T: Entity>(&self, entity: &T) -> bool {
        self.conditions.iter().all(|condition| {
            let actual = entity
                .field_value(&condition.field)
                .unwrap_or(FieldValue::Null);
            let Some(ordering) = actual.compare(&condition.value) else {
                return condition.operator == Operator::Ne;
            };
            match condition.operator {
                Operator::Eq => ordering == Ordering::Equal,
                Operator::Ne => ordering != Ordering::Equal,
                Operator::Gt => ordering == Ordering::Greater,
                Operator::Gte => ordering != Ordering::Less,
                Operator::Lt => ordering == Ordering::Less,
                Operator::Lte => ordering != Ordering::Greater,
            }
        })
    }
}
