//! Backend-neutral filter trees and their index-document serialization.
//!
//! A tree has three clause groups: `should` (any may match), `must` (all must
//! match) and `not` (none may match), plus an optional descending sort. The
//! serialized document follows the Lucene index layout:
//!
//! ```json
//! {"filter":{"should":[...],"not":[...]},"query":{"must":[...]},"sort":{"field":"f","reverse":true}}
//! ```
//!
//! Empty groups never appear in the document.

use serde::Serialize;

use crate::error::StoreResult;
use crate::value::Value;

/// A single leaf condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Predicate {
    Match {
        field: String,
        value: Value,
    },
    Phrase {
        field: String,
        value: String,
    },
    Prefix {
        field: String,
        value: String,
    },
    /// `*` matches any run of characters.
    Wildcard {
        field: String,
        value: String,
    },
    Range {
        field: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        lower: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        upper: Option<Value>,
        include_lower: bool,
        include_upper: bool,
    },
    Contains {
        field: String,
        values: Vec<Value>,
    },
}

impl Predicate {
    pub fn matches(field: &str, value: Value) -> Self {
        Predicate::Match {
            field: field.to_string(),
            value,
        }
    }

    pub fn phrase(field: &str, value: &str) -> Self {
        Predicate::Phrase {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn prefix(field: &str, value: &str) -> Self {
        Predicate::Prefix {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn wildcard(field: &str, value: &str) -> Self {
        Predicate::Wildcard {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Range with an exclusive lower and an inclusive upper bound.
    pub fn range(field: &str, lower: Option<Value>, upper: Option<Value>) -> Self {
        Predicate::Range {
            field: field.to_string(),
            lower,
            upper,
            include_lower: false,
            include_upper: true,
        }
    }

    pub fn contains(field: &str, values: Vec<Value>) -> Self {
        Predicate::Contains {
            field: field.to_string(),
            values,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Predicate::Match { field, .. }
            | Predicate::Phrase { field, .. }
            | Predicate::Prefix { field, .. }
            | Predicate::Wildcard { field, .. }
            | Predicate::Range { field, .. }
            | Predicate::Contains { field, .. } => field,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterTree {
    should: Vec<Predicate>,
    must: Vec<Predicate>,
    not: Vec<Predicate>,
    sort: Option<SortField>,
}

impl FilterTree {
    pub fn builder() -> FilterTreeBuilder {
        FilterTreeBuilder::default()
    }

    pub fn should(&self) -> &[Predicate] {
        &self.should
    }

    pub fn must(&self) -> &[Predicate] {
        &self.must
    }

    pub fn not(&self) -> &[Predicate] {
        &self.not
    }

    pub fn sort(&self) -> Option<&SortField> {
        self.sort.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.should.is_empty() && self.must.is_empty() && self.not.is_empty() && self.sort.is_none()
    }

    /// Every field the tree filters or sorts on, first occurrence first.
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        let predicates = self.should.iter().chain(&self.must).chain(&self.not);
        let names = predicates
            .map(Predicate::field)
            .chain(self.sort.iter().map(|s| s.field.as_str()));
        for name in names {
            if !fields.contains(&name) {
                fields.push(name);
            }
        }
        fields
    }

    pub fn to_document(&self) -> StoreResult<serde_json::Value> {
        Ok(serde_json::to_value(Document::from(self))?)
    }

    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string(&Document::from(self))?)
    }
}

#[derive(Serialize)]
struct Document<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Clauses<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<Clauses<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<SortDocument<'a>>,
}

#[derive(Serialize)]
struct Clauses<'a> {
    #[serde(skip_serializing_if = "is_empty")]
    should: &'a [Predicate],
    #[serde(skip_serializing_if = "is_empty")]
    must: &'a [Predicate],
    #[serde(skip_serializing_if = "is_empty")]
    not: &'a [Predicate],
}

fn is_empty(predicates: &&[Predicate]) -> bool {
    predicates.is_empty()
}

#[derive(Serialize)]
struct SortDocument<'a> {
    field: &'a str,
    reverse: bool,
}

impl<'a> From<&'a FilterTree> for Document<'a> {
    fn from(tree: &'a FilterTree) -> Self {
        let filter = (!tree.should.is_empty() || !tree.not.is_empty()).then(|| Clauses {
            should: &tree.should,
            must: &[],
            not: &tree.not,
        });
        let query = (!tree.must.is_empty()).then(|| Clauses {
            should: &[],
            must: &tree.must,
            not: &[],
        });
        let sort = tree.sort.as_ref().map(|s| SortDocument {
            field: &s.field,
            reverse: s.descending,
        });
        Document {
            filter,
            query,
            sort,
        }
    }
}

/// Builds a [`FilterTree`]; absent conditions are simply not added.
#[derive(Debug, Default)]
pub struct FilterTreeBuilder {
    tree: FilterTree,
}

impl FilterTreeBuilder {
    pub fn should(mut self, predicate: Predicate) -> Self {
        self.tree.should.push(predicate);
        self
    }

    pub fn should_all(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.tree.should.extend(predicates);
        self
    }

    pub fn must(mut self, predicate: Predicate) -> Self {
        self.tree.must.push(predicate);
        self
    }

    pub fn must_opt(self, predicate: Option<Predicate>) -> Self {
        match predicate {
            Some(p) => self.must(p),
            None => self,
        }
    }

    pub fn not(mut self, predicate: Predicate) -> Self {
        self.tree.not.push(predicate);
        self
    }

    pub fn not_opt(self, predicate: Option<Predicate>) -> Self {
        match predicate {
            Some(p) => self.not(p),
            None => self,
        }
    }

    /// Sort descending on `field`; blank names are ignored.
    pub fn sort_desc(mut self, field: Option<&str>) -> Self {
        if let Some(field) = field.map(str::trim).filter(|f| !f.is_empty()) {
            self.tree.sort = Some(SortField {
                field: field.to_lowercase(),
                descending: true,
            });
        }
        self
    }

    pub fn build(self) -> FilterTree {
        self.tree
    }
}
