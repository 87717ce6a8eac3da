//! Search filters and their translation into backend query text.
//!
//! A [`SearchFilter`] is first turned into a [`FilterTree`] for one
//! [`SearchTarget`]. The tree is then rendered either as a parameterized
//! `WHERE`/`ORDER BY` clause ([`render_sql`]) or as a Lucene document embedded
//! in an `expr(<table>_index, '...')` condition ([`render_lucene`]).

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::StoreResult;
use crate::filter::{FilterTree, Predicate};
use crate::row::FieldIndexTable;
use crate::statement::{ParamWriter, Statement};
use crate::value::{FieldKind, Value};

const TEXT_FIELDS: [&str; 2] = ["title", "description"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget {
    Channel,
    Playlist,
    Video,
}

impl SearchTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTarget::Channel => "channel",
            SearchTarget::Playlist => "playlist",
            SearchTarget::Video => "video",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationBucket {
    /// Up to 4 minutes
    Short,
    /// 4 to 20 minutes
    Medium,
    /// Over 20 minutes
    Long,
}

impl DurationBucket {
    /// `None` for unknown names, including `any`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "short" => Some(DurationBucket::Short),
            "medium" => Some(DurationBucket::Medium),
            "long" => Some(DurationBucket::Long),
            _ => None,
        }
    }

    fn predicate(&self) -> Predicate {
        let (lower, upper) = match self {
            DurationBucket::Short => (None, Some(240)),
            DurationBucket::Medium => (Some(240), Some(1200)),
            DurationBucket::Long => (Some(1200), None),
        };
        Predicate::range("duration", lower.map(Value::Int), upper.map(Value::Int))
    }
}

/// Caller-facing search parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchFilter {
    pub q: Option<String>,
    pub id: Option<String>,
    pub channel_id: Option<String>,
    pub category_id: Option<String>,
    pub channel_type: Option<String>,
    pub topic_id: Option<String>,
    pub region_code: Option<String>,
    pub relevance_language: Option<String>,
    /// Inclusive upper bound on `publishedat`
    pub published_before: Option<DateTime<Utc>>,
    /// Exclusive lower bound on `publishedat`
    pub published_after: Option<DateTime<Utc>>,
    pub video_duration: Option<DurationBucket>,
    /// Always applied descending
    pub sort: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn text_value(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn equals(field: &str, value: Option<&str>) -> Option<Predicate> {
    value.map(|v| Predicate::matches(field, text_value(v)))
}

/// The ten `should` predicates a free-text query expands to.
pub fn text_query(q: &str) -> Vec<Predicate> {
    TEXT_FIELDS
        .iter()
        .flat_map(|field| {
            [
                Predicate::phrase(field, q),
                Predicate::prefix(field, q),
                Predicate::wildcard(field, &format!("*{}", q)),
                Predicate::wildcard(field, &format!("{}*", q)),
                Predicate::wildcard(field, &format!("*{}*", q)),
            ]
        })
        .collect()
}

impl SearchFilter {
    pub fn to_filter_tree(&self, target: SearchTarget) -> FilterTree {
        let mut builder = FilterTree::builder();
        if let Some(q) = non_blank(&self.q) {
            builder = builder.should_all(text_query(q));
        }

        builder = builder.must_opt(equals("id", non_blank(&self.id)));
        let channel_id = non_blank(&self.channel_id);
        let region = non_blank(&self.region_code);
        builder = match target {
            SearchTarget::Channel => builder
                .must_opt(equals("id", channel_id))
                .must_opt(equals("country", region)),
            SearchTarget::Playlist => builder.must_opt(equals("channelid", channel_id)),
            SearchTarget::Video => builder
                .must_opt(equals("channelid", channel_id))
                .not_opt(region.map(|r| Predicate::contains("blockedregions", vec![text_value(r)]))),
        };

        builder = builder
            .must_opt(equals("categoryid", non_blank(&self.category_id)))
            .must_opt(equals("channeltype", non_blank(&self.channel_type)))
            .must_opt(equals("topicid", non_blank(&self.topic_id)))
            .must_opt(equals("relevancelanguage", non_blank(&self.relevance_language)))
            .must_opt(self.published_range());

        if target == SearchTarget::Video {
            builder = builder.must_opt(self.video_duration.map(|d| d.predicate()));
        }

        builder.sort_desc(self.sort.as_deref()).build()
    }

    fn published_range(&self) -> Option<Predicate> {
        if self.published_after.is_none() && self.published_before.is_none() {
            return None;
        }
        let bound = |ts: DateTime<Utc>| Value::Timestamp(ts.trunc_subsecs(0));
        Some(Predicate::range(
            "publishedat",
            self.published_after.map(bound),
            self.published_before.map(bound),
        ))
    }
}

/// Everything needed to render one search.
#[derive(Debug, Clone, Copy)]
pub struct SearchQuery<'a> {
    pub table: &'a str,
    pub fields: &'a FieldIndexTable,
    pub projection: &'a str,
    pub tree: &'a FilterTree,
}

/// Reject trees that filter or sort on columns the record does not have.
pub fn validate_tree(tree: &FilterTree, fields: &FieldIndexTable) -> StoreResult<()> {
    for field in tree.referenced_fields() {
        fields.resolve(field)?;
    }
    Ok(())
}

/// Column list for a select.
///
/// An empty request selects `*`. Otherwise every requested name must exist,
/// and `required` columns missing from the request are appended.
pub fn build_projection(
    fields: &FieldIndexTable,
    requested: &[String],
    required: &[&str],
) -> StoreResult<String> {
    let requested: Vec<&str> = requested
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .collect();
    if requested.is_empty() {
        return Ok("*".to_string());
    }

    let mut columns: Vec<String> = Vec::new();
    for name in requested.into_iter().chain(required.iter().copied()) {
        let column = fields.resolve(name)?;
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    Ok(columns.join(","))
}

/// `select ... from t where expr(t_index, '<document>')`
pub fn render_lucene(query: &SearchQuery<'_>) -> StoreResult<Statement> {
    validate_tree(query.tree, query.fields)?;

    let mut text = format!("select {} from {}", query.projection, query.table);
    if !query.tree.is_empty() {
        let document = query.tree.to_json()?.replace('\'', "''");
        text.push_str(&format!(" where expr({}_index,'{}')", query.table, document));
    }
    Ok(Statement::new(text))
}

/// `select ... from t where ... order by f desc` with bound parameters.
pub fn render_sql<D: Dialect>(dialect: &D, query: &SearchQuery<'_>) -> StoreResult<Statement> {
    let mut writer = ParamWriter::new(dialect);
    let mut conditions = Vec::new();

    if let Some(group) = render_should(&mut writer, query.fields, query.tree.should())? {
        conditions.push(group);
    }
    for predicate in query.tree.must() {
        conditions.extend(render_predicate(&mut writer, query.fields, predicate, false)?);
    }
    for predicate in query.tree.not() {
        conditions.extend(render_predicate(&mut writer, query.fields, predicate, true)?);
    }

    let mut text = format!("select {} from {}", query.projection, query.table);
    if !conditions.is_empty() {
        text.push_str(" where ");
        text.push_str(&conditions.join(" and "));
    }
    if let Some(sort) = query.tree.sort() {
        let column = query.fields.resolve(&sort.field)?;
        let direction = if sort.descending { "desc" } else { "asc" };
        text.push_str(&format!(" order by {} {}", column, direction));
    }

    Ok(Statement::with_params(text, writer.into_params()))
}

/// Integers are inlined, everything else is bound.
fn operand<D: Dialect>(writer: &mut ParamWriter<'_, D>, value: &Value) -> String {
    match value {
        Value::Int(i) => i.to_string(),
        other => writer.bind(other.clone()),
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' | '%' | '_' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '*' => escaped.push('%'),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Text predicate as `(core, open at start, open at end)`.
fn like_shape(predicate: &Predicate) -> Option<(&str, bool, bool)> {
    match predicate {
        Predicate::Phrase { value, .. } => Some((value, true, true)),
        Predicate::Prefix { value, .. } => Some((value, false, true)),
        Predicate::Wildcard { value, .. } => {
            let leading = value.starts_with('*');
            let rest = value.strip_prefix('*').unwrap_or(value);
            let trailing = rest.ends_with('*');
            let core = rest.strip_suffix('*').unwrap_or(rest);
            Some((core, leading, trailing))
        }
        _ => None,
    }
}

fn like_pattern(core: &str, leading: bool, trailing: bool) -> String {
    format!(
        "{}{}{}",
        if leading { "%" } else { "" },
        escape_like(core),
        if trailing { "%" } else { "" }
    )
}

/// OR group; text predicates subsumed by a `%core%` match on the same field
/// collapse into it.
fn render_should<D: Dialect>(
    writer: &mut ParamWriter<'_, D>,
    fields: &FieldIndexTable,
    predicates: &[Predicate],
) -> StoreResult<Option<String>> {
    let open: Vec<(&str, &str)> = predicates
        .iter()
        .filter_map(|p| match like_shape(p) {
            Some((core, true, true)) => Some((p.field(), core)),
            _ => None,
        })
        .collect();

    let mut emitted: Vec<(String, String)> = Vec::new();
    let mut parts = Vec::new();
    for predicate in predicates {
        let Some((core, leading, trailing)) = like_shape(predicate) else {
            parts.extend(render_predicate(writer, fields, predicate, false)?);
            continue;
        };
        let column = fields.resolve(predicate.field())?;
        let (leading, trailing) = if open.contains(&(predicate.field(), core)) {
            (true, true)
        } else {
            (leading, trailing)
        };
        let pattern = like_pattern(core, leading, trailing);
        if emitted.iter().any(|(c, p)| *c == column && *p == pattern) {
            continue;
        }
        let placeholder = writer.bind(Value::Text(pattern.clone()));
        parts.push(format!("{} ilike {}", column, placeholder));
        emitted.push((column, pattern));
    }

    Ok(match parts.len() {
        0 => None,
        _ => Some(format!("({})", parts.join(" or "))),
    })
}

fn render_predicate<D: Dialect>(
    writer: &mut ParamWriter<'_, D>,
    fields: &FieldIndexTable,
    predicate: &Predicate,
    negated: bool,
) -> StoreResult<Option<String>> {
    let column = fields.resolve(predicate.field())?;
    let rendered = match predicate {
        Predicate::Match { value, .. } => {
            let op = if negated { "<>" } else { "=" };
            Some(format!("{} {} {}", column, op, operand(writer, value)))
        }
        Predicate::Phrase { .. } | Predicate::Prefix { .. } | Predicate::Wildcard { .. } => {
            let (core, leading, trailing) = like_shape(predicate).unwrap_or_default();
            let placeholder = writer.bind(Value::Text(like_pattern(core, leading, trailing)));
            let op = if negated { "not ilike" } else { "ilike" };
            Some(format!("{} {} {}", column, op, placeholder))
        }
        Predicate::Range {
            lower,
            upper,
            include_lower,
            include_upper,
            ..
        } => {
            let mut bounds = Vec::new();
            if let Some(lower) = lower {
                let op = if *include_lower { ">=" } else { ">" };
                bounds.push(format!("{} {} {}", column, op, operand(writer, lower)));
            }
            if let Some(upper) = upper {
                let op = if *include_upper { "<=" } else { "<" };
                bounds.push(format!("{} {} {}", column, op, operand(writer, upper)));
            }
            match (bounds.len(), negated) {
                (0, _) => None,
                (1, false) => bounds.pop(),
                (_, false) => Some(format!("({})", bounds.join(" and "))),
                (_, true) => Some(format!("not ({})", bounds.join(" and "))),
            }
        }
        Predicate::Contains { values, .. } if values.is_empty() => None,
        Predicate::Contains { values, .. } => {
            let is_list = matches!(fields.lookup(&column), Some((_, FieldKind::TextList)));
            let operands: Vec<String> = values.iter().map(|v| operand(writer, v)).collect();
            Some(match (is_list, negated) {
                (true, false) => {
                    let any: Vec<String> = operands
                        .iter()
                        .map(|op| format!("{} = any({})", op, column))
                        .collect();
                    if any.len() == 1 {
                        any.join("")
                    } else {
                        format!("({})", any.join(" or "))
                    }
                }
                (true, true) => operands
                    .iter()
                    .map(|op| format!("({} is null or {} <> all({}))", column, op, column))
                    .collect::<Vec<_>>()
                    .join(" and "),
                (false, false) => format!("{} in ({})", column, operands.join(",")),
                (false, true) => format!("{} not in ({})", column, operands.join(",")),
            })
        }
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Cassandra, Postgres};
    use chrono::TimeZone;
    use serde_json::json;

    #[derive(Debug, Default)]
    struct Video {
        id: String,
        title: String,
        description: String,
        channel_id: String,
        category_id: String,
        duration: i64,
        tags: Vec<String>,
        blocked_regions: Vec<String>,
        published_at: DateTime<Utc>,
    }

    crate::impl_record!(Video => "video" {
        id: "id" [key],
        title: "title",
        description: "description",
        channel_id: "channelid",
        category_id: "categoryid",
        duration: "duration",
        tags: "tags",
        blocked_regions: "blockedregions",
        published_at: "publishedat",
    });

    fn fields() -> FieldIndexTable {
        FieldIndexTable::build::<Video>().unwrap()
    }

    fn query<'a>(fields: &'a FieldIndexTable, tree: &'a FilterTree) -> SearchQuery<'a> {
        SearchQuery {
            table: "video",
            fields,
            projection: "*",
            tree,
        }
    }

    #[test]
    fn test_free_text_with_sort() {
        let filter = SearchFilter {
            q: Some("cats".into()),
            sort: Some("publishedAt".into()),
            ..Default::default()
        };
        let tree = filter.to_filter_tree(SearchTarget::Video);
        assert_eq!(tree.should().len(), 10);
        assert_eq!(tree.should().iter().filter(|p| p.field() == "title").count(), 5);

        let document = tree.to_document().unwrap();
        assert_eq!(document["sort"], json!({"field": "publishedat", "reverse": true}));
        assert!(document.get("query").is_none());
        assert!(document["filter"].get("not").is_none());
    }

    #[test]
    fn test_free_text_sql_collapses_to_contains() {
        let filter = SearchFilter {
            q: Some("50%_off".into()),
            sort: Some("publishedat".into()),
            ..Default::default()
        };
        let tree = filter.to_filter_tree(SearchTarget::Video);
        let fields = fields();
        let stmt = render_sql(&Postgres, &query(&fields, &tree)).unwrap();
        assert_eq!(
            stmt.text,
            "select * from video where (title ilike $1 or description ilike $2) order by publishedat desc"
        );
        assert_eq!(stmt.params, vec![
            Value::Text("%50\\%\\_off%".into()),
            Value::Text("%50\\%\\_off%".into()),
        ]);
    }

    #[test]
    fn test_region_exclusion_and_duration() {
        let filter = SearchFilter {
            channel_id: Some("UC1".into()),
            region_code: Some("US".into()),
            video_duration: Some(DurationBucket::Medium),
            ..Default::default()
        };
        let tree = filter.to_filter_tree(SearchTarget::Video);
        let fields = fields();
        let stmt = render_sql(&Postgres, &query(&fields, &tree)).unwrap();
        assert_eq!(
            stmt.text,
            "select * from video where channelid = $1 and (duration > 240 and duration <= 1200) \
             and (blockedregions is null or $2 <> all(blockedregions))"
        );
        assert_eq!(stmt.params, vec![Value::Text("UC1".into()), Value::Text("US".into())]);
    }

    #[test]
    fn test_published_bounds() {
        let after = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2020, 2, 1, 12, 30, 0).unwrap();
        let filter = SearchFilter {
            published_after: Some(after),
            published_before: Some(before),
            ..Default::default()
        };
        let tree = filter.to_filter_tree(SearchTarget::Playlist);
        assert_eq!(
            tree.to_document().unwrap()["query"]["must"][0],
            json!({"type": "range", "field": "publishedat",
                   "lower": "2020-01-01 00:00:00", "upper": "2020-02-01 12:30:00",
                   "include_lower": false, "include_upper": true})
        );

        let fields = fields();
        let stmt = render_sql(&Postgres, &query(&fields, &tree)).unwrap();
        assert!(stmt.text.ends_with("where (publishedat > $1 and publishedat <= $2)"));
        assert_eq!(stmt.params, vec![Value::Timestamp(after), Value::Timestamp(before)]);
    }

    #[test]
    fn test_short_and_long_buckets() {
        let fields = fields();
        for (bucket, expected) in [
            (DurationBucket::Short, "where duration <= 240"),
            (DurationBucket::Long, "where duration > 1200"),
        ] {
            let tree = SearchFilter {
                video_duration: Some(bucket),
                ..Default::default()
            }
            .to_filter_tree(SearchTarget::Video);
            let stmt = render_sql(&Postgres, &query(&fields, &tree)).unwrap();
            assert!(stmt.text.ends_with(expected), "{}", stmt.text);
            assert!(stmt.params.is_empty());
        }
    }

    #[test]
    fn test_related_tags_render_any() {
        let tree = FilterTree::builder()
            .should(Predicate::contains("tags", vec![text_value("a")]))
            .should(Predicate::contains("tags", vec![text_value("b")]))
            .not(Predicate::matches("id", text_value("v1")))
            .build();
        let fields = fields();
        let stmt = render_sql(&Postgres, &query(&fields, &tree)).unwrap();
        assert_eq!(
            stmt.text,
            "select * from video where ($1 = any(tags) or $2 = any(tags)) and id <> $3"
        );
    }

    #[test]
    fn test_scalar_contains_renders_in_list() {
        let tree = FilterTree::builder()
            .must(Predicate::contains("id", vec![text_value("a"), text_value("b")]))
            .build();
        let fields = fields();
        let stmt = render_sql(&Postgres, &query(&fields, &tree)).unwrap();
        assert_eq!(stmt.text, "select * from video where id in ($1,$2)");
    }

    #[test]
    fn test_lucene_embedding_escapes_quotes() {
        let tree = SearchFilter {
            q: Some("rock'n'roll".into()),
            ..Default::default()
        }
        .to_filter_tree(SearchTarget::Video);
        let fields = fields();
        let stmt = Cassandra.render_search(&query(&fields, &tree)).unwrap();
        assert!(stmt.text.starts_with("select * from video where expr(video_index,'{\"filter\""));
        assert!(stmt.text.contains("rock''n''roll"));
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_lucene_without_conditions() {
        let tree = FilterTree::default();
        let fields = fields();
        let stmt = render_lucene(&query(&fields, &tree)).unwrap();
        assert_eq!(stmt.text, "select * from video");
    }

    #[test]
    fn test_unknown_sort_is_client_error() {
        let tree = SearchFilter {
            sort: Some("rating".into()),
            ..Default::default()
        }
        .to_filter_tree(SearchTarget::Video);
        let fields = fields();
        assert!(render_sql(&Postgres, &query(&fields, &tree))
            .unwrap_err()
            .is_client_error());
        assert!(render_lucene(&query(&fields, &tree))
            .unwrap_err()
            .is_client_error());
    }

    #[test]
    fn test_projection() {
        let fields = fields();
        assert_eq!(build_projection(&fields, &[], &["id"]).unwrap(), "*");
        assert_eq!(
            build_projection(&fields, &["Title".into(), "id".into()], &["id", "publishedat"]).unwrap(),
            "title,id,publishedat"
        );
        assert!(build_projection(&fields, &["rating".into()], &[])
            .unwrap_err()
            .is_client_error());
    }

    #[test]
    fn test_duration_bucket_parse() {
        assert_eq!(DurationBucket::parse("Short"), Some(DurationBucket::Short));
        assert_eq!(DurationBucket::parse("any"), None);
    }
}
