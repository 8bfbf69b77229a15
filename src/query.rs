use serde::Serialize;
use serde_json::{Value, json};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortSpec {
    pub attr: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(attr: impl Into<String>, order: SortOrder) -> Self {
        Self { attr: attr.into(), order }
    }

    /// `+attr` sorts ascending, `-attr` and bare `attr` descending. Absent,
    /// empty, or non-permitted attributes yield `default`.
    pub fn parse(raw: Option<&str>, permitted: &[&str], default: SortSpec) -> SortSpec {
        let Some(raw) = raw.map(str::trim_end).filter(|s| !s.trim_start().is_empty()) else {
            return default;
        };

        // A `+` in a form-encoded query string reaches us as a space.
        let (attr, order) = if let Some(attr) = raw.strip_prefix(['+', ' ']) {
            (attr.trim_start(), SortOrder::Asc)
        } else if let Some(attr) = raw.strip_prefix('-') {
            (attr, SortOrder::Desc)
        } else {
            (raw, SortOrder::Desc)
        };

        if !permitted.contains(&attr) {
            tracing::debug!(sort = %raw, "unsupported sort attribute, using default");
            return default;
        }

        SortSpec::new(attr, order)
    }

    pub fn to_index(&self) -> Value {
        json!([{ self.attr.as_str(): { "order": self.order.as_str() } }])
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterAttr {
    Genre,
    Actor,
    Director,
    Writer,
}

impl FilterAttr {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "genre" => Some(FilterAttr::Genre),
            "actor" => Some(FilterAttr::Actor),
            "director" => Some(FilterAttr::Director),
            "writer" => Some(FilterAttr::Writer),
            _ => None,
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            FilterAttr::Genre => "genres",
            FilterAttr::Actor => "actors",
            FilterAttr::Director => "directors",
            FilterAttr::Writer => "writers",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FilterSpec {
    pub attr: FilterAttr,
    pub value: String,
}

impl FilterSpec {
    /// First recognised `filter[attr]=value` pair wins.
    pub fn from_query(params: &QueryParams) -> Option<FilterSpec> {
        params.iter().find_map(|(key, value)| {
            let name = key.strip_prefix("filter[")?.strip_suffix(']')?;
            match FilterAttr::from_name(name) {
                Some(attr) => Some(FilterSpec { attr, value: value.to_string() }),
                None => {
                    tracing::debug!(filter = %key, "unsupported filter attribute, ignoring");
                    None
                },
            }
        })
    }

    pub fn parse(raw_query: &str) -> Option<FilterSpec> {
        Self::from_query(&QueryParams::parse(raw_query))
    }

    pub fn to_index(&self) -> Value {
        nested_match(self.attr.collection(), &self.value)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Actor,
    Writer,
    Director,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Actor, Role::Writer, Role::Director];

    pub fn collection(self) -> &'static str {
        match self {
            Role::Actor => "actors",
            Role::Writer => "writers",
            Role::Director => "directors",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Self {
        Self { number: number.max(1), size: size.max(1) }
    }

    pub fn from_query(params: &QueryParams, default_size: u32) -> Self {
        let number = params.get("page[number]").and_then(|v| v.parse().ok()).unwrap_or(1);
        let size = params.get("page[size]").and_then(|v| v.parse().ok()).unwrap_or(default_size);
        Self::new(number, size)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.size) * u64::from(self.number - 1)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.size)
    }

    /// One more than the number of full pages; existing clients depend on it.
    pub fn total_pages(&self, total: u64) -> u64 {
        total / u64::from(self.size) + 1
    }
}

#[derive(Clone, Debug, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn parse(raw: &str) -> Self {
        let pairs = raw
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode(key), decode(value))
            })
            .collect();
        Self(pairs)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn decode(s: &str) -> String {
    let s = s.replace('+', " ");
    match urlencoding::decode(&s) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => s,
    }
}

pub trait QueryBuilder: Send + Sync + 'static {
    fn sort_spec(&self, _raw: Option<&str>) -> Option<SortSpec> {
        None
    }

    fn sort_clause(&self, sort: &SortSpec) -> Value {
        sort.to_index()
    }

    fn filter_query(&self, _filter: &FilterSpec) -> Option<Value> {
        None
    }

    fn search_query(&self, _text: &str) -> Option<Value> {
        None
    }
}

pub fn nested_match(path: &str, value: &str) -> Value {
    json!({
        "nested": {
            "path": path,
            "query": { "match": { format!("{path}.id"): value } }
        }
    })
}

pub fn multi_match(text: &str, fields: &[&str]) -> Value {
    json!({ "multi_match": { "query": text, "fields": fields } })
}

pub fn fuzzy_match(field: &str, text: &str) -> Value {
    json!({ "match": { field: { "query": text, "fuzziness": "AUTO" } } })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERMITTED: &[&str] = &["imdb_rating", "title"];

    fn default_sort() -> SortSpec {
        SortSpec::new("imdb_rating", SortOrder::Desc)
    }

    #[test]
    fn sort_prefix_selects_direction() {
        assert_eq!(
            SortSpec::parse(Some("+title"), PERMITTED, default_sort()),
            SortSpec::new("title", SortOrder::Asc)
        );
        assert_eq!(
            SortSpec::parse(Some("-title"), PERMITTED, default_sort()),
            SortSpec::new("title", SortOrder::Desc)
        );
        assert_eq!(
            SortSpec::parse(Some("title"), PERMITTED, default_sort()),
            SortSpec::new("title", SortOrder::Desc)
        );
    }

    #[test]
    fn form_decoded_plus_sorts_ascending() {
        let params = QueryParams::parse("sort=+title");
        assert_eq!(params.get("sort"), Some(" title"));
        assert_eq!(
            SortSpec::parse(params.get("sort"), PERMITTED, default_sort()),
            SortSpec::new("title", SortOrder::Asc)
        );
        let encoded = QueryParams::parse("sort=%2Btitle");
        assert_eq!(
            SortSpec::parse(encoded.get("sort"), PERMITTED, default_sort()),
            SortSpec::new("title", SortOrder::Asc)
        );
    }

    #[test]
    fn unknown_or_missing_sort_falls_back_to_default() {
        assert_eq!(SortSpec::parse(Some("badattr"), PERMITTED, default_sort()), default_sort());
        assert_eq!(SortSpec::parse(Some("+badattr"), PERMITTED, default_sort()), default_sort());
        assert_eq!(SortSpec::parse(None, PERMITTED, default_sort()), default_sort());
        assert_eq!(SortSpec::parse(Some("  "), PERMITTED, default_sort()), default_sort());
    }

    #[test]
    fn sort_clause_uses_index_syntax() {
        let clause = SortSpec::new("title", SortOrder::Asc).to_index();
        assert_eq!(clause, json!([{"title": {"order": "asc"}}]));
    }

    #[test]
    fn filter_parsed_from_bracketed_key() {
        assert_eq!(
            FilterSpec::parse("filter[genre]=123"),
            Some(FilterSpec { attr: FilterAttr::Genre, value: "123".to_string() })
        );
        assert_eq!(
            FilterSpec::parse("page%5Bsize%5D=10&filter%5Bactor%5D=abc"),
            Some(FilterSpec { attr: FilterAttr::Actor, value: "abc".to_string() })
        );
    }

    #[test]
    fn filter_absent_without_bracketed_key() {
        assert_eq!(FilterSpec::parse("sort=-imdb_rating&page[size]=10"), None);
        assert_eq!(FilterSpec::parse(""), None);
        assert_eq!(FilterSpec::parse("filter=genre"), None);
    }

    #[test]
    fn first_recognised_filter_wins() {
        let filter = FilterSpec::parse("filter[studio]=x&filter[writer]=w&filter[genre]=g").unwrap();
        assert_eq!(filter.attr, FilterAttr::Writer);
        assert_eq!(filter.value, "w");
    }

    #[test]
    fn filter_translates_to_nested_match() {
        let filter = FilterSpec { attr: FilterAttr::Director, value: "d1".to_string() };
        assert_eq!(
            filter.to_index(),
            json!({"nested": {"path": "directors", "query": {"match": {"directors.id": "d1"}}}})
        );
    }

    #[test]
    fn page_offsets() {
        let page = Page::new(3, 20);
        assert_eq!(page.offset(), 40);
        assert_eq!(page.limit(), 20);
        assert_eq!(Page::new(0, 0), Page::new(1, 1));
    }

    #[test]
    fn total_pages_counts_one_past_full_pages() {
        let page = Page::new(1, 2);
        assert_eq!(page.total_pages(4), 3);
        assert_eq!(page.total_pages(5), 3);
        assert_eq!(page.total_pages(0), 1);
    }

    #[test]
    fn page_from_query_with_defaults() {
        let params = QueryParams::parse("page[number]=2&page[size]=abc");
        assert_eq!(Page::from_query(&params, 50), Page::new(2, 50));
        assert_eq!(Page::from_query(&QueryParams::default(), 50), Page::new(1, 50));
    }

    #[test]
    fn query_params_decode_values() {
        let params = QueryParams::parse("query=star+wars&x=%C3%A9");
        assert_eq!(params.get("query"), Some("star wars"));
        assert_eq!(params.get("x"), Some("é"));
        assert_eq!(params.get("missing"), None);
    }
}
