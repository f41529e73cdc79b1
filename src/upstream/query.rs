//! Selector construction and URL encoding for instant queries

use url::{Url, form_urlencoded};

use crate::{ApplicationId, MetricName};

/// Path of the instant-query endpoint, relative to the backend base URL
pub const INSTANT_QUERY_PATH: &str = "/api/v1/query";

/// Path of the endpoint listing every known `application_id` label value
pub const APPLICATION_LABEL_VALUES_PATH: &str = "/api/v1/label/application_id/values";

/// Builds PromQL-shaped selectors
///
/// Inputs are [`ApplicationId`] and [`MetricName`], both allow-listed at
/// parse time, so nothing here needs escaping.
pub struct QueryBuilder;

impl QueryBuilder {
    /// `{application_id="<id>"}`
    pub fn application_selector(app: &ApplicationId) -> String {
        format!("{{application_id=\"{app}\"}}")
    }

    /// `{__name__=~"<n1>|<n2>", application_id="<id>"}`
    ///
    /// An empty `names` slice yields `__name__=~""`, which matches nothing.
    pub fn named_selector(app: &ApplicationId, names: &[MetricName]) -> String {
        let alternation = names
            .iter()
            .map(MetricName::as_str)
            .collect::<Vec<_>>()
            .join("|");
        format!("{{__name__=~\"{alternation}\", application_id=\"{app}\"}}")
    }

    /// Form-encode a selector for use as the `query` parameter
    pub fn encode(selector: &str) -> String {
        form_urlencoded::byte_serialize(selector.as_bytes()).collect()
    }

    /// Full instant-query URL for `selector`
    ///
    /// The selector is encoded exactly once; parsing the assembled string keeps
    /// existing percent escapes as they are.
    pub fn instant_query_url(base_url: &str, selector: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}{INSTANT_QUERY_PATH}?query={}",
            base_url.trim_end_matches('/'),
            Self::encode(selector)
        ))
    }

    pub fn label_values_url(base_url: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}{APPLICATION_LABEL_VALUES_PATH}",
            base_url.trim_end_matches('/')
        ))
    }
}
