use shared::protocol::CallAnalysis;
use url::{form_urlencoded, Url};

pub const INSIGHTS_PATH: &str = "/insights";

/// Relative location of the insights view for a finished analysis. Values
/// are form-encoded; a missing flowchart is sent empty.
pub fn insights_location(analysis: &CallAnalysis) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("transcript", analysis.transcript.as_deref().unwrap_or_default())
        .append_pair("flowchart", analysis.flowchart.as_deref().unwrap_or_default())
        .finish();
    format!("{INSIGHTS_PATH}?{query}")
}

/// Resolves a server-relative location against the backend base URL.
pub fn resolve_location(base: &str, location: &str) -> Result<Url, url::ParseError> {
    Url::parse(base)?.join(location)
}
