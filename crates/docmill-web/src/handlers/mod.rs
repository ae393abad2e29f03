pub mod health;
pub mod index;
pub mod process;

use std::str::FromStr;

use docmill_core::{ContentType, Tier, Tool};

use crate::error::ApiError;

/// Parse the tier path segment.
pub fn parse_tier(raw: &str) -> Result<Tier, ApiError> {
    Tier::from_str(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}

/// Resolve the tool for a request: the tier default, or the explicit form
/// field checked against both the tier and the content type.
pub fn resolve_tool(
    tier: Tier,
    content_type: ContentType,
    explicit: Option<&str>,
) -> Result<Tool, ApiError> {
    let Some(name) = explicit else {
        return Ok(tier.default_tool(content_type));
    };

    let tool = Tool::from_str(name).map_err(|e| ApiError::bad_request(e.to_string()))?;
    if tool.tier() != tier {
        return Err(ApiError::bad_request(format!(
            "tool '{tool}' is not part of the {tier} tier"
        )));
    }
    if !tool.supports(content_type) {
        return Err(ApiError::bad_request(format!(
            "tool '{tool}' does not support {content_type} input"
        )));
    }
    Ok(tool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tools_follow_the_tier() {
        assert_eq!(
            resolve_tool(Tier::OpenSource, ContentType::Pdf, None).unwrap(),
            Tool::Mupdf
        );
        assert_eq!(
            resolve_tool(Tier::Enterprise, ContentType::Webpage, None).unwrap(),
            Tool::Diffbot
        );
    }

    #[test]
    fn explicit_tool_must_match_tier_and_content_type() {
        assert_eq!(
            resolve_tool(Tier::OpenSource, ContentType::Pdf, Some("mupdf")).unwrap(),
            Tool::Mupdf
        );
        // Wrong tier
        assert!(resolve_tool(Tier::OpenSource, ContentType::Pdf, Some("docintel")).is_err());
        // Wrong content type
        assert!(resolve_tool(Tier::Enterprise, ContentType::Pdf, Some("diffbot")).is_err());
        // Unknown name
        assert!(resolve_tool(Tier::OpenSource, ContentType::Pdf, Some("pymupdf")).is_err());
    }

    #[test]
    fn tier_segment_parses() {
        assert_eq!(parse_tier("opensource").unwrap(), Tier::OpenSource);
        assert_eq!(parse_tier("enterprise").unwrap(), Tier::Enterprise);
        assert!(parse_tier("premium").is_err());
    }
}
