//! Slide content model - the pages, plan and images produced by the
//! external generation pipeline.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{CarouselError, CarouselResult, ImageAsset};

/// Number of pages in every carousel plan.
pub const PAGES_PER_PLAN: usize = 5;

/// Maximum number of recommendation candidates carried by a plan.
pub const MAX_RECOMMENDATIONS: usize = 3;

/// One page of a carousel, as produced by the generation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based position within the plan.
    pub page_number: u32,
    /// Short guide label, e.g. "Example 01".
    pub label: String,
    /// Main text. May contain a line break separating a primary and a
    /// secondary segment.
    pub content: String,
    /// Prompt used to generate the photographic background.
    #[serde(default)]
    pub image_prompt: String,
    /// Prompt for the comic-style alternative background.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt_comic: Option<String>,
    /// Per-page watermark handle, when the pipeline supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark: Option<String>,
}

impl Page {
    /// Create a page with empty prompts.
    #[must_use]
    pub fn new(page_number: u32, label: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            page_number,
            label: label.into(),
            content: content.into(),
            image_prompt: String::new(),
            image_prompt_comic: None,
            watermark: None,
        }
    }

    /// Role implied by the page position.
    #[must_use]
    pub fn role(&self) -> PageRole {
        PageRole::from_position(self.page_number)
    }

    /// Content split on its first line break into primary and secondary
    /// segments.
    #[must_use]
    pub fn split_content(&self) -> (&str, Option<&str>) {
        match self.content.split_once('\n') {
            Some((primary, secondary)) => {
                let secondary = secondary.trim_matches('\n');
                (primary.trim_end_matches('\r'), (!secondary.is_empty()).then_some(secondary))
            }
            None => (self.content.as_str(), None),
        }
    }

    /// Content without a leading summary marker.
    #[must_use]
    pub fn summary_text(&self) -> &str {
        strip_summary_marker(&self.content)
    }
}

/// Remove a leading "Summary"/"요약" marker, with or without a colon,
/// ignoring ASCII case.
#[must_use]
pub fn strip_summary_marker(text: &str) -> &str {
    for marker in ["summary", "요약"] {
        let Some(head) = text.get(..marker.len()) else {
            continue;
        };
        if head.eq_ignore_ascii_case(marker) {
            let rest = &text[marker.len()..];
            let rest = rest.strip_prefix(':').unwrap_or(rest);
            return rest.trim_start();
        }
    }
    text
}

/// Position-dependent role of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageRole {
    /// Page 1: the native-language hook.
    Intro,
    /// Page 2: the target expression and its meaning.
    Expression,
    /// Pages 3 and 4: usage examples.
    Example,
    /// Page 5: recap.
    Summary,
}

impl PageRole {
    /// Role for a 1-based page position. Positions past the summary fall
    /// back to the example layout.
    #[must_use]
    pub fn from_position(page_number: u32) -> Self {
        match page_number {
            1 => Self::Intro,
            2 => Self::Expression,
            5 => Self::Summary,
            _ => Self::Example,
        }
    }
}

/// A recommended expression pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Korean phrasing.
    pub ko: String,
    /// English phrasing.
    pub en: String,
}

/// A validated five-page carousel plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Optional carousel title.
    #[serde(default)]
    pub title: Option<String>,
    /// Optional post caption.
    #[serde(default)]
    pub caption: Option<String>,
    pages: Vec<Page>,
    /// Up to three recommendation candidates.
    #[serde(default)]
    pub recommendations: Vec<Candidate>,
}

impl Plan {
    /// Validate and order pages into a plan.
    ///
    /// # Errors
    ///
    /// Returns [`CarouselError::InvalidPlan`] unless there are exactly five
    /// pages numbered 1 through 5, each appearing once.
    pub fn new(mut pages: Vec<Page>) -> CarouselResult<Self> {
        if pages.len() != PAGES_PER_PLAN {
            return Err(CarouselError::InvalidPlan(format!(
                "expected {PAGES_PER_PLAN} pages, got {}",
                pages.len()
            )));
        }

        pages.sort_by_key(|p| p.page_number);
        for (expected, page) in (1..).zip(&pages) {
            if page.page_number != expected {
                return Err(CarouselError::InvalidPlan(format!(
                    "page numbers must be 1..={PAGES_PER_PLAN} without gaps or duplicates (found {} at position {expected})",
                    page.page_number
                )));
            }
        }

        Ok(Self {
            title: None,
            caption: None,
            pages,
            recommendations: Vec::new(),
        })
    }

    /// Attach recommendation candidates, keeping at most three.
    #[must_use]
    pub fn with_recommendations(mut self, mut candidates: Vec<Candidate>) -> Self {
        candidates.truncate(MAX_RECOMMENDATIONS);
        self.recommendations = candidates;
        self
    }

    /// Pages in page-number order.
    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Page by 1-based number.
    #[must_use]
    pub fn page(&self, page_number: u32) -> Option<&Page> {
        self.pages.iter().find(|p| p.page_number == page_number)
    }
}

/// Generated background images keyed by page number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageSet(BTreeMap<u32, ImageAsset>);

impl ImageSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the image for a page.
    pub fn insert(&mut self, page_number: u32, asset: ImageAsset) {
        self.0.insert(page_number, asset);
    }

    /// Image for a page, if generated.
    #[must_use]
    pub fn get(&self, page_number: u32) -> Option<&ImageAsset> {
        self.0.get(&page_number)
    }

    /// Number of images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no images are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in page order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &ImageAsset)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }
}

/// Status field of the pipeline envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    /// Step succeeded.
    Ok,
    /// Step failed; see `error_code`/`message`.
    Error,
}

/// Raw JSON envelope returned by the generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOutput {
    /// Outcome of the step.
    pub status: EngineStatus,
    /// Which pipeline step produced this output (`text_plan` or `images`).
    #[serde(default)]
    pub step: Option<String>,
    /// Plan payload for the text step.
    #[serde(default)]
    pub plan_json: Option<PlanJson>,
    /// Image payload for the images step.
    #[serde(default)]
    pub images: Option<Vec<EngineImage>>,
    /// Machine-readable failure code.
    #[serde(default)]
    pub error_code: Option<String>,
    /// Human-readable failure message.
    #[serde(default)]
    pub message: Option<String>,
}

/// `plan_json` section of the envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanJson {
    /// Generated content version.
    #[serde(default)]
    pub content: Option<ContentVersion>,
    /// Recommendation candidates.
    #[serde(default)]
    pub recommendation: Option<Recommendation>,
}

/// One generated content version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentVersion {
    /// Carousel title.
    #[serde(default)]
    pub title: Option<String>,
    /// Post caption.
    #[serde(default)]
    pub caption: Option<String>,
    /// Slide pages.
    #[serde(default)]
    pub pages: Vec<Page>,
}

/// Recommendation block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recommendation {
    /// Daily candidate expressions.
    #[serde(default)]
    pub daily_candidates: Vec<Candidate>,
}

/// An image entry in the envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineImage {
    /// 1-based page number the image belongs to.
    pub page_index: u32,
    /// Data URL or bare base64 payload.
    pub image_asset: String,
}

impl EngineOutput {
    /// Parse an envelope from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CarouselError::Serialization`] on malformed JSON.
    pub fn from_json(json: &str) -> CarouselResult<Self> {
        serde_json::from_str(json).map_err(CarouselError::from)
    }

    fn check_status(&self) -> CarouselResult<()> {
        match self.status {
            EngineStatus::Ok => Ok(()),
            EngineStatus::Error => Err(CarouselError::Pipeline {
                code: self.error_code.clone().unwrap_or_else(|| "unknown".to_string()),
                message: self
                    .message
                    .clone()
                    .unwrap_or_else(|| "Pipeline error".to_string()),
            }),
        }
    }

    /// Extract the validated plan.
    ///
    /// # Errors
    ///
    /// Returns [`CarouselError::Pipeline`] for an error envelope and
    /// [`CarouselError::InvalidPlan`] if content is missing or malformed.
    pub fn plan(&self) -> CarouselResult<Plan> {
        self.check_status()?;
        let plan_json = self
            .plan_json
            .as_ref()
            .ok_or_else(|| CarouselError::InvalidPlan("missing plan_json".to_string()))?;
        let content = plan_json
            .content
            .as_ref()
            .ok_or_else(|| CarouselError::InvalidPlan("missing content".to_string()))?;

        let mut plan = Plan::new(content.pages.clone())?;
        plan.title.clone_from(&content.title);
        plan.caption.clone_from(&content.caption);
        let candidates = plan_json
            .recommendation
            .as_ref()
            .map(|r| r.daily_candidates.clone())
            .unwrap_or_default();
        Ok(plan.with_recommendations(candidates))
    }

    /// Extract generated images; an envelope without images yields an
    /// empty set.
    ///
    /// # Errors
    ///
    /// Returns [`CarouselError::Pipeline`] for an error envelope.
    pub fn image_set(&self) -> CarouselResult<ImageSet> {
        self.check_status()?;
        let mut set = ImageSet::new();
        for image in self.images.iter().flatten() {
            set.insert(image.page_index, ImageAsset::normalize(&image.image_asset));
        }
        Ok(set)
    }
}

/// The external content-generation pipeline.
///
/// Implementations may call remote models; the carousel core only sees the
/// finished plan and images.
#[async_trait]
pub trait ContentProducer: Send + Sync {
    /// Produce the text plan.
    async fn text_plan(&self) -> CarouselResult<Plan>;

    /// Produce background images for a plan.
    async fn images(&self, plan: &Plan) -> CarouselResult<ImageSet>;
}

/// A producer that serves pre-generated envelopes.
#[derive(Debug, Clone)]
pub struct StaticContent {
    plan: EngineOutput,
    images: Option<EngineOutput>,
}

impl StaticContent {
    /// Serve the given plan envelope and optional images envelope.
    #[must_use]
    pub fn new(plan: EngineOutput, images: Option<EngineOutput>) -> Self {
        Self { plan, images }
    }
}

#[async_trait]
impl ContentProducer for StaticContent {
    async fn text_plan(&self) -> CarouselResult<Plan> {
        self.plan.plan()
    }

    async fn images(&self, plan: &Plan) -> CarouselResult<ImageSet> {
        let Some(images) = &self.images else {
            return Ok(ImageSet::new());
        };
        let set = images.image_set()?;
        for (page_number, _) in set.iter() {
            if plan.page(page_number).is_none() {
                tracing::warn!(page_number, "image for unknown page ignored by plan");
            }
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages() -> Vec<Page> {
        (1..=5)
            .rev()
            .map(|n| Page::new(n, format!("Label {n}"), format!("Content {n}")))
            .collect()
    }

    #[test]
    fn test_plan_orders_pages() {
        let plan = Plan::new(pages()).expect("valid plan");
        let numbers: Vec<_> = plan.pages().iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(plan.page(3).map(|p| p.label.as_str()), Some("Label 3"));
    }

    #[test]
    fn test_plan_rejects_wrong_count() {
        let mut four = pages();
        four.pop();
        assert!(matches!(Plan::new(four), Err(CarouselError::InvalidPlan(_))));
    }

    #[test]
    fn test_plan_rejects_duplicates() {
        let mut dup = pages();
        dup[0].page_number = 2;
        assert!(Plan::new(dup).is_err());
    }

    #[test]
    fn test_roles_by_position() {
        let roles: Vec<_> = (1..=5).map(PageRole::from_position).collect();
        assert_eq!(
            roles,
            vec![
                PageRole::Intro,
                PageRole::Expression,
                PageRole::Example,
                PageRole::Example,
                PageRole::Summary
            ]
        );
    }

    #[test]
    fn test_split_content() {
        let page = Page::new(2, "Meaning", "Read the room\n분위기를 파악하다");
        assert_eq!(page.split_content(), ("Read the room", Some("분위기를 파악하다")));
        let single = Page::new(2, "Meaning", "Read the room");
        assert_eq!(single.split_content(), ("Read the room", None));
    }

    #[test]
    fn test_strip_summary_marker() {
        assert_eq!(strip_summary_marker("Summary: break the ice"), "break the ice");
        assert_eq!(strip_summary_marker("summary break the ice"), "break the ice");
        assert_eq!(strip_summary_marker("SUMMARY:break"), "break");
        assert_eq!(strip_summary_marker("요약: 어색함을 깨다"), "어색함을 깨다");
        assert_eq!(strip_summary_marker("요약 어색함"), "어색함");
        assert_eq!(strip_summary_marker("In summary, nothing"), "In summary, nothing");
        assert_eq!(strip_summary_marker("Sum"), "Sum");
        let page = Page::new(5, "Summary", "Summary: start a conversation");
        assert_eq!(page.summary_text(), "start a conversation");
    }

    #[test]
    fn test_recommendations_truncated() {
        let candidates = (0..5)
            .map(|i| Candidate {
                ko: format!("ko{i}"),
                en: format!("en{i}"),
            })
            .collect();
        let plan = Plan::new(pages()).expect("plan").with_recommendations(candidates);
        assert_eq!(plan.recommendations.len(), 3);
    }

    #[test]
    fn test_engine_output_error_status() {
        let json = r#"{"status":"error","step":"text_plan","error_code":"api_key_missing","message":"no key"}"#;
        let output = EngineOutput::from_json(json).expect("parse");
        match output.plan() {
            Err(CarouselError::Pipeline { code, .. }) => assert_eq!(code, "api_key_missing"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_engine_output_images() {
        let json = r#"{"status":"ok","step":"images","images":[{"page_index":2,"image_asset":"AAAA"}]}"#;
        let output = EngineOutput::from_json(json).expect("parse");
        let set = output.image_set().expect("images");
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get(2).map(ImageAsset::as_str),
            Some("data:image/png;base64,AAAA")
        );
    }

    #[tokio::test]
    async fn test_static_content_producer() {
        let json = serde_json::json!({
            "status": "ok",
            "step": "text_plan",
            "plan_json": {
                "content": {
                    "title": "Read the room",
                    "caption": "caption",
                    "pages": (1..=5).map(|n| serde_json::json!({
                        "page_number": n,
                        "label": format!("L{n}"),
                        "content": format!("C{n}"),
                        "image_prompt": "prompt",
                        "watermark": "@handle"
                    })).collect::<Vec<_>>()
                }
            }
        });
        let plan_output: EngineOutput = serde_json::from_value(json).expect("envelope");
        let producer = StaticContent::new(plan_output, None);
        let plan = producer.text_plan().await.expect("plan");
        assert_eq!(plan.title.as_deref(), Some("Read the room"));
        assert!(producer.images(&plan).await.expect("images").is_empty());
    }
}
