// crates/siac-gate-mcp/src/tools/campaign_metrics.rs
// ============================================================================
// Module: Campaign Metrics Tool
// Description: Read-only delivery and quality metrics for a campaign.
// Purpose: Give the model headline numbers and the widget its full dataset.
// Dependencies: serde, serde_json, siac-gate-core
// ============================================================================

//! ## Overview
//! Metrics are deterministic per campaign id: a keyword in the id (`test`,
//! `demo`, `error`, `pacing`, checked in that order) selects the profile.
//! Headline counts go to `structuredContent`. Engagement rates, cost
//! analysis, timeline, pacing, platform errors, and the caller's saved widget
//! preferences are meta-only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use siac_gate_core::ChannelProjection;
use siac_gate_core::StructuredContent;
use siac_gate_core::SubjectId;
use siac_gate_core::ToolDefinition;
use siac_gate_core::ToolName;
use siac_gate_core::ToolOutput;

use super::run_blocking;
use super::text_field;
use crate::registry::RegisteredTool;
use crate::registry::RegistryError;
use crate::registry::ToolCallError;
use crate::registry::ToolContext;
use crate::registry::ToolHandler;
use crate::registry::parse_arguments;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tool name.
pub const NAME: &str = "siac.get_campaign_metrics";
/// Rendering template.
const TEMPLATE: &str = "ui://widget/CampaignMetricsWidget.html";
/// Messages sent per campaign.
const TOTAL_SENT: u32 = 1250;
/// Price per message.
const COST_PER_MESSAGE: f64 = 0.015;
/// Messages held while pacing is active.
const HELD_WHILE_PACING: u32 = 45;

// ============================================================================
// SECTION: Profiles
// ============================================================================

/// Campaign run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CampaignStatus {
    /// Finished.
    Completed,
    /// In progress.
    Running,
    /// Aborted.
    Failed,
}

impl CampaignStatus {
    /// Wire label.
    const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Running => "RUNNING",
            Self::Failed => "FAILED",
        }
    }
}

/// Sender quality rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quality {
    /// Healthy.
    Green,
    /// Degrading.
    Yellow,
    /// At risk.
    Red,
}

impl Quality {
    /// Wire label.
    const fn as_str(self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
        }
    }

    /// Picks the value matching this rating.
    const fn pick(self, green: f64, yellow: f64, red: f64) -> f64 {
        match self {
            Self::Green => green,
            Self::Yellow => yellow,
            Self::Red => red,
        }
    }
}

/// Deterministic metrics for one campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MetricsProfile {
    /// Delivery rate in basis points.
    delivery_bp: u32,
    /// Run state.
    status: CampaignStatus,
    /// Quality rating.
    quality: Quality,
    /// Whether platform pacing holds messages.
    pacing: bool,
    /// Whether platform errors are reported.
    platform_errors: bool,
}

impl MetricsProfile {
    /// Selects the profile by keyword in the campaign id.
    fn for_campaign(campaign_id: &str) -> Self {
        let id = campaign_id.to_lowercase();
        let base = Self {
            delivery_bp: 9500,
            status: CampaignStatus::Completed,
            quality: Quality::Green,
            pacing: false,
            platform_errors: false,
        };
        if id.contains("test") {
            Self {
                delivery_bp: 8700,
                status: CampaignStatus::Running,
                quality: Quality::Yellow,
                pacing: true,
                ..base
            }
        } else if id.contains("demo") {
            Self {
                delivery_bp: 9900,
                ..base
            }
        } else if id.contains("error") {
            Self {
                delivery_bp: 4500,
                status: CampaignStatus::Failed,
                quality: Quality::Red,
                platform_errors: true,
                ..base
            }
        } else if id.contains("pacing") {
            Self {
                delivery_bp: 9200,
                status: CampaignStatus::Running,
                quality: Quality::Yellow,
                pacing: true,
                ..base
            }
        } else {
            base
        }
    }

    /// Delivery rate as a fraction.
    fn delivery_rate(self) -> f64 {
        f64::from(self.delivery_bp) / 10_000.0
    }

    /// Delivered message count.
    const fn delivered(self) -> u32 {
        TOTAL_SENT * self.delivery_bp / 10_000
    }
}

/// Rounds to `places` decimal places.
fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10_f64.powi(places);
    (value * scale).round() / scale
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Call arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Arguments {
    /// Campaign identifier.
    campaign_id: String,
}

/// Metrics handler.
struct CampaignMetrics;

#[async_trait]
impl ToolHandler for CampaignMetrics {
    async fn call(
        &self,
        context: &ToolContext,
        arguments: Value,
    ) -> Result<ToolOutput, ToolCallError> {
        let args: Arguments = parse_arguments(arguments)?;
        let subject = SubjectId::parse(args.campaign_id.clone())
            .map_err(|err| ToolCallError::InvalidParams(format!("campaign_id: {err}")))?;
        let preferences = run_blocking(|| context.widget_state.get(&subject))
            .map_err(|err| ToolCallError::Internal(err.to_string()))?;
        let preferences = serde_json::to_value(&preferences)
            .map_err(|err| ToolCallError::Internal(err.to_string()))?;

        let profile = MetricsProfile::for_campaign(&args.campaign_id);
        let rate = profile.delivery_rate();
        let delivered = profile.delivered();
        let quality = profile.quality;
        let completed = profile.status == CampaignStatus::Completed;
        let meta_errors = if profile.platform_errors {
            json!([
                { "error_code": 131_049, "error_message": "Marketing message limit per user exceeded", "count": 150 },
                { "error_code": 131_026, "error_message": "Message failed to send", "count": 125 }
            ])
        } else {
            json!([])
        };

        Ok(ToolOutput::new()
            .with("campaign_id", args.campaign_id)
            .with("delivery_rate", rate)
            .with("status", profile.status.as_str())
            .with("quality_score", quality.as_str())
            .with("total_sent", TOTAL_SENT)
            .with("delivered", delivered)
            .with("failed", TOTAL_SENT - delivered)
            .with(
                "performance_metrics",
                json!({
                    "delivery_rate": rate,
                    "open_rate": quality.pick(0.23, 0.15, 0.08),
                    "click_rate": quality.pick(0.05, 0.03, 0.01),
                    "response_rate": quality.pick(0.02, 0.015, 0.005),
                }),
            )
            .with(
                "quality_metrics",
                json!({
                    "quality_score": quality.as_str(),
                    "spam_score": quality.pick(0.01, 0.06, 0.15),
                    "engagement_score": quality.pick(0.15, 0.12, 0.03),
                }),
            )
            .with(
                "timeline",
                json!({
                    "started_at": "2024-01-20T10:00:00Z",
                    "completed_at": completed.then_some("2024-01-20T18:30:00Z"),
                    "duration_hours": completed.then_some(8.5),
                }),
            )
            .with(
                "cost_analysis",
                json!({
                    "total_cost": round_to(f64::from(TOTAL_SENT) * COST_PER_MESSAGE, 2),
                    "cost_per_message": COST_PER_MESSAGE,
                    "cost_per_delivery": round_to(COST_PER_MESSAGE / rate, 4),
                }),
            )
            .with(
                "pacing_status",
                json!({
                    "template_pacing_active": profile.pacing,
                    "held_messages": if profile.pacing { HELD_WHILE_PACING } else { 0 },
                    "pacing_reason": profile.pacing.then_some("Evaluación de calidad por Meta"),
                }),
            )
            .with("meta_errors", meta_errors)
            .with("widget_state", preferences))
    }
}

/// Model-visible summary.
fn summary(structured: &StructuredContent) -> String {
    let rate = structured.get("delivery_rate").and_then(Value::as_f64).unwrap_or_default();
    let status = text_field(structured, "status");
    let outlook = match status {
        "COMPLETED" => " The campaign has finished successfully with excellent performance.",
        "RUNNING" => " The campaign is currently active and performing well.",
        "FAILED" => " The campaign encountered issues and may need attention.",
        _ => "",
    };
    format!(
        "Campaign {} metrics retrieved. Status: {status}, Delivery Rate: {:.1}%, Quality Score: \
         {}.{outlook}",
        text_field(structured, "campaign_id"),
        rate * 100.0,
        text_field(structured, "quality_score"),
    )
}

/// Registry entry.
pub(super) fn tool() -> Result<RegisteredTool, RegistryError> {
    let definition = ToolDefinition::read_only(
        ToolName::parse(NAME)?,
        "Use this when you need to retrieve detailed metrics and performance data for a specific \
         campaign to analyze delivery rates, status, and quality scores.",
        json!({
            "type": "object",
            "properties": {
                "campaign_id": { "type": "string", "description": "Identifier of the campaign to query" }
            },
            "required": ["campaign_id"],
            "additionalProperties": false
        }),
    )?
    .with_output_template(TEMPLATE);
    let projection = ChannelProjection::new(
        &["campaign_id", "delivery_rate", "status", "quality_score", "total_sent", "delivered", "failed"],
        &[
            "performance_metrics",
            "quality_metrics",
            "timeline",
            "cost_analysis",
            "pacing_status",
            "meta_errors",
            "widget_state",
        ],
        summary,
    )?;
    Ok(RegisteredTool::new(definition, projection, Arc::new(CampaignMetrics)))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
