//! Terminal reports: exactly one of these is sent per run.

use serde::Serialize;
use uuid::Uuid;

use super::context::{RunContext, StageName};
use crate::utils::truncate_chars;

/// Characters of the diagnostic trace kept in a failure report.
pub const TRACE_LIMIT: usize = 200;

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuccessReport {
    /// Run id.
    pub run_id: Uuid,
    /// Day of the batch.
    pub date: String,
    /// Items collected and published.
    pub items: usize,
    /// Cards written.
    pub artifacts: usize,
    /// Catalog entries after the merge.
    pub catalog_size: usize,
    /// Carousel post id.
    pub post_id: Option<String>,
    /// Credential expiry warning, if any.
    pub credential_warning: Option<String>,
}

impl SuccessReport {
    /// Builds the report from the final run state.
    #[must_use]
    pub fn from_context(ctx: &RunContext) -> Self {
        Self {
            run_id: ctx.run_id,
            date: ctx.date.as_ref().map(ToString::to_string).unwrap_or_default(),
            items: ctx.items.len(),
            artifacts: ctx.artifacts,
            catalog_size: ctx.catalog_size,
            post_id: ctx.post_id.clone(),
            credential_warning: ctx.credential_warning.clone(),
        }
    }

    /// Notification text.
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = format!(
            "🎉 [작업 성공] {} 업로드 완료\n상품 {}개 · 이미지 {}장 · 카탈로그 {}개",
            self.date, self.items, self.artifacts, self.catalog_size
        );
        if let Some(warning) = &self.credential_warning {
            text.push_str("\n\n");
            text.push_str(warning);
        }
        text
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    /// Run id.
    pub run_id: Uuid,
    /// The stage that failed, `None` if the run never started one.
    pub stage: Option<StageName>,
    /// Error message with its context chain.
    pub message: String,
    /// Prefix of the debug rendering of the error.
    pub trace: String,
}

impl FailureReport {
    /// Builds the report for `error` raised in the context's current stage.
    #[must_use]
    pub fn new(ctx: &RunContext, error: &anyhow::Error) -> Self {
        let trace = format!("{error:?}");
        Self {
            run_id: ctx.run_id,
            stage: ctx.stage,
            message: format!("{error:#}"),
            trace: truncate_chars(&trace, TRACE_LIMIT).to_string(),
        }
    }

    /// Label of the failing stage.
    #[must_use]
    pub fn stage_label(&self) -> &'static str {
        self.stage.map_or("0. startup", StageName::label)
    }

    /// Notification text.
    #[must_use]
    pub fn text(&self) -> String {
        format!(
            "🚨 [작업 실패]\n단계: {}\n내용: {}\n\n{}",
            self.stage_label(),
            self.message,
            self.trace
        )
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every fatal stage completed.
    Succeeded(SuccessReport),
    /// A fatal stage failed.
    Failed(FailureReport),
}

impl RunOutcome {
    /// Process exit code: 0 on success, 1 on failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Succeeded(_) => 0,
            Self::Failed(_) => 1,
        }
    }

    /// Returns true for [`RunOutcome::Succeeded`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Notification text for this outcome.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Succeeded(report) => report.text(),
            Self::Failed(report) => report.text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DayKey;
    use crate::testing::fixtures::items_for_day;

    fn context_at(stage: StageName) -> RunContext {
        let mut ctx = RunContext::new(None);
        ctx.enter(stage);
        ctx
    }

    #[test]
    fn test_failure_report_text() {
        let ctx = context_at(StageName::Persist);
        let error = anyhow::anyhow!("disk full").context("writing catalog");

        let report = FailureReport::new(&ctx, &error);
        let text = report.text();

        assert!(text.starts_with("🚨 [작업 실패]\n단계: 3. persist\n"));
        assert!(text.contains("writing catalog: disk full"));
        assert_eq!(RunOutcome::Failed(report).exit_code(), 1);
    }

    #[test]
    fn test_trace_is_truncated_on_char_boundary() {
        let ctx = context_at(StageName::Social);
        let long = "실패".repeat(300);
        let error = anyhow::anyhow!(long).context("posting carousel");

        let report = FailureReport::new(&ctx, &error);
        assert_eq!(report.trace.chars().count(), TRACE_LIMIT);
    }

    #[test]
    fn test_success_report_text() {
        let mut ctx = RunContext::new(Some("octo".into()));
        ctx.date = Some(DayKey::parse("20250115").unwrap());
        ctx.items = items_for_day("20250115", 10);
        ctx.artifacts = 12;
        ctx.catalog_size = 40;

        let report = SuccessReport::from_context(&ctx);
        let text = report.text();
        assert!(text.contains("20250115"));
        assert!(text.contains("상품 10개"));
        assert!(text.contains("이미지 12장"));
        assert!(text.contains("카탈로그 40개"));
        assert_eq!(RunOutcome::Succeeded(report).exit_code(), 0);
    }

    #[test]
    fn test_success_report_appends_warning() {
        let mut ctx = RunContext::new(None);
        ctx.credential_warning = Some("token expires soon".into());
        let text = SuccessReport::from_context(&ctx).text();
        assert!(text.ends_with("\n\ntoken expires soon"));
    }
}
