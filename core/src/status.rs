//! Operator-facing summary messages, one per resolver run.

use crate::{cleanup::CleanupOutcome, merge::MergeOutcome};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Info,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub title: String,
    pub text: String,
}

impl StatusMessage {
    fn success(text: String) -> Self {
        Self {
            level: StatusLevel::Info,
            title: "Success".into(),
            text,
        }
    }

    fn errors(text: String) -> Self {
        Self {
            level: StatusLevel::Warn,
            title: "Errors encountered".into(),
            text,
        }
    }

    pub fn for_merge(o: &MergeOutcome) -> Self {
        if o.error_count > 0 {
            Self::errors(format!(
                "{} errors were encountered when trying to merge duplicate bank accounts, \
                 {}/{} bank accounts were successfully merged.",
                o.error_count,
                o.merged_count,
                o.attempted()
            ))
        } else {
            Self::success(format!("{} duplicate bank accounts successfully merged.", o.merged_count))
        }
    }

    pub fn for_cleanup(o: &CleanupOutcome) -> Self {
        if o.error_count > 0 {
            Self::errors(format!(
                "{} errors were encountered when trying to delete duplicate references. \
                 {}/{} references were successfully deleted.",
                o.error_count,
                o.deleted_count,
                o.attempted()
            ))
        } else {
            Self::success(format!("{} duplicate references successfully deleted.", o.deleted_count))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_errors_report_ratio() {
        let o = MergeOutcome {
            merged_count: 2,
            error_count: 1,
            merged_reference_ids: vec![1, 2],
        };
        let msg = StatusMessage::for_merge(&o);
        assert_eq!(msg.level, StatusLevel::Warn);
        assert_eq!(
            msg.text,
            "1 errors were encountered when trying to merge duplicate bank accounts, \
             2/3 bank accounts were successfully merged."
        );
    }

    #[test]
    fn clean_cleanup_is_info() {
        let msg = StatusMessage::for_cleanup(&CleanupOutcome {
            deleted_count: 4,
            error_count: 0,
        });
        assert_eq!(msg.level, StatusLevel::Info);
        assert_eq!(msg.title, "Success");
        assert_eq!(msg.text, "4 duplicate references successfully deleted.");
    }
}
