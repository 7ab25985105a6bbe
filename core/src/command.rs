use crate::{scanner::FindingBucket, types::ReferenceId};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;

/// Which findings an action applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Targets {
    /// Every finding of the bucket the action works on.
    All,
    /// Explicit representative reference ids.
    Ids(Vec<ReferenceId>),
}

impl Targets {
    /// Reference ids to act on. `All` expands to the bucket's findings.
    pub fn resolve(&self, bucket: &FindingBucket) -> Vec<ReferenceId> {
        match self {
            Targets::All => bucket.reference_ids(),
            Targets::Ids(ids) => ids.clone(),
        }
    }
}

impl FromStr for Targets {
    type Err = Infallible;

    /// `"all"`, or a comma-separated id list. Entries that are not
    /// positive integers are dropped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Targets::All);
        }
        let ids = s
            .split(',')
            .filter_map(|part| part.trim().parse::<ReferenceId>().ok())
            .filter(|id| *id > 0)
            .collect();
        Ok(Targets::Ids(ids))
    }
}

impl From<String> for Targets {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(t) => t,
            Err(never) => match never {},
        }
    }
}

impl From<Targets> for String {
    fn from(t: Targets) -> Self {
        match t {
            Targets::All => "all".into(),
            Targets::Ids(ids) => ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Operator decisions for one engine invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupeRequest {
    #[serde(default)]
    pub merge_accounts: Option<Targets>,
    #[serde(default)]
    pub delete_references: Option<Targets>,
}

impl DedupeRequest {
    /// Build from raw operator parameters. Absent or blank means "not requested".
    pub fn from_params(fix_dupe: Option<&str>, fix_ref: Option<&str>) -> Self {
        let parse = |p: Option<&str>| {
            p.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Targets::from(s.to_string()))
        };
        Self {
            merge_accounts: parse(fix_dupe),
            delete_references: parse(fix_ref),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.merge_accounts.is_none() && self.delete_references.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_and_id_lists() {
        assert_eq!("all".parse::<Targets>().unwrap(), Targets::All);
        assert_eq!(
            "3, 7,x,0,-2,12".parse::<Targets>().unwrap(),
            Targets::Ids(vec![3, 7, 12])
        );
    }

    #[test]
    fn blank_params_request_nothing() {
        let req = DedupeRequest::from_params(Some(""), None);
        assert!(req.is_empty());
        let req = DedupeRequest::from_params(Some("all"), Some("5"));
        assert_eq!(req.merge_accounts, Some(Targets::All));
        assert_eq!(req.delete_references, Some(Targets::Ids(vec![5])));
    }

    #[test]
    fn targets_serialize_as_strings() {
        let json = serde_json::to_string(&Targets::Ids(vec![1, 2])).unwrap();
        assert_eq!(json, r#""1,2""#);
        let back: Targets = serde_json::from_str(r#""all""#).unwrap();
        assert_eq!(back, Targets::All);
    }
}
