use serde_json::Value;
use vossibility_core::{Blob, GITHUB_TYPE_ISSUE, GITHUB_TYPE_PULL_REQUEST};

use crate::error::GithubError;

/// An issue or pull request as returned by the API, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct GithubItem {
    kind: &'static str,
    number: u64,
    payload: Value,
}

impl GithubItem {
    /// Wrap an issue object from the listing. Pull requests show up there as
    /// issues carrying a `pull_request` member.
    pub fn from_issue(issue: Value) -> Result<Self, GithubError> {
        let kind = if issue.get("pull_request").is_some_and(|v| !v.is_null()) {
            GITHUB_TYPE_PULL_REQUEST
        } else {
            GITHUB_TYPE_ISSUE
        };
        Ok(Self {
            kind,
            number: number_of(&issue)?,
            payload: issue,
        })
    }

    /// Wrap a pull request object, replacing its labels with the ones of the
    /// issue it was listed as.
    pub fn from_pull_request(mut pull_request: Value, labels: Option<&Value>) -> Result<Self, GithubError> {
        let number = number_of(&pull_request)?;
        if let (Some(labels), Value::Object(map)) = (labels, &mut pull_request) {
            map.insert("labels".to_owned(), labels.clone());
        }
        Ok(Self {
            kind: GITHUB_TYPE_PULL_REQUEST,
            number,
            payload: pull_request,
        })
    }

    /// The same item, stored as a plain issue.
    #[must_use]
    pub fn as_issue(self) -> Self {
        Self {
            kind: GITHUB_TYPE_ISSUE,
            ..self
        }
    }

    /// Whether this listing entry needs its pull request details fetched.
    pub fn is_pull_request(&self) -> bool {
        self.kind == GITHUB_TYPE_PULL_REQUEST
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Document ID: the item number.
    pub fn id(&self) -> String {
        self.number.to_string()
    }

    pub fn into_blob(self) -> Blob {
        Blob::with_data(self.kind, self.id(), self.payload)
    }
}

fn number_of(item: &Value) -> Result<u64, GithubError> {
    item.get("number")
        .and_then(Value::as_u64)
        .ok_or_else(|| GithubError::MalformedItem("missing `number`".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn issue_or_pull_request_from_listing() {
        let issue = GithubItem::from_issue(json!({"number": 7, "title": "bug"})).unwrap();
        assert_eq!(issue.kind(), "issue");
        assert!(!issue.is_pull_request());
        assert_eq!(issue.id(), "7");

        let pr = GithubItem::from_issue(json!({"number": 8, "pull_request": {"url": "x"}})).unwrap();
        assert!(pr.is_pull_request());
        assert_eq!(pr.clone().as_issue().kind(), "issue");

        let null_pr = GithubItem::from_issue(json!({"number": 9, "pull_request": null})).unwrap();
        assert!(!null_pr.is_pull_request());
    }

    #[test]
    fn pull_request_takes_issue_labels() {
        let labels = json!([{"name": "status/needs-review"}]);
        let item = GithubItem::from_pull_request(json!({"number": 8, "additions": 3}), Some(&labels)).unwrap();
        assert_eq!(item.kind(), "pull_request");
        assert_eq!(item.payload()["labels"], labels);
        assert_eq!(item.payload()["additions"], 3);
    }

    #[test]
    fn missing_number_is_malformed() {
        let err = GithubItem::from_issue(json!({"title": "no number"})).unwrap_err();
        assert!(matches!(err, GithubError::MalformedItem(_)));
        assert!(GithubItem::from_issue(json!({"number": "12"})).is_err());
    }

    #[test]
    fn into_blob_uses_kind_and_number() {
        let blob = GithubItem::from_issue(json!({"number": 12})).unwrap().into_blob();
        assert_eq!(blob.kind(), "issue");
        assert_eq!(blob.id(), "12");
        assert_eq!(blob.data()["number"], 12);
    }
}
